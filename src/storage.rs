use crate::error::{CriticError, Result};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Clone)]
pub struct FileSystemStore {
    data_dir: PathBuf,
}

impl FileSystemStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// `<data_dir>/<key>_<timestamp>.txt`
    pub fn timestamped_path(&self, key: &str) -> PathBuf {
        let timestamp = chrono::Utc::now().timestamp();
        self.data_dir.join(format!("{key}_{timestamp}.txt"))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Writes one record per line.
    pub fn write_lines<T: Display>(&self, path: &Path, records: &[T]) -> Result<()> {
        Self::ensure_parent(path)?;
        let content: String = records.iter().map(|record| format!("{record}\n")).collect();
        fs::write(path, content)?;
        Ok(())
    }

    /// Reads records written by [`write_lines`](Self::write_lines). Blank lines are skipped.
    pub fn read_lines<T>(&self, path: &Path) -> Result<Vec<T>>
    where
        T: FromStr<Err = CriticError>,
    {
        let content = fs::read_to_string(path)?;
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                line.parse().map_err(|e| {
                    CriticError::Parse(format!("{}:{}: {}", path.display(), index + 1, e))
                })
            })
            .collect()
    }

    pub fn write_json_file<T: serde::Serialize + ?Sized>(
        &self,
        path: &Path,
        data: &T,
    ) -> Result<()> {
        Self::ensure_parent(path)?;
        let content = serde_json::to_string_pretty(data)?;
        fs::write(path, content)?;
        Ok(())
    }
}
