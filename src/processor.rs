use crate::config::cli::{Command, ThrottleArgs};
use crate::config::Config;
use crate::dnd::{parse_races, parse_spells, Dice};
use crate::error::Result;
use crate::metacritic::{
    rating_summary, BasicUser, GameUserReviewsUrlBuilder, PageSource, Platform, ReviewScraper,
    Throttle, User,
};
use crate::storage::FileSystemStore;
use serde::Serialize;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct Processor {
    config: Config,
    store: FileSystemStore,
}

impl Processor {
    pub fn new(config: Config) -> Self {
        let store = FileSystemStore::new(&config.args.data_dir);
        Self { config, store }
    }

    pub async fn run(&self) -> Result<()> {
        match &self.config.args.command {
            Command::Url { platform, game } => {
                let builder = GameUserReviewsUrlBuilder::new(*platform, game, true);
                if let Some(url) = builder.urls().next() {
                    println!("URL is: {url}");
                }
                Ok(())
            }
            Command::Reviews {
                platform,
                game,
                max_pages,
                output,
                profiles,
                throttle,
            } => {
                let scraper = self.scraper(throttle)?;
                self.scrape_reviews(
                    &scraper,
                    *platform,
                    game,
                    *max_pages,
                    output.as_deref(),
                    *profiles,
                )
                .await
            }
            Command::Profiles {
                input,
                output,
                throttle,
            } => {
                let scraper = self.scraper(throttle)?;
                self.scrape_profiles(&scraper, input, output.as_deref()).await
            }
            Command::Rate { input } => {
                let users: Vec<User> = self.store.read_lines(input)?;
                println!("{}", rating_summary(&users));
                Ok(())
            }
            Command::Spells { file, json, output } => {
                let spells = parse_spells(file)?;
                self.emit(&spells, *json, output.as_deref())
            }
            Command::Races { file, json, output } => {
                let races = parse_races(file)?;
                self.emit(&races, *json, output.as_deref())
            }
            Command::Roll { formula, total } => {
                let dice: Dice = formula.parse()?;
                let mut rng = rand::thread_rng();
                if *total {
                    println!("{}", dice.roll(&mut rng));
                } else {
                    println!("{}: {}", dice.formula(), dice.roll_as_text(&mut rng));
                }
                Ok(())
            }
        }
    }

    fn scraper(&self, throttle: &ThrottleArgs) -> Result<ReviewScraper<reqwest::Client>> {
        ReviewScraper::new(self.config.http_client.clone(), Throttle::try_from(throttle)?)
    }

    fn output_path(&self, output: Option<&Path>, key: &str) -> PathBuf {
        output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.store.timestamped_path(key))
    }

    async fn scrape_reviews<S: PageSource>(
        &self,
        scraper: &ReviewScraper<S>,
        platform: Platform,
        game: &str,
        max_pages: Option<usize>,
        output: Option<&Path>,
        profiles: bool,
    ) -> Result<()> {
        self.config.ensure_directories()?;

        info!("Step 1: Scraping user reviews...");
        let builder = GameUserReviewsUrlBuilder::new(platform, game, true);
        let basics = scraper.scrape_user_reviews(&builder, max_pages).await?;

        let path = self.output_path(output, &format!("{game}_{platform}_basic"));
        self.store.write_lines(&path, &basics)?;
        info!("Wrote {} user reviews to {}", basics.len(), path.display());

        if profiles {
            info!("Step 2: Scraping user profiles...");
            let users = scraper.scrape_users(basics).await?;
            let users_path = match output {
                Some(path) => users_path_beside(path),
                None => self.store.timestamped_path(&format!("{game}_{platform}_users")),
            };
            self.write_users(&users, &users_path)?;
        }

        Ok(())
    }

    async fn scrape_profiles<S: PageSource>(
        &self,
        scraper: &ReviewScraper<S>,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<()> {
        self.config.ensure_directories()?;
        let basics: Vec<BasicUser> = self.store.read_lines(input)?;
        info!("Read {} user reviews from {}", basics.len(), input.display());

        let users = scraper.scrape_users(basics).await?;
        self.write_users(&users, &self.output_path(output, "users"))
    }

    fn write_users(&self, users: &[User], path: &Path) -> Result<()> {
        self.store.write_lines(path, users)?;
        info!("Wrote {} users to {}", users.len(), path.display());
        println!("{}", rating_summary(users));
        Ok(())
    }

    fn emit<T: Debug + Serialize>(
        &self,
        records: &[T],
        json: bool,
        output: Option<&Path>,
    ) -> Result<()> {
        if let Some(path) = output {
            self.store.write_json_file(path, records)?;
            info!("Wrote {} records to {}", records.len(), path.display());
        } else if json {
            println!("{}", serde_json::to_string_pretty(records)?);
        } else {
            for (i, record) in records.iter().enumerate() {
                println!("\n********** {} **********\n", i + 1);
                println!("{record:#?}");
            }
        }
        Ok(())
    }
}

/// `reviews.txt` -> `reviews_users.txt` in the same directory.
fn users_path_beside(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_users.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::Args;
    use crate::error::CriticError;
    use crate::metacritic::fixtures::*;
    use clap::Parser;
    use serde_json::{json, Value};
    use std::fs;

    fn processor(data_dir: &Path, command: &[&str]) -> Processor {
        let mut argv = vec!["m2critic", "--data-dir", data_dir.to_str().unwrap()];
        argv.extend_from_slice(command);

        Processor::new(Config {
            args: Args::parse_from(argv),
            http_client: reqwest::Client::new(),
        })
    }

    #[tokio::test]
    async fn reviews_with_profiles_writes_basic_and_users_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cyberpunk.txt");
        let processor = processor(
            &dir.path().join("data"),
            &["reviews", "--game", "cyberpunk-2077", "--profiles"],
        );
        let source = CannedPages::new(vec![
            (200, reviews_page(&[review(1, "Alice", "9"), review(2, "Bob", "2")])),
            (200, empty_reviews_page()),
            (200, profile_page("120", "4")),
            (200, profile_page("3", "0")),
        ]);
        let scraper = ReviewScraper::new(&source, throttle(0)).unwrap();

        processor
            .scrape_reviews(
                &scraper,
                Platform::Pc,
                "cyberpunk-2077",
                None,
                Some(output.as_path()),
                true,
            )
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "Alice\t9\nBob\t2\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("cyberpunk_users.txt")).unwrap(),
            "Alice\t9\t120\t4\nBob\t2\t3\t0\n"
        );
        assert!(dir.path().join("data").is_dir());
    }

    #[tokio::test]
    async fn reviews_default_to_timestamped_files_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path(), &["reviews", "--game", "returnal"]);
        let source = CannedPages::new(vec![
            (200, reviews_page(&[review(1, "Alice", "9")])),
            (200, empty_reviews_page()),
        ]);
        let scraper = ReviewScraper::new(&source, throttle(0)).unwrap();

        processor
            .scrape_reviews(&scraper, Platform::Playstation5, "returnal", None, None, false)
            .await
            .unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("returnal_playstation-5_basic_"));
    }

    #[tokio::test]
    async fn profiles_reads_basic_users_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("basic.txt");
        let output = dir.path().join("users.txt");
        fs::write(&input, "Alice\t9\nBob\t2\n").unwrap();
        let processor = processor(dir.path(), &["profiles", "--input", "basic.txt"]);
        let source = CannedPages::new(vec![
            (200, profile_page("1,200", "40")),
            (404, String::new()),
        ]);
        let scraper = ReviewScraper::new(&source, throttle(0)).unwrap();

        processor
            .scrape_profiles(&scraper, &input, Some(output.as_path()))
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "Alice\t9\t1200\t40\n");
    }

    #[tokio::test]
    async fn rate_reads_users_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("users.txt");
        fs::write(&input, "Alice\t9\t120\t4\nBob\t2\t0\t0\n").unwrap();

        let processor = processor(dir.path(), &["rate", "--input", input.to_str().unwrap()]);
        processor.run().await.unwrap();

        fs::write(&input, "Alice\tnine\t120\t4\n").unwrap();
        assert!(matches!(processor.run().await, Err(CriticError::Parse(_))));
    }

    #[tokio::test]
    async fn races_output_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("races.json");
        let output = dir.path().join("out").join("races.json");
        let races = json!({
            "race": [
                {"name": "Tiefling", "source": "PHB", "additionalSpells": [{
                    "innate": {"3": {"daily": {"1": ["hellish rebuke#2"]}}}
                }]},
                {"name": "Human", "source": "PHB"}
            ]
        });
        fs::write(&file, races.to_string()).unwrap();

        let processor = processor(
            dir.path(),
            &[
                "races",
                "--file",
                file.to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ],
        );
        processor.run().await.unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.as_array().unwrap().len(), 1);
        assert_eq!(written[0]["name"], "Tiefling");
        assert_eq!(written[0]["spells"], json!(["hellish rebuke"]));
    }

    #[tokio::test]
    async fn spells_output_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("spells.json");
        let output = dir.path().join("spells_out.json");
        let spells = json!({
            "spell": [
                {"name": "Light", "source": "PHB", "level": 0, "school": "V",
                 "range": {"type": "touch"}},
                {"name": "Homebrew Bolt", "source": "HB", "level": 1, "school": "V",
                 "range": {"type": "point"}}
            ]
        });
        fs::write(&file, spells.to_string()).unwrap();

        let processor = processor(
            dir.path(),
            &[
                "spells",
                "--file",
                file.to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ],
        );
        processor.run().await.unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.as_array().unwrap().len(), 1);
        assert_eq!(written[0]["name"], "Light");
        assert_eq!(written[0]["school"], "Evocation");
    }

    #[test]
    fn users_file_sits_next_to_basic_output() {
        assert_eq!(
            users_path_beside(Path::new("out/cyberpunk.txt")),
            PathBuf::from("out/cyberpunk_users.txt")
        );
    }
}
