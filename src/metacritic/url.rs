use crate::error::CriticError;
use std::fmt;
use std::str::FromStr;

pub const PREFIX: &str = "https://www.metacritic.com/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Pc,
    Playstation4,
    Playstation5,
    XboxOne,
    XboxSeriesX,
    Switch,
    Stadia,
    Ios,
}

impl Platform {
    pub const ALL: [Platform; 8] = [
        Platform::Pc,
        Platform::Playstation4,
        Platform::Playstation5,
        Platform::XboxOne,
        Platform::XboxSeriesX,
        Platform::Switch,
        Platform::Stadia,
        Platform::Ios,
    ];

    /// Path segment Metacritic uses for the platform.
    pub fn slug(&self) -> &'static str {
        match self {
            Platform::Pc => "pc",
            Platform::Playstation4 => "playstation-4",
            Platform::Playstation5 => "playstation-5",
            Platform::XboxOne => "xbox-one",
            Platform::XboxSeriesX => "xbox-series-x",
            Platform::Switch => "switch",
            Platform::Stadia => "stadia",
            Platform::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Platform {
    type Err = CriticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|platform| platform.slug() == s)
            .ok_or_else(|| CriticError::Parse(format!("Unknown platform: '{s}'")))
    }
}

/// Builds user reviews URLs, either a single one or an endless paginated sequence.
#[derive(Debug, Clone)]
pub struct UserReviewsUrlBuilder {
    base: String,
    is_paginated: bool,
}

impl UserReviewsUrlBuilder {
    const SUFFIX: &'static str = "user-reviews";
    const PAGESTR: &'static str = "?page=";

    pub fn new(middle: &str, is_paginated: bool) -> Self {
        Self {
            base: format!("{PREFIX}{middle}{}", Self::SUFFIX),
            is_paginated,
        }
    }

    /// Yields `?page=0`, `?page=1`, ... forever when paginated, otherwise the bare URL once.
    pub fn urls(&self) -> Box<dyn Iterator<Item = String> + '_> {
        if self.is_paginated {
            Box::new((0usize..).map(move |page| format!("{}{}{page}", self.base, Self::PAGESTR)))
        } else {
            Box::new(std::iter::once(self.base.clone()))
        }
    }
}

/// e.g. https://www.metacritic.com/game/pc/cyberpunk-2077/user-reviews?page=0
#[derive(Debug, Clone)]
pub struct GameUserReviewsUrlBuilder {
    pub platform: Platform,
    pub url_game_name: String,
    inner: UserReviewsUrlBuilder,
}

impl GameUserReviewsUrlBuilder {
    pub fn new(platform: Platform, url_game_name: &str, is_paginated: bool) -> Self {
        let middle = format!("game/{}/{url_game_name}/", platform.slug());
        Self {
            platform,
            url_game_name: url_game_name.to_string(),
            inner: UserReviewsUrlBuilder::new(&middle, is_paginated),
        }
    }

    pub fn urls(&self) -> Box<dyn Iterator<Item = String> + '_> {
        self.inner.urls()
    }
}

pub fn user_profile_url(name: &str) -> String {
    format!("{PREFIX}user/{name}")
}
