//! Scraping Metacritic user reviews and reviewer profiles.

mod parse;
mod scrape;
mod url;
mod user;

pub use scrape::{PageSource, ReviewScraper, Throttle};
pub use url::{GameUserReviewsUrlBuilder, Platform};
pub use user::{rating_summary, BasicUser, User};
