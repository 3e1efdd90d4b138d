use super::parse::{PageParser, ReviewsPage, UserPageParser, UserReviewsPageParser};
use super::url::{user_profile_url, GameUserReviewsUrlBuilder};
use super::{BasicUser, User};
use crate::error::{CriticError, Result};
use crate::utils::{countdown, percentage, random_delay};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Raw HTTP outcome, before any block or status handling.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    /// 403 and 429 are how Metacritic signals rate limiting.
    pub fn is_blocked(&self) -> bool {
        matches!(self.status, 403 | 429)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

impl PageSource for Client {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchedPage { status, body })
    }
}

#[derive(Debug, Clone)]
pub struct Throttle {
    /// Seconds, lower bound of the pause between requests.
    pub delay_min: f64,
    /// Seconds, upper bound of the pause between requests.
    pub delay_max: f64,
    pub max_retries: u32,
    pub block_cooldown: Duration,
}

pub struct ReviewScraper<S> {
    source: S,
    throttle: Throttle,
    reviews_parser: UserReviewsPageParser,
    user_parser: UserPageParser,
}

impl<S: PageSource> ReviewScraper<S> {
    pub fn new(source: S, throttle: Throttle) -> Result<Self> {
        info!("Created new review scraper");
        Ok(Self {
            source,
            throttle,
            reviews_parser: UserReviewsPageParser::new()?,
            user_parser: UserPageParser::new()?,
        })
    }

    async fn pause(&self) -> Result<()> {
        let delay = random_delay(
            &mut rand::thread_rng(),
            self.throttle.delay_min,
            self.throttle.delay_max,
        )?;
        debug!("Sleeping for {:?}", delay);
        tokio::time::sleep(delay).await;
        Ok(())
    }

    /// GET with a cool-down and retry whenever the response signals a block.
    async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            let page = self.source.fetch(url).await?;

            if page.is_blocked() {
                if attempts > self.throttle.max_retries {
                    return Err(CriticError::Blocked {
                        url: url.to_string(),
                        attempts,
                    });
                }
                warn!(
                    "Blocked on {} (status {}), cooling down for {:?} before retry {}/{}",
                    url,
                    page.status,
                    self.throttle.block_cooldown,
                    attempts,
                    self.throttle.max_retries
                );
                countdown(self.throttle.block_cooldown).await;
                continue;
            }

            if !page.is_success() {
                return Err(CriticError::Status {
                    url: url.to_string(),
                    status: page.status,
                });
            }

            return Ok(page.body);
        }
    }

    /// Walks the review pages until the sentinel page (or `max_pages`) is reached.
    ///
    /// A block that outlasts the retries ends the walk early with the users found so far.
    pub async fn scrape_user_reviews(
        &self,
        builder: &GameUserReviewsUrlBuilder,
        max_pages: Option<usize>,
    ) -> Result<Vec<BasicUser>> {
        info!(
            "Scraping user data from user reviews pages for game: '{}' ({}) started...",
            builder.url_game_name, builder.platform
        );

        let mut users = Vec::new();
        for (index, url) in builder.urls().enumerate() {
            if max_pages.is_some_and(|max| index >= max) {
                info!("Reached page limit of {}", index);
                break;
            }
            if index > 0 {
                self.pause().await?;
            }

            debug!("Fetching {}", url);
            let markup = match self.fetch(&url).await {
                Ok(markup) => markup,
                Err(e @ CriticError::Blocked { .. }) => {
                    warn!("{}, keeping {} users scraped so far", e, users.len());
                    break;
                }
                Err(e) => return Err(e),
            };

            match self.reviews_parser.parse(&markup)? {
                ReviewsPage::Exhausted => {
                    info!("No more reviews after page {}", index);
                    break;
                }
                ReviewsPage::Users(batch) if batch.is_empty() => {
                    warn!("Page {} has no reviews and no end marker, stopping", index);
                    break;
                }
                ReviewsPage::Users(batch) => {
                    info!("Users batch #{}: {} users", index + 1, batch.len());
                    debug!("{:#?}", batch);
                    users.extend(batch);
                }
            }
        }

        info!("Scraped {} user reviews", users.len());
        Ok(users)
    }

    /// Looks up each reviewer's profile. Users whose profile can't be read are skipped,
    /// and a block that outlasts the retries stops the walk.
    pub async fn scrape_users(&self, basics: Vec<BasicUser>) -> Result<Vec<User>> {
        let total = basics.len();
        let mut users = Vec::with_capacity(total);

        for (index, basic) in basics.into_iter().enumerate() {
            if index > 0 {
                self.pause().await?;
            }

            let url = user_profile_url(&basic.name);
            let markup = match self.fetch(&url).await {
                Ok(markup) => markup,
                Err(CriticError::Status { status, .. }) => {
                    warn!("Skipping '{}': profile returned {}", basic.name, status);
                    continue;
                }
                Err(e @ CriticError::Blocked { .. }) => {
                    warn!("{}, keeping {} of {} profiles", e, users.len(), total);
                    break;
                }
                Err(e) => return Err(e),
            };

            match self.user_parser.parse(&markup) {
                Ok(counts) => users.push(User::from_basic(
                    basic,
                    counts.ratings_count,
                    counts.reviews_count,
                )),
                Err(e) => warn!("Skipping '{}': {}", basic.name, e),
            }

            info!(
                "Profiles: {}/{} ({})",
                index + 1,
                total,
                percentage(index + 1, total, 2)
            );
        }

        Ok(users)
    }
}
