pub mod config;
pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod logging;
pub mod retry;
pub mod runner;
pub mod writer;

pub use config::Config;
pub use crawler::{
    extract_lines, render, require, run_feed, Crawler, Feed, FeedRecord, RunOutcome,
};
pub use error::{CrawlerError, CrawlerResult};
pub use fetcher::{fetch, try_fetch};
pub use http::{pick_user_agent, HttpSession, USER_AGENTS};
pub use logging::MemoryLog;
pub use retry::RetryPolicy;
pub use writer::{OutputWriter, RunStamp};
