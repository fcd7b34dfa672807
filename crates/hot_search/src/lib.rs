pub mod models;

use async_trait::async_trait;
use common::{
    run_feed, Config, Crawler, CrawlerResult, Feed, HttpSession, OutputWriter, RunOutcome,
    RunStamp,
};
use models::HotSearchRecord;
use tracing::{error, info};

pub const TOP_SEARCH_URL: &str = "https://www.zhihu.com/api/v4/search/top_search";
pub const OUTPUT_CATEGORY: &str = "hotresearch";

pub struct HotSearchCrawler {
    session: HttpSession,
    feed: Feed,
    writer: OutputWriter,
    stamp: RunStamp,
}

impl HotSearchCrawler {
    pub fn new(config: &Config, stamp: RunStamp) -> CrawlerResult<Self> {
        let session = HttpSession::with_random_agent(config.retry.clone())?;
        Ok(Self::with_session(config, stamp, session, TOP_SEARCH_URL))
    }

    pub fn with_session(
        config: &Config,
        stamp: RunStamp,
        session: HttpSession,
        url: &str,
    ) -> Self {
        Self {
            session,
            feed: Feed {
                label: "hot search",
                url: url.to_string(),
                params: Vec::new(),
                records_pointer: "/top_search/words",
                timeout: config.timeout,
            },
            writer: OutputWriter::new(&config.output_root, OUTPUT_CATEGORY),
            stamp,
        }
    }
}

#[async_trait]
impl Crawler for HotSearchCrawler {
    async fn run(&self) -> RunOutcome {
        info!("{} crawler starting up", self.name());
        run_feed::<HotSearchRecord>(&self.session, &self.feed, &self.writer, &self.stamp).await
    }

    fn name(&self) -> &'static str {
        "Hot Search"
    }
}

pub async fn run_hot_search_crawler(config: Config, stamp: RunStamp) -> RunOutcome {
    match HotSearchCrawler::new(&config, stamp) {
        Ok(crawler) => crawler.run().await,
        Err(e) => {
            error!("Failed to build hot search crawler: {}", e);
            RunOutcome::NoData
        }
    }
}
