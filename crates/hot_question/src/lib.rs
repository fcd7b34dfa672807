pub mod models;

use async_trait::async_trait;
use common::{
    run_feed, Config, Crawler, CrawlerResult, Feed, HttpSession, OutputWriter, RunOutcome,
    RunStamp,
};
use models::HotListRecord;
use tracing::{error, info};

pub const HOT_LIST_URL: &str = "https://www.zhihu.com/api/v3/feed/topstory/hot-lists/total";
pub const OUTPUT_CATEGORY: &str = "hotquestion";

pub struct HotQuestionCrawler {
    session: HttpSession,
    feed: Feed,
    writer: OutputWriter,
    stamp: RunStamp,
}

impl HotQuestionCrawler {
    pub fn new(config: &Config, stamp: RunStamp) -> CrawlerResult<Self> {
        let session = HttpSession::with_random_agent(config.retry.clone())?;
        Ok(Self::with_session(config, stamp, session, HOT_LIST_URL))
    }

    /// Builds the crawler against another endpoint, e.g. a local mock.
    pub fn with_session(
        config: &Config,
        stamp: RunStamp,
        session: HttpSession,
        url: &str,
    ) -> Self {
        Self {
            session,
            feed: Feed {
                label: "hot list",
                url: url.to_string(),
                params: vec![("limit", "50"), ("desktop", "true")],
                records_pointer: "/data",
                timeout: config.timeout,
            },
            writer: OutputWriter::new(&config.output_root, OUTPUT_CATEGORY),
            stamp,
        }
    }
}

#[async_trait]
impl Crawler for HotQuestionCrawler {
    async fn run(&self) -> RunOutcome {
        info!("{} crawler starting up", self.name());
        run_feed::<HotListRecord>(&self.session, &self.feed, &self.writer, &self.stamp).await
    }

    fn name(&self) -> &'static str {
        "Hot List"
    }
}

pub async fn run_hot_question_crawler(config: Config, stamp: RunStamp) -> RunOutcome {
    match HotQuestionCrawler::new(&config, stamp) {
        Ok(crawler) => crawler.run().await,
        Err(e) => {
            error!("Failed to build hot list crawler: {}", e);
            RunOutcome::NoData
        }
    }
}
