use common::{render, require, CrawlerResult, FeedRecord};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotListRecord {
    pub id: String,
    pub title: String,
    pub url: String,
}

impl FeedRecord for HotListRecord {
    fn from_raw(raw: &Value) -> CrawlerResult<Self> {
        let target = require(raw, "target")?;
        Ok(Self {
            id: render(require(target, "id")?),
            title: render(require(target, "title")?),
            url: render(require(target, "url")?),
        })
    }

    fn to_line(&self) -> String {
        format!("{}: {} — {}", self.id, self.title, self.url)
    }
}
