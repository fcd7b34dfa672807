use common::{render, require, CrawlerResult, FeedRecord};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotSearchRecord {
    pub query: String,
    /// Falls back to `query` when `display_query` is absent or null.
    pub display: String,
}

impl FeedRecord for HotSearchRecord {
    fn from_raw(raw: &Value) -> CrawlerResult<Self> {
        let query = render(require(raw, "query")?);
        let display = match raw.get("display_query") {
            Some(Value::Null) | None => query.clone(),
            Some(value) => render(value),
        };
        Ok(Self { query, display })
    }

    fn to_line(&self) -> String {
        format!("{}: {}", self.query, self.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::CrawlerError;
    use serde_json::json;

    #[test]
    fn test_display_defaults_to_query() {
        let record = HotSearchRecord::from_raw(&json!({"query": "a"})).unwrap();
        assert_eq!(record.to_line(), "a: a");

        let null_display =
            HotSearchRecord::from_raw(&json!({"query": "a", "display_query": null})).unwrap();
        assert_eq!(null_display.display, "a");
    }

    #[test]
    fn test_display_query_is_used_when_present() {
        let record =
            HotSearchRecord::from_raw(&json!({"query": "b", "display_query": "B!"})).unwrap();
        assert_eq!(record.to_line(), "b: B!");
    }

    #[test]
    fn test_missing_query_is_an_error() {
        match HotSearchRecord::from_raw(&json!({"display_query": "orphan"})) {
            Err(CrawlerError::MissingField(key)) => assert_eq!(key, "query"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        assert!(matches!(
            HotSearchRecord::from_raw(&json!(["query"])),
            Err(CrawlerError::InvalidRecord(_))
        ));
    }
}
