use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{CrawlerError, CrawlerResult};
use crate::fetcher::fetch;
use crate::http::HttpSession;
use crate::writer::{OutputWriter, RunStamp};

#[async_trait]
pub trait Crawler: Send + Sync {
    async fn run(&self) -> RunOutcome;
    fn name(&self) -> &'static str;
}

/// One upstream record turned into one output line.
pub trait FeedRecord: Sized {
    fn from_raw(raw: &Value) -> CrawlerResult<Self>;
    fn to_line(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Written { path: PathBuf, lines: usize },
    NoData,
    WriteFailed,
}

impl RunOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, RunOutcome::Written { .. })
    }
}

/// Where a feed lives and how to ask for it.
#[derive(Debug, Clone)]
pub struct Feed {
    pub label: &'static str,
    pub url: String,
    pub params: Vec<(&'static str, &'static str)>,
    /// JSON pointer to the record array, e.g. `/data`.
    pub records_pointer: &'static str,
    pub timeout: Duration,
}

impl Feed {
    fn query(&self) -> Option<Vec<(&str, &str)>> {
        if self.params.is_empty() {
            None
        } else {
            Some(self.params.iter().map(|(k, v)| (*k, *v)).collect())
        }
    }
}

/// Maps records to lines in source order, dropping the ones that fail.
pub fn extract_lines<R: FeedRecord>(raw: &[Value]) -> Vec<String> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, item)| match R::from_raw(item) {
            Ok(record) => Some(record.to_line()),
            Err(e) => {
                warn!("Skipping malformed record #{}: {}", index, e);
                None
            }
        })
        .collect()
}

pub async fn run_feed<R: FeedRecord>(
    session: &HttpSession,
    feed: &Feed,
    writer: &OutputWriter,
    stamp: &RunStamp,
) -> RunOutcome {
    let params = feed.query();
    let raw = fetch(
        session,
        &feed.url,
        params.as_deref(),
        session.headers(),
        feed.timeout,
        feed.records_pointer,
    )
    .await;

    if raw.is_empty() {
        info!("No {} data fetched, nothing written", feed.label);
        return RunOutcome::NoData;
    }

    let lines = extract_lines::<R>(&raw);
    if lines.is_empty() {
        warn!(
            "All {} fetched {} records were malformed, nothing written",
            raw.len(),
            feed.label
        );
        return RunOutcome::NoData;
    }

    match writer.write(&lines, stamp) {
        Ok(path) => {
            info!(
                "Wrote {} {} entries to {}",
                lines.len(),
                feed.label,
                path.display()
            );
            RunOutcome::Written {
                path,
                lines: lines.len(),
            }
        }
        Err(e) => {
            error!(
                "Failed to write {}: {}",
                writer.output_path(stamp).display(),
                e
            );
            RunOutcome::WriteFailed
        }
    }
}

/// Looks up `path` (dot separated) in `value`. The error names the first
/// missing segment.
pub fn require<'a>(value: &'a Value, path: &str) -> CrawlerResult<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map
                .get(segment)
                .ok_or_else(|| CrawlerError::MissingField(segment.to_string()))?,
            other => return Err(CrawlerError::InvalidRecord(compact(other))),
        };
    }
    Ok(current)
}

/// Strings verbatim, everything else as compact JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shortened JSON for log messages.
fn compact(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 80 {
        let truncated: String = text.chars().take(80).collect();
        format!("{truncated}...")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Named(String);

    impl FeedRecord for Named {
        fn from_raw(raw: &Value) -> CrawlerResult<Self> {
            Ok(Named(render(require(raw, "name")?)))
        }

        fn to_line(&self) -> String {
            self.0.clone()
        }
    }

    #[test]
    fn test_require_nested_path() {
        let value = json!({"target": {"id": 42}});
        assert_eq!(require(&value, "target.id").unwrap(), &json!(42));
    }

    #[test]
    fn test_require_names_missing_segment() {
        let value = json!({"target": {"id": 42}});
        match require(&value, "target.title") {
            Err(CrawlerError::MissingField(key)) => assert_eq!(key, "title"),
            other => panic!("unexpected {other:?}"),
        }
        match require(&value, "other.title") {
            Err(CrawlerError::MissingField(key)) => assert_eq!(key, "other"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_require_rejects_non_object() {
        let value = json!({"target": "flat"});
        assert!(matches!(
            require(&value, "target.id"),
            Err(CrawlerError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(render(&json!("text")), "text");
        assert_eq!(render(&json!(123)), "123");
        assert_eq!(render(&json!(true)), "true");
        assert_eq!(render(&json!(null)), "null");
        assert_eq!(render(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_extract_lines_skips_bad_records_in_order() {
        let raw = vec![
            json!({"name": "first"}),
            json!({"nope": 1}),
            json!("not an object"),
            json!({"name": "last"}),
        ];
        assert_eq!(extract_lines::<Named>(&raw), vec!["first", "last"]);
    }

    #[test]
    fn test_feed_query_empty_params() {
        let feed = Feed {
            label: "test",
            url: "http://localhost".into(),
            params: vec![],
            records_pointer: "/data",
            timeout: Duration::from_secs(1),
        };
        assert!(feed.query().is_none());

        let with_params = Feed {
            params: vec![("limit", "50")],
            ..feed
        };
        assert_eq!(with_params.query(), Some(vec![("limit", "50")]));
    }
}
