use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("request gave up after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("JSON decoding failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no array at `{field}`, response keys: {keys:?}")]
    Schema { field: String, keys: Vec<String> },

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("record is not an object: {0}")]
    InvalidRecord(String),

    #[error("HTTP middleware failed: {0}")]
    Middleware(anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CrawlerResult<T> = Result<T, CrawlerError>;

/// Errors raised inside the middleware stack travel as `anyhow::Error`;
/// ours are recovered so callers can still match on them.
impl From<reqwest_middleware::Error> for CrawlerError {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Reqwest(e) => CrawlerError::HttpRequest(e),
            reqwest_middleware::Error::Middleware(e) => e
                .downcast::<CrawlerError>()
                .unwrap_or_else(CrawlerError::Middleware),
        }
    }
}
