use std::time::Duration;

use async_trait::async_trait;
use http::Extensions;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use tracing::warn;

use crate::error::{CrawlerError, CrawlerResult};
use crate::retry::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36";

pub const USER_AGENTS: &[&str] = &[
    DEFAULT_USER_AGENT,
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0",
];

/// Picks one agent from `pool`. An empty pool yields [`DEFAULT_USER_AGENT`].
pub fn pick_user_agent<R: Rng + ?Sized>(pool: &[&str], rng: &mut R) -> String {
    pool.choose(rng).copied().unwrap_or(DEFAULT_USER_AGENT).to_string()
}

/// Re-issues a request on transient transport failures and on retryable
/// statuses until the policy's attempt budget is spent. The final response
/// may still carry a non-success status.
pub struct RetryMiddleware {
    policy: RetryPolicy,
}

impl RetryMiddleware {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    fn exhausted(attempts: u32, reason: String) -> reqwest_middleware::Error {
        reqwest_middleware::Error::Middleware(anyhow::Error::new(
            CrawlerError::RetriesExhausted { attempts, reason },
        ))
    }
}

#[async_trait]
impl Middleware for RetryMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        if !self.policy.allows_method(req.method()) {
            return next.run(req, extensions).await;
        }

        let max_attempts = self.policy.max_attempts;
        let mut attempt: u32 = 1;

        loop {
            // Bodies that cannot be replayed get a single attempt.
            let Some(duplicate) = req.try_clone() else {
                return next.run(req, extensions).await;
            };

            let delay = match next.clone().run(duplicate, extensions).await {
                Ok(response) if self.policy.is_retryable_status(response.status()) => {
                    if attempt >= max_attempts {
                        let reason = format!("last status {}", response.status());
                        return Err(Self::exhausted(attempt, reason));
                    }
                    let delay = self
                        .policy
                        .retry_after(&response)
                        .unwrap_or_else(|| self.policy.backoff(attempt));
                    warn!(
                        "{} {} returned {} (attempt {}/{}, retrying in {:?})",
                        req.method(),
                        req.url(),
                        response.status(),
                        attempt,
                        max_attempts,
                        delay
                    );
                    delay
                }
                Ok(response) => return Ok(response),
                Err(reqwest_middleware::Error::Reqwest(e)) if is_transient(&e) => {
                    if attempt >= max_attempts {
                        return Err(Self::exhausted(attempt, e.to_string()));
                    }
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "{} {} failed: {} (attempt {}/{}, retrying in {:?})",
                        req.method(),
                        req.url(),
                        e,
                        attempt,
                        max_attempts,
                        delay
                    );
                    delay
                }
                Err(e) => return Err(e),
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// A reqwest client with [`RetryMiddleware`] in front of it. Works for both
/// `http` and `https` URLs; each call to [`HttpSession::send`] is one
/// logical request.
#[derive(Clone)]
pub struct HttpSession {
    client: ClientWithMiddleware,
    headers: HeaderMap,
}

impl HttpSession {
    pub fn new(policy: RetryPolicy, user_agent: &str) -> CrawlerResult<Self> {
        let client = ClientBuilder::new(Client::builder().build()?)
            .with(RetryMiddleware::new(policy))
            .build();

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);

        Ok(Self { client, headers })
    }

    pub fn with_random_agent(policy: RetryPolicy) -> CrawlerResult<Self> {
        let user_agent = pick_user_agent(USER_AGENTS, &mut rand::thread_rng());
        Self::new(policy, &user_agent)
    }

    /// Headers chosen when the session was built (User-Agent).
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub async fn get(
        &self,
        url: &str,
        params: Option<&[(&str, &str)]>,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> CrawlerResult<Response> {
        self.send(Method::GET, url, params, headers, timeout).await
    }

    pub async fn send(
        &self,
        method: Method,
        url: &str,
        params: Option<&[(&str, &str)]>,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> CrawlerResult<Response> {
        let mut request = self
            .client
            .request(method, url)
            .headers(headers.clone())
            .timeout(timeout);
        if let Some(params) = params {
            request = request.query(params);
        }
        Ok(request.send().await?)
    }
}
