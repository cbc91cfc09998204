use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

use crate::{
    api::{self, PostsResponse, RawPost},
    ClientConfig,
};

/// Where the post collection comes from
#[async_trait]
pub trait PostSource {
    async fn fetch_posts(&self) -> anyhow::Result<Vec<RawPost>>;
}

#[async_trait]
impl<S: PostSource + Send + Sync + ?Sized> PostSource for &S {
    async fn fetch_posts(&self) -> anyhow::Result<Vec<RawPost>> {
        (**self).fetch_posts().await
    }
}

/// Fetches posts from a posts server over HTTP
///
/// Transient failures (connection errors, timeouts, 5xx answers) are
/// retried with an exponential backoff, up to `max_retries` times.
pub struct HttpPostSource {
    client: ClientWithMiddleware,
    url: String,
}

impl HttpPostSource {
    pub fn new(config: &ClientConfig) -> anyhow::Result<HttpPostSource> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("building http client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        Ok(HttpPostSource {
            client: ClientBuilder::new(client)
                .with(RetryTransientMiddleware::new_with_policy(retry_policy))
                .build(),
            url: config.posts_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PostSource for HttpPostSource {
    async fn fetch_posts(&self) -> anyhow::Result<Vec<RawPost>> {
        tracing::debug!(url = %self.url, "fetching posts");
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("sending request to {}", self.url))?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp
                .bytes()
                .await
                .with_context(|| format!("reading the {status} answer of {}", self.url))?;
            return Err(match api::Error::parse(&body) {
                Ok(err) => anyhow!("server answered {status}: {err}"),
                Err(_) => anyhow!("server answered {status}"),
            });
        }
        let resp: PostsResponse = resp
            .json()
            .await
            .with_context(|| format!("parsing posts answered by {}", self.url))?;
        for m in resp.messages.iter() {
            tracing::debug!("server says: {m}");
        }
        Ok(resp.data)
    }
}
