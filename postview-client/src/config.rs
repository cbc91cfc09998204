use std::time::Duration;

pub const DEFAULT_HOST: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base url of the server, posts are fetched from `{host}/api/posts`
    pub host: String,

    /// Timeout of a single request attempt
    pub timeout: Duration,

    /// How many times transient failures are retried
    pub max_retries: u32,

    /// Timezone used to compute week numbers, the host's local timezone if `None`
    pub timezone: Option<chrono_tz::Tz>,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> ClientConfig {
        ClientConfig {
            host: host.into(),
            ..ClientConfig::default()
        }
    }

    pub fn posts_url(&self) -> String {
        format!("{}/api/posts", self.host.trim_end_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            host: String::from(DEFAULT_HOST),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            timezone: None,
        }
    }
}
