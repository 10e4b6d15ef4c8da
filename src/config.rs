use envconfig::Envconfig;

// Also the `HN_USER_AGENT` default below; attribute values must be literals.
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:69.0) Gecko/20100101 Firefox/69.0";

/// Client settings, readable from `HN_*` environment variables.
#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    /// Root of the HTML site. Must end with a slash.
    #[envconfig(from = "HN_BASE_URL", default = "https://news.ycombinator.com/")]
    pub base_url: String,
    /// Root of the JSON API. Must end with a slash.
    #[envconfig(from = "HN_API_URL", default = "https://hacker-news.firebaseio.com/v0/")]
    pub api_url: String,
    #[envconfig(
        from = "HN_USER_AGENT",
        default = "Mozilla/5.0 (X11; Linux x86_64; rv:69.0) Gecko/20100101 Firefox/69.0"
    )]
    pub user_agent: String,
    #[envconfig(from = "HN_TIMEOUT_SECS", default = "30")]
    pub timeout_secs: u64,
    /// Keep raw payloads in memory and replay them before network results.
    #[envconfig(from = "HN_CACHE_ENABLED", default = "true")]
    pub cache_enabled: bool,
    /// Number of urls whose payloads are kept.
    #[envconfig(from = "HN_CACHE_CAPACITY", default = "256")]
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://news.ycombinator.com/".to_string(),
            api_url: "https://hacker-news.firebaseio.com/v0/".to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout_secs: 30,
            cache_enabled: true,
            cache_capacity: 256,
        }
    }
}
