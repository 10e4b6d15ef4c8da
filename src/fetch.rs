use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use failure::Error as DynErr;
use log::debug;

use super::config::Config;

/// JSON API resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonEndpoint {
    /// Ids of the current top stories.
    Top,
    /// A single item, addressed by id.
    Post,
}

impl JsonEndpoint {
    fn path(&self, resource: Option<&str>) -> String {
        match self {
            Self::Top => "topstories.json".to_string(),
            Self::Post => format!("item/{}.json", resource.unwrap_or_default()),
        }
    }
}

/// Source of raw payloads.
///
/// The cache lookups let a client hand out a stored payload before the
/// network result arrives. Implementations without a cache keep the
/// defaults.
pub trait Fetcher {
    /// Fetch a site page relative to the site root.
    fn fetch_html(&self, path: &str) -> Result<String, DynErr>;

    fn fetch_json(
        &self,
        endpoint: JsonEndpoint,
        resource: Option<&str>,
    ) -> Result<serde_json::Value, DynErr>;

    fn cached_html(&self, _path: &str) -> Option<String> {
        None
    }

    fn cached_json(
        &self,
        _endpoint: JsonEndpoint,
        _resource: Option<&str>,
    ) -> Option<serde_json::Value> {
        None
    }
}

/// Raw payloads of the most recently fetched urls.
///
/// Holds at most `capacity` entries; the oldest url is evicted first.
struct PayloadCache {
    capacity: usize,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl PayloadCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, url: &str) -> Option<&String> {
        self.entries.get(url)
    }

    fn insert(&mut self, url: String, body: String) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(url.clone(), body).is_some() {
            self.order.retain(|u| u != &url);
        }
        self.order.push_back(url);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Blocking HTTP fetcher that remembers the payloads of recently fetched
/// urls.
pub struct HttpFetcher {
    inner: reqwest::blocking::Client,
    config: Config,
    cache: Mutex<PayloadCache>,
}

impl HttpFetcher {
    pub fn new(config: Config) -> Result<Self, DynErr> {
        let inner = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let cache = Mutex::new(PayloadCache::new(config.cache_capacity));
        Ok(Self {
            inner,
            config,
            cache,
        })
    }

    fn html_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn json_url(&self, endpoint: JsonEndpoint, resource: Option<&str>) -> String {
        format!("{}{}", self.config.api_url, endpoint.path(resource))
    }

    fn get_text(&self, url: &str) -> Result<String, DynErr> {
        debug!("GET {}", url);
        let body = self.inner.get(url).send()?.error_for_status()?.text()?;
        if self.config.cache_enabled {
            if let Ok(mut cache) = self.cache.lock() {
                cache.insert(url.to_string(), body.clone());
            }
        }
        Ok(body)
    }

    fn cached_text(&self, url: &str) -> Option<String> {
        if !self.config.cache_enabled {
            return None;
        }
        let hit = self.cache.lock().ok()?.get(url).cloned();
        if hit.is_some() {
            debug!("cache hit for {}", url);
        }
        hit
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_html(&self, path: &str) -> Result<String, DynErr> {
        self.get_text(&self.html_url(path))
    }

    fn fetch_json(
        &self,
        endpoint: JsonEndpoint,
        resource: Option<&str>,
    ) -> Result<serde_json::Value, DynErr> {
        let body = self.get_text(&self.json_url(endpoint, resource))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn cached_html(&self, path: &str) -> Option<String> {
        self.cached_text(&self.html_url(path))
    }

    fn cached_json(
        &self,
        endpoint: JsonEndpoint,
        resource: Option<&str>,
    ) -> Option<serde_json::Value> {
        let body = self.cached_text(&self.json_url(endpoint, resource))?;
        serde_json::from_str(&body).ok()
    }
}
