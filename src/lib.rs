mod config;
mod fetch;
mod parse;
mod scan;
mod types;

use failure::Error as DynErr;
use log::{debug, warn};

pub use config::Config;
pub use fetch::{Fetcher, HttpFetcher, JsonEndpoint};
pub use parse::{parse_collection, ParseError};
pub use reqwest::Url;
pub use types::{Post, PostFilter};

/// Where a [Response] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// A previously stored payload. Not authoritative.
    Cache,
    Network,
}

/// One delivery of a request result.
#[derive(Debug)]
pub struct Response<T> {
    pub origin: Origin,
    pub result: Result<T, DynErr>,
}

impl<T> Response<T> {
    pub fn is_local(&self) -> bool {
        self.origin == Origin::Cache
    }
}

type LiveFetch<'a, T> = Box<dyn FnOnce() -> Result<T, DynErr> + 'a>;

/// Results of a single request: at most one cached value followed by the
/// network result.
///
/// The network request is only sent once the second item is pulled.
pub struct Responses<'a, T> {
    cached: Option<T>,
    live: Option<LiveFetch<'a, T>>,
}

impl<'a, T> Responses<'a, T> {
    fn new(cached: Option<T>, live: LiveFetch<'a, T>) -> Self {
        Self {
            cached,
            live: Some(live),
        }
    }

    /// Skip any cached value and wait for the network result.
    pub fn live(mut self) -> Result<T, DynErr> {
        match self.live.take() {
            Some(fetch) => fetch(),
            None => Err(failure::format_err!("Network result already consumed")),
        }
    }
}

impl<'a, T> Iterator for Responses<'a, T> {
    type Item = Response<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(value) = self.cached.take() {
            return Some(Response {
                origin: Origin::Cache,
                result: Ok(value),
            });
        }
        let fetch = self.live.take()?;
        Some(Response {
            origin: Origin::Network,
            result: fetch(),
        })
    }
}

/// Hackernews client.
///
/// Listings are scraped from the site, single items and the top story ids
/// come from the JSON API.
pub struct Client {
    fetcher: Box<dyn Fetcher>,
}

impl Client {
    /// Client with the default [Config].
    pub fn new() -> Result<Self, DynErr> {
        Self::with_config(Config::default())
    }

    /// Client configured from `HN_*` environment variables.
    pub fn from_env() -> Result<Self, DynErr> {
        use envconfig::Envconfig;
        Self::with_config(Config::init_from_env()?)
    }

    pub fn with_config(config: Config) -> Result<Self, DynErr> {
        Ok(Self::with_fetcher(HttpFetcher::new(config)?))
    }

    pub fn with_fetcher(fetcher: impl Fetcher + 'static) -> Self {
        Self {
            fetcher: Box::new(fetcher),
        }
    }

    fn html_request(&self, path: String) -> Responses<'_, Vec<Post>> {
        let cached = self.fetcher.cached_html(&path).map(|html| parse_collection(&html));
        Responses::new(
            cached,
            Box::new(move || {
                let html = self.fetcher.fetch_html(&path)?;
                Ok(parse_collection(&html))
            }),
        )
    }

    fn json_request<'a, T: 'a>(
        &'a self,
        endpoint: JsonEndpoint,
        resource: Option<String>,
        parse: fn(&serde_json::Value) -> Result<T, ParseError>,
    ) -> Responses<'a, T> {
        let cached = self
            .fetcher
            .cached_json(endpoint, resource.as_deref())
            .and_then(|json| match parse(&json) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Ignoring cached {:?} payload: {}", endpoint, e);
                    None
                }
            });
        Responses::new(
            cached,
            Box::new(move || {
                let json = self.fetcher.fetch_json(endpoint, resource.as_deref())?;
                parse(&json).map_err(Into::into)
            }),
        )
    }

    /// Get a page of a listing.
    pub fn posts(&self, filter: PostFilter, page: u64) -> Responses<'_, Vec<Post>> {
        self.html_request(format!("{}?p={}", filter.path(), page))
    }

    /// Get a page of the front page.
    pub fn top(&self, page: u64) -> Responses<'_, Vec<Post>> {
        self.posts(PostFilter::Top, page)
    }

    /// First page of a listing.
    pub fn first_posts(&self, filter: PostFilter) -> Responses<'_, Vec<Post>> {
        self.posts(filter, 1)
    }

    /// First page of a user's submissions.
    pub fn first_user_posts(&self, username: &str) -> Responses<'_, Vec<Post>> {
        self.user_posts(username, 1, None)
    }

    /// Get submissions of a user.
    ///
    /// Pass the `post_id` of the last post of the previous page to continue
    /// after it.
    pub fn user_posts(
        &self,
        username: &str,
        page: u64,
        last_post_id: Option<&str>,
    ) -> Responses<'_, Vec<Post>> {
        debug!("Loading submissions of {} (page {})", username, page);
        self.html_request(user_posts_path(username, last_post_id))
    }

    /// Get the ids of the current top stories.
    pub fn top_ids(&self) -> Responses<'_, Vec<u64>> {
        self.json_request(JsonEndpoint::Top, None, parse::parse_ids)
    }

    /// Get a single item from the JSON API.
    pub fn post(&self, id: u64) -> Responses<'_, Post> {
        self.json_request(JsonEndpoint::Post, Some(id.to_string()), parse::parse_item)
    }
}

fn user_posts_path(username: &str, last_post_id: Option<&str>) -> String {
    let mut path = format!("submitted?id={}", username);
    let next = last_post_id
        .and_then(|id| id.parse::<u64>().ok())
        .and_then(|id| id.checked_sub(1));
    if let Some(next) = next {
        path.push_str(&format!("&next={}", next));
    }
    path
}
