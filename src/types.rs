use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Listing a post was found on, or the category it was classified as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PostFilter {
    Top,
    Default,
    Ask,
    New,
    Jobs,
    Best,
    Show,
}

impl PostFilter {
    /// Site path of the listing. The front page is the empty path.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Top => "",
            Self::Default => "default",
            Self::Ask => "ask",
            Self::New => "newest",
            Self::Jobs => "jobs",
            Self::Best => "best",
            Self::Show => "show",
        }
    }
}

/// A story or listing item.
///
/// Posts scraped from the site carry `post_id` and `pretty_time`, posts
/// loaded from the JSON API carry `id`, `kids`, `score` and `time`.
///
/// Two posts are equal when they share a `post_id`. Posts without one never
/// compare equal, not even to themselves.
#[derive(Clone, Debug, Default)]
pub struct Post {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub username: Option<String>,
    pub url: Option<Url>,
    pub points: u64,
    pub comments_count: u64,
    pub post_id: Option<String>,
    pub pretty_time: Option<String>,
    pub upvote_url: Option<String>,
    pub kind: Option<PostFilter>,
    pub kids: Option<Vec<u64>>,
    pub score: Option<i64>,
    pub time: Option<i64>,
    pub dead: bool,
}

impl Post {
    /// Host of the post url without a leading `www.`.
    pub fn domain(&self) -> String {
        let host = match self.url.as_ref().and_then(|url| url.host_str()) {
            Some(host) => host,
            None => return String::new(),
        };
        if host.starts_with("www") {
            host.get(4..).unwrap_or("").to_string()
        } else {
            host.to_string()
        }
    }

    /// Flat key/value form used for local caching.
    pub fn encode(&self) -> serde_json::Value {
        let record = PostRecord {
            title: self.title.clone(),
            username: self.username.clone(),
            url: self.url.as_ref().map(|url| url.to_string()),
            points: self.points,
            comments_count: self.comments_count,
            post_id: self.post_id.clone(),
            pretty_time: self.pretty_time.clone(),
            upvote_url: self.upvote_url.clone(),
        };
        // A struct of strings and integers always serializes.
        serde_json::to_value(record).unwrap_or(serde_json::Value::Null)
    }

    /// Restore a post from the form written by [Post::encode].
    ///
    /// Keys that are missing keep their default. A stored url that no longer
    /// parses is dropped.
    pub fn decode(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let record = PostRecord::deserialize(value)?;
        Ok(Self {
            title: record.title,
            username: record.username,
            url: record.url.and_then(|raw| Url::parse(&raw).ok()),
            points: record.points,
            comments_count: record.comments_count,
            post_id: record.post_id,
            pretty_time: record.pretty_time,
            upvote_url: record.upvote_url,
            ..Self::default()
        })
    }
}

impl PartialEq for Post {
    fn eq(&self, other: &Self) -> bool {
        match (&self.post_id, &other.post_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct PostRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    points: u64,
    #[serde(rename = "commentsCount")]
    comments_count: u64,
    #[serde(rename = "postId", skip_serializing_if = "Option::is_none")]
    post_id: Option<String>,
    #[serde(rename = "prettyTime", skip_serializing_if = "Option::is_none")]
    pretty_time: Option<String>,
    #[serde(rename = "upvoteURL", skip_serializing_if = "Option::is_none")]
    upvote_url: Option<String>,
}
