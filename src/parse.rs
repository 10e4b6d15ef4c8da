use log::debug;
use reqwest::Url;
use scraper::Html as Document;
use serde_json::Value;

use super::scan::Scanner;
use super::types::{Post, PostFilter};

const SITE_URL: &str = "https://news.ycombinator.com/";
const ROW_DELIMITER: &str = r#"<td align="right" valign="top" class="title">"#;
const DEAD_MARKER: &str = r#"<td class="title"> [dead] <a"#;

#[derive(Debug)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Decode entities and drop inline tags from a captured markup snippet.
///
/// Text nodes are trimmed and joined by single spaces, so markup line breaks
/// inside a title do not leak into the text.
fn fragment_text(raw: &str) -> String {
    let doc = Document::parse_fragment(raw);
    doc.root_element()
        .text()
        .fold(String::new(), |mut s, t| {
            let clean = t.trim();
            if !clean.is_empty() {
                s.push(' ');
                s.push_str(clean);
            }
            s
        })
        .trim()
        .to_string()
}

/// Parse the score span contents, e.g. `8044029">42 points`.
fn parse_points(raw: Option<&str>) -> u64 {
    let raw = match raw {
        Some(raw) => raw,
        None => return 0,
    };
    let text = match raw.find('>') {
        Some(idx) => &raw[idx + 1..],
        None => return 0,
    };
    strip_points_suffix(text).parse().unwrap_or(0)
}

/// Remove every case-insensitive occurrence of `" points"`.
fn strip_points_suffix(text: &str) -> String {
    const SUFFIX: &str = " points";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        let matches = rest
            .get(..SUFFIX.len())
            .map(|head| head.eq_ignore_ascii_case(SUFFIX))
            .unwrap_or(false);
        if matches {
            rest = &rest[SUFFIX.len()..];
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
    }
    out
}

fn parse_comment_count(raw: Option<&str>) -> u64 {
    match raw {
        None | Some("discuss") => 0,
        Some(text) => text
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .unwrap_or(0),
    }
}

// Compares the whole href, not its scheme prefix, so most rows end up
// classified as Ask. Kept as is until the classification rules are settled.
fn is_external_link(href: Option<&str>) -> bool {
    href.map(|href| href.eq_ignore_ascii_case("http"))
        .unwrap_or(false)
}

/// Parse a single listing row. Fields are read in markup order.
pub fn parse_row(html: &str) -> Post {
    let mut post = Post::default();
    if html.contains(DEAD_MARKER) {
        return post;
    }

    let mut scanner = Scanner::new(html);

    let href = scanner.scan_tag("<a href=\"", "\"");
    post.url = href.and_then(|href| Url::parse(href).ok());
    post.title = scanner.scan_tag(">", "</a>").map(fragment_text);
    post.points =
        parse_points(scanner.scan_tag("<span class=\"score\" id=\"score_", "</span>"));

    let username = scanner.scan_tag("<a href=\"user?id=", "\"");
    post.username = Some(username.unwrap_or("HN").to_string());
    post.post_id = scanner
        .scan_tag("<a href=\"item?id=", "\">")
        .map(String::from);
    post.pretty_time = scanner.scan_tag(">", "</a>").map(fragment_text);
    post.comments_count = parse_comment_count(scanner.scan_tag("\">", "</a>"));

    if username.is_none() && post.comments_count == 0 && post.post_id.is_none() {
        post.kind = Some(PostFilter::Jobs);
        post.username = Some("Jobs".to_string());
    } else if !is_external_link(href) {
        post.kind = Some(PostFilter::Ask);
        if let Some(href) = href {
            post.url = Url::parse(&format!("{}{}", SITE_URL, href)).ok();
        }
    } else {
        post.kind = Some(PostFilter::Default);
    }

    post
}

/// Split a listing page into rows and parse each of them.
pub fn parse_collection(html: &str) -> Vec<Post> {
    let posts: Vec<Post> = html.split(ROW_DELIMITER).skip(1).map(parse_row).collect();
    debug!("parsed {} listing rows", posts.len());
    posts
}

/// Parse an item object from the JSON API.
///
/// Items without a valid url are rejected.
pub fn parse_item(json: &Value) -> Result<Post, ParseError> {
    let obj = json
        .as_object()
        .ok_or_else(|| ParseError::new("Item is not a JSON object"))?;

    let url = obj
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::new("Item has no url"))?;
    let url = Url::parse(url)
        .map_err(|e| ParseError::new(format!("Invalid item url {:?}: {}", url, e)))?;

    let str_field = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);

    Ok(Post {
        id: obj.get("id").and_then(Value::as_u64),
        title: str_field("title"),
        username: str_field("by"),
        url: Some(url),
        comments_count: obj
            .get("descendants")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        kind: obj.get("type").and_then(Value::as_str).and_then(|ty| match ty {
            "job" => Some(PostFilter::Jobs),
            "story" => Some(PostFilter::Default),
            _ => None,
        }),
        kids: obj.get("kids").and_then(|kids| {
            kids.as_array()?
                .iter()
                .map(Value::as_u64)
                .collect::<Option<Vec<_>>>()
        }),
        score: obj.get("score").and_then(Value::as_i64),
        time: obj.get("time").and_then(Value::as_i64),
        dead: obj.get("dead").and_then(Value::as_bool).unwrap_or(false),
        ..Post::default()
    })
}

/// Parse the top stories id list.
pub fn parse_ids(json: &Value) -> Result<Vec<u64>, ParseError> {
    json.as_array()
        .ok_or_else(|| ParseError::new("Id list is not a JSON array"))?
        .iter()
        .map(|id| {
            id.as_u64()
                .ok_or_else(|| ParseError::new(format!("Invalid item id: {}", id)))
        })
        .collect()
}

impl Post {
    /// Build a post from one listing row fragment.
    pub fn from_html(html: &str) -> Self {
        parse_row(html)
    }

    /// Build a post from a JSON API item.
    pub fn from_json(json: &Value) -> Result<Self, ParseError> {
        parse_item(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Row markup in the legacy listing layout, starting right after the
    // row delimiter.
    const ROW: &str = concat!(
        r#"<span class="rank">1.</span></td><td><center><a id="up_8044029" "#,
        r#"href="vote?for=8044029&amp;dir=up"><div class="votearrow"></div></a></center></td>"#,
        r#"<td class="title"><a href="https://www.example.com/story">Rust &amp; You</a>"#,
        r#"<span class="comhead"> (example.com) </span></td></tr><tr><td colspan="2"></td>"#,
        r#"<td class="subtext"><span class="score" id="score_8044029">42 points</span> "#,
        r#"by <a href="user?id=dimillian">dimillian</a> "#,
        r#"<a href="item?id=8044029"><span class="age">3 hours ago</a> | "#,
        r#"<a href="item?id=8044029">12 comments</a></td></tr>"#,
    );

    const ASK_ROW: &str = concat!(
        r#"<span class="rank">2.</span></td><td class="title">"#,
        r#"<a href="item?id=8044100">Ask HN: Favourite crates?</a></td></tr><tr>"#,
        r#"<td class="subtext"><span class="score" id="score_8044100">7 Points</span> "#,
        r#"by <a href="user?id=antr">antr</a> "#,
        r#"<a href="item?id=8044100"><span class="age">1 hour ago</a> | "#,
        r#"<a href="item?id=8044100">discuss</a></td></tr>"#,
    );

    const JOB_ROW: &str = concat!(
        r#"<span class="rank">3.</span></td><td class="title">"#,
        r#"<a href="https://jobs.example.com/">Example is hiring</a></td></tr><tr>"#,
        r#"<td class="subtext">5 hours ago</td></tr>"#,
    );

    const DEAD_ROW: &str = concat!(
        r#"<span class="rank">4.</span></td>"#,
        r#"<td class="title"> [dead] <a href="https://spam.example.com/">Spam</a></td>"#,
        r#"<td class="subtext"><span class="score" id="score_1">1 point</span> "#,
        r#"by <a href="user?id=spammer">spammer</a></td>"#,
    );

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_parse_row() {
        init();
        let post = parse_row(ROW);

        assert_eq!(post.title.as_deref(), Some("Rust & You"));
        assert_eq!(post.points, 42);
        assert_eq!(post.username.as_deref(), Some("dimillian"));
        assert_eq!(post.post_id.as_deref(), Some("8044029"));
        assert_eq!(post.pretty_time.as_deref(), Some("3 hours ago"));
        assert_eq!(post.comments_count, 12);
        assert_eq!(post.id, None);
        assert_eq!(post.kids, None);

        // The href is never literally "http", so the row is treated as Ask.
        assert_eq!(post.kind, Some(PostFilter::Ask));
        assert_eq!(
            post.url.as_ref().map(Url::as_str),
            Some("https://news.ycombinator.com/https://www.example.com/story")
        );
    }

    #[test]
    fn test_relative_url_is_ask() {
        let post = parse_row(ASK_ROW);
        assert_eq!(post.kind, Some(PostFilter::Ask));
        assert_eq!(
            post.url.as_ref().map(Url::as_str),
            Some("https://news.ycombinator.com/item?id=8044100")
        );
        assert_eq!(post.points, 7);
        assert_eq!(post.comments_count, 0);
        assert_eq!(post.domain(), "news.ycombinator.com");
    }

    #[test]
    fn test_job_row() {
        let post = parse_row(JOB_ROW);
        assert_eq!(post.kind, Some(PostFilter::Jobs));
        assert_eq!(post.username.as_deref(), Some("Jobs"));
        assert_eq!(post.title.as_deref(), Some("Example is hiring"));
        assert_eq!(post.points, 0);
        assert_eq!(post.post_id, None);
        assert_eq!(post.domain(), "jobs.example.com");
    }

    #[test]
    fn test_author_defaults_to_hn() {
        let row = concat!(
            r#"<td class="title"><a href="item?id=5">Announcement</a></td>"#,
            r#"<a href="item?id=5"><span>2 days ago</a> <a href="item?id=5">3 comments</a>"#,
        );
        let post = parse_row(row);
        assert_eq!(post.username.as_deref(), Some("HN"));
        assert_eq!(post.post_id.as_deref(), Some("5"));
        assert_eq!(post.comments_count, 3);
        assert_eq!(post.kind, Some(PostFilter::Ask));
    }

    #[test]
    fn test_dead_row_is_empty() {
        let post = parse_row(DEAD_ROW);
        assert_eq!(post.title, None);
        assert_eq!(post.url, None);
        assert_eq!(post.username, None);
        assert_eq!(post.post_id, None);
        assert_eq!(post.points, 0);
        assert_eq!(post.comments_count, 0);
        assert_eq!(post.kind, None);
    }

    #[test]
    fn test_fragment_text() {
        assert_eq!(fragment_text("Show <b>HN</b>\n  today"), "Show HN today");
        assert_eq!(fragment_text("  plain  "), "plain");
        assert_eq!(fragment_text("&lt;tag&gt; &amp; more"), "<tag> & more");
    }

    #[test]
    fn test_points() {
        assert_eq!(parse_points(Some(r#"1">42 points"#)), 42);
        assert_eq!(parse_points(Some(r#"1">42 POINTS"#)), 42);
        assert_eq!(parse_points(Some(r#"1">1 point"#)), 0);
        assert_eq!(parse_points(Some("42 points")), 0);
        assert_eq!(parse_points(None), 0);
    }

    #[test]
    fn test_comment_count() {
        assert_eq!(parse_comment_count(Some("discuss")), 0);
        assert_eq!(parse_comment_count(Some("42")), 42);
        assert_eq!(parse_comment_count(Some("42&nbsp;comments")), 42);
        assert_eq!(parse_comment_count(Some("comments")), 0);
        assert_eq!(parse_comment_count(None), 0);
    }

    #[test]
    fn test_parse_collection() {
        let page = format!(
            "<html><body><table>{d}{}{d}{}{d}{}</table></body></html>",
            ROW,
            ASK_ROW,
            JOB_ROW,
            d = ROW_DELIMITER
        );
        let posts = parse_collection(&page);
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].post_id.as_deref(), Some("8044029"));
        assert_eq!(posts[1].post_id.as_deref(), Some("8044100"));
        assert_eq!(posts[2].kind, Some(PostFilter::Jobs));

        assert!(parse_collection("<html>no rows here</html>").is_empty());
    }

    #[test]
    fn test_parse_item() {
        let json = serde_json::json!({
            "by": "dhouston",
            "descendants": 71,
            "id": 8863,
            "kids": [8952, 9224, 8917],
            "score": 111,
            "time": 1175714200,
            "title": "My YC app: Dropbox - Throw away your USB drive",
            "type": "story",
            "url": "http://www.getdropbox.com/u/2/screencast.html"
        });
        let post = Post::from_json(&json).unwrap();

        assert_eq!(post.id, Some(8863));
        assert_eq!(post.username.as_deref(), Some("dhouston"));
        assert_eq!(post.comments_count, 71);
        assert_eq!(post.kids, Some(vec![8952, 9224, 8917]));
        assert_eq!(post.score, Some(111));
        assert_eq!(post.time, Some(1175714200));
        assert_eq!(post.kind, Some(PostFilter::Default));
        assert_eq!(post.domain(), "getdropbox.com");
        assert_eq!(post.dead, false);
        assert_eq!(post.post_id, None);
        assert_eq!(post.pretty_time, None);
    }

    #[test]
    fn test_parse_item_dead_flag() {
        let dead = serde_json::json!({ "id": 1, "url": "https://a.example", "dead": true });
        assert!(parse_item(&dead).unwrap().dead);

        let alive = serde_json::json!({ "id": 1, "url": "https://a.example", "dead": false });
        assert!(!parse_item(&alive).unwrap().dead);
    }

    #[test]
    fn test_parse_item_without_url_fails() {
        let json = serde_json::json!({ "id": 121003, "type": "story", "title": "Ask HN" });
        assert!(parse_item(&json).is_err());

        let json = serde_json::json!({ "id": 1, "url": "/relative" });
        assert!(parse_item(&json).is_err());

        assert!(parse_item(&serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn test_parse_ids() {
        let ids = parse_ids(&serde_json::json!([9129911, 9129199, 9127761])).unwrap();
        assert_eq!(ids, vec![9129911, 9129199, 9127761]);
        assert!(parse_ids(&serde_json::json!({ "ids": [] })).is_err());
        assert!(parse_ids(&serde_json::json!([1, "two"])).is_err());
    }
}
