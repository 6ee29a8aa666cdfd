//! Platform-neutral view trees.
//!
//! Every screen region is produced by a pure function returning a [`Node`].
//! Text is stored raw and only escaped when a tree is serialized, so the
//! terminal front end and the HTML output share one source of truth.

use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};

use crate::api::{Comment, GalleryImage, Video};
use crate::notify::Toast;
use crate::timefmt;

pub const EMPTY_FEED_TEXT: &str = "No comments yet, be the first to leave one!";
pub const FEED_ERROR_TEXT: &str = "Failed to load comments, please refresh and retry";

const VOID_TAGS: [&str; 3] = ["img", "input", "br"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr<V: Into<String>>(mut self, name: &'static str, value: V) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn class<V: Into<String>>(self, value: V) -> Self {
        self.attr("class", value)
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn text<S: Into<String>>(self, text: S) -> Self {
        self.child(Node::Text(text.into()))
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Node {
    /// Concatenated raw text of the subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Depth-first search for elements carrying `class`.
    pub fn find_by_class<'a>(&'a self, class: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.walk_class(class, &mut found);
        found
    }

    fn walk_class<'a>(&'a self, class: &str, found: &mut Vec<&'a Element>) {
        if let Node::Element(element) = self {
            if element.has_class(class) {
                found.push(element);
            }
            for child in &element.children {
                child.walk_class(class, found);
            }
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_html(self, &mut out);
        out
    }
}

fn write_html(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape_html(text)),
        Node::Element(element) => {
            out.push('<');
            out.push_str(element.tag);
            for (name, value) in &element.attrs {
                let _ = write!(out, " {name}=\"{}\"", escape_html(value));
            }
            out.push('>');
            if VOID_TAGS.contains(&element.tag) {
                return;
            }
            for child in &element.children {
                write_html(child, out);
            }
            let _ = write!(out, "</{}>", element.tag);
        }
    }
}

/// Escapes text for both element content and quoted attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn comment_feed<Tz: TimeZone>(
    comments: &[Comment],
    load_error: Option<&str>,
    now: &DateTime<Tz>,
) -> Node
where
    Tz::Offset: std::fmt::Display,
{
    let list = Element::new("div")
        .attr("id", "commentsList")
        .class("comments-list");

    if let Some(message) = load_error {
        return list
            .child(Element::new("p").class("comments-error").text(message))
            .into();
    }
    if comments.is_empty() {
        return list
            .child(Element::new("p").class("comments-empty").text(EMPTY_FEED_TEXT))
            .into();
    }
    list.children(comments.iter().map(|comment| comment_item(comment, now)))
        .into()
}

pub fn comment_item<Tz: TimeZone>(comment: &Comment, now: &DateTime<Tz>) -> Element
where
    Tz::Offset: std::fmt::Display,
{
    let like_class = if comment.liked { "like liked" } else { "like" };
    let header = Element::new("div")
        .class("comment-header")
        .child(
            Element::new("span")
                .class("comment-author")
                .text(comment.username.as_str()),
        )
        .child(
            Element::new("span")
                .class("comment-time")
                .text(timefmt::format_relative(comment.created_at, now)),
        );
    let actions = Element::new("div")
        .class("comment-actions")
        .child(
            Element::new("button")
                .class(like_class)
                .attr("data-action", "like")
                .attr("data-id", comment.id.to_string())
                .text(format!("♥ {}", comment.likes)),
        )
        .child(
            Element::new("button")
                .class("reply")
                .attr("data-action", "reply")
                .text("Reply"),
        );

    Element::new("div")
        .class("comment-item")
        .attr("data-id", comment.id.to_string())
        .child(
            Element::new("div")
                .class("comment-content")
                .child(header)
                .child(
                    Element::new("p")
                        .class("comment-text")
                        .text(comment.content.as_str()),
                )
                .child(actions),
        )
}

pub fn composer(draft: &str, char_count: usize) -> Node {
    Element::new("div")
        .class("comment-form")
        .child(
            Element::new("textarea")
                .attr("id", "commentContent")
                .attr("placeholder", "Leave a message...")
                .text(draft),
        )
        .child(
            Element::new("div")
                .class("comment-form-footer")
                .child(
                    Element::new("span")
                        .attr("id", "charCount")
                        .class("char-count")
                        .text(char_count.to_string()),
                )
                .child(
                    Element::new("button")
                        .class("submit")
                        .attr("data-action", "submit")
                        .text("Post"),
                ),
        )
        .into()
}

pub fn video_grid(videos: &[Video]) -> Node {
    Element::new("div")
        .attr("id", "videosGrid")
        .class("videos-grid")
        .children(videos.iter().map(video_card))
        .into()
}

pub fn video_card(video: &Video) -> Element {
    let thumbnail = Element::new("div")
        .class("video-thumbnail")
        .child(
            Element::new("img")
                .attr("src", video.pic.as_str())
                .attr("alt", video.title.as_str())
                .attr("referrerpolicy", "no-referrer"),
        )
        .child(
            Element::new("span")
                .class("video-duration")
                .text(video.duration.as_str()),
        );
    let info = Element::new("div")
        .class("video-info")
        .child(
            Element::new("h3")
                .class("video-title")
                .text(video.title.as_str()),
        )
        .child(
            Element::new("div")
                .class("video-meta")
                .child(
                    Element::new("span")
                        .class("video-views")
                        .text(format!("{} views", video.views)),
                )
                .child(
                    Element::new("span")
                        .class("video-date")
                        .text(video.date.as_str()),
                ),
        );

    Element::new("a")
        .class("video-card-link")
        .attr("href", video.url())
        .attr("target", "_blank")
        .child(
            Element::new("div")
                .class("video-card")
                .child(thumbnail)
                .child(info),
        )
}

pub fn gallery_grid(images: &[GalleryImage]) -> Node {
    Element::new("div")
        .class("gallery-grid")
        .children(images.iter().enumerate().map(|(index, image)| {
            let class = if index == 0 {
                "gallery-item large"
            } else {
                "gallery-item"
            };
            Element::new("div")
                .class(class)
                .attr("data-src", image.src.as_str())
                .child(
                    Element::new("img")
                        .attr("src", image.src.as_str())
                        .attr("alt", image.title.as_str())
                        .attr("loading", "lazy")
                        .attr("referrerpolicy", "no-referrer"),
                )
        }))
        .into()
}

pub fn avatar(url: Option<&str>, name: &str) -> Node {
    let holder = Element::new("div").class("profile-placeholder");
    match url.filter(|url| !url.trim().is_empty()) {
        Some(url) => holder
            .child(
                Element::new("img")
                    .attr("src", url)
                    .attr("alt", name)
                    .attr("referrerpolicy", "no-referrer"),
            )
            .into(),
        None => holder.into(),
    }
}

pub fn auth_bar(user: Option<&str>) -> Node {
    match user {
        Some(name) => Element::new("div")
            .class("user-info")
            .child(Element::new("span").attr("id", "username").text(name))
            .child(
                Element::new("button")
                    .class("logout")
                    .attr("data-action", "logout")
                    .text("Log out"),
            )
            .into(),
        None => Element::new("div")
            .class("auth-buttons")
            .child(
                Element::new("button")
                    .class("login")
                    .attr("data-action", "login")
                    .text("Log in"),
            )
            .child(
                Element::new("button")
                    .class("register")
                    .attr("data-action", "register")
                    .text("Sign up"),
            )
            .into(),
    }
}

pub fn toast(toast: &Toast) -> Node {
    Element::new("div")
        .class(format!("notification notification-{}", toast.level.as_str()))
        .child(
            Element::new("span")
                .class("notification-icon")
                .text(toast.level.icon()),
        )
        .child(
            Element::new("span")
                .class("notification-text")
                .text(toast.message.as_str()),
        )
        .into()
}

/// A labelled form field. Password values are never echoed into the tree.
pub struct Field<'a> {
    pub name: &'static str,
    pub label: &'static str,
    pub value: &'a str,
    pub secret: bool,
}

pub fn form_modal(id: &'static str, title: &str, fields: &[Field<'_>], active: usize) -> Node {
    let rows = fields.iter().enumerate().map(|(index, field)| {
        let class = if index == active {
            "form-group active"
        } else {
            "form-group"
        };
        let input = Element::new("input")
            .attr("name", field.name)
            .attr("type", if field.secret { "password" } else { "text" });
        let input = if field.secret {
            input.attr("data-length", field.value.chars().count().to_string())
        } else {
            input.attr("value", field.value)
        };
        Element::new("div")
            .class(class)
            .child(Element::new("label").text(field.label))
            .child(input)
    });

    Element::new("div")
        .attr("id", id)
        .class("modal show")
        .child(
            Element::new("div")
                .class("modal-content")
                .child(Element::new("h2").text(title))
                .child(Element::new("form").children(rows)),
        )
        .into()
}

pub fn image_preview(src: &str) -> Node {
    Element::new("div")
        .class("image-modal")
        .child(Element::new("div").class("image-modal-overlay"))
        .child(
            Element::new("img")
                .attr("src", src)
                .attr("alt", "Preview")
                .attr("referrerpolicy", "no-referrer"),
        )
        .child(
            Element::new("button")
                .class("close-modal")
                .attr("data-action", "close")
                .text("×"),
        )
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample(content: &str) -> Comment {
        Comment {
            id: 1,
            username: "fan<1>".into(),
            content: content.into(),
            created_at: Utc::now(),
            likes: 3,
            liked: true,
        }
    }

    #[test]
    fn escapes_markup_in_comment_content() {
        let now = Utc::now();
        let html = comment_feed(&[sample("<script>alert('x')</script> & more")], None, &now)
            .to_html();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
        assert!(html.contains("fan&lt;1&gt;"));
    }

    #[test]
    fn escapes_attribute_values() {
        let video = Video {
            bvid: "BV1\"onload=\"x".into(),
            title: "a\"b".into(),
            pic: "p.jpg".into(),
            duration: "1:00".into(),
            views: "10".into(),
            date: "2024-12-01".into(),
        };
        let html = video_grid(&[video]).to_html();
        assert!(html.contains("alt=\"a&quot;b\""));
        assert!(!html.contains("\"onload=\""));
    }

    #[test]
    fn empty_feed_shows_placeholder() {
        let now = Utc::now();
        let tree = comment_feed(&[], None, &now);
        assert!(tree.find_by_class("comment-item").is_empty());
        assert_eq!(tree.find_by_class("comments-empty").len(), 1);
        assert_eq!(tree.text_content(), EMPTY_FEED_TEXT);
    }

    #[test]
    fn load_error_replaces_list() {
        let now = Utc::now();
        let tree = comment_feed(&[sample("kept")], Some(FEED_ERROR_TEXT), &now);
        assert!(tree.find_by_class("comment-item").is_empty());
        assert_eq!(tree.text_content(), FEED_ERROR_TEXT);
    }

    #[test]
    fn like_control_reflects_state() {
        let now = Utc::now();
        let mut unliked = sample("hi");
        unliked.id = 2;
        unliked.liked = false;
        unliked.likes = 0;
        unliked.created_at = now - Duration::hours(2);
        let tree = comment_feed(&[sample("hi"), unliked], None, &now);
        let likes = tree.find_by_class("like");
        assert_eq!(likes.len(), 2);
        assert!(likes[0].has_class("liked"));
        assert!(!likes[1].has_class("liked"));
        assert_eq!(likes[1].get_attr("data-id"), Some("2"));
        let times = tree.find_by_class("comment-time");
        assert_eq!(Node::from(times[1].clone()).text_content(), "2 hours ago");
    }

    #[test]
    fn first_gallery_item_is_large() {
        let images = vec![
            GalleryImage {
                src: "a.jpg".into(),
                title: "A".into(),
            },
            GalleryImage {
                src: "b.jpg".into(),
                title: "B".into(),
            },
        ];
        let tree = gallery_grid(&images);
        let items = tree.find_by_class("gallery-item");
        assert_eq!(items.len(), 2);
        assert!(items[0].has_class("large"));
        assert!(!items[1].has_class("large"));
    }

    #[test]
    fn password_fields_are_not_echoed() {
        let fields = [
            Field {
                name: "username",
                label: "Username",
                value: "amy",
                secret: false,
            },
            Field {
                name: "password",
                label: "Password",
                value: "hunter22",
                secret: true,
            },
        ];
        let html = form_modal("loginModal", "Log in", &fields, 1).to_html();
        assert!(html.contains("value=\"amy\""));
        assert!(!html.contains("hunter22"));
        assert!(html.contains("data-length=\"8\""));
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let html = avatar(Some("a.jpg"), "Wang Han").to_html();
        assert_eq!(
            html,
            "<div class=\"profile-placeholder\"><img src=\"a.jpg\" alt=\"Wang Han\" referrerpolicy=\"no-referrer\"></div>"
        );
        assert_eq!(
            avatar(None, "x").to_html(),
            "<div class=\"profile-placeholder\"></div>"
        );
    }
}
