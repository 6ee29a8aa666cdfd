//! The comment feed: the last fetched snapshot, the composer draft, and the
//! submit / like round trips.
//!
//! Every successful mutation is followed by a full reload. The server's list
//! is the only truth; nothing is patched locally. Overlapping reloads are not
//! coordinated, so whichever response is applied last is what gets shown.

use chrono::{DateTime, TimeZone};

use crate::api::{ApiResult, Comment, LikeResponse};
use crate::data::CommentService;
use crate::notify::Notifier;
use crate::render::{self, Node, FEED_ERROR_TEXT};
use crate::session::Session;

pub const EMPTY_COMMENT_MESSAGE: &str = "Comment cannot be empty";
pub const LOGIN_TO_LIKE_MESSAGE: &str = "Please log in before liking";

#[derive(Debug, Clone, Default)]
pub struct FeedController {
    snapshot: Vec<Comment>,
    load_error: Option<String>,
    draft: String,
}

impl FeedController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.snapshot
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn load_comments(&mut self, service: &dyn CommentService) -> bool {
        self.apply_snapshot(service.list())
    }

    /// Replaces the snapshot on success. On failure the previous snapshot is
    /// kept but the feed shows an inline error until the next good load.
    pub fn apply_snapshot(&mut self, result: ApiResult<Vec<Comment>>) -> bool {
        match result {
            Ok(comments) => {
                tracing::debug!(count = comments.len(), "comment snapshot loaded");
                self.snapshot = comments;
                self.load_error = None;
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "loading comments failed");
                self.load_error = Some(FEED_ERROR_TEXT.to_string());
                false
            }
        }
    }

    pub fn render<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Node
    where
        Tz::Offset: std::fmt::Display,
    {
        render::comment_feed(&self.snapshot, self.load_error.as_deref(), now)
    }

    pub fn render_composer(&self) -> Node {
        render::composer(&self.draft, self.char_count())
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft<S: Into<String>>(&mut self, text: S) {
        self.draft = text.into();
    }

    pub fn push_char(&mut self, ch: char) {
        self.draft.push(ch);
    }

    pub fn pop_char(&mut self) {
        self.draft.pop();
    }

    pub fn char_count(&self) -> usize {
        self.draft.chars().count()
    }

    /// Returns the trimmed draft to send, or `None` when it is blank.
    pub fn begin_submit(&self, notifier: &mut Notifier) -> Option<String> {
        let content = self.draft.trim();
        if content.is_empty() {
            notifier.error(EMPTY_COMMENT_MESSAGE);
            return None;
        }
        Some(content.to_string())
    }

    /// Applies the create response. `true` means a reload is due.
    pub fn finish_submit(&mut self, result: ApiResult<Comment>, notifier: &mut Notifier) -> bool {
        match result {
            Ok(comment) => {
                tracing::info!(id = comment.id, "comment posted");
                self.draft.clear();
                notifier.success("Comment posted!");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "posting comment failed");
                notifier.error(err.user_message("Failed to post comment"));
                false
            }
        }
    }

    /// Likes need a session. Returns false (after telling the viewer) when
    /// there is none.
    pub fn begin_like(session: &Session, notifier: &mut Notifier) -> bool {
        if session.is_logged_in() {
            return true;
        }
        notifier.info(LOGIN_TO_LIKE_MESSAGE);
        false
    }

    /// Applies the toggle response. `true` means a reload is due.
    pub fn finish_like(result: ApiResult<LikeResponse>, notifier: &mut Notifier) -> bool {
        match result {
            Ok(resp) => {
                if resp.liked {
                    notifier.success("Liked!");
                }
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "like toggle failed");
                notifier.error(err.user_message("Like failed"));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fake::{comment, FakeBackend};
    use crate::notify::Level;
    use chrono::Utc;

    #[test]
    fn blank_draft_is_rejected() {
        let mut feed = FeedController::new();
        let mut notifier = Notifier::default();
        for draft in ["", "   ", "\n\t "] {
            feed.set_draft(draft);
            assert!(feed.begin_submit(&mut notifier).is_none());
        }
        assert_eq!(notifier.current().unwrap().message, EMPTY_COMMENT_MESSAGE);
    }

    #[test]
    fn successful_submit_trims_and_clears() {
        let backend = FakeBackend::with_comments(Vec::new());
        let mut feed = FeedController::new();
        let mut notifier = Notifier::default();
        feed.set_draft("  hello there  ");
        assert_eq!(feed.char_count(), 15);

        let content = feed.begin_submit(&mut notifier).unwrap();
        assert_eq!(content, "hello there");
        assert!(feed.finish_submit(backend.create(&content), &mut notifier));

        assert_eq!(feed.draft(), "");
        assert_eq!(feed.char_count(), 0);
        assert_eq!(notifier.current().unwrap().message, "Comment posted!");
        let composer = feed.render_composer();
        let counter = composer
            .find_by_class("char-count")
            .first()
            .map(|el| Node::from((*el).clone()).text_content());
        assert_eq!(counter.as_deref(), Some("0"));
    }

    #[test]
    fn failed_submit_keeps_draft() {
        let backend = FakeBackend::with_comments(Vec::new());
        backend.reject_next("Please log in first");
        let mut feed = FeedController::new();
        let mut notifier = Notifier::default();
        feed.set_draft("hello");

        let content = feed.begin_submit(&mut notifier).unwrap();
        assert!(!feed.finish_submit(backend.create(&content), &mut notifier));

        assert_eq!(feed.draft(), "hello");
        let toast = notifier.current().unwrap();
        assert_eq!(toast.level, Level::Error);
        assert_eq!(toast.message, "Please log in first");
    }

    #[test]
    fn network_failure_on_submit_is_generic() {
        let backend = FakeBackend::with_comments(Vec::new());
        backend.break_next();
        let mut feed = FeedController::new();
        let mut notifier = Notifier::default();
        feed.set_draft("hello");
        let content = feed.begin_submit(&mut notifier).unwrap();
        feed.finish_submit(backend.create(&content), &mut notifier);
        assert_eq!(
            notifier.current().unwrap().message,
            crate::api::NETWORK_ERROR_MESSAGE
        );
    }

    #[test]
    fn like_requires_session() {
        let mut notifier = Notifier::default();
        assert!(!FeedController::begin_like(&Session::anonymous(), &mut notifier));
        assert_eq!(notifier.current().unwrap().message, LOGIN_TO_LIKE_MESSAGE);
        assert!(FeedController::begin_like(&Session::signed_in("bo"), &mut notifier));
    }

    #[test]
    fn like_toast_only_when_liked() {
        let backend = FakeBackend::with_comments(vec![comment(1, "amy", "hi")]);
        let mut notifier = Notifier::default();

        assert!(FeedController::finish_like(backend.toggle_like(1), &mut notifier));
        assert_eq!(notifier.current().unwrap().message, "Liked!");

        notifier.dismiss();
        assert!(FeedController::finish_like(backend.toggle_like(1), &mut notifier));
        assert!(notifier.current().is_none());

        backend.reject_next("Comment not found");
        assert!(!FeedController::finish_like(backend.toggle_like(1), &mut notifier));
        assert_eq!(notifier.current().unwrap().message, "Comment not found");
    }

    #[test]
    fn load_failure_keeps_snapshot_and_shows_error() {
        let backend = FakeBackend::with_comments(vec![comment(1, "amy", "hi")]);
        let mut feed = FeedController::new();
        assert!(feed.load_comments(backend.as_ref()));

        backend.break_next();
        assert!(!feed.load_comments(backend.as_ref()));
        assert_eq!(feed.comments().len(), 1);
        let now = Utc::now();
        assert_eq!(feed.render(&now).text_content(), FEED_ERROR_TEXT);

        assert!(feed.load_comments(backend.as_ref()));
        assert!(feed.load_error().is_none());
        assert_eq!(feed.render(&now).find_by_class("comment-item").len(), 1);
    }

    #[test]
    fn empty_then_one_comment() {
        let backend = FakeBackend::with_comments(Vec::new());
        let mut feed = FeedController::new();
        feed.load_comments(backend.as_ref());
        let now = Utc::now();
        let tree = feed.render(&now);
        assert_eq!(tree.text_content(), render::EMPTY_FEED_TEXT);

        backend
            .comments
            .lock()
            .unwrap()
            .push(comment(9, "amy", "<b>hi</b> & bye"));
        feed.load_comments(backend.as_ref());
        let now = Utc::now();
        let tree = feed.render(&now);
        let items = tree.find_by_class("comment-item");
        assert_eq!(items.len(), 1);
        let html = tree.to_html();
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt; &amp; bye"));
        assert!(html.contains("just now"));
    }

    #[test]
    fn last_applied_snapshot_wins() {
        let mut feed = FeedController::new();
        let older = vec![comment(1, "amy", "hi")];
        let mut newer = older.clone();
        newer[0].likes = 2;
        feed.apply_snapshot(Ok(newer));
        feed.apply_snapshot(Ok(older));
        assert_eq!(feed.comments()[0].likes, 0);
    }
}
