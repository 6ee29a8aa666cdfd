use chrono::{DateTime, TimeZone};

use crate::api::{ApiResult, AuthResponse, Comment, Credentials, LikeResponse, Registration};
use crate::data::Services;
use crate::feed::FeedController;
use crate::notify::Notifier;
use crate::profile::ProfileController;
use crate::render::{self, Element, Field, Node};
use crate::session::{LoginForm, RegisterForm, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    Login,
    Register,
    ImagePreview { src: String },
}

/// All client state for one viewer. Nothing lives in globals; the terminal
/// front end and `--dump-html` both drive this struct.
pub struct Page {
    pub session: Session,
    pub feed: FeedController,
    pub profile: ProfileController,
    pub notifier: Notifier,
    pub login_form: LoginForm,
    pub register_form: RegisterForm,
    modal: Option<Modal>,
    subject_name: String,
}

impl Page {
    pub fn new<S: Into<String>>(subject_name: S, notifier: Notifier) -> Self {
        Self {
            session: Session::anonymous(),
            feed: FeedController::new(),
            profile: ProfileController::new(),
            notifier,
            login_form: LoginForm::default(),
            register_form: RegisterForm::default(),
            modal: None,
            subject_name: subject_name.into(),
        }
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    /// Opening a modal replaces whatever is open.
    pub fn open_modal(&mut self, modal: Modal) {
        self.modal = Some(modal);
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    pub fn startup(&mut self, services: &Services) {
        self.session.check_status(services.auth.as_ref());
        self.profile.load_info(services.profile.as_ref());
        self.feed.load_comments(services.comments.as_ref());
        self.profile.load_gallery(services.profile.as_ref());
    }

    /// Returns the draft to post, or `None` (with a toast) when it is blank.
    pub fn begin_submit(&mut self) -> Option<String> {
        self.feed.begin_submit(&mut self.notifier)
    }

    /// Applies a create response. `true` means the feed should be reloaded.
    pub fn apply_posted(&mut self, result: ApiResult<Comment>) -> bool {
        self.feed.finish_submit(result, &mut self.notifier)
    }

    /// `false` means nothing may be sent; the login modal is opened instead.
    pub fn begin_like(&mut self) -> bool {
        if FeedController::begin_like(&self.session, &mut self.notifier) {
            return true;
        }
        self.open_modal(Modal::Login);
        false
    }

    /// Applies a like toggle. `true` means the feed should be reloaded.
    pub fn apply_liked(&mut self, result: ApiResult<LikeResponse>) -> bool {
        FeedController::finish_like(result, &mut self.notifier)
    }

    /// Login is not validated locally; whatever was typed is sent.
    pub fn begin_login(&self) -> Credentials {
        self.login_form.credentials()
    }

    /// Applies a login response. On success the form is cleared, the login
    /// modal closed, and `true` returned since liked flags depend on the viewer.
    pub fn apply_login(&mut self, result: ApiResult<AuthResponse>) -> bool {
        if !self.session.finish_login(result, &mut self.notifier) {
            return false;
        }
        self.login_form = LoginForm::default();
        if self.modal == Some(Modal::Login) {
            self.close_modal();
        }
        true
    }

    pub fn begin_register(&mut self) -> Option<Registration> {
        Session::begin_register(&self.register_form, &mut self.notifier)
    }

    /// Applies a registration response and reports whether it succeeded.
    /// Registering never reloads the feed.
    pub fn apply_register(&mut self, result: ApiResult<AuthResponse>) -> bool {
        if !self.session.finish_register(result, &mut self.notifier) {
            return false;
        }
        self.register_form.reset();
        if self.modal == Some(Modal::Register) {
            self.close_modal();
        }
        true
    }

    /// Applies a logout response. `true` means the feed should be reloaded.
    pub fn apply_logout(&mut self, result: ApiResult<()>) -> bool {
        self.session.finish_logout(result, &mut self.notifier)
    }

    pub fn render_modal(&self) -> Option<Node> {
        let modal = self.modal.as_ref()?;
        let node = match modal {
            Modal::Login => render::form_modal(
                "loginModal",
                "Log in",
                &[
                    Field {
                        name: "username",
                        label: "Username",
                        value: &self.login_form.username,
                        secret: false,
                    },
                    Field {
                        name: "password",
                        label: "Password",
                        value: &self.login_form.password,
                        secret: true,
                    },
                ],
                self.login_form.active_index(),
            ),
            Modal::Register => render::form_modal(
                "registerModal",
                "Sign up",
                &[
                    Field {
                        name: "username",
                        label: "Username",
                        value: &self.register_form.username,
                        secret: false,
                    },
                    Field {
                        name: "email",
                        label: "Email",
                        value: &self.register_form.email,
                        secret: false,
                    },
                    Field {
                        name: "password",
                        label: "Password",
                        value: &self.register_form.password,
                        secret: true,
                    },
                ],
                self.register_form.active_index(),
            ),
            Modal::ImagePreview { src } => render::image_preview(src),
        };
        Some(node)
    }

    pub fn render<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Node
    where
        Tz::Offset: std::fmt::Display,
    {
        let header = Element::new("header")
            .child(Element::new("h1").text(format!("{} Fan Page", self.subject_name)))
            .child(render::auth_bar(self.session.user()));
        let hero = Element::new("section")
            .class("hero")
            .child(self.profile.render_avatar(&self.subject_name));
        let videos = Element::new("section")
            .class("videos")
            .child(Element::new("h2").text("Videos"))
            .child(self.profile.render_videos());
        let gallery = Element::new("section")
            .class("gallery")
            .child(Element::new("h2").text("Gallery"))
            .child(self.profile.render_gallery());
        let comments = Element::new("section")
            .class("comments")
            .child(Element::new("h2").text("Comments"))
            .child(self.feed.render_composer())
            .child(self.feed.render(now));

        let mut body = Element::new("body")
            .child(header)
            .child(hero)
            .child(videos)
            .child(gallery)
            .child(comments);
        if let Some(modal) = self.render_modal() {
            body = body.child(modal);
        }
        if let Some(toast) = self.notifier.current() {
            body = body.child(render::toast(toast));
        }
        body.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GalleryImage, ProfileInfo};
    use crate::data::fake::{comment, FakeBackend};
    use crate::data::AuthService as _;
    use chrono::Utc;

    fn page() -> Page {
        Page::new("Wang Han", Notifier::default())
    }

    #[test]
    fn startup_loads_every_region() {
        let backend = FakeBackend::with_comments(vec![comment(1, "amy", "hi")]);
        *backend.user.lock().unwrap() = Some("amy".into());
        *backend.profile.lock().unwrap() = ProfileInfo {
            avatar: Some("me.jpg".into()),
            videos: Vec::new(),
        };
        *backend.gallery.lock().unwrap() = vec![GalleryImage {
            src: "a.jpg".into(),
            title: "A".into(),
        }];
        let mut page = page();
        page.startup(&backend.services());

        assert_eq!(page.session.user(), Some("amy"));
        assert_eq!(page.feed.comments().len(), 1);
        assert_eq!(page.profile.gallery().len(), 1);
        let html = page.render(&Utc::now()).to_html();
        assert!(html.contains("me.jpg"));
        assert!(html.contains("class=\"user-info\""));
    }

    #[test]
    fn anonymous_like_opens_login() {
        let mut page = page();
        assert!(!page.begin_like());
        assert_eq!(page.modal(), Some(&Modal::Login));
        let html = page.render(&Utc::now()).to_html();
        assert!(html.contains("id=\"loginModal\""));
        assert!(html.contains(crate::feed::LOGIN_TO_LIKE_MESSAGE));
    }

    #[test]
    fn signed_in_like_is_allowed() {
        let mut page = page();
        page.session = Session::signed_in("amy");
        assert!(page.begin_like());
        assert!(page.modal().is_none());
    }

    #[test]
    fn login_closes_modal_and_asks_for_reload() {
        let backend = FakeBackend::with_comments(Vec::new());
        let mut page = page();
        page.open_modal(Modal::Login);
        page.login_form.username = "bo".into();
        page.login_form.password = "secret".into();

        let result = backend.login(&page.begin_login());
        assert!(page.apply_login(result));

        assert!(page.modal().is_none());
        assert_eq!(page.login_form, LoginForm::default());
        assert_eq!(page.session.user(), Some("bo"));
    }

    #[test]
    fn failed_login_keeps_modal_open() {
        let backend = FakeBackend::with_comments(Vec::new());
        backend.reject_next("Wrong username or password");
        let mut page = page();
        page.open_modal(Modal::Login);
        page.login_form.username = "bo".into();
        let result = backend.login(&page.begin_login());
        assert!(!page.apply_login(result));
        assert_eq!(page.modal(), Some(&Modal::Login));
        assert_eq!(page.login_form.username, "bo");
    }

    #[test]
    fn register_resets_form() {
        let backend = FakeBackend::with_comments(Vec::new());
        let mut page = page();
        page.open_modal(Modal::Register);
        page.register_form.username = "bo".into();
        page.register_form.email = "bo@example.com".into();
        page.register_form.password = "secret1".into();

        let registration = page.begin_register().unwrap();
        assert!(page.apply_register(backend.register(&registration)));

        assert!(page.modal().is_none());
        assert!(page.register_form.username.is_empty());
        assert_eq!(page.session.user(), Some("bo"));
    }

    #[test]
    fn invalid_registration_keeps_modal() {
        let mut page = page();
        page.open_modal(Modal::Register);
        page.register_form.username = "bo".into();
        page.register_form.password = "short".into();
        assert!(page.begin_register().is_none());
        assert_eq!(page.modal(), Some(&Modal::Register));
    }

    #[test]
    fn logout_shows_auth_buttons() {
        let backend = FakeBackend::with_comments(Vec::new());
        let mut page = page();
        page.session = Session::signed_in("amy");
        assert!(page.apply_logout(backend.logout()));
        assert!(page.render(&Utc::now()).to_html().contains("auth-buttons"));
    }

    #[test]
    fn preview_modal_replaces_login() {
        let mut page = page();
        page.open_modal(Modal::Login);
        page.open_modal(Modal::ImagePreview {
            src: "a.jpg".into(),
        });
        let modal = page.render_modal().unwrap();
        assert_eq!(modal.find_by_class("image-modal").len(), 1);
        page.close_modal();
        assert!(page.render_modal().is_none());
    }

    #[test]
    fn toast_text_is_escaped() {
        let mut page = page();
        page.notifier.error("<img src=x onerror=alert(1)>");
        let html = page.render(&Utc::now()).to_html();
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
    }
}
