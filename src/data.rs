use std::sync::Arc;

use crate::api::{
    self, ApiResult, AuthResponse, Comment, Credentials, GalleryImage, LikeResponse, MeResponse,
    ProfileInfo, Registration,
};

pub trait AuthService: Send + Sync {
    fn status(&self) -> ApiResult<MeResponse>;
    fn login(&self, credentials: &Credentials) -> ApiResult<AuthResponse>;
    fn register(&self, registration: &Registration) -> ApiResult<AuthResponse>;
    fn logout(&self) -> ApiResult<()>;
}

pub trait CommentService: Send + Sync {
    fn list(&self) -> ApiResult<Vec<Comment>>;
    fn create(&self, content: &str) -> ApiResult<Comment>;
    fn toggle_like(&self, id: i64) -> ApiResult<LikeResponse>;
}

pub trait ProfileService: Send + Sync {
    fn load_info(&self) -> ApiResult<ProfileInfo>;
    fn load_gallery(&self) -> ApiResult<Vec<GalleryImage>>;
}

/// Everything the page needs from the backend, cheap to clone into worker
/// threads.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthService>,
    pub comments: Arc<dyn CommentService>,
    pub profile: Arc<dyn ProfileService>,
}

impl Services {
    pub fn from_client(client: Arc<api::Client>) -> Self {
        Self {
            auth: Arc::new(ApiAuthService::new(client.clone())),
            comments: Arc::new(ApiCommentService::new(client.clone())),
            profile: Arc::new(ApiProfileService::new(client)),
        }
    }
}

pub struct ApiAuthService {
    client: Arc<api::Client>,
}

impl ApiAuthService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl AuthService for ApiAuthService {
    fn status(&self) -> ApiResult<MeResponse> {
        self.client.me()
    }

    fn login(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        self.client.login(credentials)
    }

    fn register(&self, registration: &Registration) -> ApiResult<AuthResponse> {
        self.client.register(registration)
    }

    fn logout(&self) -> ApiResult<()> {
        self.client.logout()
    }
}

pub struct ApiCommentService {
    client: Arc<api::Client>,
}

impl ApiCommentService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for ApiCommentService {
    fn list(&self) -> ApiResult<Vec<Comment>> {
        self.client.comments()
    }

    fn create(&self, content: &str) -> ApiResult<Comment> {
        self.client.create_comment(content)
    }

    fn toggle_like(&self, id: i64) -> ApiResult<LikeResponse> {
        self.client.like_comment(id)
    }
}

pub struct ApiProfileService {
    client: Arc<api::Client>,
}

impl ApiProfileService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl ProfileService for ApiProfileService {
    fn load_info(&self) -> ApiResult<ProfileInfo> {
        self.client.profile()
    }

    fn load_gallery(&self) -> ApiResult<Vec<GalleryImage>> {
        self.client.gallery()
    }
}

/// In-memory backend used by unit tests. Records every call so tests can
/// assert which requests were (not) issued.
#[cfg(test)]
pub mod fake {
    use std::sync::Mutex;

    use chrono::Utc;
    use reqwest::StatusCode;

    use super::*;
    use crate::api::ApiError;

    #[derive(Default)]
    pub struct FakeBackend {
        pub comments: Mutex<Vec<Comment>>,
        pub calls: Mutex<Vec<String>>,
        pub user: Mutex<Option<String>>,
        pub reject_with: Mutex<Option<String>>,
        pub break_next: Mutex<bool>,
        pub profile: Mutex<ProfileInfo>,
        pub gallery: Mutex<Vec<GalleryImage>>,
    }

    impl FakeBackend {
        pub fn with_comments(comments: Vec<Comment>) -> Arc<Self> {
            let backend = Self::default();
            *backend.comments.lock().unwrap() = comments;
            Arc::new(backend)
        }

        pub fn services(self: &Arc<Self>) -> Services {
            Services {
                auth: self.clone(),
                comments: self.clone(),
                profile: self.clone(),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn reject_next(&self, message: &str) {
            *self.reject_with.lock().unwrap() = Some(message.to_string());
        }

        /// Next call fails the way an unreachable or garbled backend does.
        pub fn break_next(&self) {
            *self.break_next.lock().unwrap() = true;
        }

        fn record(&self, call: impl Into<String>) -> ApiResult<()> {
            self.calls.lock().unwrap().push(call.into());
            if std::mem::take(&mut *self.break_next.lock().unwrap()) {
                return Err(ApiError::Decode {
                    context: "fake backend",
                    source: serde_json::from_str::<i64>("<html>").unwrap_err(),
                });
            }
            match self.reject_with.lock().unwrap().take() {
                Some(message) => Err(ApiError::Backend {
                    status: StatusCode::BAD_REQUEST,
                    message: Some(message),
                }),
                None => Ok(()),
            }
        }
    }

    pub fn comment(id: i64, username: &str, content: &str) -> Comment {
        Comment {
            id,
            username: username.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            likes: 0,
            liked: false,
        }
    }

    impl AuthService for FakeBackend {
        fn status(&self) -> ApiResult<MeResponse> {
            self.record("GET /api/me")?;
            let user = self.user.lock().unwrap().clone();
            Ok(MeResponse {
                logged_in: user.is_some(),
                username: user,
            })
        }

        fn login(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
            self.record("POST /api/login")?;
            *self.user.lock().unwrap() = Some(credentials.username.clone());
            Ok(AuthResponse {
                username: credentials.username.clone(),
            })
        }

        fn register(&self, registration: &Registration) -> ApiResult<AuthResponse> {
            self.record("POST /api/register")?;
            *self.user.lock().unwrap() = Some(registration.username.clone());
            Ok(AuthResponse {
                username: registration.username.clone(),
            })
        }

        fn logout(&self) -> ApiResult<()> {
            self.record("POST /api/logout")?;
            *self.user.lock().unwrap() = None;
            Ok(())
        }
    }

    impl CommentService for FakeBackend {
        fn list(&self) -> ApiResult<Vec<Comment>> {
            self.record("GET /api/comments")?;
            Ok(self.comments.lock().unwrap().clone())
        }

        fn create(&self, content: &str) -> ApiResult<Comment> {
            self.record(format!("POST /api/comments {content}"))?;
            let mut comments = self.comments.lock().unwrap();
            let id = comments.iter().map(|c| c.id).max().unwrap_or(0) + 1;
            let author = self.user.lock().unwrap().clone().unwrap_or_default();
            let created = comment(id, &author, content);
            comments.insert(0, created.clone());
            Ok(created)
        }

        fn toggle_like(&self, id: i64) -> ApiResult<LikeResponse> {
            self.record(format!("POST /api/comments/{id}/like"))?;
            let mut comments = self.comments.lock().unwrap();
            let target = comments.iter_mut().find(|c| c.id == id);
            let liked = match target {
                Some(entry) => {
                    entry.liked = !entry.liked;
                    entry.likes += if entry.liked { 1 } else { -1 };
                    entry.liked
                }
                None => false,
            };
            Ok(LikeResponse { liked })
        }
    }

    impl ProfileService for FakeBackend {
        fn load_info(&self) -> ApiResult<ProfileInfo> {
            self.record("GET /api/wanghan/info")?;
            Ok(self.profile.lock().unwrap().clone())
        }

        fn load_gallery(&self) -> ApiResult<Vec<GalleryImage>> {
            self.record("GET /api/gallery")?;
            Ok(self.gallery.lock().unwrap().clone())
        }
    }
}
