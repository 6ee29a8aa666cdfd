use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::USER_AGENT;
use reqwest::{Method, StatusCode};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/";
pub const VIDEO_URL_BASE: &str = "https://www.bilibili.com/video";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("api: {status}: {}", .message.as_deref().unwrap_or("request rejected"))]
    Backend {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("api: transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api: decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("api: invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Text shown to the viewer. Only backend rejections expose their own
    /// message; everything else collapses into a generic retry hint.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Backend { message, .. } => message
                .as_deref()
                .map(str::trim)
                .filter(|msg| !msg.is_empty())
                .unwrap_or(fallback)
                .to_string(),
            _ => NETWORK_ERROR_MESSAGE.to_string(),
        }
    }
}

pub const NETWORK_ERROR_MESSAGE: &str = "Network error, please retry";

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        if config.user_agent.trim().is_empty() {
            anyhow::bail!("api client user agent required");
        }
        let base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = parse_base_url(&base)?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .cookie_store(true)
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn me(&self) -> ApiResult<MeResponse> {
        let resp = self.send(self.request(Method::GET, "api/me")?)?;
        decode(resp, "me response")
    }

    pub fn login(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        let req = self.request(Method::POST, "api/login")?.json(credentials);
        decode(self.send(req)?, "login response")
    }

    pub fn register(&self, registration: &Registration) -> ApiResult<AuthResponse> {
        let req = self.request(Method::POST, "api/register")?.json(registration);
        decode(self.send(req)?, "register response")
    }

    /// The backend clears its session whatever the status, so only transport
    /// failures are reported.
    pub fn logout(&self) -> ApiResult<()> {
        self.request(Method::POST, "api/logout")?.send()?;
        Ok(())
    }

    pub fn profile(&self) -> ApiResult<ProfileInfo> {
        let resp = self.send(self.request(Method::GET, "api/wanghan/info")?)?;
        decode(resp, "profile info")
    }

    pub fn gallery(&self) -> ApiResult<Vec<GalleryImage>> {
        let resp = self.send(self.request(Method::GET, "api/gallery")?)?;
        decode(resp, "gallery listing")
    }

    pub fn comments(&self) -> ApiResult<Vec<Comment>> {
        let resp = self.send(self.request(Method::GET, "api/comments")?)?;
        decode(resp, "comment listing")
    }

    pub fn create_comment(&self, content: &str) -> ApiResult<Comment> {
        let body = NewComment { content };
        let req = self.request(Method::POST, "api/comments")?.json(&body);
        decode(self.send(req)?, "created comment")
    }

    pub fn like_comment(&self, id: i64) -> ApiResult<LikeResponse> {
        let path = format!("api/comments/{id}/like");
        let resp = self.send(self.request(Method::POST, &path)?)?;
        decode(resp, "like response")
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = self.base_url.join(path)?;
        Ok(self
            .http
            .request(method, url)
            .header(USER_AGENT, self.user_agent.clone()))
    }

    fn send(&self, req: RequestBuilder) -> ApiResult<Response> {
        let resp = req.send()?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|payload| payload.error);
        tracing::debug!(%status, body = %body, "backend rejected request");
        Err(ApiError::Backend { status, message })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    // Url::join drops the last path segment unless the base ends with a slash.
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{raw}/"))
    }
}

fn decode<T: DeserializeOwned>(resp: Response, context: &'static str) -> ApiResult<T> {
    let bytes = resp.bytes()?;
    serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { context, source })
}

pub fn video_url(bvid: &str) -> String {
    format!("{VIDEO_URL_BASE}/{bvid}")
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct NewComment<'a> {
    content: &'a str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub username: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeResponse {
    #[serde(default, deserialize_with = "flexible_bool")]
    pub liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub likes: i64,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub liked: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileInfo {
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    pub bvid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pic: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub duration: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub views: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub date: String,
}

impl Video {
    pub fn url(&self) -> String {
        video_url(&self.bvid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GalleryImage {
    pub src: String,
    #[serde(default)]
    pub title: String,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(false),
        serde_json::Value::Bool(flag) => Ok(flag),
        serde_json::Value::Number(num) => Ok(num.as_f64().map_or(false, |n| n != 0.0)),
        other => Err(de::Error::custom(format!("expected boolean, got {other}"))),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(text) => Ok(text),
        serde_json::Value::Number(num) => Ok(num.to_string()),
        other => Err(de::Error::custom(format!("expected text, got {other}"))),
    }
}

/// Comment timestamps arrive as RFC 3339, SQLite `YYYY-MM-DD HH:MM:SS` (UTC),
/// offset-less ISO 8601, or epoch milliseconds.
pub mod timestamp {
    use super::*;
    use serde::Serializer;

    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ];

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(raw) => parse(&raw)
                .ok_or_else(|| de::Error::custom(format!("unrecognized timestamp {raw:?}"))),
            serde_json::Value::Number(num) => num
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {num}"))),
            other => Err(de::Error::custom(format!("expected timestamp, got {other}"))),
        }
    }
}
