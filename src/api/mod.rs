pub mod client;

use serde::Deserialize;

use crate::domain::dte::DteMetadata;
use crate::domain::email::EmailRecord;
use crate::domain::search::{SearchFilters, SearchResponse};
use crate::error::ApiResult;

pub use client::BackendClient;

/// Fragment the backend appends to its post-callback redirect on success.
pub const AUTH_SUCCESS_MARKER: &str = "auth_success";

/// `GET /auth/google`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthStart {
    #[serde(rename = "authUrl", default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// `GET /auth/check-session`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub email: Option<String>,
}

/// What the backend answered when the OAuth code was relayed to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackOutcome {
    /// Value of the session cookie, if one was set.
    pub session: Option<String>,
    /// `Location` of the redirect, normally `<frontend>/#auth_success`.
    pub location: Option<String>,
}

impl CallbackOutcome {
    pub fn marker(&self) -> Option<&str> {
        self.location
            .as_deref()
            .and_then(|l| l.split_once('#'))
            .map(|(_, frag)| frag)
    }

    pub fn succeeded(&self) -> bool {
        self.session.is_some() && self.marker().is_some_and(is_auth_success)
    }
}

pub fn is_auth_success(fragment: &str) -> bool {
    fragment.trim_start_matches('#').starts_with(AUTH_SUCCESS_MARKER)
}

/// `POST /api/download-batch`
#[derive(Debug, Clone, Default)]
pub struct BatchDownload {
    pub bytes: Vec<u8>,
    pub metadata: Vec<DteMetadata>,
    /// From `Content-Disposition`, when present.
    pub filename: Option<String>,
}

/// The backend as seen by the controller. `BackendClient` talks HTTP; tests
/// plug in fakes.
pub trait Backend {
    fn ping(&self) -> ApiResult<()>;
    fn auth_url(&self) -> ApiResult<AuthStart>;
    /// Forward the raw query string the provider sent to the loopback
    /// listener (`code=...&state=...`).
    fn exchange_callback(&self, query: &str) -> ApiResult<CallbackOutcome>;
    /// `Ok(None)` when the backend says there is no session.
    fn check_session(&self) -> ApiResult<Option<SessionInfo>>;
    fn logout(&self) -> ApiResult<()>;
    fn search(&self, filters: &SearchFilters) -> ApiResult<SearchResponse>;
    fn download_batch(&self, emails: &[EmailRecord]) -> ApiResult<BatchDownload>;

    fn set_session(&mut self, cookie: Option<String>);
    fn has_session(&self) -> bool;
}
