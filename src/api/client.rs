use anyhow::{Result, anyhow};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{CONTENT_DISPOSITION, COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use url::Url;

use crate::api::{AuthStart, Backend, BatchDownload, CallbackOutcome, SessionInfo};
use crate::domain::dte::{self, METADATA_HEADER};
use crate::domain::email::EmailRecord;
use crate::domain::search::{SearchFilters, SearchResponse};
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Blocking HTTP client for the retrieval backend.
///
/// The session is the backend's cookie; it is sent on every request and never
/// inspected here.
pub struct BackendClient {
    http: Client,
    base: Url,
    cookie_name: String,
    session: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, cookie_name: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| anyhow!("invalid backend url '{base_url}': {e}"))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("backend url '{base_url}' cannot be a base"));
        }
        // join() replaces the last segment unless the path ends with '/'
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }

        // Redirects stay visible: the OAuth callback answer is one.
        let http = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            http,
            base,
            cookie_name: cookie_name.to_string(),
            session: None,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Decode(format!("bad endpoint '{path}': {e}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        log::debug!("{method} {url}");
        let rb = self.http.request(method, url);
        match &self.session {
            Some(value) => rb.header(COOKIE, format!("{}={value}", self.cookie_name)),
            None => rb,
        }
    }

    fn send(&self, rb: RequestBuilder) -> ApiResult<Response> {
        check_status(rb.send()?)
    }

    fn session_cookie(&self, resp: &Response) -> Option<String> {
        resp.headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| cookie_value(v, &self.cookie_name))
    }
}

fn check_status(resp: Response) -> ApiResult<Response> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| format!("backend returned {status}"));
    log::warn!("backend error {status}: {message}");
    Err(ApiError::Backend {
        status: status.as_u16(),
        message,
    })
}

fn decode<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
    let text = resp.text()?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Value of cookie `name` in one `Set-Cookie` header. An empty value is the
/// backend clearing the cookie and counts as absent.
pub(crate) fn cookie_value(set_cookie: &str, name: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?;
    let (k, v) = pair.split_once('=')?;
    let v = v.trim().trim_matches('"');
    (k.trim() == name && !v.is_empty()).then(|| v.to_string())
}

/// `attachment; filename=foo.zip` / `filename="foo.zip"`
pub(crate) fn disposition_filename(value: &str) -> Option<String> {
    value
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("filename"))
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

impl Backend for BackendClient {
    fn ping(&self) -> ApiResult<()> {
        let url = self.url("api/ping")?;
        let resp = self.send(self.request(Method::GET, url))?;
        let body: serde_json::Value = decode(resp)?;
        log::debug!("ping: {body}");
        Ok(())
    }

    fn auth_url(&self) -> ApiResult<AuthStart> {
        let url = self.url("auth/google")?;
        let start: AuthStart = decode(self.send(self.request(Method::GET, url))?)?;
        if start.auth_url.as_deref().is_none_or(str::is_empty) {
            return Err(ApiError::Decode("no authUrl in response".into()));
        }
        Ok(start)
    }

    fn exchange_callback(&self, query: &str) -> ApiResult<CallbackOutcome> {
        let mut url = self.url("auth/callback")?;
        url.set_query(Some(query));
        let resp = self.request(Method::GET, url).send()?;

        let status = resp.status();
        if !status.is_redirection() && !status.is_success() {
            check_status(resp)?;
            return Err(ApiError::Decode(format!("unexpected status {status}")));
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let session = self.session_cookie(&resp);
        log::debug!(
            "callback relayed: status={status} location={location:?} cookie={}",
            session.is_some()
        );
        Ok(CallbackOutcome { session, location })
    }

    fn check_session(&self) -> ApiResult<Option<SessionInfo>> {
        let url = self.url("auth/check-session")?;
        match self.send(self.request(Method::GET, url)) {
            Ok(resp) => {
                let info: SessionInfo = decode(resp)?;
                Ok(info.authenticated.then_some(info))
            }
            Err(ApiError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn logout(&self) -> ApiResult<()> {
        let url = self.url("auth/logout")?;
        self.send(self.request(Method::POST, url))?;
        Ok(())
    }

    fn search(&self, filters: &SearchFilters) -> ApiResult<SearchResponse> {
        let url = self.url("api/search")?;
        let resp = self.send(self.request(Method::POST, url).json(filters))?;
        decode(resp)
    }

    fn download_batch(&self, emails: &[EmailRecord]) -> ApiResult<BatchDownload> {
        let url = self.url("api/download-batch")?;
        let body = json!({ "emails": emails });
        let resp = self.send(self.request(Method::POST, url).json(&body))?;

        let headers = resp.headers();
        let metadata = dte::parse_header(
            headers
                .get(METADATA_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        let filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename);

        let bytes = resp.bytes()?.to_vec();
        log::info!(
            "downloaded archive: {} bytes, {} metadata entries",
            bytes.len(),
            metadata.len()
        );
        Ok(BatchDownload {
            bytes,
            metadata,
            filename,
        })
    }

    fn set_session(&mut self, cookie: Option<String>) {
        self.session = cookie;
    }

    fn has_session(&self) -> bool {
        self.session.is_some()
    }
}
