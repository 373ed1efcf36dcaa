#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Read;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rs_invoice_client::auth::{MemoryVault, SessionVault};
use rs_invoice_client::api::{AuthStart, Backend, BatchDownload, CallbackOutcome, SessionInfo};
use rs_invoice_client::domain::email::EmailRecord;
use rs_invoice_client::domain::search::{SearchFilters, SearchResponse};
use rs_invoice_client::error::{ApiError, ApiResult};

// In-process backend

/// Scripted failure, turned into an `ApiError` on each call.
#[derive(Debug, Clone)]
pub enum Fail {
    /// A real transport error: connection refused on a closed port.
    Network,
    Unauthorized,
    Backend(u16, String),
    Decode,
}

impl Fail {
    fn err(&self) -> ApiError {
        match self {
            Fail::Network => ApiError::Network(refused()),
            Fail::Unauthorized => ApiError::Unauthorized,
            Fail::Backend(status, message) => ApiError::Backend {
                status: *status,
                message: message.clone(),
            },
            Fail::Decode => ApiError::Decode("bad json".into()),
        }
    }
}

fn refused() -> reqwest::Error {
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    reqwest::blocking::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
        .get(format!("http://127.0.0.1:{port}/"))
        .send()
        .unwrap_err()
}

pub struct FakeBackend {
    pub ping_ok: bool,
    pub auth: Result<(), Fail>,
    pub session_email: Option<String>,
    pub search: Result<Vec<EmailRecord>, Fail>,
    pub download: Result<BatchDownload, Fail>,
    pub session: Option<String>,
    pub calls: RefCell<Vec<String>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            ping_ok: true,
            auth: Ok(()),
            session_email: Some("me@acme.test".into()),
            search: Ok(Vec::new()),
            download: Ok(BatchDownload {
                bytes: b"PK\x03\x04zip".to_vec(),
                ..Default::default()
            }),
            session: None,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn logged_in() -> Self {
        Self {
            session: Some("cookie".into()),
            ..Self::default()
        }
    }

    pub fn called(&self, what: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(what))
    }

    fn log(&self, what: impl Into<String>) {
        self.calls.borrow_mut().push(what.into());
    }
}

impl Backend for FakeBackend {
    fn ping(&self) -> ApiResult<()> {
        self.log("ping");
        if self.ping_ok {
            Ok(())
        } else {
            Err(ApiError::Decode("down".into()))
        }
    }

    fn auth_url(&self) -> ApiResult<AuthStart> {
        self.log("auth_url");
        if let Err(f) = &self.auth {
            return Err(f.err());
        }
        Ok(AuthStart {
            auth_url: Some("https://accounts.example/auth".into()),
            state: Some("xyz".into()),
        })
    }

    fn exchange_callback(&self, query: &str) -> ApiResult<CallbackOutcome> {
        self.log(format!("callback:{query}"));
        Ok(CallbackOutcome {
            session: Some("fresh".into()),
            location: Some("http://localhost:5000/#auth_success".into()),
        })
    }

    fn check_session(&self) -> ApiResult<Option<SessionInfo>> {
        self.log("check_session");
        Ok(self.session_email.clone().map(|email| SessionInfo {
            authenticated: true,
            email: Some(email),
        }))
    }

    fn logout(&self) -> ApiResult<()> {
        self.log("logout");
        Ok(())
    }

    fn search(&self, filters: &SearchFilters) -> ApiResult<SearchResponse> {
        self.log(format!("search:{}", filters.term));
        match &self.search {
            Ok(emails) => Ok(SearchResponse {
                emails: emails.clone(),
                total: Some(emails.len()),
            }),
            Err(f) => Err(f.err()),
        }
    }

    fn download_batch(&self, emails: &[EmailRecord]) -> ApiResult<BatchDownload> {
        let ids: Vec<_> = emails.iter().map(|e| e.id.as_str()).collect();
        self.log(format!("download:{}", ids.join(",")));
        match &self.download {
            Ok(b) => Ok(b.clone()),
            Err(f) => Err(f.err()),
        }
    }

    fn set_session(&mut self, cookie: Option<String>) {
        self.session = cookie;
    }

    fn has_session(&self) -> bool {
        self.session.is_some()
    }
}

pub fn email(id: &str, subject: &str, files: &[&str]) -> EmailRecord {
    let attachments: Vec<_> = files
        .iter()
        .map(|f| serde_json::json!({ "filename": f, "attachmentId": format!("att-{f}") }))
        .collect();
    serde_json::from_value(serde_json::json!({
        "id": id,
        "subject": subject,
        "from": "Facturación <billing@acme.test>",
        "date": "Mon, 3 Jun 2024",
        "snippet": "Adjuntamos su documento tributario...",
        "attachments": attachments,
    }))
    .unwrap()
}

// HTTP fake, served by tiny_http

#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    /// Path and query, e.g. `/api/search`.
    pub url: String,
    pub body: String,
    pub cookie: Option<String>,
}

impl Captured {
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }
}

pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
            headers: vec![("Content-Type".into(), "application/json".into())],
        }
    }

    pub fn bytes(body: &[u8]) -> Self {
        Self {
            status: 200,
            body: body.to_vec(),
            headers: vec![("Content-Type".into(), "application/zip".into())],
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

type Handler = Box<dyn Fn(&Captured) -> Reply + Send + Sync>;

pub struct FakeServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<Captured>>>,
    stop: Arc<AtomicBool>,
}

impl FakeServer {
    pub fn start(handler: impl Fn(&Captured) -> Reply + Send + Sync + 'static) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let handler: Handler = Box::new(handler);
        let (reqs, stop2) = (requests.clone(), stop.clone());
        thread::spawn(move || {
            while !stop2.load(Ordering::SeqCst) {
                let Ok(Some(mut request)) = server.recv_timeout(Duration::from_millis(100)) else {
                    continue;
                };
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let cookie = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Cookie"))
                    .map(|h| h.value.as_str().to_string());
                let captured = Captured {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    body,
                    cookie,
                };
                let reply = handler(&captured);
                reqs.lock().unwrap().push(captured);

                let mut resp =
                    tiny_http::Response::from_data(reply.body).with_status_code(reply.status);
                for (k, v) in reply.headers {
                    resp.add_header(tiny_http::Header::from_bytes(k.as_bytes(), v.as_bytes()).unwrap());
                }
                let _ = request.respond(resp);
            }
        });

        Self {
            base_url,
            requests,
            stop,
        }
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }

    pub fn find(&self, path: &str) -> Option<Captured> {
        self.requests().into_iter().find(|r| r.path() == path)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

// Vault the test can still read after handing it to `App`

#[derive(Clone, Default)]
pub struct SharedVault(pub Rc<MemoryVault>);

impl SharedVault {
    pub fn with_cookie(cookie: &str) -> Self {
        Self(Rc::new(MemoryVault::with_cookie(cookie)))
    }

    pub fn cookie(&self) -> Option<String> {
        self.0.load().unwrap()
    }
}

impl SessionVault for SharedVault {
    fn load(&self) -> anyhow::Result<Option<String>> {
        self.0.load()
    }

    fn save(&self, cookie: &str) -> anyhow::Result<()> {
        self.0.save(cookie)
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.0.clear()
    }
}
