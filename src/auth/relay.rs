//! Loopback relay for the OAuth callback.
//!
//! The backend's `REDIRECT_URI` points at this listener. When the provider
//! sends the browser back with `?code=...&state=...`, the query is forwarded
//! verbatim to the backend's own callback endpoint, which exchanges the code
//! and answers with the session cookie plus a redirect to `#auth_success`.

use anyhow::{Result, anyhow};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tiny_http::{Request, Response, Server};
use url::Url;

use crate::api::CallbackOutcome;

/// Pause after a listener socket error.
const ERROR_BACKOFF: Duration = Duration::from_millis(200);

/// A completed login: the cookie to keep and the marker the backend sent.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub session: String,
    pub marker: String,
}

pub struct CallbackListener {
    server: Server,
    url: Url,
}

impl CallbackListener {
    /// Bind to the host/port of `callback_url`. Port 0 picks a free port; the
    /// real one is reflected in [`CallbackListener::url`].
    pub fn bind(callback_url: &str) -> Result<Self> {
        let mut url = Url::parse(callback_url)
            .map_err(|e| anyhow!("Invalid callback_url '{callback_url}': {e}"))?;

        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("callback_url missing host: {callback_url}"))?;

        let port = url
            .port_or_known_default()
            .ok_or_else(|| anyhow!("callback_url missing/unknown port: {callback_url}"))?;

        let bind_ip: IpAddr = match host {
            "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
            other => other.parse::<IpAddr>().map_err(|_| {
                anyhow!("callback_url host must be localhost/127.0.0.1 or an IP: {other}")
            })?,
        };

        let bind_addr = SocketAddr::new(bind_ip, port);
        let server = Server::http(bind_addr)
            .map_err(|e| anyhow!("Failed to bind callback listener on {bind_addr}: {e:?}"))?;

        let actual = server.server_addr().port();
        if actual != port {
            url.set_port(Some(actual))
                .map_err(|_| anyhow!("cannot set port on {callback_url}"))?;
        }

        Ok(Self { server, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Wait for the provider's redirect and hand its query to `relay`.
    ///
    /// Requests on other paths (favicon...) get a 404 and the wait goes on.
    /// An `error=` parameter, a failed relay, or a backend answer without
    /// cookie and marker ends the login with an error.
    pub fn wait<F>(&self, timeout: Duration, cancel: &AtomicBool, mut relay: F) -> Result<LoginOutcome>
    where
        F: FnMut(&str) -> Result<CallbackOutcome>,
    {
        let wait_until = Instant::now() + timeout;

        while Instant::now() < wait_until {
            if cancel.load(Ordering::SeqCst) {
                return Err(anyhow!("login cancelled"));
            }

            let Some(request) = next_request(|| self.server.recv_timeout(Duration::from_millis(500)))
            else {
                continue;
            };

            // request.url() is a path+query like "/auth/callback?code=...&state=..."
            let full = format!(
                "{}://{}{}",
                self.url.scheme(),
                self.url.authority(),
                request.url()
            );
            let Ok(parsed) = Url::parse(&full) else {
                respond(request, 400, "Bad redirect");
                continue;
            };

            if parsed.path() != self.url.path() {
                respond(request, 404, "Not found");
                continue;
            }

            if let Some((_, err)) = parsed.query_pairs().find(|(k, _)| k == "error") {
                let err = err.into_owned();
                respond(
                    request,
                    200,
                    &format!("Authorization was not granted ({err}). You can close this tab."),
                );
                return Err(anyhow!("authorization denied: {err}"));
            }

            if !parsed.query_pairs().any(|(k, _)| k == "code") {
                respond(request, 200, "No code found in redirect. You can close this tab.");
                continue;
            }

            let query = parsed.query().unwrap_or_default().to_string();
            return match relay(&query) {
                Ok(outcome) if outcome.succeeded() => {
                    respond(
                        request,
                        200,
                        "Connected. You can close this tab and go back to the terminal.",
                    );
                    let marker = outcome.marker().unwrap_or_default().to_string();
                    let session = outcome.session.unwrap_or_default();
                    Ok(LoginOutcome { session, marker })
                }
                Ok(outcome) => {
                    respond(request, 200, "The server did not confirm the login. You can close this tab.");
                    Err(anyhow!(
                        "backend did not confirm the login (redirect: {:?})",
                        outcome.location
                    ))
                }
                Err(e) => {
                    respond(request, 200, "Login failed. You can close this tab.");
                    Err(e)
                }
            };
        }

        Err(anyhow!("No authorization received within timeout"))
    }
}

/// One receive step. A socket error is logged and followed by a short pause.
fn next_request<T>(recv: impl FnOnce() -> io::Result<Option<T>>) -> Option<T> {
    match recv() {
        Ok(request) => request,
        Err(e) => {
            log::warn!("callback listener error: {e}");
            thread::sleep(ERROR_BACKOFF);
            None
        }
    }
}

fn respond(request: Request, status: u16, body: &str) {
    if let Err(e) = request.respond(Response::from_string(body).with_status_code(status)) {
        log::debug!("could not answer callback request: {e}");
    }
}

/// Default navigation: print the URL and try to open the system browser.
pub fn open_browser(url: &str) -> Result<()> {
    println!("Open this URL in your browser:\n{url}");
    // best-effort: don't fail if browser can't be opened
    if let Err(e) = open::that(url) {
        log::warn!("could not open browser automatically: {e}");
    }
    Ok(())
}
