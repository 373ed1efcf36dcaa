//! UI-agnostic controller: auth state, search results, selection, downloads.
//!
//! Every backend failure is caught here and turned into a toast; a 401 on
//! search or download ends the session. The TUI and the CLI commands only
//! render what this holds.

use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::api::{Backend, is_auth_success};
use crate::auth::SessionVault;
use crate::auth::relay::{CallbackListener, LoginOutcome};
use crate::domain::dte::DteMetadata;
use crate::domain::email::EmailRecord;
use crate::domain::search::SearchFilters;
use crate::domain::selection::Selection;
use crate::error::ApiError;
use crate::notify::Toasts;
use crate::store::repo::{DownloadHistory, DownloadRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Main,
}

/// What the result area should show.
#[derive(Debug, PartialEq)]
pub enum ResultsView<'a> {
    /// No search yet.
    Idle,
    /// A search came back empty: empty-state message, no selection controls.
    Empty,
    List(&'a [EmailRecord]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedArchive {
    pub path: PathBuf,
    pub email_count: usize,
    pub size: usize,
    pub metadata: Vec<DteMetadata>,
}

pub struct App<B: Backend> {
    backend: B,
    vault: Box<dyn SessionVault>,
    history: Option<Box<dyn DownloadHistory>>,
    download_dir: PathBuf,
    archive_name: String,

    pub toasts: Toasts,

    screen: Screen,
    user_email: Option<String>,
    results: Vec<EmailRecord>,
    selection: Selection,
    last_search: Option<SearchFilters>,
    searched: bool,
}

impl<B: Backend> App<B> {
    pub fn new(
        backend: B,
        vault: Box<dyn SessionVault>,
        download_dir: PathBuf,
        archive_name: &str,
        toast_ttl: Duration,
    ) -> Self {
        Self {
            backend,
            vault,
            history: None,
            download_dir,
            archive_name: archive_name.to_string(),
            toasts: Toasts::new(toast_ttl),
            screen: Screen::Login,
            user_email: None,
            results: Vec::new(),
            selection: Selection::new(),
            last_search: None,
            searched: false,
        }
    }

    pub fn with_history(mut self, history: Box<dyn DownloadHistory>) -> Self {
        self.history = Some(history);
        self
    }

    // ----- accessors -----

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn history(&self) -> Option<&dyn DownloadHistory> {
        self.history.as_deref()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    pub fn results(&self) -> &[EmailRecord] {
        &self.results
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    pub fn last_search(&self) -> Option<&SearchFilters> {
        self.last_search.as_ref()
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn set_download_dir(&mut self, dir: PathBuf) {
        self.download_dir = dir;
    }

    pub fn set_archive_name(&mut self, name: &str) {
        self.archive_name = name.to_string();
    }

    pub fn results_view(&self) -> ResultsView<'_> {
        if !self.searched {
            ResultsView::Idle
        } else if self.results.is_empty() {
            ResultsView::Empty
        } else {
            ResultsView::List(&self.results)
        }
    }

    pub fn count_label(&self) -> String {
        format!("{} found", self.results.len())
    }

    pub fn selection_controls_visible(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn action_bar_visible(&self) -> bool {
        !self.selection.is_empty()
    }

    // ----- auth -----

    /// Put the stored session cookie (if any) on the backend client.
    pub fn restore_session(&mut self) {
        match self.vault.load() {
            Ok(cookie) => self.backend.set_session(cookie),
            Err(e) => log::warn!("could not read stored session: {e}"),
        }
    }

    /// Startup check. `marker` is the navigation fragment, if the previous
    /// step was a login.
    pub fn init(&mut self, marker: Option<&str>) {
        if let Err(e) = self.backend.ping() {
            log::error!("backend ping failed: {e}");
            self.toasts.error("Cannot reach the server");
        }

        let just_logged_in = marker.is_some_and(is_auth_success);

        let session = if self.backend.has_session() {
            match self.backend.check_session() {
                Ok(info) => info,
                Err(e) => {
                    log::warn!("session check failed: {e}");
                    None
                }
            }
        } else {
            None
        };

        match session {
            Some(info) => self.show_main(info.email),
            None if just_logged_in => self.show_main(None),
            None => {}
        }

        if just_logged_in {
            self.toasts.success("Connected to Gmail");
        }
    }

    fn show_main(&mut self, email: Option<String>) {
        self.screen = Screen::Main;
        if email.is_some() {
            self.user_email = email;
        }
    }

    /// Ask the backend where to send the browser.
    pub fn begin_login(&mut self) -> Option<String> {
        self.toasts.info("Connecting to Google...");
        match self.backend.auth_url() {
            Ok(start) => {
                log::debug!("oauth state: {:?}", start.state);
                start.auth_url
            }
            Err(ApiError::Network(e)) => {
                log::error!("auth url request failed: {e}");
                self.toasts.error("Connection error");
                None
            }
            Err(e) => {
                log::error!("auth url request failed: {e}");
                self.toasts.error("Error connecting to Google");
                None
            }
        }
    }

    /// Keep the session the relay obtained and re-run the startup check.
    pub fn finish_login(&mut self, outcome: Result<LoginOutcome>) -> bool {
        match outcome {
            Ok(login) => {
                if let Err(e) = self.vault.save(&login.session) {
                    log::warn!("could not store session: {e}");
                }
                self.backend.set_session(Some(login.session));
                self.init(Some(&login.marker));
                self.screen == Screen::Main
            }
            Err(e) => {
                log::error!("login failed: {e}");
                self.toasts.error(format!("Login failed: {e}"));
                false
            }
        }
    }

    /// Full login: the listener must already be bound so the provider's
    /// redirect cannot arrive before anyone listens.
    pub fn login_with(
        &mut self,
        listener: &CallbackListener,
        navigate: impl FnOnce(&str) -> Result<()>,
        timeout: Duration,
        cancel: &AtomicBool,
    ) -> bool {
        let Some(url) = self.begin_login() else {
            return false;
        };
        if let Err(e) = navigate(&url) {
            return self.finish_login(Err(e));
        }
        let backend = &self.backend;
        let outcome = listener.wait(timeout, cancel, |query| {
            backend.exchange_callback(query).map_err(Into::into)
        });
        self.finish_login(outcome)
    }

    /// Invalidate the session and return to the initial state.
    pub fn logout(&mut self) {
        self.end_session();
        self.toasts.info("Session closed");
    }

    /// A 401 from the backend: one error toast, then the logout path.
    fn expire_session(&mut self) {
        self.toasts
            .error("Session expired. Please connect again.");
        self.end_session();
    }

    fn end_session(&mut self) {
        if self.backend.has_session()
            && let Err(e) = self.backend.logout()
        {
            log::warn!("logout request failed: {e}");
        }
        if let Err(e) = self.vault.clear() {
            log::warn!("could not clear stored session: {e}");
        }
        self.backend.set_session(None);

        self.screen = Screen::Login;
        self.user_email = None;
        self.results.clear();
        self.selection.clear();
        self.last_search = None;
        self.searched = false;
    }

    // ----- search -----

    pub fn search(&mut self, filters: SearchFilters) {
        if self.screen != Screen::Main {
            self.toasts.error("Connect your account first");
            return;
        }

        self.selection.clear();
        self.results.clear();
        // a failed search shows no result area, not the empty state
        self.searched = false;

        match self.backend.search(&filters) {
            Ok(resp) => {
                let total = resp.total();
                self.results = resp.emails;
                self.mark_downloaded_from_history();
                self.searched = true;
                let message = if filters.term.is_empty() {
                    format!("Showing {total} email(s)")
                } else {
                    format!("Found {total} result(s) for \"{}\"", filters.term)
                };
                self.toasts.success(message);
            }
            Err(ApiError::Unauthorized) => self.expire_session(),
            Err(ApiError::Network(e)) => {
                log::error!("search failed: {e}");
                self.toasts.error("Connection error with the server");
            }
            Err(ApiError::Backend { message, .. }) => self.toasts.error(message),
            Err(e @ ApiError::Decode(_)) => {
                log::error!("search failed: {e}");
                self.toasts.error("Search error");
            }
        }
        if self.screen == Screen::Main {
            self.last_search = Some(filters);
        }
    }

    fn mark_downloaded_from_history(&mut self) {
        let Some(history) = &self.history else {
            return;
        };
        match history.downloaded_ids() {
            Ok(ids) => {
                for r in &mut self.results {
                    if ids.contains(&r.id) {
                        r.downloaded = true;
                    }
                }
            }
            Err(e) => log::warn!("could not read download history: {e}"),
        }
    }

    // ----- selection -----

    pub fn toggle(&mut self, id: &str) {
        self.selection.toggle(id);
    }

    pub fn toggle_at(&mut self, index: usize) {
        if let Some(id) = self.results.get(index).map(|r| r.id.clone()) {
            self.selection.toggle(&id);
        }
    }

    pub fn toggle_all(&mut self) {
        self.selection.toggle_all(&self.results);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ----- download -----

    pub fn download(&mut self) -> Option<SavedArchive> {
        let selected = self.selection.pick(&self.results);
        if selected.is_empty() {
            self.toasts.error("Select at least one file");
            return None;
        }

        self.toasts
            .info(format!("Preparing ZIP with {} invoice(s)...", selected.len()));

        let batch = match self.backend.download_batch(&selected) {
            Ok(b) => b,
            Err(ApiError::Unauthorized) => {
                self.expire_session();
                return None;
            }
            Err(ApiError::Network(e)) => {
                log::error!("download failed: {e}");
                self.toasts.error("Connection error");
                return None;
            }
            Err(ApiError::Backend { message, .. }) => {
                self.toasts
                    .error(format!("Error generating the ZIP: {message}"));
                return None;
            }
            Err(e @ ApiError::Decode(_)) => {
                log::error!("download failed: {e}");
                self.toasts.error("Error generating the ZIP");
                return None;
            }
        };
        if let Some(name) = &batch.filename {
            log::debug!("backend suggested archive name {name}");
        }

        let path = match save_archive(&self.download_dir, &self.archive_name, &batch.bytes) {
            Ok(p) => p,
            Err(e) => {
                log::error!("saving archive failed: {e}");
                self.toasts.error(format!("Could not save the archive: {e}"));
                return None;
            }
        };

        if let Some(history) = &self.history {
            let record = DownloadRecord::build(
                &selected,
                &batch.metadata,
                &path.to_string_lossy(),
                self.user_email.as_deref(),
                chrono::Utc::now().timestamp(),
            );
            if let Err(e) = history.record(&record) {
                log::warn!("could not record download: {e}");
            }
        }

        for r in &mut self.results {
            if self.selection.contains(&r.id) {
                r.downloaded = true;
            }
        }
        self.selection.clear();

        self.toasts
            .success(format!("Download complete: {}", path.display()));

        Some(SavedArchive {
            path,
            email_count: selected.len(),
            size: batch.bytes.len(),
            metadata: batch.metadata,
        })
    }
}

/// Write `bytes` into `dir/name`, never replacing an existing file:
/// `name_1.ext`, `name_2.ext`... are tried in turn.
pub fn save_archive(dir: &Path, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let base = Path::new(name);
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    let ext = base.extension().map(|e| e.to_string_lossy().into_owned());

    let mut counter = 0u32;
    loop {
        let file_name = match (counter, &ext) {
            (0, Some(ext)) => format!("{stem}.{ext}"),
            (0, None) => stem.clone(),
            (n, Some(ext)) => format!("{stem}_{n}.{ext}"),
            (n, None) => format!("{stem}_{n}"),
        };
        let path = dir.join(file_name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut f) => {
                f.write_all(bytes)?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_archive_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let a = save_archive(dir.path(), "facturas.zip", b"one").unwrap();
        let b = save_archive(dir.path(), "facturas.zip", b"two").unwrap();
        let c = save_archive(dir.path(), "facturas.zip", b"three").unwrap();
        assert_eq!(a.file_name().unwrap(), "facturas.zip");
        assert_eq!(b.file_name().unwrap(), "facturas_1.zip");
        assert_eq!(c.file_name().unwrap(), "facturas_2.zip");
        assert_eq!(fs::read(&a).unwrap(), b"one");
        assert_eq!(fs::read(&c).unwrap(), b"three");
    }

    #[test]
    fn save_archive_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let p = save_archive(&nested, "x.zip", b"z").unwrap();
        assert!(p.starts_with(&nested));
    }
}
