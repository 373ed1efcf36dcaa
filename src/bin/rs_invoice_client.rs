use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rs_invoice_client::api::BackendClient;
use rs_invoice_client::app::{App, Screen};
use rs_invoice_client::auth::relay::{CallbackListener, open_browser};
use rs_invoice_client::auth::session_store::KeyringVault;
use rs_invoice_client::config::{Config, load_config, resolve_db_path, resolve_download_dir};
use rs_invoice_client::domain::search::{FileType, SearchFilters};
use rs_invoice_client::notify::desktop::DesktopNotifier;
use rs_invoice_client::store::repo::DownloadHistory;
use rs_invoice_client::store::sqlite::SqliteHistory;
use rs_invoice_client::terminal::{TuiOptions, run_tui};

#[derive(Parser)]
#[command(name = "rs_invoice_client")]
#[command(about = "Find invoices in your mailbox and download their attachments as a ZIP", long_about = None)]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "RS_INVOICE_BACKEND_URL")]
    backend: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the interactive TUI
    Tui,

    /// Connect a Gmail account through the backend
    Login,

    /// Close the session and forget the stored cookie
    Logout,

    /// Show whether the stored session is still valid
    Status,

    /// Search the mailbox for invoices
    Search {
        #[command(flatten)]
        filters: FilterArgs,

        /// Print the raw records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search, then download the chosen results as one ZIP
    Download {
        #[command(flatten)]
        filters: FilterArgs,

        /// Message id to include (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,

        /// Include every result
        #[arg(long, conflicts_with = "ids")]
        all: bool,

        /// Target directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Archive file name
        #[arg(long)]
        name: Option<String>,
    },

    /// List archives downloaded from this machine
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Free text added to the invoice keywords
    #[arg(long, short, default_value = "")]
    term: String,

    /// Attachment type: all, pdf, xml, json
    #[arg(long = "type", default_value = "all")]
    file_type: FileType,

    /// First day, YYYY-MM-DD
    #[arg(long, default_value = "")]
    from: String,

    /// Last day (inclusive), YYYY-MM-DD
    #[arg(long, default_value = "")]
    to: String,
}

impl FilterArgs {
    fn filters(&self) -> Result<SearchFilters> {
        SearchFilters::from_inputs(&self.term, self.file_type, &self.from, &self.to)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let mut cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
    if let Some(url) = cli.backend {
        cfg.backend_url = url;
    }

    if let Command::History { limit } = cli.cmd {
        return print_history(&cfg, limit);
    }

    let desktop = DesktopNotifier::new(cfg.desktop_notifications);
    let mut app = build_app(&cfg)?;
    app.restore_session();

    match cli.cmd {
        Command::Tui => {
            app.init(None);
            let opts = TuiOptions {
                callback_url: cfg.callback_url.clone(),
                login_timeout: cfg.login_timeout(),
                desktop,
            };
            run_tui(&mut app, &opts)
        }

        Command::Login => {
            app.init(None);
            if app.screen() == Screen::Main {
                flush_toasts(&mut app, &desktop);
                println!("Already connected as {}", app.user_email().unwrap_or("(unknown)"));
                return Ok(());
            }

            let cancel = Arc::new(AtomicBool::new(false));
            let c2 = cancel.clone();
            ctrlc::set_handler(move || {
                c2.store(true, Ordering::SeqCst);
            })?;

            // bind before the browser opens
            let listener = CallbackListener::bind(&cfg.callback_url)?;
            let ok = app.login_with(&listener, open_browser, cfg.login_timeout(), &cancel);
            flush_toasts(&mut app, &desktop);
            if !ok {
                return Err(anyhow!("login failed"));
            }
            println!("Connected as {}", app.user_email().unwrap_or("(unknown)"));
            Ok(())
        }

        Command::Logout => {
            app.logout();
            flush_toasts(&mut app, &desktop);
            Ok(())
        }

        Command::Status => {
            app.init(None);
            flush_toasts(&mut app, &desktop);
            match app.screen() {
                Screen::Main => println!("Connected as {}", app.user_email().unwrap_or("(unknown)")),
                Screen::Login => println!("Not connected. Run `rs_invoice_client login`."),
            }
            Ok(())
        }

        Command::Search { filters, json } => {
            let filters = filters.filters()?;
            search(&mut app, &desktop, filters)?;
            if json {
                println!("{}", serde_json::to_string_pretty(app.results())?);
            } else {
                print_results(&app);
            }
            Ok(())
        }

        Command::Download {
            filters,
            ids,
            all,
            out,
            name,
        } => {
            let filters = filters.filters()?;
            search(&mut app, &desktop, filters)?;

            if all {
                app.toggle_all();
            } else {
                for id in &ids {
                    if app.results().iter().any(|r| &r.id == id) {
                        app.toggle(id);
                    } else {
                        log::warn!("message {id} is not in the search results");
                        eprintln!("skipping {id}: not in the search results");
                    }
                }
            }
            if let Some(dir) = out {
                app.set_download_dir(dir);
            }
            if let Some(name) = name {
                app.set_archive_name(&name);
            }

            let saved = app.download();
            flush_toasts(&mut app, &desktop);
            let saved = saved.ok_or_else(|| anyhow!("download failed"))?;

            println!(
                "Saved {} ({} bytes, {} email(s))",
                saved.path.display(),
                saved.size,
                saved.email_count
            );
            for m in &saved.metadata {
                println!(
                    "  {}  code={}  issuer={}",
                    m.filename,
                    m.codigo_generacion.as_deref().unwrap_or("-"),
                    m.emisor_nombre.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }

        Command::History { .. } => Ok(()),
    }
}

fn build_app(cfg: &Config) -> Result<App<BackendClient>> {
    let backend = BackendClient::new(&cfg.backend_url, &cfg.session_cookie, cfg.request_timeout())?;
    let vault = Box::new(KeyringVault::new(&cfg.backend_url));
    let app = App::new(
        backend,
        vault,
        resolve_download_dir(cfg),
        &cfg.archive_name,
        cfg.toast_ttl(),
    );

    let db_path = resolve_db_path(cfg)?;
    match SqliteHistory::open(&db_path) {
        Ok(history) => Ok(app.with_history(Box::new(history))),
        Err(e) => {
            log::warn!("download history unavailable ({}): {e}", db_path.display());
            Ok(app)
        }
    }
}

/// Run a search from the CLI; errors if there is no usable session.
fn search(app: &mut App<BackendClient>, desktop: &DesktopNotifier, filters: SearchFilters) -> Result<()> {
    app.init(None);
    if app.screen() != Screen::Main {
        flush_toasts(app, desktop);
        return Err(anyhow!("not connected; run `rs_invoice_client login` first"));
    }
    app.search(filters);
    flush_toasts(app, desktop);
    if app.screen() != Screen::Main {
        return Err(anyhow!("session expired; run `rs_invoice_client login` again"));
    }
    Ok(())
}

fn flush_toasts(app: &mut App<BackendClient>, desktop: &DesktopNotifier) {
    for t in app.toasts.drain() {
        eprintln!("[{}] {}", t.kind.label(), t.message);
        desktop.mirror(&t);
    }
}

fn print_results(app: &App<BackendClient>) {
    if app.results().is_empty() {
        println!("No invoices found. Try other terms or date filters.");
        return;
    }
    println!("{}", app.count_label());
    for (i, e) in app.results().iter().enumerate() {
        let badge = if e.downloaded { " (already downloaded)" } else { "" };
        println!("{:>3}. {}  {}{}", i + 1, e.id, e.subject, badge);
        println!("     {} | {}", e.sender_label(), e.date);
        if let Some(code) = &e.generation_code {
            println!("     # {code}");
        }
        let names: Vec<_> = e.attachments.iter().map(|a| a.filename.as_str()).collect();
        println!("     {} attachment(s): {}", names.len(), names.join(", "));
    }
}

fn print_history(cfg: &Config, limit: usize) -> Result<()> {
    let history = SqliteHistory::open(&resolve_db_path(cfg)?)?;
    let records = history.recent(limit)?;
    if records.is_empty() {
        println!("No downloads recorded yet.");
        return Ok(());
    }
    for r in records {
        let when = chrono::DateTime::from_timestamp(r.saved_at, 0)
            .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| r.saved_at.to_string());
        println!(
            "#{} {}  {}  {} email(s), {} file(s), {} DTE",
            r.id.unwrap_or_default(),
            when,
            r.archive_path,
            r.message_count(),
            r.items.iter().filter(|i| !i.filename.is_empty()).count(),
            r.dte_count()
        );
    }
    Ok(())
}
