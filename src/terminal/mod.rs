pub mod events;
pub mod state;
pub mod ui;

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use crate::api::Backend;
use crate::app::{App, Screen};
use crate::auth::relay::CallbackListener;
use crate::notify::desktop::DesktopNotifier;
use crate::terminal::events::{Action, handle_key};
use crate::terminal::state::UiState;
use crate::terminal::ui::render;

pub struct TuiOptions {
    pub callback_url: String,
    pub login_timeout: Duration,
    pub desktop: DesktopNotifier,
}

pub fn run_tui<B: Backend>(app: &mut App<B>, opts: &TuiOptions) -> Result<()> {
    if let Err(e) = color_eyre::install() {
        log::debug!("color-eyre already installed: {e}");
    }

    let mut terminal = ratatui::init();
    let mut ui = UiState::new();
    let result = run(&mut terminal, app, &mut ui, opts);

    ratatui::restore();

    result
}

fn run<B: Backend>(
    terminal: &mut DefaultTerminal,
    app: &mut App<B>,
    ui: &mut UiState,
    opts: &TuiOptions,
) -> Result<()> {
    loop {
        draw(terminal, app, ui, opts)?;

        // poll so toasts expire while idle
        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let action = handle_key(key, app.screen(), ui, app.results().len());
        if apply(action, terminal, app, ui, opts)? {
            return Ok(());
        }
    }
}

fn draw<B: Backend>(
    terminal: &mut DefaultTerminal,
    app: &mut App<B>,
    ui: &UiState,
    opts: &TuiOptions,
) -> Result<()> {
    let now = Instant::now();
    app.toasts.prune(now);
    opts.desktop.mirror_all(&app.toasts.drain());
    terminal.draw(|f| render(f, app, ui, now))?;
    Ok(())
}

/// Draw a "working" frame before a blocking call.
fn busy<B: Backend>(
    terminal: &mut DefaultTerminal,
    app: &mut App<B>,
    ui: &mut UiState,
    opts: &TuiOptions,
    message: &str,
) -> Result<()> {
    ui.busy = Some(message.to_string());
    draw(terminal, app, ui, opts)
}

/// Returns true when the loop should end.
fn apply<B: Backend>(
    action: Action,
    terminal: &mut DefaultTerminal,
    app: &mut App<B>,
    ui: &mut UiState,
    opts: &TuiOptions,
) -> Result<bool> {
    match action {
        Action::None => {}
        Action::Quit => return Ok(true),
        Action::Login => {
            let listener = match CallbackListener::bind(&opts.callback_url) {
                Ok(l) => l,
                Err(e) => {
                    app.toasts.error(e.to_string());
                    return Ok(false);
                }
            };
            busy(terminal, app, ui, opts, "Waiting for authorization in the browser...")?;
            // no signal handler in raw mode; the timeout ends a stuck login
            let cancel = AtomicBool::new(false);
            let ok = app.login_with(
                &listener,
                |url| open::that(url).map_err(|e| anyhow!("could not open the browser: {e}")),
                opts.login_timeout,
                &cancel,
            );
            ui.busy = None;
            if ok {
                ui.reset_form();
            }
        }
        Action::Logout => {
            app.logout();
            ui.reset_form();
        }
        Action::Search => match ui.filters() {
            Ok(filters) => {
                busy(terminal, app, ui, opts, "Scanning inbox...")?;
                app.search(filters);
                ui.busy = None;
                if app.screen() == Screen::Login {
                    ui.reset_form();
                } else {
                    ui.reset_results(app.results().len());
                }
            }
            Err(e) => app.toasts.error(e.to_string()),
        },
        Action::Download => {
            if !app.selection().is_empty() {
                busy(terminal, app, ui, opts, "Preparing ZIP...")?;
            }
            app.download();
            ui.busy = None;
            if app.screen() == Screen::Login {
                ui.reset_form();
            }
        }
        Action::ToggleCurrent => {
            if let Some(i) = ui.cursor() {
                app.toggle_at(i);
            }
        }
        Action::ToggleAll => app.toggle_all(),
        Action::ClearSelection => app.clear_selection(),
    }
    Ok(false)
}
