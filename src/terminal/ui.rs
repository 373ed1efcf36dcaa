use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use std::time::Instant;

use crate::api::Backend;
use crate::app::{App, ResultsView, Screen};
use crate::domain::email::{EmailRecord, FileKind};
use crate::domain::search::FileType;
use crate::notify::ToastKind;
use crate::terminal::state::{Focus, UiState};

pub const EMPTY_TITLE: &str = "No invoices found";
pub const EMPTY_HINT: &str = "Try other terms or date filters.";

pub fn render<B: Backend>(f: &mut Frame, app: &App<B>, ui: &UiState, now: Instant) {
    match app.screen() {
        Screen::Login => render_login(f, ui),
        Screen::Main => render_main(f, app, ui),
    }
    render_toasts(f, app, now);
}

fn render_login(f: &mut Frame, ui: &UiState) {
    let [_, mid, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(9),
        Constraint::Fill(1),
    ])
    .areas(f.area());
    let [_, center, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(60),
        Constraint::Fill(1),
    ])
    .areas(mid);

    let status = ui
        .busy
        .clone()
        .unwrap_or_else(|| "Connect your Gmail account to look for invoices.".to_string());

    let text = Text::from(vec![
        Line::from(""),
        Line::from(Span::styled(
            "Invoice downloader",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(status),
        Line::from(""),
        Line::from(vec![
            Span::styled("l", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" connect with Google   "),
            Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" quit"),
        ]),
    ]);

    let p = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    f.render_widget(p, center);
}

fn render_main<B: Backend>(f: &mut Frame, app: &App<B>, ui: &UiState) {
    let action_bar_height = if app.action_bar_visible() { 1 } else { 0 };
    let [header, form, results, action_bar, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Min(3),
        Constraint::Length(action_bar_height),
        Constraint::Length(1),
    ])
    .areas(f.area());

    render_header(f, app, header);
    render_form(f, ui, form);
    render_results(f, app, ui, results);
    if app.action_bar_visible() {
        let bar = Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" {} selected ", app.selection().len()),
                Style::default().fg(Color::Black).bg(Color::Blue),
            ),
            Span::raw("  "),
            Span::styled("d", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" download ZIP  "),
            Span::styled("c", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" clear"),
        ]));
        f.render_widget(bar, action_bar);
    }
    render_footer(f, app, footer);
}

fn render_header<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let user = app.user_email().unwrap_or("connected");
    let line = Line::from(vec![
        Span::styled(" ● ", Style::default().fg(Color::Green)),
        Span::raw(user.to_string()),
        Span::raw("   "),
        Span::styled(app.count_label(), Style::default().fg(Color::Gray)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_form(f: &mut Frame, ui: &UiState, area: Rect) {
    let [term, kind, start, end] = Layout::horizontal([
        Constraint::Percentage(40),
        Constraint::Percentage(20),
        Constraint::Percentage(20),
        Constraint::Percentage(20),
    ])
    .areas(area);

    field(f, term, " Search ", &ui.term, ui.focus == Focus::Term);
    let kinds = FileType::ALL
        .iter()
        .map(|t| {
            if *t == ui.file_type {
                format!("[{t}]")
            } else {
                t.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    field(f, kind, " Type ", &kinds, ui.focus == Focus::FileType);
    field(f, start, " From (YYYY-MM-DD) ", &ui.start_date, ui.focus == Focus::StartDate);
    field(f, end, " To (YYYY-MM-DD) ", &ui.end_date, ui.focus == Focus::EndDate);
}

fn field(f: &mut Frame, area: Rect, title: &str, value: &str, focused: bool) {
    let border = if focused { Color::Yellow } else { Color::DarkGray };
    let shown = if focused && title != " Type " {
        format!("{value}_")
    } else {
        value.to_string()
    };
    let p = Paragraph::new(shown).block(
        Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(p, area);
}

fn render_results<B: Backend>(f: &mut Frame, app: &App<B>, ui: &UiState, area: Rect) {
    let border = if ui.focus == Focus::List {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .title(" Invoices ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    if let Some(busy) = &ui.busy {
        let p = Paragraph::new(busy.clone())
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(p, area);
        return;
    }

    match app.results_view() {
        ResultsView::Idle => {
            let p = Paragraph::new("Fill in the filters and press Enter to search your inbox.")
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(p, area);
        }
        ResultsView::Empty => {
            let text = Text::from(vec![
                Line::from(""),
                Line::from(Span::styled(
                    EMPTY_TITLE,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(EMPTY_HINT, Style::default().fg(Color::Gray))),
            ]);
            let p = Paragraph::new(text)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(p, area);
        }
        ResultsView::List(emails) => {
            let items: Vec<ListItem> = emails
                .iter()
                .map(|e| result_item(e, app.is_selected(&e.id)))
                .collect();
            let list = List::new(items)
                .block(block)
                .highlight_symbol("➜ ")
                .highlight_style(Style::default().fg(Color::Green));
            f.render_stateful_widget(list, area, &mut ui.list_state.clone());
        }
    }
}

fn result_item(e: &EmailRecord, selected: bool) -> ListItem<'static> {
    let mark = if selected { "[x] " } else { "[ ] " };
    let (icon, icon_color) = match e.kind() {
        FileKind::Pdf => ("PDF ", Color::Red),
        FileKind::Structured => ("DTE ", Color::Yellow),
        FileKind::Other => ("FILE", Color::Gray),
        FileKind::None => ("----", Color::DarkGray),
    };

    let mut first = vec![
        Span::styled(
            mark,
            Style::default().fg(if selected { Color::Blue } else { Color::Gray }),
        ),
        Span::styled(format!("{icon} "), Style::default().fg(icon_color)),
        Span::styled(e.subject.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ];
    if e.downloaded {
        first.push(Span::styled(
            "  ALREADY DOWNLOADED",
            Style::default().fg(Color::Green),
        ));
    }

    let mut second = vec![
        Span::raw("         "),
        Span::raw(e.sender_label().to_string()),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::raw(e.date.clone()),
    ];
    if let Some(code) = &e.generation_code {
        second.push(Span::styled(
            format!("  # {code}"),
            Style::default().fg(Color::Cyan),
        ));
    }

    let third = Line::from(vec![
        Span::raw("         "),
        Span::styled(e.display_snippet(), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("  {} attachment(s)", e.attachments.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let style = if selected {
        Style::default().bg(Color::Rgb(20, 30, 60))
    } else {
        Style::default()
    };
    ListItem::new(Text::from(vec![Line::from(first), Line::from(second), third])).style(style)
}

fn render_footer<B: Backend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut spans = vec![
        Span::styled("Tab", bold),
        Span::raw(" focus  "),
        Span::styled("Enter", bold),
        Span::raw(" search  "),
    ];
    if app.selection_controls_visible() {
        spans.extend([
            Span::styled("Space", bold),
            Span::raw(" select  "),
            Span::styled("a", bold),
            Span::raw(" all  "),
        ]);
    }
    spans.extend([
        Span::styled("L", bold),
        Span::raw(" logout  "),
        Span::styled("q", bold),
        Span::raw(" quit"),
    ]);
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_toasts<B: Backend>(f: &mut Frame, app: &App<B>, now: Instant) {
    let area = f.area();
    let width = area.width.min(50);
    let mut y = area.y + 1;

    for toast in app.toasts.visible(now) {
        if y + 3 > area.bottom() {
            break;
        }
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
            ToastKind::Info => Color::Blue,
        };
        let mut style = Style::default().fg(color);
        if app.toasts.is_fading(toast, now) {
            style = style.add_modifier(Modifier::DIM);
        }
        let rect = Rect::new(area.right().saturating_sub(width + 1), y, width, 3);
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(toast.message.clone())
                .style(style)
                .block(Block::default().borders(Borders::ALL).border_style(style)),
            rect,
        );
        y += 3;
    }
}
