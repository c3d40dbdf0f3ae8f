// UI rendering logic
use crate::{App, InputMode};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};
use stargazer_core::{Connectivity, DataRow, EmptyKind, Mode, RepositoryRecord, Row, TimeWindow};

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Filter input
            Constraint::Min(5),    // List + detail
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_filter_input(frame, app, chunks[1]);

    // On narrow screens the list gets more room
    let list_pct = if frame.area().width < 100 { 60 } else { 50 };
    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(list_pct),
            Constraint::Percentage(100 - list_pct),
        ])
        .split(chunks[2]);

    render_list(frame, app, content_chunks[0]);
    render_detail(frame, app, content_chunks[1]);
    render_status_bar(frame, app, chunks[3]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(50),
            Constraint::Percentage(25),
        ])
        .split(area);

    let logo = Paragraph::new(Line::from(vec![Span::styled(
        "★ Stargazer",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(logo, header_chunks[0]);

    // Center: mode badge and window tabs
    let mode_badge = match app.engine.mode() {
        Mode::Browsing => Span::styled(
            " Trending ",
            Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Mode::Favoriting => Span::styled(
            " Favorites ",
            Style::default().fg(Color::Black).bg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
    };

    let mut spans = vec![mode_badge, Span::raw("  ")];
    let current = app.engine.time_window();
    for (i, window) in TimeWindow::all().iter().enumerate() {
        let style = if *window == current {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", window.title()), style));
        if i < TimeWindow::all().len() - 1 {
            spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
        }
    }

    let tabs = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(tabs, header_chunks[1]);

    // Right: favorites count and connectivity
    let (dot_color, online_text) = match app.engine.connectivity() {
        Connectivity::Online => (Color::Green, "online"),
        Connectivity::Offline => (Color::Red, "offline"),
    };
    let stats = Paragraph::new(Line::from(vec![
        Span::styled("★ ", Style::default().fg(Color::Magenta)),
        Span::styled(
            format!("{}", app.engine.favorites().len()),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("● ", Style::default().fg(dot_color)),
        Span::styled(online_text, Style::default().fg(dot_color)),
    ]))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Right);
    frame.render_widget(stats, header_chunks[2]);
}

fn render_filter_input(frame: &mut Frame, app: &App, area: Rect) {
    let (style, title) = match app.input_mode {
        InputMode::Filtering => (
            Style::default().fg(Color::Yellow),
            "Filter (ENTER: keep, ESC: clear)",
        ),
        InputMode::Normal => (Style::default(), "Filter (/)"),
    };

    let text = if app.filter_input.is_empty() && app.input_mode == InputMode::Normal {
        Line::from(Span::styled(
            "Filter loaded repositories by name",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut spans = vec![Span::styled(app.filter_input.as_str(), style)];
        if app.input_mode == InputMode::Filtering {
            spans.push(Span::styled("█", Style::default().fg(Color::Yellow)));
        }
        Line::from(spans)
    };

    let input = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(input, area);
}

fn list_title(app: &App) -> String {
    let noun = match app.engine.mode() {
        Mode::Browsing => "Trending",
        Mode::Favoriting => "Favorites",
    };

    match app.engine.filter_text() {
        Some(_) => format!(
            " {} ({} of {}) ",
            noun,
            app.engine.filtered_set().len(),
            active_len(app)
        ),
        None => format!(" {} ({}) ", noun, active_len(app)),
    }
}

fn active_len(app: &App) -> usize {
    match app.engine.mode() {
        Mode::Browsing => app.engine.working_set().len(),
        Mode::Favoriting => app.engine.favorites().len(),
    }
}

fn render_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = list_title(app);

    // A lone placeholder takes the whole pane
    if let [placeholder] = app.engine.rows() {
        let lines = match placeholder {
            Row::Loading => loading_lines(),
            Row::Empty(kind) => empty_lines(*kind),
            Row::Data(_) => Vec::new(),
        };
        if !lines.is_empty() {
            let paragraph = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title(title))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            app.loader_in_view = false;
            return;
        }
    }

    let desc_max = area.width.saturating_sub(10).max(20) as usize;
    let items: Vec<ListItem> = app
        .engine
        .rows()
        .iter()
        .map(|row| match row {
            Row::Data(data) => data_item(data, desc_max),
            Row::Loading => ListItem::new(Line::from(Span::styled(
                "   ⟳ Loading more...",
                Style::default().fg(Color::Cyan),
            ))),
            Row::Empty(kind) => ListItem::new(empty_lines(*kind)),
        })
        .collect();
    let heights: Vec<usize> = items.iter().map(ListItem::height).collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");

    frame.render_stateful_widget(list, area, &mut app.list_state);

    let trailing_loader = app.engine.rows().last() == Some(&Row::Loading);
    app.loader_in_view = trailing_loader
        && last_item_visible(&heights, app.list_state.offset(), area.height.saturating_sub(2) as usize);
}

/// Whether the last item fits in the viewport when scrolled to `offset`
fn last_item_visible(heights: &[usize], offset: usize, viewport: usize) -> bool {
    let mut used = 0;
    for height in heights.iter().skip(offset) {
        used += height;
        if used > viewport {
            return false;
        }
    }
    !heights.is_empty()
}

fn data_item(data: &DataRow, desc_max: usize) -> ListItem<'static> {
    let repo = &data.record;

    let line1 = Line::from(vec![
        Span::styled(
            if data.is_favorite { "★" } else { " " },
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(" "),
        Span::styled(
            format!("⭐{}", format_number(repo.star_count)),
            Style::default().fg(Color::Rgb(255, 215, 0)),
        ),
        Span::raw("  "),
        Span::styled(
            repo.full_name(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
    ]);

    let line2 = Line::from(vec![
        Span::raw("   "),
        Span::styled("●", Style::default().fg(Color::Rgb(147, 112, 219))),
        Span::raw(" "),
        Span::styled(
            repo.language.clone().unwrap_or_else(|| "Unknown".to_string()),
            Style::default().fg(Color::Rgb(147, 112, 219)),
        ),
        Span::raw("  •  "),
        Span::styled(
            format!("created {}", created_ago(repo)),
            Style::default().fg(Color::Rgb(128, 128, 128)),
        ),
    ]);

    let line3 = Line::from(Span::styled(
        format!("   {}", truncate(repo.description.as_deref().unwrap_or("No description"), desc_max)),
        Style::default().fg(Color::Rgb(105, 105, 105)),
    ));

    ListItem::new(vec![line1, line2, line3])
}

fn loading_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            "⟳ Loading repositories...",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
    ]
}

fn empty_lines(kind: EmptyKind) -> Vec<Line<'static>> {
    let color = if kind.is_error() { Color::Red } else { Color::Yellow };
    vec![
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            kind.title(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(kind.hint(), Style::default().fg(Color::DarkGray))),
    ]
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let lines = match app.selected_record() {
        Some(repo) => detail_lines(repo, app.engine.is_favorite(repo.id)),
        None => vec![Line::from(Span::styled(
            "Nothing selected",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Details "))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn detail_lines(repo: &RepositoryRecord, is_favorite: bool) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            repo.full_name(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    if let Some(desc) = &repo.description {
        lines.push(Line::from(desc.clone()));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(vec![
        Span::raw("⭐ Stars:     "),
        Span::styled(
            format_number(repo.star_count),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
    ]));
    lines.push(Line::from(vec![
        Span::raw("🍴 Forks:     "),
        Span::styled(format_number(repo.fork_count), Style::default().fg(Color::Blue)),
    ]));
    lines.push(Line::from(vec![
        Span::raw("💻 Language:  "),
        Span::styled(
            repo.language.clone().unwrap_or_else(|| "Unknown".to_string()),
            Style::default().fg(Color::Rgb(147, 112, 219)),
        ),
    ]));
    lines.push(Line::from(vec![
        Span::raw("📅 Created:   "),
        Span::styled(
            repo.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            Style::default().fg(Color::Gray),
        ),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        repo.url_path.clone(),
        Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
    )));
    lines.push(Line::from(""));

    let favorite_line = if is_favorite {
        Span::styled("★ In favorites", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("☆ Not in favorites", Style::default().fg(Color::DarkGray))
    };
    lines.push(Line::from(favorite_line));

    lines
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = match (app.status(), app.input_mode) {
        (Some(message), _) => {
            let color = if message.is_error { Color::Red } else { Color::Green };
            Span::styled(message.text.clone(), Style::default().fg(color))
        }
        (None, InputMode::Filtering) => Span::styled(
            "FILTER | Type to narrow | ENTER: keep | ESC: clear",
            Style::default().fg(Color::Yellow),
        ),
        (None, InputMode::Normal) => match app.engine.mode() {
            Mode::Browsing => Span::raw(
                "j/k: navigate | /: filter | f: favorite | TAB: favorites | w: window | r: refresh | ENTER: open | y: copy | q: quit",
            ),
            Mode::Favoriting => Span::raw(
                "j/k: navigate | /: filter | f: unfavorite | TAB: trending | ENTER: open | y: copy | q: quit",
            ),
        },
    };

    frame.render_widget(Paragraph::new(Line::from(status)), area);
}

fn format_number(num: u32) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}k", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}

fn created_ago(repo: &RepositoryRecord) -> String {
    let hours = (chrono::Utc::now() - repo.created_at).num_hours();
    if hours < 1 {
        "just now".to_string()
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else {
        format!("{}d ago", hours / 24)
    }
}

/// Cut at a char boundary so multibyte descriptions don't panic
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}
