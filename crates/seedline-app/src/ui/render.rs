//! Drawing of the item table, info pane, status line, and overlays.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
    Wrap,
};
use seedline_torrent_core::{Item, ItemStatus};

use super::app::{App, DeletePrompt, FilesView};
use super::humanize;
use super::input::{BINDINGS, InputMode};
use super::view::CategoryFilter;

pub(crate) fn draw(frame: &mut Frame, app: &App) {
    let degraded = app.health.degraded;
    let mut constraints = vec![Constraint::Length(1)];
    if degraded {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(3));
    if app.show_info {
        constraints.push(Constraint::Length(9));
    }
    constraints.push(Constraint::Length(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    let mut next = 0;
    let mut take = || {
        let area = chunks[next];
        next += 1;
        area
    };

    draw_header(frame, take(), app);
    if degraded {
        draw_degraded_banner(frame, take(), app);
    }
    draw_table(frame, take(), app);
    if app.show_info {
        draw_info(frame, take(), app);
    }
    draw_status_line(frame, take(), app);

    match app.mode {
        InputMode::Help => draw_help(frame),
        InputMode::Confirm => {
            if let Some(prompt) = &app.prompt {
                draw_confirm(frame, prompt);
            }
        }
        InputMode::Categories => draw_categories(frame, app),
        InputMode::Files => {
            if let Some(files) = &app.files {
                draw_files(frame, files);
            }
        }
        InputMode::Normal | InputMode::Search => {}
    }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let (down, up) = app
        .snapshot
        .items
        .iter()
        .fold((0_u64, 0_u64), |(down, up), item| {
            (
                down.saturating_add(item.rates.download_bps),
                up.saturating_add(item.rates.upload_bps),
            )
        });
    let line = Line::from(vec![
        Span::styled("seedline", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  |  "),
        Span::raw(app.daemon.as_str()),
        Span::raw(format!(
            "  |  {} items  DL {}  UL {}",
            app.snapshot.len(),
            humanize::rate(down),
            humanize::rate(up)
        )),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_degraded_banner(frame: &mut Frame, area: Rect, app: &App) {
    let detail = app.health.last_error.as_deref().unwrap_or("daemon unreachable");
    let since = app
        .health
        .last_success_at
        .map(|at| format!(", last update {}", at.format("%H:%M:%S")))
        .unwrap_or_default();
    let text = format!(
        " stale: {} failed polls ({detail}){since}",
        app.health.consecutive_failures
    );
    let banner = Paragraph::new(text).style(Style::default().fg(Color::Black).bg(Color::Yellow));
    frame.render_widget(banner, area);
}

fn status_style(status: ItemStatus) -> Style {
    let color = match status {
        ItemStatus::Downloading => Color::Cyan,
        ItemStatus::Seeding => Color::Green,
        ItemStatus::Completed => Color::LightGreen,
        ItemStatus::Paused => Color::DarkGray,
        ItemStatus::Queued => Color::Blue,
        ItemStatus::Error => Color::Red,
        ItemStatus::RemovedPending => Color::Magenta,
    };
    Style::default().fg(color)
}

fn item_row(item: &Item) -> Row<'_> {
    Row::new(vec![
        Cell::from(item.name.as_str()),
        Cell::from(item.status.label()).style(status_style(item.status)),
        Cell::from(humanize::percentage(item.progress)),
        Cell::from(humanize::bytes(item.size_bytes)),
        Cell::from(humanize::rate(item.rates.download_bps)),
        Cell::from(humanize::rate(item.rates.upload_bps)),
        Cell::from(humanize::eta(item.eta_seconds)),
    ])
}

fn draw_table(frame: &mut Frame, area: Rect, app: &App) {
    let rows = app.rows();
    let selected = app
        .view
        .selected_id()
        .and_then(|id| rows.iter().position(|item| &item.id == id));

    let mut title = format!(" Torrents ({})", rows.len());
    if *app.view.category() != CategoryFilter::All {
        title.push_str(&format!(" in {}", app.view.category()));
    }
    if let Some(order) = app.view.sort() {
        title.push_str(&format!(" sorted by {order}"));
    }
    title.push(' ');
    let header = Row::new(["Name", "Status", "Done", "Size", "Down", "Up", "ETA"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let widths = [
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(7),
        Constraint::Length(9),
        Constraint::Length(11),
        Constraint::Length(11),
        Constraint::Length(8),
    ];
    let table = Table::new(rows.iter().map(|item| item_row(item)), widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = TableState::default().with_selected(selected);
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_info(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title(" Info ");
    let Some(item) = app.selected_item() else {
        frame.render_widget(Paragraph::new("no item selected").block(block), area);
        return;
    };
    let field = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:>9}: "), Style::default().fg(Color::DarkGray)),
            Span::raw(value),
        ])
    };
    let lines = vec![
        Line::from(Span::styled(
            item.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        field("id", item.id.to_string()),
        field(
            "status",
            format!("{} ({})", item.status, humanize::percentage(item.progress)),
        ),
        field("category", item.category.clone().unwrap_or_default()),
        field("save path", item.save_path.clone().unwrap_or_default()),
        field(
            "content",
            item.content_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
        ),
        field("error", item.last_error.clone().unwrap_or_default()),
    ];
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_status_line(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(10)])
        .split(area);

    let left = if app.mode == InputMode::Search {
        Line::from(format!("/{}", app.view.query()))
    } else if let Some(status) = &app.status {
        let color = if status.is_error { Color::Red } else { Color::Green };
        Line::from(Span::styled(status.text.clone(), Style::default().fg(color)))
    } else if app.view.query().is_empty() {
        Line::from(format!("generation {}", app.snapshot.generation))
    } else {
        Line::from(format!("filter /{}", app.view.query()))
    };
    frame.render_widget(Paragraph::new(left), sections[0]);
    frame.render_widget(
        Paragraph::new("help [?]").alignment(Alignment::Right),
        sections[1],
    );
}

fn draw_help(frame: &mut Frame) {
    let area = centered_rect(60, 70, frame.area());
    let lines: Vec<Line> = BINDINGS
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{keys:>14}  "), Style::default().fg(Color::Yellow)),
                Span::raw(*what),
            ])
        })
        .collect();
    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(" Key bindings ").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn draw_confirm(frame: &mut Frame, prompt: &DeletePrompt) {
    let area = centered_rect(50, 35, frame.area());
    let block = Block::default().title(" Confirm ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);
    let question = if prompt.delete_files {
        "Delete the torrent AND its files?"
    } else {
        "Delete the torrent? Files stay on disk."
    };
    let text = vec![
        Line::from(question),
        Line::from(""),
        Line::from(Span::styled(
            prompt.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        rows[0],
    );

    let buttons = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(rows[1]);
    let highlighted = Style::default().add_modifier(Modifier::REVERSED);
    let (ok, cancel) = if prompt.confirm {
        (highlighted, Style::default())
    } else {
        (Style::default(), highlighted)
    };
    frame.render_widget(
        Paragraph::new("Ok").style(ok).alignment(Alignment::Center),
        buttons[0],
    );
    frame.render_widget(
        Paragraph::new("Cancel")
            .style(cancel)
            .alignment(Alignment::Center),
        buttons[1],
    );
}

fn draw_categories(frame: &mut Frame, app: &App) {
    let area = centered_rect(40, 60, frame.area());
    let choices = app.category_choices();
    let items: Vec<ListItem> = choices
        .iter()
        .map(|choice| {
            let count = app
                .snapshot
                .items
                .iter()
                .filter(|item| choice.matches(item))
                .count();
            ListItem::new(format!("{choice} ({count})"))
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().title(" Select category ").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(app.category_cursor));
    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_files(frame: &mut Frame, view: &FilesView) {
    let area = centered_rect(80, 70, frame.area());
    let items: Vec<ListItem> = view
        .files
        .iter()
        .map(|file| {
            ListItem::new(Line::from(vec![
                Span::raw(file.name.clone()),
                Span::styled(
                    format!(
                        "  {}  {}",
                        humanize::bytes(file.size_bytes),
                        humanize::percentage(file.progress)
                    ),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    let title = format!(" Files of {} ", view.name);
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(view.cursor));
    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
