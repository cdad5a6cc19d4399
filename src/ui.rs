use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, InputMode};
use crate::model::{ResourceTab, ViewKind};
use crate::projection::ColumnHint;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const PL_D: Color = Color::Rgb(82, 24, 124);

/// Everything one frame shows, detached from ratatui.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Screen {
    pub breadcrumb: Vec<String>,
    pub tabs: Option<Vec<TabLabel>>,
    pub body: Body,
    pub search: Option<SearchPrompt>,
    pub status: String,
    pub refreshed: Option<String>,
    pub hints: Vec<(&'static str, &'static str)>,
    pub help: Option<Vec<String>>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TabLabel {
    pub title: &'static str,
    pub shortcut: u8,
    pub active: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SearchPrompt {
    pub query: String,
    pub editing: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Body {
    Loading(String),
    Error(String),
    Table {
        title: String,
        columns: Vec<ColumnHint>,
        rows: Vec<Vec<String>>,
        selected: Option<usize>,
        placeholder: bool,
    },
}

pub fn present(app: &App) -> Screen {
    let nav = app.navigation();

    let mut breadcrumb = vec![nav.view.title().to_string()];
    if let Some(subscription_id) = nav.selected_subscription_id.as_deref() {
        // Display name when the subscription list has it, raw id otherwise.
        let label = app
            .cache()
            .subscriptions()
            .iter()
            .find(|subscription| subscription.id == subscription_id)
            .map(|subscription| subscription.display_name.clone())
            .unwrap_or_else(|| subscription_id.to_string());
        breadcrumb.push(label);
    }
    if let Some(group) = nav.selected_resource_group.as_deref() {
        breadcrumb.push(group.to_string());
    }

    let tabs = (nav.view == ViewKind::Resources).then(|| {
        ResourceTab::ALL
            .into_iter()
            .map(|tab| TabLabel {
                title: tab.title(),
                shortcut: tab.shortcut(),
                active: tab == nav.active_tab,
            })
            .collect()
    });

    // Loading wins over a stale error; the error stays until a fetch succeeds.
    let body = if nav.loading {
        let what = app
            .pending()
            .map(|request| request.describe())
            .unwrap_or_else(|| nav.view.title().to_ascii_lowercase());
        Body::Loading(format!("Loading {what}…"))
    } else if let Some(error) = nav.last_error.as_deref() {
        Body::Error(error.to_string())
    } else {
        let projection = app.projection();
        let placeholder = projection.empty_message.is_some();
        let title = match nav.view {
            ViewKind::Resources => format!(
                "{} ({})",
                nav.active_tab.title(),
                projection.data_len()
            ),
            view => format!("{} ({})", view.title(), projection.data_len()),
        };
        Body::Table {
            title,
            columns: projection.columns,
            rows: projection.rows,
            selected: app.selected_index(),
            placeholder,
        }
    };

    let search = (nav.search_mode || !nav.search_query.is_empty()).then(|| SearchPrompt {
        query: nav.search_query.clone(),
        editing: nav.search_mode,
    });

    Screen {
        breadcrumb,
        tabs,
        body,
        search,
        status: app.status().to_string(),
        refreshed: app.last_refreshed(),
        hints: key_hints(app),
        help: app.show_help().then(help_lines),
    }
}

fn key_hints(app: &App) -> Vec<(&'static str, &'static str)> {
    if app.mode() == InputMode::Search {
        return vec![("enter", "keep"), ("esc", "cancel")];
    }

    let mut hints = Vec::new();
    match app.navigation().view {
        ViewKind::Subscriptions => hints.push(("enter", "open")),
        ViewKind::ResourceGroups => {
            hints.push(("enter", "open"));
            hints.push(("esc", "back"));
        }
        ViewKind::Resources => {
            hints.push(("tab", "category"));
            hints.push(("/", "search"));
            hints.push(("esc", "back"));
        }
    }
    hints.push(("r", "refresh"));
    hints.push(("?", "help"));
    hints.push(("q", "quit"));
    hints
}

fn help_lines() -> Vec<String> {
    vec![
        "Flow: Enter drill-down  Esc step-back".to_string(),
        "Move: j/k or arrows  PgUp/PgDn or Ctrl+u/Ctrl+d  g/G or Home/End".to_string(),
        "Categories: Tab/Right next  Shift+Tab/Left previous".to_string(),
        "            1 Clusters  2 Compute  3 Network  4 Storage  5 Web  0/6 All".to_string(),
        "Search: / start  Enter keep filter  Esc cancel (Esc again leaves)".to_string(),
        "Data: r/F5 refresh current view".to_string(),
        "Misc: ? toggle help  q/Ctrl+c quit".to_string(),
    ]
}

pub fn render(frame: &mut Frame, app: &App) {
    let screen = present(app);
    let tabs_height = if screen.tabs.is_some() { 1 } else { 0 };
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(tabs_height),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], &screen);
    if let Some(tabs) = screen.tabs.as_deref() {
        render_tabs(frame, root[1], tabs);
    }
    render_body(frame, root[2], &screen.body);
    render_footer(frame, root[3], &screen);

    if let Some(lines) = screen.help.as_deref() {
        render_help_modal(frame, lines);
    }
}

fn render_header(frame: &mut Frame, area: Rect, screen: &Screen) {
    let mut spans = Vec::new();
    let palette = [PL_B, PL_C, PL_D];
    let crumbs = screen.breadcrumb.len();
    let first_bg = if crumbs > 0 { palette[0] } else { BG };
    push_powerline_segment(&mut spans, " 󰠅 azr ", Color::White, PL_A, first_bg);
    for (index, crumb) in screen.breadcrumb.iter().enumerate() {
        let bg = palette[index.min(palette.len() - 1)];
        let next_bg = if index + 1 < crumbs {
            palette[(index + 1).min(palette.len() - 1)]
        } else {
            BG
        };
        push_powerline_segment(
            &mut spans,
            format!(" {} ", compact_text(crumb, 36)),
            Color::White,
            bg,
            next_bg,
        );
    }
    let left_line = Line::from(spans);

    let Some(refreshed) = screen.refreshed.as_deref() else {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    };

    let mut right = Vec::new();
    push_powerline_segment_rtl(&mut right, format!(" 󰑓 {refreshed} "), Color::White, PL_A, BG);
    let right_width = spans_width(&right) as u16;
    if area.width < 42 || right_width >= area.width {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(right)).style(Style::default().bg(BG)),
        chunks[1],
    );
}

fn render_tabs(frame: &mut Frame, area: Rect, tabs: &[TabLabel]) {
    let mut spans = vec![Span::styled(" ", Style::default().bg(BG))];
    for tab in tabs {
        let label = format!(" {} {} ", tab.shortcut, tab.title);
        let style = if tab.active {
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED).bg(PANEL)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::styled(" ", Style::default().bg(BG)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_body(frame: &mut Frame, area: Rect, body: &Body) {
    match body {
        Body::Loading(message) => {
            let panel = Paragraph::new(Text::from(format!("󰔟 {message}")))
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(MUTED))
                        .style(Style::default().bg(PANEL)),
                )
                .style(Style::default().fg(WARN));
            frame.render_widget(panel, area);
        }
        Body::Error(error) => {
            let panel = Paragraph::new(Text::from(error.clone()))
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .title("Error")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(ERROR))
                        .style(Style::default().bg(PANEL)),
                )
                .style(Style::default().fg(ERROR));
            frame.render_widget(panel, area);
        }
        Body::Table {
            title,
            columns,
            rows,
            selected,
            placeholder,
        } => render_table(frame, area, title, columns, rows, *selected, *placeholder),
    }
}

fn render_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    columns: &[ColumnHint],
    rows: &[Vec<String>],
    selected: Option<usize>,
    placeholder: bool,
) {
    let header_row = Row::new(columns.iter().map(|column| {
        Cell::from(column.title).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let cell_style = if placeholder {
        Style::default().fg(MUTED).add_modifier(Modifier::ITALIC)
    } else {
        Style::default().fg(Color::White)
    };
    let body_rows = rows.iter().map(|row| {
        Row::new(
            row.iter()
                .map(|value| Cell::from(value.clone()).style(cell_style)),
        )
    });

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));

    let table = Table::new(body_rows, column_constraints(columns))
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(24, 36, 58))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("󰜴 ");

    let mut state = TableState::default();
    state.select(selected);
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, screen: &Screen) {
    let mut spans = Vec::new();

    match screen.search.as_ref() {
        Some(search) if search.editing => {
            push_powerline_segment(&mut spans, " 󰍉 srch ", Color::Black, WARN, PL_B);
            push_powerline_segment(
                &mut spans,
                format!(" /{}█ ", search.query),
                Color::White,
                PL_B,
                BG,
            );
        }
        search => {
            let status_bg = if search.is_some() { PL_C } else { PL_B };
            push_powerline_segment(&mut spans, " 󰘳 nrm ", Color::White, PL_A, status_bg);
            if let Some(search) = search {
                push_powerline_segment(
                    &mut spans,
                    format!(" 󰈲 {} ", compact_text(&search.query, 24)),
                    Color::White,
                    PL_C,
                    PL_B,
                );
            }
            let status_width_hint = area.width.saturating_sub(24).min(120) as usize;
            push_powerline_segment(
                &mut spans,
                format!(
                    " {} {} ",
                    footer_status_icon(&screen.status),
                    compact_text(&screen.status, status_width_hint.max(24))
                ),
                Color::White,
                PL_B,
                BG,
            );
        }
    }

    let hint_spans = build_hint_spans(&screen.hints);
    let min_left = 28u16;
    let max_right = area.width.saturating_sub(min_left);
    let right_width = (spans_width(&hint_spans) as u16).min(max_right);
    if right_width == 0 {
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(hint_spans))
            .style(Style::default().bg(BG))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn build_hint_spans(hints: &[(&'static str, &'static str)]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(
            format!(" {key}"),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {label}"), Style::default().fg(MUTED)));
    }
    spans.push(Span::raw(" "));
    spans
}

fn footer_status_icon(status_text: &str) -> &'static str {
    let status = status_text.to_ascii_lowercase();
    let has_failure = ["failed", "error", "timed out", "denied", "not found"]
        .iter()
        .any(|needle| status.contains(needle));
    if has_failure { "󰅚" } else { "󰄬" }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn push_powerline_segment_rtl(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn render_help_modal(frame: &mut Frame, lines: &[String]) {
    let area = centered_rect(78, 60, frame.area());
    frame.render_widget(Clear, area);

    let mut text = vec![Line::from("azr help"), Line::from("")];
    text.extend(lines.iter().map(|line| Line::from(line.clone())));

    let modal = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}

/// Column hints are proportional weights; the table area is narrower than the
/// width they were computed for.
fn column_constraints(columns: &[ColumnHint]) -> Vec<Constraint> {
    if columns.is_empty() {
        return vec![Constraint::Percentage(100)];
    }

    columns
        .iter()
        .map(|column| Constraint::Fill(column.width.max(1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Body, present, render};
    use crate::app::App;
    use crate::fetch::{FetchError, FetchEvent, FetchRequest};
    use crate::input::Action;
    use crate::model::{Resource, ResourceGroup, ResourceGroupKey, Subscription, SubscriptionState};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn loaded_app() -> App {
        let mut app = App::new();
        app.handle_fetch_event(FetchEvent::SubscriptionsFetched(vec![Subscription {
            id: "s1".to_string(),
            display_name: "Sub1".to_string(),
            state: SubscriptionState::Enabled,
        }]));
        app
    }

    fn app_in_resources() -> App {
        let mut app = loaded_app();
        app.apply_action(Action::Select);
        app.handle_fetch_event(FetchEvent::ResourceGroupsFetched {
            subscription_id: "s1".to_string(),
            groups: vec![ResourceGroup {
                name: "rg-app".to_string(),
                location: "westeurope".to_string(),
                subscription_id: "s1".to_string(),
            }],
        });
        app.apply_action(Action::Select);
        let key = ResourceGroupKey::new("s1", "rg-app");
        app.handle_fetch_event(FetchEvent::ResourcesFetched {
            key: key.clone(),
            resources: vec![Resource {
                name: "web".to_string(),
                resource_type: "Microsoft.Web/sites".to_string(),
                group: key,
                provisioning_state: Some("Succeeded".to_string()),
            }],
        });
        app
    }

    fn screen_text(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn startup_shows_loading_body() {
        let screen = present(&App::new());
        assert_eq!(screen.body, Body::Loading("Loading subscriptions…".to_string()));
        assert_eq!(screen.breadcrumb, vec!["Subscriptions"]);
        assert!(screen.tabs.is_none());
    }

    #[test]
    fn subscriptions_render_as_table() {
        let screen = present(&loaded_app());
        let Body::Table {
            rows,
            selected,
            placeholder,
            ..
        } = screen.body
        else {
            panic!("expected table");
        };
        assert_eq!(rows, vec![vec!["Sub1", "s1", "Enabled"]]);
        assert_eq!(selected, Some(0));
        assert!(!placeholder);
    }

    #[test]
    fn resources_view_shows_tabs_and_breadcrumb() {
        let app = app_in_resources();
        let screen = present(&app);

        assert_eq!(screen.breadcrumb, vec!["Resources", "Sub1", "rg-app"]);
        let tabs = screen.tabs.expect("tabs in resources view");
        assert_eq!(tabs.len(), 6);
        let active = tabs.iter().filter(|tab| tab.active).collect::<Vec<_>>();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "Web");
    }

    #[test]
    fn error_replaces_table() {
        let mut app = loaded_app();
        app.apply_action(Action::Select);
        app.handle_fetch_event(FetchEvent::FetchFailed {
            request: FetchRequest::resource_groups("s1"),
            error: FetchError::new("AuthorizationFailed"),
        });
        assert_eq!(
            present(&app).body,
            Body::Error("AuthorizationFailed".to_string())
        );
    }

    #[test]
    fn search_prompt_follows_mode() {
        let mut app = app_in_resources();
        app.apply_action(Action::StartSearch);
        app.apply_action(Action::InputChar('w'));
        let screen = present(&app);
        let search = screen.search.expect("search prompt");
        assert!(search.editing);
        assert_eq!(search.query, "w");
        assert_eq!(screen.hints[0], ("enter", "keep"));

        app.apply_action(Action::SubmitSearch);
        let search = present(&app).search.expect("committed filter");
        assert!(!search.editing);

        app.apply_action(Action::Back);
        assert!(present(&app).search.is_none());
    }

    #[test]
    fn empty_tab_is_marked_placeholder() {
        let mut app = app_in_resources();
        app.apply_action(Action::SelectTab(1));
        let Body::Table {
            rows,
            selected,
            placeholder,
            ..
        } = present(&app).body
        else {
            panic!("expected table");
        };
        assert!(placeholder);
        assert_eq!(selected, None);
        assert_eq!(rows[0][0], "No clusters found in this resource group");
    }

    #[test]
    fn help_overlay_is_part_of_screen() {
        let mut app = loaded_app();
        assert!(present(&app).help.is_none());
        app.apply_action(Action::ToggleHelp);
        assert!(present(&app).help.is_some_and(|lines| !lines.is_empty()));
    }

    #[test]
    fn renders_rows_into_terminal_buffer() {
        let text = screen_text(&loaded_app(), 100, 20);
        assert!(text.contains("Sub1"));
        assert!(text.contains("Enabled"));

        let text = screen_text(&app_in_resources(), 100, 20);
        assert!(text.contains("Sites"));
        assert!(text.contains("Succeeded"));
    }

    #[test]
    fn renders_on_tiny_terminal() {
        let mut app = app_in_resources();
        app.apply_action(Action::ToggleHelp);
        screen_text(&app, 20, 6);
    }
}
