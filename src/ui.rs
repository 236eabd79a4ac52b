use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState, Padding, Paragraph};

use crate::actions::ActionId;
use crate::app::App;
use crate::domain::{ActivePane, CommitRecord};

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
const FOCUS_COLOR: Color = Color::LightCyan;
const CONTENT_BORDER_COLOR: Color = Color::Indexed(62);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiRects {
    pub history: Rect,
    pub content: Rect,
}

/// Two side-by-side panes of `width / 2` columns each, top aligned.
pub fn compute_ui_rects(root: Rect) -> UiRects {
    let pane_width = root.width / 2;
    let [history, content] = Layout::horizontal([
        Constraint::Length(pane_width),
        Constraint::Length(pane_width),
    ])
    .flex(Flex::Start)
    .areas(root);
    UiRects { history, content }
}

pub fn render(frame: &mut Frame<'_>, app: &App) {
    let rects = compute_ui_rects(frame.area());
    render_history(frame, rects.history, app);
    render_content(frame, rects.content, app);
}

fn render_history(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let focused = app.active == ActivePane::History;
    let current = app.selection.current().map(|record| record.hash.as_str());
    let previous = app.selection.previous().map(|record| record.hash.as_str());

    let items: Vec<ListItem<'_>> = if app.history.is_empty() {
        let placeholder = if app.is_loading() {
            "(loading history)"
        } else {
            "(no commits)"
        };
        vec![ListItem::new(placeholder)]
    } else {
        app.history
            .visible_records()
            .map(|record| history_item(record, current, previous))
            .collect()
    };

    let mut state = ListState::default();
    if app.history.visible_len() > 0 {
        *state.offset_mut() = app.history.offset();
        state.select(Some(app.history.index()));
    }

    let mut title = app.history.title();
    if app.is_loading() {
        let frame_idx = app.spinner_frame() % SPINNER_FRAMES.len();
        title = format!("{title} {}", SPINNER_FRAMES[frame_idx]);
    }

    let mut block = Block::default()
        .title(title)
        .title_bottom(history_footer(app))
        .borders(Borders::ALL);
    if focused {
        block = block.border_style(Style::default().fg(FOCUS_COLOR));
    }

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_stateful_widget(list, area, &mut state);
}

fn history_item<'a>(
    record: &'a CommitRecord,
    current: Option<&str>,
    previous: Option<&str>,
) -> ListItem<'a> {
    let hash = Some(record.hash.as_str());
    let marker = if hash == current {
        Span::styled("● ", Style::default().fg(Color::Green))
    } else if hash == previous {
        Span::styled("○ ", Style::default().fg(Color::Yellow))
    } else {
        Span::raw("  ")
    };
    let title = Line::from(vec![marker, Span::raw(record.title())]);
    let description = Line::from(Span::styled(
        format!("  {}", record.description()),
        Style::default().fg(Color::DarkGray),
    ));
    ListItem::new(Text::from(vec![title, description]))
}

fn history_footer(app: &App) -> Line<'static> {
    if let Some(error) = &app.error {
        return Line::from(Span::styled(
            error.message.clone(),
            Style::default().fg(Color::Red),
        ));
    }
    if app.history.is_editing_filter() || !app.history.filter().is_empty() {
        let cursor = if app.history.is_editing_filter() { "_" } else { "" };
        return Line::from(format!("/{}{cursor}", app.history.filter()));
    }

    let hints = [
        (ActionId::Quit, "quit"),
        (ActionId::ConfirmSelection, "select"),
        (ActionId::RequestDiff, "diff"),
        (ActionId::TogglePane, "pane"),
        (ActionId::Filter, "filter"),
        (ActionId::Refresh, "refresh"),
    ];
    let text = hints
        .iter()
        .map(|(action, label)| format!("{} {label}", app.key_for_action(*action)))
        .collect::<Vec<_>>()
        .join(" | ");
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

fn render_content(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let focused = app.active == ActivePane::Content;
    let border_color = if focused {
        FOCUS_COLOR
    } else {
        CONTENT_BORDER_COLOR
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .padding(Padding::right(2));

    let text = Text::from(app.content.content().lines.clone());
    let scroll = u16::try_from(app.content.scroll()).unwrap_or(u16::MAX);
    let paragraph = Paragraph::new(text).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}
