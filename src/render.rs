//! Markdown to terminal text.
//!
//! Rendering runs on a blocking worker; the event loop only sees the finished
//! [`RenderedContent`] or a [`RenderError`]. Output lines are already wrapped to
//! the requested width, so the content pane never re-wraps.

use pulldown_cmark::{CodeBlockKind, Event as MdEvent, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

use crate::error::RenderError;

const TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedContent {
    pub lines: Vec<Line<'static>>,
    pub width: usize,
}

impl RenderedContent {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Unformatted text shown when formatting failed.
    pub fn plain_fallback(width: usize, source: &str, error: &RenderError) -> Self {
        let mut lines = vec![
            Line::from(Span::styled(
                format!("render failed: {error}"),
                Style::default().fg(Color::Red),
            )),
            Line::default(),
        ];
        lines.extend(source.lines().map(|line| Line::from(expand_tabs(line))));
        Self { lines, width }
    }

    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn render(width: usize, text: String) -> Result<RenderedContent, RenderError> {
    tokio::task::spawn_blocking(move || render_markdown(width, &text))
        .await
        .map_err(|err| RenderError::Worker(err.to_string()))?
}

pub fn render_markdown(width: usize, source: &str) -> Result<RenderedContent, RenderError> {
    if width == 0 {
        return Err(RenderError::InvalidWidth(width));
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = Renderer::new(width);
    for event in Parser::new_ext(source, options) {
        match event {
            MdEvent::Start(tag) => renderer.handle_start(tag),
            MdEvent::End(tag) => renderer.handle_end(tag),
            MdEvent::Text(text) => renderer.add_text(&text),
            MdEvent::Code(code) => renderer.add_inline_code(&code),
            MdEvent::Html(html) | MdEvent::InlineHtml(html) => renderer.add_text(&html),
            MdEvent::SoftBreak => renderer.soft_break(),
            MdEvent::HardBreak => renderer.hard_break(),
            MdEvent::Rule => renderer.add_rule(),
            MdEvent::TaskListMarker(done) => renderer.add_task_marker(done),
            _ => {}
        }
    }
    Ok(renderer.finish())
}

/// Wraps diff output in a fenced block that the diff text itself cannot close.
pub fn diff_document(diff: &str) -> String {
    if diff.trim().is_empty() {
        return "No differences.".to_string();
    }
    let longest_run = diff
        .lines()
        .map(|line| line.trim_start().chars().take_while(|c| *c == '`').count())
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    format!("{fence}diff\n{}\n{fence}\n", diff.trim_end_matches('\n'))
}

#[derive(Default)]
struct InlineState {
    emphasis: usize,
    strong: usize,
    strikethrough: usize,
    link_depth: usize,
}

impl InlineState {
    fn style(&self) -> Style {
        let mut style = Style::default();
        if self.emphasis > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strong > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.strikethrough > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        if self.link_depth > 0 {
            style = style.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED);
        }
        style
    }
}

#[derive(Debug, Clone)]
struct ListState {
    ordered: bool,
    next_index: u64,
}

struct Renderer {
    width: usize,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    inline: InlineState,
    heading_level: Option<HeadingLevel>,
    blockquote_depth: usize,
    list_stack: Vec<ListState>,
    code_block_lang: Option<String>,
    code_block_buf: String,
    image_alt: Option<String>,
}

impl Renderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            current: Vec::new(),
            inline: InlineState::default(),
            heading_level: None,
            blockquote_depth: 0,
            list_stack: Vec::new(),
            code_block_lang: None,
            code_block_buf: String::new(),
            image_alt: None,
        }
    }

    fn finish(mut self) -> RenderedContent {
        self.flush_line(false);
        while self
            .lines
            .last()
            .is_some_and(|line| line.spans.is_empty())
        {
            self.lines.pop();
        }
        if self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        RenderedContent {
            lines: self.lines,
            width: self.width,
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        self.current.push(Span::styled(text.to_string(), style));
    }

    fn push_prefix_if_needed(&mut self) {
        if !self.current.is_empty() || self.blockquote_depth == 0 {
            return;
        }
        let prefix = "> ".repeat(self.blockquote_depth);
        self.push_text(&prefix, Style::default().fg(Color::DarkGray));
    }

    fn flush_line(&mut self, force_empty: bool) {
        if !force_empty && self.current.is_empty() {
            return;
        }
        let segments = std::mem::take(&mut self.current);
        self.lines.extend(wrap_spans(segments, self.width));
    }

    fn blank_line(&mut self) {
        if self.lines.is_empty() || self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            return;
        }
        self.lines.push(Line::default());
    }

    fn text_style(&self) -> Style {
        match self.heading_level {
            Some(HeadingLevel::H1) => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            Some(HeadingLevel::H2) => Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
            Some(_) => Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
            None => self.inline.style(),
        }
    }

    fn handle_start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_line(false);
                self.heading_level = Some(level);
            }
            Tag::BlockQuote(_) => {
                self.flush_line(false);
                self.blockquote_depth = self.blockquote_depth.saturating_add(1);
            }
            Tag::CodeBlock(kind) => {
                self.flush_line(false);
                let lang = match kind {
                    CodeBlockKind::Fenced(name) => name.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code_block_lang = Some(lang);
                self.code_block_buf.clear();
            }
            Tag::List(start) => {
                self.flush_line(false);
                self.list_stack.push(match start {
                    Some(index) => ListState {
                        ordered: true,
                        next_index: index,
                    },
                    None => ListState {
                        ordered: false,
                        next_index: 1,
                    },
                });
            }
            Tag::Item => {
                self.flush_line(false);
                let indent = "  ".repeat(self.list_stack.len().saturating_sub(1));
                let bullet = match self.list_stack.last_mut() {
                    Some(list) if list.ordered => {
                        let bullet = format!("{}. ", list.next_index);
                        list.next_index = list.next_index.saturating_add(1);
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                self.push_text(
                    &format!("{indent}{bullet}"),
                    Style::default().fg(Color::DarkGray),
                );
            }
            Tag::Emphasis => self.inline.emphasis = self.inline.emphasis.saturating_add(1),
            Tag::Strong => self.inline.strong = self.inline.strong.saturating_add(1),
            Tag::Strikethrough => {
                self.inline.strikethrough = self.inline.strikethrough.saturating_add(1);
            }
            Tag::Link { .. } => self.inline.link_depth = self.inline.link_depth.saturating_add(1),
            Tag::Image { .. } => self.image_alt = Some(String::new()),
            _ => {}
        }
    }

    fn handle_end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_line(false);
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.flush_line(false);
                self.heading_level = None;
                self.blank_line();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line(false);
                self.blockquote_depth = self.blockquote_depth.saturating_sub(1);
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                let lang = self.code_block_lang.take().unwrap_or_default();
                let code = std::mem::take(&mut self.code_block_buf);
                self.render_code_block(&lang, &code);
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.flush_line(false);
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush_line(false),
            TagEnd::Emphasis => self.inline.emphasis = self.inline.emphasis.saturating_sub(1),
            TagEnd::Strong => self.inline.strong = self.inline.strong.saturating_sub(1),
            TagEnd::Strikethrough => {
                self.inline.strikethrough = self.inline.strikethrough.saturating_sub(1);
            }
            TagEnd::Link => self.inline.link_depth = self.inline.link_depth.saturating_sub(1),
            TagEnd::Image => {
                if let Some(alt) = self.image_alt.take() {
                    let alt = if alt.trim().is_empty() { "image" } else { alt.trim() };
                    self.push_prefix_if_needed();
                    self.push_text(
                        &format!("[image: {alt}]"),
                        Style::default().fg(Color::LightBlue),
                    );
                }
            }
            _ => {}
        }
    }

    fn add_text(&mut self, text: &str) {
        if self.code_block_lang.is_some() {
            self.code_block_buf.push_str(text);
            return;
        }
        if let Some(alt) = self.image_alt.as_mut() {
            alt.push_str(text);
            return;
        }
        self.push_prefix_if_needed();
        let style = self.text_style();
        self.push_text(text, style);
    }

    fn soft_break(&mut self) {
        if self.code_block_lang.is_some() {
            self.code_block_buf.push('\n');
            return;
        }
        let style = self.inline.style();
        self.push_text(" ", style);
    }

    fn hard_break(&mut self) {
        if self.code_block_lang.is_some() {
            self.code_block_buf.push('\n');
            return;
        }
        self.flush_line(false);
    }

    fn add_inline_code(&mut self, code: &str) {
        self.push_prefix_if_needed();
        let style = Style::default()
            .fg(Color::LightYellow)
            .add_modifier(Modifier::BOLD);
        self.push_text(code, style);
    }

    fn add_rule(&mut self) {
        self.flush_line(false);
        let rule = "─".repeat(self.width.min(64));
        self.push_text(&rule, Style::default().fg(Color::DarkGray));
        self.flush_line(false);
        self.blank_line();
    }

    fn add_task_marker(&mut self, done: bool) {
        self.push_prefix_if_needed();
        let marker = if done { "[x] " } else { "[ ] " };
        self.push_text(marker, Style::default().fg(Color::DarkGray));
    }

    fn render_code_block(&mut self, lang: &str, code: &str) {
        let is_diff = matches!(lang.trim(), "diff" | "patch");
        for line in code.lines() {
            let line = expand_tabs(line.strip_suffix('\r').unwrap_or(line));
            if is_diff {
                self.push_text(&line, diff_line_style(&line));
            } else {
                self.push_text("  ", Style::default());
                self.push_text(&line, Style::default().fg(Color::LightGreen));
            }
            self.flush_line(true);
        }
    }
}

/// Replaces each tab with spaces up to the next `TAB_WIDTH` stop of the line.
fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + TAB_WIDTH);
    let mut column = 0usize;
    for ch in line.chars() {
        if ch == '\t' {
            let next_tab_stop = ((column / TAB_WIDTH) + 1) * TAB_WIDTH;
            out.extend(std::iter::repeat_n(' ', next_tab_stop - column));
            column = next_tab_stop;
        } else {
            out.push(ch);
            column += ch.width().unwrap_or(0);
        }
    }
    out
}

fn diff_line_style(line: &str) -> Style {
    if line.starts_with("+++") || line.starts_with("---") {
        Style::default().add_modifier(Modifier::BOLD)
    } else if line.starts_with('+') {
        Style::default().fg(Color::Green)
    } else if line.starts_with('-') {
        Style::default().fg(Color::Red)
    } else if line.starts_with("@@") {
        Style::default().fg(Color::Cyan)
    } else if line.starts_with("diff ") || line.starts_with("index ") {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

/// Greedy wrap of one logical line, breaking after the last space that fits.
fn wrap_spans(segments: Vec<Span<'static>>, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<(char, Style)> = Vec::new();
    let mut current_width = 0usize;

    for span in segments {
        let style = span.style;
        for ch in span.content.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if current_width + ch_width > width && !current.is_empty() {
                let rest = if ch == ' ' {
                    Vec::new()
                } else {
                    match current.iter().rposition(|(c, _)| *c == ' ') {
                        Some(idx) => current.split_off(idx + 1),
                        None => Vec::new(),
                    }
                };
                while current.last().is_some_and(|(c, _)| *c == ' ') {
                    current.pop();
                }
                lines.push(styled_line(&current));
                current = rest;
                current_width = current
                    .iter()
                    .map(|(c, _)| c.width().unwrap_or(0))
                    .sum();
                if ch == ' ' && current.is_empty() {
                    continue;
                }
            }
            current.push((ch, style));
            current_width += ch_width;
        }
    }
    lines.push(styled_line(&current));
    lines
}

fn styled_line(chars: &[(char, Style)]) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut text = String::new();
    let mut style: Option<Style> = None;
    for (ch, ch_style) in chars {
        if style.is_some_and(|s| s != *ch_style) {
            spans.push(Span::styled(
                std::mem::take(&mut text),
                style.unwrap_or_default(),
            ));
        }
        style = Some(*ch_style);
        text.push(*ch);
    }
    if !text.is_empty() {
        spans.push(Span::styled(text, style.unwrap_or_default()));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_texts(content: &RenderedContent) -> Vec<String> {
        content.plain_text().lines().map(str::to_string).collect()
    }

    #[test]
    fn zero_width_is_rejected() {
        let err = render_markdown(0, "hello").expect_err("zero width");
        assert_eq!(err, RenderError::InvalidWidth(0));
    }

    #[test]
    fn empty_input_renders_single_empty_line() {
        let content = render_markdown(20, "").expect("render");
        assert_eq!(content.line_count(), 1);
        assert_eq!(content.plain_text(), "");
    }

    #[test]
    fn paragraphs_wrap_at_word_boundaries() {
        let content = render_markdown(10, "alpha beta gamma delta").expect("render");
        assert_eq!(line_texts(&content), vec!["alpha beta", "gamma", "delta"]);
        for line in &content.lines {
            assert!(line.width() <= 10);
        }
    }

    #[test]
    fn long_words_are_split_hard() {
        let content = render_markdown(4, "abcdefghij").expect("render");
        assert_eq!(line_texts(&content), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn headings_are_bold() {
        let content = render_markdown(40, "# Title\n\nbody").expect("render");
        assert_eq!(line_texts(&content), vec!["Title", "", "body"]);
        let heading = &content.lines[0].spans[0];
        assert!(heading.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn diff_block_colors_added_and_removed_lines() {
        let doc = diff_document("@@ -1 +1 @@\n-old\n+new\n context\n");
        let content = render_markdown(80, &doc).expect("render");
        let texts = line_texts(&content);
        assert_eq!(texts, vec!["@@ -1 +1 @@", "-old", "+new", " context"]);
        assert_eq!(content.lines[1].spans[0].style.fg, Some(Color::Red));
        assert_eq!(content.lines[2].spans[0].style.fg, Some(Color::Green));
        assert_eq!(content.lines[0].spans[0].style.fg, Some(Color::Cyan));
    }

    #[test]
    fn tabs_in_code_expand_to_tab_stops() {
        let content = render_markdown(36, &diff_document("+\tx\n")).expect("render");
        assert!(
            content
                .lines
                .iter()
                .flat_map(|line| line.spans.iter())
                .all(|span| !span.content.contains('\t'))
        );
        assert_eq!(line_texts(&content), vec!["+       x"]);
        assert_eq!(content.lines[0].width(), 9);

        assert_eq!(expand_tabs("ab\tc\t"), "ab      c       ");
        assert_eq!(expand_tabs("no tabs"), "no tabs");
    }

    #[test]
    fn tab_indented_lines_wrap_by_expanded_width() {
        let content = render_markdown(12, &diff_document("+\t\tlong\n")).expect("render");
        for line in &content.lines {
            assert!(line.width() <= 12);
        }
        assert!(content.plain_text().contains("long"));
    }

    #[test]
    fn diff_document_fence_outlasts_backticks_in_diff() {
        let doc = diff_document("+```rust\n+fn x() {}\n+```\n");
        assert!(doc.starts_with("```diff\n"));
        let doc = diff_document("````\n");
        assert!(doc.starts_with("`````diff\n"));
        assert_eq!(diff_document("\n"), "No differences.");
    }

    #[test]
    fn list_items_get_bullets() {
        let content = render_markdown(40, "- one\n- two\n").expect("render");
        assert_eq!(line_texts(&content), vec!["• one", "• two"]);
    }

    #[test]
    fn plain_fallback_keeps_source_lines() {
        let content =
            RenderedContent::plain_fallback(20, "a\nb", &RenderError::Worker("boom".to_string()));
        let texts = line_texts(&content);
        assert!(texts[0].contains("boom"));
        assert_eq!(&texts[2..], &["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn async_render_matches_sync_render() {
        let rendered = render(30, "selected: Fix bug, prev: (none)".to_string())
            .await
            .expect("render");
        assert_eq!(rendered.plain_text(), "selected: Fix bug, prev:\n(none)");
    }
}
