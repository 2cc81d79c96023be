//! Terminal rendering of chat messages
//!
//! Assistant replies are Markdown with optional LaTeX. Replies are parsed
//! with `pulldown-cmark` (math, tables and strikethrough enabled) and each
//! event is styled with `colored`. Block structure is kept as indentation:
//! list markers, `│ ` for quotes, four spaces for code and display math.

use crate::providers::{Message, Role};
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Name shown in front of assistant replies
pub const ASSISTANT_NAME: &str = "Quantum AI";

const RULE_WIDTH: usize = 40;

/// Render Markdown/LaTeX text for the terminal
///
/// # Examples
///
/// ```
/// use quantum_chat::render::render_markdown;
///
/// colored::control::set_override(false);
/// assert_eq!(render_markdown("**Bold** move"), "Bold move");
/// ```
pub fn render_markdown(text: &str) -> String {
    let options = Options::ENABLE_MATH | Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let mut renderer = TerminalRenderer::default();
    for event in Parser::new_ext(text, options) {
        renderer.process_event(event);
    }
    renderer.finish()
}

#[derive(Debug)]
struct ListState {
    /// Next number for ordered lists, `None` for bullets
    next: Option<u64>,
}

#[derive(Debug, Default)]
struct TableState {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

#[derive(Debug, Default)]
struct Link {
    url: String,
    text: String,
}

/// Accumulates styled lines from parser events
#[derive(Debug, Default)]
struct TerminalRenderer {
    lines: Vec<String>,
    line: String,
    /// A blank line goes in before the next emitted line
    gap: bool,
    heading: bool,
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
    quote_depth: usize,
    lists: Vec<ListState>,
    item_marker: Option<String>,
    marker_width: usize,
    code: Option<String>,
    link: Option<Link>,
    table: Option<TableState>,
}

impl TerminalRenderer {
    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.add_text(&text),
            Event::Code(code) => self.add_span(&code, |s| s.cyan().to_string()),
            Event::InlineMath(math) => self.add_span(&math, |s| s.yellow().to_string()),
            Event::DisplayMath(math) => self.add_display_math(&math),
            Event::SoftBreak => {
                if !self.line.is_empty() {
                    self.add_text(" ");
                }
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.gap = true;
                self.emit("─".repeat(RULE_WIDTH).dimmed().to_string());
                self.gap = true;
            }
            Event::TaskListMarker(checked) => {
                self.add_text(if checked { "[x] " } else { "[ ] " });
            }
            // Raw HTML is not shown in the terminal
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { .. } => {
                self.flush_line();
                self.heading = true;
            }
            Tag::CodeBlock(kind) => {
                self.flush_line();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.trim().is_empty() {
                        self.emit(format!("  {}", lang.trim().dimmed()));
                    }
                }
                self.code = Some(String::new());
            }
            Tag::List(start) => {
                self.flush_line();
                self.lists.push(ListState { next: start });
            }
            Tag::Item => {
                self.flush_line();
                let marker = match self.lists.last_mut() {
                    Some(ListState { next: Some(n) }) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.marker_width = marker.chars().count();
                self.item_marker = Some(marker);
            }
            Tag::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth += 1;
            }
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strikethrough += 1,
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.link = Some(Link {
                    url: dest_url.to_string(),
                    text: String::new(),
                });
            }
            Tag::Table(_) => {
                self.flush_line();
                self.table = Some(TableState::default());
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_line();
                if self.at_top_level() {
                    self.gap = true;
                }
            }
            TagEnd::Heading(_) => {
                self.flush_line();
                self.heading = false;
                self.gap = true;
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    for line in code.lines() {
                        self.emit(format!("    {}", line.cyan()));
                    }
                }
                if self.at_top_level() {
                    self.gap = true;
                }
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.lists.pop();
                if self.at_top_level() {
                    self.gap = true;
                }
            }
            TagEnd::Item => {
                self.flush_line();
                // An empty item still shows its marker
                if self.item_marker.is_some() {
                    self.emit(String::new());
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.at_top_level() {
                    self.gap = true;
                }
            }
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Strikethrough => self.strikethrough = self.strikethrough.saturating_sub(1),
            TagEnd::Link | TagEnd::Image => {
                if let Some(link) = self.link.take() {
                    if !link.url.is_empty() && link.text != link.url {
                        self.line
                            .push_str(&format!(" ({})", link.url.as_str().dimmed()));
                    }
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.emit_table(table);
                }
                if self.at_top_level() {
                    self.gap = true;
                }
            }
            _ => {}
        }
    }

    fn at_top_level(&self) -> bool {
        self.lists.is_empty() && self.quote_depth == 0
    }

    fn add_text(&mut self, text: &str) {
        if let Some(code) = self.code.as_mut() {
            code.push_str(text);
            return;
        }
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(text);
            return;
        }
        if let Some(link) = self.link.as_mut() {
            link.text.push_str(text);
        }

        let mut styled = text.normal();
        if self.heading {
            styled = styled.bold().underline();
        }
        if self.strong > 0 {
            styled = styled.bold();
        }
        if self.emphasis > 0 || self.quote_depth > 0 {
            styled = styled.italic();
        }
        if self.strikethrough > 0 {
            styled = styled.strikethrough();
        }
        if self.link.is_some() {
            styled = styled.underline();
        }
        self.line.push_str(&styled.to_string());
    }

    /// Inline code or math: one style, no nesting
    fn add_span(&mut self, text: &str, style: fn(&str) -> String) {
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(text);
            return;
        }
        if let Some(link) = self.link.as_mut() {
            link.text.push_str(text);
        }
        self.line.push_str(&style(text));
    }

    fn add_display_math(&mut self, math: &str) {
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(math);
            return;
        }
        self.flush_line();
        for line in math.trim().lines() {
            self.emit(format!("    {}", line.trim().yellow()));
        }
    }

    fn emit_table(&mut self, state: TableState) {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        if !state.header.is_empty() {
            table.set_titles(Row::new(
                state.header.iter().map(|h| Cell::new(h).style_spec("b")).collect(),
            ));
        }
        for row in &state.rows {
            table.add_row(Row::new(row.iter().map(|c| Cell::new(c)).collect()));
        }
        for line in table.to_string().lines() {
            self.emit(line.to_string());
        }
    }

    fn flush_line(&mut self) {
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.emit(line);
        }
    }

    /// Push a finished line with the quote and list prefix of the current block
    fn emit(&mut self, content: String) {
        if self.gap && !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.gap = false;

        let mut prefix = "│ ".dimmed().to_string().repeat(self.quote_depth);
        if let Some(depth) = self.lists.len().checked_sub(1) {
            prefix.push_str(&"  ".repeat(depth + 1));
            match self.item_marker.take() {
                Some(marker) => prefix.push_str(&marker.as_str().blue().to_string()),
                None => prefix.push_str(&" ".repeat(self.marker_width)),
            }
        }
        self.lines.push(format!("{}{}", prefix, content).trim_end().to_string());
    }

    fn finish(mut self) -> String {
        self.flush_line();
        self.lines.join("\n")
    }
}

/// A user message as shown in the thread
pub fn render_user(text: &str) -> String {
    format!("{} {}", "You:".green().bold(), text)
}

/// An assistant reply as shown in the thread
pub fn render_assistant(markdown: &str) -> String {
    format!(
        "{}\n{}",
        format!("{}:", ASSISTANT_NAME).magenta().bold(),
        render_markdown(markdown)
    )
}

/// An inline warning shown in the thread in place of a reply
pub fn render_notice(text: &str) -> String {
    format!(
        "{}\n{}",
        format!("{}:", ASSISTANT_NAME).magenta().bold(),
        format!("⚠️  {}", text).yellow()
    )
}

/// An inline error shown in the thread in place of a reply
pub fn render_error(text: &str) -> String {
    format!(
        "{}\n{}",
        format!("{}:", ASSISTANT_NAME).magenta().bold(),
        format!("Error communicating with API: {}", text).red()
    )
}

/// Every user and assistant message of a thread; system messages are hidden
pub fn render_thread(messages: &[Message]) -> String {
    messages
        .iter()
        .filter_map(|m| match m.role {
            Role::User => Some(render_user(&m.content)),
            Role::Assistant => Some(render_assistant(&m.content)),
            Role::System => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
