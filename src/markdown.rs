//! Line-oriented article markup.
//!
//! Articles are written in a small Markdown subset. Each line is classified
//! on its own by `parse`; `render` turns the blocks into HTML. Inline markup
//! (`**bold**`, `[label](url)`) is only recognised in paragraphs and list
//! items. Table lines (starting with `|`) are not supported and are dropped.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    ListItem { ordered: bool, text: String },
    Blockquote(String),
    /// Whole line wrapped in single asterisks
    Emphasis(String),
    Paragraph(String),
    EmptyLine,
}

pub fn parse(content: &str) -> Vec<Block> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<Block> {
    // prefixes include the space, so `## ` never matches `# `
    for (prefix, level) in [("# ", 1), ("## ", 2), ("### ", 3)] {
        if let Some(text) = line.strip_prefix(prefix) {
            return Some(Block::Heading {
                level,
                text: text.to_string(),
            });
        }
    }

    if let Some(text) = line.strip_prefix("- ") {
        return Some(Block::ListItem {
            ordered: false,
            text: text.to_string(),
        });
    }

    if let Some(text) = strip_ordered_marker(line) {
        return Some(Block::ListItem {
            ordered: true,
            text: text.to_string(),
        });
    }

    if let Some(text) = line.strip_prefix("> ") {
        return Some(Block::Blockquote(text.to_string()));
    }

    if line.len() >= 2 && line.starts_with('*') && line.ends_with('*') {
        return Some(Block::Emphasis(line[1..line.len() - 1].to_string()));
    }

    if line.trim().is_empty() {
        return Some(Block::EmptyLine);
    }

    if line.starts_with('|') {
        return None;
    }

    Some(Block::Paragraph(line.to_string()))
}

/// `12. text` → `text`
fn strip_ordered_marker(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix(". ")
}

pub fn render(blocks: &[Block]) -> String {
    let mut html = String::new();
    let mut open_list: Option<bool> = None;

    for block in blocks {
        let wanted = match block {
            Block::ListItem { ordered, .. } => Some(*ordered),
            _ => None,
        };
        if open_list != wanted {
            close_list(&mut html, open_list);
            if let Some(ordered) = wanted {
                html.push_str(if ordered { "<ol>" } else { "<ul>" });
            }
            open_list = wanted;
        }

        match block {
            Block::Heading { level, text } => {
                html.push_str(&format!("<h{level}>{}</h{level}>", escape(text)));
            }
            Block::ListItem { text, .. } => {
                html.push_str(&format!("<li>{}</li>", inline(text)));
            }
            Block::Blockquote(text) => {
                html.push_str(&format!("<blockquote>{}</blockquote>", escape(text)));
            }
            Block::Emphasis(text) => {
                html.push_str(&format!("<p><em>{}</em></p>", escape(text)));
            }
            Block::Paragraph(text) => {
                html.push_str(&format!("<p>{}</p>", inline(text)));
            }
            Block::EmptyLine => html.push_str("<br>"),
        }
    }
    close_list(&mut html, open_list);

    sanitize(&html)
}

/// Parse and render in one go
pub fn to_html(content: &str) -> String {
    render(&parse(content))
}

fn close_list(html: &mut String, open_list: Option<bool>) {
    match open_list {
        Some(true) => html.push_str("</ol>"),
        Some(false) => html.push_str("</ul>"),
        None => {}
    }
}

fn escape(text: &str) -> String {
    ammonia::clean_text(text)
}

/// Escape, then apply `**bold**` and `[label](url)`
fn inline(text: &str) -> String {
    links(&bold(&escape(text)))
}

fn bold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str("<strong>");
        out.push_str(&after[..end]);
        out.push_str("</strong>");
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        let Some(mid) = after_open.find("](") else {
            break;
        };
        let after_mid = &after_open[mid + 2..];
        let Some(close) = after_mid.find(')') else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push_str(&format!(
            "<a href=\"{}\">{}</a>",
            &after_mid[..close],
            &after_open[..mid]
        ));
        rest = &after_mid[close + 1..];
    }
    out.push_str(rest);
    out
}

fn sanitize(html: &str) -> String {
    let tags: HashSet<&str> = [
        "h1",
        "h2",
        "h3",
        "p",
        "br",
        "ul",
        "ol",
        "li",
        "blockquote",
        "strong",
        "em",
        "a",
    ]
    .into_iter()
    .collect();

    ammonia::Builder::default()
        .tags(tags)
        .url_schemes(["http", "https", "mailto"].into_iter().collect())
        .clean(html)
        .to_string()
}
