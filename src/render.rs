//! HTML rendering of report sections for mail bodies.

use chrono::TimeZone;

use crate::aggregate::Section;
use crate::cache::UserDirectory;
use crate::model::Message;

const NO_AUTHOR: &str = "nobody";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render `section` as an HTML fragment, dates shown in `tz`
pub fn render_section<Tz>(section: &Section, users: &UserDirectory, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let messages: Vec<String> = section
        .messages
        .iter()
        .map(|message| render_message(message, users, tz))
        .collect();

    format!(
        "<h1>{}</h1>\n{}",
        escape_html(&section.title),
        messages.join("\n")
    )
}

pub fn render_message<Tz>(message: &Message, users: &UserDirectory, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let date = message
        .ts
        .to_datetime(tz)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| message.ts.to_string());

    format!(
        "<div>\n    <em>{}</em>\n    <strong>{}</strong>\n    <span>{}</span>\n</div>",
        escape_html(&date),
        escape_html(author_name(message, users)),
        line_breaks_to_br(&escape_html(&message.text))
    )
}

/// Directory name of the author, the raw id when unknown, `nobody` when unset
pub fn author_name<'a>(message: &'a Message, users: &'a UserDirectory) -> &'a str {
    match &message.user {
        Some(id) => users.get(id).map(|u| u.name.as_str()).unwrap_or(id),
        None => NO_AUTHOR,
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Insert `<br />` before every line break, keeping the break itself
pub fn line_breaks_to_br(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                out.push_str("<br />\r\n");
            }
            '\r' | '\n' => {
                out.push_str("<br />");
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
