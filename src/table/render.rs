//! Fixed-width monospace rendering of stats rows.
//!
//! Output is deterministic for identical input; tests compare it byte for byte.

use crate::models::{EditorGrant, Row};

pub const NAME_WIDTH: usize = 15;
pub const SING_WIDTH: usize = 7;
pub const DANCE_WIDTH: usize = 7;
pub const RALLY_WIDTH: usize = 7;

/// Discord rejects message content longer than this many characters
pub const MESSAGE_LIMIT: usize = 2000;

fn format_columns(name: &str, sing: &str, dance: &str, rally: &str) -> String {
    format!(
        "{:<nw$} | {:<sw$}| {:<dw$}| {:<rw$}",
        name,
        sing,
        dance,
        rally,
        nw = NAME_WIDTH,
        sw = SING_WIDTH,
        dw = DANCE_WIDTH,
        rw = RALLY_WIDTH,
    )
}

/// Column titles; the title separators sit one column left of the data separators
pub fn render_header() -> String {
    format!(
        "{:<nw$} | {:<sw$}|{:<dw$}| {:<rw$}",
        "Name",
        "Sing[k]",
        "Dance[k]",
        "Rally[Mio]",
        nw = NAME_WIDTH,
        sw = SING_WIDTH,
        dw = DANCE_WIDTH,
        rw = RALLY_WIDTH,
    )
}

pub fn render_separator() -> String {
    "-".repeat(render_header().chars().count())
}

/// Missing numeric fields render as `0`
pub fn render_row(row: &Row) -> String {
    format_columns(
        &row.name,
        &row.sing.unwrap_or(0).to_string(),
        &row.dance.unwrap_or(0).to_string(),
        &format_rally(row.rally),
    )
}

/// Empty row with the same column layout, used as vertical spacing between data rows
pub fn render_blank_spacer() -> String {
    format_columns("", "", "", "")
}

pub fn wrap(lines: &[String]) -> String {
    format!("```css\n{}\n```", lines.join("\n"))
}

/// Full code block for one page of rows
pub fn render_page(rows: &[Row]) -> String {
    let mut lines = Vec::with_capacity(2 + rows.len() * 2);
    lines.push(render_header());
    lines.push(render_separator());
    for row in rows {
        lines.push(render_row(row));
        lines.push(render_blank_spacer());
    }
    wrap(&lines)
}

/// Same as [`render_page`] without spacer rows, for pages that would not fit a message
pub fn render_compact_page(rows: &[Row]) -> String {
    let mut lines = Vec::with_capacity(2 + rows.len());
    lines.push(render_header());
    lines.push(render_separator());
    lines.extend(rows.iter().map(render_row));
    wrap(&lines)
}

/// Compact page with names cut to the name column, for rows whose names are too long for a message
pub fn render_clipped_page(rows: &[Row]) -> String {
    let mut lines = Vec::with_capacity(2 + rows.len());
    lines.push(render_header());
    lines.push(render_separator());
    for row in rows {
        let clipped = Row {
            name: clip(&row.name, NAME_WIDTH),
            ..row.clone()
        };
        lines.push(render_row(&clipped));
    }
    wrap(&lines)
}

/// At most `width` characters, ending in `…` when shortened
fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

/// Whole numbers keep one decimal (`2.0`), zero and missing values render as `0`.
fn format_rally(rally: Option<f64>) -> String {
    match rally {
        Some(v) if v != 0.0 => {
            if v.fract() == 0.0 {
                format!("{:.1}", v)
            } else {
                v.to_string()
            }
        }
        _ => "0".to_string(),
    }
}

/// Editor list, newest grant first, as a plain code block.
///
/// Grants that would push the block past [`MESSAGE_LIMIT`] are summarized in a
/// trailing `…and N more` line.
pub fn render_editors(grants: &[EditorGrant]) -> String {
    const FENCE: &str = "```\n\n```";
    const MORE_RESERVE: usize = 24;

    let header = "Discord ID        | Username           | Added At (UTC)".to_string();
    let separator = "-".repeat(header.len());
    let budget = MESSAGE_LIMIT - FENCE.chars().count() - MORE_RESERVE;
    let mut used = header.chars().count() + separator.chars().count() + 1;
    let mut lines = vec![header, separator];

    for (shown, grant) in grants.iter().enumerate() {
        let line = format!(
            "{:<17} | {:<18} | {}",
            grant.discord_id,
            clip(&grant.discord_name, 32),
            grant.added_at.format("%Y-%m-%d %H:%M")
        );
        let len = line.chars().count() + 1;
        if used + len > budget {
            lines.push(format!("…and {} more", grants.len() - shown));
            break;
        }
        used += len;
        lines.push(line);
    }
    format!("```\n{}\n```", lines.join("\n"))
}
