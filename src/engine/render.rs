use std::fmt::Write;

use chrono::Datelike;

use crate::model::*;

use super::snapshot::Snapshot;

/// Days shown when the caller has no preference.
pub const DEFAULT_DAYS: usize = 40;

const LABEL_WIDTH: usize = 20;

/// Plain-text grid of an assignment: one row per unit, one 4-char cell per
/// day starting at `origin`, followed by each unit's booking list.
///
/// ```text
/// Day of Month          1   2   3   4
/// ====================================
/// #0001 A01           ABC ABC
/// ```
pub fn render_timeline(
    snapshot: &Snapshot,
    assignment: &Assignment,
    origin: Day,
    days: usize,
) -> String {
    let mut out = String::new();
    let dates: Vec<Day> = origin.iter_days().take(days).collect();

    let mut line = pad("Day of Month".to_string());
    for d in &dates {
        let _ = write!(line, "{:>3} ", d.day());
    }
    push_line(&mut out, &line);
    push_line(&mut out, &"=".repeat(LABEL_WIDTH + days * 4));

    for row in &assignment.rows {
        let mut line = unit_label(snapshot, row.unit);
        for &d in &dates {
            match row.bookings.iter().find(|b| b.span.covers_day(d)) {
                Some(b) => {
                    let _ = write!(line, "{} ", tag(b));
                }
                None => line.push_str("    "),
            }
        }
        push_line(&mut out, &line);
    }

    push_line(&mut out, &"-".repeat(LABEL_WIDTH + days * 4));

    for row in &assignment.rows {
        let mut line = unit_label(snapshot, row.unit);
        let stays: Vec<String> = row
            .bookings
            .iter()
            .map(|b| {
                format!(
                    "({}){}~{}",
                    tag(b),
                    b.span.start.format("%m/%d"),
                    b.span.end.format("%m/%d")
                )
            })
            .collect();
        line.push_str(&stays.join(", "));
        push_line(&mut out, &line);
    }

    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn pad(mut s: String) -> String {
    if s.chars().count() > LABEL_WIDTH {
        s = s.chars().take(LABEL_WIDTH - 1).collect();
    }
    while s.chars().count() < LABEL_WIDTH {
        s.push(' ');
    }
    s
}

fn unit_label(snapshot: &Snapshot, unit: UnitId) -> String {
    let name = snapshot
        .unit(unit)
        .and_then(|u| u.name.as_deref())
        .unwrap_or("");
    pad(format!("#{} {name}", suffix(&unit.to_string(), 4)))
}

/// Three-character booking marker: tail of the label, else of the id.
fn tag(booking: &Booking) -> String {
    let source = match &booking.label {
        Some(label) if !label.is_empty() => label.clone(),
        _ => booking.id.to_string(),
    };
    format!("{:>3}", suffix(&source, 3))
}

fn suffix(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}
