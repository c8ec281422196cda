//! Plain-text rendering for terminal output. `--json` bypasses this module.

use std::fmt::Write as _;

use client::{Dashboard, ProposalSummary};
use models::{Event, EventFile, User};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day] [hour]:[minute] UTC");

pub fn format_time(at: OffsetDateTime) -> String {
    at.to_offset(UtcOffset::UTC)
        .format(TIME_FORMAT)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes.max(0) as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{bytes} B") } else { format!("{value:.1} {}", UNITS[unit]) }
}

pub fn event_line(event: &Event) -> String {
    format!("{}  {:<8}  {}  {}", event.id, event.status.as_str(), format_time(event.start_time), event.title)
}

pub fn event_list(events: &[Event]) -> String {
    if events.is_empty() {
        return "no events\n".to_owned();
    }
    events.iter().fold(String::new(), |mut out, e| {
        let _ = writeln!(out, "{}", event_line(e));
        out
    })
}

pub fn event_detail(event: &Event, files: &[EventFile]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", event.title);
    let _ = writeln!(out, "  id:        {}", event.id);
    let _ = writeln!(out, "  status:    {}", event.status);
    let _ = writeln!(out, "  starts:    {}", format_time(event.start_time));
    let _ = writeln!(out, "  ends:      {}", format_time(event.end_time));
    let _ = writeln!(out, "  organizer: {}", event.organizer_id);
    if let Some(approver) = event.approved_by {
        let _ = writeln!(out, "  approved:  by {approver}");
    }
    if let Some(at) = event.archived_at {
        let _ = writeln!(out, "  archived:  {}", format_time(at));
    }
    if !event.description.is_empty() {
        let _ = writeln!(out, "\n{}", event.description);
    }
    let _ = writeln!(out, "\nfiles ({}):", files.len());
    for file in files {
        let _ = writeln!(out, "  {}", file_line(file));
    }
    out
}

pub fn file_line(file: &EventFile) -> String {
    format!("{}  {:<11}  {:>10}  {}", file.id, file.category.as_str(), format_size(file.size), file.filename)
}

pub fn file_list(files: &[EventFile]) -> String {
    if files.is_empty() {
        return "no files\n".to_owned();
    }
    files.iter().fold(String::new(), |mut out, f| {
        let _ = writeln!(out, "{}", file_line(f));
        out
    })
}

pub fn user_line(user: &User) -> String {
    format!("{}  {:<11}  {} <{}>", user.id, user.role.as_str(), user.name, user.email)
}

pub fn user_list(users: &[User]) -> String {
    users.iter().fold(String::new(), |mut out, u| {
        let _ = writeln!(out, "{}", user_line(u));
        out
    })
}

fn section(out: &mut String, title: &str, events: &[Event]) {
    let _ = writeln!(out, "\n{title} ({})", events.len());
    for event in events {
        let _ = writeln!(out, "  {}", event_line(event));
    }
}

fn proposals(out: &mut String, summary: &ProposalSummary) {
    let _ = writeln!(out, "\nmy proposals ({})", summary.total());
    section(out, "my proposals: pending", &summary.pending);
    section(out, "my proposals: approved", &summary.approved);
    section(out, "my proposals: archived", &summary.archived);
}

pub fn dashboard(dash: &Dashboard) -> String {
    let mut out = format!("signed in as {} ({})\n", dash.user.name, dash.role().as_str());
    section(&mut out, "upcoming events", &dash.upcoming);
    if let Some(summary) = &dash.my_proposals {
        proposals(&mut out, summary);
    }
    if let Some(queue) = &dash.approval_queue {
        section(&mut out, "awaiting approval", queue);
    }
    out
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
