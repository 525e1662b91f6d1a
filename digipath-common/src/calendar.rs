//! iCalendar (RFC 5545) export for a single session

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::models::{Session, Speaker};

const PRODID: &str = "-//DigiPath//Teaching Session//EN";
const UID_DOMAIN: &str = "digipath";
const ALARM_MINUTES: i64 = 15;

/// Escape a TEXT value: backslash, semicolon, comma and newlines
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Fold a content line to 75 octets, continuation lines start with a space
fn fold_line(line: &str) -> String {
    const LIMIT: usize = 75;
    if line.len() <= LIMIT {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / LIMIT * 3);
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        // continuation lines carry one leading space
        if width + len > LIMIT {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out
}

fn format_local(dt: NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

fn describe(session: &Session, speaker: Option<&Speaker>) -> String {
    let mut description = format!("{}\n\nAbstract: {}\n\n", session.summary, session.abstract_text);

    if !session.objectives.is_empty() {
        description.push_str("Objectives:\n");
        for objective in &session.objectives {
            description.push_str(&format!("- {}\n", objective));
        }
        description.push('\n');
    }

    if let Some(speaker) = speaker {
        description.push_str(&format!("Speaker: {}\n", speaker.name));
        description.push_str(&format!("Title: {}, {}\n\n", speaker.title, speaker.affiliation));
    }

    if let Some(link) = &session.meeting_link {
        description.push_str(&format!("Meeting Link: {}\n", link));
    }
    if let Some(id) = &session.meeting_id {
        description.push_str(&format!("Meeting ID: {}\n", id));
    }
    if let Some(password) = &session.meeting_password {
        description.push_str(&format!("Password: {}\n", password));
    }

    description
}

/// Render a VCALENDAR with one VEVENT and a display alarm
///
/// Start/end are floating local times (the session's wall-clock date and
/// time); `DTSTAMP` is `stamp` in UTC. Lines are CRLF-terminated and folded.
pub fn generate_ics(session: &Session, speaker: Option<&Speaker>, stamp: DateTime<Utc>) -> String {
    let start = session.date.and_time(session.time);
    let end = start + Duration::minutes(i64::from(session.duration_minutes));

    let location = match &session.meeting_link {
        Some(link) => format!("{} - {}", session.platform, link),
        None => session.platform.clone(),
    };

    let lines = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", PRODID),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}@{}", session.id, UID_DOMAIN),
        format!("DTSTAMP:{}", stamp.format("%Y%m%dT%H%M%SZ")),
        format!("DTSTART:{}", format_local(start)),
        format!("DTEND:{}", format_local(end)),
        format!("SUMMARY:{}", escape_text(&session.title)),
        format!("DESCRIPTION:{}", escape_text(&describe(session, speaker))),
        format!("LOCATION:{}", escape_text(&location)),
        "STATUS:CONFIRMED".to_string(),
        "SEQUENCE:0".to_string(),
        "BEGIN:VALARM".to_string(),
        format!("TRIGGER:-PT{}M", ALARM_MINUTES),
        "ACTION:DISPLAY".to_string(),
        format!(
            "DESCRIPTION:Reminder: Session starts in {} minutes",
            ALARM_MINUTES
        ),
        "END:VALARM".to_string(),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ];

    let mut ics = String::new();
    for line in &lines {
        ics.push_str(&fold_line(line));
        ics.push_str("\r\n");
    }
    ics
}
