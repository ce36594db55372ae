//! Time-literal recognition.
//!
//! Quoted literals are tried against a fixed list of timestamp layouts, in
//! order, before falling back to plain strings. Layouts without an explicit
//! offset are interpreted in the local timezone.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// How a candidate layout is matched and anchored.
enum TimeFormat {
    /// Full date and time with a numeric offset
    Offset(&'static str),
    /// Full date and time, no zone; anchored to local time
    Naive(&'static str),
    /// Calendar date only; midnight local
    DateOnly(&'static str),
    /// Wall-clock time only; day zero of the calendar
    TimeOnly(&'static str),
    /// Unix `date` layout, with a zone abbreviation as the fifth field
    ZoneAbbrev(&'static str),
    /// RFC 3339, with or without fractional seconds
    Rfc3339,
    /// ISO 8601 `Z`-or-offset layouts; `None` means hour-only time
    IsoZoned(Option<&'static str>),
}

const TIME_FORMATS: &[TimeFormat] = &[
    // ANSI C asctime
    TimeFormat::Naive("%a %b %e %H:%M:%S %Y"),
    // Unix `date` default
    TimeFormat::ZoneAbbrev("%a %b %e %H:%M:%S %Y"),
    // Ruby default
    TimeFormat::Offset("%a %b %d %H:%M:%S %z %Y"),
    // Kitchen clock
    TimeFormat::TimeOnly("%I:%M%p"),
    TimeFormat::Rfc3339,
    TimeFormat::DateOnly("%Y-%m-%d"),
    TimeFormat::Naive("%Y-%m-%d %H:%M"),
    TimeFormat::Naive("%Y-%m-%d %H:%M:%S"),
    TimeFormat::Offset("%Y-%m-%d %H:%M:%S%:z"),
    // ISO 8601 down to the hour, minute, second, nanosecond
    TimeFormat::IsoZoned(None),
    TimeFormat::IsoZoned(Some("%H:%M")),
    TimeFormat::IsoZoned(Some("%H:%M:%S")),
    TimeFormat::IsoZoned(Some("%H:%M:%S%.f")),
];

/// Attempts to parse the candidate as a timestamp, trying each layout in
/// order. Returns `None` if no layout applies.
pub fn try_parse_time(candidate: &str) -> Option<DateTime<Local>> {
    for format in TIME_FORMATS {
        let parsed = match format {
            TimeFormat::Offset(layout) => DateTime::<FixedOffset>::parse_from_str(candidate, layout)
                .ok()
                .map(|t| t.with_timezone(&Local)),
            TimeFormat::Naive(layout) => NaiveDateTime::parse_from_str(candidate, layout)
                .ok()
                .and_then(local_from_naive),
            TimeFormat::DateOnly(layout) => NaiveDate::parse_from_str(candidate, layout)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .and_then(local_from_naive),
            TimeFormat::TimeOnly(layout) => NaiveTime::parse_from_str(candidate, layout)
                .ok()
                .and_then(|t| NaiveDate::from_ymd_opt(0, 1, 1).map(|d| d.and_time(t)))
                .and_then(local_from_naive),
            TimeFormat::ZoneAbbrev(layout) => parse_zone_abbrev(candidate, layout),
            TimeFormat::Rfc3339 => DateTime::parse_from_rfc3339(candidate)
                .ok()
                .map(|t| t.with_timezone(&Local)),
            TimeFormat::IsoZoned(time_layout) => parse_iso_zoned(candidate, *time_layout),
        };

        if parsed.is_some() {
            return parsed;
        }
    }

    None
}

fn local_from_naive(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    naive.and_local_timezone(Local).earliest()
}

/// Unix `date` output carries a zone abbreviation ("MST") that cannot be
/// mapped back to an offset. The abbreviation is dropped and the remainder
/// anchored to UTC, which is how unknown abbreviations resolve in practice.
fn parse_zone_abbrev(candidate: &str, layout: &str) -> Option<DateTime<Local>> {
    let fields: Vec<&str> = candidate.split_whitespace().collect();
    if fields.len() != 6 {
        return None;
    }

    let abbrev = fields[4];
    if abbrev.is_empty() || !abbrev.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }

    let stripped = format!(
        "{} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], fields[5]
    );
    let naive = NaiveDateTime::parse_from_str(&stripped, layout).ok()?;
    Some(naive.and_utc().with_timezone(&Local))
}

/// ISO 8601 layouts whose zone is either a literal `Z` or `±hhmm`, down to
/// hour granularity (`2006-01-02T15Z0700` has no standard format string).
fn parse_iso_zoned(candidate: &str, time_layout: Option<&str>) -> Option<DateTime<Local>> {
    let (date_part, rest) = candidate.split_once('T')?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;

    let zone_start = rest.find(['Z', '+', '-'])?;
    let (time_part, offset_part) = rest.split_at(zone_start);
    let offset = parse_numeric_offset(offset_part)?;

    let time = match time_layout {
        None => {
            let hour: u32 = time_part.parse().ok()?;
            NaiveTime::from_hms_opt(hour, 0, 0)?
        }
        Some(layout) => NaiveTime::parse_from_str(time_part, layout).ok()?,
    };

    offset
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|t| t.with_timezone(&Local))
}

/// `Z`, `±hhmm` or `±hh:mm`.
fn parse_numeric_offset(text: &str) -> Option<FixedOffset> {
    if text == "Z" {
        return FixedOffset::east_opt(0);
    }

    let mut chars = text.chars();
    let sign = match chars.next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };

    let digits: String = chars.filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
