//! Kickoff time resolver.
//!
//! The feed gives the venue-local date (`YYYYMMDD`), time (`HH:MM`) and the
//! venue's UTC offset separately. Absolute kickoff = local wall clock read as
//! UTC, minus the offset.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::MatchState;

/// Real-world offsets stay within ±14h; anything past ±18h is garbage.
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Offset text → signed minutes east of UTC.
///
/// Accepts `±HH:MM`, `±HHMM` and plain signed hours (`-6`, `5.5`), with an
/// optional `GMT`/`UTC` prefix. Anything unparseable or out of range is zero.
pub fn parse_offset_minutes(raw: &str) -> i32 {
    let mut s = raw.trim();
    for prefix in ["GMT", "UTC", "gmt", "utc"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim_start();
            break;
        }
    }

    let (sign, body) = match s.as_bytes().first() {
        None => return 0,
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        Some(_) => (1, s),
    };
    // one sign only: "--6" is not an offset
    if body.starts_with(['+', '-']) {
        return 0;
    }

    let minutes = unsigned_offset_minutes(body).unwrap_or(0);
    if minutes > MAX_OFFSET_MINUTES {
        return 0;
    }
    sign * minutes
}

fn unsigned_offset_minutes(body: &str) -> Option<i32> {
    let all_digits = |t: &str| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit());

    if let Some((h, m)) = body.split_once(':') {
        if h.len() <= 2 && m.len() == 2 && all_digits(h) && all_digits(m) {
            return Some(h.parse::<i32>().ok()? * 60 + m.parse::<i32>().ok()?);
        }
        return None;
    }

    // "0530" / "530" = HHMM; one or two digits are whole hours
    if all_digits(body) && (3..=4).contains(&body.len()) {
        let (h, m) = body.split_at(body.len() - 2);
        return Some(h.parse::<i32>().ok()? * 60 + m.parse::<i32>().ok()?);
    }

    let hours = body.parse::<f64>().ok().filter(|h| h.is_finite() && *h >= 0.0)?;
    let minutes = (hours * 60.0).round();
    (minutes <= f64::from(MAX_OFFSET_MINUTES)).then_some(minutes as i32)
}

fn parse_date(ymd: &str) -> Option<NaiveDate> {
    if ymd.len() != 8 || !ymd.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let y = ymd[0..4].parse().ok()?;
    let m = ymd[4..6].parse().ok()?;
    let d = ymd[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

fn parse_time(hhmm: &str) -> Option<NaiveTime> {
    let (h, m) = hhmm.trim().split_once(':')?;
    NaiveTime::from_hms_opt(h.parse().ok()?, m.get(..2).unwrap_or(m).parse().ok()?, 0)
}

/// Absolute kickoff instant, or `None` when date or time is missing/invalid.
pub fn resolve_kickoff(state: &MatchState) -> Option<DateTime<Utc>> {
    if state.scheduled_date.is_empty() || state.scheduled_time.is_empty() {
        return None;
    }
    let date = parse_date(&state.scheduled_date)?;
    let time = parse_time(&state.scheduled_time)?;
    let wall_clock_as_utc = date.and_time(time).and_utc();
    Some(wall_clock_as_utc - Duration::minutes(i64::from(state.utc_offset_min)))
}
