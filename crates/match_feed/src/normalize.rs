//! Feed normalizer.
//!
//! The upstream feed has changed shape several times without notice, so every
//! field is resolved through an ordered table of candidate dotted paths. The
//! first path that resolves to a non-null value wins; when none does, the field
//! takes its documented fallback. New shapes are supported by extending the
//! tables, not by adding branches.

use serde_json::Value;

use crate::kickoff::parse_offset_minutes;
use crate::{MatchState, AWAY_PLACEHOLDER, HOME_PLACEHOLDER};

// ====================================================================
// Candidate paths per field (first non-null wins)
// ====================================================================

const MATCH_ID:     &[&str] = &["match.matchId", "matchId", "id", "eventId"];
const SCOPE:        &[&str] = &["match.channel", "channel", "scope"];
const STATUS_ID:    &[&str] = &["status.statusId", "statusId", "match.statusId"];
const HOME_TEAM_ID: &[&str] = &["match.homeTeamId", "homeTeamId", "home.id", "teams.home.id"];
const AWAY_TEAM_ID: &[&str] = &["match.awayTeamId", "awayTeamId", "away.id", "teams.away.id"];
const HOME_NAME:    &[&str] = &["match.homeTeamName", "homeTeamName", "home.name", "teams.home.name"];
const AWAY_NAME:    &[&str] = &["match.awayTeamName", "awayTeamName", "away.name", "teams.away.name"];
const MINUTE:       &[&str] = &["minute", "live.minute", "match.minute"];
const DATE:         &[&str] = &["match.date", "date"];
const START_TIME:   &[&str] = &["match.scheduledStart", "scheduledStart"];
/// Stadium offset first: it describes the venue, `gmt` sometimes the feed's own zone.
const VENUE_OFFSET: &[&str] = &["match.stadiumGMT", "stadiumGMT", "match.gmt", "gmt"];
const LINEUPS:      &[&str] = &["status.lineUpConfirmed", "lineUpConfirmed", "lineups.home"];

/// Maps keyed by team id → per-team score object.
const SCORE_MAP: &[&str] = &[
    "scoreStatus",
    "scoresStatus",
    "scores",
    "match.scoreStatus",
    "match.scoresStatus",
    "match.scores",
];
const TEAM_SCORE_FIELDS: &[&str] = &["score", "value", "goals", "goalsQty"];

/// Aggregate fallbacks when the per-team map is missing.
const HOME_GOALS: &[&str] = &["summary.goals.homeQty", "homeGoals", "homeScore", "score.home"];
const AWAY_GOALS: &[&str] = &["summary.goals.awayQty", "awayGoals", "awayScore", "score.away"];

// ====================================================================
// Lookup + coercion helpers
// ====================================================================

fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Resolve the first candidate dotted path whose value is present and not null.
pub fn pick<'a>(raw: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|path| {
        let value = path.split('.').try_fold(raw, |node, segment| step(node, segment))?;
        (!value.is_null()).then_some(value)
    })
}

/// Permissive numeric parse. Empty strings and null count as zero, anything
/// non-finite or non-numeric is `None`.
pub fn to_num(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() { Some(0.0) } else { s.parse::<f64>().ok() }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    }?;
    n.is_finite().then_some(n)
}

/// `true`, `"true"`, `"1"`, `1` and non-empty arrays are true; everything else false.
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true" || s == "1",
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::Array(items) => !items.is_empty(),
        Value::Null | Value::Object(_) => false,
    }
}

/// Scalar → string; structured values have no sensible text form.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn text_at(raw: &Value, paths: &[&str]) -> String {
    pick(raw, paths).map(to_text).unwrap_or_default()
}

fn goals(n: f64) -> u32 {
    n.max(0.0) as u32
}

fn team_name(raw: &Value, paths: &[&str], team_id: &str, placeholder: &str) -> String {
    let direct = text_at(raw, paths);
    if !direct.is_empty() {
        return direct;
    }
    if !team_id.is_empty() {
        let by_id = raw
            .get("teams")
            .and_then(|teams| teams.get(team_id))
            .and_then(|team| team.get("name"))
            .map(to_text)
            .unwrap_or_default();
        if !by_id.is_empty() {
            return by_id;
        }
    }
    placeholder.to_string()
}

fn team_score(scores: Option<&Value>, team_id: &str) -> Option<u32> {
    if team_id.is_empty() {
        return None;
    }
    let entry = scores?.as_object()?.get(team_id)?;
    let value = match entry {
        Value::Object(_) => pick(entry, TEAM_SCORE_FIELDS)?,
        other => other,
    };
    to_num(value).map(goals)
}

// ====================================================================
// normalize
// ====================================================================

/// Map one raw feed document to a `MatchState`. Never fails: every field
/// has a fallback. `match_id` may still be empty here; the poller fills it
/// with the id it requested.
pub fn normalize(raw: &Value, default_scope: &str) -> MatchState {
    let home_team_id = text_at(raw, HOME_TEAM_ID);
    let away_team_id = text_at(raw, AWAY_TEAM_ID);

    let home_name = team_name(raw, HOME_NAME, &home_team_id, HOME_PLACEHOLDER);
    let away_name = team_name(raw, AWAY_NAME, &away_team_id, AWAY_PLACEHOLDER);

    let scores = pick(raw, SCORE_MAP);
    let home_goals = team_score(scores, &home_team_id)
        .or_else(|| pick(raw, HOME_GOALS).and_then(to_num).map(goals))
        .unwrap_or(0);
    let away_goals = team_score(scores, &away_team_id)
        .or_else(|| pick(raw, AWAY_GOALS).and_then(to_num).map(goals))
        .unwrap_or(0);

    let status_id = pick(raw, STATUS_ID)
        .and_then(to_num)
        .map(|n| n as i64)
        .unwrap_or(0);

    let scope = match text_at(raw, SCOPE) {
        s if s.is_empty() => default_scope.to_string(),
        s => s,
    };

    let venue_offset = text_at(raw, VENUE_OFFSET);
    let scheduled_time: String = text_at(raw, START_TIME).chars().take(5).collect();

    MatchState {
        match_id: text_at(raw, MATCH_ID),
        scope,
        status_id,
        home_goals,
        away_goals,
        lineups_published: pick(raw, LINEUPS).map(to_bool).unwrap_or(false),
        home_team_id,
        away_team_id,
        home_name,
        away_name,
        minute: text_at(raw, MINUTE),
        scheduled_date: text_at(raw, DATE),
        scheduled_time,
        utc_offset_min: parse_offset_minutes(&venue_offset),
        venue_offset,
    }
}
