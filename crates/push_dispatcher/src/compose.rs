//! Notification templates.

use match_feed::MatchState;
use serde::Serialize;
use std::collections::BTreeMap;
use transition_detector::{Event, EventKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body:  String,
}

/// Everything the transport needs apart from the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPush {
    pub notification: Notification,
    /// String-only key/value payload read by the app's deeplink handler
    pub data:         BTreeMap<String, String>,
}

/// App tab the notification opens.
pub fn tab_for(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Lineups => "lineups",
        EventKind::Start | EventKind::SecondHalf | EventKind::Goal => "live",
        EventKind::PreKickoff | EventKind::Halftime | EventKind::End => "details",
    }
}

fn title_for(kind: EventKind, m: &MatchState, lead_minutes: i64) -> String {
    let (home, away) = (&m.home_name, &m.away_name);
    let score = m.score_line();
    match kind {
        EventKind::Lineups    => format!("Lineups: {home} vs {away}"),
        EventKind::PreKickoff => format!("Kick-off in {lead_minutes} min: {home} vs {away}"),
        EventKind::Start      => format!("Kick-off! {home} vs {away}"),
        EventKind::Halftime   => format!("Half-time: {score}"),
        EventKind::SecondHalf => "Second half under way".to_string(),
        EventKind::End        => format!("Full time: {home} {score} {away}"),
        EventKind::Goal       => format!("GOAL! {score}"),
    }
}

fn body_for(kind: EventKind, m: &MatchState, lead_minutes: i64) -> String {
    let scoreboard = format!("{} {} {}", m.home_name, m.score_line(), m.away_name);
    match kind {
        EventKind::Lineups => "Line-ups confirmed. Tap to see the starting XI.".to_string(),
        EventKind::PreKickoff if !m.scheduled_time.is_empty() => {
            let zone = if m.venue_offset.is_empty() { "GMT" } else { m.venue_offset.as_str() };
            format!("Today {} ({zone})", m.scheduled_time)
        }
        EventKind::PreKickoff => format!("{lead_minutes} minutes to go."),
        EventKind::Start      => "Follow it minute by minute in the app.".to_string(),
        EventKind::Halftime   => format!("{scoreboard} at the break."),
        EventKind::SecondHalf => "The second half has started.".to_string(),
        EventKind::End        => "See the summary and stats.".to_string(),
        EventKind::Goal if !m.minute.is_empty() => format!("Min {} | {scoreboard}", m.minute),
        EventKind::Goal       => scoreboard,
    }
}

/// Render title, body and data payload for one event. Pure.
pub fn compose(event: &Event, default_scope: &str, lead_minutes: i64) -> ComposedPush {
    let m = &event.snapshot;
    let channel = if m.scope.is_empty() { default_scope } else { m.scope.as_str() };

    let mut data = BTreeMap::new();
    let mut put = |k: &str, v: String| {
        data.insert(k.to_string(), v);
    };
    put("screen", "Match".to_string());
    put("tab", tab_for(event.kind).to_string());
    put("matchId", event.match_id.clone());
    put("channel", channel.to_string());
    put("event", event.kind.as_str().to_string());
    put("statusId", m.status_id.to_string());
    put("homeGoals", m.home_goals.to_string());
    put("awayGoals", m.away_goals.to_string());
    for (key, value) in [
        ("ymd", &m.scheduled_date),
        ("hhmm", &m.scheduled_time),
        ("gmt", &m.venue_offset),
    ] {
        if !value.is_empty() {
            put(key, value.clone());
        }
    }
    if let Some(side) = event.scorer_side {
        put("scorer", side.as_str().to_string());
    }

    ComposedPush {
        notification: Notification {
            title: title_for(event.kind, m, lead_minutes),
            body:  body_for(event.kind, m, lead_minutes),
        },
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transition_detector::Side;

    fn snapshot() -> MatchState {
        MatchState {
            match_id: "4410".into(),
            scope: "mexico".into(),
            status_id: 1,
            home_goals: 2,
            away_goals: 1,
            home_name: "Comunicaciones".into(),
            away_name: "Municipal".into(),
            minute: "67".into(),
            ..MatchState::default()
        }
    }

    #[test]
    fn goal_push() {
        let event = Event::new(EventKind::Goal, snapshot(), Some(Side::Home));
        let push = compose(&event, "guatemala", 30);

        assert_eq!(push.notification.title, "GOAL! 2-1");
        assert_eq!(push.notification.body, "Min 67 | Comunicaciones 2-1 Municipal");
        assert_eq!(push.data["tab"], "live");
        assert_eq!(push.data["event"], "GOAL");
        assert_eq!(push.data["channel"], "mexico");
        assert_eq!(push.data["matchId"], "4410");
        assert_eq!(push.data["homeGoals"], "2");
        assert_eq!(push.data["scorer"], "home");
        assert!(!push.data.contains_key("ymd"));
    }

    #[test]
    fn pre_kickoff_shows_local_time_and_schedule_fields() {
        let m = MatchState {
            scheduled_date: "20240315".into(),
            scheduled_time: "18:30".into(),
            venue_offset: "-06:00".into(),
            ..snapshot()
        };
        let push = compose(&Event::new(EventKind::PreKickoff, m, None), "guatemala", 30);

        assert_eq!(push.notification.title, "Kick-off in 30 min: Comunicaciones vs Municipal");
        assert_eq!(push.notification.body, "Today 18:30 (-06:00)");
        assert_eq!(push.data["ymd"], "20240315");
        assert_eq!(push.data["gmt"], "-06:00");
        assert_eq!(push.data["tab"], "details");
        assert!(!push.data.contains_key("scorer"));
    }

    #[test]
    fn empty_scope_uses_default_channel() {
        let m = MatchState { scope: String::new(), ..snapshot() };
        let push = compose(&Event::new(EventKind::End, m, None), "guatemala", 30);
        assert_eq!(push.data["channel"], "guatemala");
        assert_eq!(push.notification.title, "Full time: Comunicaciones 2-1 Municipal");
    }

    #[test]
    fn every_kind_has_text_and_a_tab() {
        for kind in EventKind::ALL {
            let push = compose(&Event::new(kind, snapshot(), None), "g", 30);
            assert!(!push.notification.title.is_empty(), "{kind}");
            assert!(!push.notification.body.is_empty(), "{kind}");
            assert!(["lineups", "live", "details"].contains(&push.data["tab"].as_str()));
        }
    }
}
