use match_feed::MatchState;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Lineups,
    PreKickoff,
    Start,
    Halftime,
    SecondHalf,
    End,
    Goal,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Lineups,
        EventKind::PreKickoff,
        EventKind::Start,
        EventKind::Halftime,
        EventKind::SecondHalf,
        EventKind::End,
        EventKind::Goal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Lineups    => "LINEUPS",
            EventKind::PreKickoff => "PRE_KICKOFF",
            EventKind::Start      => "START",
            EventKind::Halftime   => "HALFTIME",
            EventKind::SecondHalf => "SECOND_HALF",
            EventKind::End        => "END",
            EventKind::Goal       => "GOAL",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for EventKind {
    type Err = ParseKindError;

    /// Case-insensitive; the short names older configs used (PRE30, HT, ST) still parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let kind = match upper.as_str() {
            "LINEUPS" => EventKind::Lineups,
            "PRE_KICKOFF" | "PRE30" => EventKind::PreKickoff,
            "START" => EventKind::Start,
            "HALFTIME" | "HT" => EventKind::Halftime,
            "SECOND_HALF" | "ST" => EventKind::SecondHalf,
            "END" => EventKind::End,
            "GOAL" => EventKind::Goal,
            _ => return Err(ParseKindError(s.to_string())),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }
}

/// One detected transition, carrying the state it was detected in.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind:        EventKind,
    pub match_id:    String,
    pub snapshot:    MatchState,
    pub scorer_side: Option<Side>,
}

impl Event {
    pub fn new(kind: EventKind, snapshot: MatchState, scorer_side: Option<Side>) -> Self {
        Self {
            kind,
            match_id: snapshot.match_id.clone(),
            snapshot,
            scorer_side,
        }
    }
}
