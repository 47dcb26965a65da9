use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString, FromRepr, IntoStaticStr};

use crate::types::RoundClock;

/// Discrete things that can happen on the round timeline.
///
/// Discriminants are the stable numeric codes used by the wire
/// projection; the name/code envelope lives in `projection`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, FromRepr, IntoStaticStr,
)]
#[repr(i32)]
pub enum EventKind {
    Kill = 0,
    Death = 1,
    DefuserPlantStart = 2,
    DefuserPlantComplete = 3,
    DefuserDisableStart = 4,
    DefuserDisableComplete = 5,
    LocateObjective = 6,
    OperatorSwap = 7,
    AntiCheatNotice = 8,
    PlayerLeave = 9,
    Other = 10,
}

impl EventKind {
    /// Stable string identifier.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Stable numeric code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Reverse lookup by numeric code.
    pub fn from_code(code: i32) -> Option<EventKind> {
        Self::from_repr(code)
    }
}

/// One reconstructed timeline entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Acting player. Empty when the record could not be attributed.
    #[serde(rename = "username", default, skip_serializing_if = "String::is_empty")]
    pub actor: String,

    /// Affected player; kills only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,

    /// Only present for kills; `None` means not applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headshot: Option<bool>,

    /// Raw round-timer label at decode time, preserved verbatim.
    #[serde(rename = "time")]
    pub clock_label: String,

    /// Seconds remaining derived from the label. Decreases within a
    /// phase; an upward jump of more than 5 marks a timer reset.
    #[serde(rename = "timeInSeconds")]
    pub clock_seconds: f64,

    /// Free text, legacy `Other` records only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Killer last seen on the scoreboard feed at decode time, kept only
    /// when it disagrees with `actor`. Diagnostic, never wire data.
    #[serde(skip)]
    pub scoreboard_actor: Option<String>,
}

impl MatchEvent {
    pub(crate) fn at(kind: EventKind, clock: &RoundClock) -> Self {
        MatchEvent {
            kind,
            actor: String::new(),
            target: String::new(),
            headshot: None,
            clock_label: clock.raw.clone(),
            clock_seconds: clock.seconds,
            message: String::new(),
            scoreboard_actor: None,
        }
    }
}

/// Append-only sequence of reconstructed events, in decode order.
/// Events are never mutated or removed after insertion; the decode
/// heuristics only suppress records before they get here.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct RoundTimeline {
    events: Vec<MatchEvent>,
}

impl RoundTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: MatchEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[MatchEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
