use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol epoch of the capture, parsed from the match header by the
/// embedder. Record layouts are selected by comparing against the cut
/// points below, so the variant order is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CodeVersion {
    /// Last season before the feedback-header rework; headers are located
    /// by seeking to the activity marker.
    Y8S4,
    /// Reworked match-feedback header carrying the validity integer.
    Y9S1,
    /// Validity integer dropped in favor of a fixed 38-byte preamble.
    Y9S1Update3,
    /// Defuser timer records no longer carry the player identifier.
    Y10S4,
}

/// Side a team plays during the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamRole {
    Attack,
    Defense,
}

/// 4-byte wire identifier for a roster slot. Y10S4 captures dropped the
/// field, so rosters from those headers leave it zeroed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub [u8; 4]);

impl PlayerId {
    pub fn raw(self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a:02x}{b:02x}{c:02x}{d:02x}")
    }
}

impl From<[u8; 4]> for PlayerId {
    fn from(v: [u8; 4]) -> Self {
        PlayerId(v)
    }
}

/// Round-timer snapshot: the verbatim label from the capture plus the
/// seconds value derived from it. The timer counts down within a phase;
/// a successful plant restarts it upward.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundClock {
    /// Raw textual value, preserved as-is.
    pub raw: String,
    /// Seconds remaining in the current phase.
    pub seconds: f64,
}

impl RoundClock {
    pub fn new(raw: impl Into<String>, seconds: f64) -> Self {
        Self {
            raw: raw.into(),
            seconds,
        }
    }

    /// Parses a timer label: either `m:ss` ("2:47") or a bare seconds
    /// value ("9.00"). Returns `None` for anything else.
    pub fn parse(label: &str) -> Option<RoundClock> {
        let seconds = match label.split_once(':') {
            Some((m, s)) => {
                let m: f64 = m.parse().ok()?;
                let s: f64 = s.parse().ok()?;
                m * 60.0 + s
            }
            None => label.parse().ok()?,
        };
        Some(RoundClock::new(label, seconds))
    }
}

impl fmt::Display for RoundClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
