mod controller;
mod projection;
mod timeline;

pub use controller::{RosterPlayer, RoundController, RoundHeader, Team};
pub use timeline::{EventKind, MatchEvent, RoundTimeline};
