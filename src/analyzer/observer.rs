use tracing::debug;

use super::round_controller::MatchEvent;

/// Structured diagnostics emitted while decoding.
///
/// Notes are purely informational: every suppression decision is made
/// before its note is emitted, and decode results are identical no matter
/// which observer is installed.
#[derive(Debug)]
pub enum DecodeNote<'a> {
    /// An event survived all filters and was appended to the timeline.
    EventAppended(&'a MatchEvent),
    /// A size-0 feedback record did not carry the kill indicator magic.
    KillMarkerMismatch { marker: &'a [u8] },
    /// A kill record with neither killer nor target.
    EmptyKillRecord,
    /// Killer and target resolved to the same team index.
    SameTeamKillFiltered {
        killer: &'a str,
        target: &'a str,
        team_index: usize,
    },
    /// The target was already dead and the record was judged a replay echo.
    DuplicateKillFiltered {
        killer: &'a str,
        target: &'a str,
        existing_seconds: f64,
        new_seconds: f64,
        plant_boundary: bool,
    },
    /// The target was already dead but the re-kill was kept as legitimate.
    OvertimeReKillAllowed {
        killer: &'a str,
        target: &'a str,
        same_killer: bool,
    },
    /// A sized feedback record at Y9S1 or later; layout unknown, skipped.
    UnhandledFeedback { size: i32 },
    /// A defuser tick whose actor could not be narrowed to one player.
    AmbiguousDefuserActor { candidates: usize },
}

/// Sink for decode diagnostics. All methods default to doing nothing, so
/// implementors opt into exactly what they care about.
pub trait DecodeObserver {
    fn on_note(&self, _note: DecodeNote<'_>) {}
}

/// The observer installed by default: drops everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl DecodeObserver for NullObserver {}

/// Forwards decode notes to `tracing` at debug level.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl DecodeObserver for TracingObserver {
    fn on_note(&self, note: DecodeNote<'_>) {
        match note {
            DecodeNote::EventAppended(event) => debug!(?event, "match update"),
            DecodeNote::KillMarkerMismatch { marker } => {
                debug!(kill_trace = ?marker, "unrecognized kill indicator")
            }
            DecodeNote::EmptyKillRecord => debug!("kill record with no killer or target"),
            DecodeNote::SameTeamKillFiltered {
                killer,
                target,
                team_index,
            } => debug!(killer, target, team_index, "kill filtered (same team)"),
            DecodeNote::DuplicateKillFiltered {
                killer,
                target,
                existing_seconds,
                new_seconds,
                plant_boundary,
            } => debug!(
                killer,
                target,
                existing_seconds,
                new_seconds,
                plant_boundary,
                "duplicate kill filtered (target already dead)"
            ),
            DecodeNote::OvertimeReKillAllowed {
                killer,
                target,
                same_killer,
            } => debug!(killer, target, same_killer, "overtime re-kill allowed"),
            DecodeNote::UnhandledFeedback { size } => {
                debug!(size, "sized match feedback skipped")
            }
            DecodeNote::AmbiguousDefuserActor { candidates } => {
                debug!(candidates, "defuser actor ambiguous")
            }
        }
    }
}
