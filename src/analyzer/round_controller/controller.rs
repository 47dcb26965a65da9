use serde::{Deserialize, Serialize};

use crate::analyzer::observer::{DecodeNote, DecodeObserver, NullObserver};
use crate::types::{CodeVersion, PlayerId, RoundClock, TeamRole};

use super::timeline::{EventKind, MatchEvent, RoundTimeline};

/// One roster slot from the match header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterPlayer {
    /// May be empty when the header slot never resolved to an account.
    pub username: String,
    pub team_index: usize,
    /// Wire identifier; zeroed in Y10S4+ captures.
    #[serde(default)]
    pub id: PlayerId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Team {
    pub role: TeamRole,
}

/// Header facts the engine needs: rosters, sides, and the protocol epoch.
/// Produced by the embedder's header parser before any record decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundHeader {
    pub code_version: CodeVersion,
    pub teams: [Team; 2],
    pub players: Vec<RosterPlayer>,
}

/// Accumulates the reconstructed timeline for a single capture.
///
/// One controller per capture and exactly one writer: the embedder feeds
/// records sequentially and reads the timeline once the capture is
/// exhausted. Later decode decisions depend on the accumulated timeline,
/// so records must be fully consumed in order.
pub struct RoundController {
    pub(crate) header: RoundHeader,
    pub(crate) clock: RoundClock,
    pub(crate) timeline: RoundTimeline,
    /// Flips false→true at most once, on the first observed plant
    /// completion.
    pub(crate) planted: bool,
    /// Debounces repeated defuser attributions and names the actor at
    /// completion time.
    pub(crate) last_defuser_player: Option<usize>,
    /// Last killer independently observed on the scoreboard feed.
    pub(crate) last_scoreboard_killer: String,
    pub(crate) observer: Box<dyn DecodeObserver>,
}

impl std::fmt::Debug for RoundController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundController")
            .field("header", &self.header)
            .field("clock", &self.clock)
            .field("timeline", &self.timeline)
            .field("planted", &self.planted)
            .field("last_defuser_player", &self.last_defuser_player)
            .field("last_scoreboard_killer", &self.last_scoreboard_killer)
            .finish_non_exhaustive()
    }
}

impl RoundController {
    pub fn new(header: RoundHeader) -> Self {
        Self {
            header,
            clock: RoundClock::default(),
            timeline: RoundTimeline::new(),
            planted: false,
            last_defuser_player: None,
            last_scoreboard_killer: String::new(),
            observer: Box::new(NullObserver),
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn DecodeObserver>) {
        self.observer = observer;
    }

    pub fn header(&self) -> &RoundHeader {
        &self.header
    }

    pub fn timeline(&self) -> &RoundTimeline {
        &self.timeline
    }

    pub fn into_timeline(self) -> RoundTimeline {
        self.timeline
    }

    pub fn planted(&self) -> bool {
        self.planted
    }

    pub fn clock(&self) -> &RoundClock {
        &self.clock
    }

    /// Updates the playback clock from the latest timer record. Events
    /// decoded afterwards are stamped with this value.
    pub fn set_clock(&mut self, clock: RoundClock) {
        self.clock = clock;
    }

    /// Records the killer most recently shown by the scoreboard feed.
    /// Used only to annotate Kill events; never authoritative.
    pub fn note_scoreboard_killer(&mut self, username: &str) {
        self.last_scoreboard_killer = username.to_string();
    }

    pub(crate) fn player_index_by_username(&self, username: &str) -> Option<usize> {
        if username.is_empty() {
            return None;
        }
        self.header.players.iter().position(|p| p.username == username)
    }

    pub(crate) fn player_index_by_id(&self, id: PlayerId) -> Option<usize> {
        self.header.players.iter().position(|p| p.id == id)
    }

    pub(crate) fn team_by_role(&self, role: TeamRole) -> Option<usize> {
        self.header.teams.iter().position(|t| t.role == role)
    }

    /// True once the player shows up anywhere in the timeline as a kill
    /// target or a bare death.
    pub(crate) fn is_dead(&self, username: &str) -> bool {
        self.timeline.events().iter().any(|e| match e.kind {
            EventKind::Kill => e.target == username,
            EventKind::Death => e.actor == username,
            _ => false,
        })
    }

    /// Usernames of still-alive, named players on a team.
    pub(crate) fn alive_players_on_team(&self, team_index: usize) -> Vec<&str> {
        self.header
            .players
            .iter()
            .filter(|p| {
                p.team_index == team_index
                    && !p.username.is_empty()
                    && !self.is_dead(&p.username)
            })
            .map(|p| p.username.as_str())
            .collect()
    }

    pub(crate) fn append(&mut self, event: MatchEvent) {
        self.observer.on_note(DecodeNote::EventAppended(&event));
        self.timeline.push(event);
    }
}
