//! Defuser timer records: plant/disable phase reconstruction, with actor
//! inference for captures that no longer carry the player identifier.

use crate::analyzer::observer::DecodeNote;
use crate::analyzer::round_controller::{EventKind, MatchEvent, RoundController};
use crate::reader::CaptureReader;
use crate::types::{CodeVersion, PlayerId, TeamRole};
use crate::Result;

impl RoundController {
    /// Decodes one defuser-timer tick. May append a start event (debounced
    /// per actor) and, on a "0.00" label, a completion event.
    pub fn process_defuser_timer(&mut self, r: &mut CaptureReader<'_>) -> Result<()> {
        let timer = r.string()?;

        let player_index = if self.header.code_version >= CodeVersion::Y10S4 {
            self.infer_defuser_actor()
        } else {
            r.skip(34)?;
            let id = PlayerId(r.array()?);
            self.player_index_by_id(id)
        };

        if let Some(index) = player_index {
            if self.last_defuser_player != Some(index) {
                let kind = if self.planted {
                    EventKind::DefuserDisableStart
                } else {
                    EventKind::DefuserPlantStart
                };
                let mut event = MatchEvent::at(kind, &self.clock);
                event.actor = self.header.players[index].username.clone();
                self.append(event);
                self.last_defuser_player = Some(index);
            }
        }

        // The label can read 0.00 without the defuser actually finishing;
        // the capture gives no way to tell them apart, so every 0.00 tick
        // counts as a completion signal.
        if !timer.starts_with("0.00") {
            return Ok(());
        }
        let kind = if self.planted {
            EventKind::DefuserDisableComplete
        } else {
            self.planted = true;
            EventKind::DefuserPlantComplete
        };
        let actor = self
            .last_defuser_player
            .and_then(|i| self.header.players.get(i))
            .map(|p| p.username.clone())
            .unwrap_or_default();
        let mut event = MatchEvent::at(kind, &self.clock);
        event.actor = actor;
        self.append(event);
        Ok(())
    }

    /// Y10S4 dropped the player identifier from timer records. Attackers
    /// plant and defenders disable, so when exactly one eligible player
    /// remains on the acting side the tick can still be attributed.
    fn infer_defuser_actor(&self) -> Option<usize> {
        let target_role = if self.planted {
            TeamRole::Defense
        } else {
            TeamRole::Attack
        };
        let team_index = self.team_by_role(target_role)?;
        let alive = self.alive_players_on_team(team_index);
        match alive.as_slice() {
            [only] => self.player_index_by_username(only),
            _ => {
                self.observer.on_note(DecodeNote::AmbiguousDefuserActor {
                    candidates: alive.len(),
                });
                None
            }
        }
    }
}
