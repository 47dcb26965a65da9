//! Match-feedback records: the epoch-dispatched header, the kill/death
//! decoder, and the legacy free-text classifier.

use crate::analyzer::observer::DecodeNote;
use crate::analyzer::round_controller::{EventKind, MatchEvent, RoundController};
use crate::reader::CaptureReader;
use crate::types::CodeVersion;
use crate::{ReplayError, Result};

/// Marker the oldest-epoch header seeks to before the size field.
pub(crate) const ACTIVITY_MARKER: [u8; 8] = [0x00, 0x00, 0x00, 0x22, 0xe3, 0x09, 0x00, 0x79];

/// Magic prefix of a kill/death payload inside a size-0 feedback record.
pub(crate) const KILL_INDICATOR: [u8; 5] = [0x22, 0xd9, 0x13, 0x3c, 0xba];

impl RoundController {
    /// Decodes one match-feedback record. At most one event is appended;
    /// records failing the reconstruction heuristics are dropped without
    /// error.
    pub fn process_match_feedback(&mut self, r: &mut CaptureReader<'_>) -> Result<()> {
        if self.header.code_version >= CodeVersion::Y9S1Update3 {
            r.skip(38)?;
        } else if self.header.code_version >= CodeVersion::Y9S1 {
            r.skip(9)?;
            let offset = r.position();
            if r.int()? != 4 {
                return Err(ReplayError::ProtocolMismatch { offset });
            }
            r.skip(24)?;
        } else {
            r.skip(1)?;
            r.seek(&ACTIVITY_MARKER)?;
        }
        let size = r.int()?;
        if size == 0 {
            return self.read_kill_or_death(r);
        }
        // Y9S1 may have removed or reshaped the sized feedback records;
        // their layout is unknown, so the bytes are left untouched.
        if self.header.code_version >= CodeVersion::Y9S1 {
            self.observer.on_note(DecodeNote::UnhandledFeedback { size });
            return Ok(());
        }
        self.read_legacy_message(r, size as usize)
    }

    fn read_kill_or_death(&mut self, r: &mut CaptureReader<'_>) -> Result<()> {
        let kill_trace = r.bytes(5)?;
        if kill_trace != KILL_INDICATOR {
            self.observer
                .on_note(DecodeNote::KillMarkerMismatch { marker: kill_trace });
            return Ok(());
        }
        let killer = r.string()?;
        r.skip(15)?;
        let target = r.string()?;
        if killer.is_empty() {
            // A downed player bleeding out: there is no fresh killing
            // blow to attribute, only the death itself.
            if target.is_empty() {
                self.observer.on_note(DecodeNote::EmptyKillRecord);
                return Ok(());
            }
            let mut event = MatchEvent::at(EventKind::Death, &self.clock);
            event.actor = target;
            self.append(event);
            return Ok(());
        }
        r.skip(56)?;
        let headshot = r.int()?;

        let mut event = MatchEvent::at(EventKind::Kill, &self.clock);
        event.actor = killer;
        event.target = target;
        event.headshot = Some(headshot == 1);

        // Killer and target on the same team means the record was
        // mis-decoded; this filter applies before any other heuristic.
        if let (Some(killer_idx), Some(target_idx)) = (
            self.player_index_by_username(&event.actor),
            self.player_index_by_username(&event.target),
        ) {
            let killer_team = self.header.players[killer_idx].team_index;
            let target_team = self.header.players[target_idx].team_index;
            if killer_team == target_team {
                self.observer.on_note(DecodeNote::SameTeamKillFiltered {
                    killer: &event.actor,
                    target: &event.target,
                    team_index: killer_team,
                });
                return Ok(());
            }
        }

        // Replays re-emit kills, most often around the timer reset that
        // follows a plant. Walk the timeline newest-first; the nearest
        // prior death of this target decides whether the new record is an
        // echo. Overtime (clock jumped up by more than 5) allows a re-kill
        // by a different player, or by the same player when the original
        // death was not sitting on the plant boundary.
        //
        // At most one plant completes per round, and its clock value
        // marks the duplication-prone reset window.
        let plant_time = self
            .timeline
            .events()
            .iter()
            .rev()
            .find(|e| e.kind == EventKind::DefuserPlantComplete)
            .map(|e| e.clock_seconds);
        let mut in_overtime = false;
        for prior in self.timeline.events().iter().rev() {
            if event.clock_seconds > prior.clock_seconds + 5.0 {
                in_overtime = true;
            }
            let target_already_dead = match prior.kind {
                EventKind::Kill => prior.target == event.target,
                EventKind::Death => prior.actor == event.target,
                _ => false,
            };
            if !target_already_dead {
                continue;
            }
            let same_killer = prior.kind == EventKind::Kill && prior.actor == event.actor;
            // The clock counts down, so "at or within one second after
            // the plant" is the window [plant_time - 1, plant_time].
            let plant_boundary = plant_time
                .is_some_and(|t| prior.clock_seconds <= t && prior.clock_seconds >= t - 1.0);
            if in_overtime && (!same_killer || !plant_boundary) {
                self.observer.on_note(DecodeNote::OvertimeReKillAllowed {
                    killer: &event.actor,
                    target: &event.target,
                    same_killer,
                });
                break;
            }
            self.observer.on_note(DecodeNote::DuplicateKillFiltered {
                killer: &event.actor,
                target: &event.target,
                existing_seconds: prior.clock_seconds,
                new_seconds: event.clock_seconds,
                plant_boundary,
            });
            return Ok(());
        }

        if !self.last_scoreboard_killer.is_empty() && self.last_scoreboard_killer != event.actor {
            event.scoreboard_actor = Some(self.last_scoreboard_killer.clone());
        }
        self.append(event);
        Ok(())
    }

    fn read_legacy_message(&mut self, r: &mut CaptureReader<'_>, size: usize) -> Result<()> {
        let text = String::from_utf8_lossy(r.bytes(size)?).into_owned();
        let kind = if text.contains("bombs") || text.contains("objective") {
            EventKind::LocateObjective
        } else if text.contains("BattlEye") {
            EventKind::AntiCheatNotice
        } else if text.contains("left") {
            EventKind::PlayerLeave
        } else {
            EventKind::Other
        };
        let mut event = MatchEvent::at(kind, &self.clock);
        if kind == EventKind::Other {
            event.message = text;
        } else {
            event.actor = text
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
        }
        self.append(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::observer::{DecodeNote, DecodeObserver};
    use crate::analyzer::round_controller::{RosterPlayer, RoundHeader, Team};
    use crate::types::{PlayerId, RoundClock, TeamRole};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn player(name: &str, team: usize, id: u8) -> RosterPlayer {
        RosterPlayer {
            username: name.into(),
            team_index: team,
            id: PlayerId([id, 0, 0, 0]),
        }
    }

    fn header(version: CodeVersion) -> RoundHeader {
        RoundHeader {
            code_version: version,
            teams: [
                Team {
                    role: TeamRole::Attack,
                },
                Team {
                    role: TeamRole::Defense,
                },
            ],
            players: vec![
                player("Ash", 0, 1),
                player("Thermite", 0, 2),
                player("Rook", 1, 3),
                player("Doc", 1, 4),
            ],
        }
    }

    fn controller_at(version: CodeVersion, label: &str, seconds: f64) -> RoundController {
        let mut controller = RoundController::new(header(version));
        controller.set_clock(RoundClock::new(label, seconds));
        controller
    }

    fn push_string(buf: &mut Vec<u8>, s: &str) {
        buf.push(s.len() as u8);
        buf.extend_from_slice(s.as_bytes());
    }

    /// Kill/death record for a Y9S1Update3-or-later header.
    fn kill_record(killer: &str, target: &str, headshot: i32) -> Vec<u8> {
        let mut buf = vec![0u8; 38];
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&KILL_INDICATOR);
        push_string(&mut buf, killer);
        buf.extend_from_slice(&[0u8; 15]);
        push_string(&mut buf, target);
        if !killer.is_empty() {
            buf.extend_from_slice(&[0u8; 56]);
            buf.extend_from_slice(&headshot.to_le_bytes());
        }
        buf
    }

    fn feed(controller: &mut RoundController, record: &[u8]) {
        let mut r = CaptureReader::new(record);
        controller
            .process_match_feedback(&mut r)
            .expect("record decodes");
    }

    fn plant_complete(controller: &mut RoundController, seconds: f64) {
        let mut event = MatchEvent::at(
            EventKind::DefuserPlantComplete,
            &RoundClock::new(format!("{seconds}"), seconds),
        );
        event.actor = "Thermite".into();
        controller.append(event);
        controller.planted = true;
    }

    #[test]
    fn kill_appends_one_event() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "2:47", 167.0);
        feed(&mut controller, &kill_record("Ash", "Rook", 1));

        let events = controller.timeline().events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Kill);
        assert_eq!(events[0].actor, "Ash");
        assert_eq!(events[0].target, "Rook");
        assert_eq!(events[0].headshot, Some(true));
        assert_eq!(events[0].clock_label, "2:47");
        assert_eq!(events[0].clock_seconds, 167.0);
    }

    #[test]
    fn non_headshot_flag_decodes_false() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "2:47", 167.0);
        feed(&mut controller, &kill_record("Ash", "Rook", 0));
        assert_eq!(controller.timeline().events()[0].headshot, Some(false));
    }

    #[test]
    fn replayed_kill_is_filtered() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "1:30", 90.0);
        let record = kill_record("Ash", "Rook", 0);
        feed(&mut controller, &record);
        feed(&mut controller, &record);
        assert_eq!(controller.timeline().len(), 1);
    }

    #[test]
    fn same_team_kill_is_never_appended() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "1:30", 90.0);
        feed(&mut controller, &kill_record("Ash", "Thermite", 0));
        assert!(controller.timeline().is_empty());

        // Still filtered when the clock has jumped into overtime.
        feed(&mut controller, &kill_record("Doc", "Ash", 0));
        controller.set_clock(RoundClock::new("2:00", 120.0));
        feed(&mut controller, &kill_record("Ash", "Thermite", 0));
        assert_eq!(controller.timeline().len(), 1);
    }

    #[test]
    fn empty_killer_becomes_unattributed_death() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "0:44", 44.0);
        feed(&mut controller, &kill_record("", "Rook", 0));

        let events = controller.timeline().events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Death);
        assert_eq!(events[0].actor, "Rook");
        assert_eq!(events[0].target, "");
        assert_eq!(events[0].headshot, None);
    }

    #[test]
    fn empty_killer_and_target_drop_silently() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "0:44", 44.0);
        feed(&mut controller, &kill_record("", "", 0));
        assert!(controller.timeline().is_empty());
    }

    #[test]
    fn overtime_rekill_by_different_player_is_kept() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "1:00", 60.0);
        feed(&mut controller, &kill_record("Ash", "Rook", 0));

        controller.set_clock(RoundClock::new("1:30", 90.0));
        feed(&mut controller, &kill_record("Thermite", "Rook", 0));
        assert_eq!(controller.timeline().len(), 2);
    }

    #[test]
    fn overtime_rekill_by_same_player_is_kept_off_the_plant_boundary() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "1:00", 60.0);
        feed(&mut controller, &kill_record("Ash", "Rook", 0));

        controller.set_clock(RoundClock::new("1:30", 90.0));
        feed(&mut controller, &kill_record("Ash", "Rook", 0));
        assert_eq!(controller.timeline().len(), 2);
    }

    #[test]
    fn overtime_same_killer_on_the_plant_boundary_is_filtered() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "0:40", 40.0);
        plant_complete(&mut controller, 40.0);
        feed(&mut controller, &kill_record("Ash", "Rook", 0));
        assert_eq!(controller.timeline().len(), 2);

        controller.set_clock(RoundClock::new("1:35", 95.0));
        feed(&mut controller, &kill_record("Ash", "Rook", 0));
        assert_eq!(controller.timeline().len(), 2);
    }

    #[test]
    fn rekill_without_overtime_is_filtered_even_for_a_different_killer() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "1:00", 60.0);
        feed(&mut controller, &kill_record("Ash", "Rook", 0));

        controller.set_clock(RoundClock::new("0:58", 58.0));
        feed(&mut controller, &kill_record("Thermite", "Rook", 0));
        assert_eq!(controller.timeline().len(), 1);
    }

    #[test]
    fn unknown_kill_indicator_drops_the_record() {
        let mut buf = vec![0u8; 38];
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05]);

        let mut controller = controller_at(CodeVersion::Y9S1Update3, "1:30", 90.0);
        feed(&mut controller, &buf);
        assert!(controller.timeline().is_empty());
    }

    #[test]
    fn scoreboard_killer_annotates_disagreeing_kills() {
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "1:30", 90.0);
        controller.note_scoreboard_killer("Thermite");
        feed(&mut controller, &kill_record("Ash", "Rook", 0));
        assert_eq!(
            controller.timeline().events()[0].scoreboard_actor.as_deref(),
            Some("Thermite")
        );

        controller.note_scoreboard_killer("Ash");
        controller.set_clock(RoundClock::new("1:20", 80.0));
        feed(&mut controller, &kill_record("Ash", "Doc", 0));
        assert_eq!(controller.timeline().events()[1].scoreboard_actor, None);
    }

    #[test]
    fn mid_epoch_header_requires_the_validity_integer() {
        let mut buf = vec![0u8; 9];
        buf.extend_from_slice(&5i32.to_le_bytes());

        let mut controller = controller_at(CodeVersion::Y9S1, "1:30", 90.0);
        let mut r = CaptureReader::new(&buf);
        match controller.process_match_feedback(&mut r) {
            Err(ReplayError::ProtocolMismatch { offset }) => assert_eq!(offset, 9),
            other => panic!("expected protocol mismatch, got {other:?}"),
        }
    }

    #[test]
    fn mid_epoch_header_decodes_kills() {
        let mut buf = vec![0u8; 9];
        buf.extend_from_slice(&4i32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 24]);
        buf.extend_from_slice(&kill_record("Ash", "Rook", 1)[38..]);

        let mut controller = controller_at(CodeVersion::Y9S1, "2:10", 130.0);
        feed(&mut controller, &buf);
        assert_eq!(controller.timeline().len(), 1);
        assert_eq!(controller.timeline().events()[0].actor, "Ash");
    }

    #[test]
    fn oldest_epoch_header_seeks_to_the_activity_marker() {
        let mut buf = vec![0xee, 0x10, 0x20, 0x30];
        buf.extend_from_slice(&ACTIVITY_MARKER);
        buf.extend_from_slice(&kill_record("Ash", "Rook", 0)[38..]);

        let mut controller = controller_at(CodeVersion::Y8S4, "2:10", 130.0);
        feed(&mut controller, &buf);
        assert_eq!(controller.timeline().len(), 1);
    }

    fn legacy_record(text: &str) -> Vec<u8> {
        let mut buf = vec![0xee];
        buf.extend_from_slice(&ACTIVITY_MARKER);
        buf.extend_from_slice(&(text.len() as i32).to_le_bytes());
        buf.extend_from_slice(text.as_bytes());
        buf
    }

    #[test]
    fn legacy_objective_message_classifies_with_priority() {
        let mut controller = controller_at(CodeVersion::Y8S4, "2:10", 130.0);
        // "left" also matches, but the objective check wins.
        feed(&mut controller, &legacy_record("Ash left the objective area"));

        let events = controller.timeline().events();
        assert_eq!(events[0].kind, EventKind::LocateObjective);
        assert_eq!(events[0].actor, "Ash");
        assert_eq!(events[0].message, "");
    }

    #[test]
    fn legacy_anticheat_and_leave_messages_classify() {
        let mut controller = controller_at(CodeVersion::Y8S4, "2:10", 130.0);
        feed(&mut controller, &legacy_record("BattlEye kicked Doc"));
        feed(&mut controller, &legacy_record("Doc left the match"));

        let events = controller.timeline().events();
        assert_eq!(events[0].kind, EventKind::AntiCheatNotice);
        assert_eq!(events[0].actor, "BattlEye");
        assert_eq!(events[1].kind, EventKind::PlayerLeave);
        assert_eq!(events[1].actor, "Doc");
    }

    #[test]
    fn legacy_other_messages_keep_the_text() {
        let mut controller = controller_at(CodeVersion::Y8S4, "2:10", 130.0);
        feed(&mut controller, &legacy_record("round is live"));

        let events = controller.timeline().events();
        assert_eq!(events[0].kind, EventKind::Other);
        assert_eq!(events[0].actor, "");
        assert_eq!(events[0].message, "round is live");
    }

    #[test]
    fn sized_records_after_the_rework_are_skipped_unread() {
        let mut buf = vec![0u8; 9];
        buf.extend_from_slice(&4i32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 24]);
        buf.extend_from_slice(&7i32.to_le_bytes());
        buf.extend_from_slice(b"payload");

        let mut controller = controller_at(CodeVersion::Y9S1, "2:10", 130.0);
        let mut r = CaptureReader::new(&buf);
        controller.process_match_feedback(&mut r).unwrap();
        assert!(controller.timeline().is_empty());
        assert_eq!(r.remaining(), 7);
    }

    #[test]
    fn truncated_records_are_fatal() {
        let record = kill_record("Ash", "Rook", 0);
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "1:30", 90.0);
        let mut r = CaptureReader::new(&record[..record.len() - 2]);
        assert!(matches!(
            controller.process_match_feedback(&mut r),
            Err(ReplayError::Truncation { .. })
        ));
    }

    #[derive(Default)]
    struct RecordingObserver {
        notes: Rc<RefCell<Vec<&'static str>>>,
    }

    impl DecodeObserver for RecordingObserver {
        fn on_note(&self, note: DecodeNote<'_>) {
            let label = match note {
                DecodeNote::EventAppended(_) => "appended",
                DecodeNote::KillMarkerMismatch { .. } => "marker-mismatch",
                DecodeNote::EmptyKillRecord => "empty",
                DecodeNote::SameTeamKillFiltered { .. } => "same-team",
                DecodeNote::DuplicateKillFiltered { .. } => "duplicate",
                DecodeNote::OvertimeReKillAllowed { .. } => "overtime-rekill",
                DecodeNote::UnhandledFeedback { .. } => "unhandled",
                DecodeNote::AmbiguousDefuserActor { .. } => "ambiguous-defuser",
            };
            self.notes.borrow_mut().push(label);
        }
    }

    #[test]
    fn observer_sees_suppression_decisions_without_changing_them() {
        let notes = Rc::new(RefCell::new(Vec::new()));
        let mut controller = controller_at(CodeVersion::Y9S1Update3, "1:30", 90.0);
        controller.set_observer(Box::new(RecordingObserver {
            notes: Rc::clone(&notes),
        }));

        let record = kill_record("Ash", "Rook", 0);
        feed(&mut controller, &record);
        feed(&mut controller, &record);
        feed(&mut controller, &kill_record("Ash", "Thermite", 0));

        assert_eq!(controller.timeline().len(), 1);
        assert_eq!(&*notes.borrow(), &["appended", "duplicate", "same-team"]);
    }
}
