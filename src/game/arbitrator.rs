//! Session arbitration for multiplayer rooms
//!
//! Exactly one participant, the authority (conventionally the host), may
//! mutate a room's session. Other players send candidate answers to the
//! authority, which adjudicates them through this handle. Every mutation
//! takes the session lock once, so concurrent submissions are applied one
//! after another and never read a stale combo.
//!
//! After each operation the session's events are appended to the submission
//! log (when one is attached) and fanned out to subscribers.

use super::session::{
    GameSession, PassOutcome, SessionEvent, SessionState, SessionSummary, Submission,
    SubmissionOutcome,
};
use super::turn::Turn;
use crate::error::{GameError, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One adjudicated submission, as persisted by a [`SubmissionLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub session_id: String,
    pub sequence_number: u64,
    pub player: String,
    pub text: String,
    pub is_valid: bool,
    pub points: u32,
    pub combo_after: u32,
    /// Session clock, milliseconds
    pub submitted_at: u64,
}

/// Append-only sink for submission records.
pub trait SubmissionLog: Send {
    fn append(&mut self, record: &SubmissionRecord) -> Result<(), StorageError>;
}

/// In-memory log. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    records: Arc<Mutex<Vec<SubmissionRecord>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SubmissionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SubmissionLog for MemoryLog {
    fn append(&mut self, record: &SubmissionRecord) -> Result<(), StorageError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

/// Read-only view handed to broadcast layers and non-authority clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub authority: String,
    #[serde(flatten)]
    pub state: SessionState,
}

struct Inner {
    session_id: String,
    session: GameSession,
    authority: String,
    subscribers: Vec<Sender<SessionEvent>>,
    log: Option<Box<dyn SubmissionLog>>,
}

impl Inner {
    fn check_authority(&self, caller: &str) -> Result<(), GameError> {
        if caller == self.authority {
            Ok(())
        } else {
            tracing::warn!(caller, authority = %self.authority, "rejected mutation from non-authority");
            Err(GameError::UnauthorizedMutation {
                caller: caller.to_string(),
                authority: self.authority.clone(),
            })
        }
    }

    /// Persist and broadcast everything the session produced.
    fn flush(&mut self) {
        for event in self.session.drain_events() {
            if let (Some(log), SessionEvent::SubmissionJudged { .. }) = (self.log.as_mut(), &event) {
                if let Some(record) = record_for(&self.session_id, &event) {
                    if let Err(e) = log.append(&record) {
                        tracing::warn!(error = %e, "failed to append submission record");
                    }
                }
            }
            // Drop subscribers whose receiver is gone
            self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

fn record_for(session_id: &str, event: &SessionEvent) -> Option<SubmissionRecord> {
    match event {
        SessionEvent::SubmissionJudged {
            player,
            text,
            sequence_number,
            result,
            combo,
            submitted_at,
            ..
        } => Some(SubmissionRecord {
            session_id: session_id.to_string(),
            sequence_number: *sequence_number,
            player: player.clone(),
            text: text.clone(),
            is_valid: result.is_valid,
            points: result.points_awarded,
            combo_after: combo.combo,
            submitted_at: *submitted_at,
        }),
        _ => None,
    }
}

/// Shared, serialized handle to one room's session.
#[derive(Clone)]
pub struct SessionArbitrator {
    inner: Arc<Mutex<Inner>>,
}

impl SessionArbitrator {
    /// Wrap a session; `authority` is the only caller allowed to mutate it.
    pub fn new(session_id: impl Into<String>, session: GameSession, authority: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                session_id: session_id.into(),
                session,
                authority: authority.into(),
                subscribers: Vec::new(),
                log: None,
            })),
        }
    }

    /// Attach the sink that receives a record for every adjudicated submission.
    pub fn with_log(self, log: Box<dyn SubmissionLog>) -> Self {
        self.lock().log = Some(log);
        self
    }

    /// Receive every event from now on.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = channel();
        self.lock().subscribers.push(tx);
        rx
    }

    pub fn authority(&self) -> String {
        self.lock().authority.clone()
    }

    /// Whether `caller` may currently mutate the session
    pub fn is_authority(&self, caller: &str) -> bool {
        self.lock().authority == caller
    }

    /// Hand write access to another participant. Called by the external
    /// host-election policy, e.g. after the previous host left.
    pub fn transfer_authority(&self, new_authority: impl Into<String>) {
        let mut inner = self.lock();
        let new_authority = new_authority.into();
        tracing::info!(from = %inner.authority, to = %new_authority, "authority transferred");
        inner.authority = new_authority;
    }

    pub fn start(&self, caller: &str) -> Result<Turn, GameError> {
        self.mutate(caller, GameSession::start)
    }

    pub fn submit(&self, caller: &str, submission: &Submission) -> Result<SubmissionOutcome, GameError> {
        self.mutate(caller, |session| session.submit(submission))
    }

    pub fn pass(&self, caller: &str, player: Option<&str>) -> Result<PassOutcome, GameError> {
        self.mutate(caller, |session| session.pass(player))
    }

    /// Turn timer expiry from the external room timer.
    pub fn expire_turn(&self, caller: &str, sequence_number: u64) -> Result<Option<PassOutcome>, GameError> {
        self.mutate(caller, |session| session.expire_turn(sequence_number))
    }

    /// Close the session (time limit or host decision). Idempotent.
    pub fn end(&self, caller: &str) -> Result<bool, GameError> {
        self.mutate(caller, |session| Ok(session.end()))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            session_id: inner.session_id.clone(),
            authority: inner.authority.clone(),
            state: inner.session.state(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        self.lock().session.summary()
    }

    /// Current time on the session clock
    pub fn now_ms(&self) -> u64 {
        self.lock().session.now_ms()
    }

    fn mutate<T>(
        &self,
        caller: &str,
        op: impl FnOnce(&mut GameSession) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let mut inner = self.lock();
        inner.check_authority(caller)?;
        let result = op(&mut inner.session);
        // Flush even on error: a correct answer may have scored before a
        // fatal generation failure.
        inner.flush();
        result
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::clock::ManualClock;
    use crate::game::dictionary::{DictionaryEntry, TermDictionary};
    use crate::game::session::SessionPhase;
    use crate::game::ScriptedRandom;
    use std::thread;

    fn test_arbitrator(clock: &ManualClock) -> SessionArbitrator {
        let dictionary = TermDictionary::from_entries(vec![
            DictionaryEntry::new(1, "git", 2),
            DictionaryEntry::new(2, "sql", 3),
        ]);
        let session = GameSession::new(
            Arc::new(dictionary),
            Box::new(ScriptedRandom::new([0.0])),
            Arc::new(clock.clone()),
        );
        SessionArbitrator::new("room-1", session, "Alice")
    }

    #[test]
    fn test_non_authority_rejected() {
        let clock = ManualClock::starting_at(0);
        let arb = test_arbitrator(&clock);
        arb.start("Alice").unwrap();
        arb.submit("Alice", &Submission::new("Alice", "git")).unwrap();

        let err = arb.submit("Bob", &Submission::new("Bob", "git")).unwrap_err();
        assert!(matches!(
            err,
            GameError::UnauthorizedMutation { ref caller, ref authority }
                if caller == "Bob" && authority == "Alice"
        ));
        assert!(arb.pass("Bob", Some("Bob")).is_err());
        assert!(arb.end("Bob").is_err());

        // nothing changed
        let snapshot = arb.snapshot();
        assert_eq!(snapshot.state.combo.combo, 1);
        assert_eq!(snapshot.state.score.total_score, 18);
        assert_eq!(snapshot.state.phase, SessionPhase::AwaitingSubmission);
    }

    #[test]
    fn test_authority_adjudicates_candidates() {
        let clock = ManualClock::starting_at(0);
        let arb = test_arbitrator(&clock);
        arb.start("Alice").unwrap();

        // Bob's candidate, relayed to the host
        let outcome = arb.submit("Alice", &Submission::new("Bob", "git")).unwrap();
        assert!(outcome.result.is_valid);
    }

    #[test]
    fn test_transfer_authority() {
        let clock = ManualClock::starting_at(0);
        let arb = test_arbitrator(&clock);
        arb.start("Alice").unwrap();
        assert!(arb.is_authority("Alice"));

        arb.transfer_authority("Bob");
        assert_eq!(arb.authority(), "Bob");
        assert!(!arb.is_authority("Alice"));
        assert!(arb.pass("Alice", None).is_err());
        assert!(arb.pass("Bob", None).is_ok());
    }

    #[test]
    fn test_subscribers_receive_events() {
        let clock = ManualClock::starting_at(0);
        let arb = test_arbitrator(&clock);
        let rx = arb.subscribe();

        arb.start("Alice").unwrap();
        arb.submit("Alice", &Submission::new("Bob", "git")).unwrap();
        arb.end("Alice").unwrap();

        let events: Vec<SessionEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], SessionEvent::TurnStarted { .. }));
        assert!(matches!(events[1], SessionEvent::SubmissionJudged { .. }));
        assert!(matches!(events[2], SessionEvent::TurnStarted { .. }));
        assert!(matches!(events[3], SessionEvent::SessionEnded { .. }));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let clock = ManualClock::starting_at(0);
        let arb = test_arbitrator(&clock);
        drop(arb.subscribe());
        let live = arb.subscribe();
        arb.start("Alice").unwrap();
        assert_eq!(arb.lock().subscribers.len(), 1);
        assert_eq!(live.try_iter().count(), 1);
    }

    #[test]
    fn test_log_receives_records() {
        let clock = ManualClock::starting_at(5_000);
        let log = MemoryLog::new();
        let arb = test_arbitrator(&clock).with_log(Box::new(log.clone()));
        arb.start("Alice").unwrap();

        clock.advance(900);
        arb.submit("Alice", &Submission::new("Bob", "git")).unwrap();
        arb.submit("Alice", &Submission::new("Carol", "gut")).unwrap();

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            SubmissionRecord {
                session_id: "room-1".to_string(),
                sequence_number: 1,
                player: "Bob".to_string(),
                text: "git".to_string(),
                is_valid: true,
                points: 18,
                combo_after: 1,
                submitted_at: 5_900,
            }
        );
        assert!(!records[1].is_valid);
        assert_eq!(records[1].sequence_number, 2);
        assert_eq!(records[1].combo_after, 0);
    }

    struct FailingLog;

    impl SubmissionLog for FailingLog {
        fn append(&mut self, _record: &SubmissionRecord) -> Result<(), StorageError> {
            Err(StorageError::NoDataDirectory)
        }
    }

    #[test]
    fn test_log_failure_does_not_fail_submission() {
        let clock = ManualClock::starting_at(0);
        let arb = test_arbitrator(&clock).with_log(Box::new(FailingLog));
        arb.start("Alice").unwrap();
        let outcome = arb.submit("Alice", &Submission::new("Bob", "git")).unwrap();
        assert_eq!(outcome.score.total_score, 18);
    }

    #[test]
    fn test_concurrent_submissions_serialize() {
        let clock = ManualClock::starting_at(0);
        let arb = test_arbitrator(&clock);
        arb.start("Alice").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let arb = arb.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        arb.submit("Alice", &Submission::new(format!("p{}", i), "git"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = arb.snapshot();
        assert_eq!(snapshot.state.combo.combo, 80);
        assert_eq!(snapshot.state.combo.max_combo, 80);
        // 18 * (1 + 2 + ... + 80)
        assert_eq!(snapshot.state.score.total_score, 18 * 80 * 81 / 2);
        assert_eq!(snapshot.state.turn.unwrap().sequence_number, 81);
    }

    #[test]
    fn test_end_then_submit_is_closed() {
        let clock = ManualClock::starting_at(0);
        let arb = test_arbitrator(&clock);
        arb.start("Alice").unwrap();
        assert!(arb.end("Alice").unwrap());
        assert!(!arb.end("Alice").unwrap());
        let err = arb.submit("Alice", &Submission::new("Bob", "git")).unwrap_err();
        assert!(matches!(err, GameError::InvalidSubmissionState { .. }));
    }

    #[test]
    fn test_snapshot_serializes_flat() {
        let clock = ManualClock::starting_at(0);
        let arb = test_arbitrator(&clock);
        arb.start("Alice").unwrap();
        let json = serde_json::to_value(arb.snapshot()).unwrap();
        assert_eq!(json["session_id"], "room-1");
        assert_eq!(json["authority"], "Alice");
        assert_eq!(json["phase"], "awaiting_submission");
        assert_eq!(json["turn"]["sequence_number"], 1);
        assert_eq!(json["turn"]["challenge"]["kind"], "typing");
    }
}
