//! Application state for the single-player terminal host
//!
//! The local player is also the session authority, so every key press that
//! mutates the game goes straight to the arbitrator under the player's name.

use std::collections::VecDeque;
use std::sync::mpsc::Receiver;
use termrace::config::GameConfig;
use termrace::game::validation::MissReason;
use termrace::{
    GameError, PassReason, SessionArbitrator, SessionEvent, SessionPhase, SessionSnapshot,
    SessionSummary, Submission,
};

/// An entry in the activity feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEntry {
    Scored { word: String, points: u32, combo: u32 },
    Missed { text: String, reason: Option<MissReason> },
    Passed { timed_out: bool },
}

impl FeedEntry {
    pub fn line(&self) -> String {
        match self {
            FeedEntry::Scored { word, points, combo } => format!("{} +{} x{}", word, points, combo),
            FeedEntry::Missed { text, reason } => {
                format!("{} ({})", text, reason.map_or("miss", |r| r.label()))
            }
            FeedEntry::Passed { timed_out: true } => "-- time out --".to_string(),
            FeedEntry::Passed { timed_out: false } => "-- pass --".to_string(),
        }
    }
}

/// Main application state
pub struct App {
    /// Whether the application should quit
    pub should_quit: bool,
    /// Current user input
    pub input: String,
    /// Feedback message from last action
    pub feedback: String,
    /// Session time remaining in seconds
    pub time_remaining: u32,
    /// Recent activity, newest last
    pub feed: VecDeque<FeedEntry>,
    /// Set when the session halted and cannot continue
    pub fatal: Option<String>,
    arbitrator: SessionArbitrator,
    events: Receiver<SessionEvent>,
    player: String,
    typing_started_at: Option<u64>,
    last_pass_at: Option<u64>,
    pass_cooldown_ms: u64,
    turn_limit_ms: Option<u64>,
    feed_max: usize,
}

impl App {
    /// Wrap an arbitrator whose authority is `config.player_name`.
    pub fn new(arbitrator: SessionArbitrator, config: &GameConfig) -> Self {
        let events = arbitrator.subscribe();
        Self {
            should_quit: false,
            input: String::new(),
            feedback: String::new(),
            time_remaining: config.session_seconds,
            feed: VecDeque::new(),
            fatal: None,
            arbitrator,
            events,
            player: config.player_name.clone(),
            typing_started_at: None,
            last_pass_at: None,
            pass_cooldown_ms: config.pass_cooldown_ms,
            turn_limit_ms: config.turn_limit_ms(),
            feed_max: 10,
        }
    }

    /// Generate the first turn
    pub fn start(&mut self) {
        if let Err(e) = self.arbitrator.start(&self.player) {
            self.on_error(e);
        }
        self.pump_events();
    }

    /// Signal the application to quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Handle character input (locked when the session is over)
    pub fn on_char(&mut self, c: char) {
        if self.is_session_over() {
            return;
        }
        if self.typing_started_at.is_none() {
            self.typing_started_at = Some(self.arbitrator.now_ms());
        }
        self.input.push(c);
        self.feedback.clear();
    }

    /// Handle backspace (locked when the session is over)
    pub fn on_backspace(&mut self) {
        if self.is_session_over() {
            return;
        }
        self.input.pop();
        self.feedback.clear();
    }

    /// Submit the current input (Enter)
    pub fn on_submit(&mut self) {
        if self.is_session_over() || self.input.trim().is_empty() {
            return;
        }

        let submission = Submission {
            player: self.player.clone(),
            text: std::mem::take(&mut self.input),
            typing_started_at: self.typing_started_at,
        };

        match self.arbitrator.submit(&self.player, &submission) {
            Ok(outcome) => {
                self.feedback = if outcome.result.is_valid {
                    format!(
                        "OK +{} (combo x{})",
                        outcome.result.points_awarded, outcome.combo.combo
                    )
                } else {
                    outcome.feedback
                };
                if outcome.next_turn.is_some() {
                    self.typing_started_at = None;
                }
            }
            Err(e) => self.on_error(e),
        }
        self.pump_events();
    }

    /// Skip the current turn (Tab), subject to the pass cooldown
    pub fn on_pass(&mut self) {
        if self.is_session_over() {
            return;
        }

        let now = self.arbitrator.now_ms();
        if let Some(last) = self.last_pass_at {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.pass_cooldown_ms {
                let wait = (self.pass_cooldown_ms - elapsed).div_ceil(1000);
                self.feedback = format!("PASS COOLDOWN ({}s)", wait);
                return;
            }
        }

        match self.arbitrator.pass(&self.player, Some(&self.player)) {
            Ok(_) => {
                self.last_pass_at = Some(now);
                self.typing_started_at = None;
                self.input.clear();
                self.feedback = "PASSED".to_string();
            }
            Err(e) => self.on_error(e),
        }
        self.pump_events();
    }

    /// One-second tick: session countdown and per-turn timeout
    pub fn tick(&mut self) {
        if self.is_session_over() {
            return;
        }

        if self.time_remaining > 0 {
            self.time_remaining -= 1;
        }
        if self.time_remaining == 0 {
            self.end_session();
            return;
        }

        if let (Some(limit), Some(turn)) = (self.turn_limit_ms, self.snapshot().state.turn) {
            let now = self.arbitrator.now_ms();
            if now.saturating_sub(turn.started_at) >= limit {
                match self.arbitrator.expire_turn(&self.player, turn.sequence_number) {
                    Ok(Some(_)) => {
                        self.typing_started_at = None;
                        self.input.clear();
                        self.feedback = "TIME OUT".to_string();
                    }
                    Ok(None) => {}
                    Err(e) => self.on_error(e),
                }
                self.pump_events();
            }
        }
    }

    /// Close the session (timer hit zero or the player quit)
    pub fn end_session(&mut self) {
        match self.arbitrator.end(&self.player) {
            Ok(true) => self.feedback = "TIME'S UP!".to_string(),
            Ok(false) => {}
            Err(e) => self.on_error(e),
        }
        self.pump_events();
    }

    pub fn is_session_over(&self) -> bool {
        self.fatal.is_some()
            || matches!(
                self.snapshot().state.phase,
                SessionPhase::Ended | SessionPhase::Halted
            )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.arbitrator.snapshot()
    }

    pub fn summary(&self) -> SessionSummary {
        self.arbitrator.summary()
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    /// Move broadcast events into the activity feed
    fn pump_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            let entry = match event {
                SessionEvent::SubmissionJudged {
                    text,
                    result,
                    combo,
                    ..
                } => {
                    if result.is_valid {
                        FeedEntry::Scored {
                            word: text,
                            points: result.points_awarded,
                            combo: combo.combo,
                        }
                    } else {
                        FeedEntry::Missed {
                            text,
                            reason: result.miss,
                        }
                    }
                }
                SessionEvent::TurnPassed { reason, .. } => FeedEntry::Passed {
                    timed_out: reason == PassReason::TimedOut,
                },
                SessionEvent::TurnStarted { .. } | SessionEvent::SessionEnded { .. } => continue,
            };
            self.feed.push_back(entry);
            while self.feed.len() > self.feed_max {
                self.feed.pop_front();
            }
        }
    }

    fn on_error(&mut self, error: GameError) {
        tracing::warn!(error = %error, "action rejected");
        if error.is_fatal() {
            self.fatal = Some(error.to_string());
        } else if !matches!(error, GameError::MalformedInput) {
            self.feedback = error.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use termrace::{DictionaryEntry, GameSession, ManualClock, ScriptedRandom, TermDictionary};

    fn test_app(words: &[(&str, u32)], clock: &ManualClock) -> App {
        let dictionary = TermDictionary::from_entries(
            words
                .iter()
                .enumerate()
                .map(|(i, (w, t))| DictionaryEntry::new(i as i64 + 1, *w, *t))
                .collect(),
        );
        let session = GameSession::new(
            Arc::new(dictionary),
            Box::new(ScriptedRandom::new([0.0])),
            Arc::new(clock.clone()),
        );
        let config = GameConfig {
            player_name: "alice".to_string(),
            session_seconds: 5,
            turn_seconds: 2,
            pass_cooldown_ms: 3_000,
            ..GameConfig::default()
        };
        let mut app = App::new(SessionArbitrator::new("test", session, "alice"), &config);
        app.start();
        app
    }

    fn type_word(app: &mut App, word: &str) {
        for c in word.chars() {
            app.on_char(c);
        }
    }

    #[test]
    fn test_correct_submission_scores() {
        let clock = ManualClock::starting_at(0);
        let mut app = test_app(&[("git", 2)], &clock);

        type_word(&mut app, "git");
        app.on_submit();

        assert_eq!(app.feedback, "OK +18 (combo x1)");
        assert!(app.input.is_empty());
        assert_eq!(app.snapshot().state.score.total_score, 18);
        assert_eq!(
            app.feed.back(),
            Some(&FeedEntry::Scored {
                word: "git".to_string(),
                points: 18,
                combo: 1
            })
        );
    }

    #[test]
    fn test_typing_start_measured_from_first_key() {
        let clock = ManualClock::starting_at(0);
        let mut app = test_app(&[("git", 2)], &clock);

        // idle for 10s before typing; speed measured from the first key
        clock.advance(10_000);
        app.on_char('g');
        clock.advance(1_500);
        type_word(&mut app, "it");
        app.on_submit();
        assert_eq!(app.feedback, "OK +15 (combo x1)");
    }

    #[test]
    fn test_incorrect_submission_feedback() {
        let clock = ManualClock::starting_at(0);
        let mut app = test_app(&[("git", 2)], &clock);
        type_word(&mut app, "gti");
        app.on_submit();
        assert_eq!(app.feedback, "MISS (expected git)");
        assert_eq!(
            app.feed.back(),
            Some(&FeedEntry::Missed {
                text: "gti".to_string(),
                reason: Some(MissReason::WrongWord),
            })
        );
        assert_eq!(app.feed.back().unwrap().line(), "gti (Wrong Word)");
    }

    #[test]
    fn test_whitespace_input_ignored() {
        let clock = ManualClock::starting_at(0);
        let mut app = test_app(&[("git", 2)], &clock);
        type_word(&mut app, "  ");
        app.on_submit();
        assert!(app.feedback.is_empty());
        assert!(app.feed.is_empty());
    }

    #[test]
    fn test_pass_cooldown() {
        let clock = ManualClock::starting_at(0);
        let mut app = test_app(&[("git", 2)], &clock);

        app.on_pass();
        assert_eq!(app.feedback, "PASSED");
        assert_eq!(app.snapshot().state.turn.unwrap().sequence_number, 2);

        clock.advance(1_000);
        app.on_pass();
        assert_eq!(app.feedback, "PASS COOLDOWN (2s)");
        assert_eq!(app.snapshot().state.turn.unwrap().sequence_number, 2);

        clock.advance(2_000);
        app.on_pass();
        assert_eq!(app.feedback, "PASSED");
        assert_eq!(app.snapshot().state.turn.unwrap().sequence_number, 3);
    }

    #[test]
    fn test_turn_timeout_on_tick() {
        let clock = ManualClock::starting_at(0);
        let mut app = test_app(&[("git", 2)], &clock);

        clock.advance(1_000);
        app.tick();
        assert_eq!(app.snapshot().state.turn.unwrap().sequence_number, 1);

        clock.advance(1_000);
        app.tick();
        assert_eq!(app.feedback, "TIME OUT");
        assert_eq!(app.snapshot().state.turn.unwrap().sequence_number, 2);
        assert_eq!(app.feed.back(), Some(&FeedEntry::Passed { timed_out: true }));
        assert_eq!(app.summary().timeouts, 1);
    }

    #[test]
    fn test_session_ends_when_timer_hits_zero() {
        let clock = ManualClock::starting_at(0);
        let mut app = test_app(&[("git", 2)], &clock);
        for _ in 0..5 {
            app.tick();
        }
        assert!(app.is_session_over());
        assert_eq!(app.feedback, "TIME'S UP!");

        // input is locked afterwards
        app.on_char('g');
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_empty_dictionary_is_fatal() {
        let clock = ManualClock::starting_at(0);
        let app = test_app(&[], &clock);
        assert!(app.fatal.is_some());
        assert!(app.is_session_over());
    }
}
