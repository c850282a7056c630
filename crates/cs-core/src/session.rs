//! Game session management.
//!
//! `GameSession` owns everything that outlives a single round: the roster,
//! the loaded decks, the active mode policy, the scoreboard and the round
//! history. Front ends drive it with one call per player action and read
//! snapshots back after every transition.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attribute::{Attribute, AttributeSet};
use crate::config::SessionConfig;
use crate::countdown::{Countdown, CountdownTick};
use crate::deck::{DeckSource, Decks};
use crate::describe::{DescribeResult, DescribeRound};
use crate::error::{SenseError, SenseResult};
use crate::evaluate::{GroupEvaluation, PairEvaluation, evaluate_group, evaluate_pair};
use crate::history::{HistoryEntry, RoundHistory, describe_summary};
use crate::mode::{GameMode, ModePolicy, TurnStructure};
use crate::prompt::Prompt;
use crate::round::{LockChange, Participant, ParticipantId, Round, RoundStatus, Submission};
use crate::scoring::Scoreboard;

/// Whether decks are available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataState {
    /// Nothing loaded yet.
    NotLoaded,
    /// Decks loaded; rounds can start.
    Ready,
    /// The last load failed.
    Unavailable(String),
}

/// The evaluated outcome of a resolved round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundResult {
    /// A two-player attribute comparison.
    Pair {
        /// Round number.
        round: u32,
        /// Evaluator output.
        evaluation: PairEvaluation,
    },
    /// A describe-mode guess.
    Describe {
        /// Round number.
        round: u32,
        /// The guess and its outcome.
        result: DescribeResult,
    },
    /// A group consensus round.
    Group {
        /// Round number.
        round: u32,
        /// Evaluator output.
        evaluation: GroupEvaluation,
    },
}

impl RoundResult {
    /// The round this result belongs to.
    pub fn round(&self) -> u32 {
        match self {
            Self::Pair { round, .. }
            | Self::Describe { round, .. }
            | Self::Group { round, .. } => *round,
        }
    }
}

/// What a lock call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockReport {
    /// Whether the participant is now locked or unlocked.
    pub change: LockChange,
    /// Set when this lock completed the round.
    pub resolution: Option<RoundResult>,
}

/// What one second of countdown did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Countdown state after the tick.
    pub tick: CountdownTick,
    /// Participants locked because the deadline passed.
    pub forced: Vec<ParticipantId>,
    /// Set when the deadline resolved the round.
    pub resolution: Option<RoundResult>,
}

impl TickReport {
    fn inactive() -> Self {
        Self {
            tick: CountdownTick::Inactive,
            forced: Vec::new(),
            resolution: None,
        }
    }
}

/// A running game.
#[derive(Clone)]
pub struct GameSession {
    config: SessionConfig,
    policy: ModePolicy,
    participants: Vec<Participant>,
    decks: Option<Decks>,
    objects: Vec<String>,
    data: DataState,
    round: Option<Round>,
    describe: Option<DescribeRound>,
    countdown: Option<Countdown>,
    scoreboard: Scoreboard,
    history: RoundHistory,
    last_result: Option<RoundResult>,
    round_index: u32,
    completed: u32,
    rng: StdRng,
}

impl GameSession {
    /// Create a session with one participant per configured name.
    ///
    /// Names must be non-empty and unique; they double as participant ids.
    pub fn new(config: SessionConfig) -> SenseResult<Self> {
        let mut participants: Vec<Participant> = Vec::with_capacity(config.players.len());
        for name in &config.players {
            let participant = Participant::named(name.trim());
            validate_newcomer(&participants, &participant)?;
            participants.push(participant);
        }
        let scoreboard = Scoreboard::new(participants.iter().map(|p| p.id.clone()));

        Ok(Self {
            policy: config.policy(config.mode),
            participants,
            decks: None,
            objects: Vec::new(),
            data: DataState::NotLoaded,
            round: None,
            describe: None,
            countdown: None,
            scoreboard,
            history: RoundHistory::with_cap(config.history_cap),
            last_result: None,
            round_index: 0,
            completed: 0,
            rng: StdRng::seed_from_u64(config.seed),
            config,
        })
    }

    /// Load decks from a source.
    ///
    /// On failure the session keeps no decks, reports
    /// [`DataState::Unavailable`] and returns the error.
    pub fn load_decks(&mut self, source: &dyn DeckSource) -> SenseResult<()> {
        match source.load() {
            Ok(decks) => {
                self.install_decks(decks);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "deck load failed");
                self.decks = None;
                self.objects.clear();
                self.data = DataState::Unavailable(e.to_string());
                Err(e)
            }
        }
    }

    /// Use already-built decks.
    pub fn install_decks(&mut self, decks: Decks) {
        self.objects = decks.distinct_objects();
        info!(
            categories = decks.categories.len(),
            modifiers = decks.modifiers.len(),
            objects = decks.objects.len(),
            "decks loaded"
        );
        self.decks = Some(decks);
        self.data = DataState::Ready;
    }

    /// Deck availability.
    pub fn data_state(&self) -> &DataState {
        &self.data
    }

    /// The loaded decks.
    pub fn decks(&self) -> Option<&Decks> {
        self.decks.as_ref()
    }

    /// The configuration the session was built from.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The active mode.
    pub fn mode(&self) -> GameMode {
        self.policy.mode
    }

    /// The active mode policy.
    pub fn policy(&self) -> &ModePolicy {
        &self.policy
    }

    /// Participants in turn order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Display name for an id.
    pub fn participant_name(&self, id: &ParticipantId) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.id == *id)
            .map(|p| p.name.as_str())
    }

    /// The current or most recent round.
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// The current describe-mode round.
    pub fn describe(&self) -> Option<&DescribeRound> {
        self.describe.as_ref()
    }

    /// Seconds left in a timed round, while the countdown is armed.
    pub fn remaining_secs(&self) -> Option<u32> {
        self.countdown
            .as_ref()
            .filter(|c| c.is_active())
            .map(Countdown::remaining)
    }

    /// Scores and counters.
    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// The last resolved round's result.
    pub fn last_result(&self) -> Option<&RoundResult> {
        self.last_result.as_ref()
    }

    /// Recent rounds.
    pub fn history(&self) -> &RoundHistory {
        &self.history
    }

    /// Number of the current or most recent round (0 before the first).
    pub fn round_index(&self) -> u32 {
        self.round_index
    }

    /// Rounds resolved under the current mode.
    pub fn rounds_completed(&self) -> u32 {
        self.completed
    }

    /// Whether the round limit has been reached.
    pub fn is_over(&self) -> bool {
        self.policy.round_limit.is_reached(self.completed)
    }

    /// Switch modes. Resets the round index, counters, scores and history,
    /// and discards any round in flight.
    pub fn set_mode(&mut self, mode: GameMode) {
        self.cancel_countdown();
        self.policy = self.config.policy(mode);
        self.round = None;
        self.describe = None;
        self.last_result = None;
        self.round_index = 0;
        self.completed = 0;
        self.scoreboard.reset();
        self.history.clear();
        info!(%mode, "mode selected");
    }

    /// Start a new round.
    ///
    /// An unresolved round is discarded and replaced under the same number.
    pub fn start_round(&mut self) -> SenseResult<&Round> {
        let Some(decks) = self.decks.as_ref() else {
            return Err(SenseError::DataNotLoaded);
        };
        if self.is_over() {
            return Err(SenseError::SessionOver);
        }
        if !self.policy.turns.accepts(self.participants.len()) {
            return Err(SenseError::InvalidRoster(format!(
                "{} mode cannot be played by {} participants",
                self.policy.mode,
                self.participants.len()
            )));
        }

        let replacing = self
            .round
            .as_ref()
            .is_some_and(|r| r.status() != RoundStatus::Resolved);
        let number = if replacing {
            self.round_index
        } else {
            self.round_index + 1
        };

        let (round, describe) = if self.policy.turns == TurnStructure::DescriberGuesser {
            // Odd rounds: the first participant describes.
            let (describer, guesser) = if number % 2 == 1 {
                (&self.participants[0], &self.participants[1])
            } else {
                (&self.participants[1], &self.participants[0])
            };
            let describe = DescribeRound::start(
                describer.id.clone(),
                guesser.id.clone(),
                &self.objects,
                &mut self.rng,
            )?;
            let round = Round::new(number, None, AttributeSet::all(), [describer.id.clone()]);
            (round, Some(describe))
        } else {
            let prompt = Prompt::draw(decks, &mut self.rng)?;
            let relevant = self.policy.relevance.derive(&prompt);
            let round = Round::new(
                number,
                Some(prompt),
                relevant,
                self.participants.iter().map(|p| p.id.clone()),
            );
            (round, None)
        };

        self.cancel_countdown();
        self.countdown = self.policy.time_limit.map(Countdown::new);
        self.round_index = number;
        self.describe = describe;
        let text = round.prompt().map(Prompt::text).unwrap_or_default();
        info!(
            round = number,
            mode = %self.policy.mode,
            prompt = %text,
            relevant = %round.relevant(),
            replaced = replacing,
            "round started"
        );
        Ok(&*self.round.insert(round))
    }

    /// Set one attribute for a participant.
    pub fn submit(
        &mut self,
        id: &ParticipantId,
        attribute: Attribute,
        value: &str,
    ) -> SenseResult<()> {
        self.ensure_describer_turn(id)?;
        self.round_mut()?.submit(id, attribute, value)
    }

    /// Replace a participant's whole submission.
    pub fn submit_all(&mut self, id: &ParticipantId, submission: Submission) -> SenseResult<()> {
        self.ensure_describer_turn(id)?;
        self.round_mut()?.replace_submission(id, submission)
    }

    /// Reset a participant's submission.
    pub fn clear(&mut self, id: &ParticipantId) -> SenseResult<()> {
        self.ensure_describer_turn(id)?;
        self.round_mut()?.clear_submission(id)
    }

    /// Toggle a participant's lock and resolve the round if it completes.
    pub fn lock(&mut self, id: &ParticipantId) -> SenseResult<LockReport> {
        self.ensure_describer_turn(id)?;
        let change = self.round_mut()?.toggle_lock(id)?;
        let resolution = self.after_lock()?;
        Ok(LockReport { change, resolution })
    }

    /// Lock a participant if not already locked. Never unlocks.
    pub fn lock_in(&mut self, id: &ParticipantId) -> SenseResult<Option<RoundResult>> {
        self.ensure_describer_turn(id)?;
        let round = self.round_mut()?;
        if round.is_locked(id)? {
            return Ok(None);
        }
        round.lock(id)?;
        self.after_lock()
    }

    /// Advance the countdown by one second.
    ///
    /// When the deadline passes, every unlocked participant is locked with
    /// whatever they have and the round is evaluated.
    pub fn tick(&mut self) -> SenseResult<TickReport> {
        let collecting = self.round.as_ref().is_some_and(Round::is_collecting);
        let Some(countdown) = self.countdown.as_mut().filter(|_| collecting) else {
            return Ok(TickReport::inactive());
        };
        let tick = countdown.tick();
        debug!(?tick, "countdown tick");
        if tick != CountdownTick::Expired {
            return Ok(TickReport {
                tick,
                forced: Vec::new(),
                resolution: None,
            });
        }

        let forced = self.round_mut()?.lock_all_unlocked();
        info!(round = self.round_index, forced = forced.len(), "time is up");
        let resolution = self.after_lock()?;
        Ok(TickReport {
            tick,
            forced,
            resolution,
        })
    }

    /// Evaluate the round if every expected participant is locked.
    ///
    /// Safe to call any number of times: only the first call after the
    /// round becomes fully locked evaluates and scores it.
    pub fn try_resolve(&mut self) -> SenseResult<Option<RoundResult>> {
        let Some(round) = self.round.as_ref() else {
            return Ok(None);
        };
        if round.status() != RoundStatus::AllLocked {
            return Ok(None);
        }

        let number = round.number();
        let submissions = round.submissions();
        let (result, entry) = match self.policy.turns {
            // Resolved by the guess.
            TurnStructure::DescriberGuesser => return Ok(None),
            TurnStructure::Symmetric => {
                let [(_, left), (_, right)] = submissions.as_slice() else {
                    return Err(SenseError::IncompleteParticipants {
                        expected: 2,
                        actual: submissions.len(),
                    });
                };
                let evaluation = evaluate_pair(round.relevant(), left, right);
                let entry = HistoryEntry {
                    round: number,
                    summary: round.prompt().map(Prompt::text).unwrap_or_default(),
                    matched: evaluation.outcome.is_match(),
                };
                (RoundResult::Pair { round: number, evaluation }, Some(entry))
            }
            TurnStructure::Open => {
                let evaluation =
                    evaluate_group(round.relevant(), &submissions, round.expected().len())?;
                (RoundResult::Group { round: number, evaluation }, None)
            }
        };

        match &result {
            RoundResult::Pair { evaluation, .. } => {
                let ids: Vec<ParticipantId> = round.expected().to_vec();
                self.scoreboard
                    .record_pair(evaluation.outcome, &ids, self.policy.tracks_streak);
                info!(round = number, outcome = ?evaluation.outcome, "round resolved");
            }
            RoundResult::Group { evaluation, .. } => {
                self.scoreboard.record_group(evaluation);
                info!(
                    round = number,
                    consensus = ?evaluation.consensus,
                    earned = evaluation.earned,
                    maximum = evaluation.maximum,
                    "round resolved"
                );
            }
            RoundResult::Describe { .. } => {}
        }
        if let Some(entry) = entry {
            self.history.record(entry);
        }
        self.round_mut()?.mark_resolved()?;
        self.finish_round(result.clone());
        Ok(Some(result))
    }

    /// Submit the guesser's choice in describe mode.
    pub fn guess(&mut self, choice: &str) -> SenseResult<RoundResult> {
        let describe = self.describe.as_mut().ok_or(SenseError::NoActiveRound)?;
        let result = describe.guess(choice)?;
        self.round_mut()?.mark_resolved()?;
        self.scoreboard
            .record_describe(result.correct, &result.describer, &result.guesser);
        let describer = self
            .participant_name(&result.describer)
            .unwrap_or(result.describer.as_str())
            .to_string();
        self.history.record(HistoryEntry {
            round: self.round_index,
            summary: describe_summary(&describer, &result.target),
            matched: result.correct,
        });
        info!(round = self.round_index, correct = result.correct, "guess made");
        let result = RoundResult::Describe {
            round: self.round_index,
            result,
        };
        self.finish_round(result.clone());
        Ok(result)
    }

    /// Clear the round so the next one can be started.
    ///
    /// Allowed before anyone locks or after resolution.
    pub fn reset_for_next_round(&mut self) -> SenseResult<()> {
        if let Some(round) = self.round.as_mut() {
            round.reset()?;
        }
        self.cancel_countdown();
        self.round = None;
        self.describe = None;
        Ok(())
    }

    /// Add a participant between rounds.
    pub fn join(&mut self, participant: Participant) -> SenseResult<()> {
        self.ensure_between_rounds("join")?;
        validate_newcomer(&self.participants, &participant)?;
        info!(participant = %participant.id, name = %participant.name, "participant joined");
        self.scoreboard.add_participant(participant.id.clone());
        self.participants.push(participant);
        Ok(())
    }

    /// Remove a participant between rounds.
    pub fn leave(&mut self, id: &ParticipantId) -> SenseResult<Participant> {
        self.ensure_between_rounds("leave")?;
        let index = self
            .participants
            .iter()
            .position(|p| p.id == *id)
            .ok_or_else(|| SenseError::UnknownParticipant(id.to_string()))?;
        self.scoreboard.remove_participant(id);
        info!(participant = %id, "participant left");
        Ok(self.participants.remove(index))
    }

    fn after_lock(&mut self) -> SenseResult<Option<RoundResult>> {
        let all_locked = self
            .round
            .as_ref()
            .is_some_and(|r| r.status() == RoundStatus::AllLocked);
        if !all_locked {
            return Ok(None);
        }
        if let Some(describe) = self.describe.as_mut() {
            describe.open_guessing(&self.objects, self.config.describe_distractors, &mut self.rng)?;
            debug!(choices = describe.choices().len(), "guessing opened");
            self.cancel_countdown();
            return Ok(None);
        }
        self.try_resolve()
    }

    fn finish_round(&mut self, result: RoundResult) {
        self.cancel_countdown();
        self.completed += 1;
        self.last_result = Some(result);
        if self.is_over() {
            info!(rounds = self.completed, "round limit reached");
        }
    }

    fn cancel_countdown(&mut self) {
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.cancel();
        }
    }

    fn round_mut(&mut self) -> SenseResult<&mut Round> {
        self.round.as_mut().ok_or(SenseError::NoActiveRound)
    }

    fn ensure_describer_turn(&self, id: &ParticipantId) -> SenseResult<()> {
        if !self.participants.iter().any(|p| p.id == *id) {
            return Err(SenseError::UnknownParticipant(id.to_string()));
        }
        match &self.describe {
            Some(describe) if describe.guesser() == id => {
                Err(SenseError::NotParticipantsTurn(id.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn ensure_between_rounds(&self, operation: &'static str) -> SenseResult<()> {
        match &self.round {
            Some(round) if round.status() != RoundStatus::Resolved => {
                Err(SenseError::InvalidRoundState {
                    operation,
                    status: round.status(),
                })
            }
            _ => Ok(()),
        }
    }
}

fn validate_newcomer(roster: &[Participant], newcomer: &Participant) -> SenseResult<()> {
    if newcomer.id.as_str().trim().is_empty() || newcomer.name.trim().is_empty() {
        return Err(SenseError::InvalidRoster("participant names must not be empty".into()));
    }
    if roster.iter().any(|p| p.id == newcomer.id) {
        return Err(SenseError::InvalidRoster(format!(
            "duplicate participant: {}",
            newcomer.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{Deck, DeckEntry, StaticDeckSource};
    use crate::evaluate::{Consensus, MatchOutcome};
    use crate::mode::RoundLimit;

    struct FailingSource;

    impl DeckSource for FailingSource {
        fn load(&self) -> SenseResult<Decks> {
            Err(SenseError::DeckLoad("file not found".into()))
        }
    }

    fn deck(texts: &[&str]) -> Deck {
        Deck::new(texts.iter().map(|t| DeckEntry::new(*t, 1)).collect())
    }

    /// Every prompt reads "something red and sweet JOY", so Color and Taste
    /// are the relevant attributes in local play.
    fn color_taste_decks() -> Decks {
        Decks {
            categories: deck(&["something red"]),
            modifiers: deck(&["and sweet"]),
            objects: deck(&["JOY"]),
        }
    }

    fn emotion_decks() -> Decks {
        Decks {
            categories: deck(&["a color for"]),
            modifiers: deck(&["pure"]),
            objects: deck(&["JOY", "FEAR", "ANGER", "SADNESS", "DISGUST", "ENVY", "ENNUI"]),
        }
    }

    fn session(config: SessionConfig, decks: Decks) -> GameSession {
        let mut session = GameSession::new(config).unwrap();
        session.load_decks(&StaticDeckSource(decks)).unwrap();
        session
    }

    fn p(name: &str) -> ParticipantId {
        ParticipantId::new(name)
    }

    fn play_pair(
        session: &mut GameSession,
        left: &[(Attribute, &str)],
        right: &[(Attribute, &str)],
    ) -> RoundResult {
        session.start_round().unwrap();
        for (attr, value) in left {
            session.submit(&p("Player 1"), *attr, value).unwrap();
        }
        for (attr, value) in right {
            session.submit(&p("Player 2"), *attr, value).unwrap();
        }
        assert!(session.lock(&p("Player 1")).unwrap().resolution.is_none());
        session.lock(&p("Player 2")).unwrap().resolution.unwrap()
    }

    fn outcome(result: &RoundResult) -> MatchOutcome {
        match result {
            RoundResult::Pair { evaluation, .. } => evaluation.outcome,
            other => panic!("expected a pair result, got {other:?}"),
        }
    }

    #[test]
    fn round_start_needs_decks() {
        let mut session = GameSession::new(SessionConfig::default()).unwrap();
        assert_eq!(session.data_state(), &DataState::NotLoaded);
        assert_eq!(session.start_round().unwrap_err(), SenseError::DataNotLoaded);

        assert!(session.load_decks(&FailingSource).is_err());
        assert!(matches!(
            session.data_state(),
            DataState::Unavailable(msg) if msg.contains("file not found")
        ));
        assert_eq!(session.start_round().unwrap_err(), SenseError::DataNotLoaded);
    }

    #[test]
    fn relevant_attributes_come_from_the_prompt() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        let round = session.start_round().unwrap();
        let relevant: Vec<Attribute> = round.relevant().iter().collect();
        assert_eq!(relevant, vec![Attribute::Color, Attribute::Taste]);
        assert_eq!(round.number(), 1);
    }

    #[test]
    fn matching_round_scores_both() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        let answers = [(Attribute::Color, "Red"), (Attribute::Taste, "Sweet")];
        let result = play_pair(&mut session, &answers, &answers);
        assert_eq!(outcome(&result), MatchOutcome::Match);
        assert_eq!(session.scoreboard().score(&p("Player 1")), 1);
        assert_eq!(session.scoreboard().score(&p("Player 2")), 1);
        assert_eq!(session.round().unwrap().status(), RoundStatus::Resolved);
        assert_eq!(session.history().latest().map(|e| e.matched), Some(true));
    }

    #[test]
    fn one_mismatch_fails_the_round() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        let result = play_pair(
            &mut session,
            &[(Attribute::Color, "Red"), (Attribute::Taste, "Sweet")],
            &[(Attribute::Color, "Red"), (Attribute::Taste, "Sour")],
        );
        assert_eq!(outcome(&result), MatchOutcome::NoMatch);
        assert_eq!(session.scoreboard().incorrect(), 1);
        assert_eq!(session.scoreboard().score(&p("Player 1")), 0);
    }

    #[test]
    fn all_unset_does_not_match() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        let result = play_pair(&mut session, &[], &[]);
        assert_eq!(outcome(&result), MatchOutcome::NoMatch);
    }

    #[test]
    fn locked_participant_cannot_submit() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        session.start_round().unwrap();
        session.lock(&p("Player 1")).unwrap();
        let err = session.submit(&p("Player 1"), Attribute::Color, "Red").unwrap_err();
        assert!(matches!(err, SenseError::InvalidRoundState { .. }));
        let submission = session.round().unwrap().submission(&p("Player 1")).unwrap();
        assert_eq!(submission.get(Attribute::Color), "");
    }

    #[test]
    fn invalid_value_rejected() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        session.start_round().unwrap();
        let err = session.submit(&p("Player 1"), Attribute::Color, "Plaid").unwrap_err();
        assert!(matches!(err, SenseError::InvalidValue { .. }));
    }

    #[test]
    fn unknown_participant_rejected() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        session.start_round().unwrap();
        assert!(matches!(
            session.lock(&p("Nobody")),
            Err(SenseError::UnknownParticipant(_))
        ));
    }

    #[test]
    fn unlock_before_partner_locks() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        session.start_round().unwrap();
        assert_eq!(session.lock(&p("Player 1")).unwrap().change, LockChange::Locked);
        assert_eq!(session.lock(&p("Player 1")).unwrap().change, LockChange::Unlocked);
        session.submit(&p("Player 1"), Attribute::Color, "Red").unwrap();
        assert_eq!(session.round().unwrap().status(), RoundStatus::Open);
    }

    #[test]
    fn try_resolve_is_idempotent() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        let answers = [(Attribute::Color, "Red"), (Attribute::Taste, "Sweet")];
        play_pair(&mut session, &answers, &answers);
        assert_eq!(session.try_resolve().unwrap(), None);
        assert_eq!(session.try_resolve().unwrap(), None);
        assert_eq!(session.scoreboard().correct(), 1);
        assert_eq!(session.rounds_completed(), 1);
    }

    #[test]
    fn reset_only_when_open_or_resolved() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        session.start_round().unwrap();
        session.lock(&p("Player 1")).unwrap();
        assert!(matches!(
            session.reset_for_next_round(),
            Err(SenseError::InvalidRoundState { operation: "reset", .. })
        ));
        session.lock(&p("Player 2")).unwrap();
        session.reset_for_next_round().unwrap();
        assert!(session.round().is_none());
        assert_eq!(session.start_round().unwrap().number(), 2);
    }

    #[test]
    fn redraw_replaces_unresolved_round() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        session.start_round().unwrap();
        session.submit(&p("Player 1"), Attribute::Color, "Red").unwrap();
        let round = session.start_round().unwrap();
        assert_eq!(round.number(), 1);
        assert!(round.submission(&p("Player 1")).unwrap().is_empty());
    }

    #[test]
    fn timed_deadline_forces_locks_and_resolves_once() {
        let config = SessionConfig::default().with_mode(GameMode::Timed).with_time_limit(3);
        let mut session = session(config, color_taste_decks());
        session.start_round().unwrap();
        assert_eq!(session.remaining_secs(), Some(3));
        session.submit(&p("Player 1"), Attribute::Color, "Red").unwrap();
        session.lock(&p("Player 1")).unwrap();

        assert_eq!(session.tick().unwrap().tick, CountdownTick::Running(2));
        assert_eq!(session.tick().unwrap().tick, CountdownTick::Running(1));
        let report = session.tick().unwrap();
        assert_eq!(report.tick, CountdownTick::Expired);
        assert_eq!(report.forced, vec![p("Player 2")]);
        assert_eq!(report.resolution.as_ref().map(outcome), Some(MatchOutcome::NoMatch));

        let after = session.tick().unwrap();
        assert_eq!(after, TickReport::inactive());
        assert_eq!(session.scoreboard().incorrect(), 1);
        assert_eq!(session.rounds_completed(), 1);
    }

    #[test]
    fn early_resolution_cancels_countdown() {
        let config = SessionConfig::default().with_mode(GameMode::Timed).with_time_limit(2);
        let mut session = session(config, color_taste_decks());
        let answers = [(Attribute::Color, "Red"), (Attribute::Taste, "Sweet")];
        play_pair(&mut session, &answers, &answers);
        assert_eq!(session.remaining_secs(), None);
        assert_eq!(session.tick().unwrap().tick, CountdownTick::Inactive);
        assert_eq!(session.scoreboard().correct(), 1);
    }

    #[test]
    fn streak_mode_counts_runs() {
        let config = SessionConfig::default().with_mode(GameMode::Streak);
        let mut session = session(config, color_taste_decks());
        let answers = [(Attribute::Color, "Red"), (Attribute::Taste, "Sweet")];
        for _ in 0..2 {
            play_pair(&mut session, &answers, &answers);
            session.reset_for_next_round().unwrap();
        }
        assert_eq!(session.scoreboard().streak(), 2);
        play_pair(&mut session, &answers, &[]);
        assert_eq!(session.scoreboard().streak(), 0);
        assert_eq!(session.scoreboard().best_streak(), 2);
    }

    #[test]
    fn mode_switch_resets_everything() {
        let config = SessionConfig::default().with_mode(GameMode::Timed);
        let mut session = session(config, color_taste_decks());
        let answers = [(Attribute::Color, "Red"), (Attribute::Taste, "Sweet")];
        play_pair(&mut session, &answers, &answers);
        session.reset_for_next_round().unwrap();
        session.start_round().unwrap();
        assert!(session.remaining_secs().is_some());

        session.set_mode(GameMode::Streak);
        assert_eq!(session.mode(), GameMode::Streak);
        assert_eq!(session.round_index(), 0);
        assert!(session.round().is_none());
        assert_eq!(session.remaining_secs(), None);
        assert!(session.history().is_empty());
        assert_eq!(session.scoreboard().correct(), 0);
        assert_eq!(session.scoreboard().score(&p("Player 1")), 0);
        assert!(session.last_result().is_none());
    }

    #[test]
    fn mode_switch_keeps_best_streak() {
        let config = SessionConfig::default().with_mode(GameMode::Streak);
        let mut session = session(config, color_taste_decks());
        let answers = [(Attribute::Color, "Red"), (Attribute::Taste, "Sweet")];
        play_pair(&mut session, &answers, &answers);
        assert_eq!(session.scoreboard().best_streak(), 1);

        session.set_mode(GameMode::Streak);
        assert_eq!(session.scoreboard().streak(), 0);
        assert_eq!(session.scoreboard().best_streak(), 1);
        session.set_mode(GameMode::Standard);
        assert_eq!(session.scoreboard().best_streak(), 1);
    }

    #[test]
    fn oversized_history_cap_from_json() {
        let config =
            SessionConfig::from_json(r#"{"history_cap": 18446744073709551615}"#).unwrap();
        let session = GameSession::new(config).unwrap();
        assert!(session.history().is_empty());
    }

    fn describe_session(target: &str) -> GameSession {
        let config = SessionConfig::default().with_mode(GameMode::Describe);
        let mut decks = emotion_decks();
        // A single-object pool pins the target.
        decks.objects = deck(&[target]);
        let mut session = session(config, decks);
        session.start_round().unwrap();
        // Widen the pool for the choices.
        session.objects = emotion_decks().distinct_objects();
        session
    }

    #[test]
    fn describe_correct_guess_scores_both() {
        let mut session = describe_session("JOY");
        assert_eq!(session.describe().unwrap().target(), "JOY");
        assert_eq!(session.describe().unwrap().describer(), &p("Player 1"));
        session.submit(&p("Player 1"), Attribute::Color, "Yellow").unwrap();
        session.lock(&p("Player 1")).unwrap();
        assert_eq!(session.describe().unwrap().choices().len(), 7);

        let result = session.guess("JOY").unwrap();
        assert!(matches!(&result, RoundResult::Describe { result, .. } if result.correct));
        assert_eq!(session.scoreboard().score(&p("Player 1")), 1);
        assert_eq!(session.scoreboard().score(&p("Player 2")), 1);
        assert_eq!(
            session.history().latest().map(|e| e.summary.as_str()),
            Some("Player 1 described \"JOY\"")
        );
    }

    #[test]
    fn describe_wrong_guess_reveals_target() {
        let mut session = describe_session("JOY");
        session.lock(&p("Player 1")).unwrap();
        let result = session.guess("FEAR").unwrap();
        let RoundResult::Describe { result, .. } = result else {
            panic!("expected a describe result");
        };
        assert!(!result.correct);
        assert_eq!(result.target, "JOY");
        assert_eq!(session.scoreboard().score(&p("Player 1")), 0);
        assert_eq!(session.scoreboard().score(&p("Player 2")), 0);
        assert_eq!(session.scoreboard().incorrect(), 1);
    }

    #[test]
    fn guesser_waits_for_describer() {
        let mut session = describe_session("JOY");
        assert!(matches!(
            session.submit(&p("Player 2"), Attribute::Color, "Red"),
            Err(SenseError::NotParticipantsTurn(_))
        ));
        assert!(matches!(session.lock(&p("Player 2")), Err(SenseError::NotParticipantsTurn(_))));
        assert!(matches!(session.guess("JOY"), Err(SenseError::InvalidRoundState { .. })));
    }

    #[test]
    fn describer_alternates_by_round() {
        let config = SessionConfig::default().with_mode(GameMode::Describe);
        let mut session = session(config, emotion_decks());
        session.start_round().unwrap();
        assert_eq!(session.describe().unwrap().describer(), &p("Player 1"));
        session.lock(&p("Player 1")).unwrap();
        let target = session.describe().unwrap().target().to_string();
        session.guess(&target).unwrap();
        session.reset_for_next_round().unwrap();
        session.start_round().unwrap();
        assert_eq!(session.describe().unwrap().describer(), &p("Player 2"));
        assert_eq!(session.describe().unwrap().guesser(), &p("Player 1"));
    }

    #[test]
    fn symmetric_modes_need_two_players() {
        let config = SessionConfig::default().with_players(["A", "B", "C"]);
        let mut session = session(config, color_taste_decks());
        assert!(matches!(session.start_round(), Err(SenseError::InvalidRoster(_))));
    }

    #[test]
    fn duplicate_names_rejected() {
        let config = SessionConfig::default().with_players(["A", "A"]);
        assert!(matches!(GameSession::new(config), Err(SenseError::InvalidRoster(_))));
    }

    #[test]
    fn group_round_awards_shared_values() {
        let config = SessionConfig::default()
            .with_mode(GameMode::Networked)
            .with_players(["P1", "P2", "P3"]);
        let mut session = session(config, color_taste_decks());
        let round = session.start_round().unwrap();
        // Group play only scans the category.
        let relevant: Vec<Attribute> = round.relevant().iter().collect();
        assert_eq!(relevant, vec![Attribute::Color]);

        for (id, color) in [("P1", "Red"), ("P2", "Red"), ("P3", "Blue")] {
            session.submit(&p(id), Attribute::Color, color).unwrap();
        }
        assert_eq!(session.lock_in(&p("P1")).unwrap(), None);
        assert_eq!(session.lock_in(&p("P1")).unwrap(), None);
        session.lock_in(&p("P2")).unwrap();
        let result = session.lock_in(&p("P3")).unwrap().unwrap();
        let RoundResult::Group { evaluation, .. } = result else {
            panic!("expected a group result");
        };
        assert_eq!(evaluation.consensus, Consensus::Partial);
        assert_eq!((evaluation.earned, evaluation.maximum), (2, 3));
        assert_eq!(session.scoreboard().score(&p("P1")), 1);
        assert_eq!(session.scoreboard().score(&p("P3")), 0);
    }

    #[test]
    fn join_and_leave_between_rounds() {
        let config = SessionConfig::default().with_mode(GameMode::Networked);
        let mut session = session(config, color_taste_decks());
        session.join(Participant::new("p3", "Cy")).unwrap();
        assert_eq!(session.participants().len(), 3);
        assert_eq!(session.participant_name(&p("p3")), Some("Cy"));

        session.start_round().unwrap();
        assert!(matches!(
            session.join(Participant::named("Late")),
            Err(SenseError::InvalidRoundState { operation: "join", .. })
        ));
        session.reset_for_next_round().unwrap();
        session.leave(&p("p3")).unwrap();
        assert_eq!(session.scoreboard().scores().len(), 2);
        assert!(matches!(session.leave(&p("p3")), Err(SenseError::UnknownParticipant(_))));
    }

    #[test]
    fn round_limit_ends_session() {
        let config = SessionConfig::default().with_round_limit(RoundLimit::Rounds(1));
        let mut session = session(config, color_taste_decks());
        play_pair(&mut session, &[], &[]);
        assert!(session.is_over());
        session.reset_for_next_round().unwrap();
        assert_eq!(session.start_round().unwrap_err(), SenseError::SessionOver);
    }

    #[test]
    fn actions_without_round() {
        let mut session = session(SessionConfig::default(), color_taste_decks());
        assert_eq!(
            session.submit(&p("Player 1"), Attribute::Color, "Red").unwrap_err(),
            SenseError::NoActiveRound
        );
        assert_eq!(session.try_resolve().unwrap(), None);
        assert_eq!(session.tick().unwrap(), TickReport::inactive());
        session.reset_for_next_round().unwrap();
    }
}
