use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::Coordinates;
use crate::error::{GameError, InvalidTransition};
use crate::location::LocationRecord;
use crate::scoring::{self, MAX_SCORE, Rating, ScoringMode};
use crate::source::RoundRecord;

pub const MAX_ROUNDS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GamePhase {
    NotStarted,
    Loading,
    InRound { round: u32 },
    AwaitingNext { round: u32 },
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Complete,
}

/// What to do when a map has fewer usable locations than rounds requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Play as many rounds as there are locations.
    #[default]
    Reduce,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundResult {
    pub round_number: u32,
    pub location: LocationRecord,
    pub guess: Option<Coordinates>,
    pub distance: Option<f64>,
    pub score: Option<u32>,
    pub guessed_at: Option<DateTime<Utc>>,
    /// Image for this round is already in the server cache.
    pub prefetched: bool,
}

impl RoundResult {
    fn new(round_number: u32, location: LocationRecord) -> Self {
        Self {
            round_number,
            location,
            guess: None,
            distance: None,
            score: None,
            guessed_at: None,
            prefetched: false,
        }
    }

    pub fn is_guessed(&self) -> bool {
        self.guess.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GameSession {
    pub session_id: Uuid,
    pub map_name: String,
    pub round_count: u32,
    pub rounds: Vec<RoundResult>,
    pub total_score: u32,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GameSession {
    pub fn max_total_score(&self) -> u32 {
        self.round_count * MAX_SCORE
    }

    pub fn round(&self, round_number: u32) -> Option<&RoundResult> {
        let index = usize::try_from(round_number.checked_sub(1)?).ok()?;
        self.rounds.get(index)
    }

    fn round_mut(&mut self, round_number: u32) -> Option<&mut RoundResult> {
        let index = usize::try_from(round_number.checked_sub(1)?).ok()?;
        self.rounds.get_mut(index)
    }
}

/// A guess as submitted. `y` is optional and defaults to ground level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct GuessInput {
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl GuessInput {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    fn validate(&self) -> Result<Coordinates, InvalidTransition> {
        let x = self
            .x
            .filter(|v| v.is_finite())
            .ok_or(InvalidTransition::InvalidGuess("x"))?;
        let z = self
            .z
            .filter(|v| v.is_finite())
            .ok_or(InvalidTransition::InvalidGuess("z"))?;
        let y = self.y.unwrap_or(0.0);
        if !y.is_finite() {
            return Err(InvalidTransition::InvalidGuess("y"));
        }
        Ok(Coordinates::new(x, y, z))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundOutcome {
    pub round_number: u32,
    pub guess: Coordinates,
    pub actual: Coordinates,
    pub distance: f64,
    pub score: u32,
    pub rating: Rating,
    pub total_score: u32,
    pub is_last_round: bool,
}

/// One playable game: a map, a round count and the current session, if any.
///
/// All methods are synchronous and either apply a transition completely or
/// leave the game untouched.
#[derive(Debug, Clone)]
pub struct Game {
    id: Uuid,
    map_name: String,
    round_count: u32,
    scoring: ScoringMode,
    phase: GamePhase,
    session: Option<GameSession>,
    generation: u64,
    processing: bool,
    last_active: DateTime<Utc>,
}

impl Game {
    pub fn new(map_name: &str, round_count: u32, scoring: ScoringMode) -> Result<Self, GameError> {
        if !(1..=MAX_ROUNDS).contains(&round_count) {
            return Err(GameError::InvalidRoundCount {
                got: round_count,
                max: MAX_ROUNDS,
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            map_name: map_name.to_owned(),
            round_count,
            scoring,
            phase: GamePhase::NotStarted,
            session: None,
            generation: 0,
            processing: false,
            last_active: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// When a transition last succeeded.
    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Enter `Loading` for a fresh session. Any previous session is dropped
    /// and results from earlier loads become stale.
    pub fn begin_loading(&mut self) -> Result<u64, GameError> {
        self.ensure_idle()?;
        self.generation += 1;
        self.session = None;
        self.phase = GamePhase::Loading;
        self.last_active = Utc::now();
        Ok(self.generation)
    }

    pub fn finish_loading(
        &mut self,
        generation: u64,
        mut sampled: Vec<LocationRecord>,
        policy: ShortfallPolicy,
    ) -> Result<&GameSession, GameError> {
        self.ensure_current(generation)?;
        if self.phase != GamePhase::Loading {
            return Err(GameError::StaleGeneration);
        }

        let requested = self.round_count as usize;
        let available = sampled.len();
        if available == 0 || (available < requested && policy == ShortfallPolicy::Fail) {
            self.phase = GamePhase::NotStarted;
            return Err(GameError::InsufficientLocations {
                map: self.map_name.clone(),
                requested,
                available,
            });
        }
        if available < requested {
            tracing::warn!(
                "map {}: only {available} location(s) for {requested} round(s), playing them all",
                self.map_name
            );
        }
        sampled.truncate(requested);

        let rounds: Vec<RoundResult> = sampled
            .into_iter()
            .zip(1..)
            .map(|(location, number)| RoundResult::new(number, location))
            .collect();

        let session = GameSession {
            session_id: Uuid::new_v4(),
            map_name: self.map_name.clone(),
            round_count: rounds.len() as u32,
            rounds,
            total_score: 0,
            status: SessionStatus::InProgress,
            created_at: Utc::now(),
            completed_at: None,
        };
        tracing::info!(
            "game {}: session {} started on {} with {} round(s)",
            self.id,
            session.session_id,
            self.map_name,
            session.round_count
        );

        self.phase = GamePhase::InRound { round: 1 };
        self.last_active = Utc::now();
        Ok(&*self.session.insert(session))
    }

    /// Abandon a load that could not complete. Returns whether it applied.
    pub fn fail_loading(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.phase != GamePhase::Loading {
            return false;
        }
        self.phase = GamePhase::NotStarted;
        true
    }

    pub fn submit_guess(&mut self, input: GuessInput) -> Result<RoundOutcome, GameError> {
        self.ensure_idle()?;
        let round = match self.phase {
            GamePhase::InRound { round } => round,
            GamePhase::AwaitingNext { .. } => return Err(InvalidTransition::AlreadyGuessed.into()),
            GamePhase::Loading => return Err(InvalidTransition::Loading.into()),
            GamePhase::NotStarted => return Err(InvalidTransition::NotInRound.into()),
            GamePhase::Complete => return Err(InvalidTransition::SessionComplete.into()),
        };
        let guess = input.validate()?;

        let session = self
            .session
            .as_mut()
            .ok_or(InvalidTransition::NotInRound)?;
        let round_count = session.round_count;
        let result = session
            .round_mut(round)
            .ok_or(InvalidTransition::NotInRound)?;
        if result.is_guessed() {
            return Err(InvalidTransition::AlreadyGuessed.into());
        }

        let actual = result.location.coordinates;
        let scored = scoring::score(&guess, &actual, &self.scoring);
        result.guess = Some(guess);
        result.distance = Some(scored.distance);
        result.score = Some(scored.score);
        result.guessed_at = Some(Utc::now());
        session.total_score += scored.score;

        self.phase = GamePhase::AwaitingNext { round };
        self.last_active = Utc::now();

        Ok(RoundOutcome {
            round_number: round,
            guess,
            actual,
            distance: scored.distance,
            score: scored.score,
            rating: scored.rating(),
            total_score: session.total_score,
            is_last_round: round == round_count,
        })
    }

    pub fn advance_round(&mut self) -> Result<GamePhase, GameError> {
        self.ensure_idle()?;
        let round = match self.phase {
            GamePhase::AwaitingNext { round } => round,
            GamePhase::InRound { .. } => return Err(InvalidTransition::GuessPending.into()),
            GamePhase::Loading => return Err(InvalidTransition::Loading.into()),
            GamePhase::NotStarted => return Err(InvalidTransition::NotInRound.into()),
            GamePhase::Complete => return Err(InvalidTransition::SessionComplete.into()),
        };
        let session = self
            .session
            .as_mut()
            .ok_or(InvalidTransition::NotInRound)?;

        self.phase = if round < session.round_count {
            GamePhase::InRound { round: round + 1 }
        } else {
            session.status = SessionStatus::Complete;
            session.completed_at = Some(Utc::now());
            tracing::info!(
                "game {}: session {} complete, total {}",
                self.id,
                session.session_id,
                session.total_score
            );
            GamePhase::Complete
        };
        self.last_active = Utc::now();
        Ok(self.phase)
    }

    /// Note that a round's image is cached. Ignored once superseded.
    pub fn mark_prefetched(&mut self, generation: u64, round_number: u32) -> Result<(), GameError> {
        self.ensure_current(generation)?;
        if let Some(round) = self
            .session
            .as_mut()
            .and_then(|s| s.round_mut(round_number))
        {
            round.prefetched = true;
        }
        Ok(())
    }

    /// Take the processing flag for work that spans an await.
    pub fn begin_transition(&mut self) -> Result<(), GameError> {
        self.ensure_idle()?;
        self.processing = true;
        Ok(())
    }

    pub fn end_transition(&mut self) {
        self.processing = false;
    }

    /// Persistence payload for a guessed round of the current session.
    pub fn round_record(&self, round_number: u32) -> Option<RoundRecord> {
        let session = self.session.as_ref()?;
        let round = session.round(round_number)?;
        Some(RoundRecord {
            session_id: session.session_id,
            map_name: session.map_name.clone(),
            round_number,
            guess: round.guess?,
            actual: round.location.coordinates,
            distance: round.distance?,
            score: round.score?,
            recorded_at: round.guessed_at?,
        })
    }

    pub fn view(&self) -> GameView {
        GameView {
            id: self.id,
            map_name: self.map_name.clone(),
            phase: self.phase,
            processing: self.processing,
            session: self.session.as_ref().map(SessionView::from_session),
        }
    }

    fn ensure_idle(&self) -> Result<(), GameError> {
        if self.processing {
            return Err(GameError::Busy);
        }
        Ok(())
    }

    fn ensure_current(&self, generation: u64) -> Result<(), GameError> {
        if generation != self.generation {
            tracing::debug!(
                "game {}: dropping result for generation {generation}, current is {}",
                self.id,
                self.generation
            );
            return Err(GameError::StaleGeneration);
        }
        Ok(())
    }
}

/// Client-facing snapshot of a game. Ground truth stays hidden until the
/// round has been guessed.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub id: Uuid,
    pub map_name: String,
    #[serde(flatten)]
    pub phase: GamePhase,
    pub processing: bool,
    pub session: Option<SessionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub round_count: u32,
    pub total_score: u32,
    pub max_total_score: u32,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rounds: Vec<RoundView>,
}

impl SessionView {
    fn from_session(session: &GameSession) -> Self {
        Self {
            session_id: session.session_id,
            round_count: session.round_count,
            total_score: session.total_score,
            max_total_score: session.max_total_score(),
            status: session.status,
            created_at: session.created_at,
            completed_at: session.completed_at,
            rounds: session.rounds.iter().map(RoundView::from_round).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundView {
    pub round_number: u32,
    pub image_ref: String,
    pub guess: Option<Coordinates>,
    pub actual: Option<Coordinates>,
    pub distance: Option<f64>,
    pub score: Option<u32>,
    pub rating: Option<Rating>,
}

impl RoundView {
    fn from_round(round: &RoundResult) -> Self {
        let actual = round.is_guessed().then_some(round.location.coordinates);
        Self {
            round_number: round.round_number,
            image_ref: round.location.image_ref.clone(),
            guess: round.guess,
            actual,
            distance: round.distance,
            score: round.score,
            rating: round
                .score
                .map(|s| Rating::from_percentage(f64::from(s) / f64::from(MAX_SCORE) * 100.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::source::{DirectoryStore, StaticLocations};

    fn customs() -> Vec<LocationRecord> {
        StaticLocations::new(Arc::new(DirectoryStore::new("/srv"))).records("customs")
    }

    fn started(rounds: u32) -> Game {
        let mut game = Game::new("customs", rounds, ScoringMode::default()).unwrap();
        let generation = game.begin_loading().unwrap();
        game.finish_loading(generation, customs(), ShortfallPolicy::Reduce)
            .unwrap();
        game
    }

    #[test]
    fn test_round_count_bounds() {
        assert!(matches!(
            Game::new("customs", 0, ScoringMode::default()),
            Err(GameError::InvalidRoundCount { got: 0, .. })
        ));
        assert!(matches!(
            Game::new("customs", 21, ScoringMode::default()),
            Err(GameError::InvalidRoundCount { got: 21, .. })
        ));
        assert!(Game::new("customs", 1, ScoringMode::default()).is_ok());
        assert!(Game::new("customs", 20, ScoringMode::default()).is_ok());
    }

    #[test]
    fn test_start_enters_first_round() {
        let game = started(5);
        assert_eq!(game.phase(), GamePhase::InRound { round: 1 });
        let session = game.session().unwrap();
        assert_eq!(session.round_count, 5);
        assert_eq!(session.rounds.len(), 5);
        assert_eq!(session.total_score, 0);
        assert_eq!(session.status, SessionStatus::InProgress);
    }

    #[test]
    fn test_customs_end_to_end() {
        let mut game = started(5);

        let outcome = game.submit_guess(GuessInput::new(482.0, 0.0, -118.5)).unwrap();
        assert_eq!(outcome.actual, Coordinates::new(482.0, 2.6, -118.5));
        assert!((outcome.distance - 2.6).abs() < 1e-9);
        assert_eq!(outcome.score, 4872);
        assert_eq!(outcome.total_score, 4872);
        assert_eq!(game.phase(), GamePhase::AwaitingNext { round: 1 });

        let mut expected_total = outcome.score;
        for round in 2..=5 {
            assert_eq!(game.advance_round().unwrap(), GamePhase::InRound { round });
            let outcome = game.submit_guess(GuessInput::new(300.0, 0.0, -200.0)).unwrap();
            expected_total += outcome.score;
            assert_eq!(outcome.is_last_round, round == 5);
        }
        assert_eq!(game.advance_round().unwrap(), GamePhase::Complete);

        let session = game.session().unwrap();
        assert_eq!(session.status, SessionStatus::Complete);
        assert!(session.completed_at.is_some());
        assert_eq!(session.total_score, expected_total);
        assert_eq!(
            session.total_score,
            session.rounds.iter().filter_map(|r| r.score).sum::<u32>()
        );
    }

    #[test]
    fn test_three_round_session_completes() {
        let records: Vec<LocationRecord> = customs().into_iter().take(3).collect();
        let mut game = Game::new("customs", 3, ScoringMode::default()).unwrap();
        let generation = game.begin_loading().unwrap();
        game.finish_loading(generation, records.clone(), ShortfallPolicy::Fail)
            .unwrap();

        let mut scores = Vec::new();
        for (record, round) in records.iter().zip(1..=3) {
            assert_eq!(game.phase(), GamePhase::InRound { round });
            let c = record.coordinates;
            let outcome = game.submit_guess(GuessInput::new(c.x + 30.0, 0.0, c.z)).unwrap();
            assert_eq!(outcome.actual, c);
            assert_eq!(outcome.is_last_round, round == 3);
            scores.push(outcome.score);

            let expected = if round == 3 {
                GamePhase::Complete
            } else {
                GamePhase::InRound { round: round + 1 }
            };
            assert_eq!(game.advance_round().unwrap(), expected);
        }

        let session = game.session().unwrap();
        assert_eq!(session.status, SessionStatus::Complete);
        assert_eq!(session.rounds.len(), 3);
        assert_eq!(session.total_score, scores.iter().sum::<u32>());
        assert!(matches!(
            game.advance_round(),
            Err(GameError::InvalidTransition(InvalidTransition::SessionComplete))
        ));
    }

    #[test]
    fn test_double_submit_is_rejected() {
        let mut game = started(3);
        let first = game.submit_guess(GuessInput::new(480.0, 0.0, -120.0)).unwrap();

        let err = game
            .submit_guess(GuessInput::new(0.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::InvalidTransition(InvalidTransition::AlreadyGuessed)
        ));

        let session = game.session().unwrap();
        assert_eq!(session.total_score, first.score);
        assert_eq!(session.rounds[0].score, Some(first.score));
        assert_eq!(session.rounds[0].guess, Some(Coordinates::new(480.0, 0.0, -120.0)));
    }

    #[test]
    fn test_advance_requires_guess() {
        let mut game = started(2);
        assert!(matches!(
            game.advance_round(),
            Err(GameError::InvalidTransition(InvalidTransition::GuessPending))
        ));
    }

    #[test]
    fn test_loading_rejects_input() {
        let mut game = Game::new("customs", 3, ScoringMode::default()).unwrap();
        game.begin_loading().unwrap();
        assert!(matches!(
            game.submit_guess(GuessInput::new(1.0, 0.0, 1.0)),
            Err(GameError::InvalidTransition(InvalidTransition::Loading))
        ));
        assert!(matches!(
            game.advance_round(),
            Err(GameError::InvalidTransition(InvalidTransition::Loading))
        ));
    }

    #[test]
    fn test_not_started_rejects_input() {
        let mut game = Game::new("customs", 3, ScoringMode::default()).unwrap();
        assert!(matches!(
            game.submit_guess(GuessInput::new(1.0, 0.0, 1.0)),
            Err(GameError::InvalidTransition(InvalidTransition::NotInRound))
        ));
    }

    #[test]
    fn test_invalid_guess_leaves_state_unchanged() {
        let mut game = started(2);
        let missing_x = GuessInput {
            x: None,
            y: None,
            z: Some(1.0),
        };
        assert!(matches!(
            game.submit_guess(missing_x),
            Err(GameError::InvalidTransition(InvalidTransition::InvalidGuess("x")))
        ));
        assert!(matches!(
            game.submit_guess(GuessInput::new(1.0, f64::NAN, 1.0)),
            Err(GameError::InvalidTransition(InvalidTransition::InvalidGuess("y")))
        ));
        assert!(matches!(
            game.submit_guess(GuessInput::new(1.0, 0.0, f64::INFINITY)),
            Err(GameError::InvalidTransition(InvalidTransition::InvalidGuess("z")))
        ));
        assert_eq!(game.phase(), GamePhase::InRound { round: 1 });
        assert!(!game.session().unwrap().rounds[0].is_guessed());
    }

    #[test]
    fn test_missing_y_defaults_to_ground() {
        let mut game = started(1);
        let outcome = game
            .submit_guess(GuessInput {
                x: Some(482.0),
                y: None,
                z: Some(-118.5),
            })
            .unwrap();
        assert_eq!(outcome.guess.y, 0.0);
    }

    #[test]
    fn test_restart_resets_session() {
        let mut game = started(2);
        let first_session = game.session().unwrap().session_id;
        game.submit_guess(GuessInput::new(482.0, 0.0, -118.5)).unwrap();

        let generation = game.begin_loading().unwrap();
        assert!(game.session().is_none());
        let session = game
            .finish_loading(generation, customs(), ShortfallPolicy::Reduce)
            .unwrap();
        assert_eq!(session.total_score, 0);
        assert_ne!(session.session_id, first_session);
        assert_eq!(game.phase(), GamePhase::InRound { round: 1 });
    }

    #[test]
    fn test_restart_from_complete() {
        let mut game = started(1);
        game.submit_guess(GuessInput::new(0.0, 0.0, 0.0)).unwrap();
        game.advance_round().unwrap();
        assert!(matches!(
            game.submit_guess(GuessInput::new(0.0, 0.0, 0.0)),
            Err(GameError::InvalidTransition(InvalidTransition::SessionComplete))
        ));
        assert!(game.begin_loading().is_ok());
    }

    #[test]
    fn test_stale_load_is_ignored() {
        let mut game = Game::new("customs", 2, ScoringMode::default()).unwrap();
        let old = game.begin_loading().unwrap();
        let current = game.begin_loading().unwrap();
        assert!(current > old);

        assert!(matches!(
            game.finish_loading(old, customs(), ShortfallPolicy::Reduce),
            Err(GameError::StaleGeneration)
        ));
        assert_eq!(game.phase(), GamePhase::Loading);
        assert!(!game.fail_loading(old));

        game.finish_loading(current, customs(), ShortfallPolicy::Reduce)
            .unwrap();
        assert!(matches!(
            game.mark_prefetched(old, 1),
            Err(GameError::StaleGeneration)
        ));
        assert!(!game.session().unwrap().rounds[0].prefetched);
        game.mark_prefetched(current, 1).unwrap();
        assert!(game.session().unwrap().rounds[0].prefetched);
    }

    #[test]
    fn test_fail_loading_returns_to_not_started() {
        let mut game = Game::new("customs", 2, ScoringMode::default()).unwrap();
        let generation = game.begin_loading().unwrap();
        assert!(game.fail_loading(generation));
        assert_eq!(game.phase(), GamePhase::NotStarted);
    }

    #[test]
    fn test_shortfall_policies() {
        let three: Vec<_> = customs().into_iter().take(3).collect();

        let mut reduce = Game::new("customs", 5, ScoringMode::default()).unwrap();
        let generation = reduce.begin_loading().unwrap();
        let session = reduce
            .finish_loading(generation, three.clone(), ShortfallPolicy::Reduce)
            .unwrap();
        assert_eq!(session.round_count, 3);

        let mut fail = Game::new("customs", 5, ScoringMode::default()).unwrap();
        let generation = fail.begin_loading().unwrap();
        let err = fail
            .finish_loading(generation, three, ShortfallPolicy::Fail)
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientLocations {
                requested: 5,
                available: 3,
                ..
            }
        ));
        assert!(err.to_string().contains("customs"));
        assert_eq!(fail.phase(), GamePhase::NotStarted);
    }

    #[test]
    fn test_no_locations_always_fails() {
        let mut game = Game::new("woods", 5, ScoringMode::default()).unwrap();
        let generation = game.begin_loading().unwrap();
        assert!(matches!(
            game.finish_loading(generation, Vec::new(), ShortfallPolicy::Reduce),
            Err(GameError::InsufficientLocations { available: 0, .. })
        ));
    }

    #[test]
    fn test_busy_drops_requests() {
        let mut game = started(2);
        game.begin_transition().unwrap();
        assert!(matches!(
            game.submit_guess(GuessInput::new(1.0, 0.0, 1.0)),
            Err(GameError::Busy)
        ));
        assert!(matches!(game.begin_loading(), Err(GameError::Busy)));
        assert!(matches!(game.begin_transition(), Err(GameError::Busy)));
        assert!(!game.session().unwrap().rounds[0].is_guessed());

        game.end_transition();
        assert!(game.submit_guess(GuessInput::new(1.0, 0.0, 1.0)).is_ok());
    }

    #[test]
    fn test_view_hides_unguessed_ground_truth() {
        let mut game = started(2);
        let view = game.view();
        let rounds = &view.session.as_ref().unwrap().rounds;
        assert!(rounds.iter().all(|r| r.actual.is_none()));

        game.submit_guess(GuessInput::new(482.0, 0.0, -118.5)).unwrap();
        let view = game.view();
        let rounds = &view.session.as_ref().unwrap().rounds;
        assert_eq!(rounds[0].actual, Some(Coordinates::new(482.0, 2.6, -118.5)));
        assert_eq!(rounds[0].rating, Some(Rating::Excellent));
        assert!(rounds[1].actual.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"], "awaiting_next");
        assert_eq!(json["round"], 1);
    }

    #[test]
    fn test_round_record_for_guessed_round() {
        let mut game = started(2);
        assert!(game.round_record(1).is_none());
        game.submit_guess(GuessInput::new(482.0, 0.0, -118.5)).unwrap();
        let record = game.round_record(1).unwrap();
        assert_eq!(record.session_id, game.session().unwrap().session_id);
        assert_eq!(record.score, 4872);
        assert_eq!(record.map_name, "customs");
        assert!(game.round_record(2).is_none());
    }
}
