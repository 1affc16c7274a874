//! Async game operations over shared state.
//!
//! The state lock is never held across a collaborator call: each operation
//! locks, applies a synchronous `Game` transition, releases, awaits, and then
//! relocks to apply the result.

use uuid::Uuid;

use crate::error::GameError;
use crate::game::{Game, GameView, GuessInput, RoundOutcome};
use crate::prefetch::{self, PrefetchJob};
use crate::sampling::sample_locations;
use crate::state::AppState;

/// Register a new game and start its first session. A game whose first load
/// fails is not kept.
pub async fn create_game(
    state: &AppState,
    map_name: &str,
    rounds: Option<u32>,
) -> Result<GameView, GameError> {
    let id = {
        let mut s = state.lock().await;
        let rounds = rounds.unwrap_or(s.config.default_rounds);
        let game = Game::new(map_name, rounds, s.config.scoring)?;
        let id = game.id();
        s.insert_game(game);
        id
    };

    tracing::info!("game {id} created for map {map_name}");
    match start_session(state, id).await {
        Ok(view) => Ok(view),
        Err(e) => {
            state.lock().await.games.remove(&id);
            Err(e)
        }
    }
}

/// Load locations and enter the first round of a fresh session.
pub async fn start_session(state: &AppState, id: Uuid) -> Result<GameView, GameError> {
    let (generation, map_name, source) = {
        let mut s = state.lock().await;
        let inner = &mut *s;
        let game = inner.games.get_mut(&id).ok_or(GameError::UnknownGame)?;
        let generation = game.begin_loading()?;
        (generation, game.map_name().to_owned(), inner.source.clone())
    };

    tracing::info!("game {id}: loading {map_name} from {} source", source.kind());
    let loaded = source.load(&map_name).await;

    let mut s = state.lock().await;
    let inner = &mut *s;
    let game = inner.games.get_mut(&id).ok_or(GameError::UnknownGame)?;

    let records = match loaded {
        Ok(records) => records,
        Err(e) => {
            if !game.fail_loading(generation) {
                tracing::debug!(
                    "game {id}: ignoring failed load of superseded generation {generation}"
                );
                return Err(GameError::StaleGeneration);
            }
            tracing::warn!("game {id}: loading {map_name} failed: {e}");
            return Err(e.into());
        }
    };

    if generation != game.generation() {
        tracing::debug!("game {id}: ignoring load of superseded generation {generation}");
        return Err(GameError::StaleGeneration);
    }

    let sampled = sample_locations(&records, game.round_count() as usize, &mut inner.rng);
    let session = game.finish_loading(generation, sampled, inner.config.shortfall)?;
    let jobs = PrefetchJob::for_session(session);
    let view = game.view();

    let fetcher = inner.fetcher.clone().filter(|_| inner.config.prefetch);
    drop(s);

    if let Some(fetcher) = fetcher {
        prefetch::spawn_prefetch(state.clone(), fetcher, id, generation, map_name, jobs);
    }

    Ok(view)
}

/// Score a guess and hand it to the round sink. Persistence failures are
/// logged; the outcome is returned either way.
pub async fn submit_guess(
    state: &AppState,
    id: Uuid,
    input: GuessInput,
) -> Result<RoundOutcome, GameError> {
    let (outcome, pending) = {
        let mut s = state.lock().await;
        let inner = &mut *s;
        let game = inner.games.get_mut(&id).ok_or(GameError::UnknownGame)?;
        let outcome = game.submit_guess(input)?;

        let pending = match (inner.sink.clone(), game.round_record(outcome.round_number)) {
            (Some(sink), Some(record)) => {
                game.begin_transition()?;
                Some((sink, record, TransitionGuard::new(state.clone(), id)))
            }
            _ => None,
        };
        (outcome, pending)
    };

    tracing::info!(
        "game {id}: round {} scored {} at {:.1} m",
        outcome.round_number,
        outcome.score,
        outcome.distance
    );

    if let Some((sink, record, guard)) = pending {
        if let Err(e) = sink.persist_round(&record).await {
            tracing::warn!(
                "game {id}: failed to persist round {}: {e}",
                record.round_number
            );
        }
        guard.release().await;
    }

    Ok(outcome)
}

/// Holds a game's processing flag across an await and clears it when
/// released or dropped, so a cancelled request never leaves the game busy.
struct TransitionGuard {
    state: Option<AppState>,
    id: Uuid,
}

impl TransitionGuard {
    fn new(state: AppState, id: Uuid) -> Self {
        Self {
            state: Some(state),
            id,
        }
    }

    /// Clear the flag. The guard stays armed until the lock is held.
    async fn release(mut self) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let mut s = state.lock().await;
        if let Some(game) = s.games.get_mut(&self.id) {
            game.end_transition();
        }
        drop(s);
        self.state = None;
    }
}

impl Drop for TransitionGuard {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        let id = self.id;
        tracing::debug!("game {id}: request dropped while processing, releasing");

        if let Ok(mut s) = state.try_lock() {
            if let Some(game) = s.games.get_mut(&id) {
                game.end_transition();
            }
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { end_transition(&state, id).await });
            }
            Err(_) => tracing::warn!("game {id}: no runtime to release processing flag"),
        }
    }
}

async fn end_transition(state: &AppState, id: Uuid) {
    let mut s = state.lock().await;
    if let Some(game) = s.games.get_mut(&id) {
        game.end_transition();
    }
}

pub async fn advance_round(state: &AppState, id: Uuid) -> Result<GameView, GameError> {
    let mut s = state.lock().await;
    let game = s.games.get_mut(&id).ok_or(GameError::UnknownGame)?;
    game.advance_round()?;
    Ok(game.view())
}

/// Discard the current session and start over on the same map.
pub async fn restart(state: &AppState, id: Uuid) -> Result<GameView, GameError> {
    tracing::info!("game {id}: restarting");
    start_session(state, id).await
}

pub async fn game_view(state: &AppState, id: Uuid) -> Result<GameView, GameError> {
    let s = state.lock().await;
    s.games
        .get(&id)
        .map(Game::view)
        .ok_or(GameError::UnknownGame)
}
