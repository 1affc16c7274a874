//! Background loading of upcoming round images into the in-memory cache.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::game::GameSession;
use crate::source::ImageFetcher;
use crate::state::AppState;

/// Images fetched at once per session.
pub const PREFETCH_CONCURRENCY: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchJob {
    pub round_number: u32,
    pub filename: String,
}

impl PrefetchJob {
    pub fn for_session(session: &GameSession) -> Vec<PrefetchJob> {
        session
            .rounds
            .iter()
            .map(|r| PrefetchJob {
                round_number: r.round_number,
                filename: r.location.source_filename.clone(),
            })
            .collect()
    }
}

pub fn spawn_prefetch(
    state: AppState,
    fetcher: Arc<dyn ImageFetcher>,
    game_id: Uuid,
    generation: u64,
    map_name: String,
    jobs: Vec<PrefetchJob>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_prefetch(&state, fetcher.as_ref(), game_id, generation, &map_name, jobs).await;
    })
}

/// Fetch every job, caching results that still belong to the game's current
/// generation. Failures are logged and otherwise ignored.
pub async fn run_prefetch(
    state: &AppState,
    fetcher: &dyn ImageFetcher,
    game_id: Uuid,
    generation: u64,
    map_name: &str,
    jobs: Vec<PrefetchJob>,
) {
    let total = jobs.len();
    futures::stream::iter(jobs)
        .for_each_concurrent(PREFETCH_CONCURRENCY, |job| async move {
            let data = match fetcher.fetch_image(map_name, &job.filename).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(
                        "prefetch of round {} image {} failed: {e}",
                        job.round_number,
                        job.filename
                    );
                    return;
                }
            };

            let mut s = state.lock().await;
            let inner = &mut *s;
            let Some(game) = inner.games.get_mut(&game_id) else {
                return;
            };
            if game.mark_prefetched(generation, job.round_number).is_ok() {
                inner.cache_image(map_name, &job.filename, data);
            }
        })
        .await;

    tracing::debug!("game {game_id}: prefetch pass over {total} image(s) done");
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::config::Config;
    use crate::session;
    use crate::source::CollaboratorError;
    use crate::state::AppStateInner;

    struct FlakyFetcher;

    #[async_trait]
    impl ImageFetcher for FlakyFetcher {
        async fn fetch_image(
            &self,
            _map: &str,
            filename: &str,
        ) -> Result<Bytes, CollaboratorError> {
            if filename.contains("356.3") {
                return Err(CollaboratorError::Transient("connection reset".into()));
            }
            Ok(Bytes::from(filename.to_owned()))
        }
    }

    async fn state_with_game() -> (AppState, Uuid) {
        let config = Config::from_lookup(|name| match name {
            "EFTG_PREFETCH" => Some("false".into()),
            "EFTG_SEED" => Some("3".into()),
            _ => None,
        })
        .unwrap();
        let state = AppStateInner::from_config(config).into_shared();
        let view = session::create_game(&state, "customs", Some(7)).await.unwrap();
        (state, view.id)
    }

    async fn jobs_for(state: &AppState, id: Uuid) -> (u64, Vec<PrefetchJob>) {
        let s = state.lock().await;
        let game = &s.games[&id];
        (game.generation(), PrefetchJob::for_session(game.session().unwrap()))
    }

    #[tokio::test]
    async fn test_prefetch_caches_and_tolerates_failures() {
        let (state, id) = state_with_game().await;
        let (generation, jobs) = jobs_for(&state, id).await;
        assert_eq!(jobs.len(), 7);

        run_prefetch(&state, &FlakyFetcher, id, generation, "customs", jobs.clone()).await;

        let s = state.lock().await;
        let session = s.games[&id].session().unwrap();
        for (job, round) in jobs.iter().zip(&session.rounds) {
            let failed = job.filename.contains("356.3");
            assert_eq!(round.prefetched, !failed, "{}", job.filename);
            assert_eq!(s.cached_image("customs", &job.filename).is_some(), !failed);
        }
    }

    #[tokio::test]
    async fn test_stale_prefetch_is_dropped() {
        let (state, id) = state_with_game().await;
        let (generation, jobs) = jobs_for(&state, id).await;

        session::restart(&state, id).await.unwrap();
        run_prefetch(&state, &FlakyFetcher, id, generation, "customs", jobs).await;

        let s = state.lock().await;
        assert!(s.images.is_empty());
        let session = s.games[&id].session().unwrap();
        assert!(session.rounds.iter().all(|r| !r.prefetched));
    }
}
