use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{Config, SourceKind};
use crate::game::{Game, GamePhase};
use crate::source::{
    DirectoryStore, ImageFetcher, ImageResolver, JsonlRoundSink, LocationSource,
    PublicUrlResolver, RoundSink, StaticLocations,
};

/// Upper bound on cached screenshots kept in memory.
const IMAGE_CACHE_LIMIT: usize = 256;

/// Upper bound on games tracked at once.
const GAME_LIMIT: usize = 1024;

pub struct AppStateInner {
    pub config: Config,
    pub games: HashMap<Uuid, Game>,
    pub source: LocationSource,
    pub sink: Option<Arc<dyn RoundSink>>,
    pub fetcher: Option<Arc<dyn ImageFetcher>>,
    /// Prefetched image bytes keyed by `map/filename`.
    pub images: HashMap<String, Bytes>,
    pub rng: StdRng,
}

pub type AppState = Arc<Mutex<AppStateInner>>;

impl AppStateInner {
    /// Wire collaborators from configuration.
    pub fn from_config(config: Config) -> Self {
        let store = Arc::new(DirectoryStore::new(
            config.image_root.clone().unwrap_or_else(|| PathBuf::from(".")),
        ));

        let resolver: Arc<dyn ImageResolver> = match &config.public_url {
            Some(base) => Arc::new(PublicUrlResolver::new(base, &config.bucket)),
            None => store.clone(),
        };

        let source = match config.source {
            SourceKind::Static => LocationSource::Static(StaticLocations::new(resolver)),
            SourceKind::Remote => LocationSource::Remote {
                lister: store.clone(),
                resolver,
            },
        };

        let fetcher: Option<Arc<dyn ImageFetcher>> = match config.image_root {
            Some(_) => Some(store),
            None => None,
        };

        let sink: Option<Arc<dyn RoundSink>> = config
            .round_log
            .as_ref()
            .map(|path| Arc::new(JsonlRoundSink::new(path)) as Arc<dyn RoundSink>);

        let seed = config.seed.unwrap_or_else(rand::random);

        Self {
            config,
            games: HashMap::new(),
            source,
            sink,
            fetcher,
            images: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_source(mut self, source: LocationSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn RoundSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn into_shared(self) -> AppState {
        Arc::new(Mutex::new(self))
    }

    /// Track a new game, evicting one when full: completed games first, then
    /// the least recently active. Games mid-transition are never evicted.
    pub fn insert_game(&mut self, game: Game) {
        if self.games.len() >= GAME_LIMIT {
            let evict = self
                .games
                .values()
                .filter(|g| !g.is_processing())
                .min_by_key(|g| (g.phase() != GamePhase::Complete, g.last_active()))
                .map(Game::id);
            if let Some(evict) = evict {
                tracing::debug!("game {evict}: evicted to make room");
                self.games.remove(&evict);
            }
        }
        self.games.insert(game.id(), game);
    }

    pub fn cached_image(&self, map_name: &str, filename: &str) -> Option<Bytes> {
        self.images.get(&image_key(map_name, filename)).cloned()
    }

    pub fn cache_image(&mut self, map_name: &str, filename: &str, data: Bytes) {
        let key = image_key(map_name, filename);
        if self.images.len() >= IMAGE_CACHE_LIMIT && !self.images.contains_key(&key) {
            let evict = self.images.keys().next().cloned();
            if let Some(evict) = evict {
                self.images.remove(&evict);
            }
        }
        self.images.insert(key, data);
    }
}

fn image_key(map_name: &str, filename: &str) -> String {
    format!("{map_name}/{filename}")
}
