use thiserror::Error;

use crate::source::CollaboratorError;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("map {map}: {requested} round(s) requested but only {available} usable location(s)")]
    InsufficientLocations {
        map: String,
        requested: usize,
        available: usize,
    },

    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] InvalidTransition),

    #[error("another request for this game is still being processed")]
    Busy,

    #[error("result belongs to a superseded request")]
    StaleGeneration,

    #[error("round count must be between 1 and {max}, got {got}")]
    InvalidRoundCount { got: u32, max: u32 },

    #[error("unknown game")]
    UnknownGame,

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidTransition {
    #[error("round already guessed")]
    AlreadyGuessed,

    #[error("current round has not been guessed yet")]
    GuessPending,

    #[error("no round in progress")]
    NotInRound,

    #[error("locations are still loading")]
    Loading,

    #[error("session is complete")]
    SessionComplete,

    #[error("invalid guess: {0} must be a finite number")]
    InvalidGuess(&'static str),
}
