pub mod api;
pub mod config;
pub mod coords;
pub mod error;
pub mod game;
pub mod location;
pub mod parser;
pub mod prefetch;
pub mod sampling;
pub mod scoring;
pub mod session;
pub mod source;
pub mod state;
