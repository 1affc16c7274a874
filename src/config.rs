use std::path::PathBuf;

use thiserror::Error;

use crate::coords::MapBounds;
use crate::game::{MAX_ROUNDS, ShortfallPolicy};
use crate::scoring::{DEFAULT_DECAY_CONSTANT, ScoringMode};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Built-in demo locations.
    Static,
    /// Screenshots listed from `image_root`.
    Remote,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub source: SourceKind,
    pub image_root: Option<PathBuf>,
    /// When set, image refs point at public object storage instead of `/images`.
    pub public_url: Option<String>,
    pub bucket: String,
    pub scoring: ScoringMode,
    pub default_rounds: u32,
    pub shortfall: ShortfallPolicy,
    /// JSONL file receiving every scored round.
    pub round_log: Option<PathBuf>,
    pub seed: Option<u64>,
    pub prefetch: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("EFTG_LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8090".into());

        let source = match lookup("EFTG_SOURCE").as_deref() {
            None | Some("static") => SourceKind::Static,
            Some("remote") => SourceKind::Remote,
            Some(other) => return Err(invalid("EFTG_SOURCE", other, "expected static or remote")),
        };

        let image_root = lookup("EFTG_IMAGE_ROOT").map(PathBuf::from);
        if source == SourceKind::Remote && image_root.is_none() {
            return Err(ConfigError::MissingEnv("EFTG_IMAGE_ROOT".into()));
        }

        let public_url = lookup("EFTG_PUBLIC_URL").filter(|v| !v.trim().is_empty());
        let bucket = lookup("EFTG_BUCKET").unwrap_or_else(|| "tarkov-images".into());

        let scoring = match lookup("EFTG_SCORING").as_deref() {
            None | Some("exponential") => {
                let decay_constant = match lookup("EFTG_DECAY_CONSTANT") {
                    Some(v) => positive("EFTG_DECAY_CONSTANT", &v)?,
                    None => DEFAULT_DECAY_CONSTANT,
                };
                let cutoff = lookup("EFTG_DECAY_CUTOFF")
                    .map(|v| positive("EFTG_DECAY_CUTOFF", &v))
                    .transpose()?;
                ScoringMode::ExponentialDecay {
                    decay_constant,
                    cutoff,
                }
            }
            Some("map_relative") => {
                let bounds = match lookup("EFTG_MAP_BOUNDS") {
                    Some(v) => parse_bounds(&v)?,
                    None => MapBounds::default(),
                };
                ScoringMode::MapRelative { bounds }
            }
            Some(other) => {
                return Err(invalid(
                    "EFTG_SCORING",
                    other,
                    "expected exponential or map_relative",
                ));
            }
        };

        let default_rounds = match lookup("EFTG_DEFAULT_ROUNDS") {
            Some(v) => {
                let rounds: u32 = v
                    .trim()
                    .parse()
                    .map_err(|e| invalid("EFTG_DEFAULT_ROUNDS", &v, &format!("{e}")))?;
                if !(1..=MAX_ROUNDS).contains(&rounds) {
                    return Err(invalid(
                        "EFTG_DEFAULT_ROUNDS",
                        &v,
                        &format!("must be between 1 and {MAX_ROUNDS}"),
                    ));
                }
                rounds
            }
            None => 5,
        };

        let shortfall = match lookup("EFTG_SHORTFALL").as_deref() {
            None | Some("reduce") => ShortfallPolicy::Reduce,
            Some("fail") => ShortfallPolicy::Fail,
            Some(other) => return Err(invalid("EFTG_SHORTFALL", other, "expected reduce or fail")),
        };

        let round_log = lookup("EFTG_ROUND_LOG").map(PathBuf::from);

        let seed = lookup("EFTG_SEED")
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .map_err(|e| invalid("EFTG_SEED", &v, &format!("{e}")))
            })
            .transpose()?;

        let prefetch = match lookup("EFTG_PREFETCH") {
            Some(v) => parse_bool("EFTG_PREFETCH", &v)?,
            None => true,
        };

        Ok(Config {
            listen_addr,
            source,
            image_root,
            public_url,
            bucket,
            scoring,
            default_rounds,
            shortfall,
            round_log,
            seed,
            prefetch,
        })
    }
}

fn invalid(name: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name: name.into(),
        value: value.into(),
        reason: reason.into(),
    }
}

fn positive(name: &str, value: &str) -> Result<f64, ConfigError> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|e| invalid(name, value, &format!("{e}")))?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(invalid(name, value, "must be a positive number"));
    }
    Ok(parsed)
}

fn parse_bounds(value: &str) -> Result<MapBounds, ConfigError> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid("EFTG_MAP_BOUNDS", value, &format!("{s:?} is not a number")))
        })
        .collect::<Result<_, _>>()?;

    match parts[..] {
        [x1, z1, x2, z2] => Ok(MapBounds { x1, z1, x2, z2 }),
        _ => Err(invalid("EFTG_MAP_BOUNDS", value, "expected x1,z1,x2,z2")),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(invalid(name, value, "expected true or false")),
    }
}
