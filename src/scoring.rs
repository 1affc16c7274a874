use serde::{Deserialize, Serialize};

use crate::coords::{Coordinates, MapBounds};

pub const MAX_SCORE: u32 = 5000;

pub const DEFAULT_DECAY_CONSTANT: f64 = 100.0;

/// How distance is turned into points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScoringMode {
    /// `MAX_SCORE * e^(-d / decay_constant)`, zero beyond `cutoff` if set.
    ExponentialDecay {
        decay_constant: f64,
        cutoff: Option<f64>,
    },
    /// Quadratic falloff that reaches zero at half the map diagonal.
    MapRelative { bounds: MapBounds },
}

impl Default for ScoringMode {
    fn default() -> Self {
        ScoringMode::ExponentialDecay {
            decay_constant: DEFAULT_DECAY_CONSTANT,
            cutoff: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreResult {
    pub score: u32,
    pub distance: f64,
}

impl ScoreResult {
    pub fn percentage(&self) -> f64 {
        f64::from(self.score) / f64::from(MAX_SCORE) * 100.0
    }

    pub fn rating(&self) -> Rating {
        Rating::from_percentage(self.percentage())
    }
}

pub fn score(guess: &Coordinates, actual: &Coordinates, mode: &ScoringMode) -> ScoreResult {
    let distance = guess.distance_to(actual);
    let max = f64::from(MAX_SCORE);

    let raw = match *mode {
        ScoringMode::ExponentialDecay {
            decay_constant,
            cutoff,
        } => {
            if cutoff.is_some_and(|limit| distance > limit) {
                0.0
            } else {
                max * (-distance / decay_constant).exp()
            }
        }
        ScoringMode::MapRelative { bounds } => {
            let reach = bounds.diagonal() * 0.5;
            let ratio = if reach > 0.0 {
                (distance / reach).min(1.0)
            } else if distance == 0.0 {
                0.0
            } else {
                1.0
            };
            max * (1.0 - ratio).powi(2)
        }
    };

    ScoreResult {
        score: clamp_score(raw),
        distance,
    }
}

fn clamp_score(raw: f64) -> u32 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, f64::from(MAX_SCORE)) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    Perfect,
    Excellent,
    Great,
    Good,
    Fair,
    Poor,
    Missed,
}

impl Rating {
    pub fn from_percentage(percentage: f64) -> Self {
        match percentage {
            p if p >= 98.0 => Rating::Perfect,
            p if p >= 90.0 => Rating::Excellent,
            p if p >= 75.0 => Rating::Great,
            p if p >= 50.0 => Rating::Good,
            p if p >= 25.0 => Rating::Fair,
            p if p >= 10.0 => Rating::Poor,
            _ => Rating::Missed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Perfect => "Perfect",
            Rating::Excellent => "Excellent",
            Rating::Great => "Great",
            Rating::Good => "Good",
            Rating::Fair => "Fair",
            Rating::Poor => "Poor",
            Rating::Missed => "Missed",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Human-readable distance, e.g. `"2.6 m"` or `"143 m"`.
pub fn format_distance(distance: Option<f64>) -> String {
    let Some(distance) = distance else {
        return "N/A".into();
    };
    let rounded = (distance * 10.0).round() / 10.0;
    if rounded < 10.0 {
        format!("{rounded:.1} m")
    } else {
        format!("{} m", rounded.round())
    }
}
