use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::coords::Coordinates;

static SPACED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(-?[0-9]+\.?[0-9]*),\s*(-?[0-9]+\.?[0-9]*),\s*(-?[0-9]+\.?[0-9]*)_")
        .expect("invalid spaced coordinate pattern")
});

static SANITIZED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(-?[0-9]+\.?[0-9]*),_?(-?[0-9]+\.?[0-9]*),_?(-?[0-9]+\.?[0-9]*)_")
        .expect("invalid sanitized coordinate pattern")
});

static DASH_SEPARATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(-?[0-9]+\.?[0-9]*)-_(-?[0-9]+\.?[0-9]*)-_(-?[0-9]+\.?[0-9]*)_")
        .expect("invalid dash-separated coordinate pattern")
});

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.\-]+").expect("invalid non-numeric pattern"));

static LEADING_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:[0-9]+\.?[0-9]*|\.[0-9]+)").expect("invalid leading float pattern")
});

/// The naming conventions screenshots have been stored under, in match order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateFormat {
    /// `_482.0, 2.6, -118.5_` as written by the game.
    Spaced,
    /// `_482.0,_2.6,_-118.5_` after storage sanitizing.
    Sanitized,
    /// `_482.0-_2.6-_-118.5_` from the older sanitizer.
    DashSeparated,
    /// Loose numbers anywhere in the name.
    FreeForm,
}

impl CoordinateFormat {
    /// Grammars that must match a whole delimited triple, tried before `FreeForm`.
    pub const STRUCTURED: [CoordinateFormat; 3] = [
        CoordinateFormat::Spaced,
        CoordinateFormat::Sanitized,
        CoordinateFormat::DashSeparated,
    ];

    /// Run this single grammar against `filename`.
    ///
    /// `FreeForm` returns whatever it extracted, without the non-zero check
    /// that [`parse_coordinates`] applies to it.
    pub fn extract(self, filename: &str) -> Option<Coordinates> {
        match self {
            CoordinateFormat::Spaced => match_triple(&SPACED, filename),
            CoordinateFormat::Sanitized => match_triple(&SANITIZED, filename),
            CoordinateFormat::DashSeparated => match_triple(&DASH_SEPARATED, filename),
            CoordinateFormat::FreeForm => {
                let scan = FreeFormScan::run(filename);
                let coords = scan.coordinates();
                (scan.found > 0 && coords.is_finite()).then_some(coords)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Reject free-form results whose x or z is zero.
    Strict,
    /// Accept any free-form result that found at least one number.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParsedCoordinates {
    pub coordinates: Coordinates,
    pub format: CoordinateFormat,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty filename")]
    Empty,

    #[error("no coordinates found in filename: {filename}")]
    NoCoordinates { filename: String },

    #[error("loose numbers in {filename} gave x={x}, z={z}; refusing a zero coordinate")]
    DegenerateFallback { filename: String, x: f64, z: f64 },
}

/// Extract the coordinate triple from a screenshot filename.
pub fn parse_coordinates(filename: &str) -> Result<ParsedCoordinates, ParseError> {
    parse_coordinates_with(filename, ParseMode::Strict)
}

pub fn parse_coordinates_with(
    filename: &str,
    mode: ParseMode,
) -> Result<ParsedCoordinates, ParseError> {
    if filename.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    for format in CoordinateFormat::STRUCTURED {
        if let Some(coordinates) = format.extract(filename) {
            return Ok(ParsedCoordinates {
                coordinates,
                format,
            });
        }
    }

    let scan = FreeFormScan::run(filename);
    let coordinates = scan.coordinates();
    if scan.found == 0 || !coordinates.is_finite() {
        return Err(ParseError::NoCoordinates {
            filename: filename.to_owned(),
        });
    }

    let plausible = coordinates.x != 0.0 && coordinates.z != 0.0;
    if plausible || mode == ParseMode::BestEffort {
        Ok(ParsedCoordinates {
            coordinates,
            format: CoordinateFormat::FreeForm,
        })
    } else {
        Err(ParseError::DegenerateFallback {
            filename: filename.to_owned(),
            x: coordinates.x,
            z: coordinates.z,
        })
    }
}

fn match_triple(pattern: &Regex, filename: &str) -> Option<Coordinates> {
    let caps = pattern.captures(filename)?;
    let value = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok());
    let coords = Coordinates::new(value(1)?, value(2)?, value(3)?);
    coords.is_finite().then_some(coords)
}

struct FreeFormScan {
    values: [f64; 3],
    /// How many of the first three tokens had a numeric prefix.
    found: usize,
}

impl FreeFormScan {
    fn run(filename: &str) -> Self {
        let cleaned = NON_NUMERIC.replace_all(filename, " ");
        let mut values = [0.0; 3];
        let mut found = 0;
        for (slot, token) in values.iter_mut().zip(cleaned.split_whitespace()) {
            if let Some(value) = leading_float(token) {
                *slot = value;
                found += 1;
            }
        }
        Self { values, found }
    }

    fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.values[0], self.values[1], self.values[2])
    }
}

/// Longest numeric prefix of `token`, so `2023-12-05` reads as 2023.
fn leading_float(token: &str) -> Option<f64> {
    let m = LEADING_FLOAT.find(token)?;
    m.as_str().parse().ok()
}
