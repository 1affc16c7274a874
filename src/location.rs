use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::coords::Coordinates;
use crate::parser;
use crate::source::ImageResolver;

/// Marker some storage backends drop into otherwise empty folders.
pub const PLACEHOLDER_FILENAME: &str = ".emptyFolderPlaceholder";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MapOption {
    pub id: &'static str,
    pub name: &'static str,
}

impl MapOption {
    const fn new(id: &'static str, name: &'static str) -> Self {
        Self { id, name }
    }
}

pub const KNOWN_MAPS: &[MapOption] = &[
    MapOption::new("customs", "Customs"),
    MapOption::new("woods", "Woods"),
    MapOption::new("factory", "Factory"),
    MapOption::new("interchange", "Interchange"),
    MapOption::new("reserve", "Reserve"),
    MapOption::new("shoreline", "Shoreline"),
    MapOption::new("lighthouse", "Lighthouse"),
    MapOption::new("labs", "The Lab"),
    MapOption::new("streets", "Streets of Tarkov"),
    MapOption::new("ground-zero", "Ground Zero"),
];

/// Stable identifier of a screenshot: the same map and filename always yield
/// the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(String);

impl LocationId {
    pub fn derive(map_name: &str, filename: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(map_name.as_bytes());
        hasher.update(b"/");
        hasher.update(filename.as_bytes());
        let digest = hasher.finalize();
        LocationId(hex::encode(&digest[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRecord {
    pub id: LocationId,
    pub map_name: String,
    pub coordinates: Coordinates,
    pub image_ref: String,
    pub source_filename: String,
}

impl LocationRecord {
    pub fn is_placeholder(&self) -> bool {
        self.source_filename == PLACEHOLDER_FILENAME
            || self.image_ref.contains(PLACEHOLDER_FILENAME)
    }
}

/// Turn a folder listing into playable records.
///
/// Files whose names carry no usable coordinates are logged and left out;
/// they never reach the game with a made-up position.
pub fn build_records<'a, I>(
    map_name: &str,
    filenames: I,
    resolver: &dyn ImageResolver,
) -> Vec<LocationRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for filename in filenames {
        if filename == PLACEHOLDER_FILENAME {
            tracing::debug!(map = map_name, "skipping placeholder file");
            continue;
        }
        if !seen.insert(filename) {
            continue;
        }

        let parsed = match parser::parse_coordinates(filename) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(map = map_name, filename, "dropping file: {e}");
                continue;
            }
        };

        records.push(LocationRecord {
            id: LocationId::derive(map_name, filename),
            map_name: map_name.to_owned(),
            coordinates: parsed.coordinates,
            image_ref: resolver.resolve_image_ref(map_name, filename),
            source_filename: filename.to_owned(),
        });
    }

    records
}

/// Render coordinates into the dash-separated naming convention.
pub fn format_filename(stamp: &str, coords: &Coordinates) -> String {
    format!(
        "{stamp}_{:.1}-_{:.1}-_{:.1}_0.0-_0.0-_0.0-_1.0_12.29_P0P.png",
        coords.x, coords.y, coords.z
    )
}

/// Rewrite a raw game screenshot name into one that object storage accepts,
/// keeping the coordinate block readable and appending `unique_suffix` before
/// the extension.
pub fn sanitize_for_storage(filename: &str, unique_suffix: i64) -> String {
    let parts: Vec<&str> = filename.split('_').collect();
    let last = parts.len() - 1;

    let processed: Vec<String> = parts
        .iter()
        .enumerate()
        .map(|(index, part)| match index {
            0 => part.replace('[', "TS-").replace(']', "-TS"),
            1 | 2 => collapse_whitespace(&strip_space_after_commas(part)),
            i if i == last => collapse_whitespace(&part.replace(['(', ')'], "P")),
            _ => (*part).to_owned(),
        })
        .collect();

    let joined = processed.join("_");
    match joined.rsplit_once('.') {
        Some((stem, extension)) => format!("{stem}-{unique_suffix}.{extension}"),
        None => format!("{joined}-{unique_suffix}"),
    }
}

fn strip_space_after_commas(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    let mut after_comma = false;
    for c in part.chars() {
        if after_comma && c.is_whitespace() {
            continue;
        }
        after_comma = c == ',';
        out.push(c);
    }
    out
}

fn collapse_whitespace(part: &str) -> String {
    part.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{CoordinateFormat, parse_coordinates};
    use crate::source::PublicUrlResolver;

    fn resolver() -> PublicUrlResolver {
        PublicUrlResolver::new("https://storage.example", "tarkov-images")
    }

    #[test]
    fn test_location_id_is_stable() {
        let a = LocationId::derive("customs", "shot_1.0, 2.0, 3.0_.png");
        let b = LocationId::derive("customs", "shot_1.0, 2.0, 3.0_.png");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_location_id_depends_on_map() {
        let a = LocationId::derive("customs", "shot.png");
        let b = LocationId::derive("woods", "shot.png");
        assert_ne!(a, b);
    }

    #[test]
    fn test_build_records_drops_unparseable_and_placeholders() {
        let names = [
            "2023-12-05[22-28]_482.0, 2.6, -118.5_0.0, 0.4, 0.0, 0.9_12.29 (0).png",
            PLACEHOLDER_FILENAME,
            "thumbnail.png",
            "IMG_0001.png",
            "2023-12-05TS-22-32-TS_676.0,_8.5,_126.1_0.0,_-0.9,_0.1,_0.5_12.78_P0P-1.png",
        ];
        let records = build_records("customs", names, &resolver());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].coordinates, Coordinates::new(482.0, 2.6, -118.5));
        assert_eq!(records[1].coordinates, Coordinates::new(676.0, 8.5, 126.1));
        assert!(records.iter().all(|r| r.map_name == "customs"));
        assert_eq!(
            records[0].image_ref,
            "https://storage.example/storage/v1/object/public/tarkov-images/customs/\
             2023-12-05%5B22-28%5D_482.0%2C%202.6%2C%20-118.5_\
             0.0%2C%200.4%2C%200.0%2C%200.9_12.29%20%280%29.png"
        );
    }

    #[test]
    fn test_build_records_skips_duplicate_listing_entries() {
        let name = "shot_10.0, 0.0, 20.0_.png";
        let records = build_records("woods", [name, name], &resolver());
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_formatted_filename_parses_back() {
        let coords = Coordinates::new(356.3, 1.8, -221.2);
        let name = format_filename("20231205", &coords);
        let parsed = parse_coordinates(&name).unwrap();
        assert_eq!(parsed.format, CoordinateFormat::DashSeparated);
        assert_eq!(parsed.coordinates, coords);
    }

    #[test]
    fn test_sanitize_keeps_coordinates() {
        let captured = "2023-12-05[22-32]_676.0, 8.5, 126.1_0.0, -0.9, 0.1, 0.5_12.78 (0).png";
        let sanitized = sanitize_for_storage(captured, 1742338560595);
        assert_eq!(
            sanitized,
            "2023-12-05TS-22-32-TS_676.0,8.5,126.1_0.0,-0.9,0.1,0.5_12.78_P0P-1742338560595.png"
        );
        assert!(!sanitized.contains(' '));
        assert_eq!(
            parse_coordinates(&sanitized).unwrap().coordinates,
            parse_coordinates(captured).unwrap().coordinates
        );
        assert_eq!(
            CoordinateFormat::Sanitized.extract(&sanitized),
            Some(Coordinates::new(676.0, 8.5, 126.1))
        );
    }

    #[test]
    fn test_sanitize_without_extension() {
        assert_eq!(sanitize_for_storage("name", 7), "name-7");
    }

    #[test]
    fn test_placeholder_detection() {
        let record = LocationRecord {
            id: LocationId::derive("customs", PLACEHOLDER_FILENAME),
            map_name: "customs".into(),
            coordinates: Coordinates::new(1.0, 0.0, 1.0),
            image_ref: format!("/images/customs/{PLACEHOLDER_FILENAME}"),
            source_filename: "other".into(),
        };
        assert!(record.is_placeholder());
    }
}
