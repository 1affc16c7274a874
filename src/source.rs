//! Collaborators the game core talks to: where screenshots are listed, how a
//! filename becomes a fetchable reference, and where finished rounds go.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::coords::Coordinates;
use crate::location::{self, LocationRecord};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
}

#[async_trait]
pub trait FileLister: Send + Sync {
    /// List candidate screenshot files for a map. Errors may be retried by the
    /// caller; the core never retries.
    async fn list_filenames(&self, map_name: &str) -> Result<Vec<FileEntry>, CollaboratorError>;
}

pub trait ImageResolver: Send + Sync {
    fn resolve_image_ref(&self, map_name: &str, filename: &str) -> String;
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_image(&self, map_name: &str, filename: &str) -> Result<Bytes, CollaboratorError>;
}

/// One scored round, as handed to a [`RoundSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub session_id: Uuid,
    pub map_name: String,
    pub round_number: u32,
    pub guess: Coordinates,
    pub actual: Coordinates,
    pub distance: f64,
    pub score: u32,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait RoundSink: Send + Sync {
    async fn persist_round(&self, record: &RoundRecord) -> Result<(), CollaboratorError>;
}

/// Where a game's locations come from.
#[derive(Clone)]
pub enum LocationSource {
    /// Built-in demo locations, no I/O.
    Static(StaticLocations),
    /// A storage listing parsed on every load.
    Remote {
        lister: Arc<dyn FileLister>,
        resolver: Arc<dyn ImageResolver>,
    },
}

impl LocationSource {
    pub async fn load(&self, map_name: &str) -> Result<Vec<LocationRecord>, CollaboratorError> {
        match self {
            LocationSource::Static(locations) => Ok(locations.records(map_name)),
            LocationSource::Remote { lister, resolver } => {
                let entries = lister.list_filenames(map_name).await?;
                let records = location::build_records(
                    map_name,
                    entries.iter().map(|e| e.name.as_str()),
                    resolver.as_ref(),
                );
                tracing::info!(
                    "map {map_name}: {} file(s) listed, {} usable",
                    entries.len(),
                    records.len()
                );
                Ok(records)
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LocationSource::Static(_) => "static",
            LocationSource::Remote { .. } => "remote",
        }
    }
}

const DEMO_STAMP: &str = "20231205";

const DEMO_CUSTOMS: &[(f64, f64, f64)] = &[
    (482.0, 2.6, -118.5),
    (356.3, 1.8, -221.2),
    (289.7, 0.5, -178.3),
    (421.5, 3.2, -195.6),
    (326.9, 1.7, -142.8),
    (398.2, 2.1, -215.3),
    (275.6, 0.8, -201.9),
];

const DEMO_WOODS: &[(f64, f64, f64)] = &[
    (312.4, 0.9, -167.3),
    (245.1, 1.2, -134.7),
    (356.8, 0.5, -198.2),
    (287.5, 1.3, -142.1),
    (332.9, 0.7, -178.5),
];

const DEMO_FACTORY: &[(f64, f64, f64)] = &[
    (134.2, 2.5, -67.8),
    (156.5, 3.1, -85.2),
    (198.3, 2.8, -102.7),
    (212.4, 5.2, -121.5),
    (245.7, 4.8, -143.8),
];

/// Demo locations. Their filenames are generated in the dash-separated
/// convention and go through the same parser as real listings.
#[derive(Clone)]
pub struct StaticLocations {
    resolver: Arc<dyn ImageResolver>,
}

impl StaticLocations {
    pub fn new(resolver: Arc<dyn ImageResolver>) -> Self {
        Self { resolver }
    }

    pub fn records(&self, map_name: &str) -> Vec<LocationRecord> {
        let set = match map_name {
            "customs" => DEMO_CUSTOMS,
            "woods" => DEMO_WOODS,
            "factory" => DEMO_FACTORY,
            _ => &[],
        };
        let names: Vec<String> = set
            .iter()
            .map(|&(x, y, z)| location::format_filename(DEMO_STAMP, &Coordinates::new(x, y, z)))
            .collect();
        location::build_records(map_name, names.iter().map(String::as_str), self.resolver.as_ref())
    }
}

/// Screenshots laid out as `<root>/<map>/<file>` on local disk.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn map_dir(&self, map_name: &str) -> Result<PathBuf, CollaboratorError> {
        check_segment(map_name)?;
        Ok(self.root.join(map_name))
    }
}

#[async_trait]
impl FileLister for DirectoryStore {
    async fn list_filenames(&self, map_name: &str) -> Result<Vec<FileEntry>, CollaboratorError> {
        let dir = self.map_dir(map_name)?;
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CollaboratorError::NotFound(format!(
                    "map folder {}",
                    dir.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => tracing::warn!("skipping non-UTF-8 filename {raw:?}"),
            }
        }
        names.sort();

        Ok(names.into_iter().map(|name| FileEntry { name }).collect())
    }
}

impl ImageResolver for DirectoryStore {
    fn resolve_image_ref(&self, map_name: &str, filename: &str) -> String {
        format!(
            "/images/{}/{}",
            encode_path_segment(map_name),
            encode_path_segment(filename)
        )
    }
}

#[async_trait]
impl ImageFetcher for DirectoryStore {
    async fn fetch_image(
        &self,
        map_name: &str,
        filename: &str,
    ) -> Result<Bytes, CollaboratorError> {
        check_segment(filename)?;
        let path = self.map_dir(map_name)?.join(filename);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CollaboratorError::NotFound(format!("image {}", path.display())))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Public object-storage URLs:
/// `<base_url>/storage/v1/object/public/<bucket>/<map>/<file>`.
#[derive(Debug, Clone)]
pub struct PublicUrlResolver {
    base_url: String,
    bucket: String,
}

impl PublicUrlResolver {
    pub fn new(base_url: &str, bucket: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            bucket: bucket.to_owned(),
        }
    }
}

impl ImageResolver for PublicUrlResolver {
    fn resolve_image_ref(&self, map_name: &str, filename: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}/{}",
            self.base_url,
            self.bucket,
            encode_path_segment(map_name),
            encode_path_segment(filename)
        )
    }
}

/// Appends every persisted round as one JSON line.
#[derive(Debug, Clone)]
pub struct JsonlRoundSink {
    path: PathBuf,
}

impl JsonlRoundSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RoundSink for JsonlRoundSink {
    async fn persist_round(&self, record: &RoundRecord) -> Result<(), CollaboratorError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn check_segment(name: &str) -> Result<(), CollaboratorError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(CollaboratorError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
