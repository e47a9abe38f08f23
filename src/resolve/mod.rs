//! Metadata resolution: MIME type, creation time and position for a photo.
//!
//! Resolution never fails. Each field has its own fallback:
//!
//! | Field | Sources, in order |
//! |-------|-------------------|
//! | MIME type | extension table, then `application/octet-stream` |
//! | Created | EXIF capture time, `YYYY-MM-DD HH.MM.SS` in the file name, mtime, Unix epoch |
//! | Latitude / longitude | EXIF GPS, then `(0.0, 0.0)` |
//!
//! The timestamp chain is a list of [`TimestampSource`]s so extra sources
//! can be slotted in with [`Resolver::with_chain`].

mod mime;
mod timestamp;

pub use mime::{DEFAULT_MIME, mime_for_path};
pub use timestamp::{
    EmbeddedCaptureTime, FilenamePattern, ModifiedTime, Probe, TimestampOrigin, TimestampSource,
    default_chain,
};

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::exif;

/// A photo with all of its export metadata decided.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPhoto {
    pub path: PathBuf,
    pub mime: String,
    pub created: DateTime<Utc>,
    pub created_from: TimestampOrigin,
    pub latitude: f64,
    pub longitude: f64,
}

impl ResolvedPhoto {
    /// Whether a real position was found. `(0.0, 0.0)` counts as unknown.
    pub fn is_geotagged(&self) -> bool {
        self.latitude != 0.0 || self.longitude != 0.0
    }
}

/// Runs the resolution policy with a configurable timestamp chain.
pub struct Resolver {
    chain: Vec<Box<dyn TimestampSource>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::with_chain(default_chain())
    }
}

impl Resolver {
    pub fn with_chain(chain: Vec<Box<dyn TimestampSource>>) -> Self {
        Self { chain }
    }

    /// Resolve metadata for `path`, whose contents are `bytes`.
    pub fn resolve(&self, path: &Path, bytes: &[u8]) -> ResolvedPhoto {
        let embedded = exif::read_embedded(bytes);
        if embedded.is_none() {
            log::debug!("{}: no embedded metadata", path.display());
        }

        let probe = Probe { path, embedded: embedded.as_ref() };
        let (created, created_from) = self
            .chain
            .iter()
            .find_map(|source| source.timestamp(&probe).map(|t| (t, source.origin())))
            .unwrap_or_else(|| {
                log::warn!("{}: no usable timestamp, using the Unix epoch", path.display());
                (DateTime::<Utc>::from(UNIX_EPOCH), TimestampOrigin::Fallback)
            });

        let (latitude, longitude) = embedded.as_ref().and_then(|m| m.gps).unwrap_or((0.0, 0.0));

        log::debug!(
            "{}: created {created} ({created_from}), position ({latitude:.6}, {longitude:.6})",
            path.display()
        );

        ResolvedPhoto {
            path: path.to_path_buf(),
            mime: mime_for_path(path).to_string(),
            created,
            created_from,
            latitude,
            longitude,
        }
    }
}

/// Resolve with the default chain.
pub fn resolve(path: &Path, bytes: &[u8]) -> ResolvedPhoto {
    Resolver::default().resolve(path, bytes)
}
