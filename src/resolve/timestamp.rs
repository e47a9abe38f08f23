use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::exif::{self, EmbeddedMetadata};

/// `YYYY-MM-DD HH.MM.SS`, the layout phone galleries and Dropbox camera
/// uploads use for file names.
const FILENAME_LAYOUT: &str = "%Y-%m-%d %H.%M.%S";
const FILENAME_PATTERN_LEN: usize = 19;

/// Where a resolved timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampOrigin {
    /// EXIF capture time.
    Embedded,
    /// Date and time spelled out in the file name.
    Filename,
    /// Filesystem last-modified time.
    Modified,
    /// Nothing else worked; the Unix epoch.
    Fallback,
}

impl fmt::Display for TimestampOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedded => "embedded",
            Self::Filename => "filename",
            Self::Modified => "modified",
            Self::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// Everything a timestamp source may look at for one file.
#[derive(Debug, Clone, Copy)]
pub struct Probe<'a> {
    pub path: &'a Path,
    pub embedded: Option<&'a EmbeddedMetadata>,
}

/// One stage of the timestamp resolution chain.
///
/// Implementations return `None` when they have nothing to offer; the
/// resolver then moves on to the next source. Sources are consulted in
/// order and only until one succeeds.
pub trait TimestampSource: Send + Sync {
    fn origin(&self) -> TimestampOrigin;
    fn timestamp(&self, probe: &Probe<'_>) -> Option<DateTime<Utc>>;
}

/// Capture time from the EXIF block.
#[derive(Debug, Default)]
pub struct EmbeddedCaptureTime;

impl TimestampSource for EmbeddedCaptureTime {
    fn origin(&self) -> TimestampOrigin {
        TimestampOrigin::Embedded
    }

    fn timestamp(&self, probe: &Probe<'_>) -> Option<DateTime<Utc>> {
        probe.embedded.and_then(|m| m.captured_at)
    }
}

/// `YYYY-MM-DD HH.MM.SS` anywhere in the file name, read as local time.
#[derive(Debug, Default)]
pub struct FilenamePattern;

impl TimestampSource for FilenamePattern {
    fn origin(&self) -> TimestampOrigin {
        TimestampOrigin::Filename
    }

    fn timestamp(&self, probe: &Probe<'_>) -> Option<DateTime<Utc>> {
        let name = probe.path.file_name()?.to_str()?;
        timestamp_in_file_name(name).and_then(exif::local_to_utc)
    }
}

/// Filesystem last-modified time.
#[derive(Debug, Default)]
pub struct ModifiedTime;

impl TimestampSource for ModifiedTime {
    fn origin(&self) -> TimestampOrigin {
        TimestampOrigin::Modified
    }

    fn timestamp(&self, probe: &Probe<'_>) -> Option<DateTime<Utc>> {
        match std::fs::metadata(probe.path).and_then(|m| m.modified()) {
            Ok(mtime) => Some(DateTime::<Utc>::from(mtime)),
            Err(e) => {
                log::debug!("No modification time for {}: {e}", probe.path.display());
                None
            }
        }
    }
}

/// The standard chain: EXIF, then file name, then mtime.
pub fn default_chain() -> Vec<Box<dyn TimestampSource>> {
    vec![
        Box::new(EmbeddedCaptureTime),
        Box::new(FilenamePattern),
        Box::new(ModifiedTime),
    ]
}

/// Find the first `YYYY-MM-DD HH.MM.SS` window in a file name that is also
/// a real calendar date and time.
pub(crate) fn timestamp_in_file_name(name: &str) -> Option<NaiveDateTime> {
    if name.len() < FILENAME_PATTERN_LEN {
        return None;
    }

    (0..=name.len() - FILENAME_PATTERN_LEN)
        .filter(|&i| name.is_char_boundary(i) && name.is_char_boundary(i + FILENAME_PATTERN_LEN))
        .map(|i| &name[i..i + FILENAME_PATTERN_LEN])
        .filter(|window| has_pattern_shape(window.as_bytes()))
        .find_map(|window| NaiveDateTime::parse_from_str(window, FILENAME_LAYOUT).ok())
}

/// chrono tolerates short fields; insist on the exact fixed-width layout.
fn has_pattern_shape(window: &[u8]) -> bool {
    window.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b' ',
        13 | 16 => *b == b'.',
        _ => b.is_ascii_digit(),
    })
}
