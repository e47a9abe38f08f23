//! EXIF metadata reading.
//!
//! [`read_embedded`] parses the EXIF block of an in-memory image and
//! returns the capture time and GPS position when present. Anything the
//! parser does not understand yields `None` rather than an error; the
//! resolver treats that as absent metadata.

mod reader;

pub use reader::{EmbeddedMetadata, read_embedded};
pub(crate) use reader::local_to_utc;
