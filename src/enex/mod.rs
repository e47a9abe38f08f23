//! Evernote export (`.enex`) writing.
//!
//! - [`encode`] turns one resolved photo and its bytes into a `<note>`
//!   fragment with the image attached as a base64 resource.
//! - [`ExportWriter`] wraps fragments in the `<en-export>` document.
//! - [`ExportFile`] and [`assemble`] put the document on disk without ever
//!   overwriting an existing file.
//!
//! All markup goes through `quick-xml`, so names and MIME types containing
//! `&`, `<` or `]]>` cannot break the document.

mod document;
mod note;

pub use document::{ExportFile, ExportHeader, ExportWriter, assemble};
pub use note::{ENEX_TIME_FORMAT, content_digest, encode, format_timestamp};
