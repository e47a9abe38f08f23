//! # photo-enex
//!
//! Turn folders of photos into a single Evernote export (`.enex`). Each file
//! becomes one note with the image attached as a base64 resource, dated by
//! its EXIF capture time (or the date in its file name, or its mtime) and
//! tagged with its GPS position when it has one.
//!
//! ## Quick Start
//!
//! The pipeline module handles the whole collect → resolve → encode → write
//! flow:
//!
//! ```rust,no_run
//! use photo_enex::config::Config;
//! use photo_enex::pipeline::{collect_inputs, export, ExportOptions};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     // Files are taken as given, directories walked recursively.
//!     let inputs = collect_inputs(&[PathBuf::from("./photos")], &config.scan)?;
//!
//!     let options = ExportOptions::from_config(&config, PathBuf::from("Photos.enex"));
//!     let summary = export(inputs, &options).await?;
//!     println!("{} file(s) exported", summary.notes.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The resolver, encoder and assembler can be used on their own:
//!
//! ```rust,no_run
//! use photo_enex::enex::{assemble, encode, ExportHeader};
//! use photo_enex::resolve::resolve;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let path = Path::new("IMG_0001.jpg");
//!     let bytes = std::fs::read(path)?;
//!
//!     // 1. Decide MIME type, creation time and position
//!     let photo = resolve(path, &bytes);
//!     println!("{} created {} ({})", photo.mime, photo.created, photo.created_from);
//!
//!     // 2. A single <note> fragment
//!     let fragment = encode(&photo, &bytes)?;
//!     println!("{} bytes of XML", fragment.len());
//!
//!     // 3. A whole document
//!     let header = ExportHeader::now("Evernote/Windows", "4.x");
//!     let count = assemble(Path::new("Photos.enex"), vec![(photo, bytes)], &header)?;
//!     println!("{count} note(s) written");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Timestamp Resolution
//!
//! | Priority | Source |
//! |----------|--------|
//! | 1 | EXIF `DateTimeOriginal` / `CreateDate` / `ModifyDate` |
//! | 2 | `YYYY-MM-DD HH.MM.SS` in the file name (local time) |
//! | 3 | File modification time |
//! | 4 | Unix epoch |
//!
//! ## Modules
//!
//! - [`config`] - Configuration types and loading/saving
//! - [`enex`] - Note encoding and export document writing
//! - [`error`] - Precondition failures
//! - [`exif`] - EXIF capture time and GPS reading
//! - [`pipeline`] - Input collection and the concurrent export pipeline
//! - [`resolve`] - MIME, timestamp and position resolution

pub mod config;
pub mod enex;
pub mod error;
pub mod exif;
pub mod pipeline;
pub mod resolve;

#[cfg(test)]
mod test_support;
