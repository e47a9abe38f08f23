use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::note::{self, format_timestamp};
use crate::error::ExportError;
use crate::resolve::ResolvedPhoto;

const EXPORT_DOCTYPE: &str = r#"en-export SYSTEM "http://xml.evernote.com/pub/evernote-export.dtd""#;

/// Attributes of the `<en-export>` root element.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportHeader {
    pub export_date: DateTime<Utc>,
    pub application: String,
    pub version: String,
}

impl ExportHeader {
    /// A header stamped with the current time.
    pub fn now(application: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            export_date: Utc::now(),
            application: application.into(),
            version: version.into(),
        }
    }
}

/// Streams an export document: header on [`begin`](Self::begin), one
/// note per [`append`](Self::append), footer on [`finish`](Self::finish).
///
/// Fragments are written exactly in the order they are appended.
pub struct ExportWriter<W: Write> {
    writer: Writer<W>,
    notes: usize,
}

impl<W: Write> ExportWriter<W> {
    pub fn begin(inner: W, header: &ExportHeader) -> Result<Self> {
        let mut writer = Writer::new(inner);
        let export_date = format_timestamp(&header.export_date);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.get_mut().write_all(b"\n")?;
        writer.write_event(Event::DocType(BytesText::from_escaped(EXPORT_DOCTYPE)))?;
        writer.get_mut().write_all(b"\n")?;
        let root = BytesStart::new("en-export").with_attributes([
            ("export-date", export_date.as_str()),
            ("application", header.application.as_str()),
            ("version", header.version.as_str()),
        ]);
        writer.write_event(Event::Start(root))?;
        writer.get_mut().write_all(b"\n")?;

        Ok(Self { writer, notes: 0 })
    }

    /// Append one encoded `<note>` fragment.
    pub fn append(&mut self, fragment: &[u8]) -> Result<()> {
        let out = self.writer.get_mut();
        out.write_all(fragment)?;
        out.write_all(b"\n")?;
        self.notes += 1;
        Ok(())
    }

    pub fn notes_written(&self) -> usize {
        self.notes
    }

    /// Close the root element and flush. Returns the inner writer and the
    /// number of notes written.
    pub fn finish(mut self) -> Result<(W, usize)> {
        self.writer.write_event(Event::End(BytesEnd::new("en-export")))?;
        self.writer.get_mut().write_all(b"\n")?;
        self.writer.get_mut().flush()?;
        Ok((self.writer.into_inner(), self.notes))
    }
}

/// An export being written to disk.
///
/// The file is created with create-new semantics, so an existing export is
/// never touched. Unless [`commit`](Self::commit) succeeds, the partial
/// file is removed when this value is dropped.
pub struct ExportFile {
    path: PathBuf,
    writer: Option<ExportWriter<BufWriter<File>>>,
}

impl ExportFile {
    pub fn create(path: &Path, header: &ExportHeader) -> Result<Self> {
        let file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ExportError::OutputExists(path.to_path_buf()).into());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create output file {}", path.display()));
            }
        };

        // From here on, Drop cleans up the file on failure.
        let mut export = Self { path: path.to_path_buf(), writer: None };
        let writer = ExportWriter::begin(BufWriter::new(file), header)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        export.writer = Some(writer);
        Ok(export)
    }

    pub fn append(&mut self, fragment: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().context("export already finished")?;
        writer
            .append(fragment)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Write the footer and flush to disk. Returns the note count.
    pub fn commit(mut self) -> Result<usize> {
        let writer = self.writer.take().context("export already finished")?;
        let (buffered, notes) = writer
            .finish()
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        let file = buffered
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", self.path.display()))?;

        // Keep the file.
        self.path = PathBuf::new();
        Ok(notes)
    }
}

impl Drop for ExportFile {
    fn drop(&mut self) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        // Close the handle before removing; Windows refuses otherwise.
        drop(self.writer.take());
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::warn!("Removed incomplete export {}", self.path.display()),
            Err(e) => log::error!("Failed to remove incomplete export {}: {e}", self.path.display()),
        }
    }
}

/// Write a complete export of `photos`, in the given order, to `output`.
///
/// Fails with [`ExportError::OutputExists`] before writing anything if
/// `output` already exists. Returns the number of notes written.
pub fn assemble(
    output: &Path,
    photos: Vec<(ResolvedPhoto, Vec<u8>)>,
    header: &ExportHeader,
) -> Result<usize> {
    if output.exists() {
        return Err(ExportError::OutputExists(output.to_path_buf()).into());
    }

    let mut export = ExportFile::create(output, header)?;
    for (photo, bytes) in photos {
        let fragment = note::encode(&photo, &bytes)
            .with_context(|| format!("Failed to encode {}", photo.path.display()))?;
        export.append(&fragment)?;
    }
    export.commit()
}
