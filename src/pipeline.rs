use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

use crate::config::{Config, ScanConfig};
use crate::enex::{self, ExportFile, ExportHeader};
use crate::error::ExportError;
use crate::resolve::{ResolvedPhoto, Resolver, TimestampOrigin};

/// Everything [`export`] needs besides the input list.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output: PathBuf,
    pub header: ExportHeader,
    /// Files read and encoded concurrently. Values below 1 are treated as 1.
    pub workers: usize,
}

impl ExportOptions {
    /// Options from config, stamped with the current time.
    pub fn from_config(config: &Config, output: PathBuf) -> Self {
        Self {
            output,
            header: ExportHeader::now(&config.export.application, &config.export.version),
            workers: config.worker_count(),
        }
    }
}

/// One photo, resolved and encoded, waiting to be written.
#[derive(Debug)]
pub struct EncodedNote {
    pub photo: ResolvedPhoto,
    pub size: usize,
    pub fragment: Vec<u8>,
}

/// What ended up in the export, one entry per note in document order.
#[derive(Debug, Serialize)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub notes: Vec<NoteSummary>,
}

#[derive(Debug, Serialize)]
pub struct NoteSummary {
    pub path: PathBuf,
    pub mime: String,
    pub created: String,
    pub created_from: TimestampOrigin,
    pub latitude: f64,
    pub longitude: f64,
    pub size: usize,
}

impl From<&EncodedNote> for NoteSummary {
    fn from(note: &EncodedNote) -> Self {
        Self {
            path: note.photo.path.clone(),
            mime: note.photo.mime.clone(),
            created: enex::format_timestamp(&note.photo.created),
            created_from: note.photo.created_from,
            latitude: note.photo.latitude,
            longitude: note.photo.longitude,
            size: note.size,
        }
    }
}

/// Collect input files from the given paths, in a stable order.
///
/// Files are taken as given; directories are walked recursively with
/// entries sorted by name. Files whose name starts with `.` are skipped.
/// A path that does not exist, or any error while walking, fails the whole
/// collection.
///
/// # Example
///
/// ```rust,no_run
/// use photo_enex::config::ScanConfig;
/// use photo_enex::pipeline::collect_inputs;
/// use std::path::PathBuf;
///
/// let inputs = collect_inputs(
///     &[PathBuf::from("IMG_0001.jpg"), PathBuf::from("./Camera Uploads/")],
///     &ScanConfig::default(),
/// ).unwrap();
/// println!("Found {} files", inputs.len());
/// ```
pub fn collect_inputs(paths: &[PathBuf], scan: &ScanConfig) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(ExportError::MissingPath(path.clone()).into());
        }

        for entry in WalkDir::new(path)
            .follow_links(scan.follow_links)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            if is_hidden(entry.path()) {
                log::debug!("Skipping hidden file: {}", entry.path().display());
                continue;
            }
            inputs.push(entry.into_path());
        }
    }

    Ok(inputs)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Fail with [`ExportError::OutputExists`] if `output` is already there.
pub fn ensure_output_free(output: &Path) -> Result<()> {
    if output.exists() {
        return Err(ExportError::OutputExists(output.to_path_buf()).into());
    }
    Ok(())
}

/// Read, resolve and encode a single file.
pub fn prepare_note(path: &Path, resolver: &Resolver) -> Result<EncodedNote> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let photo = resolver.resolve(path, &bytes);
    let fragment = enex::encode(&photo, &bytes)
        .with_context(|| format!("Failed to encode {}", path.display()))?;

    Ok(EncodedNote { photo, size: bytes.len(), fragment })
}

type Job<T> = Arc<dyn Fn(&Path) -> Result<T> + Send + Sync>;

/// Runs a job over each input on the blocking pool with at most `width`
/// inputs in flight, yielding results in input order. A new input is only
/// started when the oldest result is taken. In-flight tasks are aborted on
/// drop.
struct Window<T> {
    queue: std::vec::IntoIter<PathBuf>,
    in_flight: VecDeque<JoinHandle<Result<T>>>,
    job: Job<T>,
}

impl<T: Send + 'static> Window<T> {
    fn new(inputs: Vec<PathBuf>, width: usize, job: Job<T>) -> Self {
        let mut window = Self {
            queue: inputs.into_iter(),
            in_flight: VecDeque::with_capacity(width.max(1)),
            job,
        };
        for _ in 0..width.max(1) {
            window.spawn_next();
        }
        window
    }

    fn spawn_next(&mut self) {
        if let Some(path) = self.queue.next() {
            let job = Arc::clone(&self.job);
            self.in_flight
                .push_back(tokio::task::spawn_blocking(move || job(&path)));
        }
    }

    async fn next(&mut self) -> Option<Result<T>> {
        let handle = self.in_flight.pop_front()?;
        let result = handle.await.context("Worker task failed").and_then(|r| r);
        self.spawn_next();
        Some(result)
    }
}

impl<T> Drop for Window<T> {
    fn drop(&mut self) {
        for handle in &self.in_flight {
            handle.abort();
        }
    }
}

/// Export `inputs` into a new `.enex` file.
///
/// Files are read, resolved and encoded on up to `options.workers` blocking
/// threads, but notes are written by this task alone, strictly in input
/// order. Any failure aborts the run and removes the partial output.
///
/// # Example
///
/// ```rust,no_run
/// use photo_enex::config::Config;
/// use photo_enex::pipeline::{collect_inputs, export, ExportOptions};
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::default();
/// let inputs = collect_inputs(&[PathBuf::from("./photos")], &config.scan)?;
/// let options = ExportOptions::from_config(&config, PathBuf::from("Photos.enex"));
///
/// let summary = export(inputs, &options).await?;
/// println!("{} notes", summary.notes.len());
/// # Ok(())
/// # }
/// ```
pub async fn export(inputs: Vec<PathBuf>, options: &ExportOptions) -> Result<ExportSummary> {
    ensure_output_free(&options.output)?;
    if inputs.is_empty() {
        return Err(ExportError::NoInputs.into());
    }

    let total = inputs.len();
    let resolver = Resolver::default();
    let job: Job<EncodedNote> = Arc::new(move |path: &Path| prepare_note(path, &resolver));
    let mut window = Window::new(inputs, options.workers, job);

    let mut file = ExportFile::create(&options.output, &options.header)?;
    let mut notes = Vec::with_capacity(total);

    while let Some(note) = window.next().await {
        let note = note?;
        log::info!(
            "[{}/{}] {} ({}, {})",
            notes.len() + 1,
            total,
            note.photo.path.display(),
            note.photo.mime,
            note.photo.created_from
        );
        file.append(&note.fragment)?;
        notes.push(NoteSummary::from(&note));
    }

    let written = file.commit()?;
    log::debug!("Wrote {written} note(s) to {}", options.output.display());

    Ok(ExportSummary { output: options.output.clone(), notes })
}
