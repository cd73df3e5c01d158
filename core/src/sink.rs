//! Output sink, the single writable destination a recorder owns.
//!
//! RULE: Only the recorder writes to a sink, and it owns it exclusively.
//! Every I/O failure surfaces as `SinkUnwritable`; there is no retry.

use crate::error::{VisError, VisResult};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct Sink {
    target:        String,
    writer:        Option<BufWriter<Box<dyn Write + Send>>>,
    bytes_written: u64,
}

impl Sink {
    /// Create (or truncate) a file for a whole-document write.
    pub fn create(path: &Path) -> VisResult<Self> {
        let target = path.display().to_string();
        let file = File::create(path).map_err(|source| VisError::SinkUnwritable {
            target: target.clone(),
            source,
        })?;
        Ok(Self::from_writer(file, target))
    }

    /// Truncate `path`, then hold it open in append mode so every write
    /// lands after what is already on disk.
    pub fn create_append(path: &Path) -> VisResult<Self> {
        let target = path.display().to_string();
        let unwritable = |source| VisError::SinkUnwritable { target: target.clone(), source };
        File::create(path).map_err(unwritable)?;
        let file = OpenOptions::new().append(true).open(path).map_err(unwritable)?;
        Ok(Self::from_writer(file, target))
    }

    /// Wrap an already-open handle. `target` names it in errors and logs.
    pub fn from_writer<W: Write + Send + 'static>(writer: W, target: impl Into<String>) -> Self {
        Self {
            target:        target.into(),
            writer:        Some(BufWriter::new(Box::new(writer))),
            bytes_written: 0,
        }
    }

    pub fn target(&self) -> &str { &self.target }
    pub fn is_open(&self) -> bool { self.writer.is_some() }
    pub fn bytes_written(&self) -> u64 { self.bytes_written }

    pub fn write_str(&mut self, text: &str) -> VisResult<()> {
        let writer = self.writer.as_mut().ok_or(VisError::Closed)?;
        writer
            .write_all(text.as_bytes())
            .map_err(|source| VisError::SinkUnwritable { target: self.target.clone(), source })?;
        self.bytes_written += text.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> VisResult<()> {
        let writer = self.writer.as_mut().ok_or(VisError::Closed)?;
        writer
            .flush()
            .map_err(|source| VisError::SinkUnwritable { target: self.target.clone(), source })
    }

    /// Flush and release the handle. Closing twice is a no-op.
    pub fn close(&mut self) -> VisResult<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer
            .flush()
            .map_err(|source| VisError::SinkUnwritable { target: self.target.clone(), source })
    }

    /// Release the handle without reporting errors. Used on failure paths,
    /// where the original error is the one the caller needs.
    pub fn release(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                log::warn!("sink {}: flush on release failed: {e}", self.target);
            }
        }
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("target", &self.target)
            .field("open", &self.is_open())
            .field("bytes_written", &self.bytes_written)
            .finish()
    }
}
