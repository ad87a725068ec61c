//! Configuration sources.
//!
//! A source exposes the raw document and a modification marker that only
//! moves forward when the document changes. The reloader compares markers
//! and never inspects content it has not been told is newer.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Where configuration documents come from.
pub trait ConfigSource: Send + Sync + 'static {
    /// Human readable origin, used in logs.
    fn describe(&self) -> String;

    /// Current modification marker.
    fn modified(&self) -> io::Result<SystemTime>;

    /// Full current content.
    fn read(&self) -> io::Result<String>;
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn modified(&self) -> io::Result<SystemTime> {
        (**self).modified()
    }

    fn read(&self) -> io::Result<String> {
        (**self).read()
    }
}

/// A configuration file on disk; the marker is the file's mtime.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn modified(&self) -> io::Result<SystemTime> {
        std::fs::metadata(&self.path)?.modified()
    }

    fn read(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}
