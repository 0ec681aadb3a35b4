// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    error::Error as StdError,
    sync::{Mutex, MutexGuard, PoisonError},
};

use confirm_core::LogSink;

/// Ordered transcript of workflow output, also forwarded to [log]
#[derive(Debug, Default)]
pub struct LogView {
    lines: Mutex<Vec<String>>,
}

impl LogView {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of lines appended so far
    pub fn lines(&self) -> Vec<String> {
        self.inner().clone()
    }

    /// Full transcript, one entry per line
    pub fn transcript(&self) -> String {
        self.inner().join("\n")
    }

    /// Count lines containing `pat`
    pub fn count(&self, pat: &str) -> usize {
        self.inner().iter().filter(|l| l.contains(pat)).count()
    }

    pub fn clear(&self) {
        self.inner().clear()
    }
}

impl LogSink for LogView {
    fn log(&self, line: &str) {
        log::info!("{}", line);
        self.inner().push(line.to_string());
    }

    fn error(&self, line: &str, cause: &dyn StdError) {
        log::error!("{}: {}", line, cause);
        self.inner().push(format!("{}: {}", line, cause));
    }
}
