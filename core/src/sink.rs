// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Log sink for user-visible workflow output

use std::error::Error as StdError;

/// Append-only sink for workflow output, ordering must be preserved
pub trait LogSink: Send + Sync {
    /// Append an informational line
    fn log(&self, line: &str);

    /// Append a failure line with its cause
    fn error(&self, line: &str, cause: &dyn StdError);
}

impl<T: LogSink + ?Sized> LogSink for std::sync::Arc<T> {
    fn log(&self, line: &str) {
        T::log(self, line)
    }

    fn error(&self, line: &str, cause: &dyn StdError) {
        T::error(self, line, cause)
    }
}

/// [LogSink] forwarding to the [log] facade
#[derive(Copy, Clone, Debug, Default)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, line: &str) {
        log::info!("{}", line);
    }

    fn error(&self, line: &str, cause: &dyn StdError) {
        log::error!("{}: {}", line, cause);
    }
}
