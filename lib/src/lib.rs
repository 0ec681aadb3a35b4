// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Trusted confirmation demo library (and CLI)
//!
//! Wires the `confirm-core` workflow to the simulated platform binding,
//! with output collected in a [LogView].
//!

/// Re-export `confirm-core` for consumers
pub use confirm_core;

/// Re-export `confirm-sim` for consumers
pub use confirm_sim;

mod app;
pub use app::{App, SimApp};

mod config;
pub use config::{AppConfig, ExecutorKind};

mod error;
pub use error::Error;

mod log_view;
pub use log_view::LogView;
