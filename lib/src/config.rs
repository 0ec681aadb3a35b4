// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{sync::Arc, time::Duration};

use confirm_core::{
    prompt::{Executor, InlineExecutor, TokioExecutor},
    session::{WorkflowConfig, DEFAULT_KEY_ALIAS},
};

use crate::Error;

/// Executor on which confirmation outcome callbacks run
#[derive(Copy, Clone, PartialEq, Debug, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExecutorKind {
    /// Run callbacks on the delivering thread
    Inline,
    /// Run callbacks on a tokio blocking task
    Tokio,
}

/// Application configuration
#[derive(Clone, PartialEq, Debug, clap::Args)]
pub struct AppConfig {
    /// Alias of the confirmation signing key
    #[clap(long, default_value = DEFAULT_KEY_ALIAS, env = "CONFIRM_KEY_ALIAS")]
    pub key_alias: String,

    /// Executor for confirmation callbacks
    #[clap(long, value_enum, default_value = "inline", env = "CONFIRM_EXECUTOR")]
    pub executor: ExecutorKind,

    /// Timeout for user responses
    #[clap(long, default_value = "30", env = "CONFIRM_USER_TIMEOUT_S")]
    pub user_timeout_s: u64,

    /// Simulate a device without trusted confirmation support
    #[clap(long)]
    pub unsupported: bool,

    /// Simulate a locked device
    #[clap(long)]
    pub locked: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            key_alias: DEFAULT_KEY_ALIAS.to_string(),
            executor: ExecutorKind::Inline,
            user_timeout_s: 30,
            unsupported: false,
            locked: false,
        }
    }
}

impl AppConfig {
    /// Workflow configuration
    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            key_alias: self.key_alias.clone(),
        }
    }

    /// Build the configured callback executor
    pub fn executor(&self) -> Result<Arc<dyn Executor>, Error> {
        match self.executor {
            ExecutorKind::Inline => Ok(Arc::new(InlineExecutor)),
            ExecutorKind::Tokio => match TokioExecutor::current() {
                Some(e) => Ok(Arc::new(e)),
                None => Err(Error::NoRuntime),
            },
        }
    }

    pub fn user_timeout(&self) -> Duration {
        Duration::from_secs(self.user_timeout_s)
    }
}
