#![allow(unused)]

use std::{str::FromStr, sync::Arc};

use log::LevelFilter;
use simplelog::SimpleLogger;

use confirm_sim::SimKeyStore;

/// Setup logging, level from `LOG_LEVEL`
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, Default::default());
}

/// Create a simulated store and a hook recording approvals with it
pub fn sim_store() -> (Arc<SimKeyStore>, impl Fn(&[u8]) + Clone + Send + Sync + 'static) {
    setup_logging();

    let s = Arc::new(SimKeyStore::new());
    let approve = {
        let s = s.clone();
        move |d: &[u8]| s.approve(d)
    };

    (s, approve)
}
