#![allow(unused)]

use std::str::FromStr;

use log::LevelFilter;
use simplelog::SimpleLogger;

use confirm::AppConfig;

/// Setup logging, level from `LOG_LEVEL`
pub fn setup() -> AppConfig {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, Default::default());

    AppConfig::default()
}
