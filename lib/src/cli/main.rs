// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility demonstrating trusted confirmation and signing

use std::time::Duration;

use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};

use confirm::{
    confirm_core::session::SessionOutcome,
    confirm_sim::{Responder, UserAction},
    AppConfig, Error, SimApp,
};

mod helpers;
use helpers::*;

/// Trusted confirmation command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    #[clap(flatten)]
    config: AppConfig,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info", env)]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Report whether trusted confirmation is supported
    Info,

    /// Setup the signing key and list keys in the store
    Keys,

    /// Show a confirmation prompt and sign the confirmed data
    Show {
        /// Prompt text
        #[clap(long, default_value = "Hello")]
        prompt: String,

        /// Hex encoded extra data
        #[clap(long, default_value = "")]
        extra: HexData,

        /// Simulated user response
        #[clap(long, default_value = "confirm")]
        action: UserAction,

        /// Simulated user response delay (immediate if zero)
        #[clap(long, default_value = "500")]
        delay_ms: u64,

        /// Show the prompt twice back-to-back
        #[clap(long)]
        twice: bool,

        /// Sign the confirmed data a second time
        #[clap(long)]
        resign: bool,

        /// Sign the confirmed data with one byte altered
        #[clap(long)]
        tamper: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    debug!("Using config: {:?}", args.config);

    let responder = match &args.cmd {
        Actions::Show {
            action, delay_ms, ..
        } if *delay_ms > 0 => Responder::Delayed(*action, Duration::from_millis(*delay_ms)),
        Actions::Show { action, .. } => Responder::Auto(*action),
        _ => Responder::Manual,
    };

    let (app, _store) = SimApp::sim(&args.config, responder)?;

    // Execute command
    execute(&app, args.cmd).await?;

    Ok(())
}

/// Execute a command with the provided application
async fn execute(app: &SimApp, cmd: Actions) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::Info => {
            app.welcome();
        }
        Actions::Keys => {
            app.setup_key()?;
        }
        Actions::Show {
            prompt,
            extra,
            twice,
            resign,
            tamper,
            ..
        } => {
            if !app.welcome() {
                return Err(anyhow::anyhow!("trusted confirmation unsupported"));
            }

            app.setup_key()?;

            let outcome = match twice {
                false => app.show(&prompt, extra.as_ref()).await,
                true => {
                    let (first, second) = app.show_twice(&prompt, extra.as_ref()).await;
                    if let Err(e) = &second {
                        info!("second prompt refused: {}", e);
                    }
                    first
                }
            };

            let c = match outcome {
                Ok(SessionOutcome::Confirmed(c)) => c,
                Ok(o) => {
                    info!("prompt not confirmed ({})", o.state());
                    return Ok(());
                }
                Err(Error::UserTimeout) => {
                    warn!("no response from user");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            match &c.signature {
                Ok(s) => info!("signature: {}", s.to_hex()),
                Err(e) => error!("signing failed: {}", e),
            }

            // One approval authorises one signature
            if resign {
                match app.resign(&c) {
                    Ok(_) => warn!("re-signing unexpectedly succeeded"),
                    Err(e) => info!("re-signing refused: {}", e),
                }
            }

            // Approved again, so only the altered bytes are refused
            if tamper {
                let (tampered, original) = app.tamper_reapproved(&c);
                match tampered {
                    Ok(_) => warn!("signing tampered data unexpectedly succeeded"),
                    Err(e) => info!("signing tampered data refused: {}", e),
                }
                match original {
                    Ok(s) => info!("re-approved signature: {}", s.to_hex()),
                    Err(e) => error!("signing re-approved data failed: {}", e),
                }
            }
        }
    }

    Ok(())
}
