// SPDX-License-Identifier: MIT

//! `cued` -- the cue workflow server over stdio.

use cue_server::{env, listener, ops::Ops, startup, sweep, Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // stdout carries the protocol; logs go to stderr and optionally a
    // daily-rolling file
    let filter = EnvFilter::try_new(env::log_filter())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cued.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let config = Config::from_env();
    let _log_guard = init_tracing(&config);

    let engine = match startup(&config) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "startup failed");
            return std::process::ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let sweeper = tokio::spawn(sweep::run(engine.clone(), config.sweep_interval, cancel.clone()));

    info!(version = cue_server::ops::VERSION, "cued serving on stdio");
    let ops = Ops::new(engine);
    let served = listener::serve(ops, tokio::io::stdin(), tokio::io::stdout(), cancel.clone()).await;

    cancel.cancel();
    let _ = sweeper.await;

    match served {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "listener failed");
            std::process::ExitCode::FAILURE
        }
    }
}
