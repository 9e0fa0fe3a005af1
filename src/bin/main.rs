#![warn(clippy::all)]

use std::process::ExitCode;

use tracing::{error, trace_span};
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter, Registry};

#[tokio::main]
async fn main() -> ExitCode {
    let stdout_log = tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    Registry::default().with(filter).with(stdout_log).init();

    let span = trace_span!("starting main");
    let _guard = span.enter();

    match foodgram::start_server().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
