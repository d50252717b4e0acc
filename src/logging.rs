use std::backtrace::Backtrace;

use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::error::Error;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Single sink for failures nobody else handles: failed runs and panics.
pub fn report_error(err: &Error) {
    error!("{}", error_report(err));
}

fn error_report(err: &Error) -> String {
    format!("Capture failed: {}\n{}", err, Backtrace::force_capture())
}

pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let trace = Backtrace::force_capture();
        error!("Panic: {}\n{}", info, trace);
    }));
}
