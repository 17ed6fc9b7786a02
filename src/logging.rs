//! Ambient logging setup, adapted from the teacher's `logger.rs`: a
//! file-backed `tracing` subscriber timestamped with the local offset.

use std::fs::File;
use std::path::Path;

use time::{format_description, OffsetDateTime};
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, FmtSubscriber};

/// Initializes a file-backed tracing subscriber under `log_dir`.
///
/// Will panic on error, matching the teacher's `init_logger` — logging setup
/// failing is a configuration error the operator should see immediately,
/// not silently degrade into stdout-only logging.
pub fn init_logger(log_dir: &Path) {
    let file_name = log_dir.join(log_file_name());
    let file = File::create(&file_name)
        .unwrap_or_else(|e| panic!("could not create log file {}: {e}", file_name.display()));
    let writer = BoxMakeWriter::new(file);

    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        local_offset,
        format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]").unwrap(),
    );

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(writer)
        .finish();

    set_global_default(subscriber)
        .expect("could not set global tracing subscriber (one is likely already set)");
}

fn log_file_name() -> String {
    let format = format_description::parse("[year]-[month]-[day]_[hour]:[minute]:[second]_arena.log").unwrap();
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&format).unwrap()
}
