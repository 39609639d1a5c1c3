//! Process logger.
//!
//! `init_with_level` installs a `log` backend that writes one stderr line per
//! record. Records from the `fiducial_rect*` crates pass at the requested
//! level; records from dependencies (image decoders, for instance) are held
//! to `warn` or quieter. With the `tracing` feature, `init_tracing` installs a
//! `tracing-subscriber` formatter with the same default split.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_TARGET_PREFIX: &str = "fiducial_rect";

/// Filter used by `init_tracing` when `RUST_LOG` is unset.
#[cfg(feature = "tracing")]
pub const DEFAULT_TRACING_FILTER: &str = "warn,fiducial_rect=info,fiducial_rect_core=info";

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn threshold(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_TARGET_PREFIX) {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        }
    }
}

/// `[  0.012s  WARN fiducial_rect::resolve] target 1 ...`
fn format_line(elapsed_s: f64, record: &Record) -> String {
    format!(
        "[{elapsed_s:7.3}s {:>5} {}] {}",
        record.level(),
        record.target(),
        record.args()
    )
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.threshold(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(self.started.elapsed().as_secs_f64(), record);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger; `level` applies to this workspace's crates.
///
/// Only the first call installs the logger; later calls are no-ops.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_TRACING_FILTER`].
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TRACING_FILTER));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().flatten_event(true).finish().try_init();
    } else {
        let _ = builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn stderr_logger(level: LevelFilter) -> StderrLogger {
        StderrLogger {
            level,
            started: Instant::now(),
        }
    }

    fn metadata(level: Level, target: &str) -> Metadata<'_> {
        Metadata::builder().level(level).target(target).build()
    }

    #[test]
    fn own_crates_follow_the_requested_level() {
        let logger = stderr_logger(LevelFilter::Debug);
        assert!(logger.enabled(&metadata(Level::Debug, "fiducial_rect::resolve")));
        assert!(logger.enabled(&metadata(Level::Debug, "fiducial_rect_core::homography")));
        assert!(!logger.enabled(&metadata(Level::Trace, "fiducial_rect::engine")));
    }

    #[test]
    fn dependencies_are_capped_at_warn() {
        let logger = stderr_logger(LevelFilter::Trace);
        assert!(!logger.enabled(&metadata(Level::Info, "image::codecs::png")));
        assert!(logger.enabled(&metadata(Level::Warn, "image::codecs::png")));

        let quiet = stderr_logger(LevelFilter::Error);
        assert!(!quiet.enabled(&metadata(Level::Warn, "image::codecs::png")));
    }

    #[test]
    fn line_carries_elapsed_level_and_target() {
        let line = format_line(
            1.25,
            &Record::builder()
                .args(format_args!("resolved {} of {} targets", 1, 2))
                .level(Level::Warn)
                .target("fiducial_rect")
                .build(),
        );
        assert_eq!(line, "[  1.250s  WARN fiducial_rect] resolved 1 of 2 targets");
    }
}
