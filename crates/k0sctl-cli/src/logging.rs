use std::path::PathBuf;

use snafu::{ResultExt, Snafu};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::writer::{BoxMakeWriter, MakeWriterExt as _},
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to initialize default log level to {level}"))]
    DefaultFilter {
        source: tracing_subscriber::filter::ParseError,
        level: tracing::Level,
    },

    #[snafu(display("failed to initialize rolling file appender in {directory}", directory = directory.display()))]
    FileAppender {
        source: tracing_appender::rolling::InitError,
        directory: PathBuf,
    },

    #[snafu(display("failed to install global tracing subscriber"))]
    InstallSubscriber {
        source: tracing_subscriber::util::TryInitError,
    },
}

/// Initializes `tracing` logging with options from the environment variable given in the `env` parameter.
///
/// If the environment variable is not set, the maximum log level is INFO. Logs are written to stderr, so that
/// they never mix with documents written to stdout.
///
/// Log output can be copied to a file by setting `{env}_DIRECTORY` (e.g. `K0SCTL_TRANSLATE_LOG_DIRECTORY`)
/// to a directory path. This file is rotated daily.
pub fn initialize_logging(env: &str, app_name: &str) -> Result<(), Error> {
    let filter = match EnvFilter::try_from_env(env) {
        Ok(env_filter) => env_filter,
        _ => {
            let level = tracing::Level::INFO;
            EnvFilter::try_new(level.to_string()).context(DefaultFilterSnafu { level })?
        }
    };

    let file_appender_directory = std::env::var_os(format!("{env}_DIRECTORY")).map(PathBuf::from);
    let writer = match file_appender_directory.as_deref() {
        Some(directory) => {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_suffix(format!("{app_name}.log"))
                .max_log_files(6)
                .build(directory)
                .context(FileAppenderSnafu { directory })?;
            BoxMakeWriter::new(std::io::stderr.and(file_appender))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let fmt = tracing_subscriber::fmt::layer().with_writer(writer);
    Registry::default()
        .with(filter)
        .with(fmt)
        .try_init()
        .context(InstallSubscriberSnafu)?;

    // need to delay logging until after tracing is initialized
    match file_appender_directory {
        Some(dir) => tracing::info!(directory = %dir.display(), "file logging enabled"),
        None => tracing::debug!("file logging disabled, because no log directory set"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tracing::{debug, error, info};

    // The global max level cannot be inspected, so this only checks that initialization succeeds once.
    // Run with `--nocapture` to see the ERROR and INFO messages, and set K0SCTL_TRANSLATE_TEST_UNSET=debug
    // to see all of them.
    #[test]
    fn default_tracing_level_is_set_to_info() {
        super::initialize_logging("K0SCTL_TRANSLATE_TEST_UNSET", "test")
            .expect("logging must initialize");

        error!("ERROR level messages should be seen.");
        info!("INFO level messages should also be seen by default.");
        debug!("DEBUG level messages should be seen only if the environment variable is set.");
    }
}
