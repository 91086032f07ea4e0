use crate::error::{CliError, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{Layer, Registry, filter::LevelFilter, fmt, prelude::*};

/// Logging requested on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions<'a> {
    pub verbosity: u8,
    pub quiet: bool,
    pub file: Option<&'a Path>,
}

impl LogOptions<'_> {
    /// `-q` keeps errors; each `-v` opens one more level above warnings.
    pub fn level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// Plain-text layer recording thread names and targets, for post-run inspection
/// of per-worker output.
fn file_layer(file: File) -> impl Layer<Registry> + Send + Sync {
    fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(true)
}

pub fn init(options: &LogOptions<'_>) -> Result<()> {
    let file = options
        .file
        .map(|path| {
            File::create(path).map_err(|e| {
                CliError::Config(format!("Cannot open log file '{}': {}", path.display(), e))
            })
        })
        .transpose()?;

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(options.level());

    tracing_subscriber::registry()
        .with(file.map(|f| file_layer(f).with_filter(options.level())))
        .with(console)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Logging is already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{debug, info, warn};

    static INIT: Once = Once::new();

    fn install_once() {
        INIT.call_once(|| {
            init(&LogOptions {
                verbosity: 3,
                ..LogOptions::default()
            })
            .expect("global logger");
        });
    }

    #[test]
    fn verbosity_maps_to_levels() {
        let level = |verbosity, quiet| {
            LogOptions {
                verbosity,
                quiet,
                file: None,
            }
            .level()
        };
        assert_eq!(level(0, false), LevelFilter::WARN);
        assert_eq!(level(1, false), LevelFilter::INFO);
        assert_eq!(level(2, false), LevelFilter::DEBUG);
        assert_eq!(level(7, false), LevelFilter::TRACE);
        assert_eq!(level(3, true), LevelFilter::ERROR);
    }

    #[test]
    #[serial]
    fn events_are_accepted_after_installation() {
        install_once();
        warn!(step = 3, "Stability advisory.");
        info!(workers = 2, "Workers spawned.");
    }

    #[test]
    #[serial]
    fn installing_twice_is_an_error() {
        install_once();
        assert!(matches!(init(&LogOptions::default()), Err(CliError::Other(_))));
    }

    #[test]
    #[serial]
    fn file_layer_records_fields_and_thread_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let subscriber = tracing_subscriber::registry().with(file_layer(File::create(&path).unwrap()));

        std::thread::Builder::new()
            .name("worker-1".to_string())
            .spawn(move || {
                tracing::subscriber::with_default(subscriber, || {
                    debug!(vmax = 2.0, "Stability sample reduced.");
                });
            })
            .unwrap()
            .join()
            .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Stability sample reduced."));
        assert!(content.contains("vmax=2.0"));
        assert!(content.contains("worker-1"));
        assert!(!content.contains('\u{1b}'));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = LogOptions {
            file: Some(dir.path()),
            ..LogOptions::default()
        };
        assert!(matches!(init(&options), Err(CliError::Config(_))));
    }
}
