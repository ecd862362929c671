//! Run-time settings gathered from the command line and environment.

use crate::netcdf_io::OutputFormat;
use crate::parallel::ParallelConfig;

/// Environment variable with the default log filter
pub const LOG_ENV: &str = "CFKIT_LOG";

/// Environment variable with the default thread count
pub const THREADS_ENV: &str = "CFKIT_THREADS";

/// Settings shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub threads: Option<usize>,
    pub verbose: bool,
    /// Suppress warnings globally
    pub quiet: bool,
    pub format: OutputFormat,
}

impl Settings {
    /// The log filter directive to use.
    ///
    /// `--quiet` wins over `--verbose`; without either the environment
    /// (`CFKIT_LOG`, then `RUST_LOG`) decides, falling back to `info`.
    pub fn log_filter(&self, env: Option<String>) -> String {
        if self.quiet {
            "error".to_string()
        } else if self.verbose {
            "debug".to_string()
        } else {
            env.filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "info".to_string())
        }
    }

    pub fn parallel(&self) -> ParallelConfig {
        ParallelConfig::new(self.threads)
    }
}
