//! Presentation-level configuration

use std::path::PathBuf;

/// REPL behavior
#[derive(Debug, Clone)]
pub struct ReplConfig {
    /// Show progress while a request runs
    pub show_progress: bool,
    /// Animated spinners (off when stderr is not a terminal)
    pub spinners: bool,
    /// Print tool arguments and results
    pub verbose: bool,
    /// Overrides the default history location
    pub history_file: Option<PathBuf>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            show_progress: true,
            spinners: true,
            verbose: false,
            history_file: None,
        }
    }
}

impl ReplConfig {
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.show_progress = !quiet;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_spinners(mut self, spinners: bool) -> Self {
        self.spinners = spinners;
        self
    }
}
