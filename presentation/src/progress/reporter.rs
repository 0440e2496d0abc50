//! Progress reporting for agent runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use calagent_application::AgentProgressNotifier;
use calagent_domain::ToolOutcome;
use std::sync::Mutex;
use std::time::Duration;

/// Spinner while the model thinks, one line per tool call.
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
    verbose: bool,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
            verbose: false,
        }
    }

    /// Also print tool arguments and results
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::new()
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn clear_spinner(&self) {
        let mut spinner = self.spinner.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(pb) = spinner.take() {
            pb.finish_and_clear();
        }
    }

    /// Print above the spinner if one is running.
    fn line(&self, text: String) {
        let spinner = self.spinner.lock().unwrap_or_else(|p| p.into_inner());
        match spinner.as_ref() {
            Some(pb) => pb.println(text),
            None => eprintln!("{}", text),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentProgressNotifier for ProgressReporter {
    fn on_iteration_start(&self, iteration: usize, max_iterations: usize) {
        if self.verbose && iteration > 1 {
            self.line(format!(
                "  {} step {}/{}",
                "·".dimmed(),
                iteration,
                max_iterations
            ));
        }
    }

    fn on_thinking(&self) {
        self.clear_spinner();
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix("Thinking");
        pb.set_message("...");
        pb.enable_steady_tick(Duration::from_millis(100));
        *self.spinner.lock().unwrap_or_else(|p| p.into_inner()) = Some(pb);
    }

    fn on_thinking_done(&self) {
        self.clear_spinner();
    }

    fn on_tool_call(&self, tool_name: &str, args: &str) {
        if self.verbose {
            self.line(format!(
                "  {} {} {}",
                "→".blue(),
                tool_name.cyan(),
                truncate(args, 80).dimmed()
            ));
        } else {
            self.line(format!("  {} {}", "→".blue(), tool_name.cyan()));
        }
    }

    fn on_tool_result(&self, tool_name: &str, outcome: &ToolOutcome) {
        match outcome {
            ToolOutcome::Success { value } => {
                if self.verbose {
                    self.line(format!(
                        "  {} {} {}",
                        "✓".green(),
                        tool_name.green(),
                        truncate(&value.to_string(), 80).dimmed()
                    ));
                }
            }
            ToolOutcome::Failure(err) => {
                self.line(format!(
                    "  {} {} {}",
                    "✗".red(),
                    tool_name.red(),
                    format!("{}: {}", err.kind, err.message).dimmed()
                ));
            }
        }
    }

    fn on_loop_exceeded(&self, max_iterations: usize) {
        self.clear_spinner();
        self.line(format!(
            "  {} gave up after {} steps",
            "!".yellow(),
            max_iterations
        ));
    }
}

/// Plain-text progress (no spinners), for non-interactive output
pub struct SimpleProgress;

impl AgentProgressNotifier for SimpleProgress {
    fn on_tool_call(&self, tool_name: &str, _args: &str) {
        eprintln!("  -> {}", tool_name);
    }

    fn on_tool_result(&self, tool_name: &str, outcome: &ToolOutcome) {
        if let Some(err) = outcome.error() {
            eprintln!("  x {} ({})", tool_name, err.kind);
        }
    }

    fn on_loop_exceeded(&self, max_iterations: usize) {
        eprintln!("  ! gave up after {} steps", max_iterations);
    }
}

/// Truncate a string to at most `max_chars` characters
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
