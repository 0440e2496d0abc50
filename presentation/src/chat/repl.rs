//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::ConsoleFormatter;
use crate::config::ReplConfig;
use crate::progress::reporter::{ProgressReporter, SimpleProgress};
use calagent_application::{AgentProgressNotifier, ConversationSession, NoAgentProgress};
use colored::Colorize;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::path::PathBuf;

const HISTORY_CAPACITY: usize = 1000;

/// How one line of input should be handled
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Skip,
    Exit,
    Help,
    Tools,
    Request(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    let line = line.trim();
    if ["exit", "quit"].iter().any(|word| line.eq_ignore_ascii_case(word)) {
        return Input::Exit;
    }
    match line {
        "" => Input::Skip,
        "/exit" | "/quit" | "/q" => Input::Exit,
        "/help" | "/h" | "/?" => Input::Help,
        "/tools" => Input::Tools,
        request => Input::Request(request),
    }
}

/// Interactive chat REPL over one conversation session
pub struct ChatRepl {
    session: ConversationSession,
    config: ReplConfig,
}

impl ChatRepl {
    pub fn new(session: ConversationSession) -> Self {
        Self {
            session,
            config: ReplConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReplConfig) -> Self {
        self.config = config;
        self
    }

    fn history_path(&self) -> Option<PathBuf> {
        self.config.history_file.clone().or_else(|| {
            dirs::data_dir().map(|p| p.join("calendar-agent").join("history.txt"))
        })
    }

    fn editor(&self) -> Reedline {
        let editor = Reedline::create();
        let Some(path) = self.history_path() else {
            return editor;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match FileBackedHistory::with_file(HISTORY_CAPACITY, path) {
            Ok(history) => editor.with_history(Box::new(history)),
            Err(e) => {
                tracing::debug!("History disabled: {}", e);
                editor
            }
        }
    }

    /// Run until the user exits or the session ends.
    ///
    /// The session is closed on the way out, which shuts the provider down.
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut editor = self.editor();
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("calendar".to_string()),
            DefaultPromptSegment::Empty,
        );

        self.print_welcome();

        let result = loop {
            let signal = match editor.read_line(&prompt) {
                Ok(signal) => signal,
                Err(e) => break Err(e),
            };

            match signal {
                Signal::Success(line) => match classify(&line) {
                    Input::Skip => continue,
                    Input::Exit => {
                        println!("Bye!");
                        break Ok(());
                    }
                    Input::Help => self.print_help(),
                    Input::Tools => self.print_tools(),
                    Input::Request(request) => {
                        if !self.process_request(request).await {
                            break Ok(());
                        }
                    }
                },
                Signal::CtrlC => {
                    println!("^C");
                    continue;
                }
                Signal::CtrlD => {
                    println!("Bye!");
                    break Ok(());
                }
            }
        };

        self.session.close().await;
        result
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "╭─────────────────────────────────────────────╮".cyan());
        println!("{}", "│           calendar-agent - Chat             │".cyan());
        println!("{}", "╰─────────────────────────────────────────────╯".cyan());
        println!();
        println!(
            "{} {}",
            "Tools:".bold(),
            self.session.tool_names().join(", ")
        );
        println!();
        println!("Type a request, /help for commands, or exit to leave.");
        println!();
    }

    fn print_help(&self) {
        println!();
        println!("Commands:");
        println!("  /help, /h, /?        - Show this help");
        println!("  /tools               - Show available tools");
        println!("  exit, quit, /q       - End the session");
        println!();
    }

    fn print_tools(&self) {
        println!();
        for name in self.session.tool_names() {
            println!("  - {}", name);
        }
        println!();
    }

    /// Returns false once the session can take no more requests.
    async fn process_request(&mut self, request: &str) -> bool {
        println!();

        let reporter: Box<dyn AgentProgressNotifier> = match (self.config.show_progress, self.config.verbose) {
            (false, _) => Box::new(NoAgentProgress),
            (true, true) => Box::new(ProgressReporter::verbose()),
            (true, false) if self.config.spinners => Box::new(ProgressReporter::new()),
            (true, false) => Box::new(SimpleProgress),
        };

        let alive = match self.session.send(request, reporter.as_ref()).await {
            Ok(output) => {
                print!("{}", ConsoleFormatter::format_answer(&output));
                true
            }
            Err(e) => {
                eprintln!("{}", ConsoleFormatter::format_error(&e));
                !e.is_session_fatal()
            }
        };
        println!();
        alive
    }
}
