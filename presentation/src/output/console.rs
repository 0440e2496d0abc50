//! Console output for answers, tool listings and errors

use calagent_application::{RunAgentError, RunAgentOutput};
use calagent_domain::{FieldSpec, ToolSchema};
use colored::Colorize;

/// Formats agent results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// The final answer, with a dim footer of what it took
    pub fn format_answer(output: &RunAgentOutput) -> String {
        let mut text = String::new();
        text.push_str(&output.answer);
        text.push('\n');

        if output.tool_calls > 0 {
            let mut footer = format!(
                "{} step(s), {} tool call(s)",
                output.iterations, output.tool_calls
            );
            if output.failed_tool_calls > 0 {
                footer.push_str(&format!(", {} failed", output.failed_tool_calls));
            }
            text.push_str(&format!("{}\n", footer.dimmed()));
        }
        text
    }

    pub fn format_error(err: &RunAgentError) -> String {
        let label = if err.is_session_fatal() {
            "Session ended:".red().bold()
        } else {
            "Error:".yellow().bold()
        };
        format!("{} {}", label, err.user_message())
    }

    /// Tool listing: name, description, then one line per input field
    pub fn format_tools(provider: &str, tools: &[ToolSchema]) -> String {
        let mut output = String::new();
        output.push_str(&Self::header(&format!("Tools from {}", provider)));
        output.push('\n');

        if tools.is_empty() {
            output.push_str(&format!("\n  {}\n", "(no tools)".dimmed()));
        }
        for tool in tools {
            output.push_str(&format!(
                "\n{}  {}\n",
                tool.name.yellow().bold(),
                tool.description
            ));
            for field in &tool.input {
                output.push_str(&Self::field_line(field));
            }
            output.push_str(&format!(
                "    {} {}\n",
                "returns".dimmed(),
                tool.output.as_str()
            ));
        }
        output
    }

    fn field_line(field: &FieldSpec) -> String {
        let required = if field.required { "" } else { "?" };
        let mut line = format!(
            "    {}{}: {}",
            field.name.cyan(),
            required,
            field.value_type.as_str()
        );
        if !field.description.is_empty() {
            line.push_str(&format!("  {}", field.description.dimmed()));
        }
        line.push('\n');
        line
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calagent_domain::ValueType;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_answer_footer_only_when_tools_ran() {
        plain();
        let mut output = RunAgentOutput {
            answer: "Nothing today.".to_string(),
            iterations: 1,
            tool_calls: 0,
            failed_tool_calls: 0,
        };
        assert_eq!(ConsoleFormatter::format_answer(&output), "Nothing today.\n");

        output.iterations = 2;
        output.tool_calls = 3;
        output.failed_tool_calls = 1;
        let text = ConsoleFormatter::format_answer(&output);
        assert!(text.ends_with("2 step(s), 3 tool call(s), 1 failed\n"));
    }

    #[test]
    fn test_loop_exceeded_message() {
        plain();
        let err = RunAgentError::LoopExceeded { max_iterations: 4 };
        assert_eq!(
            ConsoleFormatter::format_error(&err),
            "Error: could not complete the request"
        );
    }

    #[test]
    fn test_tool_listing() {
        plain();
        let tool = ToolSchema::new("delete_event", "Delete the event with the given id.")
            .with_input(FieldSpec::required("id", ValueType::String).with_description("Event id"))
            .with_input(FieldSpec::optional("notify", ValueType::Boolean));
        let text = ConsoleFormatter::format_tools("calendar-agent", &[tool]);

        assert!(text.contains("Tools from calendar-agent"));
        assert!(text.contains("delete_event  Delete the event with the given id."));
        assert!(text.contains("    id: string  Event id"));
        assert!(text.contains("    notify?: boolean"));
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "  "), "  a\n  b");
    }
}
