//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use recorder_lib::proto::Ack;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

#[derive(Serialize)]
struct AckView<'a> {
    status: bool,
    message: &'a str,
}

/// Print a control acknowledgement
pub fn print_ack(ack: &Ack, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            if ack.status {
                print_success(&ack.message);
            } else {
                print_error(&ack.message);
            }
        }
        OutputFormat::Json => print_json(&AckView {
            status: ack.status,
            message: &ack.message,
        }),
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "running" => status.green().to_string(),
        "degraded" | "idle" => status.yellow().to_string(),
        "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_status_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(color_status("running"), "running");
        assert_eq!(color_status("unknown"), "unknown");
    }

    #[test]
    fn test_ack_view_serializes() {
        let view = AckView {
            status: false,
            message: "run r1 is already recording",
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], false);
        assert_eq!(json["message"], "run r1 is already recording");
    }
}
