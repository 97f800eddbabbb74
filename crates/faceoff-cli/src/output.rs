//! Shared output layer: every command renders either human-readable text
//! or stable JSON, chosen by the global `--json` flag.

use serde::Serialize;
use std::io::{self, Write};

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per command).
    Json,
}

impl OutputMode {
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// A structured error with an optional suggestion.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }
}

/// Render a serializable value to stdout in the requested format.
///
/// In JSON mode the value is serialized with `serde_json`; in human mode the
/// `human_fn` closure produces the text.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Human => human_fn(value, &mut out)?,
    }
    Ok(())
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            writeln!(out, "error: {}", error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_mode_is_json() {
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Human.is_json());
    }

    #[test]
    fn cli_error_carries_the_suggestion() {
        let err = CliError::with_suggestion("no checkpoints found", "run a session first");
        assert_eq!(err.message, "no checkpoints found");
        assert_eq!(err.suggestion.as_deref(), Some("run a session first"));

        let bare = CliError::new("boom");
        assert!(bare.suggestion.is_none());
    }

    #[test]
    fn render_json_does_not_fail() {
        #[derive(Serialize)]
        struct Payload {
            value: u32,
        }
        let payload = Payload { value: 3 };
        assert!(render(OutputMode::Json, &payload, |_, _| Ok(())).is_ok());
    }

    #[test]
    fn render_human_uses_the_closure() {
        #[derive(Serialize)]
        struct Payload {
            name: String,
        }
        let payload = Payload { name: "x".into() };
        let result = render(OutputMode::Human, &payload, |p, w| {
            writeln!(w, "name: {}", p.name)
        });
        assert!(result.is_ok());
    }
}
