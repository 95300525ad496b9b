//! Fault taxonomy for the insights pipeline.

use thiserror::Error;

/// Errors raised while invoking the analytics process, extracting its
/// result, or rendering a report.
#[derive(Debug, Error)]
pub enum InsightError {
    /// The external process exited non-zero, wrote to stderr, could not be
    /// spawned, or ran past its timeout.
    #[error("external process '{program}' failed{}: {stderr}", status_suffix(.status))]
    ProcessExecution {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    /// No JSON object literal was found at the end of the output.
    #[error("no JSON object found in process output (starts with: {preview:?})")]
    NoStructuredOutput { preview: String },

    /// A JSON-object-shaped literal was found but did not parse.
    #[error("malformed JSON in process output: {source}")]
    MalformedOutput {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// Unknown period or role, or an empty period list.
    #[error("invalid insights request: {0}")]
    UnrecognizedInput(String),

    /// An encoder library failed while producing bytes.
    #[error("failed to render {format} report: {message}")]
    Render {
        format: &'static str,
        message: String,
    },
}

fn status_suffix(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_message() {
        let err = InsightError::ProcessExecution {
            program: "python".to_string(),
            status: Some(2),
            stderr: "Traceback".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "external process 'python' failed with status 2: Traceback"
        );

        let err = InsightError::ProcessExecution {
            program: "python".to_string(),
            status: None,
            stderr: "timed out after 5s".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "external process 'python' failed: timed out after 5s"
        );
    }
}
