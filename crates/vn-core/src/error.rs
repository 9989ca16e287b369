use thiserror::Error;

/// Structural problems found while loading a script. A script that fails to
/// load is rejected as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("line {line}: label \"{name}\" is already declared on line {first_line}")]
    DuplicateLabel {
        name: String,
        line: usize,
        first_line: usize,
    },
    #[error("line {line}: malformed `{keyword}` command: {reason}")]
    MalformedCommand {
        keyword: String,
        line: usize,
        reason: String,
    },
    #[error("line {line}: `if` block is never closed by `endif`")]
    UnterminatedBlock { line: usize },
    #[error("line {line}: target label \"{name}\" is not declared")]
    UnknownLabel { name: String, line: usize },
}

impl LoadError {
    pub fn malformed(keyword: &str, line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedCommand {
            keyword: keyword.to_string(),
            line,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateLabel { .. } => "LOAD_DUPLICATE_LABEL",
            Self::MalformedCommand { .. } => "LOAD_MALFORMED_COMMAND",
            Self::UnterminatedBlock { .. } => "LOAD_UNTERMINATED_BLOCK",
            Self::UnknownLabel { .. } => "LOAD_UNKNOWN_LABEL",
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::DuplicateLabel { line, .. }
            | Self::MalformedCommand { line, .. }
            | Self::UnterminatedBlock { line }
            | Self::UnknownLabel { line, .. } => *line,
        }
    }
}

/// Errors raised while a loaded script executes. Any of these raised inside a
/// tick stops the interpreter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("label \"{name}\" does not exist")]
    UnknownLabel { name: String },
    #[error("`return` without a matching `call`{}", line_suffix(.line))]
    EmptyCallStack { line: Option<usize> },
    #[error("command `{keyword}` failed{}: {reason}", line_suffix(.line))]
    CommandFailed {
        keyword: String,
        line: Option<usize>,
        reason: String,
    },
    #[error("condition `{expression}` could not be evaluated{}: {reason}", line_suffix(.line))]
    UndefinedCondition {
        expression: String,
        line: Option<usize>,
        reason: String,
    },
    #[error("position {position} is outside the command list (length {len})")]
    InvalidPosition { position: usize, len: usize },
    #[error("no choice is pending")]
    NoPendingChoice,
    #[error("choice index {index} is out of range ({available} options available)")]
    ChoiceOutOfRange { index: usize, available: usize },
    #[error("\"{name}\" is a built-in command and cannot be registered")]
    ReservedCommand { name: String },
    #[error("call depth limit of {limit} exceeded{}", line_suffix(.line))]
    CallDepthExceeded { limit: usize, line: Option<usize> },
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|line| format!(" on line {}", line)).unwrap_or_default()
}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownLabel { .. } => "RUNTIME_UNKNOWN_LABEL",
            Self::EmptyCallStack { .. } => "RUNTIME_EMPTY_CALL_STACK",
            Self::CommandFailed { .. } => "RUNTIME_COMMAND_FAILED",
            Self::UndefinedCondition { .. } => "RUNTIME_UNDEFINED_CONDITION",
            Self::InvalidPosition { .. } => "RUNTIME_INVALID_POSITION",
            Self::NoPendingChoice => "RUNTIME_NO_PENDING_CHOICE",
            Self::ChoiceOutOfRange { .. } => "RUNTIME_CHOICE_OUT_OF_RANGE",
            Self::ReservedCommand { .. } => "RUNTIME_RESERVED_COMMAND",
            Self::CallDepthExceeded { .. } => "RUNTIME_CALL_DEPTH_EXCEEDED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_messages_carry_line_numbers() {
        let error = LoadError::DuplicateLabel {
            name: "intro".to_string(),
            line: 7,
            first_line: 2,
        };
        assert_eq!(error.code(), "LOAD_DUPLICATE_LABEL");
        assert_eq!(error.line(), 7);
        assert_eq!(
            error.to_string(),
            "line 7: label \"intro\" is already declared on line 2"
        );

        let malformed = LoadError::malformed("wait", 3, "expected a duration");
        assert_eq!(malformed.code(), "LOAD_MALFORMED_COMMAND");
        assert_eq!(
            malformed.to_string(),
            "line 3: malformed `wait` command: expected a duration"
        );
    }

    #[test]
    fn runtime_error_messages_include_optional_line() {
        let with_line = RuntimeError::EmptyCallStack { line: Some(4) };
        assert_eq!(
            with_line.to_string(),
            "`return` without a matching `call` on line 4"
        );
        let without_line = RuntimeError::EmptyCallStack { line: None };
        assert_eq!(without_line.to_string(), "`return` without a matching `call`");
        assert_eq!(without_line.code(), "RUNTIME_EMPTY_CALL_STACK");

        let too_deep = RuntimeError::CallDepthExceeded {
            limit: 8,
            line: Some(2),
        };
        assert_eq!(too_deep.to_string(), "call depth limit of 8 exceeded on line 2");
        assert_eq!(too_deep.code(), "RUNTIME_CALL_DEPTH_EXCEEDED");
    }
}
