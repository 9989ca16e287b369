use std::fmt::Display;
use std::io::Write;

use vn_core::{LoadError, RuntimeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliError {
    pub(crate) code: String,
    pub(crate) message: String,
}

impl CliError {
    pub(crate) fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<LoadError> for CliError {
    fn from(error: LoadError) -> Self {
        Self::new(error.code(), error.to_string())
    }
}

impl From<RuntimeError> for CliError {
    fn from(error: RuntimeError) -> Self {
        Self::new(error.code(), error.to_string())
    }
}

fn map_error(code: &'static str, error: impl Display) -> CliError {
    CliError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: CliError) -> i32 {
    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    // Nothing else can report a failure to write the error itself.
    let _ = write_error(&error, &mut writer);
    1
}

pub(crate) fn write_error(error: &CliError, writer: &mut dyn Write) -> std::io::Result<()> {
    writeln!(writer, "RESULT:ERROR")?;
    writeln!(writer, "ERROR_CODE:{}", error.code)?;
    writeln!(
        writer,
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).expect("string json")
    )
}

pub(crate) fn map_play_io(error: std::io::Error) -> CliError {
    map_error("PLAY_IO", error)
}

pub(crate) fn map_cli_output(error: std::io::Error) -> CliError {
    map_error("CLI_OUTPUT", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> CliError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> CliError {
    map_error("CLI_SOURCE_READ", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(CliError::new("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn write_error_prints_code_and_json_message() {
        let mut out: Vec<u8> = Vec::new();
        write_error(&CliError::new("ERR", "bad \"thing\""), &mut out).expect("write");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "RESULT:ERROR\nERROR_CODE:ERR\nERROR_MSG_JSON:\"bad \\\"thing\\\"\"\n"
        );
    }

    #[test]
    fn interpreter_errors_keep_their_codes() {
        let load = CliError::from(LoadError::UnterminatedBlock { line: 4 });
        assert_eq!(load.code, "LOAD_UNTERMINATED_BLOCK");
        assert!(load.message.contains("line 4"));

        let runtime = CliError::from(RuntimeError::NoPendingChoice);
        assert_eq!(runtime.code, "RUNTIME_NO_PENDING_CHOICE");
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(map_play_io(std::io::Error::other("io")).code, "PLAY_IO");
        assert_eq!(map_cli_output(std::io::Error::other("out")).code, "CLI_OUTPUT");
        assert_eq!(
            map_cli_source_path(std::io::Error::other("path")).code,
            "CLI_SOURCE_PATH"
        );
        assert_eq!(
            map_cli_source_read(std::io::Error::other("read")).code,
            "CLI_SOURCE_READ"
        );
    }
}
