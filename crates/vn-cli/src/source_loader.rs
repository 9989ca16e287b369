use std::fs;
use std::path::PathBuf;

use log::info;

use crate::{map_cli_source_path, map_cli_source_read, CliError, LoadedScript};

pub(crate) fn load_script_source(script: &str) -> Result<LoadedScript, CliError> {
    let path = resolve_script_path(script)?;
    let source = fs::read_to_string(&path).map_err(map_cli_source_read)?;
    info!("read {} bytes from {}", source.len(), path.display());
    Ok(LoadedScript { path, source })
}

pub(crate) fn resolve_script_path(script: &str) -> Result<PathBuf, CliError> {
    let path = PathBuf::from(script);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(CliError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("script does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_file() {
        return Err(CliError::new(
            "CLI_SOURCE_NOT_FILE",
            format!("script is not a file: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}
