use std::ffi::OsString;
use std::io::Write;

use clap::Parser;

mod agent;
mod boundary_runner;
mod cli_args;
mod error_map;
mod line_play;
mod models;
mod source_loader;

pub(crate) use boundary_runner::{create_interpreter, emit_boundary, run_to_boundary};
pub(crate) use cli_args::{AgentArgs, AgentCommand, CheckArgs, Cli, Mode, PlayArgs, RunArgs};
pub(crate) use error_map::{
    emit_error, map_cli_output, map_cli_source_path, map_cli_source_read, map_play_io, CliError,
};
pub(crate) use line_play::run_play_line_mode;
pub(crate) use models::{
    BoundaryEvent, BoundaryResult, LoadedScript, PlayCommandAction, TranscriptEntry,
};
pub(crate) use source_loader::load_script_source;

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            // Prints usage or help; the exit code tells which.
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, CliError> {
    match cli.command {
        Mode::Check(args) => run_check(args),
        Mode::Play(args) => run_play(args),
        Mode::Agent(args) => agent::run_agent(args),
    }
}

fn run_check(args: CheckArgs) -> Result<i32, CliError> {
    let script = load_script_source(&args.script)?;
    let interpreter = create_interpreter(&script, Default::default())?;
    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    write_check_report(&interpreter, &mut writer)?;
    writeln!(writer, "SCRIPT:{}", script.path.display()).map_err(map_cli_output)?;
    Ok(0)
}

pub(crate) fn write_check_report(
    interpreter: &vn_runtime::ScriptInterpreter,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    writeln!(writer, "RESULT:OK").map_err(map_cli_output)?;
    writeln!(writer, "COMMANDS:{}", interpreter.commands().len()).map_err(map_cli_output)?;
    writeln!(writer, "LABELS:{}", interpreter.labels().len()).map_err(map_cli_output)?;
    for label in interpreter.labels().values() {
        writeln!(writer, "LABEL:{}|{}", label.name, label.source_line).map_err(map_cli_output)?;
    }
    Ok(())
}

fn run_play(args: PlayArgs) -> Result<i32, CliError> {
    let script = load_script_source(&args.script)?;
    let mut interpreter = create_interpreter(&script, args.runtime.interpreter_options())?;
    run_play_line_mode(&mut interpreter, args.runtime.tick)
}
