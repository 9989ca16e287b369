use std::collections::VecDeque;
use std::io::Write;

use log::debug;
use vn_runtime::ScriptInterpreter;

use crate::{
    create_interpreter, emit_boundary, load_script_source, run_to_boundary, AgentArgs,
    AgentCommand, BoundaryEvent, CliError, RunArgs, TranscriptEntry,
};

pub(super) fn run_agent(args: AgentArgs) -> Result<i32, CliError> {
    match args.command {
        AgentCommand::Run(args) => run_script(args),
    }
}

pub(super) fn run_script(args: RunArgs) -> Result<i32, CliError> {
    let script = load_script_source(&args.script)?;
    let mut interpreter = create_interpreter(&script, args.runtime.interpreter_options())?;
    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    run_with_answers(
        &mut interpreter,
        args.runtime.tick,
        &args.choose,
        &mut writer,
    )
}

/// Plays the loaded script, answering choices from `answers` in order, and
/// prints one report for the whole run.
pub(crate) fn run_with_answers(
    interpreter: &mut ScriptInterpreter,
    tick: f32,
    answers: &[usize],
    writer: &mut dyn Write,
) -> Result<i32, CliError> {
    let mut answers = answers.iter().copied().collect::<VecDeque<_>>();
    let mut transcript = Vec::new();
    interpreter.start();

    loop {
        let mut boundary = run_to_boundary(interpreter, tick)?;
        transcript.append(&mut boundary.transcript);

        if boundary.event == BoundaryEvent::Choices {
            if let Some(index) = answers.pop_front() {
                let text = boundary
                    .choices
                    .get(index)
                    .map(|choice| choice.text.clone())
                    .unwrap_or_default();
                interpreter.select_choice(index)?;
                debug!("answered choice {}", index);
                transcript.push(TranscriptEntry::Chosen { index, text });
                continue;
            }
        }

        boundary.transcript = transcript;
        emit_boundary(&boundary, interpreter, writer)?;
        return Ok(0);
    }
}
