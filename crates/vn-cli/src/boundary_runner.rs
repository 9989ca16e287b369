use std::io::Write;

use log::info;
use vn_runtime::{InterpreterOptions, ScriptInterpreter};

use crate::{
    map_cli_output, BoundaryEvent, BoundaryResult, CliError, LoadedScript, TranscriptEntry,
};

/// Upper bound on ticks spent looking for the next choice or the end.
pub(crate) const MAX_TICKS_PER_BOUNDARY: usize = 10_000;

/// Loads `script` into a fresh interpreter with the host commands the player
/// provides. The interpreter is not started.
pub(crate) fn create_interpreter(
    script: &LoadedScript,
    options: InterpreterOptions,
) -> Result<ScriptInterpreter, CliError> {
    let mut interpreter = ScriptInterpreter::new(options);
    interpreter.register_custom_command("note", |args| {
        info!("note: {}", args.join(" "));
        true
    })?;
    interpreter.load(&script.source)?;
    Ok(interpreter)
}

/// Ticks until a choice is pending or the script ends, acknowledging every
/// dialogue line on the way.
pub(crate) fn run_to_boundary(
    interpreter: &mut ScriptInterpreter,
    tick: f32,
) -> Result<BoundaryResult, CliError> {
    let mut transcript = Vec::new();

    for _ in 0..MAX_TICKS_PER_BOUNDARY {
        interpreter.update(tick)?;
        drain_output(interpreter, &mut transcript);

        if let Some(choices) = interpreter.pending_choices() {
            let choices = choices.to_vec();
            interpreter.take_choice_options();
            return Ok(BoundaryResult {
                event: BoundaryEvent::Choices,
                transcript,
                choices,
            });
        }
        if !interpreter.is_running() {
            return Ok(BoundaryResult {
                event: BoundaryEvent::End,
                transcript,
                choices: Vec::new(),
            });
        }
        interpreter.acknowledge();
    }

    Err(CliError::new(
        "CLI_TICK_LIMIT",
        format!(
            "script reached neither a choice nor its end within {} ticks",
            MAX_TICKS_PER_BOUNDARY
        ),
    ))
}

pub(crate) fn drain_output(
    interpreter: &mut ScriptInterpreter,
    transcript: &mut Vec<TranscriptEntry>,
) {
    transcript.extend(interpreter.take_events().into_iter().map(TranscriptEntry::Host));
    transcript.extend(
        interpreter
            .take_dialogue_lines()
            .into_iter()
            .map(TranscriptEntry::Text),
    );
}

pub(crate) fn emit_boundary(
    boundary: &BoundaryResult,
    interpreter: &ScriptInterpreter,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    write_boundary(boundary, interpreter, writer).map_err(map_cli_output)
}

fn write_boundary(
    boundary: &BoundaryResult,
    interpreter: &ScriptInterpreter,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    writeln!(writer, "RESULT:OK")?;
    match boundary.event {
        BoundaryEvent::Choices => writeln!(writer, "EVENT:CHOICES")?,
        BoundaryEvent::End => writeln!(writer, "EVENT:END")?,
    }

    for entry in &boundary.transcript {
        match entry {
            TranscriptEntry::Host(event) => writeln!(
                writer,
                "HOST_JSON:{}",
                serde_json::to_string(event).expect("host event json")
            )?,
            TranscriptEntry::Text(line) => writeln!(
                writer,
                "TEXT_JSON:{}",
                serde_json::to_string(line).expect("dialogue json")
            )?,
            TranscriptEntry::Chosen { index, text } => writeln!(
                writer,
                "CHOSEN:{}|{}",
                index,
                serde_json::to_string(text).expect("string json")
            )?,
        }
    }

    for choice in &boundary.choices {
        writeln!(
            writer,
            "CHOICE:{}|{}",
            choice.index,
            serde_json::to_string(&choice.text).expect("string json")
        )?;
    }

    writeln!(
        writer,
        "VARS_JSON:{}",
        serde_json::to_string(&interpreter.variables()).expect("snapshot json")
    )?;
    if let Some(line) = interpreter.current_line() {
        writeln!(writer, "LINE:{}", line)?;
    }
    Ok(())
}
