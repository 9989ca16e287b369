use std::io::{self, BufRead, Write};
use std::time::Duration;

use vn_core::{DialogueLine, HostEvent};
use vn_runtime::ScriptInterpreter;

use crate::{map_play_io, CliError, PlayCommandAction};

const HELP: &str = "commands: :help :vars :restart :quit";

pub(crate) fn run_play_line_mode(
    interpreter: &mut ScriptInterpreter,
    tick: f32,
) -> Result<i32, CliError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_play_line_mode_with_io(interpreter, tick, &mut reader, &mut writer)
}

pub(crate) fn run_play_line_mode_with_io(
    interpreter: &mut ScriptInterpreter,
    tick: f32,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, CliError> {
    writeln!(writer, "vn-cli play").map_err(map_play_io)?;
    writeln!(writer, "{}", HELP).map_err(map_play_io)?;
    interpreter.start();

    loop {
        interpreter.update(tick)?;
        for event in interpreter.take_events() {
            writeln!(writer, "  <{}>", describe_event(&event)).map_err(map_play_io)?;
        }
        for line in interpreter.take_dialogue_lines() {
            writeln!(writer).map_err(map_play_io)?;
            writeln!(writer, "{}", format_line(&line)).map_err(map_play_io)?;
        }

        if let Some(choices) = interpreter.pending_choices() {
            let choices = choices.to_vec();
            interpreter.take_choice_options();
            writeln!(writer).map_err(map_play_io)?;
            for choice in &choices {
                writeln!(writer, "  [{}] {}", choice.index, choice.text).map_err(map_play_io)?;
            }
            loop {
                let Some(raw) = prompt_input_from("> ", reader, writer)? else {
                    return Ok(0);
                };
                match handle_play_command(raw.as_str(), interpreter, writer)? {
                    PlayCommandAction::Continue => continue,
                    PlayCommandAction::Restart => break,
                    PlayCommandAction::Quit => return Ok(0),
                    PlayCommandAction::NotHandled => {}
                }
                let index = raw.trim().parse::<usize>().map_err(|_| {
                    CliError::new("PLAY_CHOICE_PARSE", format!("Invalid choice index: {}", raw))
                })?;
                interpreter.select_choice(index)?;
                break;
            }
        } else if interpreter.awaiting_dialogue() {
            loop {
                let Some(raw) = prompt_input_from("", reader, writer)? else {
                    return Ok(0);
                };
                match handle_play_command(raw.as_str(), interpreter, writer)? {
                    PlayCommandAction::Continue => continue,
                    PlayCommandAction::Restart => break,
                    PlayCommandAction::Quit => return Ok(0),
                    PlayCommandAction::NotHandled => {}
                }
                interpreter.acknowledge();
                break;
            }
        } else if !interpreter.is_running() {
            writeln!(writer).map_err(map_play_io)?;
            writeln!(writer, "[END]").map_err(map_play_io)?;
            return Ok(0);
        } else if interpreter.is_waiting() {
            std::thread::sleep(Duration::from_secs_f32(tick.max(0.0)));
        }
    }
}

pub(crate) fn handle_play_command(
    raw: &str,
    interpreter: &mut ScriptInterpreter,
    writer: &mut dyn Write,
) -> Result<PlayCommandAction, CliError> {
    match raw.trim() {
        ":help" => {
            writeln!(writer, "{}", HELP).map_err(map_play_io)?;
            Ok(PlayCommandAction::Continue)
        }
        ":vars" => {
            let snapshot = serde_json::to_string(&interpreter.variables()).expect("snapshot json");
            writeln!(writer, "{}", snapshot).map_err(map_play_io)?;
            Ok(PlayCommandAction::Continue)
        }
        ":restart" => {
            interpreter.start();
            writeln!(writer, "restarted").map_err(map_play_io)?;
            Ok(PlayCommandAction::Restart)
        }
        ":quit" => {
            writeln!(writer, "bye").map_err(map_play_io)?;
            Ok(PlayCommandAction::Quit)
        }
        _ => Ok(PlayCommandAction::NotHandled),
    }
}

/// Reads one line; `None` at end of input.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, CliError> {
    write!(writer, "{}", prefix).map_err(map_play_io)?;
    writer.flush().map_err(map_play_io)?;
    let mut input = String::new();
    if reader.read_line(&mut input).map_err(map_play_io)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

pub(crate) fn format_line(line: &DialogueLine) -> String {
    match &line.speaker {
        Some(speaker) => format!("{}: {}", speaker, line.text),
        None => line.text.clone(),
    }
}

pub(crate) fn describe_event(event: &HostEvent) -> String {
    match event {
        HostEvent::PlaySound { file } => format!("sound {}", file),
        HostEvent::PlayBgm { file } => format!("bgm {}", file),
        HostEvent::StopBgm => "bgm stopped".to_string(),
        HostEvent::ShowCharacter { name, args } if args.is_empty() => format!("show {}", name),
        HostEvent::ShowCharacter { name, args } => format!("show {} {}", name, args.join(" ")),
        HostEvent::HideCharacter { name } => format!("hide {}", name),
        HostEvent::ChangeBackground { name } => format!("background {}", name),
        HostEvent::Animation { args } => format!("anim {}", args.join(" ")),
        HostEvent::SpecialEffect { args } => format!("effect {}", args.join(" ")),
    }
}
