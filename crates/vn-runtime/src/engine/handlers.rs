use std::rc::Rc;

use log::debug;
use vn_core::{
    ChoiceOption, CommandKind, DialogueLine, ExecutionState, HostEvent, RuntimeError,
    ScriptCommand, SPEAKER_VARIABLE,
};

use super::{Flow, PendingBoundary, ScopeId, ScriptInterpreter};

fn command_failed(command: &ScriptCommand, reason: impl Into<String>) -> RuntimeError {
    RuntimeError::CommandFailed {
        keyword: command.keyword.clone(),
        line: Some(command.source_line),
        reason: reason.into(),
    }
}

impl ScriptInterpreter {
    pub(super) fn handle_dialogue(&mut self, command: &ScriptCommand) -> Flow {
        let text = self.interpolate(command.parameter(0).unwrap_or_default());
        let speaker = command
            .parameter(1)
            .map(|speaker| self.interpolate(speaker))
            .or_else(|| self.get_variable(SPEAKER_VARIABLE).map(str::to_string))
            .filter(|speaker| !speaker.is_empty());

        self.dialogue_lines.push(DialogueLine {
            speaker,
            text,
            source_line: command.source_line,
        });
        self.pending_boundary = Some(PendingBoundary::Dialogue);
        Flow::Suspend
    }

    pub(super) fn handle_jump(&mut self, command: &ScriptCommand) -> Result<Flow, RuntimeError> {
        self.goto_label(command.parameter(0).unwrap_or_default())?;
        Ok(Flow::Continue)
    }

    /// A false condition continues at the command after the matching `else`,
    /// or at the matching `endif`.
    pub(super) fn handle_condition(
        &mut self,
        command: &ScriptCommand,
    ) -> Result<Flow, RuntimeError> {
        let expression = command.parameter(0).unwrap_or_default();
        if !self.evaluate_condition(expression, Some(command.source_line))? {
            if let Some(target) = command.target {
                self.program_counter = target;
            }
        }
        Ok(Flow::Continue)
    }

    /// Reached only at the end of a taken `if` branch.
    pub(super) fn handle_else(&mut self, command: &ScriptCommand) -> Flow {
        if let Some(target) = command.target {
            self.program_counter = target;
        }
        Flow::Continue
    }

    /// Presents the run of consecutive `choice` lines starting at `index`.
    /// The program counter stays on the first line so conditions are
    /// re-evaluated every time the block is reached.
    pub(super) fn handle_choice(&mut self, index: usize) -> Result<Flow, RuntimeError> {
        let commands = Rc::clone(&self.commands);
        let mut end = index;
        let mut options = Vec::new();

        while let Some(command) = commands.get(end) {
            if command.kind != CommandKind::Choice {
                break;
            }
            end += 1;

            let condition = command
                .parameter(2)
                .filter(|condition| !condition.is_empty());
            if let Some(condition) = condition {
                if !self.evaluate_condition(condition, Some(command.source_line))? {
                    continue;
                }
            }

            options.push(ChoiceOption {
                index: options.len(),
                text: self.interpolate(command.parameter(0).unwrap_or_default()),
                target_label: command.parameter(1).unwrap_or_default().to_string(),
                condition: condition.map(str::to_string),
                effects: command.parameters.iter().skip(3).cloned().collect(),
                source_line: command.source_line,
            });
        }

        if options.is_empty() {
            debug!("no choice options available; skipping block");
            self.program_counter = end;
            return Ok(Flow::Continue);
        }

        self.program_counter = index;
        self.choice_options.extend(options.iter().cloned());
        self.pending_boundary = Some(PendingBoundary::Choice { options });
        Ok(Flow::Suspend)
    }

    pub(super) fn handle_set_variable(
        &mut self,
        command: &ScriptCommand,
    ) -> Result<Flow, RuntimeError> {
        let name = command.parameter(0).unwrap_or_default();
        let value = match (command.parameter(1), command.parameter(2)) {
            (Some("="), Some(expression)) => self
                .evaluate_to_text(expression)
                .map_err(|reason| command_failed(command, reason))?,
            (Some(value), _) => self.interpolate(value),
            _ => String::new(),
        };

        let scope = if command.keyword == "setglobal" {
            ScopeId::ROOT
        } else {
            self.active_scope
        };
        self.scopes.set(scope, name, value);
        Ok(Flow::Continue)
    }

    pub(super) fn handle_set_flag(&mut self, command: &ScriptCommand) -> Flow {
        let name = command.parameter(0).unwrap_or_default();
        let value = command.parameter(1) == Some("true");
        let scope = if command.keyword == "setglobalflag" {
            ScopeId::ROOT
        } else {
            self.active_scope
        };
        self.scopes.set_flag(scope, name, value);
        Flow::Continue
    }

    pub(super) fn handle_host_event(&mut self, command: &ScriptCommand) -> Flow {
        let mut args = command
            .parameters
            .iter()
            .map(|parameter| self.interpolate(parameter))
            .collect::<Vec<_>>();
        let first = if args.is_empty() {
            String::new()
        } else {
            args.remove(0)
        };

        let event = match command.kind {
            CommandKind::PlaySound => HostEvent::PlaySound { file: first },
            CommandKind::PlayBgm => HostEvent::PlayBgm { file: first },
            CommandKind::StopBgm => HostEvent::StopBgm,
            CommandKind::ShowCharacter => HostEvent::ShowCharacter { name: first, args },
            CommandKind::HideCharacter => HostEvent::HideCharacter { name: first },
            CommandKind::ChangeBackground => HostEvent::ChangeBackground { name: first },
            CommandKind::Animation => {
                args.insert(0, first);
                HostEvent::Animation { args }
            }
            CommandKind::SpecialEffect => {
                args.insert(0, first);
                HostEvent::SpecialEffect { args }
            }
            _ => return Flow::Continue,
        };
        self.events.push(event);
        Flow::Continue
    }

    pub(super) fn handle_wait(&mut self, command: &ScriptCommand) -> Flow {
        let seconds = command
            .parameter(0)
            .and_then(|value| value.parse::<f32>().ok())
            .unwrap_or(0.0);
        self.wait_remaining = seconds;
        self.state = ExecutionState::Waiting;
        Flow::Suspend
    }

    pub(super) fn handle_call(&mut self, command: &ScriptCommand) -> Result<Flow, RuntimeError> {
        self.enter_call(
            command.parameter(0).unwrap_or_default(),
            Some(command.source_line),
        )?;
        Ok(Flow::Continue)
    }

    pub(super) fn handle_return(&mut self, command: &ScriptCommand) -> Result<Flow, RuntimeError> {
        self.leave_call(Some(command.source_line))?;
        Ok(Flow::Continue)
    }

    pub(super) fn handle_custom(&mut self, command: &ScriptCommand) -> Result<Flow, RuntimeError> {
        let arguments = command
            .parameters
            .iter()
            .map(|parameter| self.interpolate(parameter))
            .collect::<Vec<_>>();
        let Some(handler) = self.custom_commands.get_mut(&command.keyword) else {
            return Err(command_failed(command, "no handler is registered"));
        };
        if handler(&arguments) {
            Ok(Flow::Continue)
        } else {
            Err(command_failed(command, "handler reported failure"))
        }
    }
}
