use std::rc::Rc;

use log::{debug, error, warn};
use vn_core::{CommandKind, ExecutionState, RuntimeError, ScriptCommand};

use super::{Flow, ScriptInterpreter};

/// Remaining wait below this counts as elapsed. Absorbs f32 drift from summing
/// frame deltas such as 1/60.
const WAIT_EPSILON: f32 = 1e-4;

impl ScriptInterpreter {
    /// Advances the script by one host frame. Does nothing before `start`,
    /// after the script stops, while paused, or while dialogue or a choice is
    /// waiting for the host. A runtime error stops the script, is recorded in
    /// `last_error` and is returned.
    pub fn update(&mut self, delta_time: f32) -> Result<(), RuntimeError> {
        if self.paused {
            return Ok(());
        }

        match self.state {
            ExecutionState::NotStarted | ExecutionState::Stopped => return Ok(()),
            ExecutionState::Waiting => {
                self.wait_remaining -= delta_time.max(0.0);
                if self.wait_remaining > WAIT_EPSILON {
                    return Ok(());
                }
                debug!("wait elapsed");
                self.wait_remaining = 0.0;
                self.state = ExecutionState::Running;
            }
            ExecutionState::Running => {}
        }

        if self.pending_boundary.is_some() {
            return Ok(());
        }

        self.run_until_suspended()
            .map_err(|runtime_error| self.halt(runtime_error))
    }

    fn run_until_suspended(&mut self) -> Result<(), RuntimeError> {
        let commands = Rc::clone(&self.commands);
        for _ in 0..self.options.max_steps_per_tick {
            let index = self.program_counter;
            let Some(command) = commands.get(index) else {
                debug!("command list exhausted");
                self.finish();
                return Ok(());
            };

            self.current_index = Some(index);
            self.program_counter = index + 1;
            match self.execute_command(command, index)? {
                Flow::Continue => {}
                Flow::Suspend => return Ok(()),
                Flow::Halt => {
                    self.finish();
                    return Ok(());
                }
            }
        }

        warn!(
            "yielding after {} commands without a blocking command (program counter {})",
            self.options.max_steps_per_tick, self.program_counter
        );
        Ok(())
    }

    pub(super) fn execute_command(
        &mut self,
        command: &ScriptCommand,
        index: usize,
    ) -> Result<Flow, RuntimeError> {
        debug!(
            "line {}: {:?} {:?}",
            command.source_line, command.kind, command.parameters
        );
        match command.kind {
            CommandKind::Dialogue => Ok(self.handle_dialogue(command)),
            CommandKind::Jump => self.handle_jump(command),
            CommandKind::Label => Ok(Flow::Continue),
            CommandKind::Condition => self.handle_condition(command),
            CommandKind::Else => Ok(self.handle_else(command)),
            CommandKind::EndIf => Ok(Flow::Continue),
            CommandKind::Choice => self.handle_choice(index),
            CommandKind::SetVariable => self.handle_set_variable(command),
            CommandKind::SetFlag => Ok(self.handle_set_flag(command)),
            CommandKind::PlaySound
            | CommandKind::PlayBgm
            | CommandKind::StopBgm
            | CommandKind::ShowCharacter
            | CommandKind::HideCharacter
            | CommandKind::ChangeBackground
            | CommandKind::Animation
            | CommandKind::SpecialEffect => Ok(self.handle_host_event(command)),
            CommandKind::Wait => Ok(self.handle_wait(command)),
            CommandKind::Call => self.handle_call(command),
            CommandKind::Return => self.handle_return(command),
            CommandKind::End => Ok(Flow::Halt),
            CommandKind::Custom => self.handle_custom(command),
        }
    }

    /// Stops the script on `runtime_error` and records it.
    pub(super) fn halt(&mut self, runtime_error: RuntimeError) -> RuntimeError {
        error!("script halted: {}", runtime_error);
        self.finish();
        self.last_error = Some(runtime_error.clone());
        runtime_error
    }
}
