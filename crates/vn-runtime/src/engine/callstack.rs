use log::debug;
use vn_core::{ExecutionState, RuntimeError};

use super::{CallStackFrame, ScriptInterpreter};

impl ScriptInterpreter {
    /// Moves the program counter to `name`. Called by the host this also
    /// releases any dialogue, choice or timed suspension.
    pub fn jump_to_label(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.goto_label(name)?;
        self.release_suspension();
        Ok(())
    }

    pub fn jump_to_line(&mut self, position: usize) -> Result<(), RuntimeError> {
        if position > self.commands.len() {
            return Err(RuntimeError::InvalidPosition {
                position,
                len: self.commands.len(),
            });
        }
        self.program_counter = position;
        self.release_suspension();
        Ok(())
    }

    /// Calls the subroutine at `name` from the current program counter.
    pub fn call_label(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.enter_call(name, None)?;
        self.release_suspension();
        Ok(())
    }

    pub fn return_from_call(&mut self) -> Result<(), RuntimeError> {
        self.leave_call(None)?;
        self.release_suspension();
        Ok(())
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub(super) fn goto_label(&mut self, name: &str) -> Result<(), RuntimeError> {
        let position = self
            .labels
            .get(name)
            .map(|label| label.position)
            .ok_or_else(|| RuntimeError::UnknownLabel {
                name: name.to_string(),
            })?;
        debug!("jump to \"{}\" (command {})", name, position);
        self.program_counter = position;
        Ok(())
    }

    /// Pushes a frame returning to the current program counter and gives the
    /// callee a fresh child scope. The label is checked first so a failed
    /// call leaves the stacks untouched.
    pub(super) fn enter_call(
        &mut self,
        name: &str,
        line: Option<usize>,
    ) -> Result<(), RuntimeError> {
        if !self.labels.contains_key(name) {
            return Err(RuntimeError::UnknownLabel {
                name: name.to_string(),
            });
        }
        if self.call_stack.len() >= self.options.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.options.max_call_depth,
                line,
            });
        }
        self.call_stack.push(CallStackFrame {
            return_position: self.program_counter,
            saved_scope: self.active_scope,
        });
        self.active_scope = self.scopes.push_child(self.active_scope);
        debug!("call \"{}\" (depth {})", name, self.call_stack.len());
        self.goto_label(name)
    }

    pub(super) fn leave_call(&mut self, line: Option<usize>) -> Result<(), RuntimeError> {
        let frame = self
            .call_stack
            .pop()
            .ok_or(RuntimeError::EmptyCallStack { line })?;
        self.scopes.truncate(frame.saved_scope);
        self.active_scope = frame.saved_scope;
        self.program_counter = frame.return_position;
        debug!(
            "return to command {} (depth {})",
            frame.return_position,
            self.call_stack.len()
        );
        Ok(())
    }

    fn release_suspension(&mut self) {
        self.pending_boundary = None;
        self.choice_options.clear();
        if self.state == ExecutionState::Waiting {
            self.wait_remaining = 0.0;
            self.state = ExecutionState::Running;
        }
    }
}
