use std::collections::BTreeSet;

use log::debug;
use vn_core::{RuntimeError, ScriptCommand};
use vn_parser::{parse_line, LineItem};

use super::{PendingBoundary, ScriptInterpreter};

impl ScriptInterpreter {
    /// Releases a dialogue suspension. Returns `false` when no dialogue line
    /// was waiting.
    pub fn acknowledge(&mut self) -> bool {
        if self.pending_boundary != Some(PendingBoundary::Dialogue) {
            return false;
        }
        self.pending_boundary = None;
        true
    }

    /// Picks option `index` of the pending choice: its effects are applied in
    /// order, then execution continues at its target label on the next tick.
    pub fn select_choice(&mut self, index: usize) -> Result<(), RuntimeError> {
        let Some(PendingBoundary::Choice { options }) = &self.pending_boundary else {
            return Err(RuntimeError::NoPendingChoice);
        };
        let option = options
            .get(index)
            .cloned()
            .ok_or(RuntimeError::ChoiceOutOfRange {
                index,
                available: options.len(),
            })?;

        self.pending_boundary = None;
        self.choice_options.clear();
        debug!("choice {} selected: \"{}\"", index, option.text);

        for effect in &option.effects {
            self.apply_choice_effect(effect, option.source_line)
                .map_err(|runtime_error| self.halt(runtime_error))?;
        }
        self.goto_label(&option.target_label)
            .map_err(|runtime_error| self.halt(runtime_error))
    }

    fn apply_choice_effect(&mut self, effect: &str, line: usize) -> Result<(), RuntimeError> {
        let invalid = |reason: String| RuntimeError::CommandFailed {
            keyword: "choice".to_string(),
            line: Some(line),
            reason,
        };
        let command: ScriptCommand = match parse_line(effect, line, &BTreeSet::new()) {
            Ok(Some(LineItem::Command(command))) => command,
            Ok(_) => return Err(invalid(format!("effect \"{}\" is empty", effect))),
            Err(load_error) => return Err(invalid(load_error.to_string())),
        };
        self.execute_command(&command, self.program_counter)
            .map(|_| ())
    }
}
