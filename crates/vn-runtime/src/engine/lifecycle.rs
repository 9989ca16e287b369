use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use log::info;
use vn_core::{
    ChoiceOption, DialogueLine, ExecutionState, HostEvent, Label, LoadError, RuntimeError,
    ScriptCommand, VariableSnapshot,
};
use vn_parser::{is_builtin_keyword, parse_script};

use super::{
    eval::build_expression_engine, InterpreterOptions, PendingBoundary, ScopeChain, ScopeId,
    ScriptInterpreter,
};

impl Default for ScriptInterpreter {
    fn default() -> Self {
        Self::new(InterpreterOptions::default())
    }
}

impl ScriptInterpreter {
    pub fn new(options: InterpreterOptions) -> Self {
        Self {
            options,
            commands: Rc::from(Vec::new()),
            labels: BTreeMap::new(),
            custom_commands: BTreeMap::new(),
            expression_engine: build_expression_engine(),
            scopes: ScopeChain::new(),
            active_scope: ScopeId::ROOT,
            call_stack: Vec::new(),
            program_counter: 0,
            current_index: None,
            state: ExecutionState::NotStarted,
            paused: false,
            wait_remaining: 0.0,
            pending_boundary: None,
            last_error: None,
            dialogue_lines: Vec::new(),
            choice_options: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    /// Parses `source` and replaces the loaded program. On failure the
    /// previous program and all runtime state stay untouched.
    pub fn load(&mut self, source: &str) -> Result<(), LoadError> {
        let custom_keywords = self.custom_commands.keys().cloned().collect::<BTreeSet<_>>();
        let parsed = parse_script(source, &custom_keywords)?;
        info!(
            "loaded script with {} commands and {} labels",
            parsed.commands.len(),
            parsed.labels.len()
        );

        self.commands = Rc::from(parsed.commands);
        self.labels = parsed.labels;
        self.scopes.reset();
        self.reset_runtime();
        self.state = ExecutionState::NotStarted;
        Ok(())
    }

    /// Unloads the program and forgets all variables.
    pub fn clear_script(&mut self) {
        self.commands = Rc::from(Vec::new());
        self.labels.clear();
        self.scopes.reset();
        self.reset_runtime();
        self.state = ExecutionState::NotStarted;
    }

    /// Starts (or restarts) from the first command. Global variables set by
    /// the host survive a restart; call-local scopes do not.
    pub fn start(&mut self) {
        self.reset_runtime();
        self.state = ExecutionState::Running;
        info!("script started ({} commands)", self.commands.len());
    }

    /// Cancels execution immediately and discards pending output.
    pub fn stop(&mut self) {
        self.call_stack.clear();
        self.scopes.truncate(ScopeId::ROOT);
        self.active_scope = ScopeId::ROOT;
        self.pending_boundary = None;
        self.wait_remaining = 0.0;
        self.dialogue_lines.clear();
        self.choice_options.clear();
        self.events.clear();
        self.state = ExecutionState::Stopped;
        info!("script stopped");
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    fn reset_runtime(&mut self) {
        self.call_stack.clear();
        self.scopes.truncate(ScopeId::ROOT);
        self.active_scope = ScopeId::ROOT;
        self.program_counter = 0;
        self.current_index = None;
        self.paused = false;
        self.wait_remaining = 0.0;
        self.pending_boundary = None;
        self.last_error = None;
        self.dialogue_lines.clear();
        self.choice_options.clear();
        self.events.clear();
    }

    /// Normal termination: the call stack and every call-local scope are
    /// released, globals stay readable.
    pub(super) fn finish(&mut self) {
        self.call_stack.clear();
        self.scopes.truncate(ScopeId::ROOT);
        self.active_scope = ScopeId::ROOT;
        self.pending_boundary = None;
        self.wait_remaining = 0.0;
        self.state = ExecutionState::Stopped;
        info!("script finished");
    }

    pub fn register_custom_command(
        &mut self,
        name: &str,
        handler: impl FnMut(&[String]) -> bool + 'static,
    ) -> Result<(), RuntimeError> {
        if is_builtin_keyword(name) {
            return Err(RuntimeError::ReservedCommand {
                name: name.to_string(),
            });
        }
        self.custom_commands.insert(name.to_string(), Box::new(handler));
        Ok(())
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// True while the script has not terminated, including timed waits.
    pub fn is_running(&self) -> bool {
        matches!(self.state, ExecutionState::Running | ExecutionState::Waiting)
    }

    pub fn is_waiting(&self) -> bool {
        self.state == ExecutionState::Waiting
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn wait_remaining(&self) -> f32 {
        self.wait_remaining
    }

    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    pub fn program_counter(&self) -> usize {
        self.program_counter
    }

    pub fn commands(&self) -> &[ScriptCommand] {
        &self.commands
    }

    pub fn labels(&self) -> &BTreeMap<String, Label> {
        &self.labels
    }

    /// The most recently executed command.
    pub fn current_command(&self) -> Option<&ScriptCommand> {
        self.current_index.and_then(|index| self.commands.get(index))
    }

    /// Source line of the most recently executed command.
    pub fn current_line(&self) -> Option<usize> {
        self.current_command().map(|command| command.source_line)
    }

    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.scopes.get(self.active_scope, name)
    }

    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.scopes.set(self.active_scope, name, value);
    }

    pub fn set_global_variable(&mut self, name: &str, value: &str) {
        self.scopes.set(ScopeId::ROOT, name, value);
    }

    pub fn get_flag(&self, name: &str) -> bool {
        self.scopes.get_flag(self.active_scope, name)
    }

    pub fn set_flag(&mut self, name: &str, value: bool) {
        self.scopes.set_flag(self.active_scope, name, value);
    }

    pub fn set_global_flag(&mut self, name: &str, value: bool) {
        self.scopes.set_flag(ScopeId::ROOT, name, value);
    }

    pub fn variables(&self) -> VariableSnapshot {
        self.scopes.snapshot(self.active_scope)
    }

    pub fn take_dialogue_lines(&mut self) -> Vec<DialogueLine> {
        std::mem::take(&mut self.dialogue_lines)
    }

    pub fn take_choice_options(&mut self) -> Vec<ChoiceOption> {
        std::mem::take(&mut self.choice_options)
    }

    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn awaiting_input(&self) -> bool {
        self.pending_boundary.is_some()
    }

    pub fn awaiting_dialogue(&self) -> bool {
        matches!(self.pending_boundary, Some(PendingBoundary::Dialogue))
    }

    /// Options of the choice currently waiting for `select_choice`.
    pub fn pending_choices(&self) -> Option<&[ChoiceOption]> {
        match &self.pending_boundary {
            Some(PendingBoundary::Choice { options }) => Some(options),
            _ => None,
        }
    }
}
