use std::collections::BTreeMap;
use std::rc::Rc;

use vn_core::{
    ChoiceOption, DialogueLine, ExecutionState, HostEvent, Label, RuntimeError, ScriptCommand,
};

mod boundary;
mod callstack;
mod eval;
mod handlers;
mod lifecycle;
mod scope;
mod step;

pub use scope::{ScopeChain, ScopeId, VariableScope};

pub const DEFAULT_MAX_STEPS_PER_TICK: usize = 10_000;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Host callback for a script keyword the interpreter does not know. Returning
/// `false` stops the script with `RuntimeError::CommandFailed`.
pub type CustomCommandHandler = Box<dyn FnMut(&[String]) -> bool>;

#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterOptions {
    /// Upper bound on commands dispatched by one `update` call.
    pub max_steps_per_tick: usize,
    /// Raise `RuntimeError::UndefinedCondition` instead of treating a
    /// malformed condition as false.
    pub strict_conditions: bool,
    /// Nested `call`s allowed before `RuntimeError::CallDepthExceeded`.
    pub max_call_depth: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_steps_per_tick: DEFAULT_MAX_STEPS_PER_TICK,
            strict_conditions: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CallStackFrame {
    return_position: usize,
    saved_scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq)]
enum PendingBoundary {
    Dialogue,
    Choice { options: Vec<ChoiceOption> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Suspend,
    Halt,
}

pub struct ScriptInterpreter {
    options: InterpreterOptions,
    commands: Rc<[ScriptCommand]>,
    labels: BTreeMap<String, Label>,
    custom_commands: BTreeMap<String, CustomCommandHandler>,
    expression_engine: rhai::Engine,

    scopes: ScopeChain,
    active_scope: ScopeId,
    call_stack: Vec<CallStackFrame>,

    program_counter: usize,
    current_index: Option<usize>,
    state: ExecutionState,
    paused: bool,
    wait_remaining: f32,
    pending_boundary: Option<PendingBoundary>,
    last_error: Option<RuntimeError>,

    dialogue_lines: Vec<DialogueLine>,
    choice_options: Vec<ChoiceOption>,
    events: Vec<HostEvent>,
}
