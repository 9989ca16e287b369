mod engine;

pub use engine::{
    CustomCommandHandler, InterpreterOptions, ScopeChain, ScopeId, ScriptInterpreter,
    VariableScope, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_STEPS_PER_TICK,
};
