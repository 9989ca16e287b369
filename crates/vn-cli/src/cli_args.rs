use clap::{Args, Parser, Subcommand};
use vn_runtime::{InterpreterOptions, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_STEPS_PER_TICK};

const MAX_TICK_SECONDS: f32 = 3600.0;

#[derive(Debug, Parser)]
#[command(name = "vn-cli")]
#[command(about = "Visual novel script player")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Check(CheckArgs),
    Play(PlayArgs),
    Agent(AgentArgs),
}

#[derive(Debug, Args)]
pub(crate) struct CheckArgs {
    #[arg(long = "script")]
    pub(crate) script: String,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct RuntimeArgs {
    /// Seconds of script time advanced by each tick.
    #[arg(long = "tick", default_value_t = 0.1, value_parser = parse_tick)]
    pub(crate) tick: f32,
    #[arg(long = "strict-conditions")]
    pub(crate) strict_conditions: bool,
    #[arg(
        long = "max-steps",
        default_value_t = DEFAULT_MAX_STEPS_PER_TICK,
        value_parser = parse_positive
    )]
    pub(crate) max_steps: usize,
    #[arg(
        long = "max-call-depth",
        default_value_t = DEFAULT_MAX_CALL_DEPTH,
        value_parser = parse_positive
    )]
    pub(crate) max_call_depth: usize,
}

fn parse_tick(raw: &str) -> Result<f32, String> {
    let seconds = raw
        .parse::<f32>()
        .map_err(|error| format!("invalid tick `{}`: {}", raw, error))?;
    if !seconds.is_finite() || !(0.0..=MAX_TICK_SECONDS).contains(&seconds) {
        return Err(format!(
            "tick must be between 0 and {} seconds, got `{}`",
            MAX_TICK_SECONDS, raw
        ));
    }
    Ok(seconds)
}

fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("value must be at least 1".to_string()),
        Ok(value) => Ok(value),
        Err(error) => Err(format!("invalid count `{}`: {}", raw, error)),
    }
}

impl RuntimeArgs {
    pub(crate) fn interpreter_options(&self) -> InterpreterOptions {
        InterpreterOptions {
            max_steps_per_tick: self.max_steps,
            strict_conditions: self.strict_conditions,
            max_call_depth: self.max_call_depth,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct PlayArgs {
    #[arg(long = "script")]
    pub(crate) script: String,
    #[command(flatten)]
    pub(crate) runtime: RuntimeArgs,
}

#[derive(Debug, Args)]
pub(crate) struct AgentArgs {
    #[command(subcommand)]
    pub(crate) command: AgentCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum AgentCommand {
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "script")]
    pub(crate) script: String,
    /// Choice indices answered in order; the run stops at the first choice
    /// left without an answer.
    #[arg(long = "choose")]
    pub(crate) choose: Vec<usize>,
    #[command(flatten)]
    pub(crate) runtime: RuntimeArgs,
}
