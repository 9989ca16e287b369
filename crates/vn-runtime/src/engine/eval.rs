use std::sync::OnceLock;

use log::warn;
use regex::Regex;
use rhai::{Dynamic, Engine, Scope, FLOAT, INT};
use vn_core::RuntimeError;

use super::ScriptInterpreter;

const EXPRESSION_MAX_OPERATIONS: u64 = 10_000;

pub(super) fn build_expression_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_strict_variables(true);
    engine.set_max_operations(EXPRESSION_MAX_OPERATIONS);
    engine
}

fn interpolation_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\$\{([^{}]+)\}").expect("template regex must compile"))
}

fn string_literal_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`[^`]*`"#)
            .expect("string literal regex must compile")
    })
}

fn identifier_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").expect("identifier regex must compile")
    })
}

/// Script variables are strings; expressions see them as the most specific
/// rhai value they parse as.
fn text_to_dynamic(value: &str) -> Dynamic {
    match value {
        "true" => return Dynamic::TRUE,
        "false" => return Dynamic::FALSE,
        _ => {}
    }
    if let Ok(int) = value.parse::<INT>() {
        return Dynamic::from(int);
    }
    if let Ok(float) = value.parse::<FLOAT>() {
        if float.is_finite() {
            return Dynamic::from(float);
        }
    }
    Dynamic::from(value.to_string())
}

fn dynamic_to_text(value: Dynamic) -> String {
    if value.is_unit() {
        return String::new();
    }
    value.to_string()
}

/// Names an expression reads, ignoring string literals, function calls and
/// method/property access.
fn referenced_identifiers(expression: &str) -> Vec<String> {
    let stripped = string_literal_regex().replace_all(expression, "\"\"");
    let bytes = stripped.as_bytes();
    let mut names = Vec::new();
    for found in identifier_regex().find_iter(&stripped) {
        let name = found.as_str();
        if matches!(name, "true" | "false") {
            continue;
        }
        if found.start() > 0 && bytes[found.start() - 1] == b'.' {
            continue;
        }
        let is_call = stripped[found.end()..].trim_start().starts_with('(');
        if is_call || names.iter().any(|existing| existing == name) {
            continue;
        }
        names.push(name.to_string());
    }
    names
}

impl ScriptInterpreter {
    /// Evaluates `expression` against the visible variables and flags.
    /// Variables shadow flags of the same name; names defined nowhere read as
    /// `false`.
    pub(super) fn evaluate_expression(&self, expression: &str) -> Result<Dynamic, String> {
        let visible = self.scopes.snapshot(self.active_scope);
        let mut scope = Scope::new();
        for (name, value) in &visible.flags {
            scope.push_dynamic(name.as_str(), Dynamic::from(*value));
        }
        for (name, value) in &visible.variables {
            scope.push_dynamic(name.as_str(), text_to_dynamic(value));
        }
        for name in referenced_identifiers(expression) {
            if !scope.contains(&name) {
                scope.push_dynamic(name, Dynamic::FALSE);
            }
        }

        self.expression_engine
            .eval_expression_with_scope::<Dynamic>(&mut scope, expression)
            .map_err(|error| error.to_string())
    }

    /// Condition check for `if` and choice options. Malformed or non-boolean
    /// conditions are false unless strict conditions are enabled.
    pub(super) fn evaluate_condition(
        &self,
        expression: &str,
        line: Option<usize>,
    ) -> Result<bool, RuntimeError> {
        let reason = match self.evaluate_expression(expression) {
            Ok(value) => match value.as_bool() {
                Ok(result) => return Ok(result),
                Err(type_name) => format!("expected a boolean, got {}", type_name),
            },
            Err(reason) => reason,
        };

        if self.options.strict_conditions {
            return Err(RuntimeError::UndefinedCondition {
                expression: expression.to_string(),
                line,
                reason,
            });
        }
        warn!(
            "condition `{}`{} treated as false: {}",
            expression,
            line.map(|line| format!(" on line {}", line))
                .unwrap_or_default(),
            reason
        );
        Ok(false)
    }

    pub(super) fn evaluate_to_text(&self, expression: &str) -> Result<String, String> {
        self.evaluate_expression(expression).map(dynamic_to_text)
    }

    /// Expands `${name}` and `${expression}` placeholders. Plain names read
    /// variables first, then flags; unknown names expand to nothing.
    pub(super) fn interpolate(&self, template: &str) -> String {
        if !template.contains("${") {
            return template.to_string();
        }

        let mut output = String::new();
        let mut last_index = 0usize;
        for captures in interpolation_regex().captures_iter(template) {
            let (Some(full), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            output.push_str(&template[last_index..full.start()]);
            output.push_str(&self.render_placeholder(inner.as_str().trim()));
            last_index = full.end();
        }
        output.push_str(&template[last_index..]);
        output
    }

    fn render_placeholder(&self, inner: &str) -> String {
        if vn_parser::is_identifier(inner) {
            if let Some(value) = self.scopes.get(self.active_scope, inner) {
                return value.to_string();
            }
            if self.scopes.has_flag(self.active_scope, inner) {
                return self.scopes.get_flag(self.active_scope, inner).to_string();
            }
            return String::new();
        }

        match self.evaluate_to_text(inner) {
            Ok(text) => text,
            Err(reason) => {
                warn!("placeholder `{}` could not be rendered: {}", inner, reason);
                String::new()
            }
        }
    }
}
