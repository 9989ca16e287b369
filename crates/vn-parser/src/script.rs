use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use vn_core::{CommandKind, Label, LoadError, ScriptCommand};

use crate::line::{parse_line, LineItem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedScript {
    pub commands: Vec<ScriptCommand>,
    pub labels: BTreeMap<String, Label>,
}

impl ParsedScript {
    pub fn label_position(&self, name: &str) -> Option<usize> {
        self.labels.get(name).map(|label| label.position)
    }
}

#[derive(Debug)]
struct OpenBlock {
    if_index: usize,
    else_index: Option<usize>,
    line: usize,
}

/// Parses a whole script in one pass. Labels point at the index of the next
/// command; `if`/`else` targets are resolved when their `endif` is seen.
pub fn parse_script(
    source: &str,
    custom_keywords: &BTreeSet<String>,
) -> Result<ParsedScript, LoadError> {
    let mut commands: Vec<ScriptCommand> = Vec::new();
    let mut labels: BTreeMap<String, Label> = BTreeMap::new();
    let mut blocks: Vec<OpenBlock> = Vec::new();

    for (offset, line) in source.lines().enumerate() {
        let line_number = offset + 1;
        let Some(item) = parse_line(line, line_number, custom_keywords)? else {
            continue;
        };

        let command = match item {
            LineItem::Label { name, line } => {
                if let Some(existing) = labels.get(&name) {
                    return Err(LoadError::DuplicateLabel {
                        name,
                        line,
                        first_line: existing.source_line,
                    });
                }
                labels.insert(
                    name.clone(),
                    Label {
                        name,
                        position: commands.len(),
                        source_line: line,
                    },
                );
                continue;
            }
            LineItem::Command(command) => command,
        };

        match command.kind {
            CommandKind::Condition => blocks.push(OpenBlock {
                if_index: commands.len(),
                else_index: None,
                line: line_number,
            }),
            CommandKind::Else => {
                let Some(block) = blocks.last_mut() else {
                    return Err(LoadError::malformed(
                        "else",
                        line_number,
                        "`else` without a matching `if`",
                    ));
                };
                if block.else_index.is_some() {
                    return Err(LoadError::malformed(
                        "else",
                        line_number,
                        format!("`if` on line {} already has an `else`", block.line),
                    ));
                }
                block.else_index = Some(commands.len());
            }
            CommandKind::EndIf => {
                let Some(block) = blocks.pop() else {
                    return Err(LoadError::malformed(
                        "endif",
                        line_number,
                        "`endif` without a matching `if`",
                    ));
                };
                let endif_index = commands.len();
                commands[block.if_index].target =
                    Some(block.else_index.map_or(endif_index, |index| index + 1));
                if let Some(else_index) = block.else_index {
                    commands[else_index].target = Some(endif_index);
                }
            }
            _ => {}
        }

        commands.push(command);
    }

    if let Some(block) = blocks.last() {
        return Err(LoadError::UnterminatedBlock { line: block.line });
    }

    for command in &commands {
        let target = match command.kind {
            CommandKind::Jump | CommandKind::Call => command.parameter(0),
            CommandKind::Choice => command.parameter(1),
            _ => None,
        };
        if let Some(name) = target {
            if !labels.contains_key(name) {
                return Err(LoadError::UnknownLabel {
                    name: name.to_string(),
                    line: command.source_line,
                });
            }
        }
    }

    debug!(
        "parsed script: {} commands, {} labels",
        commands.len(),
        labels.len()
    );
    Ok(ParsedScript { commands, labels })
}
