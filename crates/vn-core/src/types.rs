use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Variable consulted for the speaker of dialogue lines that do not name one.
pub const SPEAKER_VARIABLE: &str = "speaker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Dialogue,
    Jump,
    Label,
    Condition,
    Else,
    EndIf,
    Choice,
    SetVariable,
    SetFlag,
    PlaySound,
    PlayBgm,
    StopBgm,
    ShowCharacter,
    HideCharacter,
    ChangeBackground,
    Wait,
    Animation,
    SpecialEffect,
    Call,
    Return,
    End,
    Custom,
}

impl CommandKind {
    pub const ALL: [CommandKind; 22] = [
        CommandKind::Dialogue,
        CommandKind::Jump,
        CommandKind::Label,
        CommandKind::Condition,
        CommandKind::Else,
        CommandKind::EndIf,
        CommandKind::Choice,
        CommandKind::SetVariable,
        CommandKind::SetFlag,
        CommandKind::PlaySound,
        CommandKind::PlayBgm,
        CommandKind::StopBgm,
        CommandKind::ShowCharacter,
        CommandKind::HideCharacter,
        CommandKind::ChangeBackground,
        CommandKind::Wait,
        CommandKind::Animation,
        CommandKind::SpecialEffect,
        CommandKind::Call,
        CommandKind::Return,
        CommandKind::End,
        CommandKind::Custom,
    ];

    /// Commands that hold the program counter across ticks.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            CommandKind::Dialogue | CommandKind::Choice | CommandKind::Wait
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptCommand {
    pub kind: CommandKind,
    /// Leading keyword as written, empty for plain dialogue.
    pub keyword: String,
    pub parameters: Vec<String>,
    pub source_line: usize,
    pub raw: String,
    /// Command index resolved at load time for `if` and `else`.
    pub target: Option<usize>,
}

impl ScriptCommand {
    pub fn new(
        kind: CommandKind,
        keyword: impl Into<String>,
        parameters: Vec<String>,
        raw: impl Into<String>,
        source_line: usize,
    ) -> Self {
        Self {
            kind,
            keyword: keyword.into(),
            parameters,
            source_line,
            raw: raw.into(),
            target: None,
        }
    }

    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.parameters.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub name: String,
    pub position: usize,
    pub source_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueLine {
    pub speaker: Option<String>,
    pub text: String,
    pub source_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub index: usize,
    pub text: String,
    pub target_label: String,
    pub condition: Option<String>,
    pub effects: Vec<String>,
    pub source_line: usize,
}

/// Presentation and audio notifications for the host. The interpreter never
/// waits on these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HostEvent {
    PlaySound { file: String },
    PlayBgm { file: String },
    StopBgm,
    ShowCharacter { name: String, args: Vec<String> },
    HideCharacter { name: String },
    ChangeBackground { name: String },
    Animation { args: Vec<String> },
    SpecialEffect { args: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionState {
    NotStarted,
    Running,
    Waiting,
    Stopped,
}

/// Flattened view of the variables and flags visible from one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSnapshot {
    pub variables: BTreeMap<String, String>,
    pub flags: BTreeMap<String, bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_kinds_are_dialogue_choice_and_wait() {
        let blocking = CommandKind::ALL
            .iter()
            .copied()
            .filter(|kind| kind.is_blocking())
            .collect::<Vec<_>>();
        assert_eq!(
            blocking,
            vec![CommandKind::Dialogue, CommandKind::Choice, CommandKind::Wait]
        );
    }

    #[test]
    fn host_event_serializes_with_kind_tag() {
        let event = HostEvent::ShowCharacter {
            name: "alice".to_string(),
            args: vec!["happy".to_string(), "left".to_string()],
        };
        let json = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(json["kind"], "showCharacter");
        assert_eq!(json["name"], "alice");

        let stop = serde_json::to_value(HostEvent::StopBgm).expect("event should serialize");
        assert_eq!(stop["kind"], "stopBgm");
    }

    #[test]
    fn dialogue_line_serializes_camel_case() {
        let line = DialogueLine {
            speaker: Some("Bob".to_string()),
            text: "Hi".to_string(),
            source_line: 3,
        };
        let json = serde_json::to_value(&line).expect("line should serialize");
        assert_eq!(json["sourceLine"], 3);
        assert_eq!(json["speaker"], "Bob");
    }
}
