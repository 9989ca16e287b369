use std::path::PathBuf;

use vn_core::{ChoiceOption, DialogueLine, HostEvent};

#[derive(Debug, Clone)]
pub(crate) struct LoadedScript {
    pub(crate) path: PathBuf,
    pub(crate) source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundaryEvent {
    Choices,
    End,
}

/// Script output in the order it was produced.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TranscriptEntry {
    Host(HostEvent),
    Text(DialogueLine),
    Chosen { index: usize, text: String },
}

#[derive(Debug, Clone)]
pub(crate) struct BoundaryResult {
    pub(crate) event: BoundaryEvent,
    pub(crate) transcript: Vec<TranscriptEntry>,
    pub(crate) choices: Vec<ChoiceOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayCommandAction {
    NotHandled,
    Continue,
    Restart,
    Quit,
}
