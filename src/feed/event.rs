//! Events emitted by the pipeline, and the request that starts a feed

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a pipeline event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    ModelInvocationProgress,
    ModelInvocationEnd,
    ToolInvocationProgress,
    ToolInvocationEnd,
    TokenChunk,
}

impl EventKind {
    /// End variants close a run's lifecycle; only these drive tool selection.
    pub fn is_end(self) -> bool {
        matches!(self, Self::ModelInvocationEnd | Self::ToolInvocationEnd)
    }
}

/// A tool call proposed by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallProposal {
    pub kind: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCallProposal {
    pub fn new(kind: impl Into<String>, args: Value) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }
}

/// Event payload, shaped by the event kind
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    ToolCalls(Vec<ToolCallProposal>),
    ToolResult(Value),
    TextDelta(String),
    Empty,
}

/// One event from the pipeline feed
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub kind: EventKind,
    /// Groups all events of one model/tool execution
    pub run_id: String,
    /// Pipeline step that emitted the event
    pub node_name: String,
    pub payload: Payload,
}

impl StreamEvent {
    pub const MODEL_NODE: &'static str = "invoke_model";
    pub const TOOL_NODE: &'static str = "invoke_tools";

    pub fn model_progress(run_id: impl Into<String>) -> Self {
        Self {
            kind: EventKind::ModelInvocationProgress,
            run_id: run_id.into(),
            node_name: Self::MODEL_NODE.to_string(),
            payload: Payload::Empty,
        }
    }

    pub fn model_end(run_id: impl Into<String>, tool_calls: Vec<ToolCallProposal>) -> Self {
        Self {
            kind: EventKind::ModelInvocationEnd,
            run_id: run_id.into(),
            node_name: Self::MODEL_NODE.to_string(),
            payload: Payload::ToolCalls(tool_calls),
        }
    }

    pub fn tool_progress(run_id: impl Into<String>) -> Self {
        Self {
            kind: EventKind::ToolInvocationProgress,
            run_id: run_id.into(),
            node_name: Self::TOOL_NODE.to_string(),
            payload: Payload::Empty,
        }
    }

    pub fn tool_end(run_id: impl Into<String>, result: Value) -> Self {
        Self {
            kind: EventKind::ToolInvocationEnd,
            run_id: run_id.into(),
            node_name: Self::TOOL_NODE.to_string(),
            payload: Payload::ToolResult(result),
        }
    }

    pub fn token(run_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: EventKind::TokenChunk,
            run_id: run_id.into(),
            node_name: String::new(),
            payload: Payload::TextDelta(text.into()),
        }
    }
}

/// Speaker of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "human" => Some(Role::Human),
            "ai" => Some(Role::Ai),
            _ => None,
        }
    }
}

/// One prior conversational message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

/// Input for one pipeline invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub history: Vec<HistoryEntry>,
    pub input: String,
}
