//! Conversation pathway definitions.
//!
//! A `Pathway` is the scripted conversation graph the voice agent follows
//! once a call connects. The dial-out core treats it as opaque: it is
//! deserialized at the boundary, carried inside the dial-out target, and
//! handed to whatever builds the media pipeline.

use serde::{Deserialize, Serialize};

/// A transition from one node to another, taken when `condition` holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// ID of the node this edge leads to.
    pub target_id: String,
    /// Natural-language condition evaluated by the agent.
    pub condition: String,
}

/// A single step of the conversation script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Instructions given to the model for this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Fixed text spoken verbatim, when the step is scripted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A node together with its outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub node: Node,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// The complete conversation graph for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pathway {
    /// Message left when the call reaches voicemail.
    pub voicemail_message: String,
    /// System prompt applied to the whole conversation.
    pub global_prompt: String,
    pub segments: Vec<Segment>,
}
