// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log persistence and replay into provider turns.

use autospares_core::StoreError;
use autospares_core::types::{ChatMessage, ChatRole, Turn, TurnPart, TurnRole};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one tool invocation, stored in assistant message metadata
/// and returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(tool: impl Into<String>, args: Value, result: Value) -> Self {
        Self {
            tool: tool.into(),
            args,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(tool: impl Into<String>, args: Value, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
            result: None,
            error: Some(error.into()),
        }
    }

    /// The payload handed back to the model as a function response.
    pub fn response_content(&self) -> Value {
        match (&self.result, &self.error) {
            (Some(result), _) => result.clone(),
            (None, Some(error)) => Value::String(error.clone()),
            (None, None) => Value::Null,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MessageMetadata {
    #[serde(default)]
    tool_results: Vec<ToolResult>,
}

/// `{"tool_results": [...]}` as stored on assistant messages.
pub fn encode_metadata(tool_results: &[ToolResult]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(&serde_json::json!({
        "tool_results": tool_results
    }))?)
}

/// Tool results recorded on a message. Unreadable metadata yields none.
pub fn decode_tool_results(message: &ChatMessage) -> Vec<ToolResult> {
    message
        .metadata
        .as_deref()
        .and_then(|raw| serde_json::from_str::<MessageMetadata>(raw).ok())
        .map(|m| m.tool_results)
        .unwrap_or_default()
}

/// Builds a message row stamped with a fresh id and the current time.
pub fn new_message(
    session_id: &str,
    role: ChatRole,
    content: &str,
    metadata: Option<String>,
) -> ChatMessage {
    ChatMessage {
        id: uuid::Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        role: role.to_string(),
        content: content.to_string(),
        metadata,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Replays stored messages, oldest first, as provider turns.
///
/// An assistant message carrying tool results expands to a model turn with
/// the function calls, a user turn with their responses, then the model text.
/// Unknown roles and empty bodies are skipped.
pub fn to_turns(messages: &[ChatMessage]) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role.parse::<ChatRole>() {
            Ok(ChatRole::User) => {
                if !message.content.trim().is_empty() {
                    turns.push(Turn::user_text(&message.content));
                }
            }
            Ok(ChatRole::Assistant) => {
                let results = decode_tool_results(message);
                if !results.is_empty() {
                    turns.extend(tool_exchange(&results));
                }
                if !message.content.trim().is_empty() {
                    turns.push(Turn::model_text(&message.content));
                }
            }
            Err(_) => {}
        }
    }
    turns
}

/// The call/response turn pair for a batch of executed tools.
pub fn tool_exchange(results: &[ToolResult]) -> [Turn; 2] {
    let calls = results
        .iter()
        .map(|r| TurnPart::FunctionCall {
            name: r.tool.clone(),
            args: r.args.clone(),
        })
        .collect();
    [
        Turn {
            role: TurnRole::Model,
            parts: calls,
        },
        function_responses(results),
    ]
}

/// A user turn answering each call with `{"content": result-or-error}`.
pub fn function_responses(results: &[ToolResult]) -> Turn {
    Turn {
        role: TurnRole::User,
        parts: results
            .iter()
            .map(|r| TurnPart::FunctionResponse {
                name: r.tool.clone(),
                response: serde_json::json!({ "content": r.response_content() }),
            })
            .collect(),
    }
}
