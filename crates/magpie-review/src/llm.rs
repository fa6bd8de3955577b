use serde::{Deserialize, Serialize};

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use magpie_review::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage {
///     role: Role::User,
///     content: "Review this diff".into(),
/// };
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use magpie_review::llm::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// One fully-assembled completion request.
///
/// Built exactly once by the orchestrator and consumed by the router.
/// `model` may carry a provider prefix (`azure/...`); `system` already
/// contains the agent role text plus the standards bundle.
///
/// # Examples
///
/// ```
/// use magpie_review::llm::{CompletionRequest, Role};
///
/// let request = CompletionRequest {
///     model: "gpt-4o".into(),
///     system: "You are a reviewer.".into(),
///     user: "Review this:\n+x = 1".into(),
/// };
/// let messages = request.messages();
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// ```
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Provider-qualified model identifier.
    pub model: String,
    /// System message content.
    pub system: String,
    /// User message content.
    pub user: String,
}

impl CompletionRequest {
    /// The ordered role-tagged message list for the wire body.
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: Role::System,
                content: self.system.clone(),
            },
            ChatMessage {
                role: Role::User,
                content: self.user.clone(),
            },
        ]
    }
}
