use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One line of the chat audit log (`chatmessage` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            session_id,
        }
    }

    pub fn assistant(content: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_pattern() {
        let ok: ChatMessage =
            serde_json::from_value(serde_json::json!({"role": "assistant", "content": "hi"})).unwrap();
        assert_eq!(ok.role, ChatRole::Assistant);
        assert_eq!(ok.session_id, None);

        let bad = serde_json::json!({"role": "system", "content": "hi"});
        assert!(serde_json::from_value::<ChatMessage>(bad).is_err());
    }

    #[test]
    fn test_constructors_carry_session() {
        let m = ChatMessage::user("how much did I spend?", Some("s1".to_string()));
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["role"], "user");
        assert_eq!(v["session_id"], "s1");
    }
}
