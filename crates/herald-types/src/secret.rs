use serde::{Deserialize, Serialize};

use std::fmt;

/// A wrapper that redacts secret values in Debug and Display output.
///
/// Wraps credentials (client secrets, SMTP passwords, bot tokens) and bearer
/// tokens. The actual value is accessible via `.expose()`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Redacted(String);

impl Redacted {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Show masked representation: last 4 chars visible.
    pub fn masked(&self) -> String {
        let len = self.0.chars().count();
        if len <= 4 {
            return "****".to_string();
        }
        let tail: String = self.0.chars().skip(len - 4).collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Redacted(\"***\")")
    }
}

impl fmt::Display for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatting_never_leaks_the_value() {
        let password = Redacted::new("smtp-app-password");
        assert_eq!(format!("{password}"), "***");
        assert!(!format!("{password:?}").contains("app-password"));
        assert_eq!(password.expose(), "smtp-app-password");
    }

    #[test]
    fn test_masked_keeps_last_four_chars() {
        assert_eq!(Redacted::new("webex-bot-token-9f2c").masked(), "****9f2c");
        assert_eq!(Redacted::new("abcd").masked(), "****");
        assert_eq!(Redacted::new("абв").masked(), "****");
        assert_eq!(Redacted::new("пароль-ключ").masked(), "****ключ");
    }

    #[test]
    fn test_deserializes_from_plain_string() {
        let secret: Redacted = serde_json::from_str("\"hunter22\"").unwrap();
        assert_eq!(secret.expose(), "hunter22");
    }

    #[test]
    fn test_blank_counts_as_empty() {
        assert!(Redacted::new("  ").is_empty());
        assert!(!Redacted::new("x").is_empty());
    }
}
