use serde::{Deserialize, Serialize};

/// Liveness of one conversation's current streamed run.
///
/// Stored as an integer code so that every backend (Redis string values,
/// the in-process map) agrees on the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Terminated,
}

impl SessionStatus {
    pub fn code(&self) -> i64 {
        match self {
            SessionStatus::Active => 1,
            SessionStatus::Completed => 0,
            SessionStatus::Terminated => -1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(SessionStatus::Active),
            0 => Some(SessionStatus::Completed),
            -1 => Some(SessionStatus::Terminated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Terminated => "terminated",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SessionStatus::Active.code(), 1);
        assert_eq!(SessionStatus::Completed.code(), 0);
        assert_eq!(SessionStatus::Terminated.code(), -1);

        for status in [
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Terminated,
        ] {
            assert_eq!(SessionStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(SessionStatus::from_code(7), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&SessionStatus::Terminated).unwrap();
        assert_eq!(json, "\"terminated\"");
        assert!(SessionStatus::Active.is_active());
        assert!(!SessionStatus::Completed.is_active());
    }
}
