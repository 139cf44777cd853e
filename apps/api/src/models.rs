use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription tier resolved by the auth gateway.
/// Anything other than `premium` is treated as free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
}

impl Plan {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("premium") {
            Plan::Premium
        } else {
            Plan::Free
        }
    }

    pub fn is_premium(self) -> bool {
        self == Plan::Premium
    }
}

/// The authenticated caller, resolved per-request by the auth gateway and
/// extracted from its headers. Usage mutation happens remotely via the
/// identity client, never on this struct.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub plan: Plan,
    pub free_usage: u32,
}

/// One persisted generation artifact. Append-only: inserted exactly once per
/// successful generation, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreationRow {
    pub id: Uuid,
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub r#type: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_parse_is_case_insensitive() {
        assert_eq!(Plan::parse("premium"), Plan::Premium);
        assert_eq!(Plan::parse("Premium"), Plan::Premium);
        assert_eq!(Plan::parse("free"), Plan::Free);
        assert_eq!(Plan::parse("trial"), Plan::Free);
        assert_eq!(Plan::parse(""), Plan::Free);
    }
}
