#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Valid values for `jobs.status`.
pub const JOB_STATUSES: [&str; 3] = ["open", "closed", "on_hold"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn is_valid_status(status: &str) -> bool {
    JOB_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_statuses_accepted() {
        assert!(is_valid_status("open"));
        assert!(is_valid_status("closed"));
        assert!(is_valid_status("on_hold"));
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(!is_valid_status("paused"));
        assert!(!is_valid_status("OPEN"));
        assert!(!is_valid_status(""));
    }
}
