use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The current user's identity as reported by the `who_am_i` action.
///
/// Captured once per task (on first `who_am_i` dispatch) and held immutable
/// for the rest of the turn loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub is_public: bool,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    /// The simulated "today" used for date-dependent defaults.
    pub today: NaiveDate,
    pub wiki_hash: String,
}

impl Identity {
    pub fn public(today: NaiveDate, wiki_hash: impl Into<String>) -> Self {
        Self {
            is_public: true,
            user_id: None,
            name: None,
            email: None,
            department: None,
            location: None,
            today,
            wiki_hash: wiki_hash.into(),
        }
    }
}
