use serde::{Deserialize, Serialize};

/// A user-chosen label for every signal sharing `data_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    pub id: i64,
    pub data_hash: String,
    pub name: String,
}
