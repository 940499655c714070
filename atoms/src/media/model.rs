use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to an uploaded completion photo.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PhotoProof {
    /// Stable object-store reference; what gets stored on the task row.
    pub reference: String,
    pub uploaded_at: DateTime<Utc>,
}
