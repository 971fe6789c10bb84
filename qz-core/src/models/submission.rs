use super::{DateTime, StudentId};
use serde::{Deserialize, Serialize};

/// The value a quiz client stores for each submission.
///
/// The creation time is not part of the value: it is taken from the store's
/// own metadata so it cannot be forged by the submitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Stable student identifier
    #[serde(rename = "studentID")]
    pub student_id: StudentId,
    /// An opaque hash of the student's identity, when the client computed one
    #[serde(rename = "hashedID", default, skip_serializing_if = "Option::is_none")]
    pub hashed_id: Option<String>,
    /// The submitted source code
    #[serde(default)]
    pub response: String,
}

/// One submitted artifact, as ingested from the store.
///
/// Records are never modified after ingestion; the engine only ever reorders
/// and filters them.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    /// The store key the submission was read from
    pub key: String,
    /// Stable student identifier
    pub student_id: StudentId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// An opaque hash of the student's identity, when present
    pub hashed_id: Option<String>,
    /// The submitted source code
    pub response: String,
    /// When the store received the submission
    pub creation_time: DateTime,
}

impl SubmissionRecord {
    /// Combine a stored payload with the key and creation time reported by the store.
    pub fn new(key: impl Into<String>, creation_time: DateTime, payload: SubmissionPayload) -> Self {
        let SubmissionPayload {
            first_name,
            last_name,
            student_id,
            hashed_id,
            response,
        } = payload;

        Self {
            key: key.into(),
            student_id,
            first_name,
            last_name,
            hashed_id,
            response,
            creation_time,
        }
    }
}
