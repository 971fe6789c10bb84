//! Configuration for the grading engine.
//!
//! The configuration fixes the store key scheme and the filtering policy for
//! a session.

use crate::filter::FilterMode;
use qz_core::models::StudentId;
use serde::{Deserialize, Serialize};

/// Engine configuration.
///
/// # Key scheme
///
/// Submissions are every key starting with `submission_prefix`. A student's
/// score record lives at `result_prefix` followed by their student ID, so the
/// default scheme stores the scores of student `42` under `result-42`.
///
/// # Examples
///
/// ```
/// use qz_grader::{config::GraderConfig, filter::FilterMode};
///
/// let config = GraderConfig::default();
/// assert_eq!(config.result_key(&"42".into()), "result-42");
/// assert_eq!(config.filter_mode, FilterMode::Flatten);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraderConfig {
    /// Prefix shared by all submission keys
    #[serde(default = "default_submission_prefix")]
    pub submission_prefix: String,

    /// Prefix of the per-student score record keys
    #[serde(default = "default_result_prefix")]
    pub result_prefix: String,

    /// Which submissions of a student are selectable after filtering
    #[serde(default)]
    pub filter_mode: FilterMode,

    /// How many entries to fetch from the store at once during a refresh
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

fn default_submission_prefix() -> String {
    "submission".to_owned()
}

fn default_result_prefix() -> String {
    "result-".to_owned()
}

fn default_fetch_concurrency() -> usize {
    8
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            submission_prefix: default_submission_prefix(),
            result_prefix: default_result_prefix(),
            filter_mode: FilterMode::default(),
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

impl GraderConfig {
    /// The key of a student's score record.
    pub fn result_key(&self, student_id: &StudentId) -> String {
        format!("{}{}", self.result_prefix, student_id)
    }

    /// The student a score record key belongs to, if it is one.
    pub fn student_for_result_key(&self, key: &str) -> Option<StudentId> {
        key.strip_prefix(&self.result_prefix)
            .filter(|id| !id.is_empty())
            .map(StudentId::from)
    }
}
