mod datetime;
mod ids;
mod rubric;
mod score;
mod student;
mod submission;

pub use datetime::{DateTime, RawDateTime};
pub use ids::StudentId;
pub use rubric::{RubricError, RubricKey, ScoreMap, ScoreValue};
pub use score::{RawScoreRecord, ScoreRecord};
pub use student::StudentAggregate;
pub use submission::{SubmissionPayload, SubmissionRecord};
