use super::{RubricKey, ScoreMap, ScoreValue};
use serde::{Deserialize, Serialize};

/// The persisted grading result for one student.
///
/// A student has at most one score record, and it applies to exactly one of
/// their submissions, identified by its position in the student's
/// chronologically ordered sequence. Grading a different submission replaces
/// the record rather than adding to it.
///
/// On the wire the record is a single flat object, with the criteria beside
/// the submission index:
///
/// ```json
/// { "submissionIndex": 1, "loop": "3", "overall": "2" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawScoreRecord", into = "RawScoreRecord")]
pub struct ScoreRecord {
    /// Which submission (by ordinal) these scores belong to
    pub submission_index: usize,
    /// The grades
    pub scores: ScoreMap,
}

impl ScoreRecord {
    /// A record with no grades for the given submission.
    pub fn new(submission_index: usize) -> Self {
        Self {
            submission_index,
            scores: ScoreMap::default(),
        }
    }

    /// A student counts as graded once the overall criterion is set.
    pub fn is_graded(&self) -> bool {
        self.scores.get(RubricKey::Overall).is_set()
    }
}

// Score records share their object with whatever else a client decided to
// store there, so we read through a loosely-typed shape and keep only the
// criteria we recognize.

/// The raw, flat shape of a score record.
#[derive(Serialize, Deserialize)]
pub struct RawScoreRecord {
    #[serde(rename = "submissionIndex", default)]
    submission_index: usize,
    #[serde(flatten)]
    fields: serde_json::Map<String, serde_json::Value>,
}

impl From<RawScoreRecord> for ScoreRecord {
    fn from(value: RawScoreRecord) -> Self {
        let scores = value
            .fields
            .into_iter()
            .filter_map(|(name, raw)| {
                let key = name.parse::<RubricKey>().ok()?;
                let value = serde_json::from_value::<ScoreValue>(raw).ok()?;
                Some((key, value))
            })
            .collect();

        Self {
            submission_index: value.submission_index,
            scores,
        }
    }
}

impl From<ScoreRecord> for RawScoreRecord {
    fn from(value: ScoreRecord) -> Self {
        let fields = value
            .scores
            .rubric()
            .filter(|(_, score)| score.is_set())
            .map(|(key, score)| {
                (
                    key.as_str().to_owned(),
                    serde_json::Value::String(score.as_str().to_owned()),
                )
            })
            .collect();

        Self {
            submission_index: value.submission_index,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_wire_shape() {
        let mut record = ScoreRecord::new(1);
        record.scores.set(RubricKey::Overall, ScoreValue::Emerging);
        record.scores.set(RubricKey::Loop, ScoreValue::Proficient);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({ "submissionIndex": 1, "loop": "3", "overall": "2" })
        );
    }

    #[test]
    fn test_reads_records_written_by_older_clients() {
        // Unknown fields and empty grades are tolerated, numeric grades accepted.
        let record: ScoreRecord = serde_json::from_value(json!({
            "submissionIndex": 2,
            "declaration": "1",
            "loop": "",
            "return": 3,
            "other": "note to self",
        }))
        .unwrap();

        assert_eq!(record.submission_index, 2);
        assert_eq!(record.scores.len(), 2);
        assert_eq!(record.scores.get(RubricKey::Declaration), ScoreValue::Unprepared);
        assert_eq!(record.scores.get(RubricKey::Return), ScoreValue::Proficient);
        assert_eq!(record.scores.get(RubricKey::Loop), ScoreValue::Unset);
        assert!(!record.is_graded());
    }

    #[test]
    fn test_overall_marks_graded() {
        let mut record = ScoreRecord::new(0);
        assert!(!record.is_graded());
        record.scores.set(RubricKey::Overall, ScoreValue::Unprepared);
        assert!(record.is_graded());
    }
}
