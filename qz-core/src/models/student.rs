use super::{StudentId, SubmissionRecord};

/// All the submissions of one student, oldest first.
///
/// Aggregates are rebuilt wholesale from the submission feed; they are never
/// patched in place. Every submission in `submissions` carries `student_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentAggregate {
    /// The student's identifier, unique within a roster
    pub student_id: StudentId,
    /// `"{lastName}, {firstName}"`
    pub full_name: String,
    /// Lowercased `"{full_name} {student_id}"`, the haystack for searches
    pub match_string: String,
    /// Submissions in ascending creation order
    pub submissions: Vec<SubmissionRecord>,
}

impl StudentAggregate {
    /// Start an aggregate whose names are taken from `first`.
    ///
    /// The submission itself is not added.
    pub fn named_after(first: &SubmissionRecord) -> Self {
        let full_name = format!("{}, {}", first.last_name, first.first_name);
        let match_string = format!("{} {}", full_name, first.student_id).to_lowercase();

        Self {
            student_id: first.student_id.clone(),
            full_name,
            match_string,
            submissions: Vec::new(),
        }
    }

    /// The most recent submission, if any.
    pub fn latest(&self) -> Option<&SubmissionRecord> {
        self.submissions.last()
    }
}
