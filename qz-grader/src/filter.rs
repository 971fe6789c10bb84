//! Search and date filtering over a [`Roster`].

use crate::aggregate::Roster;
use qz_core::models::{DateTime, SubmissionRecord};
use serde::{Deserialize, Serialize};

/// Which submissions of a matching student are selectable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    /// Every submission at or before the cutoff is its own row.
    #[default]
    Flatten,
    /// Only the most recent submission at or before the cutoff is shown.
    LatestOnly,
}

/// The filter inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterQuery {
    /// Case-insensitive substring of `"{lastName}, {firstName} {studentID}"`
    pub text: String,
    /// Submissions created strictly after this instant are hidden
    pub max_date: Option<DateTime>,
}

impl FilterQuery {
    /// A query matching `text` with no date cutoff.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_date: None,
        }
    }

    /// Add a date cutoff.
    pub fn before(mut self, max_date: DateTime) -> Self {
        self.max_date = Some(max_date);
        self
    }
}

/// A student that survived filtering, with the ordinals of their visible submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleStudent {
    /// Position of the student in the roster
    pub student: usize,
    /// Ordinals of the visible submissions, ascending
    pub submissions: Vec<usize>,
}

/// One selectable row of a filtered view.
#[derive(Debug, Clone, Copy)]
pub struct ViewRow<'a> {
    /// Index of the student within the view
    pub student_index: usize,
    /// Ordinal of the submission within the student's sequence
    pub submission_index: usize,
    /// The submission itself
    pub record: &'a SubmissionRecord,
}

/// The result of filtering a roster.
///
/// A view only holds positions into the roster it was computed from, and is
/// meaningless once that roster is replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredView {
    mode: FilterMode,
    students: Vec<VisibleStudent>,
}

impl FilteredView {
    /// The policy the view was computed with.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// The visible students, in roster order.
    pub fn students(&self) -> &[VisibleStudent] {
        &self.students
    }

    /// The visible student at `student_index`.
    pub fn student(&self, student_index: usize) -> Option<&VisibleStudent> {
        self.students.get(student_index)
    }

    /// Whether `submission_index` of the `student_index`-th student is visible.
    pub fn contains(&self, student_index: usize, submission_index: usize) -> bool {
        self.student(student_index)
            .is_some_and(|visible| visible.submissions.binary_search(&submission_index).is_ok())
    }

    /// Number of visible students.
    pub fn len(&self) -> usize {
        self.students.len()
    }

    /// True if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Every selectable row, student by student, oldest submission first.
    pub fn rows<'a>(&'a self, roster: &'a Roster) -> impl Iterator<Item = ViewRow<'a>> + 'a {
        self.students
            .iter()
            .enumerate()
            .flat_map(move |(student_index, visible)| {
                let submissions = roster
                    .get(visible.student)
                    .map(|student| student.submissions.as_slice())
                    .unwrap_or_default();
                visible.submissions.iter().filter_map(move |&submission_index| {
                    submissions.get(submission_index).map(|record| ViewRow {
                        student_index,
                        submission_index,
                        record,
                    })
                })
            })
    }
}

/// Compute the visible part of `roster`.
///
/// The search text is lowercased and matched as a substring of each
/// student's match string; an empty search matches everyone. Students left
/// with no submissions at or before `max_date` are dropped.
///
/// Filtering is pure: the same inputs always produce the same view.
pub fn filter(roster: &Roster, query: &FilterQuery, mode: FilterMode) -> FilteredView {
    let needle = query.text.to_lowercase();

    let students = roster
        .students()
        .iter()
        .enumerate()
        .filter(|(_, student)| needle.is_empty() || student.match_string.contains(&needle))
        .filter_map(|(position, student)| {
            let eligible = student
                .submissions
                .iter()
                .enumerate()
                .filter(|(_, submission)| {
                    query
                        .max_date
                        .is_none_or(|max_date| submission.creation_time <= max_date)
                })
                .map(|(ordinal, _)| ordinal);

            let submissions: Vec<usize> = match mode {
                FilterMode::Flatten => eligible.collect(),
                // submissions are in ascending order, so the last eligible one is the latest
                FilterMode::LatestOnly => eligible.last().into_iter().collect(),
            };

            (!submissions.is_empty()).then_some(VisibleStudent {
                student: position,
                submissions,
            })
        })
        .collect();

    FilteredView { mode, students }
}
