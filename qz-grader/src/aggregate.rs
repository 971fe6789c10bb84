//! Grouping of the flat submission feed into per-student aggregates.

use crate::filter::FilteredView;
use qz_core::models::{StudentAggregate, StudentId, SubmissionRecord};
use std::cmp::Ordering;
use unicode_normalization::{UnicodeNormalization as _, char::is_combining_mark};

type IndexMap<K, V> = indexmap::IndexMap<K, V, rustc_hash::FxBuildHasher>;

/// The students of one fetch, in display order.
///
/// Students are addressed by their position in the roster and submissions by
/// their ordinal within the student's sequence. Both stay valid until the
/// roster is rebuilt; filtering never renumbers them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    students: Vec<StudentAggregate>,
    positions: IndexMap<StudentId, usize>,
}

impl Roster {
    /// All students, ordered by name.
    pub fn students(&self) -> &[StudentAggregate] {
        &self.students
    }

    /// The student at `position`.
    pub fn get(&self, position: usize) -> Option<&StudentAggregate> {
        self.students.get(position)
    }

    /// The position of the student with the given ID.
    pub fn position_of(&self, student_id: &StudentId) -> Option<usize> {
        self.positions.get(student_id).copied()
    }

    /// The student with the given ID.
    pub fn find(&self, student_id: &StudentId) -> Option<&StudentAggregate> {
        self.position_of(student_id).and_then(|position| self.get(position))
    }

    /// Number of students.
    pub fn len(&self) -> usize {
        self.students.len()
    }

    /// True if no submissions were ingested.
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Total number of submissions across all students.
    pub fn submission_count(&self) -> usize {
        self.students.iter().map(|s| s.submissions.len()).sum()
    }

    /// Materialize a filtered view as a roster of its own.
    ///
    /// Only the visible submissions are kept, so ordinals in the result may
    /// differ from those in `self`. Entries of `view` that do not exist in
    /// this roster are ignored.
    pub fn narrow(&self, view: &FilteredView) -> Roster {
        let records = view
            .students()
            .iter()
            .filter_map(|visible| Some((self.students.get(visible.student)?, visible)))
            .flat_map(|(student, visible)| {
                visible
                    .submissions
                    .iter()
                    .filter_map(move |&ordinal| student.submissions.get(ordinal).cloned())
            });
        aggregate(records)
    }

    fn from_students(students: Vec<StudentAggregate>) -> Self {
        let positions = students
            .iter()
            .enumerate()
            .map(|(position, student)| (student.student_id.clone(), position))
            .collect();
        Self {
            students,
            positions,
        }
    }
}

/// Group submissions by student.
///
/// - The first record seen for a student fixes their name; later records are
///   not checked against it.
/// - Each student's submissions are ordered by creation time. Equal creation
///   times keep their input order.
/// - Students are ordered by full name, ignoring case. Students whose names
///   compare equal keep the order in which they were first seen.
///
/// The function is pure; an empty input yields an empty roster.
pub fn aggregate(records: impl IntoIterator<Item = SubmissionRecord>) -> Roster {
    let mut groups: IndexMap<StudentId, StudentAggregate> = IndexMap::default();

    for record in records {
        groups
            .entry(record.student_id.clone())
            .or_insert_with(|| StudentAggregate::named_after(&record))
            .submissions
            .push(record);
    }

    let mut students: Vec<StudentAggregate> = groups.into_values().collect();
    for student in &mut students {
        // `sort_by_key` is stable, which is what keeps equal timestamps in input order
        student.submissions.sort_by_key(|submission| submission.creation_time);
    }
    students.sort_by(|a, b| compare_names(&a.full_name, &b.full_name));

    Roster::from_students(students)
}

/// Case-insensitive name ordering.
///
/// Names are compared on their base letters first, so `Élan` sorts among the
/// E's; accents only break ties between otherwise equal names.
fn compare_names(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| lowercase(a).cmp(lowercase(b)))
}

fn base_letters(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd()
        .filter(|&c| !is_combining_mark(c))
        .flat_map(char::to_lowercase)
}

fn lowercase(name: &str) -> impl Iterator<Item = char> + '_ {
    name.chars().flat_map(char::to_lowercase)
}
