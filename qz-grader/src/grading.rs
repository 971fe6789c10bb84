//! The selection and scoring state machine.
//!
//! [`Grader`] performs no I/O. Loading a score record and writing one back
//! are done by the caller (usually a [`Session`](crate::Session)), which feeds
//! the results in. This keeps every transition synchronous and lets a save
//! that completes after the selection moved on be recognized and discarded.

use crate::{aggregate::Roster, error::GradeError, filter::FilteredView};
use qz_core::{
    models::{RubricKey, ScoreMap, ScoreRecord, ScoreValue, StudentId},
    ports::StoreError,
};
use tracing::{Level, event};

/// A validated selection request, ready to be entered once the student's
/// score record has been loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectTarget {
    /// Index of the student within the filtered view
    pub student_index: usize,
    /// The student's identifier
    pub student_id: StudentId,
    /// Ordinal of the submission within the student's sequence
    pub submission_index: usize,
}

/// The active selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    student_index: usize,
    student_id: StudentId,
    submission_index: usize,
    scores: ScoreMap,
    // The submission the stored record currently refers to, if any
    stored_index: Option<usize>,
    // Set once the scores of another submission have been dropped in memory
    replacing: bool,
    generation: u64,
    saving: bool,
}

impl Selection {
    /// Index of the student within the filtered view.
    pub fn student_index(&self) -> usize {
        self.student_index
    }

    /// The selected student.
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    /// Ordinal of the selected submission.
    pub fn submission_index(&self) -> usize {
        self.submission_index
    }

    /// The in-memory grades of the selected submission.
    pub fn scores(&self) -> &ScoreMap {
        &self.scores
    }

    /// True while a save issued for this selection has not completed.
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// The submission the student's stored record refers to, as last observed.
    pub fn stored_index(&self) -> Option<usize> {
        self.stored_index
    }

    fn matches(&self, save: &PendingSave) -> bool {
        self.generation == save.generation
            && self.student_id == save.student_id
            && self.submission_index == save.submission_index
    }
}

/// A score record waiting to be written.
///
/// The ticket remembers which selection it was issued for, so its outcome can
/// be ignored if the grader has moved on by the time it completes.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    /// The store key to write
    pub key: String,
    /// The full record to write
    pub record: ScoreRecord,
    student_id: StudentId,
    submission_index: usize,
    generation: u64,
}

impl PendingSave {
    /// The student the save belongs to.
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }
}

/// The result of staging a rubric edit.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedScore {
    /// The write to perform
    pub save: PendingSave,
    /// When the edit replaced the scores of another submission, that submission's ordinal
    pub replaced: Option<usize>,
}

/// How a completed save was reflected in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The save succeeded and the selection now mirrors the stored record
    Applied,
    /// The save failed; the in-memory grades are kept as they were
    Failed,
    /// The selection changed while the save was in flight; nothing was updated
    Stale,
}

/// Tracks the selected submission and its grades.
#[derive(Debug, Default)]
pub struct Grader {
    selection: Option<Selection>,
    generation: u64,
}

impl Grader {
    /// A grader with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active selection, if any.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Check a selection request against the current view.
    ///
    /// `student_index` addresses the view, `submission_index` the student's
    /// full submission sequence; the submission must be visible in the view.
    pub fn resolve(
        view: &FilteredView,
        roster: &Roster,
        student_index: usize,
        submission_index: usize,
    ) -> Result<SelectTarget, GradeError> {
        let out_of_range = GradeError::OutOfRange {
            student: student_index,
            submission: submission_index,
        };

        if !view.contains(student_index, submission_index) {
            return Err(out_of_range);
        }

        let student = view
            .student(student_index)
            .and_then(|visible| roster.get(visible.student))
            .ok_or(out_of_range)?;

        Ok(SelectTarget {
            student_index,
            student_id: student.student_id.clone(),
            submission_index,
        })
    }

    /// Enter the selected state for `target`, given the student's stored record.
    ///
    /// The stored grades are only shown if they belong to this submission;
    /// otherwise the selection starts ungraded, but remembers which
    /// submission the stored record refers to.
    pub fn enter(&mut self, target: SelectTarget, stored: Option<ScoreRecord>) -> &Selection {
        self.generation += 1;

        let stored_index = stored.as_ref().map(|record| record.submission_index);
        let scores = stored
            .filter(|record| record.submission_index == target.submission_index)
            .map(|record| record.scores)
            .unwrap_or_default();

        event!(
            Level::DEBUG,
            student = %target.student_id,
            submission = target.submission_index,
            ?stored_index,
            "selected submission"
        );

        self.selection.insert(Selection {
            student_index: target.student_index,
            student_id: target.student_id,
            submission_index: target.submission_index,
            scores,
            stored_index,
            replacing: false,
            generation: self.generation,
            saving: false,
        })
    }

    /// Release the selection. Nothing is persisted.
    pub fn clear(&mut self) {
        if let Some(selection) = self.selection.take() {
            event!(
                Level::DEBUG,
                student = %selection.student_id,
                submission = selection.submission_index,
                "cleared selection"
            );
        }
    }

    /// Record a fresh read of the selected student's stored record.
    ///
    /// Does nothing when no submission is selected.
    pub fn observe_stored(&mut self, stored: Option<&ScoreRecord>) {
        if let Some(selection) = self.selection.as_mut() {
            selection.stored_index = stored.map(|record| record.submission_index);
        }
    }

    /// Apply a rubric edit to the selection and produce the write that persists it.
    ///
    /// If the stored record refers to a different submission, its grades are
    /// not carried over: the new record holds only this edit, and the
    /// replacement is reported through [`StagedScore::replaced`] and a warning.
    ///
    /// Setting [`RubricKey::Overall`] also sets every ungraded criterion to
    /// the same value.
    ///
    /// # Errors
    ///
    /// - [`GradeError::NoSelection`] if nothing is selected
    /// - [`GradeError::Busy`] if the previous save for this selection is still in flight
    pub fn stage_score(
        &mut self,
        key: RubricKey,
        value: ScoreValue,
        result_key: impl Into<String>,
    ) -> Result<StagedScore, GradeError> {
        let selection = self.selection.as_mut().ok_or(GradeError::NoSelection)?;
        if selection.saving {
            return Err(GradeError::Busy);
        }

        let replaced = selection
            .stored_index
            .filter(|&stored| stored != selection.submission_index && !selection.replacing);

        if let Some(previous) = replaced {
            event!(
                Level::WARN,
                student = %selection.student_id,
                previous,
                current = selection.submission_index,
                "discarding scores recorded for another submission"
            );
            selection.scores = ScoreMap::default();
            selection.replacing = true;
        }

        apply_edit(&mut selection.scores, key, value);
        selection.saving = true;

        let record = ScoreRecord {
            submission_index: selection.submission_index,
            scores: selection.scores.clone(),
        };

        Ok(StagedScore {
            save: PendingSave {
                key: result_key.into(),
                record,
                student_id: selection.student_id.clone(),
                submission_index: selection.submission_index,
                generation: selection.generation,
            },
            replaced,
        })
    }

    /// Reflect the outcome of a save in memory.
    ///
    /// Outcomes of saves issued for an earlier selection are discarded: the
    /// write itself still happened, but the current selection is left alone.
    /// A failed save leaves the in-memory grades as they were.
    pub fn finish_save(&mut self, save: &PendingSave, result: Result<(), &StoreError>) -> SaveOutcome {
        let Some(selection) = self.selection.as_mut().filter(|selection| selection.matches(save)) else {
            event!(
                Level::INFO,
                student = %save.student_id,
                submission = save.submission_index,
                succeeded = result.is_ok(),
                "ignoring save for a superseded selection"
            );
            return SaveOutcome::Stale;
        };

        selection.saving = false;
        match result {
            Ok(()) => {
                selection.stored_index = Some(save.submission_index);
                selection.replacing = false;
                SaveOutcome::Applied
            }
            Err(err) => {
                event!(
                    Level::ERROR,
                    key = save.key,
                    err = err.to_string(),
                    "failed to save scores"
                );
                SaveOutcome::Failed
            }
        }
    }

    /// Forget a save whose outcome will never be reported.
    ///
    /// A caller that stops waiting on a save (for instance because the future
    /// driving it was dropped) never calls [`Grader::finish_save`]. This
    /// releases the selection so edits are accepted again; whether the write
    /// reached the store is unknown, so the stored record should be observed
    /// again before the next edit. Returns whether a save was pending.
    pub fn abandon_save(&mut self) -> bool {
        let Some(selection) = self.selection.as_mut().filter(|selection| selection.saving) else {
            return false;
        };

        event!(
            Level::WARN,
            student = %selection.student_id,
            submission = selection.submission_index,
            "previous save was interrupted"
        );
        selection.saving = false;
        true
    }
}

/// Merge one edit into `scores`, cascading the overall grade.
pub fn apply_edit(scores: &mut ScoreMap, key: RubricKey, value: ScoreValue) {
    scores.set(key, value);

    if key == RubricKey::Overall && value.is_set() {
        for other in RubricKey::ALL {
            if other != RubricKey::Overall && !scores.get(other).is_set() {
                scores.set(other, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::aggregate,
        filter::{FilterMode, FilterQuery, filter},
    };
    use qz_core::{
        models::{DateTime, SubmissionRecord},
        ports::StoreOp,
    };
    use time::{Duration, macros::datetime};

    fn record(id: &str, last: &str, offset_ms: i64) -> SubmissionRecord {
        SubmissionRecord {
            key: format!("submission-{id}-{offset_ms}"),
            student_id: id.into(),
            first_name: "Pat".to_owned(),
            last_name: last.to_owned(),
            hashed_id: None,
            response: String::new(),
            creation_time: DateTime::from(
                datetime!(2025-05-24 09:00 UTC) + Duration::milliseconds(offset_ms),
            ),
        }
    }

    fn setup() -> (Roster, FilteredView) {
        let roster = aggregate(vec![
            record("42", "Smith", 0),
            record("42", "Smith", 10),
            record("7", "Jones", 5),
        ]);
        let view = filter(&roster, &FilterQuery::default(), FilterMode::Flatten);
        (roster, view)
    }

    fn select(grader: &mut Grader, student: usize, submission: usize, stored: Option<ScoreRecord>) {
        let (roster, view) = setup();
        let target = Grader::resolve(&view, &roster, student, submission).unwrap();
        grader.enter(target, stored);
    }

    #[test]
    fn test_cascade_fills_only_unset_fields() {
        let mut scores = ScoreMap::default();
        scores.set(RubricKey::Loop, ScoreValue::Unprepared);
        apply_edit(&mut scores, RubricKey::Overall, ScoreValue::Proficient);

        for (key, value) in scores.rubric() {
            let expected = if key == RubricKey::Loop {
                ScoreValue::Unprepared
            } else {
                ScoreValue::Proficient
            };
            assert_eq!(value, expected, "{key}");
        }
    }

    #[test]
    fn test_non_overall_edit_does_not_cascade() {
        let mut scores = ScoreMap::default();
        apply_edit(&mut scores, RubricKey::Return, ScoreValue::Emerging);
        assert_eq!(scores.len(), 1);
    }

    #[test]
    fn test_resolve_rejects_hidden_submissions() {
        let roster = aggregate(vec![record("42", "Smith", 0), record("42", "Smith", 10)]);
        let view = filter(&roster, &FilterQuery::default(), FilterMode::LatestOnly);

        assert!(Grader::resolve(&view, &roster, 0, 1).is_ok());
        assert!(matches!(
            Grader::resolve(&view, &roster, 0, 0),
            Err(GradeError::OutOfRange { student: 0, submission: 0 })
        ));
        assert!(matches!(
            Grader::resolve(&view, &roster, 3, 0),
            Err(GradeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_edit_without_selection() {
        let mut grader = Grader::new();
        assert!(matches!(
            grader.stage_score(RubricKey::Loop, ScoreValue::Emerging, "result-42"),
            Err(GradeError::NoSelection)
        ));
    }

    #[test]
    fn test_stored_scores_shown_only_for_their_submission() {
        let mut stored = ScoreRecord::new(0);
        stored.scores.set(RubricKey::Declaration, ScoreValue::Emerging);

        let mut grader = Grader::new();
        // Smith is the second student in the view
        select(&mut grader, 1, 0, Some(stored.clone()));
        assert_eq!(grader.selection().unwrap().scores(), &stored.scores);

        select(&mut grader, 1, 1, Some(stored));
        let selection = grader.selection().unwrap();
        assert!(selection.scores().is_empty());
        assert_eq!(selection.stored_index(), Some(0));
    }

    #[test]
    fn test_switching_submission_replaces_scores() {
        let mut grader = Grader::new();
        select(&mut grader, 1, 0, None);

        let staged = grader
            .stage_score(RubricKey::Declaration, ScoreValue::Emerging, "result-42")
            .unwrap();
        assert_eq!(staged.replaced, None);
        assert_eq!(grader.finish_save(&staged.save, Ok(())), SaveOutcome::Applied);

        select(&mut grader, 1, 1, Some(staged.save.record));
        let staged = grader
            .stage_score(RubricKey::Loop, ScoreValue::Proficient, "result-42")
            .unwrap();

        assert_eq!(staged.replaced, Some(0));
        assert_eq!(staged.save.record.submission_index, 1);
        let expected: ScoreMap = [(RubricKey::Loop, ScoreValue::Proficient)].into_iter().collect();
        assert_eq!(staged.save.record.scores, expected);
    }

    #[test]
    fn test_replacement_is_reported_once() {
        let mut grader = Grader::new();
        select(&mut grader, 1, 1, Some(ScoreRecord::new(0)));

        let first = grader
            .stage_score(RubricKey::Loop, ScoreValue::Proficient, "result-42")
            .unwrap();
        assert_eq!(first.replaced, Some(0));

        // Even when the first write fails, the second edit builds on the first
        let err = StoreError::decode(StoreOp::Set, "result-42", serde_json::from_str::<()>("x").unwrap_err());
        assert_eq!(grader.finish_save(&first.save, Err(&err)), SaveOutcome::Failed);

        let second = grader
            .stage_score(RubricKey::Return, ScoreValue::Emerging, "result-42")
            .unwrap();
        assert_eq!(second.replaced, None);
        assert_eq!(second.save.record.scores.len(), 2);
    }

    #[test]
    fn test_busy_while_saving() {
        let mut grader = Grader::new();
        select(&mut grader, 0, 0, None);

        let staged = grader
            .stage_score(RubricKey::Loop, ScoreValue::Proficient, "result-7")
            .unwrap();
        assert!(grader.selection().unwrap().is_saving());
        assert!(matches!(
            grader.stage_score(RubricKey::Return, ScoreValue::Proficient, "result-7"),
            Err(GradeError::Busy)
        ));

        grader.finish_save(&staged.save, Ok(()));
        assert!(grader.stage_score(RubricKey::Return, ScoreValue::Proficient, "result-7").is_ok());
    }

    #[test]
    fn test_stale_save_is_ignored() {
        let mut grader = Grader::new();
        select(&mut grader, 1, 0, None);
        let staged = grader
            .stage_score(RubricKey::Overall, ScoreValue::Proficient, "result-42")
            .unwrap();

        // Move to Jones before the save completes
        select(&mut grader, 0, 0, None);
        let before = grader.selection().unwrap().clone();

        assert_eq!(grader.finish_save(&staged.save, Ok(())), SaveOutcome::Stale);
        assert_eq!(grader.selection().unwrap(), &before);
    }

    #[test]
    fn test_reselecting_same_submission_still_discards_old_save() {
        let mut grader = Grader::new();
        select(&mut grader, 1, 0, None);
        let staged = grader
            .stage_score(RubricKey::Loop, ScoreValue::Emerging, "result-42")
            .unwrap();

        select(&mut grader, 1, 0, None);
        assert_eq!(grader.finish_save(&staged.save, Ok(())), SaveOutcome::Stale);
        assert_eq!(grader.selection().unwrap().stored_index(), None);
    }

    #[test]
    fn test_abandoned_save_releases_selection() {
        let mut grader = Grader::new();
        assert!(!grader.abandon_save());

        select(&mut grader, 0, 0, None);
        assert!(!grader.abandon_save());

        grader
            .stage_score(RubricKey::Loop, ScoreValue::Emerging, "result-7")
            .unwrap();
        assert!(matches!(
            grader.stage_score(RubricKey::Loop, ScoreValue::Proficient, "result-7"),
            Err(GradeError::Busy)
        ));
        assert!(grader.abandon_save());
        assert!(!grader.selection().unwrap().is_saving());

        // edits are accepted again and still build on the abandoned one
        let next = grader
            .stage_score(RubricKey::Return, ScoreValue::Proficient, "result-7")
            .unwrap();
        assert_eq!(next.save.record.scores.get(RubricKey::Loop), ScoreValue::Emerging);
        assert_eq!(grader.finish_save(&next.save, Ok(())), SaveOutcome::Applied);
    }

    #[test]
    fn test_failed_save_keeps_edits() {
        let mut grader = Grader::new();
        select(&mut grader, 0, 0, None);
        let staged = grader
            .stage_score(RubricKey::Conditional, ScoreValue::Unprepared, "result-7")
            .unwrap();

        let err = StoreError::backend(StoreOp::Set, "result-7", std::io::Error::other("offline"));
        assert_eq!(grader.finish_save(&staged.save, Err(&err)), SaveOutcome::Failed);

        let selection = grader.selection().unwrap();
        assert!(!selection.is_saving());
        assert_eq!(selection.scores().get(RubricKey::Conditional), ScoreValue::Unprepared);
        assert_eq!(selection.stored_index(), None);
    }
}
