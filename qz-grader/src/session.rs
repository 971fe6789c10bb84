//! The grading session.

use crate::{
    aggregate::{Roster, aggregate},
    config::GraderConfig,
    error::GradeError,
    filter::{FilterMode, FilterQuery, FilteredView, filter},
    grading::{Grader, SaveOutcome, Selection},
    record_store::RecordStore,
};
use qz_core::{
    models::{RubricKey, ScoreRecord, ScoreValue, StudentId, SubmissionRecord},
    ports::KeyValueStore,
};
use rustc_hash::FxHashMap;
use tracing::{Level, event};

/// The last known score record of each student.
pub type ScoreBook = FxHashMap<StudentId, ScoreRecord>;

/// What a call to [`Session::set_score`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreUpdate {
    /// Nothing was selected, so the edit was dropped
    Ignored,
    /// The edit was written to the store
    Saved {
        /// The record as written
        record: ScoreRecord,
        /// Set when the write replaced the scores of another submission
        replaced: Option<usize>,
    },
}

/// One logged-in grading session.
///
/// A session is opened with a store handle and owns every piece of grading
/// state: the roster of the last fetch, the known score records, the active
/// filter and its view, and the selection. Dropping the session (or calling
/// [`Session::into_store`]) is the logout.
pub struct Session<S> {
    records: RecordStore<S>,
    config: GraderConfig,
    roster: Roster,
    scores: ScoreBook,
    query: FilterQuery,
    view: FilteredView,
    grader: Grader,
}

impl<S: KeyValueStore> Session<S> {
    /// Open a session over `store`. Nothing is fetched until [`Session::refresh`].
    pub fn new(store: S, config: GraderConfig) -> Self {
        Self {
            records: RecordStore::new(store, &config),
            config,
            roster: Roster::default(),
            scores: ScoreBook::default(),
            query: FilterQuery::default(),
            view: FilteredView::default(),
            grader: Grader::new(),
        }
    }

    /// The typed store the session reads and writes through.
    pub fn records(&self) -> &RecordStore<S> {
        &self.records
    }

    /// The configuration the session was opened with.
    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    /// Close the session, giving back the store handle.
    pub fn into_store(self) -> S {
        self.records.into_inner()
    }

    /// Re-fetch every submission and score record and rebuild the roster.
    ///
    /// The current filter is re-applied to the new roster. Indices from the
    /// old roster are meaningless afterwards, so the selection is cleared.
    pub async fn refresh(&mut self) -> Result<(), GradeError> {
        let (submissions, scores) =
            tokio::try_join!(self.records.fetch_submissions(), self.records.fetch_scores())?;

        self.grader.clear();
        self.roster = aggregate(submissions);
        self.scores = scores.into_iter().collect();
        self.view = filter(&self.roster, &self.query, self.config.filter_mode);

        event!(
            Level::INFO,
            students = self.roster.len(),
            submissions = self.roster.submission_count(),
            scored = self.scores.len(),
            "refreshed roster"
        );
        Ok(())
    }

    /// Replace the filter. The selection is cleared first.
    pub fn set_filter(&mut self, query: FilterQuery) -> &FilteredView {
        self.grader.clear();
        self.query = query;
        self.view = filter(&self.roster, &self.query, self.config.filter_mode);
        &self.view
    }

    /// Switch the filtering policy. The selection is cleared first.
    pub fn set_filter_mode(&mut self, mode: FilterMode) -> &FilteredView {
        self.config.filter_mode = mode;
        self.set_filter(self.query.clone())
    }

    /// The active filter.
    pub fn query(&self) -> &FilterQuery {
        &self.query
    }

    /// The result of the active filter.
    pub fn view(&self) -> &FilteredView {
        &self.view
    }

    /// Every student of the last refresh.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Select a visible submission and load its grades.
    ///
    /// `student_index` addresses the filtered view and `submission_index`
    /// the student's full submission sequence. The previous selection is
    /// released first, so a failed call leaves nothing selected.
    pub async fn select(
        &mut self,
        student_index: usize,
        submission_index: usize,
    ) -> Result<&Selection, GradeError> {
        self.grader.clear();
        let target = Grader::resolve(&self.view, &self.roster, student_index, submission_index)?;

        let key = self.config.result_key(&target.student_id);
        let stored = self.records.read_score(&key).await?;
        match &stored {
            Some(record) => self.scores.insert(target.student_id.clone(), record.clone()),
            None => self.scores.remove(&target.student_id),
        };

        Ok(self.grader.enter(target, stored))
    }

    /// Drop the selection without saving anything.
    pub fn clear(&mut self) {
        self.grader.clear();
    }

    /// The active selection.
    pub fn selection(&self) -> Option<&Selection> {
        self.grader.selection()
    }

    /// The submission the active selection points at.
    pub fn selected_submission(&self) -> Option<&SubmissionRecord> {
        let selection = self.grader.selection()?;
        self.roster
            .find(selection.student_id())?
            .submissions
            .get(selection.submission_index())
    }

    /// Grade one rubric criterion of the selected submission and save the result.
    ///
    /// With nothing selected the edit is ignored. Otherwise the student's
    /// stored record is read again (a malformed one counts as absent), the
    /// edit is applied, and the whole record is written back. If the write fails the error is returned and the
    /// in-memory grades keep the edit.
    pub async fn set_score(
        &mut self,
        key: RubricKey,
        value: ScoreValue,
    ) -> Result<ScoreUpdate, GradeError> {
        let Some(selection) = self.grader.selection() else {
            event!(Level::DEBUG, %key, %value, "no selection, ignoring score");
            return Ok(ScoreUpdate::Ignored);
        };

        let result_key = self.config.result_key(selection.student_id());
        // `&mut self` rules out a save in flight; a pending one was dropped mid-write
        self.grader.abandon_save();
        let stored = self.records.read_score(&result_key).await?;
        self.grader.observe_stored(stored.as_ref());

        let staged = self.grader.stage_score(key, value, result_key)?;
        let save = staged.save;
        let result = self.records.save_score(&save.key, &save.record).await;

        let outcome = self.grader.finish_save(&save, result.as_ref().map(|_| ()));
        result?;

        if outcome == SaveOutcome::Applied {
            self.scores.insert(save.student_id().clone(), save.record.clone());
        }

        Ok(ScoreUpdate::Saved {
            record: save.record,
            replaced: staged.replaced,
        })
    }

    /// The last known score record of a student.
    pub fn score_for(&self, student_id: &StudentId) -> Option<&ScoreRecord> {
        self.scores.get(student_id)
    }

    /// Whether a student has an overall grade.
    pub fn is_graded(&self, student_id: &StudentId) -> bool {
        self.score_for(student_id).is_some_and(ScoreRecord::is_graded)
    }

    /// Delete every score record in the store.
    ///
    /// This is an administrative reset; the selection is cleared as well.
    pub async fn clear_scores(&mut self) -> Result<usize, GradeError> {
        self.grader.clear();
        let count = self.records.clear_scores().await?;
        self.scores.clear();
        Ok(count)
    }
}
