use qz_core::ports::StoreError;
use thiserror::Error;

/// The ways a grading operation can fail.
#[derive(Debug, Error)]
pub enum GradeError {
    /// The requested selection is not part of the current filtered view.
    ///
    /// This points at a presentation layer that is out of sync with the
    /// engine, and is reported rather than resolved to some other submission.
    #[error("no visible submission {submission} for student {student}")]
    OutOfRange {
        /// Index of the student within the filtered view
        student: usize,
        /// Ordinal of the submission within the student's sequence
        submission: usize,
    },

    /// A score edit arrived while nothing is selected
    #[error("no submission is selected")]
    NoSelection,

    /// A score edit arrived while the previous save for this selection is in flight
    #[error("a save for the current selection is still in flight")]
    Busy,

    /// The store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
