//! Plain-text rendering of listings and submissions.

use qz_core::models::{DateTime, ScoreMap, StudentId, SubmissionRecord};
use qz_grader::{aggregate::Roster, filter::FilteredView};
use std::fmt::Write as _;
use time::{format_description::BorrowedFormatItem, macros::format_description};

const NAME_WIDTH: usize = 28;
const DETAIL_WIDTH: usize = 18;

const TIME_FORMAT: &[BorrowedFormatItem<'_>] = format_description!(
    "[month padding:none]/[day padding:none], [hour repr:12 padding:none]:[minute]:[second] [period] UTC"
);

/// Shorten `text` to at most `width` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// A creation time as shown to graders, e.g. `5/24, 8:58:07 PM UTC`.
pub fn format_time(time: DateTime) -> String {
    time.as_offset()
        .format(TIME_FORMAT)
        .unwrap_or_else(|_| time.to_string())
}

/// A student's name for the listing, with a check mark once they are graded.
pub fn student_label(full_name: &str, graded: bool) -> String {
    let check = if graded { "  \u{2713}" } else { "" };
    format!("{}{check}", truncate(full_name, NAME_WIDTH))
}

/// The rows of a view, grouped by student.
///
/// Each student line starts with the index `show` and `score` expect, and
/// each submission line with the submission's index.
pub fn listing(roster: &Roster, view: &FilteredView, graded: impl Fn(&StudentId) -> bool) -> String {
    let mut out = String::new();

    for (index, visible) in view.students().iter().enumerate() {
        let Some(student) = roster.get(visible.student) else {
            continue;
        };
        let _ = writeln!(
            out,
            "{index:>3}  {}",
            student_label(&student.full_name, graded(&student.student_id))
        );
        for &ordinal in &visible.submissions {
            if let Some(submission) = student.submissions.get(ordinal) {
                let _ = writeln!(
                    out,
                    "       {ordinal:>2}  {}  {}",
                    format_time(submission.creation_time),
                    submission.key
                );
            }
        }
    }

    if out.is_empty() {
        out.push_str("no matching submissions\n");
    }
    out
}

/// One submission with its grades, followed by the response itself.
pub fn submission(record: &SubmissionRecord, scores: &ScoreMap) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "First name:  {}", truncate(&record.first_name, DETAIL_WIDTH));
    let _ = writeln!(out, "Last name:   {}", truncate(&record.last_name, DETAIL_WIDTH));
    let _ = writeln!(out, "Student ID:  {}", record.student_id);
    let _ = writeln!(out, "Hashed ID:   {}", record.hashed_id.as_deref().unwrap_or(""));
    let _ = writeln!(out, "Submitted:   {}", format_time(record.creation_time));
    let _ = writeln!(out, "Key:         {}", record.key);
    out.push('\n');
    out.push_str(&rubric(scores));
    out.push('\n');
    out.push_str(&record.response);
    if !record.response.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Every criterion with its grade, in rubric order.
pub fn rubric(scores: &ScoreMap) -> String {
    let mut out = String::new();
    for (key, value) in scores.rubric() {
        let _ = writeln!(out, "{:>12}  {}", key.label(), value.label());
    }
    out
}
