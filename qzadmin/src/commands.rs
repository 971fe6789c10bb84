//! Execution of the console's subcommands against a grading session.

use crate::{
    cli::{Commands, FilterArgs, Target},
    render,
};
use qz_core::ports::KeyValueStore;
use qz_grader::{ScoreUpdate, Session};
use std::io::Write;
use tracing::{Level, event};

/// Run one command, writing its output to `out`.
pub async fn run<S: KeyValueStore>(
    session: &mut Session<S>,
    command: Commands,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Commands::List { filter } => {
            load(session, &filter).await?;
            let text = render::listing(session.roster(), session.view(), |id| session.is_graded(id));
            out.write_all(text.as_bytes())?;
        }

        Commands::Show { filter, target } => {
            load(session, &filter).await?;
            select(session, target).await?;
            let scores = session
                .selection()
                .map(|selection| selection.scores().clone())
                .unwrap_or_default();
            if let Some(record) = session.selected_submission() {
                out.write_all(render::submission(record, &scores).as_bytes())?;
            }
        }

        Commands::Score {
            filter,
            target,
            key,
            value,
        } => {
            load(session, &filter).await?;
            select(session, target).await?;
            match session.set_score(key, value).await? {
                ScoreUpdate::Saved { record, replaced } => {
                    if let Some(previous) = replaced {
                        writeln!(
                            out,
                            "warning: replaced the scores recorded for submission {previous}"
                        )?;
                    }
                    out.write_all(render::rubric(&record.scores).as_bytes())?;
                }
                ScoreUpdate::Ignored => writeln!(out, "nothing selected")?,
            }
        }

        Commands::ClearScores { yes } => {
            if !yes {
                anyhow::bail!("refusing to delete every score record without --yes");
            }
            let count = session.clear_scores().await?;
            writeln!(out, "deleted {count} score records")?;
        }
    }

    Ok(())
}

async fn load<S: KeyValueStore>(session: &mut Session<S>, filter: &FilterArgs) -> anyhow::Result<()> {
    let mode = filter.mode(session.config().filter_mode);
    session.set_filter_mode(mode);
    session.set_filter(filter.query());
    session.refresh().await?;
    Ok(())
}

async fn select<S: KeyValueStore>(session: &mut Session<S>, target: Target) -> anyhow::Result<()> {
    let selection = session.select(target.student, target.submission).await?;
    event!(
        Level::DEBUG,
        student = %selection.student_id(),
        graded = selection.scores().len(),
        "loaded scores"
    );
    Ok(())
}
