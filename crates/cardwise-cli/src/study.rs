//! Interactive study loop
//!
//! Shows each queued card, waits for the learner to reveal the answer, reads
//! a 1-4 rating, and feeds it to the session. `q` or end of input stops early.

use std::io::{BufRead, Write};

use cardwise_core::{CardStore, RateOutcome, Rating, ReviewService, SessionSummary, StudySession};
use chrono::Utc;
use colored::Colorize;

/// Drive `session` from `input` until it empties or the learner quits
pub fn run_session<S, R, W>(
    service: &ReviewService<S>,
    mut session: StudySession,
    input: R,
    out: &mut W,
) -> anyhow::Result<SessionSummary>
where
    S: CardStore,
    R: BufRead,
    W: Write,
{
    let mut lines = input.lines();
    let max_attempts = session.config().max_attempts;

    while let Some(entry) = session.current().cloned() {
        let shown_at = Utc::now();
        let preview = service.preview_intervals_at(session.owner_id(), entry.id(), shown_at)?;

        writeln!(out)?;
        writeln!(
            out,
            "{} {}",
            format!("[{} left]", session.remaining()).dimmed(),
            entry.card.front.bold()
        )?;
        write!(out, "{}", "Enter to reveal, q to stop: ".dimmed())?;
        out.flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }

        writeln!(out, "{}", entry.card.back.green())?;
        for (rating, days) in preview.iter() {
            writeln!(
                out,
                "  {} {:<5} {}",
                rating.as_i32().to_string().cyan(),
                rating.as_str(),
                service.format_interval(days).dimmed()
            )?;
        }

        let Some(rating) = read_rating(&mut lines, out)? else {
            break;
        };
        let spent_ms = (Utc::now() - shown_at).num_milliseconds().max(0) as u64;

        match service.rate_in_session(&mut session, rating, spent_ms, Utc::now())? {
            RateOutcome::Completed { receipt, .. } => writeln!(
                out,
                "{} next review in {}",
                "ok".green().bold(),
                service.format_interval(receipt.interval_days)
            )?,
            RateOutcome::Requeued { attempts, .. } => writeln!(
                out,
                "{} back in the queue (attempt {}/{})",
                "again".yellow().bold(),
                attempts,
                max_attempts
            )?,
            RateOutcome::Exhausted { attempts, .. } => writeln!(
                out,
                "{} removed after {} attempts",
                "out".red().bold(),
                attempts
            )?,
        }
    }

    let now = Utc::now();
    Ok(if session.is_finished() {
        service.finish_session(session, now)
    } else {
        service.abandon_session(session, now)
    })
}

/// Prompt until a valid rating arrives. `None` means quit.
fn read_rating<I, W>(lines: &mut I, out: &mut W) -> anyhow::Result<Option<Rating>>
where
    I: Iterator<Item = std::io::Result<String>>,
    W: Write,
{
    loop {
        write!(out, "Rating [1-4]: ")?;
        out.flush()?;

        let Some(line) = lines.next().transpose()? else {
            return Ok(None);
        };
        let answer = line.trim();
        if answer.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match answer.parse::<Rating>() {
            Ok(rating) => return Ok(Some(rating)),
            Err(e) => writeln!(out, "{}", e.red())?,
        }
    }
}
