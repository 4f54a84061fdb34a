//! Task-attempt state machine.
//!
//! A plan's attempt lives in three columns on the plan row and moves
//! through the graph:
//!
//! ```text
//! Idle    -> Running  (start: task must be on the roster)
//! Running -> Paused   (stop before the duration is covered)
//! Running -> Idle     (stop at or past the duration: completed,
//!                      task leaves the roster)
//! Paused  -> Running  (continue while time remains)
//! Paused  -> Idle     (re-stop at or past the duration: completed)
//! any     -> Idle     (cancel)
//! ```
//!
//! Each transition decodes the attempt it observed, decides, and persists
//! through a guarded update keyed on those observed columns, so a
//! concurrent transition surfaces as an error instead of silently
//! clobbering state. Business refusals (starting outside the roster,
//! stopping with nothing running) are ordinary outcomes, not errors.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use pacer_db::models::{Plan, TaskAttempt};
use pacer_db::queries::{plans as plan_db, tasks as task_db};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What starting a task did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The attempt started; the plan is now Running.
    Started,
    /// The task is not on the plan's roster; nothing changed.
    NotOnRoster,
    /// Another attempt is already underway; nothing changed.
    AlreadyActive,
}

/// What stopping the current task did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No attempt was underway.
    NotStarted,
    /// Stopped with time remaining; the attempt is now Paused.
    Stopped,
    /// The declared duration is covered: the attempt is cleared and the
    /// task removed from the roster.
    Completed,
}

/// What continuing the current task did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueOutcome {
    /// No attempt was underway; nothing changed.
    NotStarted,
    /// The paused attempt is running again.
    Resumed,
    /// The attempt was never paused; nothing to do.
    AlreadyRunning,
    /// The paused attempt has already covered its duration; the next stop
    /// will complete it, so the pause is left in place.
    NoTimeRemaining,
}

// ---------------------------------------------------------------------------
// Decision rule
// ---------------------------------------------------------------------------

/// Whether an attempt that ran from `since` to `until` has covered the
/// task's declared duration. Completion requires elapsed >= duration.
pub fn attempt_complete(since: DateTime<Utc>, until: DateTime<Utc>, duration: Duration) -> bool {
    until - since >= duration
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Start an attempt on `task_id` for this plan.
///
/// Refused (not an error) when the task is missing from the plan's roster
/// or when an attempt is already underway. Silently restarting over an
/// active attempt could leak a stale end timestamp, so a restart requires
/// an explicit stop or cancel first.
pub async fn start_task(pool: &PgPool, plan: &Plan, task_id: i64) -> Result<StartOutcome> {
    if !plan.attempt()?.is_idle() {
        return Ok(StartOutcome::AlreadyActive);
    }

    if !task_db::plan_has_task(pool, plan.id, task_id).await? {
        return Ok(StartOutcome::NotOnRoster);
    }

    let rows = plan_db::begin_attempt(pool, plan.id, task_id, Utc::now()).await?;
    if rows == 0 {
        bail!("attempt on plan {} changed concurrently", plan.id);
    }

    tracing::debug!(plan_id = plan.id, task_id, "task attempt started");
    Ok(StartOutcome::Started)
}

/// Stop the current attempt at the present moment.
///
/// Elapsed time always counts from the original start, so stopping a
/// paused attempt again re-evaluates completion with a fresh end time.
/// Completion clears the attempt and removes the task from the roster in
/// one transaction.
pub async fn stop_task(pool: &PgPool, plan: &Plan) -> Result<StopOutcome> {
    let (task_id, since) = match plan.attempt()? {
        TaskAttempt::Idle => return Ok(StopOutcome::NotStarted),
        TaskAttempt::Running { task_id, since } | TaskAttempt::Paused { task_id, since, .. } => {
            (task_id, since)
        }
    };

    let task = task_db::get_task(pool, task_id)
        .await?
        .with_context(|| format!("started task {task_id} missing from catalog"))?;

    let now = Utc::now();
    if attempt_complete(since, now, task.duration()) {
        let rows = plan_db::complete_attempt(pool, plan.id, task_id, since).await?;
        if rows == 0 {
            bail!("attempt on plan {} changed concurrently", plan.id);
        }
        tracing::debug!(plan_id = plan.id, task_id, "task attempt completed");
        Ok(StopOutcome::Completed)
    } else {
        let rows = plan_db::pause_attempt(pool, plan.id, task_id, since, now).await?;
        if rows == 0 {
            bail!("attempt on plan {} changed concurrently", plan.id);
        }
        tracing::debug!(plan_id = plan.id, task_id, "task attempt paused");
        Ok(StopOutcome::Stopped)
    }
}

/// Continue a paused attempt.
///
/// The elapsed time is recomputed from the recorded pause window, not the
/// wall clock: a pause that already covers the duration stays paused (a
/// later stop completes it). Continuing when nothing was started is a
/// refusal, not a fault.
pub async fn continue_task(pool: &PgPool, plan: &Plan) -> Result<ContinueOutcome> {
    let (task_id, since, until) = match plan.attempt()? {
        TaskAttempt::Idle => return Ok(ContinueOutcome::NotStarted),
        TaskAttempt::Running { .. } => return Ok(ContinueOutcome::AlreadyRunning),
        TaskAttempt::Paused {
            task_id,
            since,
            until,
        } => (task_id, since, until),
    };

    let task = task_db::get_task(pool, task_id)
        .await?
        .with_context(|| format!("started task {task_id} missing from catalog"))?;

    if attempt_complete(since, until, task.duration()) {
        return Ok(ContinueOutcome::NoTimeRemaining);
    }

    let rows = plan_db::resume_attempt(pool, plan.id, task_id, since).await?;
    if rows == 0 {
        bail!("attempt on plan {} changed concurrently", plan.id);
    }

    tracing::debug!(plan_id = plan.id, task_id, "task attempt resumed");
    Ok(ContinueOutcome::Resumed)
}

/// Cancel whatever attempt is underway. Idempotent: cancelling an idle
/// plan leaves it idle.
pub async fn cancel_task(pool: &PgPool, plan: &Plan) -> Result<()> {
    let rows = plan_db::clear_attempt(pool, plan.id).await?;
    if rows == 0 {
        bail!("plan {} not found", plan.id);
    }

    tracing::debug!(plan_id = plan.id, "task attempt cancelled");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
