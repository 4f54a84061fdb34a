use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A user's plan -- daily targets plus the current task attempt, if any.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: i64,
    /// Daily step target.
    pub steps: i32,
    /// Daily calorie target.
    pub calories: i32,
    /// Daily sleep target, in hours.
    pub sleep: f64,
    /// Daily water target, in liters.
    pub water: f64,
    pub started_task_id: Option<i64>,
    pub task_started_at: Option<DateTime<Utc>>,
    pub task_ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A catalog task a user can add to their plan and attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub duration_hours: i32,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// The declared duration of this task as a [`Duration`].
    pub fn duration(&self) -> Duration {
        Duration::hours(i64::from(self.duration_hours))
            + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// A registered user. `plan_id` is set once the user creates their plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub plan_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A logged sleep entry (hours slept).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivitySleep {
    pub id: i64,
    pub plan_id: i64,
    pub sleep: f64,
    pub created_at: DateTime<Utc>,
}

/// A logged water entry (liters drunk).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityWater {
    pub id: i64,
    pub plan_id: i64,
    pub water: f64,
    pub created_at: DateTime<Utc>,
}

/// A logged food entry with its calorie count.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityFood {
    pub id: i64,
    pub plan_id: i64,
    pub food: String,
    pub calories: i32,
    pub created_at: DateTime<Utc>,
}

/// A logged step-count entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityStep {
    pub id: i64,
    pub plan_id: i64,
    pub steps: i32,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Task attempt state
// ---------------------------------------------------------------------------

/// The plan's current task attempt, decoded from the three attempt columns.
///
/// The columns are either all NULL (`Idle`), or carry a task and a start
/// time (`Running`), or additionally an end time (`Paused`). The schema's
/// CHECK constraint rules out every other combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAttempt {
    /// No task in progress.
    Idle,
    /// A task is being worked on since `since`.
    Running { task_id: i64, since: DateTime<Utc> },
    /// A task was stopped at `until` with time still remaining.
    Paused {
        task_id: i64,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

impl TaskAttempt {
    /// The task under attempt, if any.
    pub fn task_id(&self) -> Option<i64> {
        match self {
            Self::Idle => None,
            Self::Running { task_id, .. } | Self::Paused { task_id, .. } => Some(*task_id),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Error returned when a plan row carries an impossible attempt-column
/// combination (rejected by the schema, so seeing this means the row was
/// written outside the transition functions).
#[derive(Debug, Clone)]
pub struct AttemptStateError {
    pub plan_id: i64,
}

impl fmt::Display for AttemptStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "plan {} has inconsistent task attempt columns",
            self.plan_id
        )
    }
}

impl std::error::Error for AttemptStateError {}

impl Plan {
    /// Decode the attempt columns into a [`TaskAttempt`].
    pub fn attempt(&self) -> Result<TaskAttempt, AttemptStateError> {
        match (self.started_task_id, self.task_started_at, self.task_ended_at) {
            (None, None, None) => Ok(TaskAttempt::Idle),
            (Some(task_id), Some(since), None) => Ok(TaskAttempt::Running { task_id, since }),
            (Some(task_id), Some(since), Some(until)) => Ok(TaskAttempt::Paused {
                task_id,
                since,
                until,
            }),
            _ => Err(AttemptStateError { plan_id: self.id }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_with(
        started_task_id: Option<i64>,
        task_started_at: Option<DateTime<Utc>>,
        task_ended_at: Option<DateTime<Utc>>,
    ) -> Plan {
        Plan {
            id: 1,
            steps: 10_000,
            calories: 2_000,
            sleep: 8.0,
            water: 2.0,
            started_task_id,
            task_started_at,
            task_ended_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn attempt_decodes_idle() {
        let plan = plan_with(None, None, None);
        assert_eq!(plan.attempt().unwrap(), TaskAttempt::Idle);
    }

    #[test]
    fn attempt_decodes_running() {
        let since = Utc::now();
        let plan = plan_with(Some(7), Some(since), None);
        assert_eq!(
            plan.attempt().unwrap(),
            TaskAttempt::Running { task_id: 7, since }
        );
    }

    #[test]
    fn attempt_decodes_paused() {
        let since = Utc::now();
        let until = since + Duration::minutes(20);
        let plan = plan_with(Some(7), Some(since), Some(until));
        assert_eq!(
            plan.attempt().unwrap(),
            TaskAttempt::Paused {
                task_id: 7,
                since,
                until
            }
        );
    }

    #[test]
    fn attempt_rejects_task_without_start() {
        let plan = plan_with(Some(7), None, None);
        let err = plan.attempt().unwrap_err();
        assert_eq!(err.plan_id, 1);
    }

    #[test]
    fn attempt_rejects_end_without_task() {
        let plan = plan_with(None, Some(Utc::now()), Some(Utc::now()));
        assert!(plan.attempt().is_err());
    }

    #[test]
    fn task_duration_combines_hours_and_minutes() {
        let task = Task {
            id: 1,
            name: "run".to_string(),
            description: String::new(),
            duration_hours: 1,
            duration_minutes: 30,
            created_at: Utc::now(),
        };
        assert_eq!(task.duration(), Duration::minutes(90));
    }

    #[test]
    fn attempt_task_id_accessor() {
        let since = Utc::now();
        assert_eq!(TaskAttempt::Idle.task_id(), None);
        assert_eq!(
            TaskAttempt::Running { task_id: 3, since }.task_id(),
            Some(3)
        );
        assert!(TaskAttempt::Idle.is_idle());
        assert!(!TaskAttempt::Running { task_id: 3, since }.is_idle());
    }
}
