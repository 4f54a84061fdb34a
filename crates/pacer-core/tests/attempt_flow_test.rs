//! Integration tests for the task-attempt state machine and plan service,
//! driven end to end against a real PostgreSQL database.
//!
//! Each test creates a unique temporary database (via `pacer-test-utils`),
//! runs migrations, and drops it on completion so tests are fully isolated.

use sqlx::PgPool;

use pacer_db::models::{Plan, TaskAttempt};
use pacer_db::queries::{plans, tasks, users};
use pacer_test_utils::{create_test_db, drop_test_db};

use pacer_core::attempt::{
    ContinueOutcome, StartOutcome, StopOutcome, cancel_task, continue_task, start_task, stop_task,
};
use pacer_core::plan::{CreatePlanOutcome, create_plan_for_user};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Insert a user and create their plan, returning (user_id, plan).
async fn user_with_plan(pool: &PgPool, username: &str) -> (i64, Plan) {
    let user = users::insert_user(pool, username)
        .await
        .expect("insert_user should succeed");
    let plan = match create_plan_for_user(pool, user.id, 10_000, 2_000, 8.0, 2.0)
        .await
        .expect("create_plan_for_user should succeed")
    {
        CreatePlanOutcome::Created(plan) => plan,
        CreatePlanOutcome::AlreadyHasPlan { .. } => panic!("fresh user cannot own a plan"),
    };
    (user.id, plan)
}

/// Insert a 0h30m catalog task and put it on the plan's roster.
async fn roster_task(pool: &PgPool, plan_id: i64) -> i64 {
    let task = tasks::insert_task(pool, "pushups", "3 sets of 20", 0, 30)
        .await
        .expect("insert_task should succeed");
    tasks::add_task_to_plan(pool, plan_id, task.id)
        .await
        .expect("add_task_to_plan should succeed");
    task.id
}

async fn reload(pool: &PgPool, plan_id: i64) -> Plan {
    plans::get_plan(pool, plan_id)
        .await
        .expect("get_plan should succeed")
        .expect("plan should exist")
}

/// Shift the attempt's start time into the past, simulating elapsed
/// wall-clock time without sleeping in the test.
async fn backdate_start(pool: &PgPool, plan_id: i64, minutes: i32) {
    sqlx::query(
        "UPDATE plans SET task_started_at = task_started_at - make_interval(mins => $1) \
         WHERE id = $2",
    )
    .bind(minutes)
    .bind(plan_id)
    .execute(pool)
    .await
    .expect("backdating should succeed");
}

// ---------------------------------------------------------------------------
// Plan service
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_plan_links_it_to_the_user() {
    let (pool, db_name) = create_test_db().await;

    let user = users::insert_user(&pool, "ada").await.unwrap();
    assert_eq!(user.plan_id, None);

    let plan = match create_plan_for_user(&pool, user.id, 12_000, 2_400, 7.5, 3.0)
        .await
        .unwrap()
    {
        CreatePlanOutcome::Created(plan) => plan,
        other => panic!("expected Created, got {other:?}"),
    };
    assert_eq!(plan.steps, 12_000);
    assert_eq!(plan.attempt().unwrap(), TaskAttempt::Idle);

    let user = users::get_user(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.plan_id, Some(plan.id));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn second_plan_for_the_same_user_is_refused() {
    let (pool, db_name) = create_test_db().await;

    let (user_id, plan) = user_with_plan(&pool, "ada").await;

    match create_plan_for_user(&pool, user_id, 1, 1, 1.0, 1.0)
        .await
        .unwrap()
    {
        CreatePlanOutcome::AlreadyHasPlan { plan_id } => assert_eq!(plan_id, plan.id),
        other => panic!("expected AlreadyHasPlan, got {other:?}"),
    }

    // The refused create must not leave an orphaned plan row behind.
    let all = plans::list_plans(&pool).await.unwrap();
    assert_eq!(all.len(), 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn create_plan_for_missing_user_fails() {
    let (pool, db_name) = create_test_db().await;

    let err = create_plan_for_user(&pool, 4242, 1, 1, 1.0, 1.0)
        .await
        .expect_err("missing user should be an error");
    assert!(err.to_string().contains("user 4242 not found"));

    pool.close().await;
    drop_test_db(&db_name).await;
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_requires_roster_membership() {
    let (pool, db_name) = create_test_db().await;

    let (_, plan) = user_with_plan(&pool, "ada").await;
    let stray = tasks::insert_task(&pool, "situps", "off-roster", 0, 10)
        .await
        .unwrap();

    let outcome = start_task(&pool, &plan, stray.id).await.unwrap();
    assert_eq!(outcome, StartOutcome::NotOnRoster);

    let plan = reload(&pool, plan.id).await;
    assert_eq!(plan.attempt().unwrap(), TaskAttempt::Idle);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn start_transitions_idle_to_running() {
    let (pool, db_name) = create_test_db().await;

    let (_, plan) = user_with_plan(&pool, "ada").await;
    let task_id = roster_task(&pool, plan.id).await;

    let outcome = start_task(&pool, &plan, task_id).await.unwrap();
    assert_eq!(outcome, StartOutcome::Started);

    let plan = reload(&pool, plan.id).await;
    match plan.attempt().unwrap() {
        TaskAttempt::Running { task_id: t, .. } => assert_eq!(t, task_id),
        other => panic!("expected Running, got {other:?}"),
    }

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn start_is_refused_while_an_attempt_is_active() {
    let (pool, db_name) = create_test_db().await;

    let (_, plan) = user_with_plan(&pool, "ada").await;
    let first = roster_task(&pool, plan.id).await;
    let second = tasks::insert_task(&pool, "plank", "one minute hold", 0, 5)
        .await
        .unwrap();
    tasks::add_task_to_plan(&pool, plan.id, second.id)
        .await
        .unwrap();

    assert_eq!(
        start_task(&pool, &plan, first).await.unwrap(),
        StartOutcome::Started
    );

    // Both restarting the running task and switching to another rostered
    // task are refused until the attempt is stopped or cancelled.
    let plan = reload(&pool, plan.id).await;
    assert_eq!(
        start_task(&pool, &plan, first).await.unwrap(),
        StartOutcome::AlreadyActive
    );
    assert_eq!(
        start_task(&pool, &plan, second.id).await.unwrap(),
        StartOutcome::AlreadyActive
    );

    let after = reload(&pool, plan.id).await;
    assert_eq!(after.started_task_id, Some(first));
    assert_eq!(after.task_started_at, plan.task_started_at);

    pool.close().await;
    drop_test_db(&db_name).await;
}

// ---------------------------------------------------------------------------
// Stop / continue / cancel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_with_no_attempt_reports_not_started() {
    let (pool, db_name) = create_test_db().await;

    let (_, plan) = user_with_plan(&pool, "ada").await;
    assert_eq!(stop_task(&pool, &plan).await.unwrap(), StopOutcome::NotStarted);
    assert_eq!(
        continue_task(&pool, &plan).await.unwrap(),
        ContinueOutcome::NotStarted
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn stop_before_duration_pauses_and_keeps_the_roster() {
    let (pool, db_name) = create_test_db().await;

    let (_, plan) = user_with_plan(&pool, "ada").await;
    let task_id = roster_task(&pool, plan.id).await;

    start_task(&pool, &plan, task_id).await.unwrap();
    backdate_start(&pool, plan.id, 20).await;

    let plan = reload(&pool, plan.id).await;
    assert_eq!(stop_task(&pool, &plan).await.unwrap(), StopOutcome::Stopped);

    let paused = reload(&pool, plan.id).await;
    match paused.attempt().unwrap() {
        TaskAttempt::Paused { task_id: t, since, until } => {
            assert_eq!(t, task_id);
            assert_eq!(Some(since), plan.task_started_at);
            assert!(until > since);
        }
        other => panic!("expected Paused, got {other:?}"),
    }

    let roster = tasks::list_plan_tasks(&pool, plan.id).await.unwrap();
    assert_eq!(roster.len(), 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn continue_resumes_a_paused_attempt() {
    let (pool, db_name) = create_test_db().await;

    let (_, plan) = user_with_plan(&pool, "ada").await;
    let task_id = roster_task(&pool, plan.id).await;

    start_task(&pool, &plan, task_id).await.unwrap();
    backdate_start(&pool, plan.id, 20).await;
    let plan = reload(&pool, plan.id).await;
    stop_task(&pool, &plan).await.unwrap();

    let paused = reload(&pool, plan.id).await;
    assert_eq!(
        continue_task(&pool, &paused).await.unwrap(),
        ContinueOutcome::Resumed
    );

    // Running again, original start time retained.
    let running = reload(&pool, plan.id).await;
    match running.attempt().unwrap() {
        TaskAttempt::Running { task_id: t, since } => {
            assert_eq!(t, task_id);
            assert_eq!(Some(since), paused.task_started_at);
        }
        other => panic!("expected Running, got {other:?}"),
    }

    // Continuing an attempt that is already running changes nothing.
    assert_eq!(
        continue_task(&pool, &running).await.unwrap(),
        ContinueOutcome::AlreadyRunning
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn continue_with_duration_covered_leaves_the_pause_in_place() {
    let (pool, db_name) = create_test_db().await;

    let (_, plan) = user_with_plan(&pool, "ada").await;
    let task_id = roster_task(&pool, plan.id).await;

    // Hand-write a pause whose window already covers the 30-minute
    // duration, as a concurrent or crashed writer could have left it.
    sqlx::query(
        "UPDATE plans SET started_task_id = $1, \
         task_started_at = now() - interval '50 minutes', \
         task_ended_at = now() - interval '10 minutes' \
         WHERE id = $2",
    )
    .bind(task_id)
    .bind(plan.id)
    .execute(&pool)
    .await
    .unwrap();

    let paused = reload(&pool, plan.id).await;
    assert_eq!(
        continue_task(&pool, &paused).await.unwrap(),
        ContinueOutcome::NoTimeRemaining
    );

    // Unchanged: still paused with the same window; stop completes it.
    let after = reload(&pool, plan.id).await;
    assert_eq!(after.task_started_at, paused.task_started_at);
    assert_eq!(after.task_ended_at, paused.task_ended_at);

    assert_eq!(stop_task(&pool, &after).await.unwrap(), StopOutcome::Completed);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn worked_example_pause_resume_complete() {
    let (pool, db_name) = create_test_db().await;

    // A 0h30m task: stop at T+20m pauses, continue resumes, stop at
    // T+35m completes even though 15 of those minutes sat in the pause.
    let (_, plan) = user_with_plan(&pool, "ada").await;
    let task_id = roster_task(&pool, plan.id).await;

    start_task(&pool, &plan, task_id).await.unwrap();
    backdate_start(&pool, plan.id, 20).await;

    let plan = reload(&pool, plan.id).await;
    assert_eq!(stop_task(&pool, &plan).await.unwrap(), StopOutcome::Stopped);

    let paused = reload(&pool, plan.id).await;
    assert_eq!(
        continue_task(&pool, &paused).await.unwrap(),
        ContinueOutcome::Resumed
    );

    backdate_start(&pool, plan.id, 15).await;

    let running = reload(&pool, plan.id).await;
    assert_eq!(
        stop_task(&pool, &running).await.unwrap(),
        StopOutcome::Completed
    );

    // Completion clears the attempt and removes the task from the roster.
    let done = reload(&pool, plan.id).await;
    assert_eq!(done.attempt().unwrap(), TaskAttempt::Idle);
    let roster = tasks::list_plan_tasks(&pool, plan.id).await.unwrap();
    assert!(roster.is_empty());

    // The task itself survives in the catalog.
    assert!(tasks::get_task(&pool, task_id).await.unwrap().is_some());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn stop_at_exactly_the_duration_completes() {
    let (pool, db_name) = create_test_db().await;

    let (_, plan) = user_with_plan(&pool, "ada").await;
    let task_id = roster_task(&pool, plan.id).await;

    start_task(&pool, &plan, task_id).await.unwrap();
    // 30 minutes and a hair more have elapsed by the time stop runs.
    backdate_start(&pool, plan.id, 30).await;

    let plan = reload(&pool, plan.id).await;
    assert_eq!(stop_task(&pool, &plan).await.unwrap(), StopOutcome::Completed);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn cancel_is_idempotent_from_every_state() {
    let (pool, db_name) = create_test_db().await;

    let (_, plan) = user_with_plan(&pool, "ada").await;
    let task_id = roster_task(&pool, plan.id).await;

    // Idle.
    cancel_task(&pool, &plan).await.unwrap();
    assert_eq!(reload(&pool, plan.id).await.attempt().unwrap(), TaskAttempt::Idle);

    // Running.
    start_task(&pool, &plan, task_id).await.unwrap();
    let running = reload(&pool, plan.id).await;
    cancel_task(&pool, &running).await.unwrap();
    assert_eq!(reload(&pool, plan.id).await.attempt().unwrap(), TaskAttempt::Idle);

    // Paused.
    let plan = reload(&pool, plan.id).await;
    start_task(&pool, &plan, task_id).await.unwrap();
    backdate_start(&pool, plan.id, 5).await;
    let running = reload(&pool, plan.id).await;
    stop_task(&pool, &running).await.unwrap();
    let paused = reload(&pool, plan.id).await;
    cancel_task(&pool, &paused).await.unwrap();
    assert_eq!(reload(&pool, plan.id).await.attempt().unwrap(), TaskAttempt::Idle);

    // Cancelling never touches the roster.
    let roster = tasks::list_plan_tasks(&pool, plan.id).await.unwrap();
    assert_eq!(roster.len(), 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn stale_plan_snapshot_is_rejected_on_stop() {
    let (pool, db_name) = create_test_db().await;

    let (_, plan) = user_with_plan(&pool, "ada").await;
    let task_id = roster_task(&pool, plan.id).await;

    start_task(&pool, &plan, task_id).await.unwrap();
    let snapshot = reload(&pool, plan.id).await;

    // Another caller cancels between the read and the write.
    cancel_task(&pool, &snapshot).await.unwrap();

    let err = stop_task(&pool, &snapshot)
        .await
        .expect_err("guarded update must miss");
    assert!(err.to_string().contains("changed concurrently"));

    pool.close().await;
    drop_test_db(&db_name).await;
}
