//! Integration tests for the activity log queries: inserts, the today
//! filter, aggregate totals, and scoped food deletion.

use sqlx::PgPool;

use pacer_db::queries::{activities, plans};
use pacer_test_utils::{create_test_db, drop_test_db};

async fn make_plan(pool: &PgPool) -> i64 {
    plans::insert_plan(pool, 8_000, 2_000, 8.0, 2.0)
        .await
        .expect("insert_plan should succeed")
        .id
}

/// Backdate a row so it falls outside the today filter.
async fn backdate(pool: &PgPool, table: &str, id: i64) {
    let stmt = format!("UPDATE {table} SET created_at = created_at - INTERVAL '2 days' WHERE id = $1");
    sqlx::query(&stmt)
        .bind(id)
        .execute(pool)
        .await
        .expect("backdate should succeed");
}

#[tokio::test]
async fn insert_sleep_and_water_attach_to_plan() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = make_plan(&pool).await;

    let sleep = activities::insert_sleep(&pool, plan_id, 7.5).await.unwrap();
    assert_eq!(sleep.plan_id, plan_id);
    assert_eq!(sleep.sleep, 7.5);

    let water = activities::insert_water(&pool, plan_id, 0.4).await.unwrap();
    assert_eq!(water.plan_id, plan_id);
    assert_eq!(water.water, 0.4);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn today_foods_are_filtered_and_newest_first() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = make_plan(&pool).await;
    let other_plan = make_plan(&pool).await;

    let old = activities::insert_food(&pool, plan_id, "leftover pasta", 600).await.unwrap();
    backdate(&pool, "activity_food", old.id).await;

    let first = activities::insert_food(&pool, plan_id, "oatmeal", 350).await.unwrap();
    let second = activities::insert_food(&pool, plan_id, "apple", 90).await.unwrap();

    // Same day, different plan: must not leak in.
    activities::insert_food(&pool, other_plan, "burger", 800).await.unwrap();

    let foods = activities::list_today_foods(&pool, plan_id).await.unwrap();
    let ids: Vec<i64> = foods.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![second.id, first.id], "newest id first, old row excluded");

    let total = activities::today_calorie_total(&pool, plan_id).await.unwrap();
    assert_eq!(total, 440, "only today's rows count");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn today_steps_are_filtered_and_newest_first() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = make_plan(&pool).await;

    let old = activities::insert_steps(&pool, plan_id, 9_000).await.unwrap();
    backdate(&pool, "activity_steps", old.id).await;

    let first = activities::insert_steps(&pool, plan_id, 2_500).await.unwrap();
    let second = activities::insert_steps(&pool, plan_id, 4_000).await.unwrap();

    let steps = activities::list_today_steps(&pool, plan_id).await.unwrap();
    let ids: Vec<i64> = steps.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let total = activities::today_step_total(&pool, plan_id).await.unwrap();
    assert_eq!(total, 6_500);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn totals_are_zero_with_no_entries() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = make_plan(&pool).await;

    assert_eq!(activities::today_calorie_total(&pool, plan_id).await.unwrap(), 0);
    assert_eq!(activities::today_step_total(&pool, plan_id).await.unwrap(), 0);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn delete_food_is_scoped_to_the_plan() {
    let (pool, db_name) = create_test_db().await;
    let plan_id = make_plan(&pool).await;
    let other_plan = make_plan(&pool).await;

    let food = activities::insert_food(&pool, plan_id, "granola bar", 190).await.unwrap();

    // Wrong plan: nothing deleted.
    let removed = activities::delete_food(&pool, other_plan, food.id).await.unwrap();
    assert_eq!(removed, 0);

    // Unknown id: nothing deleted.
    let removed = activities::delete_food(&pool, plan_id, 424_242).await.unwrap();
    assert_eq!(removed, 0);

    let removed = activities::delete_food(&pool, plan_id, food.id).await.unwrap();
    assert_eq!(removed, 1);

    let foods = activities::list_today_foods(&pool, plan_id).await.unwrap();
    assert!(foods.is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}
