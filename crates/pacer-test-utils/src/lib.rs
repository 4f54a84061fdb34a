//! Shared PostgreSQL plumbing for pacer integration tests.
//!
//! Tests run against real PostgreSQL. One server is shared per test binary;
//! every test gets a private database inside it, created on demand and
//! dropped when the test finishes.
//!
//! The server comes from one of two places:
//! - `PACER_TEST_PG_URL` points at an already-running server (e.g. started
//!   once by a nextest setup script) and is used as-is.
//! - Otherwise a throwaway container is started via testcontainers on first
//!   use and kept alive for the life of the process.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use pacer_db::pool;

/// External-server override checked before any container is started.
pub const PG_URL_ENV: &str = "PACER_TEST_PG_URL";

struct PgServer {
    url: String,
    /// Keeps the container alive for the process lifetime. `None` when an
    /// external server is used.
    _keepalive: Option<ContainerAsync<Postgres>>,
}

static PG_SERVER: OnceCell<PgServer> = OnceCell::const_new();

async fn start_server() -> PgServer {
    if let Ok(url) = std::env::var(PG_URL_ENV) {
        return PgServer {
            url,
            _keepalive: None,
        };
    }

    let container = Postgres::default()
        .with_tag("18")
        .start()
        .await
        .expect("failed to start PostgreSQL container");
    let host = container
        .get_host()
        .await
        .expect("failed to get container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    PgServer {
        url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _keepalive: Some(container),
    }
}

/// Base URL of the shared server, without a database name appended.
pub async fn pg_url() -> &'static str {
    &PG_SERVER.get_or_init(start_server).await.url
}

async fn maintenance_conn() -> PgConnection {
    let url = format!("{}/postgres", pg_url().await);
    PgConnection::connect(&url)
        .await
        .expect("failed to connect to maintenance database")
}

/// Create a fresh, uniquely-named database with all migrations applied.
///
/// Returns the pool plus the database name; pass the name to
/// [`drop_test_db`] once the test is done with it.
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("pacer_test_{}", Uuid::new_v4().simple());

    let mut conn = maintenance_conn().await;
    conn.execute(format!("CREATE DATABASE {db_name}").as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create test database {db_name}: {e}"));
    conn.close().await.ok();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&format!("{}/{db_name}", pg_url().await))
        .await
        .unwrap_or_else(|e| panic!("failed to connect to test database {db_name}: {e}"));

    pool::run_migrations(&pool)
        .await
        .expect("migrations should apply cleanly");

    (pool, db_name)
}

/// Drop a database created by [`create_test_db`].
///
/// Any connections still open against it are terminated first, so a test
/// that forgot to close its pool does not wedge the drop.
pub async fn drop_test_db(db_name: &str) {
    let mut conn = maintenance_conn().await;

    let terminate = format!(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = conn.execute(terminate.as_str()).await;
    let _ = conn
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    conn.close().await.ok();
}
