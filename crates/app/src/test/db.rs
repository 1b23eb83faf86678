//! Throwaway PostgreSQL databases for repository tests.

use once_cell::sync::Lazy;
use sqlx::{Connection, PgConnection, PgPool};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres as PostgresImage;
use tokio::sync::{OnceCell, mpsc};
use uuid::Uuid;

use crate::database;

const USER: &str = "sublet_test";
const PASSWORD: &str = "sublet_test_password";

static CONTAINER: Lazy<OnceCell<ContainerAsync<PostgresImage>>> = Lazy::new(OnceCell::new);

static DROP_QUEUE: Lazy<OnceCell<mpsc::UnboundedSender<String>>> = Lazy::new(OnceCell::new);

async fn start_container() -> ContainerAsync<PostgresImage> {
    PostgresImage::default()
        .with_user(USER)
        .with_password(PASSWORD)
        .with_db_name("sublet_test")
        .with_env_var("POSTGRES_INITDB_ARGS", "--auth-host=trust")
        .start()
        .await
        .expect("postgres container starts")
}

async fn admin_url() -> String {
    let container = CONTAINER.get_or_init(start_container).await;

    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container exposes 5432");

    let host =
        std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_| "localhost".to_owned());

    format!("postgresql://{USER}:{PASSWORD}@{host}:{port}")
}

async fn start_drop_queue() -> mpsc::UnboundedSender<String> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(name) = receiver.recv().await {
            let Ok(mut conn) = PgConnection::connect(&format!("{}/postgres", admin_url().await)).await
            else {
                continue;
            };

            let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{name}\""))
                .execute(&mut conn)
                .await;
            let _ = conn.close().await;
        }
    });

    sender
}

/// A freshly migrated database inside the shared container.
///
/// Every instance gets its own database, so tests never observe each other's
/// rows. The database is dropped in the background once the handle goes away.
#[derive(Debug)]
pub struct TestDb {
    pub pool: PgPool,
    name: String,
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if let Some(sender) = DROP_QUEUE.get() {
            let _ = sender.send(self.name.clone());
        }
    }
}

impl TestDb {
    pub async fn new() -> Self {
        DROP_QUEUE.get_or_init(start_drop_queue).await;

        // Simple-form UUIDs are hex only, so the name never needs escaping.
        let name = format!("sublet_{}", Uuid::now_v7().simple());
        let base = admin_url().await;

        let mut conn = PgConnection::connect(&format!("{base}/postgres"))
            .await
            .expect("admin connection opens");

        sqlx::query(&format!("CREATE DATABASE \"{name}\""))
            .execute(&mut conn)
            .await
            .expect("test database is created");

        conn.close().await.expect("admin connection closes");

        let pool = database::connect(&format!("{base}/{name}"))
            .await
            .expect("test pool connects");

        database::migrate(&pool)
            .await
            .expect("migrations apply");

        Self { pool, name }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn databases_are_isolated() {
        let first = TestDb::new().await;
        let second = TestDb::new().await;

        sqlx::query("INSERT INTO settings (key, value) VALUES ('probe', 'x')")
            .execute(first.pool())
            .await
            .expect("insert succeeds");

        let seen: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE key = 'probe'")
            .fetch_one(second.pool())
            .await
            .expect("count succeeds");

        assert_eq!(seen, 0);
    }
}
