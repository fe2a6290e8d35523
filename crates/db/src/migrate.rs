//! Applies module migrations once, tracked in `schema_migrations`.

use reservation_kernel::Migration;

use crate::error::DbError;
use crate::pool::DbPool;

const CREATE_LEDGER: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (module, id)
    )
"#;

/// Run every migration not yet recorded. Returns how many were applied.
pub async fn run_migrations(
    pool: &DbPool,
    migrations: &[(String, Migration)],
) -> Result<usize, DbError> {
    sqlx::query(CREATE_LEDGER).execute(pool).await?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let already: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM schema_migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await?;
        if already.is_some() {
            tracing::debug!(module = %module, migration = migration.id, "migration already applied");
            continue;
        }

        let failed = |source: sqlx::Error| DbError::MigrationFailed {
            module: module.clone(),
            id: migration.id.to_string(),
            source,
        };

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        sqlx::query("INSERT INTO schema_migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::create_pool;
    use reservation_kernel::settings::DatabaseSettings;

    fn migrations() -> Vec<(String, Migration)> {
        vec![(
            "test".to_string(),
            Migration {
                id: "001_init",
                up: "CREATE TABLE widget (id INTEGER PRIMARY KEY); CREATE INDEX widget_id ON widget(id);",
            },
        )]
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let pool = create_pool(&DatabaseSettings::default()).await.unwrap();

        assert_eq!(run_migrations(&pool, &migrations()).await.unwrap(), 1);
        assert_eq!(run_migrations(&pool, &migrations()).await.unwrap(), 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM widget")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn broken_migration_names_module_and_id() {
        let pool = create_pool(&DatabaseSettings::default()).await.unwrap();
        let broken = vec![(
            "reservations".to_string(),
            Migration {
                id: "009_broken",
                up: "CREATE TABLE (",
            },
        )];

        let err = run_migrations(&pool, &broken).await.unwrap_err();
        assert!(err.to_string().contains("reservations/009_broken"));
    }
}
