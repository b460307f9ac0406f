use async_trait::async_trait;
use regmap_log::{LogError, LogLeaf, LogSource};
use sqlx::PgPool;
use tracing::debug;

/// Log source over table `log_leaves`.
#[derive(Debug, Clone)]
pub struct PgLog {
    pool: PgPool,
}

impl PgLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one payload at the next free index and return that index.
    /// Single writer per log: a concurrent append fails on the primary key.
    pub async fn append(&self, log_id: i64, leaf_value: &[u8]) -> Result<u64, LogError> {
        let (idx,): (i64,) = sqlx::query_as(
            r#"
            insert into log_leaves (log_id, leaf_index, leaf_value)
            select $1, coalesce(max(leaf_index) + 1, 0), $2
            from log_leaves
            where log_id = $1
            returning leaf_index
            "#,
        )
        .bind(log_id)
        .bind(leaf_value)
        .fetch_one(&self.pool)
        .await
        .map_err(transport)?;

        debug!(log_id, leaf_index = idx, "appended leaf");
        to_u64(idx)
    }
}

fn transport(e: sqlx::Error) -> LogError {
    LogError::Transport(e.to_string())
}

fn to_i64(v: u64) -> Result<i64, LogError> {
    i64::try_from(v).map_err(|_| LogError::Protocol(format!("leaf index {v} out of range")))
}

fn to_u64(v: i64) -> Result<u64, LogError> {
    u64::try_from(v).map_err(|_| LogError::Protocol(format!("negative leaf index {v}")))
}

#[async_trait]
impl LogSource for PgLog {
    fn source_name(&self) -> &'static str {
        "postgres"
    }

    async fn tree_size(&self, log_id: i64) -> Result<u64, LogError> {
        let (n,): (i64,) =
            sqlx::query_as("select count(*)::bigint from log_leaves where log_id = $1")
                .bind(log_id)
                .fetch_one(&self.pool)
                .await
                .map_err(transport)?;
        to_u64(n)
    }

    async fn get_leaves_by_range(
        &self,
        log_id: i64,
        start: u64,
        count: u64,
    ) -> Result<Vec<LogLeaf>, LogError> {
        let lo = to_i64(start)?;
        let hi = to_i64(start.saturating_add(count))?;

        let rows: Vec<(i64, Vec<u8>)> = sqlx::query_as(
            r#"
            select leaf_index, leaf_value
            from log_leaves
            where log_id = $1 and leaf_index >= $2 and leaf_index < $3
            order by leaf_index asc
            "#,
        )
        .bind(log_id)
        .bind(lo)
        .bind(hi)
        .fetch_all(&self.pool)
        .await
        .map_err(transport)?;

        rows.into_iter()
            .map(|(idx, value)| Ok(LogLeaf::new(to_u64(idx)?, value)))
            .collect()
    }
}
