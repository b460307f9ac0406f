use async_trait::async_trait;
use regmap_store::{BackendError, MapBackend, MapLeaf, MapLeafInclusion, StoreIndex};
use sqlx::PgPool;

/// Map backend over table `map_leaves`. Row presence is the existence signal.
#[derive(Debug, Clone)]
pub struct PgMap {
    pool: PgPool,
}

impl PgMap {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn transport(e: sqlx::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

#[async_trait]
impl MapBackend for PgMap {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn get_leaves(
        &self,
        map_id: i64,
        indices: &[StoreIndex],
    ) -> Result<Vec<MapLeafInclusion>, BackendError> {
        let mut out = Vec::with_capacity(indices.len());
        for index in indices {
            let row: Option<(Vec<u8>,)> = sqlx::query_as(
                "select leaf_value from map_leaves where map_id = $1 and leaf_index = $2",
            )
            .bind(map_id)
            .bind(index.as_bytes().as_slice())
            .fetch_optional(&self.pool)
            .await
            .map_err(transport)?;

            out.push(MapLeafInclusion {
                index: *index,
                leaf_value: row.map(|(v,)| v),
            });
        }
        Ok(out)
    }

    async fn set_leaves(&self, map_id: i64, leaves: Vec<MapLeaf>) -> Result<(), BackendError> {
        let mut tx = self.pool.begin().await.map_err(transport)?;
        for leaf in &leaves {
            sqlx::query(
                r#"
                insert into map_leaves (map_id, leaf_index, leaf_value)
                values ($1, $2, $3)
                on conflict (map_id, leaf_index)
                do update set leaf_value = excluded.leaf_value, updated_at_utc = now()
                "#,
            )
            .bind(map_id)
            .bind(leaf.index.as_bytes().as_slice())
            .bind(leaf.leaf_value.as_slice())
            .execute(&mut *tx)
            .await
            .map_err(transport)?;
        }
        tx.commit().await.map_err(transport)?;
        Ok(())
    }
}
