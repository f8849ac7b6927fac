use async_trait::async_trait;
use lyncup_core::{Edge, LyncupError, UserId};
use sqlx::{PgPool, Row};

use crate::{IdentityCatalog, LikesSource};

/// Postgres-backed [`LikesSource`] / [`IdentityCatalog`].
///
/// Queries a `likes(user_from, user_to, like_count)` table and a `users(id)`
/// table — a relational shape this crate assumes exists without owning.
pub struct PgLikesSource {
    pool: PgPool,
}

impl PgLikesSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, LyncupError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| LyncupError::TransientExternal(e.to_string()))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl LikesSource for PgLikesSource {
    async fn load_all_likes(&self) -> Result<Vec<Edge>, LyncupError> {
        let rows = sqlx::query("SELECT user_from, user_to, like_count FROM likes")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LyncupError::TransientExternal(e.to_string()))?;

        let edges = rows
            .into_iter()
            .map(|row| {
                let from: i64 = row.get("user_from");
                let to: i64 = row.get("user_to");
                let weight: i64 = row.get("like_count");
                Edge::new(UserId(from), UserId(to), weight as f64)
            })
            .collect();

        Ok(edges)
    }
}

#[async_trait]
impl IdentityCatalog for PgLikesSource {
    async fn filter_known(&self, candidates: &[UserId]) -> Result<Vec<UserId>, LyncupError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = candidates.iter().map(|u| u.0).collect();
        let rows = sqlx::query("SELECT id FROM users WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LyncupError::TransientExternal(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| UserId(row.get::<i64, _>("id")))
            .collect())
    }
}
