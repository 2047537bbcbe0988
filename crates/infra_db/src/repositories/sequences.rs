//! Per-month case number counters

use sqlx::PgPool;

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: PgPool,
}

impl SequenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Atomically increments the counter of `(year, month)`, starting at 1
    pub async fn next(&self, year: i32, month: i32) -> Result<i32, DatabaseError> {
        let seq = sqlx::query_scalar::<_, i32>(
            "INSERT INTO case_sequences (year, month, seq) VALUES ($1, $2, 1) \
             ON CONFLICT (year, month) DO UPDATE SET seq = case_sequences.seq + 1 \
             RETURNING seq",
        )
        .bind(year)
        .bind(month)
        .fetch_one(&self.pool)
        .await?;

        Ok(seq)
    }
}
