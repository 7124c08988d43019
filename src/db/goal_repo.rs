// src/db/goal_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

#[derive(Clone)]
pub struct GoalRepository {
    pool: PgPool,
}

impl GoalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Soma `amount` ao progresso de TODAS as metas ativas do vendedor.
    /// Operação estritamente aditiva: nunca zera nem reduz current_value.
    /// Metas que atingem o alvo são marcadas como concluídas na mesma
    /// instrução.
    pub async fn add_progress_to_active_goals<'e, E>(
        &self,
        executor: E,
        seller_id: Uuid,
        amount: f64,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE goals
            SET current_value = current_value + $2,
                status = CASE
                    WHEN current_value + $2 >= target_value THEN 'concluida'::goal_status
                    ELSE status
                END,
                updated_at = now()
            WHERE assigned_to = $1 AND status = 'ativa'
            "#,
        )
        .bind(seller_id)
        .bind(amount)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
