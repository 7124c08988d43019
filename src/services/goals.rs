// src/services/goals.rs

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::db::GoalRepository;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Falha ao atualizar metas: {0}")]
    Repository(String),
}

/// Progresso de metas do vendedor. Contrato estritamente aditivo: uma
/// venda fechada soma o valor da proposta; nada aqui zera ou reduz o
/// progresso acumulado.
#[async_trait]
pub trait GoalUpdater: Send + Sync {
    async fn record_win(&self, seller_id: Uuid, amount: f64) -> Result<(), UpdateError>;
}

#[derive(Clone)]
pub struct PgGoalUpdater {
    repo: GoalRepository,
}

impl PgGoalUpdater {
    pub fn new(repo: GoalRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl GoalUpdater for PgGoalUpdater {
    async fn record_win(&self, seller_id: Uuid, amount: f64) -> Result<(), UpdateError> {
        let affected = self
            .repo
            .add_progress_to_active_goals(self.repo.pool(), seller_id, amount)
            .await
            .map_err(|e| UpdateError::Repository(e.to_string()))?;

        tracing::info!(
            "🎯 {} meta(s) do vendedor {} atualizadas com +R$ {:.2}",
            affected,
            seller_id,
            amount
        );

        Ok(())
    }
}
