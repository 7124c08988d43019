// src/db/proposal_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::proposal::{Proposal, ProposalStatus},
};

const PROPOSAL_COLUMNS: &str = r#"
    id, proposal_number, client, seller, distributor, items,
    subtotal, discount_value, total,
    payment_condition, observations,
    status, loss_reason, loss_description,
    valid_until, created_at, closed_at, updated_at
"#;

#[derive(Clone)]
pub struct ProposalRepository {
    pool: PgPool,
}

impl ProposalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insere a proposta completa. O índice único de proposal_number
    /// rejeita colisões do gerador de números.
    pub async fn create<'e, E>(&self, executor: E, p: &Proposal) -> Result<Proposal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            r#"
            INSERT INTO proposals (
                id, proposal_number, client, seller, distributor, items,
                subtotal, discount_value, total,
                payment_condition, observations,
                status, loss_reason, loss_description,
                valid_until, created_at, closed_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {PROPOSAL_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Proposal>(&query)
            .bind(p.id)
            .bind(&p.proposal_number)
            .bind(&p.client)
            .bind(&p.seller)
            .bind(&p.distributor)
            .bind(&p.items)
            .bind(p.subtotal)
            .bind(p.discount_value)
            .bind(p.total)
            .bind(p.payment_condition)
            .bind(&p.observations)
            .bind(p.status)
            .bind(p.loss_reason)
            .bind(&p.loss_description)
            .bind(p.valid_until)
            .bind(p.created_at)
            .bind(p.closed_at)
            .bind(p.updated_at)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                // Tratamento de erro de chave duplicada
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::ProposalNumberConflict;
                    }
                }
                e.into()
            })?;

        Ok(created)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Proposal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!("SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = $1");

        sqlx::query_as::<_, Proposal>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::ProposalNotFound)
    }

    /// Regrava os campos mutáveis da proposta (status, fechamento,
    /// motivo de perda, observações). Campos de criação não mudam aqui.
    pub async fn save<'e, E>(&self, executor: E, p: &Proposal) -> Result<Proposal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            r#"
            UPDATE proposals
            SET status = $2,
                loss_reason = $3,
                loss_description = $4,
                closed_at = $5,
                observations = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING {PROPOSAL_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Proposal>(&query)
            .bind(p.id)
            .bind(p.status)
            .bind(p.loss_reason)
            .bind(&p.loss_description)
            .bind(p.closed_at)
            .bind(&p.observations)
            .bind(p.updated_at)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::ProposalNotFound)
    }

    /// Listagem paginada com filtro de status e busca textual
    /// (número da proposta e dados do cliente, como no sistema legado).
    pub async fn list<'e, E>(
        &self,
        executor: E,
        status: Option<ProposalStatus>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Proposal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            r#"
            SELECT {PROPOSAL_COLUMNS}
            FROM proposals
            WHERE ($1::proposal_status IS NULL OR status = $1)
              AND ($2::text IS NULL
                   OR proposal_number ILIKE '%' || $2 || '%'
                   OR client->>'name' ILIKE '%' || $2 || '%'
                   OR client->>'email' ILIKE '%' || $2 || '%'
                   OR client->>'company' ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        );

        let proposals = sqlx::query_as::<_, Proposal>(&query)
            .bind(status)
            .bind(search)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;

        Ok(proposals)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        status: Option<ProposalStatus>,
        search: Option<&str>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM proposals
            WHERE ($1::proposal_status IS NULL OR status = $1)
              AND ($2::text IS NULL
                   OR proposal_number ILIKE '%' || $2 || '%'
                   OR client->>'name' ILIKE '%' || $2 || '%'
                   OR client->>'email' ILIKE '%' || $2 || '%'
                   OR client->>'company' ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(status)
        .bind(search)
        .fetch_one(executor)
        .await?;

        Ok(total.0)
    }

    /// Snapshot completo para os agregadores do dashboard.
    /// Os agregadores são funções puras; quem chama decide quando reler.
    pub async fn snapshot<'e, E>(&self, executor: E) -> Result<Vec<Proposal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals ORDER BY created_at ASC"
        );

        let proposals = sqlx::query_as::<_, Proposal>(&query)
            .fetch_all(executor)
            .await?;

        Ok(proposals)
    }

    /// Propostas perdidas com motivo preenchido, na ordem de criação
    /// (a ordem de entrada desempata o ranking de motivos).
    pub async fn list_lost<'e, E>(&self, executor: E) -> Result<Vec<Proposal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            r#"
            SELECT {PROPOSAL_COLUMNS}
            FROM proposals
            WHERE status = $1 AND loss_reason IS NOT NULL
            ORDER BY created_at ASC
            "#
        );

        let proposals = sqlx::query_as::<_, Proposal>(&query)
            .bind(ProposalStatus::VendaPerdida)
            .fetch_all(executor)
            .await?;

        Ok(proposals)
    }
}
