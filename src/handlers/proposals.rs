// src/handlers/proposals.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::proposal::{
        ClientSnapshot, DistributorSnapshot, LossReason, PaymentCondition, ProductSnapshot,
        Proposal, ProposalStatus, SellerSnapshot, SideEffectResult,
    },
    services::proposal_service::{NewProposal, NewProposalItem, TransitionOptions},
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalItemPayload {
    pub product: ProductSnapshot,

    #[validate(range(exclusive_min = 0.0, message = "Quantidade deve ser maior que zero"))]
    pub quantity: f64,

    #[validate(range(min = 0.0, message = "Preço unitário deve ser um número positivo"))]
    pub unit_price: f64,

    #[validate(range(min = 0.0, max = 100.0, message = "Desconto deve estar entre 0 e 100"))]
    #[serde(default)]
    pub discount_percent: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalPayload {
    pub client: ClientSnapshot,
    pub seller: SellerSnapshot,
    pub distributor: DistributorSnapshot,

    #[validate(length(min = 1, message = "Pelo menos um item é obrigatório"), nested)]
    pub items: Vec<CreateProposalItemPayload>,

    pub payment_condition: PaymentCondition,

    #[validate(length(max = 1000, message = "Observações devem ter no máximo 1000 caracteres"))]
    pub observations: Option<String>,

    pub valid_until: NaiveDate,

    // Informado só em importações; no fluxo normal o número é gerado
    pub proposal_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    #[schema(example = "venda_perdida")]
    pub status: ProposalStatus,
    #[schema(example = "preco_concorrente")]
    pub loss_reason: Option<LossReason>,
    pub loss_description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationsPayload {
    #[validate(length(max = 1000, message = "Observações devem ter no máximo 1000 caracteres"))]
    pub observations: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListProposalsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<ProposalStatus>,
    pub search: Option<String>,
}

// =============================================================================
//  RESPOSTAS
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposalWithSideEffects {
    pub proposal: Proposal,
    pub side_effects: Vec<SideEffectResult>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPage {
    pub data: Vec<Proposal>,
    pub pagination: Pagination,
}

// =============================================================================
//  HANDLERS
// =============================================================================

// POST /api/proposals
#[utoipa::path(
    post,
    path = "/api/proposals",
    tag = "Propostas",
    request_body = CreateProposalPayload,
    responses(
        (status = 201, description = "Proposta criada (com resultado das notificações)", body = ProposalWithSideEffects),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Número da proposta já existe")
    )
)]
pub async fn create_proposal(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateProposalPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let input = NewProposal {
        client: payload.client,
        seller: payload.seller,
        distributor: payload.distributor,
        items: payload
            .items
            .into_iter()
            .map(|i| NewProposalItem {
                product: i.product,
                quantity: i.quantity,
                unit_price: i.unit_price,
                discount_percent: i.discount_percent,
            })
            .collect(),
        payment_condition: payload.payment_condition,
        observations: payload.observations,
        valid_until: payload.valid_until,
        proposal_number: payload.proposal_number,
    };

    let (proposal, side_effects) = app_state
        .proposal_service
        .create_proposal(&app_state.db_pool, input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProposalWithSideEffects {
            proposal,
            side_effects,
        }),
    ))
}

// GET /api/proposals
#[utoipa::path(
    get,
    path = "/api/proposals",
    tag = "Propostas",
    params(
        ("page" = Option<i64>, Query, description = "Página (1-based)"),
        ("limit" = Option<i64>, Query, description = "Itens por página (máx. 100)"),
        ("status" = Option<String>, Query, description = "Filtro por status"),
        ("search" = Option<String>, Query, description = "Busca por número ou dados do cliente")
    ),
    responses(
        (status = 200, description = "Listagem paginada de propostas", body = ProposalPage)
    )
)]
pub async fn list_proposals(
    State(app_state): State<AppState>,
    Query(query): Query<ListProposalsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * limit;
    let search = query.search.as_deref().filter(|s| !s.trim().is_empty());

    let data = app_state
        .proposal_service
        .list_proposals(&app_state.db_pool, query.status, search, limit, offset)
        .await?;

    let total = app_state
        .proposal_service
        .count_proposals(&app_state.db_pool, query.status, search)
        .await?;

    Ok(Json(ProposalPage {
        data,
        pagination: Pagination {
            current: page,
            pages: (total + limit - 1) / limit,
            total,
        },
    }))
}

// GET /api/proposals/{id}
#[utoipa::path(
    get,
    path = "/api/proposals/{id}",
    tag = "Propostas",
    params(
        ("id" = Uuid, Path, description = "ID da proposta")
    ),
    responses(
        (status = 200, description = "Proposta encontrada", body = Proposal),
        (status = 404, description = "Proposta não encontrada")
    )
)]
pub async fn get_proposal(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let proposal = app_state
        .proposal_service
        .get_proposal(&app_state.db_pool, id)
        .await?;

    Ok(Json(proposal))
}

// PUT /api/proposals/{id}/status
#[utoipa::path(
    put,
    path = "/api/proposals/{id}/status",
    tag = "Propostas",
    request_body = TransitionPayload,
    params(
        ("id" = Uuid, Path, description = "ID da proposta")
    ),
    responses(
        (status = 200, description = "Transição aplicada; efeitos colaterais relatados canal a canal", body = ProposalWithSideEffects),
        (status = 400, description = "Destino inválido ou motivo da perda ausente"),
        (status = 404, description = "Proposta não encontrada"),
        (status = 409, description = "Proposta já está em estado terminal")
    )
)]
pub async fn transition_proposal(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state
        .proposal_service
        .transition_proposal(
            &app_state.db_pool,
            id,
            payload.status,
            TransitionOptions {
                loss_reason: payload.loss_reason,
                loss_description: payload.loss_description,
            },
        )
        .await?;

    Ok(Json(ProposalWithSideEffects {
        proposal: outcome.proposal,
        side_effects: outcome.side_effects,
    }))
}

// PUT /api/proposals/{id}/observations
#[utoipa::path(
    put,
    path = "/api/proposals/{id}/observations",
    tag = "Propostas",
    request_body = ObservationsPayload,
    params(
        ("id" = Uuid, Path, description = "ID da proposta")
    ),
    responses(
        (status = 200, description = "Observações atualizadas (permitido mesmo após fechamento)", body = Proposal),
        (status = 404, description = "Proposta não encontrada")
    )
)]
pub async fn update_observations(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ObservationsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let proposal = app_state
        .proposal_service
        .update_observations(&app_state.db_pool, id, payload.observations)
        .await?;

    Ok(Json(proposal))
}
