// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::dashboard::{
        DailyBucket, LevelStat, LossReasonStat, MonthlyBucket, ScoredProposal, TodaySnapshot,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DailyQuery {
    #[validate(range(min = 1, max = 12, message = "Mês deve estar entre 1 e 12"))]
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MonthlyQuery {
    // Início do intervalo de meses; o fim é sempre o mês corrente
    pub start: NaiveDate,
}

// GET /api/dashboard/daily
#[utoipa::path(
    get,
    path = "/api/dashboard/daily",
    tag = "Dashboard",
    params(
        ("month" = u32, Query, description = "Mês (1-12)"),
        ("year" = i32, Query, description = "Ano")
    ),
    responses(
        (status = 200, description = "Um bucket por dia do mês (denso, dias sem movimento zerados)", body = Vec<DailyBucket>),
        (status = 400, description = "Mês inválido")
    )
)]
pub async fn get_daily(
    State(app_state): State<AppState>,
    Query(query): Query<DailyQuery>,
) -> Result<impl IntoResponse, AppError> {
    query.validate().map_err(AppError::ValidationError)?;

    let buckets = app_state.report_service.daily(query.month, query.year).await?;
    Ok(Json(buckets))
}

// GET /api/dashboard/monthly
#[utoipa::path(
    get,
    path = "/api/dashboard/monthly",
    tag = "Dashboard",
    params(
        ("start" = String, Query, description = "Data inicial do intervalo (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Um bucket por mês, do início informado até o mês corrente", body = Vec<MonthlyBucket>)
    )
)]
pub async fn get_monthly(
    State(app_state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> Result<impl IntoResponse, AppError> {
    let buckets = app_state.report_service.monthly(query.start).await?;
    Ok(Json(buckets))
}

// GET /api/dashboard/today
#[utoipa::path(
    get,
    path = "/api/dashboard/today",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Cards do dia (negociação mostra o funil inteiro em aberto)", body = TodaySnapshot)
    )
)]
pub async fn get_today(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = app_state.report_service.today().await?;
    Ok(Json(snapshot))
}

// POST /api/dashboard/conversion
// O nível de score vem de quem chama (serviço de score externo); aqui
// só agregamos.
#[utoipa::path(
    post,
    path = "/api/dashboard/conversion",
    tag = "Dashboard",
    request_body = Vec<ScoredProposal>,
    responses(
        (status = 200, description = "Taxa de conversão por nível de score", body = Vec<LevelStat>)
    )
)]
pub async fn get_conversion(
    State(app_state): State<AppState>,
    Json(scored): Json<Vec<ScoredProposal>>,
) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.report_service.conversion(&scored);
    Ok(Json(stats))
}

// GET /api/dashboard/loss-reasons
#[utoipa::path(
    get,
    path = "/api/dashboard/loss-reasons",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Motivos de perda ordenados por frequência", body = Vec<LossReasonStat>)
    )
)]
pub async fn get_loss_reasons(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.report_service.loss_reasons().await?;
    Ok(Json(stats))
}
