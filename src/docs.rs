// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Propostas ---
        handlers::proposals::create_proposal,
        handlers::proposals::list_proposals,
        handlers::proposals::get_proposal,
        handlers::proposals::transition_proposal,
        handlers::proposals::update_observations,

        // --- Dashboard ---
        handlers::dashboard::get_daily,
        handlers::dashboard::get_monthly,
        handlers::dashboard::get_today,
        handlers::dashboard::get_conversion,
        handlers::dashboard::get_loss_reasons,
    ),
    components(
        schemas(
            models::proposal::Proposal,
            models::proposal::ProposalStatus,
            models::proposal::LossReason,
            models::proposal::PaymentCondition,
            models::proposal::ProposalItem,
            models::proposal::ProductSnapshot,
            models::proposal::ClientSnapshot,
            models::proposal::SellerSnapshot,
            models::proposal::DistributorSnapshot,
            models::proposal::SideEffectResult,
            models::dashboard::DailyBucket,
            models::dashboard::MonthlyBucket,
            models::dashboard::TodaySnapshot,
            models::dashboard::ScoredProposal,
            models::dashboard::LevelStat,
            models::dashboard::LossReasonStat,
            handlers::proposals::CreateProposalPayload,
            handlers::proposals::CreateProposalItemPayload,
            handlers::proposals::TransitionPayload,
            handlers::proposals::ObservationsPayload,
            handlers::proposals::ProposalWithSideEffects,
            handlers::proposals::ProposalPage,
            handlers::proposals::Pagination,
        )
    ),
    tags(
        (name = "Propostas", description = "Ciclo de vida das propostas comerciais"),
        (name = "Dashboard", description = "Agregações de vendas por período")
    )
)]
pub struct ApiDoc;
