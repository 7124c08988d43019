// src/services/proposal_service.rs

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProposalRepository,
    models::proposal::{
        compute_totals, generate_proposal_number, ClientSnapshot, DistributorSnapshot,
        PaymentCondition, ProductSnapshot, Proposal, ProposalItem, ProposalStatus,
        LossReason, SellerSnapshot, SideEffectResult,
    },
    services::goals::GoalUpdater,
    services::whatsapp::Notifier,
};

// =========================================================================
//  ENTRADAS E SAÍDAS
// =========================================================================

/// Dados de criação já validados na borda. Subtotal, desconto e total são
/// sempre recalculados aqui; valores vindos do cliente são ignorados.
#[derive(Debug)]
pub struct NewProposal {
    pub client: ClientSnapshot,
    pub seller: SellerSnapshot,
    pub distributor: DistributorSnapshot,
    pub items: Vec<NewProposalItem>,
    pub payment_condition: PaymentCondition,
    pub observations: Option<String>,
    pub valid_until: NaiveDate,
    pub proposal_number: Option<String>,
}

#[derive(Debug)]
pub struct NewProposalItem {
    pub product: ProductSnapshot,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
}

#[derive(Debug, Default, Clone)]
pub struct TransitionOptions {
    pub loss_reason: Option<LossReason>,
    pub loss_description: Option<String>,
}

#[derive(Debug)]
pub struct TransitionOutcome {
    pub proposal: Proposal,
    pub side_effects: Vec<SideEffectResult>,
}

// =========================================================================
//  A MÁQUINA DE ESTADOS
// =========================================================================
// negociacao -> venda_fechada | venda_perdida | expirada, e nada mais.
// Todos os destinos são terminais; repetir um fechamento é erro, não
// idempotência.

pub fn apply_transition(
    proposal: &mut Proposal,
    target: ProposalStatus,
    opts: &TransitionOptions,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if proposal.status.is_terminal() {
        return Err(AppError::InvalidTransition(proposal.status));
    }

    match target {
        ProposalStatus::Negociacao => {
            // Não existe transição de negociação para ela mesma
            return Err(AppError::InvalidTargetStatus("negociacao"));
        }
        ProposalStatus::VendaPerdida => {
            // A borda já rejeitou códigos fora do enum; aqui só falta
            // garantir a presença do motivo.
            let reason = opts.loss_reason.ok_or(AppError::MissingLossReason)?;
            proposal.loss_reason = Some(reason);
            proposal.loss_description = opts.loss_description.clone();
            proposal.closed_at = Some(now);
        }
        ProposalStatus::VendaFechada => {
            proposal.closed_at = Some(now);
        }
        ProposalStatus::Expirada => {
            // Expiração é ação explícita e não carrega closed_at
        }
    }

    proposal.status = target;
    proposal.updated_at = now;
    Ok(())
}

/// Dispara os efeitos colaterais de uma transição já persistida.
/// Tudo roda em paralelo e com falhas isoladas por canal; o resultado é
/// apenas informativo e nunca desfaz a transição.
pub async fn dispatch_transition_effects(
    notifier: &Notifier,
    goals: &dyn GoalUpdater,
    proposal: &Proposal,
) -> Vec<SideEffectResult> {
    match proposal.status {
        ProposalStatus::VendaFechada => {
            let goal_update = async {
                match goals.record_win(proposal.seller.id, proposal.total).await {
                    Ok(()) => SideEffectResult {
                        channel: "meta_vendas".to_string(),
                        success: true,
                    },
                    Err(e) => {
                        tracing::error!("❌ Erro ao recalcular metas (não bloqueia): {}", e);
                        SideEffectResult {
                            channel: "meta_vendas".to_string(),
                            success: false,
                        }
                    }
                }
            };

            let (mut results, goal_result) = tokio::join!(notifier.notify_won(proposal), goal_update);
            results.push(goal_result);
            results
        }
        ProposalStatus::VendaPerdida => notifier.notify_lost(proposal).await,
        _ => Vec::new(),
    }
}

// =========================================================================
//  SERVIÇO
// =========================================================================

#[derive(Clone)]
pub struct ProposalService {
    repo: ProposalRepository,
    notifier: Notifier,
    goals: Arc<dyn GoalUpdater>,
}

impl ProposalService {
    pub fn new(repo: ProposalRepository, notifier: Notifier, goals: Arc<dyn GoalUpdater>) -> Self {
        Self {
            repo,
            notifier,
            goals,
        }
    }

    pub async fn create_proposal<'e, E>(
        &self,
        executor: E,
        input: NewProposal,
    ) -> Result<(Proposal, Vec<SideEffectResult>), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let now = Utc::now();

        let items: Vec<ProposalItem> = input
            .items
            .into_iter()
            .map(|i| ProposalItem {
                line_total: ProposalItem::compute_line_total(
                    i.quantity,
                    i.unit_price,
                    i.discount_percent,
                ),
                product: i.product,
                quantity: i.quantity,
                unit_price: i.unit_price,
                discount_percent: i.discount_percent,
            })
            .collect();

        let (subtotal, discount_value, total) = compute_totals(&items);

        let proposal = Proposal {
            id: Uuid::new_v4(),
            proposal_number: input
                .proposal_number
                .unwrap_or_else(|| generate_proposal_number(now)),
            client: sqlx::types::Json(input.client),
            seller: sqlx::types::Json(input.seller),
            distributor: sqlx::types::Json(input.distributor),
            items: sqlx::types::Json(items),
            subtotal,
            discount_value,
            total,
            payment_condition: input.payment_condition,
            observations: input.observations,
            status: ProposalStatus::Negociacao,
            loss_reason: None,
            loss_description: None,
            valid_until: input.valid_until,
            created_at: now,
            closed_at: None,
            updated_at: now,
        };

        let created = self.repo.create(executor, &proposal).await?;

        // Notificação de criação é melhor esforço: o resultado por canal
        // volta para quem chamou, mas a proposta já está salva.
        let side_effects = self.notifier.notify_created(&created).await;

        Ok((created, side_effects))
    }

    /// A operação central do ciclo de vida: lê, valida, regrava e só
    /// depois do commit dispara notificações e metas.
    pub async fn transition_proposal<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        target: ProposalStatus,
        opts: TransitionOptions,
    ) -> Result<TransitionOutcome, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let mut proposal = self.repo.find_by_id(&mut *tx, id).await?;
        apply_transition(&mut proposal, target, &opts, Utc::now())?;
        let saved = self.repo.save(&mut *tx, &proposal).await?;

        tx.commit().await?;

        let side_effects =
            dispatch_transition_effects(&self.notifier, self.goals.as_ref(), &saved).await;

        Ok(TransitionOutcome {
            proposal: saved,
            side_effects,
        })
    }

    /// Observações são o único campo editável depois do fechamento.
    pub async fn update_observations<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        observations: Option<String>,
    ) -> Result<Proposal, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let mut proposal = self.repo.find_by_id(&mut *tx, id).await?;
        proposal.observations = observations;
        proposal.updated_at = Utc::now();
        let saved = self.repo.save(&mut *tx, &proposal).await?;

        tx.commit().await?;
        Ok(saved)
    }

    pub async fn get_proposal<'e, E>(&self, executor: E, id: Uuid) -> Result<Proposal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.find_by_id(executor, id).await
    }

    pub async fn list_proposals<'e, E>(
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
        self.repo.list(executor, status, search, limit, offset).await
    }

    pub async fn count_proposals<'e, E>(
        &self,
        executor: E,
        status: Option<ProposalStatus>,
        search: Option<&str>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.count(executor, status, search).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::whatsapp::{
        DeliveryError, DeliveryInfo, NotificationDispatcher,
    };
    use crate::services::goals::UpdateError;
    use async_trait::async_trait;
    use sqlx::types::Json;
    use std::sync::Mutex;

    fn proposta_base() -> Proposal {
        let now = Utc::now();
        Proposal {
            id: Uuid::new_v4(),
            proposal_number: "PROP-20250101000000-0001".to_string(),
            client: Json(ClientSnapshot {
                name: "Cliente Teste".to_string(),
                email: "cliente@teste.com".to_string(),
                phone: Some("64999990000".to_string()),
                company: None,
            }),
            seller: Json(SellerSnapshot {
                id: Uuid::new_v4(),
                name: "Vendedor Teste".to_string(),
                email: "vendedor@teste.com".to_string(),
                phone: Some("64999991111".to_string()),
            }),
            distributor: Json(DistributorSnapshot {
                id: Uuid::new_v4(),
                apelido: Some("Distribuidora X".to_string()),
                razao_social: None,
            }),
            items: Json(vec![]),
            subtotal: 1000.0,
            discount_value: 0.0,
            total: 1000.0,
            payment_condition: PaymentCondition::AVista,
            observations: None,
            status: ProposalStatus::Negociacao,
            loss_reason: None,
            loss_description: None,
            valid_until: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            created_at: now,
            closed_at: None,
            updated_at: now,
        }
    }

    #[test]
    fn fechar_venda_define_status_e_closed_at() {
        let mut p = proposta_base();
        let now = Utc::now();

        apply_transition(
            &mut p,
            ProposalStatus::VendaFechada,
            &TransitionOptions::default(),
            now,
        )
        .unwrap();

        assert_eq!(p.status, ProposalStatus::VendaFechada);
        assert_eq!(p.closed_at, Some(now));
        assert_eq!(p.updated_at, now);
        assert!(p.loss_reason.is_none());
    }

    #[test]
    fn perder_venda_exige_motivo() {
        let mut p = proposta_base();
        let before = p.clone();

        let err = apply_transition(
            &mut p,
            ProposalStatus::VendaPerdida,
            &TransitionOptions::default(),
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(err, AppError::MissingLossReason));
        // O registro fica intacto quando a validação falha
        assert_eq!(p.status, before.status);
        assert_eq!(p.closed_at, before.closed_at);
        assert!(p.loss_reason.is_none());
    }

    #[test]
    fn perder_venda_com_motivo_preenche_tudo() {
        let mut p = proposta_base();
        let now = Utc::now();

        apply_transition(
            &mut p,
            ProposalStatus::VendaPerdida,
            &TransitionOptions {
                loss_reason: Some(LossReason::PrecoConcorrente),
                loss_description: Some("Concorrente cobriu a oferta".to_string()),
            },
            now,
        )
        .unwrap();

        assert_eq!(p.status, ProposalStatus::VendaPerdida);
        assert_eq!(p.loss_reason, Some(LossReason::PrecoConcorrente));
        assert_eq!(
            p.loss_description.as_deref(),
            Some("Concorrente cobriu a oferta")
        );
        assert_eq!(p.closed_at, Some(now));
    }

    #[test]
    fn expirar_nao_carrega_closed_at() {
        let mut p = proposta_base();

        apply_transition(
            &mut p,
            ProposalStatus::Expirada,
            &TransitionOptions::default(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(p.status, ProposalStatus::Expirada);
        assert!(p.closed_at.is_none());
    }

    #[test]
    fn estado_terminal_rejeita_qualquer_destino() {
        for terminal in [
            ProposalStatus::VendaFechada,
            ProposalStatus::VendaPerdida,
            ProposalStatus::Expirada,
        ] {
            for target in [
                ProposalStatus::VendaFechada,
                ProposalStatus::VendaPerdida,
                ProposalStatus::Expirada,
            ] {
                let mut p = proposta_base();
                p.status = terminal;

                let err = apply_transition(
                    &mut p,
                    target,
                    &TransitionOptions {
                        loss_reason: Some(LossReason::SemRetorno),
                        loss_description: None,
                    },
                    Utc::now(),
                )
                .unwrap_err();

                assert!(
                    matches!(err, AppError::InvalidTransition(from) if from == terminal),
                    "esperava InvalidTransition a partir de {terminal:?} para {target:?}"
                );
            }
        }
    }

    #[test]
    fn negociacao_nao_e_destino_valido() {
        let mut p = proposta_base();
        let err = apply_transition(
            &mut p,
            ProposalStatus::Negociacao,
            &TransitionOptions::default(),
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidTargetStatus(_)));
        assert_eq!(p.status, ProposalStatus::Negociacao);
    }

    // --- EFEITOS COLATERAIS ---

    struct FailingDispatcher;

    #[async_trait]
    impl NotificationDispatcher for FailingDispatcher {
        async fn send(&self, _phone: &str, _message: &str) -> Result<DeliveryInfo, DeliveryError> {
            Err(DeliveryError::Provider("provedor fora do ar".to_string()))
        }
    }

    struct OkDispatcher;

    #[async_trait]
    impl NotificationDispatcher for OkDispatcher {
        async fn send(&self, phone: &str, _message: &str) -> Result<DeliveryInfo, DeliveryError> {
            Ok(DeliveryInfo {
                recipient: phone.to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingGoalUpdater {
        calls: Mutex<Vec<(Uuid, f64)>>,
    }

    #[async_trait]
    impl GoalUpdater for RecordingGoalUpdater {
        async fn record_win(&self, seller_id: Uuid, amount: f64) -> Result<(), UpdateError> {
            self.calls.lock().unwrap().push((seller_id, amount));
            Ok(())
        }
    }

    #[tokio::test]
    async fn venda_fechada_dispara_notificacoes_e_meta() {
        let mut p = proposta_base();
        p.status = ProposalStatus::VendaFechada;

        let notifier = Notifier::new(
            Arc::new(OkDispatcher),
            Some("5511988887777".to_string()),
        );
        let goals = RecordingGoalUpdater::default();

        let results = dispatch_transition_effects(&notifier, &goals, &p).await;

        let channels: Vec<&str> = results.iter().map(|r| r.channel.as_str()).collect();
        assert!(channels.contains(&"whatsapp_vendedor"));
        assert!(channels.contains(&"whatsapp_admin"));
        assert!(channels.contains(&"meta_vendas"));
        assert!(results.iter().all(|r| r.success));

        let calls = goals.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (p.seller.id, 1000.0));
    }

    #[tokio::test]
    async fn canal_indisponivel_vira_success_false_sem_erro() {
        let mut p = proposta_base();
        p.status = ProposalStatus::VendaPerdida;
        p.loss_reason = Some(LossReason::PrecoConcorrente);

        let notifier = Notifier::new(Arc::new(FailingDispatcher), None);
        let goals = RecordingGoalUpdater::default();

        // A chamada resolve normalmente mesmo com o canal fora do ar
        let results = dispatch_transition_effects(&notifier, &goals, &p).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].channel, "whatsapp_vendedor");
        assert!(!results[0].success);
        // Perda não mexe em meta
        assert!(goals.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn expirada_nao_dispara_efeitos() {
        let mut p = proposta_base();
        p.status = ProposalStatus::Expirada;

        let notifier = Notifier::new(Arc::new(OkDispatcher), None);
        let goals = RecordingGoalUpdater::default();

        let results = dispatch_transition_effects(&notifier, &goals, &p).await;
        assert!(results.is_empty());
        assert!(goals.calls.lock().unwrap().is_empty());
    }
}
