// src/services/report_service.rs
//
// Agregação de propostas por período para o dashboard.
//
// Regra central (datação dupla): toda proposta conta como "gerada" no
// período do created_at e, de forma independente, como "fechada" ou
// "perdida" no período do closed_at (fallback updated_at). Uma proposta
// criada em outubro e fechada em novembro aparece nos DOIS meses, em
// métricas diferentes. Não colapsar para uma data única.
//
// Todas as funções daqui são puras sobre um snapshot explícito; quem
// chama decide quando reler o banco e reagregar.

use chrono::{Datelike, NaiveDate, Utc};

use crate::{
    common::error::AppError,
    db::ProposalRepository,
    models::dashboard::{
        DailyBucket, LevelStat, LossReasonStat, MonthlyBucket, ScoredProposal, TodaySnapshot,
    },
    models::proposal::{Proposal, ProposalStatus},
};

// =========================================================================
//  MOTOR DE AGREGAÇÃO POR PERÍODO
// =========================================================================

/// Um bucket por dia do mês, denso: dias sem movimento vêm zerados.
/// Mês inválido rende lista vazia.
pub fn aggregate_by_day(proposals: &[Proposal], month: u32, year: i32) -> Vec<DailyBucket> {
    let Some(days) = days_in_month(year, month) else {
        return Vec::new();
    };

    let mut buckets: Vec<DailyBucket> = (1..=days).map(DailyBucket::empty).collect();

    for p in proposals {
        let created = p.created_at.date_naive();
        if created.year() == year && created.month() == month {
            let bucket = &mut buckets[(created.day() - 1) as usize];
            bucket.generated_count += 1;
            bucket.generated_value += p.total;

            // "Em negociação" no bucket diário: criada NESTE dia e ainda
            // aberta no momento da leitura (o status não é reconstruído
            // historicamente).
            if p.status == ProposalStatus::Negociacao {
                bucket.negotiating_count += 1;
                bucket.negotiating_value += p.total;
            }
        }

        match p.status {
            ProposalStatus::VendaFechada | ProposalStatus::VendaPerdida => {
                let closed = p.effective_closed_at().date_naive();
                if closed.year() == year && closed.month() == month {
                    let bucket = &mut buckets[(closed.day() - 1) as usize];
                    if p.status == ProposalStatus::VendaFechada {
                        bucket.won_count += 1;
                        bucket.won_value += p.total;
                    } else {
                        bucket.lost_count += 1;
                        bucket.lost_value += p.total;
                    }
                }
            }
            _ => {}
        }
    }

    buckets
}

/// Um bucket por mês do calendário, de `range_start` até `today`
/// inclusive. O início do intervalo vem de quem chama; nada é fixo aqui.
/// `range_start` no futuro rende lista vazia, sem erro.
pub fn aggregate_by_month(
    proposals: &[Proposal],
    range_start: NaiveDate,
    today: NaiveDate,
) -> Vec<MonthlyBucket> {
    if range_start > today {
        return Vec::new();
    }

    let start = month_index(range_start.year(), range_start.month());
    let end = month_index(today.year(), today.month());

    let mut buckets: Vec<MonthlyBucket> = (start..=end)
        .map(|idx| {
            MonthlyBucket::empty((idx.rem_euclid(12)) as u32 + 1, (idx.div_euclid(12)) as i32)
        })
        .collect();

    for p in proposals {
        let created = p.created_at.date_naive();
        let created_idx = month_index(created.year(), created.month());
        if (start..=end).contains(&created_idx) {
            let bucket = &mut buckets[(created_idx - start) as usize];
            bucket.generated_count += 1;
            bucket.generated_value += p.total;
        }

        match p.status {
            ProposalStatus::VendaFechada | ProposalStatus::VendaPerdida => {
                let closed = p.effective_closed_at().date_naive();
                let closed_idx = month_index(closed.year(), closed.month());
                if (start..=end).contains(&closed_idx) {
                    let bucket = &mut buckets[(closed_idx - start) as usize];
                    if p.status == ProposalStatus::VendaFechada {
                        bucket.sales += 1;
                        bucket.revenue += p.total;
                    } else {
                        bucket.lost_count += 1;
                        bucket.lost_value += p.total;
                    }
                }
            }
            _ => {}
        }
    }

    buckets
}

/// Cards de "hoje". Mesma datação dupla restrita a um único dia, MAS o
/// card de negociação mostra o funil inteiro em aberto, independente da
/// data de criação. A assimetria com o bucket diário é herdada do
/// sistema original e mantida de propósito.
pub fn today_snapshot(proposals: &[Proposal], reference_date: NaiveDate) -> TodaySnapshot {
    let mut snapshot = TodaySnapshot {
        generated_count: 0,
        generated_value: 0.0,
        won_count: 0,
        won_value: 0.0,
        lost_count: 0,
        lost_value: 0.0,
        negotiating_count: 0,
        negotiating_value: 0.0,
    };

    for p in proposals {
        if p.created_at.date_naive() == reference_date {
            snapshot.generated_count += 1;
            snapshot.generated_value += p.total;
        }

        match p.status {
            ProposalStatus::Negociacao => {
                snapshot.negotiating_count += 1;
                snapshot.negotiating_value += p.total;
            }
            ProposalStatus::VendaFechada => {
                if p.effective_closed_at().date_naive() == reference_date {
                    snapshot.won_count += 1;
                    snapshot.won_value += p.total;
                }
            }
            ProposalStatus::VendaPerdida => {
                if p.effective_closed_at().date_naive() == reference_date {
                    snapshot.lost_count += 1;
                    snapshot.lost_value += p.total;
                }
            }
            ProposalStatus::Expirada => {}
        }
    }

    snapshot
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

// Índice linear de meses para enumerar intervalos entre anos
fn month_index(year: i32, month: u32) -> i64 {
    year as i64 * 12 + (month as i64 - 1)
}

// =========================================================================
//  CONVERSÃO E MOTIVOS DE PERDA
// =========================================================================

/// Taxa de conversão por nível de score: won / (won + lost) * 100.
/// Propostas ainda em negociação (e expiradas) ficam fora do
/// denominador; nível sem fechamento reporta taxa 0, nunca NaN.
/// A ordem de saída é a ordem da primeira ocorrência de cada nível.
pub fn conversion_rate_by_level(scored: &[ScoredProposal]) -> Vec<LevelStat> {
    let mut stats: Vec<LevelStat> = Vec::new();

    for s in scored {
        let idx = match stats.iter().position(|l| l.level == s.level) {
            Some(i) => i,
            None => {
                stats.push(LevelStat {
                    level: s.level.clone(),
                    total: 0,
                    closed: 0,
                    won: 0,
                    rate: 0.0,
                });
                stats.len() - 1
            }
        };

        let entry = &mut stats[idx];
        entry.total += 1;
        match s.status {
            ProposalStatus::VendaFechada => {
                entry.closed += 1;
                entry.won += 1;
            }
            ProposalStatus::VendaPerdida => {
                entry.closed += 1;
            }
            _ => {}
        }
    }

    for entry in &mut stats {
        entry.rate = if entry.closed > 0 {
            entry.won as f64 / entry.closed as f64 * 100.0
        } else {
            0.0
        };
    }

    stats
}

/// Agrupa perdidas por motivo e ordena por frequência (desc). Empates
/// preservam a ordem da primeira ocorrência: a ordenação é estável e o
/// resultado determinístico para a mesma entrada.
pub fn rank_loss_reasons(lost_proposals: &[Proposal]) -> Vec<LossReasonStat> {
    let mut stats: Vec<LossReasonStat> = Vec::new();

    for p in lost_proposals {
        if p.status != ProposalStatus::VendaPerdida {
            continue;
        }
        let Some(reason) = p.loss_reason else {
            continue;
        };

        let code = reason.code();
        let idx = match stats.iter().position(|s| s.reason == code) {
            Some(i) => i,
            None => {
                stats.push(LossReasonStat {
                    reason: code.to_string(),
                    label: reason.label().to_string(),
                    count: 0,
                    total_value: 0.0,
                });
                stats.len() - 1
            }
        };

        stats[idx].count += 1;
        stats[idx].total_value += p.total;
    }

    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats
}

// =========================================================================
//  SERVIÇO (liga o snapshot do repositório às funções puras)
// =========================================================================

#[derive(Clone)]
pub struct ReportService {
    repo: ProposalRepository,
}

impl ReportService {
    pub fn new(repo: ProposalRepository) -> Self {
        Self { repo }
    }

    pub async fn daily(&self, month: u32, year: i32) -> Result<Vec<DailyBucket>, AppError> {
        let snapshot = self.repo.snapshot(self.repo.pool()).await?;
        Ok(aggregate_by_day(&snapshot, month, year))
    }

    pub async fn monthly(&self, range_start: NaiveDate) -> Result<Vec<MonthlyBucket>, AppError> {
        let snapshot = self.repo.snapshot(self.repo.pool()).await?;
        Ok(aggregate_by_month(
            &snapshot,
            range_start,
            Utc::now().date_naive(),
        ))
    }

    pub async fn today(&self) -> Result<TodaySnapshot, AppError> {
        let snapshot = self.repo.snapshot(self.repo.pool()).await?;
        Ok(today_snapshot(&snapshot, Utc::now().date_naive()))
    }

    pub async fn loss_reasons(&self) -> Result<Vec<LossReasonStat>, AppError> {
        let lost = self.repo.list_lost(self.repo.pool()).await?;
        Ok(rank_loss_reasons(&lost))
    }

    pub fn conversion(&self, scored: &[ScoredProposal]) -> Vec<LevelStat> {
        conversion_rate_by_level(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::proposal::{
        ClientSnapshot, DistributorSnapshot, LossReason, PaymentCondition, SellerSnapshot,
    };
    use chrono::{DateTime, Utc};
    use sqlx::types::Json;
    use uuid::Uuid;

    fn at_noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn proposta(
        status: ProposalStatus,
        total: f64,
        created_at: DateTime<Utc>,
        closed_at: Option<DateTime<Utc>>,
    ) -> Proposal {
        Proposal {
            id: Uuid::new_v4(),
            proposal_number: format!("PROP-{}", Uuid::new_v4()),
            client: Json(ClientSnapshot {
                name: "Cliente".to_string(),
                email: "cliente@teste.com".to_string(),
                phone: None,
                company: None,
            }),
            seller: Json(SellerSnapshot {
                id: Uuid::new_v4(),
                name: "Vendedor".to_string(),
                email: "vendedor@teste.com".to_string(),
                phone: None,
            }),
            distributor: Json(DistributorSnapshot {
                id: Uuid::new_v4(),
                apelido: None,
                razao_social: None,
            }),
            items: Json(vec![]),
            subtotal: total,
            discount_value: 0.0,
            total,
            payment_condition: PaymentCondition::AVista,
            observations: None,
            status,
            loss_reason: match status {
                ProposalStatus::VendaPerdida => Some(LossReason::SemRetorno),
                _ => None,
            },
            loss_description: None,
            valid_until: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            created_at,
            closed_at,
            updated_at: closed_at.unwrap_or(created_at),
        }
    }

    fn perdida_por(
        reason: LossReason,
        total: f64,
        created_at: DateTime<Utc>,
    ) -> Proposal {
        let mut p = proposta(
            ProposalStatus::VendaPerdida,
            total,
            created_at,
            Some(created_at),
        );
        p.loss_reason = Some(reason);
        p
    }

    #[test]
    fn datacao_dupla_criada_em_outubro_fechada_em_novembro() {
        // Criada 05/10/2025 com total 1000, fechada 02/11/2025: outubro
        // registra a geração, novembro registra a venda.
        let p = proposta(
            ProposalStatus::VendaFechada,
            1000.0,
            at_noon(2025, 10, 5),
            Some(at_noon(2025, 11, 2)),
        );
        let proposals = vec![p];

        let october = aggregate_by_day(&proposals, 10, 2025);
        let november = aggregate_by_day(&proposals, 11, 2025);

        let oct5 = &october[4];
        assert_eq!(oct5.generated_count, 1);
        assert_eq!(oct5.generated_value, 1000.0);
        assert_eq!(oct5.won_count, 0);
        // Fechada: não conta mais como negociação do dia de criação
        assert_eq!(oct5.negotiating_count, 0);

        let nov2 = &november[1];
        assert_eq!(nov2.won_count, 1);
        assert_eq!(nov2.won_value, 1000.0);
        assert_eq!(nov2.generated_count, 0);

        // Mensal: outubro gera, novembro fatura
        let monthly = aggregate_by_month(
            &proposals,
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
        );
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].month, 10);
        assert_eq!(monthly[0].generated_count, 1);
        assert_eq!(monthly[0].sales, 0);
        assert_eq!(monthly[1].month, 11);
        assert_eq!(monthly[1].generated_count, 0);
        assert_eq!(monthly[1].sales, 1);
        assert_eq!(monthly[1].revenue, 1000.0);
    }

    #[test]
    fn buckets_diarios_sao_densos_e_zerados() {
        let buckets = aggregate_by_day(&[], 10, 2025);
        assert_eq!(buckets.len(), 31);
        assert!(buckets
            .iter()
            .enumerate()
            .all(|(i, b)| b.day == i as u32 + 1 && *b == DailyBucket::empty(b.day)));

        // Fevereiro bissexto
        assert_eq!(aggregate_by_day(&[], 2, 2024).len(), 29);
        assert_eq!(aggregate_by_day(&[], 2, 2025).len(), 28);

        // Mês inválido não explode
        assert!(aggregate_by_day(&[], 13, 2025).is_empty());
    }

    #[test]
    fn negociando_no_dia_conta_apenas_criadas_naquele_dia() {
        let proposals = vec![
            proposta(ProposalStatus::Negociacao, 100.0, at_noon(2025, 10, 5), None),
            // Criada em setembro, ainda aberta: não entra no diário de outubro
            proposta(ProposalStatus::Negociacao, 200.0, at_noon(2025, 9, 20), None),
        ];

        let october = aggregate_by_day(&proposals, 10, 2025);
        assert_eq!(october[4].negotiating_count, 1);
        assert_eq!(october[4].negotiating_value, 100.0);
        let total_negotiating: u64 = october.iter().map(|b| b.negotiating_count).sum();
        assert_eq!(total_negotiating, 1);
    }

    #[test]
    fn snapshot_de_hoje_mostra_o_funil_inteiro_em_negociacao() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 5).unwrap();
        let proposals = vec![
            proposta(ProposalStatus::Negociacao, 100.0, at_noon(2025, 10, 5), None),
            // Criada meses antes, mas segue aberta: o card de hoje inclui
            proposta(ProposalStatus::Negociacao, 200.0, at_noon(2025, 7, 1), None),
            proposta(
                ProposalStatus::VendaFechada,
                300.0,
                at_noon(2025, 9, 1),
                Some(at_noon(2025, 10, 5)),
            ),
            proposta(
                ProposalStatus::VendaPerdida,
                50.0,
                at_noon(2025, 9, 2),
                Some(at_noon(2025, 10, 4)),
            ),
        ];

        let snapshot = today_snapshot(&proposals, today);

        assert_eq!(snapshot.generated_count, 1);
        assert_eq!(snapshot.generated_value, 100.0);
        assert_eq!(snapshot.won_count, 1);
        assert_eq!(snapshot.won_value, 300.0);
        // Perdida ontem: fora do card de hoje
        assert_eq!(snapshot.lost_count, 0);
        // Assimetria intencional: TODO o funil aberto, não só o de hoje
        assert_eq!(snapshot.negotiating_count, 2);
        assert_eq!(snapshot.negotiating_value, 300.0);
    }

    #[test]
    fn fallback_para_updated_at_quando_closed_at_falta() {
        // Registro migrado sem closed_at: a data efetiva vem do updated_at
        let mut p = proposta(
            ProposalStatus::VendaFechada,
            500.0,
            at_noon(2025, 10, 1),
            None,
        );
        p.updated_at = at_noon(2025, 11, 10);

        let november = aggregate_by_day(&[p], 11, 2025);
        assert_eq!(november[9].won_count, 1);
        assert_eq!(november[9].won_value, 500.0);
    }

    #[test]
    fn agregacao_mensal_e_independente_da_ordem_dos_elementos() {
        let mut proposals = vec![
            proposta(
                ProposalStatus::VendaFechada,
                100.0,
                at_noon(2025, 1, 10),
                Some(at_noon(2025, 2, 1)),
            ),
            proposta(ProposalStatus::Negociacao, 200.0, at_noon(2025, 2, 5), None),
            proposta(
                ProposalStatus::VendaPerdida,
                300.0,
                at_noon(2025, 1, 20),
                Some(at_noon(2025, 3, 15)),
            ),
            proposta(ProposalStatus::Expirada, 400.0, at_noon(2025, 3, 1), None),
        ];

        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();

        let forward = aggregate_by_month(&proposals, start, today);
        proposals.reverse();
        let backward = aggregate_by_month(&proposals, start, today);

        assert_eq!(forward, backward);
    }

    #[test]
    fn intervalo_mensal_cruza_a_virada_do_ano() {
        let start = NaiveDate::from_ymd_opt(2024, 11, 15).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();

        let buckets = aggregate_by_month(&[], start, today);
        let labels: Vec<(u32, i32)> = buckets.iter().map(|b| (b.month, b.year)).collect();
        assert_eq!(
            labels,
            vec![(11, 2024), (12, 2024), (1, 2025), (2, 2025)]
        );
    }

    #[test]
    fn inicio_no_futuro_rende_intervalo_vazio() {
        let start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 10, 5).unwrap();
        assert!(aggregate_by_month(&[], start, today).is_empty());
    }

    #[test]
    fn conversao_por_nivel_ignora_negociacao_no_denominador() {
        let scored = vec![
            ScoredProposal {
                level: "alto".to_string(),
                status: ProposalStatus::VendaFechada,
            },
            ScoredProposal {
                level: "alto".to_string(),
                status: ProposalStatus::VendaPerdida,
            },
            ScoredProposal {
                level: "alto".to_string(),
                status: ProposalStatus::Negociacao,
            },
            ScoredProposal {
                level: "alto".to_string(),
                status: ProposalStatus::VendaFechada,
            },
        ];

        let stats = conversion_rate_by_level(&scored);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total, 4);
        assert_eq!(stats[0].closed, 3);
        assert_eq!(stats[0].won, 2);
        assert!((stats[0].rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn nivel_sem_fechamento_reporta_taxa_zero() {
        let scored = vec![
            ScoredProposal {
                level: "baixo".to_string(),
                status: ProposalStatus::Negociacao,
            },
            ScoredProposal {
                level: "baixo".to_string(),
                status: ProposalStatus::Expirada,
            },
        ];

        let stats = conversion_rate_by_level(&scored);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].closed, 0);
        assert_eq!(stats[0].rate, 0.0);
        assert!(stats[0].rate.is_finite());
    }

    #[test]
    fn ranking_de_motivos_ordena_por_frequencia_com_empate_estavel() {
        let d = at_noon(2025, 10, 1);
        // Sequência A, B, A, C, B, A
        let a = LossReason::PrecoConcorrente;
        let b = LossReason::SemRetorno;
        let c = LossReason::CreditoNegado;
        let lost = vec![
            perdida_por(a, 100.0, d),
            perdida_por(b, 200.0, d),
            perdida_por(a, 100.0, d),
            perdida_por(c, 500.0, d),
            perdida_por(b, 200.0, d),
            perdida_por(a, 100.0, d),
        ];

        let ranking = rank_loss_reasons(&lost);

        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking[0].reason, "preco_concorrente");
        assert_eq!(ranking[0].count, 3);
        assert_eq!(ranking[0].total_value, 300.0);
        assert_eq!(ranking[0].label, "Preço Concorrente");
        assert_eq!(ranking[1].reason, "sem_retorno");
        assert_eq!(ranking[1].count, 2);
        assert_eq!(ranking[2].reason, "credito_negado");
        assert_eq!(ranking[2].count, 1);
    }

    #[test]
    fn ranking_ignora_registros_sem_motivo_ou_nao_perdidos() {
        let d = at_noon(2025, 10, 1);
        let mut sem_motivo = proposta(ProposalStatus::VendaPerdida, 100.0, d, Some(d));
        sem_motivo.loss_reason = None;
        let fechada = proposta(ProposalStatus::VendaFechada, 100.0, d, Some(d));

        let ranking = rank_loss_reasons(&[sem_motivo, fechada]);
        assert!(ranking.is_empty());
    }
}
