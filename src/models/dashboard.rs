// src/models/dashboard.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::proposal::ProposalStatus;

// Datação dupla em todos os buckets: "geradas" segue created_at,
// "fechadas"/"perdidas" seguem closed_at (fallback updated_at).

// 1. Bucket diário (um por dia do calendário, denso e zerado)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyBucket {
    pub day: u32,
    pub generated_count: u64,
    pub generated_value: f64,
    pub won_count: u64,
    pub won_value: f64,
    pub lost_count: u64,
    pub lost_value: f64,
    // Criadas NESTE dia e ainda em negociação no momento da leitura
    pub negotiating_count: u64,
    pub negotiating_value: f64,
}

impl DailyBucket {
    pub fn empty(day: u32) -> Self {
        Self {
            day,
            generated_count: 0,
            generated_value: 0.0,
            won_count: 0,
            won_value: 0.0,
            lost_count: 0,
            lost_value: 0.0,
            negotiating_count: 0,
            negotiating_value: 0.0,
        }
    }
}

// 2. Bucket mensal (gráficos de evolução)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    pub month: u32,
    pub year: i32,
    pub generated_count: u64,
    pub generated_value: f64,
    // Vendas aprovadas no mês (por data de fechamento) e sua receita
    pub sales: u64,
    pub revenue: f64,
    pub lost_count: u64,
    pub lost_value: f64,
}

impl MonthlyBucket {
    pub fn empty(month: u32, year: i32) -> Self {
        Self {
            month,
            year,
            generated_count: 0,
            generated_value: 0.0,
            sales: 0,
            revenue: 0.0,
            lost_count: 0,
            lost_value: 0.0,
        }
    }
}

// 3. Cards de "hoje"
// Atenção: diferente do bucket diário, negotiating aqui é o funil inteiro
// em negociação, independente da data de criação (comportamento herdado).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodaySnapshot {
    pub generated_count: u64,
    pub generated_value: f64,
    pub won_count: u64,
    pub won_value: f64,
    pub lost_count: u64,
    pub lost_value: f64,
    pub negotiating_count: u64,
    pub negotiating_value: f64,
}

// 4. Conversão por nível de score
// O "nível" é um conceito externo de pontuação; para o agregador é só um
// rótulo opaco.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoredProposal {
    pub level: String,
    pub status: ProposalStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LevelStat {
    pub level: String,
    pub total: u64,
    pub closed: u64,
    pub won: u64,
    // won / (won + lost) * 100; denominador zero rende 0, nunca NaN
    pub rate: f64,
}

// 5. Ranking de motivos de perda
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LossReasonStat {
    pub reason: String,
    pub label: String,
    pub count: u64,
    pub total_value: f64,
}
