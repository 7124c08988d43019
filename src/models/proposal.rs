// src/models/proposal.rs

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

// Mapeia o CREATE TYPE proposal_status do banco.
// Os rótulos no fio são os mesmos do sistema legado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "proposal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Negociacao,
    VendaFechada,
    VendaPerdida,
    Expirada,
}

impl ProposalStatus {
    /// Estados terminais: nenhuma transição sai deles.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ProposalStatus::Negociacao)
    }

    pub fn code(self) -> &'static str {
        match self {
            ProposalStatus::Negociacao => "negociacao",
            ProposalStatus::VendaFechada => "venda_fechada",
            ProposalStatus::VendaPerdida => "venda_perdida",
            ProposalStatus::Expirada => "expirada",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProposalStatus::Negociacao => "Em Negociação",
            ProposalStatus::VendaFechada => "Venda Fechada",
            ProposalStatus::VendaPerdida => "Venda Perdida",
            ProposalStatus::Expirada => "Expirada",
        }
    }
}

// Mapeia o CREATE TYPE loss_reason do banco (12 motivos fixos)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "loss_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LossReason {
    PrecoConcorrente,
    CondicaoPagamento,
    SemRetorno,
    CreditoNegado,
    ConcorrenciaMarca,
    AdiamentoCompra,
    CotacaoPreco,
    PercaPreco,
    UrgenciaComprouLocal,
    Golpe,
    Licitacao,
    FechadoOutroParceiro,
}

impl LossReason {
    pub fn code(self) -> &'static str {
        match self {
            LossReason::PrecoConcorrente => "preco_concorrente",
            LossReason::CondicaoPagamento => "condicao_pagamento",
            LossReason::SemRetorno => "sem_retorno",
            LossReason::CreditoNegado => "credito_negado",
            LossReason::ConcorrenciaMarca => "concorrencia_marca",
            LossReason::AdiamentoCompra => "adiamento_compra",
            LossReason::CotacaoPreco => "cotacao_preco",
            LossReason::PercaPreco => "perca_preco",
            LossReason::UrgenciaComprouLocal => "urgencia_comprou_local",
            LossReason::Golpe => "golpe",
            LossReason::Licitacao => "licitacao",
            LossReason::FechadoOutroParceiro => "fechado_outro_parceiro",
        }
    }

    /// Rótulo legível usado em notificações e no ranking de motivos.
    pub fn label(self) -> &'static str {
        match self {
            LossReason::PrecoConcorrente => "Preço Concorrente",
            LossReason::CondicaoPagamento => "Condição de Pagamento",
            LossReason::SemRetorno => "Sem Retorno",
            LossReason::CreditoNegado => "Crédito Negado",
            LossReason::ConcorrenciaMarca => "Concorrência (Marca)",
            LossReason::AdiamentoCompra => "Adiamento de Compra",
            LossReason::CotacaoPreco => "Cotação de Preço",
            LossReason::PercaPreco => "Perda de Preço",
            LossReason::UrgenciaComprouLocal => "Urgência / Comprou Local",
            LossReason::Golpe => "Golpe",
            LossReason::Licitacao => "Licitação",
            LossReason::FechadoOutroParceiro => "Fechado em Outro Parceiro",
        }
    }
}

// Condições de pagamento aceitas nas propostas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_condition", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentCondition {
    AVista,
    Pix,
    #[sqlx(rename = "boleto_30_dias")]
    #[serde(rename = "boleto_30_dias")]
    Boleto30Dias,
    #[sqlx(rename = "boleto_30_60_dias")]
    #[serde(rename = "boleto_30_60_dias")]
    Boleto3060Dias,
    #[sqlx(rename = "boleto_30_60_90_dias")]
    #[serde(rename = "boleto_30_60_90_dias")]
    Boleto306090Dias,
    #[sqlx(rename = "parcelado_3x")]
    #[serde(rename = "parcelado_3x")]
    Parcelado3x,
    CartaoCredito,
}

// --- SNAPSHOTS DESNORMALIZADOS ---
// Capturados na criação da proposta; alterações posteriores no cadastro
// de clientes/vendedores/distribuidores NÃO retroagem.

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellerSnapshot {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistributorSnapshot {
    pub id: Uuid,
    pub apelido: Option<String>,
    pub razao_social: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: f64,
}

// --- ITENS ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposalItem {
    pub product: ProductSnapshot,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub line_total: f64,
}

impl ProposalItem {
    /// line_total = quantity * unit_price * (1 - discount_percent/100)
    pub fn compute_line_total(quantity: f64, unit_price: f64, discount_percent: f64) -> f64 {
        quantity * unit_price * (1.0 - discount_percent / 100.0)
    }
}

// --- PROPOSTA (Aggregate Root) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: Uuid,
    pub proposal_number: String,

    #[schema(value_type = ClientSnapshot)]
    pub client: Json<ClientSnapshot>,
    #[schema(value_type = SellerSnapshot)]
    pub seller: Json<SellerSnapshot>,
    #[schema(value_type = DistributorSnapshot)]
    pub distributor: Json<DistributorSnapshot>,
    #[schema(value_type = Vec<ProposalItem>)]
    pub items: Json<Vec<ProposalItem>>,

    pub subtotal: f64,
    pub discount_value: f64,
    pub total: f64,

    pub payment_condition: PaymentCondition,
    pub observations: Option<String>,

    pub status: ProposalStatus,
    pub loss_reason: Option<LossReason>,
    pub loss_description: Option<String>,

    pub valid_until: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Data efetiva de fechamento para fins de relatório.
    /// Registros migrados sem closed_at caem em updated_at (perda de
    /// precisão conhecida: uma edição posterior desloca o período).
    pub fn effective_closed_at(&self) -> DateTime<Utc> {
        self.closed_at.unwrap_or(self.updated_at)
    }
}

/// Totais derivados dos itens. O total nunca fica negativo.
pub fn compute_totals(items: &[ProposalItem]) -> (f64, f64, f64) {
    let subtotal: f64 = items.iter().map(|i| i.quantity * i.unit_price).sum();
    let discount_value: f64 = items
        .iter()
        .map(|i| i.quantity * i.unit_price * i.discount_percent / 100.0)
        .sum();
    let total = (subtotal - discount_value).max(0.0);
    (subtotal, discount_value, total)
}

/// Gera um número de proposta: prefixo + timestamp + sufixo aleatório.
/// Colisões são possíveis e toleradas (o índice único do banco rejeita a
/// segunda inserção); não tentamos prevenir.
pub fn generate_proposal_number(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("PROP-{}-{:04}", now.format("%Y%m%d%H%M%S"), suffix)
}

// --- RESULTADO DE EFEITOS COLATERAIS ---

/// Resultado por canal das notificações/atualizações disparadas em uma
/// transição. Falhas nunca revertem a transição; aparecem aqui.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SideEffectResult {
    pub channel: String,
    pub success: bool,
}
