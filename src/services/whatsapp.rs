// src/services/whatsapp.rs

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::proposal::{Proposal, SideEffectResult};

// =========================================================================
//  CONTRATO DE ENVIO
// =========================================================================

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Número de telefone inválido ou ausente")]
    InvalidPhone,

    #[error("Falha no provedor de envio: {0}")]
    Provider(String),
}

#[derive(Debug, Clone)]
pub struct DeliveryInfo {
    pub recipient: String,
}

/// Canal de saída das notificações. As implementações reais (Twilio,
/// Evolution API, WppConnect) vivem fora deste núcleo e entram por aqui.
/// Deve ser seguro chamar concorrentemente para destinatários diferentes.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<DeliveryInfo, DeliveryError>;
}

/// Implementação padrão do binário: só registra a mensagem no log.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, phone: &str, message: &str) -> Result<DeliveryInfo, DeliveryError> {
        let formatted = format_phone_number(phone).ok_or(DeliveryError::InvalidPhone)?;
        tracing::info!("📱 WhatsApp (log) para {}: {}", formatted, message);
        Ok(DeliveryInfo {
            recipient: formatted,
        })
    }
}

/// Formata o número para o padrão internacional (DDI 55 para números
/// brasileiros com DDD). Números já internacionais passam direto.
pub fn format_phone_number(phone: &str) -> Option<String> {
    let mut clean: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if clean.is_empty() {
        return None;
    }

    // Zero de operadora na frente? Remove.
    if clean.starts_with('0') {
        clean.remove(0);
    }

    // DDD + 8 ou 9 dígitos => número nacional, prefixa o DDI do Brasil
    if !clean.starts_with("55") && (clean.len() == 10 || clean.len() == 11) {
        clean = format!("55{clean}");
    }

    Some(clean)
}

// =========================================================================
//  NOTIFICADOR DE PROPOSTAS
// =========================================================================

/// Monta e dispara as mensagens de criação/fechamento/perda para o
/// vendedor e, quando configurado, para o admin. Os envios acontecem em
/// paralelo e cada falha vira um item `success: false` no resultado;
/// nada aqui interrompe a operação que originou a notificação.
#[derive(Clone)]
pub struct Notifier {
    dispatcher: Arc<dyn NotificationDispatcher>,
    admin_phone: Option<String>,
}

impl Notifier {
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>, admin_phone: Option<String>) -> Self {
        Self {
            dispatcher,
            admin_phone,
        }
    }

    pub async fn notify_created(&self, proposal: &Proposal) -> Vec<SideEffectResult> {
        let seller_message = format!(
            "🎉 *Nova Proposta Criada!*\n\n\
             📋 Proposta: {}\n\
             👤 Cliente: {}\n\
             💰 Valor: R$ {:.2}\n\
             📅 Válido até: {}\n\n\
             Status: {}\n\n\
             Acompanhe sua proposta no sistema!",
            proposal.proposal_number,
            proposal.client.name,
            proposal.total,
            proposal.valid_until.format("%d/%m/%Y"),
            proposal.status.label(),
        );

        let admin_message = format!(
            "📢 *Nova Proposta Criada*\n\n\
             👤 Vendedor: {}\n\
             📋 Proposta: {}\n\
             👥 Cliente: {}\n\
             💰 Valor: R$ {:.2}\n\
             📅 Válido até: {}",
            proposal.seller.name,
            proposal.proposal_number,
            proposal.client.name,
            proposal.total,
            proposal.valid_until.format("%d/%m/%Y"),
        );

        self.send_to_seller_and_admin(proposal, seller_message, admin_message)
            .await
    }

    pub async fn notify_won(&self, proposal: &Proposal) -> Vec<SideEffectResult> {
        let seller_message = format!(
            "🎊 *Venda Fechada!*\n\n\
             📋 Proposta: {}\n\
             👤 Cliente: {}\n\
             💰 Valor: R$ {:.2}\n\n\
             Parabéns pela venda! 🎉",
            proposal.proposal_number, proposal.client.name, proposal.total,
        );

        let admin_message = format!(
            "✅ *Venda Fechada!*\n\n\
             👤 Vendedor: {}\n\
             📋 Proposta: {}\n\
             👥 Cliente: {}\n\
             💰 Valor: R$ {:.2}\n\n\
             Parabéns ao vendedor! 🎉",
            proposal.seller.name, proposal.proposal_number, proposal.client.name, proposal.total,
        );

        self.send_to_seller_and_admin(proposal, seller_message, admin_message)
            .await
    }

    pub async fn notify_lost(&self, proposal: &Proposal) -> Vec<SideEffectResult> {
        let reason_label = proposal
            .loss_reason
            .map(|r| r.label())
            .unwrap_or("Não informado");

        let seller_message = format!(
            "😔 *Venda Perdida*\n\n\
             📋 Proposta: {}\n\
             👤 Cliente: {}\n\
             💰 Valor: R$ {:.2}\n\
             📝 Motivo: {}\n\n\
             Não desanime! Continue trabalhando! 💪",
            proposal.proposal_number, proposal.client.name, proposal.total, reason_label,
        );

        let admin_message = format!(
            "❌ *Venda Perdida*\n\n\
             👤 Vendedor: {}\n\
             📋 Proposta: {}\n\
             👥 Cliente: {}\n\
             💰 Valor: R$ {:.2}\n\
             📝 Motivo: {}",
            proposal.seller.name,
            proposal.proposal_number,
            proposal.client.name,
            proposal.total,
            reason_label,
        );

        self.send_to_seller_and_admin(proposal, seller_message, admin_message)
            .await
    }

    /// Dispara os dois canais em paralelo. Canais não configurados
    /// (vendedor sem telefone, admin ausente) não entram no resultado;
    /// canais tentados entram sempre, com `success` refletindo o envio.
    async fn send_to_seller_and_admin(
        &self,
        proposal: &Proposal,
        seller_message: String,
        admin_message: String,
    ) -> Vec<SideEffectResult> {
        let seller_phone = proposal.seller.phone.clone();

        let seller_send = async {
            match seller_phone {
                Some(phone) => Some(
                    self.attempt_send("whatsapp_vendedor", &phone, &seller_message)
                        .await,
                ),
                None => {
                    tracing::warn!(
                        "⚠️ Vendedor {} sem telefone cadastrado - notificação pulada",
                        proposal.seller.name
                    );
                    None
                }
            }
        };

        let admin_send = async {
            match &self.admin_phone {
                Some(phone) => Some(self.attempt_send("whatsapp_admin", phone, &admin_message).await),
                None => None,
            }
        };

        let (seller_result, admin_result) = tokio::join!(seller_send, admin_send);

        [seller_result, admin_result].into_iter().flatten().collect()
    }

    async fn attempt_send(&self, channel: &str, phone: &str, message: &str) -> SideEffectResult {
        match self.dispatcher.send(phone, message).await {
            Ok(info) => {
                tracing::info!("✅ WhatsApp enviado para {}", info.recipient);
                SideEffectResult {
                    channel: channel.to_string(),
                    success: true,
                }
            }
            Err(e) => {
                tracing::error!("❌ Erro ao enviar WhatsApp ({}): {}", channel, e);
                SideEffectResult {
                    channel: channel.to_string(),
                    success: false,
                }
            }
        }
    }
}
