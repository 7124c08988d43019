use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::proposal::ProposalStatus;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Transições: erros sincronizados com o ciclo de vida da proposta
    #[error("Motivo da perda é obrigatório para venda perdida")]
    MissingLossReason,

    #[error("Status de destino inválido: {0}")]
    InvalidTargetStatus(&'static str),

    #[error("Transição inválida a partir de {:?}", .0)]
    InvalidTransition(ProposalStatus),

    #[error("Proposta não encontrada")]
    ProposalNotFound,

    #[error("Número da proposta já existe")]
    ProposalNumberConflict,

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::MissingLossReason => (
                StatusCode::BAD_REQUEST,
                "Motivo da perda é obrigatório para venda perdida.".to_string(),
            ),
            AppError::InvalidTargetStatus(target) => (
                StatusCode::BAD_REQUEST,
                format!("Status de destino inválido: {target}"),
            ),
            // Distinguimos "já fechada" de "campo faltando": quem chamou
            // precisa saber que o registro está em estado terminal.
            AppError::InvalidTransition(from) => (
                StatusCode::CONFLICT,
                format!(
                    "Proposta já está em estado terminal ({}); nenhuma transição é permitida.",
                    from.code()
                ),
            ),
            AppError::ProposalNotFound => (
                StatusCode::NOT_FOUND,
                "Proposta não encontrada.".to_string(),
            ),
            AppError::ProposalNumberConflict => (
                StatusCode::CONFLICT,
                "Número da proposta já existe.".to_string(),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` registra a mensagem detalhada que o `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
