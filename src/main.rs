//src/main.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Ciclo de vida das propostas
    let proposal_routes = Router::new()
        .route(
            "/",
            post(handlers::proposals::create_proposal).get(handlers::proposals::list_proposals),
        )
        .route("/{id}", get(handlers::proposals::get_proposal))
        .route("/{id}/status", put(handlers::proposals::transition_proposal))
        .route(
            "/{id}/observations",
            put(handlers::proposals::update_observations),
        );

    // Agregações de vendas (funções puras sobre um snapshot do banco)
    let dashboard_routes = Router::new()
        .route("/daily", get(handlers::dashboard::get_daily))
        .route("/monthly", get(handlers::dashboard::get_monthly))
        .route("/today", get(handlers::dashboard::get_today))
        .route("/conversion", post(handlers::dashboard::get_conversion))
        .route("/loss-reasons", get(handlers::dashboard::get_loss_reasons));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api/proposals", proposal_routes)
        .nest("/api/dashboard", dashboard_routes)
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", addr);
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
