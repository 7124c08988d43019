// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{GoalRepository, ProposalRepository},
    services::goals::PgGoalUpdater,
    services::proposal_service::ProposalService,
    services::report_service::ReportService,
    services::whatsapp::{LogDispatcher, NotificationDispatcher, Notifier},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub proposal_service: ProposalService,
    pub report_service: ReportService,
}

impl AppState {
    // A assinatura retorna um Result: se a configuração falhar, a
    // aplicação não deve iniciar.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        // Destinatário extra das notificações; opcional
        let admin_phone = env::var("ADMIN_WHATSAPP_PHONE").ok();

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        if admin_phone.is_none() {
            tracing::warn!(
                "⚠️ ADMIN_WHATSAPP_PHONE não configurado - admin não receberá notificações"
            );
        }

        // --- Monta o gráfico de dependências ---
        let proposal_repo = ProposalRepository::new(db_pool.clone());
        let goal_repo = GoalRepository::new(db_pool.clone());

        // O provedor real de WhatsApp (Twilio/Evolution/WppConnect) é
        // plugável; o binário padrão sobe com o dispatcher de log.
        let dispatcher: Arc<dyn NotificationDispatcher> = Arc::new(LogDispatcher);
        let notifier = Notifier::new(dispatcher, admin_phone);
        let goal_updater = Arc::new(PgGoalUpdater::new(goal_repo));

        let proposal_service = ProposalService::new(proposal_repo.clone(), notifier, goal_updater);
        let report_service = ReportService::new(proposal_repo);

        Ok(Self {
            db_pool,
            proposal_service,
            report_service,
        })
    }
}
