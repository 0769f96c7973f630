use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use gradebot::config::Config;
use gradebot::dialog::session::InMemorySessionStore;
use gradebot::dialog::{Coordinator, CoordinatorDeps};
use gradebot::llm::{LlmClient, LlmGrader, LlmQuestionGenerator};
use gradebot::server::{self, AppState};
use gradebot::storage::{JsonFileStorage, LibSqlStorage, Storage};
use gradebot::telegram::{TelegramApi, Transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().map_err(|e| {
        eprintln!("Error: {e}");
        anyhow::anyhow!("invalid configuration")
    })?;

    // Logs go to stdout and a daily-rolling file under the data dir.
    std::fs::create_dir_all(config.data_dir.join("logs"))?;
    let file_appender =
        tracing_appender::rolling::daily(config.data_dir.join("logs"), "gradebot.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    eprintln!("🤖 gradebot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm_model);
    eprintln!("   Min answers: {}", config.min_answers);
    eprintln!("   Listening: http://{}", config.bind_addr);

    // ── Storage ─────────────────────────────────────────────────────
    let storage: Arc<dyn Storage> = match &config.database_path {
        Some(path) => {
            eprintln!("   Storage: libSQL at {}", path.display());
            Arc::new(LibSqlStorage::new_local(path).await?)
        }
        None => {
            eprintln!("   Storage: JSON files under {}", config.data_dir.display());
            Arc::new(JsonFileStorage::new(&config.data_dir)?)
        }
    };

    // ── Transport ───────────────────────────────────────────────────
    let telegram = Arc::new(TelegramApi::new(config.telegram_token.clone()));
    if let Err(e) = telegram.health_check().await {
        tracing::warn!(error = %e, "Telegram health check failed; continuing");
    }
    if let Some(base) = &config.public_base_url {
        telegram
            .set_webhook(&format!("{base}/webhook"), config.webhook_secret.as_deref())
            .await?;
    }
    let transport: Arc<dyn Transport> = telegram;

    // ── Generators ──────────────────────────────────────────────────
    let client = LlmClient::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
    );

    // ── Coordinator ─────────────────────────────────────────────────
    let deps = CoordinatorDeps {
        transport: Arc::clone(&transport),
        questions: Arc::new(LlmQuestionGenerator::new(client.clone())),
        grader: Arc::new(LlmGrader::new(client)),
        storage,
        sessions: Arc::new(InMemorySessionStore::new()),
    };
    let coordinator = Arc::new(Coordinator::new(
        deps,
        config.min_answers,
        config.reports_dir(),
    ));

    let app = server::routes(AppState {
        coordinator,
        transport,
        webhook_secret: config.webhook_secret.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "gradebot started");
    axum::serve(listener, app).await?;

    Ok(())
}
