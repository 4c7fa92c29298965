use std::sync::Arc;

use migration::MigratorTrait;
use outreach_bot::{ Config, Result };
use tokio::sync::watch;
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "outreach_bot=debug".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| outreach_bot::AppError::Config(e.to_string()))?;

    // Initialize database connection
    let db = sea_orm::Database
        ::connect(&config.database_url).await
        .map_err(|e| outreach_bot::AppError::Database(e))?;

    tracing::info!("Database connected successfully");

    // Run migrations
    migration::Migrator::up(&db, None).await.map_err(|e| outreach_bot::AppError::Database(e))?;

    tracing::info!("Migrations completed successfully");

    // Shared building blocks
    let encryptor = outreach_bot::crypto::Encryptor::new(&config.encryption_key)?;
    let sessions = outreach_bot::services::SessionService::new(encryptor);
    let worker_id = outreach_bot::worker::WorkerId::generate();

    tracing::info!(worker = %worker_id, "Worker identity assigned");

    let factory: Arc<dyn outreach_bot::automation::AutomationFactory> = Arc::new(
        outreach_bot::browser::CdpAutomationFactory::new(
            config.browser_ws_url.clone(),
            Some(config.interactive_ws_url().to_string()),
            config.nav_timeout()
        )
    );

    // Engine loops
    let scheduler = outreach_bot::scheduler::CampaignScheduler::new(db.clone(), &config);
    let executor = outreach_bot::executor::ActionExecutor::new(
        db.clone(),
        &config,
        Arc::clone(&factory),
        sessions.clone(),
        worker_id.clone()
    );
    let verifier = outreach_bot::verifier::AccountVerifier::new(
        db,
        &config,
        factory,
        sessions,
        worker_id
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_handle = tokio::spawn(scheduler.start(shutdown_rx.clone()));
    let executor_handle = tokio::spawn(executor.start(shutdown_rx.clone()));
    let verifier_handle = tokio::spawn(verifier.start(shutdown_rx));

    tracing::info!("Outreach engine started");

    // Drain loops on ctrl-c so in-flight browser work can settle
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Shutdown signal listener failed");
    }

    tracing::info!("Shutdown requested, stopping workers");
    let _ = shutdown_tx.send(true);

    let _ = scheduler_handle.await;
    let _ = executor_handle.await;
    let _ = verifier_handle.await;

    tracing::info!("Outreach engine stopped");
    Ok(())
}
