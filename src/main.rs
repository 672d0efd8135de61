use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use internship_portal::{
    router,
    services::{
        identity_provider::{GoogleIdentityProvider, IdentityProvider},
        notification::{mailer_from_config, NotificationService},
    },
    store::{postgres::create_pool, MemoryStore, PgStore, Store},
    utils::config::AppConfig,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "internship_portal=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, data will be kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let mailer = mailer_from_config(&config.mail);
    let notifications = NotificationService::new(mailer, &config.mail.from);

    let identity = config.google.clone().map(|google| {
        Arc::new(GoogleIdentityProvider::new(google)) as Arc<dyn IdentityProvider>
    });
    if identity.is_none() {
        tracing::warn!("Google OAuth is not configured, student sign-in is disabled");
    }

    let bind_addr = config.bind_addr.clone();
    let app = router(AppState::new(
        store,
        config,
        notifications.clone(),
        identity,
    ));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    notifications.flush().await;

    Ok(())
}
