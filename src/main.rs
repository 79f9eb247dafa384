use axum::Router;
use sniper::config::Config;
use sniper::services::{
    AlertDispatcher, LogDispatcher, RunnerSettings, SignalRunner, TelegramDispatcher,
};
use sniper::sources::AlphaVantageClient;
use sniper::{api, AppState};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sniper=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env());
    info!("Starting Sniper server on {}:{}", config.host, config.port);
    info!(
        "Instruments: {:?}, primary {}, {} timeframes",
        config.instruments,
        config.primary_timeframe,
        config.timeframes.len()
    );

    let dispatcher: Arc<dyn AlertDispatcher> = match config.telegram.clone() {
        Some(telegram) => {
            info!("Telegram credentials found, enabling alert delivery");
            Arc::new(TelegramDispatcher::new(telegram))
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set, alerts are only logged");
            Arc::new(LogDispatcher)
        }
    };

    let state = AppState::new(config.clone(), dispatcher.clone());

    // The runner needs a data provider; without one only the HTTP surface runs
    let runner = match config.alpha_vantage_api_key.clone() {
        Some(api_key) => {
            let runner = Arc::new(SignalRunner::new(
                state.engine.clone(),
                Arc::new(AlphaVantageClient::new(api_key)),
                dispatcher,
                RunnerSettings::from_config(&config),
            ));
            let background = runner.clone();
            tokio::spawn(async move { background.start().await });
            Some(runner)
        }
        None => {
            warn!("ALPHA_VANTAGE_API_KEY not set, evaluation cycles disabled");
            None
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(runner) = runner {
        runner.stop();
    }
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
