mod routes;
mod controllers;
mod services;
mod models;
mod effectors;
mod api_docs;
mod shared_state;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{Router, routing::get, response::Html};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::OpenApi;
use utoipa_scalar::Scalar;

use crate::api_docs::ApiDoc;
use crate::config::Config;
use crate::effectors::{standard_set, translate_captions, EffectContext};
use crate::routes::dashboard_routes::api_routes;
use crate::services::locale::Locale;
use crate::services::scheduler::{Scheduler, SchedulerSettings};
use crate::services::telemetry_service::HttpTelemetrySource;
use crate::shared_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // 1. Load configuration
    let config = Config::load_or_default("config.json").context("failed to load config.json")?;
    info!(
        url = %config.telemetry.url,
        refresh_s = config.refresh_period().as_secs(),
        slow = config.animation.slow,
        disabled = config.animation.disabled,
        "configuration loaded"
    );

    // 2. Translation table, retried until it can be read
    let locale = load_locale(&config).await;

    // 3. Shared state and static captions
    let state = AppState::new(Arc::new(locale));
    translate_captions(&state).context("failed to translate captions")?;

    // 4. Refresh loop
    let ctx = EffectContext::from_config(state.clone(), &config);
    let source = HttpTelemetrySource::new(config.telemetry.url.clone(), config.fetch_timeout())
        .context("failed to build telemetry client")?;
    let scheduler = Scheduler::new(
        Arc::new(source),
        standard_set(&ctx),
        state.clone(),
        SchedulerSettings::from_config(&config),
    );
    tokio::spawn(scheduler.run());

    // 5. Start Axum HTTP server
    let app = Router::new()
        .nest("/api", api_routes(state.clone()))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .fallback_service(ServeDir::new("static"))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!(%addr, "API server listening");
    info!("Scalar UI: http://{}/scalar", addr);

    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("powerflow_display=info,tower_http=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .init();
}

async fn load_locale(config: &Config) -> Locale {
    let path = config.locale_path();
    let retry = config.refresh_period() * 5;
    loop {
        match Locale::load(&path) {
            Ok(locale) => {
                info!(path = %path.display(), keys = locale.strings().len(), "locale loaded");
                return locale;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, retry_s = retry.as_secs(), "locale not loaded, retrying");
                tokio::time::sleep(retry).await;
            }
        }
    }
}
