use crate::cli::ServeArgs;
use crate::infra::{AppState, FileRecordStore};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scorecard::config::AppConfig;
use scorecard::error::AppError;
use scorecard::telemetry;
use scorecard::ScorecardState;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = match config.storage.data_file.clone() {
        Some(path) => FileRecordStore::open(path)?,
        None => FileRecordStore::in_memory(),
    };
    let state = ScorecardState::new(Arc::new(store));

    if let Some(admin) = &config.bootstrap_admin {
        if let Some(user) = state.accounts.bootstrap_admin(admin)? {
            info!(user_id = %user.id, username = %user.username, "administrator account created");
        }
    }

    let app = with_operational_routes(state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "framework scorecard ready");

    axum::serve(listener, app).await?;
    Ok(())
}
