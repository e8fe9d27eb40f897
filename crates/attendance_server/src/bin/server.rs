use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use attendance_client::clock::{Clock, SystemClock};
use attendance_client::config::Config;
use attendance_client::http_client::ReqwestAttendanceClient;
use attendance_client::observability;
use attendance_client::refresh::SuggestionRefresher;
use attendance_client::sessions::SessionMatcher;
use attendance_server::{AppState, InstrumentedApi, router};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::info;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

fn request_timeout_from(raw: Option<String>) -> Duration {
    let secs = raw
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

fn listen_addr_from(raw: Option<String>) -> SocketAddr {
    raw.and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)))
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let directive = attendance_server::init_tracing();
    info!(%directive, "attendance:http: log filter");

    let handle = PrometheusBuilder::new().install_recorder()?;
    observability::describe_metrics();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration; aborting startup");
            std::process::exit(1);
        }
    };

    let matcher = SessionMatcher::default();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let refresher =
        SuggestionRefresher::spawn(matcher.clone(), config.refresh_interval, clock.clone());
    let api = InstrumentedApi::new(ReqwestAttendanceClient::from_config(&config));

    let state = Arc::new(AppState {
        api: Arc::new(api),
        matcher,
        clock,
        suggestions: refresher.subscribe(),
        metrics: Some(handle),
    });

    let timeout = request_timeout_from(std::env::var("REQUEST_TIMEOUT_SECS").ok());
    let app = router(state, timeout);

    let addr = listen_addr_from(std::env::var("ADDRESS").ok());
    info!(%addr, timeout_secs = timeout.as_secs(), "starting HTTP server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service());
    if let Err(e) = server
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl+c: {e}");
            }
        })
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    refresher.stop();
    info!("attendance:http: shut down");
    Ok(())
}
