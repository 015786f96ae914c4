//! HTTP surface: the telemetry path and a small index page linking to it.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bqe_collectors::MetricsContext;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct AppState {
    context: Arc<MetricsContext>,
    telemetry_path: Arc<str>,
}

/// Routes `GET <telemetry_path>` to a render of `context` and `GET /` to the
/// index page.
pub fn router(context: Arc<MetricsContext>, telemetry_path: &str) -> anyhow::Result<Router> {
    anyhow::ensure!(
        telemetry_path.starts_with('/'),
        "web.telemetry_path must start with '/', got {telemetry_path:?}"
    );

    let state = AppState {
        context,
        telemetry_path: Arc::from(telemetry_path),
    };
    let mut router = Router::new().route(telemetry_path, get(metrics));
    if telemetry_path != "/" {
        router = router.route("/", get(index));
    }
    Ok(router.with_state(state))
}

/// Serve `router` until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.context.render() {
        Ok(body) => ([(header::CONTENT_TYPE, state.context.content_type())], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>BIND Query Exporter</title></head>\n<body>\n\
         <h1>BIND Query Exporter</h1>\n<p><a href=\"{path}\">Metrics</a></p>\n</body>\n</html>\n",
        path = state.telemetry_path
    ))
}
