use std::{future::Future, sync::Arc, time::Instant};

use anyhow::Context;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::audit::{AuditLog, TracingAuditLog};
use crate::config::ServerConfig;
use crate::error::{
    attach_request_id_header, request_id_from_headers_or_generate, with_request_id_scope,
    ApiError, ErrorCode,
};
use crate::github::{GithubClient, VersionControlClient};
use crate::orchestrator::SyncOrchestrator;
use crate::registry::SubmoduleRegistry;
use crate::router::EventRouter;
use crate::webhook::{self, WebhookState};

pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Wire the registry, orchestrator and router behind the HTTP surface.
/// Accepted deliveries run their sync chain on `chains`.
pub fn build_app(
    config: &ServerConfig,
    client: Arc<dyn VersionControlClient>,
    audit: Arc<dyn AuditLog>,
    chains: TaskTracker,
) -> Router {
    let registry = Arc::new(SubmoduleRegistry::new(config.submodules.iter().cloned()));
    info!(submodules = registry.len(), "submodule registry loaded");
    for binding in registry.iter() {
        debug!(
            submodule_repo = %binding.submodule_repo,
            watched_ref = %binding.watched_ref(),
            parent_repo = %binding.parent_repo,
            parent_branch = %binding.parent_branch,
            mount_path = %binding.mount_path,
            "monitoring submodule"
        );
    }

    let orchestrator =
        Arc::new(SyncOrchestrator::new(client, Arc::clone(&audit), config.owner.clone()));
    let event_router = Arc::new(EventRouter::new(registry, orchestrator, audit));
    let state = WebhookState::new(config.webhook_secret.as_bytes(), event_router, chains);

    build_router(webhook::router(&config.webhook_path, state))
}

fn build_router(webhook_router: Router) -> Router {
    apply_middleware(Router::new().route("/healthz", get(healthz)).merge(webhook_router))
}

fn apply_middleware(router: Router) -> Router {
    router
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(middleware::from_fn(panic_handler))
}

/// Serve `app` on an already-bound listener until `shutdown` resolves, then
/// wait for every accepted sync chain to reach its terminal state.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    chains: TaskTracker,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("subsync server exited unexpectedly");

    chains.close();
    if !chains.is_empty() {
        info!(pending = chains.len(), "waiting for in-flight sync chains");
    }
    chains.wait().await;

    served
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let client = GithubClient::new(
        config.api_base_url.clone(),
        config.owner.clone(),
        config.auth_token.clone(),
    )
    .context("failed to build github client")?;
    let chains = TaskTracker::new();
    let app = build_app(&config, Arc::new(client), Arc::new(TracingAuditLog), chains.clone());

    let addr = config.listen_addr;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind webhook listener on {addr}"))?;

    info!(
        listen_addr = %addr,
        owner = %config.owner,
        webhook_path = %config.webhook_path,
        "starting subsync server"
    );

    serve(listener, app, chains, shutdown_signal()).await
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}

async fn panic_handler(request: Request<Body>, next: Next) -> Response {
    match tokio::spawn(async move { next.run(request).await }).await {
        Ok(response) => response,
        Err(join_error) => {
            error!(?join_error, "request handling panicked");
            ApiError::from_code(ErrorCode::InternalError).into_response()
        }
    }
}

async fn request_context_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = request_id_from_headers_or_generate(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let mut response = with_request_id_scope(request_id.clone(), next.run(request)).await;
    attach_request_id_header(&mut response, &request_id);

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started_at.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
