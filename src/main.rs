mod config;
mod handlers;
mod health;
mod instrumentation;
mod metrics;
mod tls;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use clap::Parser;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpBuilder;
use hyper_util::service::TowerToHyperService;
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "apm-injector", about = "Admission webhook injecting APM tracers into pods")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "/etc/apm-injector/config.yaml", env = "APM_INJECTOR_CONFIG")]
    config: String,
}

async fn shutdown_signal(shutdown_tx: watch::Sender<()>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("received CTRL+C, starting graceful shutdown"),
            _ = sigterm.recv() => info!("received SIGTERM, starting graceful shutdown"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for ctrl_c");
        info!("received CTRL+C, starting graceful shutdown");
    }

    let _ = shutdown_tx.send(());
}

async fn serve_webhook(
    addr: SocketAddr,
    tls_acceptor: TlsAcceptor,
    router: Router,
    ready: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<()>,
) {
    let listener = TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind HTTPS on {addr}: {e}"));

    info!(%addr, "webhook listening");
    ready.store(true, Ordering::Relaxed);

    loop {
        let (tcp_stream, remote_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!("failed to accept TCP connection: {e}");
                    continue;
                }
            },
            _ = shutdown_rx.changed() => {
                info!("webhook listener shutting down");
                break;
            }
        };

        let tls_acceptor = tls_acceptor.clone();
        let service = TowerToHyperService::new(router.clone().into_service());

        tokio::spawn(async move {
            let tls_stream = match tls_acceptor.accept(tcp_stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!(%remote_addr, "TLS handshake failed: {e}");
                    return;
                }
            };

            if let Err(e) = HttpBuilder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(tls_stream), service)
                .await
            {
                error!(%remote_addr, "error serving connection: {e}");
            }
        });
    }
}

async fn serve_health(addr: SocketAddr, router: Router, mut shutdown_rx: watch::Receiver<()>) {
    let listener = TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind HTTP on {addr}: {e}"));

    info!(%addr, "metrics/health listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            info!("metrics/health listener shutting down");
        })
        .await
        .unwrap_or_else(|e| error!("HTTP server error: {e}"));
}

fn parse_addr(field: &str, value: &str) -> SocketAddr {
    value.parse().unwrap_or_else(|e| {
        eprintln!("Invalid {field} '{value}': {e}");
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install default CryptoProvider");

    let cli = Cli::parse();

    let config = config::InjectorConfig::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Failed to load config from {}: {e}", cli.config);
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        listen_addr = %config.listen_addr,
        metrics_addr = %config.metrics_addr,
        auto_instru.enabled = config.auto_instru.enabled,
        auto_instru.container_registry = %config.auto_instru.container_registry,
        auto_instru.failure_policy = config.auto_instru.failure_policy.as_str(),
        "apm-injector starting"
    );

    let tls_config = tls::load_server_config(&config.tls_cert_path, &config.tls_key_path)
        .unwrap_or_else(|e| {
            eprintln!("Failed to load TLS config: {e}");
            std::process::exit(1);
        });
    let tls_acceptor = TlsAcceptor::from(tls_config);

    let listen_addr = parse_addr("listen_addr", &config.listen_addr);
    let metrics_addr = parse_addr("metrics_addr", &config.metrics_addr);

    let mut registry = Registry::default();
    let metrics = metrics::InjectorMetrics::new(&mut registry, &config.auto_instru);

    let app_state = Arc::new(handlers::AppState {
        auto_instru: config.auto_instru,
        metrics,
    });

    let webhook_router = Router::new()
        .route("/inject", post(handlers::handle_inject))
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .with_state(app_state);

    let ready = Arc::new(AtomicBool::new(false));
    let health_router = health::routes(health::HealthState {
        registry: Arc::new(registry),
        ready: ready.clone(),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(shutdown_signal(shutdown_tx));

    tokio::join!(
        serve_webhook(listen_addr, tls_acceptor, webhook_router, ready, shutdown_rx.clone()),
        serve_health(metrics_addr, health_router, shutdown_rx),
    );

    info!("apm-injector shut down gracefully");
}
