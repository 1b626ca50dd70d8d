use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod csv_io;
mod error;
mod routes;
mod store;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// A server exposing a risk-limiting ballot-polling audit as a webservice
struct CliOptions {
    /// The socket to listen on. Default is 3000.
    #[arg(short, long)]
    socket: Option<u16>,

    /// The IP address to listen to. Default is 127.0.0.1
    #[arg(short, long)]
    ip: Option<IpAddr>,
}

#[tokio::main]
async fn main() {
    let args = CliOptions::parse();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rla_webserver=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state: routes::AppState = Arc::new(store::new_store());

    let app = Router::new()
        .route("/audit/contest", post(routes::start_audit))
        .route("/audit/manifest", post(routes::upload_manifest))
        .route("/audit/sample-sizes", get(routes::sample_sizes))
        .route("/audit/round", post(routes::start_round))
        .route(
            "/audit/round/current/retrieval-list.csv",
            get(routes::retrieval_list),
        )
        .route(
            "/audit/round/current/results",
            post(routes::record_results),
        )
        .route("/audit/status", get(routes::status))
        .route("/audit/report.csv", get(routes::report))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let ip = args.ip.unwrap_or_else(|| [127, 0, 0, 1].into());
    let addr = SocketAddr::from((ip, args.socket.unwrap_or(3000)));
    tracing::info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
