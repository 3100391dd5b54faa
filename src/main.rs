//! Coord Store Server - Binary Entry Point
//!
//! Serves the coordination toolkit over HTTP and runs the periodic sweep
//! that garbage-collects expired leases and expired event claims.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use coord_store::api::http::create_router;
use coord_store::api::state::AppState;
use coord_store::store::{SharedStore, StoreConfig};
use coord_store::types::CoordResult;

#[tokio::main]
async fn main() -> CoordResult<()> {
    let config = StoreConfig::from_env();
    println!("State file: {}", config.state_path().display());

    let store = Arc::new(SharedStore::open(config)?);
    let state = Arc::new(AppState::new(store.clone()));

    // Periodic expiry sweep (expiry is also enforced at every
    // acquire/claim decision; the sweep just removes dead rows)
    let sweep_secs: u64 = env::var("COORD_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let sweeper = store.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(sweep_secs));
        loop {
            ticker.tick().await;
            match sweeper.sweep_expired() {
                Ok(report) => {
                    if report.leases_removed > 0 || report.claims_released > 0 {
                        println!(
                            "Sweep: removed {} expired leases, released {} expired claims",
                            report.leases_removed, report.claims_released
                        );
                    }
                }
                Err(e) => eprintln!("Sweep failed: {}", e),
            }
        }
    });

    let bind_addr = env::var("COORD_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!(
        "{} v{} listening on {}",
        coord_store::NAME,
        coord_store::VERSION,
        bind_addr
    );

    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    // Ignore errors installing the handler: worst case we only stop on kill
    let _ = tokio::signal::ctrl_c().await;
}
