/// MatchdayWatcher — live match push notifications
///
/// Co dělá:
///   1. Každých POLL_MS polluje feed všech sledovaných zápasů (paralelně)
///   2. Normalizuje JSON → MatchState, porovná s minulým stavem
///   3. Každý přechod (gól, výkop, poločas, konec, sestavy, PRE30) se
///      jednou zaclaimuje v Redis (fallback: paměť) a pošle přes FCM
///
/// Spuštění:
///   cargo run --bin watcher

use anyhow::Result;
use dotenv::dotenv;
use idempotency_gate::IdempotencyGate;
use logger::EventLogger;
use match_feed::{HttpFeed, IdDiscovery};
use matchday_watcher::{Config, Watcher};
use push_dispatcher::{Dispatcher, DryRunTransport, FcmTransport, PushTransport};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use transition_detector::Detector;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!("[watcher] started");

    let config = Config::from_env();
    if !config.feed_template.contains("{id}") {
        error!("FEED_TMPL must contain {{id}}; every match fetch fails until it is fixed");
    }
    info!(
        poll_ms = config.poll_interval.as_millis() as u64,
        lead_minutes = config.lead_minutes,
        scope = %config.scope_default,
        "config loaded"
    );

    let audit = Arc::new(EventLogger::new(&config.log_dir));

    let transport: Arc<dyn PushTransport> = match config.fcm_credentials() {
        Some((project, tokens)) => {
            let fcm = FcmTransport::new(project, tokens);
            info!("FCM auth: {}", fcm.auth_kind());
            Arc::new(fcm)
        }
        None => {
            warn!("⚠️ FCM credentials missing (FCM_PROJECT_ID + FCM_CLIENT_EMAIL/FCM_PRIVATE_KEY), pushes are only logged (dry-run)");
            Arc::new(DryRunTransport::new())
        }
    };
    let dispatcher = Dispatcher::new(
        transport,
        config.targeting.clone(),
        &config.scope_default,
        config.lead_minutes,
    )
    .with_audit(audit.clone());
    info!("Push transport: {}", dispatcher.transport_name());

    if config.send_test_on_boot {
        dispatcher.send_boot_test().await;
    }

    let gate = IdempotencyGate::connect(config.redis_url.as_deref()).await;
    info!("Idempotency store: {}", gate.mode());

    let watcher = Arc::new(
        Watcher::new(
            Arc::new(HttpFeed::new(&config.feed_template)),
            Detector::new(config.lead_minutes),
            gate,
            dispatcher,
            &config.scope_default,
        )
        .with_audit(audit),
    );
    let discovery = IdDiscovery::new(config.feed_list_url.clone(), config.match_ids.clone());

    // signal handlers are installed right away, not at the first idle wait
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(());
    });

    watcher
        .run_until(&discovery, config.poll_interval, async {
            let _ = stop_rx.await;
        })
        .await;

    info!("[watcher] stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = term.recv() => info!("[watcher] SIGTERM, shutting down…"),
                    _ = tokio::signal::ctrl_c() => info!("[watcher] Ctrl-C, shutting down…"),
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
