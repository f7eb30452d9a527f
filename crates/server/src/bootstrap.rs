use std::sync::Arc;

use cartbot_chat::router::{MessageRouter, NoopOrderService};
use cartbot_chat::runner::{ChatRunner, NoopTransport, ReconnectPolicy};
use cartbot_core::config::{AppConfig, TransportMode};
use cartbot_core::session::{SessionStore, SessionSweeper, SweeperHandle};
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<SessionStore>,
    pub sweeper: SweeperHandle,
    pub runner: ChatRunner<NoopOrderService>,
}

/// Wires the engine together: session store, background sweeper, and the
/// message pump. Must run inside a tokio runtime; the sweeper task starts
/// here.
pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        timeout_mins = config.session.timeout_mins,
        sweep_interval_mins = config.session.sweep_interval_mins,
        "starting application bootstrap"
    );

    let store = Arc::new(SessionStore::new(config.session_timeout()));
    let sweeper = SessionSweeper::new(store.clone(), config.sweep_interval()).start();

    let router = MessageRouter::new(
        store.clone(),
        NoopOrderService,
        config.chat.reset_keywords.clone(),
    );
    let runner = ChatRunner::new(Arc::new(NoopTransport), router, ReconnectPolicy::default());

    if config.chat.transport == TransportMode::Webhook {
        // A real webhook transport lives outside this repository; until one
        // is wired in, the runner pumps the no-op transport either way.
        info!(
            event_name = "system.bootstrap.transport_unavailable",
            correlation_id = "bootstrap",
            "webhook transport configured but not linked; using noop transport"
        );
    }

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        "application bootstrap complete"
    );

    Application { config, store, sweeper, runner }
}
