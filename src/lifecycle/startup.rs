//! Startup orchestration.
//!
//! # Responsibilities
//! - Restore conversation history and seed the queue
//! - Build collaborators and the scheduler core
//! - Bind listeners, start the processing loop, wait for shutdown

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::RelayConfig;
use crate::conversation::{ConversationQueue, HistoryStore, InMemoryHistory};
use crate::dispatch::{
    DeliveryChannel, DispatchError, EnrichError, Enricher, HttpDelivery, HttpDispatcher,
    HttpEnricher, ResponseDispatcher,
};
use crate::http::IngestServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::relay::Relay;
use crate::resilience::RetryPolicy;
use crate::scheduler::{ProcessingLoop, ResponseExecutor, SchedulerContext};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dispatcher setup failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("enricher setup failed: {0}")]
    Enrich(#[from] EnrichError),
}

/// Why `App::run` returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    FatalConflict(String),
}

/// The assembled relay.
pub struct App {
    config: RelayConfig,
    history: Arc<InMemoryHistory>,
    processing: ProcessingLoop,
    relay: Relay,
    shutdown: Shutdown,
}

impl App {
    /// Build with the HTTP collaborators described by `config`.
    pub fn build(config: RelayConfig) -> Result<Self, StartupError> {
        let dispatcher = Arc::new(HttpDispatcher::new(&config.dispatcher)?);
        let delivery = Arc::new(HttpDelivery::new(&config.delivery)?);
        let enricher = Arc::new(HttpEnricher::new(&config.enrichment)?);
        Self::with_collaborators(config, dispatcher, delivery, enricher)
    }

    /// Build with injected collaborators.
    pub fn with_collaborators(
        config: RelayConfig,
        dispatcher: Arc<dyn ResponseDispatcher>,
        delivery: Arc<dyn DeliveryChannel>,
        enricher: Arc<dyn Enricher>,
    ) -> Result<Self, StartupError> {
        let history = match &config.history.snapshot_path {
            Some(path) => InMemoryHistory::load_from_file(config.history.max_messages, PathBuf::from(path))?,
            None => InMemoryHistory::new(config.history.max_messages, None),
        };
        let history = Arc::new(history);
        let queue = ConversationQueue::with_known(history.clone(), history.conversation_ids());

        let context = Arc::new(SchedulerContext::from_config(&config.circuit_breaker));
        let executor = ResponseExecutor::new(
            context.clone(),
            queue.clone(),
            dispatcher,
            delivery,
            RetryPolicy::from_config(&config.retries),
        );
        let processing = ProcessingLoop::new(context, queue.clone(), executor, config.scheduler.clone());
        let relay = Relay::new(queue, enricher, config.enrichment.placeholder.clone());

        tracing::info!(
            conversations = history.conversation_count(),
            poll_interval_ms = config.scheduler.poll_interval_ms,
            max_retries = config.retries.max_retries,
            breaker_threshold = config.circuit_breaker.max_failures,
            "Relay assembled"
        );

        Ok(Self {
            config,
            history,
            processing,
            relay,
            shutdown: Shutdown::new(),
        })
    }

    pub fn processing(&self) -> &ProcessingLoop {
        &self.processing
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Serve until a signal, an external `Shutdown::trigger`, or a fatal conflict.
    pub async fn run(self) -> Result<ExitReason, StartupError> {
        let ingest_listener = TcpListener::bind(&self.config.ingest.bind_address).await?;
        let ingest = IngestServer::new(&self.config.ingest, self.relay.clone());
        let ingest_task = tokio::spawn(ingest.run(ingest_listener, self.shutdown.subscribe()));

        let admin_task = if self.config.admin.enabled {
            let listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Admin API listening");
            let router = setup_admin_router(AdminState {
                processing: self.processing.clone(),
                api_key: Arc::from(self.config.admin.api_key.as_str()),
            });
            let mut shutdown = self.shutdown.subscribe();
            Some(tokio::spawn(async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await
            }))
        } else {
            None
        };

        let mut fatal = self.processing.subscribe_fatal();
        let mut external = self.shutdown.subscribe();
        self.processing.start();

        let reason = tokio::select! {
            _ = wait_for_signal() => ExitReason::Signal,
            _ = external.recv() => ExitReason::Signal,
            reason = wait_for_fatal(&mut fatal) => ExitReason::FatalConflict(reason),
        };

        tracing::info!(reason = ?reason, "Shutting down");
        self.shutdown.trigger();
        self.processing.stop();

        match ingest_task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Ingest server failed"),
            Err(e) => tracing::error!(error = %e, "Ingest server task panicked"),
            Ok(Ok(())) => {}
        }
        if let Some(task) = admin_task {
            if let Ok(Err(e)) = task.await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }

        if let Err(e) = self.history.save_to_file() {
            tracing::error!(error = %e, "Failed to save history snapshot");
        }

        Ok(reason)
    }
}

async fn wait_for_fatal(rx: &mut watch::Receiver<Option<String>>) -> String {
    loop {
        if let Some(reason) = rx.borrow_and_update().clone() {
            return reason;
        }
        if rx.changed().await.is_err() {
            // Sender dropped without a fatal; never resolve.
            std::future::pending::<()>().await;
        }
    }
}
