//! Service runtime: wires stores, policy checks, the webhook pipeline and
//! the HTTP API for one role.
//!
//! ```ignore
//! let runtime = Runtime::builder(WriterRole::Hub, config)
//!     .with_stores(stores)
//!     .build()?;
//! runtime.run().await
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use rentsync_policy::WriterRole;
use tokio::task::JoinHandle;
use tracing::info;

use crate::admin::AdminService;
use crate::api::{self, Services};
use crate::bookings::{BookingBackend, BookingService, LocalBookingBackend};
use crate::bus::{init_queue, JobReceiver};
use crate::channel_manager::{ChannelManagerError, HttpChannelManagerClient};
use crate::config::Config;
use crate::dlq::{DeadLetterPublisher, NoopDeadLetterPublisher};
use crate::guard::SourceOfTruthGuard;
use crate::reconciliation::{ReconciliationEngine, SnapshotScheduler};
use crate::storage::Stores;
use crate::webhook::{AllowlistError, ExternalStatusHandler, WebhookIngestor, WebhookWorker};
use crate::writer_lock::{CachedModeSource, StoreModeSource, WriterLock};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime requires stores")]
    MissingStores,

    #[error("invalid webhook allowlist: {0}")]
    Allowlist(#[from] AllowlistError),

    #[error("channel manager client: {0}")]
    ChannelManager(#[from] ChannelManagerError),
}

/// Builder for a [`Runtime`].
pub struct RuntimeBuilder {
    role: WriterRole,
    config: Config,
    stores: Option<Stores>,
    backend: Option<Arc<dyn BookingBackend>>,
    dead_letters: Option<Arc<dyn DeadLetterPublisher>>,
}

impl RuntimeBuilder {
    pub fn with_stores(mut self, stores: Stores) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Override where booking writes go.
    ///
    /// Defaults: the local store for the hub, the channel manager for the
    /// adapter.
    pub fn with_backend(mut self, backend: Arc<dyn BookingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_dead_letters(mut self, publisher: Arc<dyn DeadLetterPublisher>) -> Self {
        self.dead_letters = Some(publisher);
        self
    }

    pub fn build(self) -> Result<Runtime, RuntimeError> {
        let Self {
            role,
            config,
            stores,
            backend,
            dead_letters,
        } = self;
        let stores = stores.ok_or(RuntimeError::MissingStores)?;

        let modes = Arc::new(CachedModeSource::new(
            Arc::new(StoreModeSource::new(
                stores.modes.clone(),
                config.writer_lock.default_mode,
            )),
            Duration::from_millis(config.writer_lock.mode_cache_ttl_ms),
        ));
        let writer_lock = Arc::new(WriterLock::new(role, modes.clone()));
        let guard = Arc::new(SourceOfTruthGuard::new(Some(stores.mappings.clone())));

        let backend: Arc<dyn BookingBackend> = match (backend, role) {
            (Some(backend), _) => backend,
            (None, WriterRole::Hub) => Arc::new(LocalBookingBackend::new(stores.bookings.clone())),
            (None, WriterRole::Adapter) => Arc::new(HttpChannelManagerClient::from_config(
                &config.channel_manager,
                stores.mappings.clone(),
            )?),
        };
        let bookings = Arc::new(BookingService::new(
            backend,
            guard.clone(),
            config.brands.clone(),
        ));

        let (queue, jobs) = init_queue(&config.webhook.queue);
        let webhook = Arc::new(WebhookIngestor::new(
            config.webhook.clone(),
            stores.webhooks.clone(),
            queue.clone(),
        )?);
        let worker = Arc::new(WebhookWorker::new(
            &config.webhook,
            stores.webhooks.clone(),
            queue,
            Arc::new(ExternalStatusHandler::new(
                stores.mappings.clone(),
                stores.external_status.clone(),
            )),
            dead_letters.unwrap_or_else(|| Arc::new(NoopDeadLetterPublisher)),
        ));

        let (reconciliation, admin) = match role {
            WriterRole::Hub => (
                Some(Arc::new(ReconciliationEngine::new(&stores))),
                Some(Arc::new(
                    AdminService::new(
                        stores.modes.clone(),
                        stores.mappings.clone(),
                        stores.audit.clone(),
                    )
                    .with_mode_cache(modes),
                )),
            ),
            WriterRole::Adapter => (None, None),
        };

        let services = Services {
            role,
            writer_lock,
            guard,
            bookings,
            webhook,
            reconciliation,
            admin,
        };
        let router = api::build_router(&services, &config);

        Ok(Runtime {
            config,
            services,
            router,
            worker,
            jobs,
            tasks: Vec::new(),
        })
    }
}

/// One running service.
pub struct Runtime {
    config: Config,
    services: Services,
    router: Router,
    worker: Arc<WebhookWorker>,
    jobs: Option<JobReceiver>,
    tasks: Vec<JoinHandle<()>>,
}

impl Runtime {
    pub fn builder(role: WriterRole, config: Config) -> RuntimeBuilder {
        RuntimeBuilder {
            role,
            config,
            stores: None,
            backend: None,
            dead_letters: None,
        }
    }

    pub fn role(&self) -> WriterRole {
        self.services.role
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn worker(&self) -> Arc<WebhookWorker> {
        self.worker.clone()
    }

    /// Start background work: the webhook worker, the pending-event
    /// backfill and, on the hub, the snapshot scheduler.
    pub fn start(&mut self) {
        if let Some(jobs) = self.jobs.take() {
            self.tasks.push(tokio::spawn(self.worker.clone().run(jobs)));
        }

        if self.config.webhook.enabled {
            let every = Duration::from_secs(self.config.webhook.backfill_interval_secs);
            self.tasks.push(self.worker.clone().spawn_backfill(every));
        }

        let interval = self.config.reconciliation.snapshot_interval_secs;
        if let (Some(engine), true) = (&self.services.reconciliation, interval > 0) {
            let scheduler = SnapshotScheduler::new(engine.clone(), Duration::from_secs(interval));
            self.tasks
                .push(tokio::spawn(async move { scheduler.run().await }));
        }

        info!(
            role = %self.services.role,
            tasks = self.tasks.len(),
            "runtime started"
        );
    }

    /// Serve HTTP until a shutdown signal, then stop background work.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.start();
        let result = api::serve(self.router.clone(), &self.config.server.bind_addr()).await;

        info!("shutting down runtime");
        for task in self.tasks {
            task.abort();
        }
        result
    }
}
