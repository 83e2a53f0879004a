use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::command::{Command, CommandTransmitter};
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::telemetry::listener::{bind_telemetry_socket, TelemetryListener};
use crate::telemetry::{
    Channel, ChannelLogger, LinkStats, LinkStatsSnapshot, Observer, ObserverRegistry,
    SharedStore, Subscription, TelemetryPipeline, TelemetryStore,
};

/// One operator session with one vehicle.
///
/// Construction binds the telemetry socket and starts the listener; any
/// setup failure is returned here rather than retried in the background.
pub struct RoverLink {
    session_id: Uuid,
    config: LinkConfig,
    vehicle: SocketAddr,
    transmitter: CommandTransmitter,
    store: SharedStore,
    registry: Arc<ObserverRegistry>,
    stats: Arc<LinkStats>,
    log_paths: Vec<(Channel, PathBuf)>,
    listener: TelemetryListener,
}

impl RoverLink {
    pub async fn connect(config: LinkConfig) -> Result<Self, LinkError> {
        config.validate()?;
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("session", id = %session_id);
        Self::establish(config, session_id).instrument(span).await
    }

    async fn establish(config: LinkConfig, session_id: Uuid) -> Result<Self, LinkError> {
        let vehicle = config.vehicle_addr()?;
        let transmitter = CommandTransmitter::udp(vehicle)?;

        let socket = bind_telemetry_socket(&config).await?;

        // Log files only once the socket is ours, so a failed bind leaves nothing on disk.
        let logger = if config.logging {
            Some(ChannelLogger::create(&config.log_dir, Utc::now())?)
        } else {
            None
        };
        let log_paths: Vec<(Channel, PathBuf)> = logger
            .as_ref()
            .map(|l| l.paths().map(|(c, p)| (c, p.to_path_buf())).collect())
            .unwrap_or_default();

        let store = SharedStore::new(TelemetryStore::bounded(config.history_capacity));
        let registry = Arc::new(ObserverRegistry::new(config.subscriber_capacity));
        let stats = Arc::new(LinkStats::new());

        let pipeline = TelemetryPipeline::new(store.clone(), registry.clone(), logger, stats.clone());
        let listener = TelemetryListener::spawn(socket, pipeline, stats.clone(), &config)?;

        info!(
            %vehicle,
            telemetry = %listener.local_addr(),
            logging = config.logging,
            "rover link up"
        );

        Ok(Self {
            session_id,
            config,
            vehicle,
            transmitter,
            store,
            registry,
            stats,
            log_paths,
            listener,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn vehicle_addr(&self) -> SocketAddr {
        self.vehicle
    }

    /// Address the telemetry socket is bound to.
    pub fn telemetry_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn transmit(&self, command: Command) -> Result<(), LinkError> {
        self.transmitter.send(command)
    }

    /// Transmit a raw token; `None` when the token is not a known command.
    pub fn transmit_token(&self, token: &str) -> Option<Result<(), LinkError>> {
        self.transmitter.send_token(token)
    }

    pub fn register_listener<I>(&self, observers: I)
    where
        I: IntoIterator<Item = Arc<dyn Observer>>,
    {
        self.registry.register(observers);
    }

    pub fn subscribe(&self) -> Subscription {
        self.registry.subscribe()
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn stats(&self) -> LinkStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn log_path(&self, channel: Channel) -> Option<&Path> {
        self.log_paths
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, p)| p.as_path())
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_running()
    }

    pub async fn shutdown(self) {
        info!(session = %self.session_id, "rover link shutting down");
        self.listener.shutdown().await;
    }
}
