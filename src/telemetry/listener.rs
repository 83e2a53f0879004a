use std::collections::VecDeque;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use super::pipeline::TelemetryPipeline;
use super::sample::Sample;
use super::stats::LinkStats;
use crate::config::LinkConfig;
use crate::error::LinkError;

/// Find the local address the OS would route towards `vehicle`.
///
/// Connecting a UDP socket sends nothing; it only fixes the route.
pub fn local_interface(vehicle: SocketAddr) -> Result<IpAddr, LinkError> {
    let unspecified: IpAddr = if vehicle.is_ipv4() {
        Ipv4Addr::UNSPECIFIED.into()
    } else {
        Ipv6Addr::UNSPECIFIED.into()
    };

    let route = || -> io::Result<IpAddr> {
        let socket = std::net::UdpSocket::bind(SocketAddr::new(unspecified, 0))?;
        socket.connect(vehicle)?;
        Ok(socket.local_addr()?.ip())
    };

    route().map_err(|source| LinkError::LocalInterface { vehicle, source })
}

/// Bind the telemetry socket on the interface facing the vehicle.
pub async fn bind_telemetry_socket(config: &LinkConfig) -> Result<UdpSocket, LinkError> {
    let vehicle = config.vehicle_addr()?;
    let ip = local_interface(vehicle)?;
    let addr = SocketAddr::new(ip, config.telemetry_port);
    UdpSocket::bind(addr)
        .await
        .map_err(|source| LinkError::Bind { addr, source })
}

/// Handle on the long-lived receive worker.
///
/// Dropping the handle cancels the worker; [`TelemetryListener::shutdown`]
/// also waits for it to finish.
pub struct TelemetryListener {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TelemetryListener {
    pub fn spawn(
        socket: UdpSocket,
        pipeline: TelemetryPipeline,
        stats: Arc<LinkStats>,
        config: &LinkConfig,
    ) -> Result<Self, LinkError> {
        let local_addr = socket.local_addr().map_err(|source| LinkError::Bind {
            addr: SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), config.telemetry_port),
            source,
        })?;

        let cancel = CancellationToken::new();
        let worker = Worker {
            pipeline,
            stats,
            buffer: VecDeque::with_capacity(config.ingest_capacity),
            ingest_capacity: config.ingest_capacity.max(1),
        };

        let pacing = config.dispatch_interval();
        let span = tracing::info_span!("listener", addr = %local_addr);
        let handle = tokio::spawn(
            worker
                .run(socket, cancel.clone(), pacing, config.max_datagram_size.max(1))
                .instrument(span),
        );

        Ok(Self {
            local_addr,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker between datagrams and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "listener task ended abnormally");
            }
        }
    }
}

impl Drop for TelemetryListener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Worker {
    pipeline: TelemetryPipeline,
    stats: Arc<LinkStats>,
    buffer: VecDeque<Sample>,
    ingest_capacity: usize,
}

impl Worker {
    async fn run(
        mut self,
        socket: UdpSocket,
        cancel: CancellationToken,
        pacing: Duration,
        max_datagram_size: usize,
    ) {
        info!(pacing_ms = pacing.as_millis() as u64, "telemetry listener started");

        // One spare byte so a datagram over the limit is seen as such instead of truncated.
        let mut recv_buf = vec![0u8; max_datagram_size + 1];
        let mut cadence = (!pacing.is_zero()).then(|| {
            let mut cadence = interval(pacing);
            cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
            cadence
        });

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = next_tick(&mut cadence), if !self.buffer.is_empty() => {
                    self.dispatch();
                }

                received = socket.recv_from(&mut recv_buf) => {
                    match received {
                        Ok((len, peer)) if len > max_datagram_size => {
                            self.stats.record_datagram();
                            self.stats.record_oversized();
                            warn!(%peer, limit = max_datagram_size, "dropping oversized telemetry datagram");
                        }
                        Ok((len, peer)) => self.ingest(&recv_buf[..len], peer),
                        Err(e) => {
                            // ICMP errors and the like surface here; the socket stays usable.
                            self.stats.record_receive_error();
                            warn!(error = %e, "telemetry receive failed");
                        }
                    }
                    if cadence.is_none() {
                        self.dispatch();
                    }
                }
            }
        }

        self.dispatch();
        info!(processed = self.pipeline.processed(), "telemetry listener stopped");
    }

    fn ingest(&mut self, payload: &[u8], peer: SocketAddr) {
        self.stats.record_datagram();

        let sample = match Sample::decode(payload, Utc::now()) {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.record_malformed();
                warn!(%peer, error = %e, len = payload.len(), "dropping malformed telemetry");
                return;
            }
        };

        if self.buffer.len() >= self.ingest_capacity {
            self.buffer.pop_front();
            self.stats.record_overflow();
            debug!(capacity = self.ingest_capacity, "ingest buffer full, oldest sample dropped");
        }
        self.buffer.push_back(sample);
    }

    fn dispatch(&mut self) {
        while let Some(sample) = self.buffer.pop_front() {
            self.pipeline.process(sample);
        }
    }
}

async fn next_tick(cadence: &mut Option<Interval>) {
    match cadence {
        Some(cadence) => {
            cadence.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
