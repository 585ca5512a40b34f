mod backend_event;
mod bridge_event;
pub mod socket;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::sync::Mutex;
use tokio::time::{self, Instant, MissedTickBehavior};

use cync_proto::frame::Frame;
use cync_proto::request;

use crate::backend::cloud::socket::CloudSocket;
use crate::backend::Backend;
use crate::config::CloudConfig;
use crate::error::{ApiError, ApiResult};
use crate::host::{BackendRequest, HostBridge};
use crate::model::registry::DeviceRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
}

/// The cloud session: owns the TCP connection lifecycle, the login
/// handshake, the keep-alive and probe timers, and the queue of frames
/// submitted while the session is down.
pub struct CloudBackend {
    name: String,
    config: CloudConfig,
    registry: Arc<Mutex<DeviceRegistry>>,
    host: Arc<dyn HostBridge>,
    chan: Option<Receiver<Arc<BackendRequest>>>,

    session: SessionState,
    queue: VecDeque<Frame>,
    seq: u16,
    last_connect: Option<Instant>,
}

impl CloudBackend {
    /// Minimum spacing between successful connections.
    pub const RECONNECT_FLOOR: Duration = Duration::from_millis(10_000);
    const PING_INTERVAL: Duration = Duration::from_millis(180_000);
    const PROBE_INTERVAL: Duration = Duration::from_millis(300_000);

    #[must_use]
    pub fn new(
        name: &str,
        config: CloudConfig,
        registry: Arc<Mutex<DeviceRegistry>>,
        host: Arc<dyn HostBridge>,
        chan: Receiver<Arc<BackendRequest>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            config,
            registry,
            host,
            chan: Some(chan),
            session: SessionState::Disconnected,
            queue: VecDeque::new(),
            seq: 0,
            last_connect: None,
        }
    }

    async fn run_once(&mut self, chan: &mut Receiver<Arc<BackendRequest>>) -> ApiResult<()> {
        self.session = SessionState::Connecting;
        log::info!(
            "[{}] Connecting to {}:{}",
            self.name,
            self.config.host,
            self.config.port
        );
        let mut socket =
            CloudSocket::connect(&self.name, &self.config.host, self.config.port).await?;
        self.last_connect = Some(Instant::now());
        self.seq = 0;

        self.session = SessionState::Authenticating;
        let login = request::auth(self.config.user_id, &self.config.authorize)?;
        socket.send(&login).await?;

        self.event_loop(chan, socket).await
    }

    /// The session's single loop: inbound frames, host requests and the
    /// two timers, all interleaved cooperatively. Returns `Ok` only when
    /// the host side shut down.
    async fn event_loop(
        &mut self,
        chan: &mut Receiver<Arc<BackendRequest>>,
        mut socket: CloudSocket,
    ) -> ApiResult<()> {
        let mut ping = time::interval(Self::PING_INTERVAL);
        let mut probe = time::interval(Self::PROBE_INTERVAL);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // an interval's first tick completes at once; pinging an
        // unauthenticated session is pointless
        ping.tick().await;

        loop {
            select! {
                pkt = socket.next() => {
                    let frame = pkt.ok_or(ApiError::UnexpectedCloudEof)?;
                    self.handle_frame(&mut socket, &frame).await?;
                }

                req = chan.recv() => match req {
                    Ok(req) => self.handle_request(Some(&mut socket), &req).await?,
                    Err(RecvError::Lagged(n)) => {
                        log::warn!("[{}] Skipped {n} host requests", self.name);
                    }
                    Err(RecvError::Closed) => return Ok(()),
                },

                _ = ping.tick() => {
                    if self.session == SessionState::Connected {
                        socket.send(&request::ping()).await?;
                    }
                }

                _ = probe.tick() => self.probe_all(&mut socket).await?,
            }
        }
    }

    /// Write out a frame, or park it until the session is authenticated.
    pub(super) async fn send(
        &mut self,
        socket: Option<&mut CloudSocket>,
        frame: Frame,
    ) -> ApiResult<()> {
        match socket {
            Some(socket) if self.session == SessionState::Connected => socket.send(&frame).await,
            _ => {
                self.queue.push_back(frame);
                Ok(())
            }
        }
    }

    /// Flush the pre-connect queue in submission order. Runs on the
    /// transition to connected, before any newly submitted send.
    pub(super) async fn drain_queue(&mut self, socket: &mut CloudSocket) -> ApiResult<()> {
        while let Some(frame) = self.queue.pop_front() {
            socket.send(&frame).await?;
        }
        Ok(())
    }

    /// Every five minutes each bulb reverts to unreachable until its
    /// switch answers a fresh probe.
    pub(super) async fn probe_all(&mut self, socket: &mut CloudSocket) -> ApiResult<()> {
        let switches: Vec<u32> = {
            let mut lock = self.registry.lock().await;
            lock.bulbs_mut()
                .map(|bulb| {
                    bulb.connected = false;
                    bulb.switch_id
                })
                .collect()
        };

        for switch_id in switches {
            let seq = self.next_seq();
            self.send(Some(&mut *socket), request::connected_probe(switch_id, seq))
                .await?;
        }
        Ok(())
    }

    pub(super) fn next_seq(&mut self) -> u16 {
        self.seq = self.seq.wrapping_add(1);
        self.seq
    }

    fn reconnect_delay(last_connect: Option<Instant>) -> Duration {
        last_connect.map_or(Duration::ZERO, |connected_at| {
            Self::RECONNECT_FLOOR.saturating_sub(connected_at.elapsed())
        })
    }
}

#[async_trait]
impl Backend for CloudBackend {
    async fn run_forever(mut self) -> ApiResult<()> {
        let mut chan = match self.chan.take() {
            Some(chan) => chan,
            None => self.registry.lock().await.backend_event_stream(),
        };

        log::info!(
            "[{}] Starting cloud bridge for user {}",
            self.name,
            self.config.user_id
        );

        loop {
            match self.run_once(&mut chan).await {
                Ok(()) => {
                    log::info!("[{}] Host side closed, shutting down", self.name);
                    return Ok(());
                }
                Err(err) => log::error!("[{}] Cloud session failed: {err}", self.name),
            }
            self.session = SessionState::Disconnected;

            let delay = Self::reconnect_delay(self.last_connect);
            if !delay.is_zero() {
                log::info!("[{}] Reconnecting in {delay:?}", self.name);
            }
            let deadline = Instant::now() + delay;

            // host requests keep flowing into the queue while the floor
            // runs out
            loop {
                select! {
                    () = time::sleep_until(deadline) => break,
                    req = chan.recv() => match req {
                        Ok(req) => self.handle_request(None, &req).await?,
                        Err(RecvError::Lagged(n)) => {
                            log::warn!("[{}] Skipped {n} host requests", self.name);
                        }
                        Err(RecvError::Closed) => return Ok(()),
                    },
                }
            }
        }
    }
}
