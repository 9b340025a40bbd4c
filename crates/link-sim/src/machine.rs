//! Link State Machine Implementation

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::timer::{LinkTimers, TimerKind};
use crate::{LinkEvent, LinkState, LINK_EVENT_BASE};
use event_bus::BusHandle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Depth of the driver command queue
const COMMAND_QUEUE_DEPTH: usize = 16;

type Ack = oneshot::Sender<Result<(), LinkError>>;

#[derive(Debug)]
pub(crate) enum Command {
    Init(Ack),
    /// `None` for fire-and-forget requests from bus handlers
    Connect(Option<Ack>),
    Disconnect(Ack),
    TimerFired { kind: TimerKind, epoch: u64 },
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable control handle of a running link
#[derive(Clone)]
pub struct LinkHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<LinkState>,
}

impl LinkHandle {
    async fn request(&self, command: impl FnOnce(Ack) -> Command) -> Result<(), LinkError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(command(ack))
            .await
            .map_err(|_| LinkError::DriverStopped)?;
        done.await.map_err(|_| LinkError::DriverStopped)?
    }

    /// Create the timers and enter `Initialized`
    pub async fn init(&self) -> Result<(), LinkError> {
        self.request(Command::Init).await
    }

    /// Start (or restart) the connect / acquire-IP / drop cycle
    pub async fn connect(&self) -> Result<(), LinkError> {
        self.request(|ack| Command::Connect(Some(ack))).await
    }

    /// Non-blocking connect request, safe to call from a bus handler
    pub fn request_connect(&self) -> Result<(), LinkError> {
        self.commands
            .try_send(Command::Connect(None))
            .map_err(|e| match e {
                TrySendError::Full(_) => LinkError::Busy,
                TrySendError::Closed(_) => LinkError::DriverStopped,
            })
    }

    /// Drop the link now: stops every timer and emits `Disconnected`
    pub async fn disconnect(&self) -> Result<(), LinkError> {
        self.request(Command::Disconnect).await
    }

    /// Transmit `data` over the simulated link.
    ///
    /// Only valid in `ConnectedWithIp`. Nothing is queued or retried.
    pub fn send(&self, data: &[u8]) -> Result<(), LinkError> {
        let state = self.state();
        if state != LinkState::ConnectedWithIp {
            warn!("Error sending data, invalid state -> {}", state);
            return Err(LinkError::InvalidState(state));
        }
        debug!("Sent {} bytes", data.len());
        Ok(())
    }

    /// Current state
    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }
}

/// Simulated link driven by three chained one-shot timers
pub struct LinkStateMachine {
    handle: LinkHandle,
    driver: Option<JoinHandle<()>>,
}

impl LinkStateMachine {
    /// Spawn the link driver in `Uninitialized`; events go to `bus`.
    /// Must be called inside a tokio runtime.
    pub fn new(config: LinkConfig, bus: BusHandle) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (state_tx, state_rx) = watch::channel(LinkState::Uninitialized);

        let driver = Driver {
            config,
            bus,
            state: state_tx,
            timers: None,
            epoch: 0,
            commands: commands.downgrade(),
        };
        let task = tokio::spawn(driver.run(receiver));

        Self {
            handle: LinkHandle {
                commands,
                state: state_rx,
            },
            driver: Some(task),
        }
    }

    /// Get a cloneable control handle
    pub fn handle(&self) -> LinkHandle {
        self.handle.clone()
    }

    pub async fn init(&self) -> Result<(), LinkError> {
        self.handle.init().await
    }

    pub async fn connect(&self) -> Result<(), LinkError> {
        self.handle.connect().await
    }

    pub async fn disconnect(&self) -> Result<(), LinkError> {
        self.handle.disconnect().await
    }

    pub fn send(&self, data: &[u8]) -> Result<(), LinkError> {
        self.handle.send(data)
    }

    pub fn state(&self) -> LinkState {
        self.handle.state()
    }

    /// Stop every timer, then end the driver task
    pub async fn shutdown(mut self) {
        let (ack, done) = oneshot::channel();
        if self.handle.commands.send(Command::Shutdown(ack)).await.is_ok() {
            let _ = done.await;
        }
        if let Some(driver) = self.driver.take() {
            let _ = driver.await;
        }
        info!("Link simulator shut down");
    }
}

struct Driver {
    config: LinkConfig,
    bus: BusHandle,
    state: watch::Sender<LinkState>,
    /// `None` until `init()`
    timers: Option<LinkTimers>,
    /// Bumped by every connect/disconnect; older timer fires are stale
    epoch: u64,
    commands: mpsc::WeakSender<Command>,
}

impl Driver {
    async fn run(mut self, mut receiver: mpsc::Receiver<Command>) {
        while let Some(command) = receiver.recv().await {
            match command {
                Command::Init(ack) => {
                    let _ = ack.send(self.init());
                }
                Command::Connect(ack) => {
                    let result = self.connect();
                    match ack {
                        Some(ack) => {
                            let _ = ack.send(result);
                        }
                        None => {
                            if let Err(e) = result {
                                warn!("Connect request rejected: {}", e);
                            }
                        }
                    }
                }
                Command::Disconnect(ack) => {
                    let result = self.disconnect().await;
                    let _ = ack.send(result);
                }
                Command::TimerFired { kind, epoch } => self.on_timer(kind, epoch).await,
                Command::Shutdown(ack) => {
                    self.stop_timers();
                    let _ = ack.send(());
                    return;
                }
            }
        }
        self.stop_timers();
    }

    fn current(&self) -> LinkState {
        *self.state.borrow()
    }

    fn transition(&self, next: LinkState) {
        let previous = self.state.send_replace(next);
        metrics::counter!("link_transitions_total").increment(1);
        debug!("Link {} -> {}", previous, next);
    }

    async fn emit(&self, event: LinkEvent) {
        let timeout = self.config.post_timeout();
        if let Err(e) = self.bus.post(LINK_EVENT_BASE, event.id(), &[], timeout).await {
            warn!("Failed to post {:?}: {}", event, e);
        }
    }

    fn stop_timers(&mut self) {
        if let Some(timers) = self.timers.as_mut() {
            timers.stop_all();
        }
    }

    fn init(&mut self) -> Result<(), LinkError> {
        if self.timers.is_some() {
            return Err(LinkError::InvalidState(self.current()));
        }
        self.timers = Some(LinkTimers::new());
        self.transition(LinkState::Initialized);
        info!("Link initialized");
        Ok(())
    }

    fn connect(&mut self) -> Result<(), LinkError> {
        let state = self.current();
        let timers = self
            .timers
            .as_mut()
            .ok_or(LinkError::InvalidState(state))?;

        timers.stop_all();
        self.epoch += 1;
        timers
            .connect
            .start_once(self.config.connect_delay(), self.epoch, self.commands.clone());

        info!("Connecting (from {}), link in {}ms", state, self.config.connect_delay_ms);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), LinkError> {
        let state = self.current();
        let timers = self
            .timers
            .as_mut()
            .ok_or(LinkError::InvalidState(state))?;

        timers.stop_all();
        self.epoch += 1;
        self.transition(LinkState::Disconnected);
        info!("Link disconnected, call connect() to reconnect");
        self.emit(LinkEvent::Disconnected).await;
        Ok(())
    }

    async fn on_timer(&mut self, kind: TimerKind, epoch: u64) {
        if epoch != self.epoch {
            debug!("Discarding stale {:?} timer (epoch {} != {})", kind, epoch, self.epoch);
            return;
        }
        let Some(timers) = self.timers.as_mut() else {
            return;
        };
        timers.get_mut(kind).mark_fired();

        match kind {
            TimerKind::Connect => {
                info!("Link connected");
                self.transition(LinkState::Connected);
                self.emit(LinkEvent::Connected).await;
                self.arm(TimerKind::AcquireIp);
            }
            TimerKind::AcquireIp => {
                info!("Link got IP");
                self.transition(LinkState::ConnectedWithIp);
                self.emit(LinkEvent::GotIp).await;
                self.arm(TimerKind::Disconnect);
            }
            TimerKind::Disconnect => {
                // Same path as an explicit disconnect()
                if let Err(e) = self.disconnect().await {
                    warn!("Automatic disconnect failed: {}", e);
                }
            }
        }
    }

    fn arm(&mut self, kind: TimerKind) {
        let delay = match kind {
            TimerKind::Connect => self.config.connect_delay(),
            TimerKind::AcquireIp => self.config.ip_delay(),
            TimerKind::Disconnect => self.config.disconnect_delay(),
        };
        if let Some(timers) = self.timers.as_mut() {
            timers
                .get_mut(kind)
                .start_once(delay, self.epoch, self.commands.clone());
            debug_assert!(timers.pending_count() <= 1);
        }
    }
}
