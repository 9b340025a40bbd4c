//! Bus and Dispatch Task Implementation

use crate::error::BusError;
use crate::{Event, EventBase, EventId, IdFilter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Default queue depth (5 events)
pub const DEFAULT_QUEUE_DEPTH: usize = 5;

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Registration {
    base: EventBase,
    filter: IdFilter,
    handler: Handler,
}

type Registry = Arc<RwLock<Vec<Registration>>>;

/// Cloneable producer side of a bus
#[derive(Clone)]
pub struct BusHandle {
    name: Arc<str>,
    sender: mpsc::Sender<Event>,
}

impl BusHandle {
    /// Enqueue an event, waiting up to `timeout` for queue space
    pub async fn post(
        &self,
        base: EventBase,
        id: EventId,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        let event = Event {
            base,
            id,
            payload: payload.to_vec(),
        };
        trace!("[{}] post {}:{} ({} bytes)", self.name, base, id, payload.len());

        self.sender
            .send_timeout(event, timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => BusError::Timeout(timeout.as_millis() as u64),
                SendTimeoutError::Closed(_) => BusError::Closed,
            })
    }

    /// Enqueue an event without waiting
    pub fn try_post(&self, base: EventBase, id: EventId, payload: &[u8]) -> Result<(), BusError> {
        let event = Event {
            base,
            id,
            payload: payload.to_vec(),
        };
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => BusError::Full,
            TrySendError::Closed(_) => BusError::Closed,
        })
    }

    /// Name given to the bus at creation
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Event bus owning its dispatch task
pub struct EventBus {
    handle: BusHandle,
    registry: Registry,
    stop: Option<oneshot::Sender<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl EventBus {
    /// Create a bus with room for `queue_depth` pending events and spawn
    /// its dispatch task. Must be called inside a tokio runtime.
    pub fn new(name: &str, queue_depth: usize) -> Self {
        let queue_depth = queue_depth.max(1);
        let (sender, receiver) = mpsc::channel(queue_depth);
        let (stop_tx, stop_rx) = oneshot::channel();
        let registry: Registry = Arc::new(RwLock::new(Vec::new()));
        let name: Arc<str> = Arc::from(name);

        let dispatcher = tokio::spawn(dispatch(
            name.clone(),
            receiver,
            registry.clone(),
            stop_rx,
        ));

        info!("Event bus '{}' created with queue depth {}", name, queue_depth);

        Self {
            handle: BusHandle { name, sender },
            registry,
            stop: Some(stop_tx),
            dispatcher: Some(dispatcher),
        }
    }

    /// Get a producer handle
    pub fn handle(&self) -> BusHandle {
        self.handle.clone()
    }

    /// Subscribe `handler` to events of `base` matching `filter`.
    ///
    /// Handlers run on the dispatch task in FIFO order and must not block.
    pub async fn register<F>(&self, base: EventBase, filter: IdFilter, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut registry = self.registry.write().await;
        registry.push(Registration {
            base,
            filter,
            handler: Arc::new(handler),
        });
        debug!(
            "[{}] handler registered for {} {:?} ({} total)",
            self.handle.name,
            base,
            filter,
            registry.len()
        );
    }

    /// Number of registered handlers
    pub async fn handler_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Enqueue an event, waiting up to `timeout` for queue space
    pub async fn post(
        &self,
        base: EventBase,
        id: EventId,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        self.handle.post(base, id, payload, timeout).await
    }

    /// Stop accepting events, dispatch what is already queued, then end
    /// the dispatch task.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.await;
        }
        info!("Event bus '{}' shut down", self.handle.name);
    }
}

async fn dispatch(
    name: Arc<str>,
    mut receiver: mpsc::Receiver<Event>,
    registry: Registry,
    mut stop: oneshot::Receiver<()>,
) {
    debug!("[{}] dispatch task started", name);

    loop {
        tokio::select! {
            biased;
            // A dropped EventBus also ends dispatch
            _ = &mut stop => break,
            event = receiver.recv() => match event {
                Some(event) => deliver(&registry, &event).await,
                None => {
                    debug!("[{}] all producers gone", name);
                    return;
                }
            },
        }
    }

    receiver.close();
    let mut flushed = 0usize;
    while let Some(event) = receiver.recv().await {
        deliver(&registry, &event).await;
        flushed += 1;
    }
    debug!("[{}] dispatch task stopped, {} queued events flushed", name, flushed);
}

async fn deliver(registry: &Registry, event: &Event) {
    let handlers: Vec<Handler> = registry
        .read()
        .await
        .iter()
        .filter(|r| r.base == event.base && r.filter.matches(event.id))
        .map(|r| r.handler.clone())
        .collect();

    if handlers.is_empty() {
        trace!("No handler for {}:{}", event.base, event.id);
    }
    for handler in handlers {
        handler(event);
    }
}
