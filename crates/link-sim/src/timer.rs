//! One-shot timers feeding the link driver

use crate::machine::Command;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    Connect,
    AcquireIp,
    Disconnect,
}

/// Fires once after its delay by sending `TimerFired` to the driver.
/// Expiry does nothing else; the driver owns every state change.
pub(crate) struct OneShotTimer {
    kind: TimerKind,
    pending: Option<JoinHandle<()>>,
}

impl OneShotTimer {
    pub(crate) fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            pending: None,
        }
    }

    /// Arm the timer, cancelling a previous arm
    pub(crate) fn start_once(
        &mut self,
        delay: Duration,
        epoch: u64,
        commands: mpsc::WeakSender<Command>,
    ) {
        self.stop();
        let kind = self.kind;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::TimerFired { kind, epoch }).await;
            }
        }));
    }

    pub(crate) fn stop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    /// Forget the handle of a timer whose fire has been received
    pub(crate) fn mark_fired(&mut self) {
        self.pending = None;
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The connect, acquire-IP and auto-disconnect timers
pub(crate) struct LinkTimers {
    pub(crate) connect: OneShotTimer,
    pub(crate) acquire_ip: OneShotTimer,
    pub(crate) disconnect: OneShotTimer,
}

impl LinkTimers {
    pub(crate) fn new() -> Self {
        Self {
            connect: OneShotTimer::new(TimerKind::Connect),
            acquire_ip: OneShotTimer::new(TimerKind::AcquireIp),
            disconnect: OneShotTimer::new(TimerKind::Disconnect),
        }
    }

    pub(crate) fn get_mut(&mut self, kind: TimerKind) -> &mut OneShotTimer {
        match kind {
            TimerKind::Connect => &mut self.connect,
            TimerKind::AcquireIp => &mut self.acquire_ip,
            TimerKind::Disconnect => &mut self.disconnect,
        }
    }

    pub(crate) fn stop_all(&mut self) {
        self.connect.stop();
        self.acquire_ip.stop();
        self.disconnect.stop();
    }

    pub(crate) fn pending_count(&self) -> usize {
        [&self.connect, &self.acquire_ip, &self.disconnect]
            .iter()
            .filter(|t| t.is_pending())
            .count()
    }
}
