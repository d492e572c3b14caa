// Background telemetry poller
//
// Polls the transport on a fixed cadence and publishes the latest datagram
// into a watch channel. The console reads the channel; nobody else touches
// the socket's receive side.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::messages::TelemetryMessage;
use crate::transport::UdpTransport;

/// Read side of the last-telemetry slot
#[derive(Debug, Clone)]
pub struct TelemetrySlot {
    rx: watch::Receiver<Option<TelemetryMessage>>,
}

impl TelemetrySlot {
    /// Most recent datagram, if any has arrived
    pub fn latest(&self) -> Option<TelemetryMessage> {
        self.rx.borrow().clone()
    }

    /// True once per newly published datagram
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Most recent datagram, marking it seen
    pub fn take_latest(&mut self) -> Option<TelemetryMessage> {
        self.rx.borrow_and_update().clone()
    }
}

pub struct TelemetryPoller {
    transport: Arc<UdpTransport>,
    period: Duration,
    tx: watch::Sender<Option<TelemetryMessage>>,
}

impl TelemetryPoller {
    pub fn new(transport: Arc<UdpTransport>, period: Duration) -> (Self, TelemetrySlot) {
        let (tx, rx) = watch::channel(None);
        let poller = Self {
            transport,
            period,
            tx,
        };
        (poller, TelemetrySlot { rx })
    }

    /// One poll: drain whatever is waiting, keep the newest. Returns how many
    /// datagrams arrived.
    pub fn poll_once(&self) -> usize {
        let mut received = 0;
        loop {
            match self.transport.try_receive() {
                Ok(Some(msg)) => {
                    debug!("Telemetry: {}", msg);
                    self.tx.send_replace(Some(msg));
                    received += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    // Same as "no data" for control flow, but worth a trace
                    warn!("{}", e);
                    break;
                }
            }
        }
        received
    }

    /// Poll until `shutdown` flips to true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Telemetry poller started: {}ms cadence", self.period.as_millis());

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = tick.tick() => {
                    self.poll_once();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Telemetry poller stopped");
    }
}
