//! Central hub loop.
//!
//! This task owns the [`Roster`] and processes all events coming from
//! connection tasks: registrations, deregistrations, and inbound lines
//! to route. It is the only place the registry is ever touched, which is
//! what makes the rest of the server lock-free.
//!
//! Routing policy:
//! - Unicast lines go **only** to the addressed peer, payload verbatim;
//!   an unknown target drops the line.
//! - Broadcast lines go to **every** peer except the sender, rendered as
//!   `"<senderName>: <payload>"`.
//! - Delivery never blocks this loop: a peer whose outbound queue is full
//!   is evicted on the spot and the loop moves on.

use anyhow::{anyhow, Result};
use relay_core::{Address, ConnId, Roster};
use relay_protocol::text_codec;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::types::{HubEvent, HubRx, HubTx, OutboundTx};

/// Cloneable handle for talking to the hub loop.
///
/// Connection tasks never see the registry; everything goes through
/// these methods, which just enqueue events.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: HubTx,
}

impl HubHandle {
    pub fn new(tx: HubTx) -> Self {
        HubHandle { tx }
    }

    /// Admit a peer and wait for the hub to assign its identity.
    ///
    /// `sender` is the bounded queue the hub will deliver into; the
    /// caller keeps the receiving end for its writer task.
    pub async fn register(&self, name: Option<String>, sender: OutboundTx) -> Result<ConnId> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(HubEvent::Register {
                name,
                sender,
                reply: reply_tx,
            })
            .map_err(|_| anyhow!("hub is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("hub dropped the registration reply"))
    }

    /// Retire a peer. Safe to call more than once for the same identity.
    pub fn unregister(&self, id: ConnId) -> Result<()> {
        self.tx
            .send(HubEvent::Unregister { id })
            .map_err(|_| anyhow!("hub is not running"))
    }

    /// Submit one raw inbound line for routing.
    pub fn dispatch(&self, sender: ConnId, raw: String) -> Result<()> {
        self.tx
            .send(HubEvent::Dispatch { sender, raw })
            .map_err(|_| anyhow!("hub is not running"))
    }

    /// Number of currently registered peers.
    pub async fn peer_count(&self) -> Result<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(HubEvent::PeerCount { reply: reply_tx })
            .map_err(|_| anyhow!("hub is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("hub dropped the count reply"))
    }
}

/// Spawn a hub loop on the current runtime and return a handle to it.
pub fn start() -> HubHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_hub(rx));
    HubHandle::new(tx)
}

/// Run the hub processing loop.
///
/// Exits when every [`HubHandle`] is gone; under normal operation that
/// only happens at process shutdown.
pub async fn run_hub(mut events: HubRx) {
    let mut roster: Roster<OutboundTx> = Roster::new();

    while let Some(event) = events.recv().await {
        match event {
            HubEvent::Register {
                name,
                sender,
                reply,
            } => {
                let id = roster.register(name, sender);
                info!(conn = %id, name = roster.name_of(id).unwrap_or_default(), "peer joined");

                if reply.send(id).is_err() {
                    // The connection died before learning its identity and
                    // can never unregister itself; retire it here.
                    roster.unregister(id);
                }
            }
            HubEvent::Unregister { id } => {
                // Dropping the peer closes its outbound queue, which is
                // what stops its writer task.
                if roster.unregister(id).is_some() {
                    info!(conn = %id, "peer left");
                }
            }
            HubEvent::Dispatch { sender, raw } => {
                dispatch(&mut roster, sender, &raw);
            }
            HubEvent::PeerCount { reply } => {
                let _ = reply.send(roster.len());
            }
        }
    }

    info!("hub loop shutting down (event channel closed)");
}

/// Route a single inbound line from `sender` to its recipients.
fn dispatch(roster: &mut Roster<OutboundTx>, sender: ConnId, raw: &str) {
    let Some(sender_name) = roster.name_of(sender).map(str::to_string) else {
        // The sender was evicted before this line got processed.
        debug!(conn = %sender, "dropping line from retired peer");
        return;
    };

    match text_codec::parse_line(raw) {
        Address::Malformed(reason) => {
            warn!(conn = %sender, %reason, line = raw, "discarding malformed line");
        }
        Address::Unicast { target, payload } => {
            if !roster.contains(target) {
                warn!(conn = %sender, %target, "discarding line for unknown recipient");
                return;
            }
            deliver(roster, target, payload);
        }
        Address::Broadcast { payload } => {
            let text = text_codec::format_broadcast(&sender_name, &payload);

            // Snapshot the targets first: delivery can evict a slow peer,
            // which mutates the roster mid-walk.
            for target in roster.broadcast_targets(sender) {
                deliver(roster, target, text.clone());
            }
        }
    }
}

/// Enqueue one line for `target`, without ever blocking the hub loop.
///
/// A full queue means the peer has stopped draining its messages; it is
/// evicted so one slow consumer cannot stall everyone else. A closed
/// queue means its writer is already gone, so the eviction just finishes
/// the cleanup.
fn deliver(roster: &mut Roster<OutboundTx>, target: ConnId, text: String) {
    let Some(queue) = roster.endpoint(target) else {
        return;
    };

    match queue.try_send(text) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!(conn = %target, "outbound queue full, evicting slow peer");
            roster.unregister(target);
        }
        Err(TrySendError::Closed(_)) => {
            roster.unregister(target);
        }
    }
}
