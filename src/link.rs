//! Link state machine: connection lifecycle and notification dispatch.
//!
//! ```text
//!                connect()                 channels resolved,
//!  DISCONNECTED ───────────▶ CONNECTING ───notifications on──▶ CONNECTED
//!       ▲                        │                                 │
//!       │   any step fails /     │                                 │
//!       ├──── disconnect() ──────┘                                 │
//!       │                                                          │
//!       └────────── disconnect() / link lost ──────────────────────┘
//! ```
//!
//! The link owns the [`Transport`] and the [`Inbox`] the transport pushes
//! into.  Inbound events are consumed by [`Link::pump`] or
//! [`Link::run`], decoded, and re-published on the link's
//! [`EventBus`] tagged with their arrival order.
//!
//! All methods take `&self` so a `disconnect()` can run while a
//! `connect()` is suspended on transport I/O.  Every connect attempt
//! carries an epoch; a disconnect (or link loss) bumps it, and a connect
//! that resumes with a stale epoch throws its result away.

use core::cell::{Cell, RefCell};

use log::{debug, info, warn};

use crate::app::events::LinkEvent;
use crate::app::ports::{Channels, Transport};
use crate::config::DeviceFilter;
use crate::error::{LinkError, TransportError};
use crate::events::{EventBus, Inbox, SubscriptionId, TransportEvent};
use crate::protocol::{decode_notification, format_uuid, Command};

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl core::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// An established GATT session.
struct Session<H> {
    handle: H,
    channels: Channels,
    device_name: Option<String>,
}

enum EstablishError {
    Superseded,
    Transport(TransportError),
}

/// The link state machine.
pub struct Link<T: Transport> {
    transport: T,
    filter: DeviceFilter,
    inbox: Inbox,
    state: Cell<ConnectionState>,
    session: RefCell<Option<Session<T::Handle>>>,
    /// Bumped by every connect attempt, disconnect and link loss.
    epoch: Cell<u64>,
    /// Attempt whose notifications are enabled.  Set before `subscribe`
    /// is awaited, since the first payload may beat its return.
    subscribed_epoch: Cell<Option<u64>>,
    /// Arrival order of the next decoded notification.
    next_seq: Cell<u64>,
    bus: RefCell<EventBus<LinkEvent>>,
}

impl<T: Transport> Link<T> {
    pub fn new(transport: T, filter: DeviceFilter) -> Self {
        Self {
            transport,
            filter,
            inbox: Inbox::new(),
            state: Cell::new(ConnectionState::Disconnected),
            session: RefCell::new(None),
            epoch: Cell::new(0),
            subscribed_epoch: Cell::new(None),
            next_seq: Cell::new(0),
            bus: RefCell::new(EventBus::new()),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state.get() == ConnectionState::Connected
    }

    /// Name of the connected device, if any.
    pub fn device_name(&self) -> Option<String> {
        self.session
            .borrow()
            .as_ref()
            .and_then(|s| s.device_name.clone())
    }

    /// Resolved characteristics of the current session.
    pub fn channels(&self) -> Option<Channels> {
        self.session.borrow().as_ref().map(|s| s.channels)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Producer handle onto the link's inbound queue.
    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }

    // ── Subscribers ───────────────────────────────────────────

    /// Register a handler for link events.  Handlers run synchronously on
    /// the link's stream of control and must not subscribe re-entrantly.
    pub fn subscribe(&self, handler: impl FnMut(&LinkEvent) + 'static) -> SubscriptionId {
        self.bus.borrow_mut().subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.borrow_mut().unsubscribe(id)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Discover, connect, resolve channels and subscribe to notifications.
    ///
    /// Only valid from `Disconnected`.  On failure the link is back in
    /// `Disconnected`, an error event has been published, and the call may
    /// simply be retried.
    pub async fn connect(&self) -> Result<(), LinkError> {
        if self.state.get() != ConnectionState::Disconnected {
            warn!("Link: connect rejected while {}", self.state.get());
            return Err(LinkError::Busy);
        }

        let epoch = self.bump_epoch();
        self.inbox.clear();
        self.set_state(ConnectionState::Connecting, None);
        info!("Link: connecting to '{}'", self.filter.name);

        match self.establish(epoch).await {
            Ok(session) => {
                let name = session.device_name.clone();
                *self.session.borrow_mut() = Some(session);
                info!(
                    "Link: connected to {}",
                    name.as_deref().unwrap_or("<unnamed device>")
                );
                self.set_state(ConnectionState::Connected, name);
                Ok(())
            }
            Err(EstablishError::Superseded) => {
                info!("Link: connect superseded, result discarded");
                Err(LinkError::Superseded)
            }
            Err(EstablishError::Transport(e)) => {
                warn!("Link: connect failed: {e}");
                self.publish(LinkEvent::Error {
                    message: e.to_string(),
                });
                self.set_state(ConnectionState::Disconnected, None);
                Err(LinkError::Transport(e))
            }
        }
    }

    /// Tear down the link from any state.  Supersedes an in-flight
    /// `connect()`.  No event is published if already disconnected.
    pub async fn disconnect(&self) {
        let prev = self.state.get();
        self.bump_epoch();
        let session = self.session.borrow_mut().take();
        self.set_state(ConnectionState::Disconnected, None);

        match session {
            Some(s) => {
                info!("Link: disconnecting");
                self.transport.teardown(&s.handle).await;
            }
            None if prev == ConnectionState::Disconnected => {
                debug!("Link: disconnect while already disconnected");
            }
            None => {}
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Write one command byte.  Rejected synchronously, with no event, when
    /// the link is not `Connected`.
    pub async fn send_command(&self, cmd: Command) -> Result<(), LinkError> {
        let channel = match self.state.get() {
            ConnectionState::Connected => self
                .session
                .borrow()
                .as_ref()
                .map(|s| s.channels.command)
                .ok_or(LinkError::NotConnected)?,
            ConnectionState::Connecting => return Err(LinkError::Busy),
            ConnectionState::Disconnected => return Err(LinkError::NotConnected),
        };

        debug!("Link: writing command {:?} (0x{:02x})", cmd, cmd.code());
        match self.transport.write_command(channel, cmd.code()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Link: command {:?} failed: {e}", cmd);
                self.publish(LinkEvent::Error {
                    message: e.to_string(),
                });
                Err(LinkError::Transport(e))
            }
        }
    }

    pub async fn trigger_zero(&self) -> Result<(), LinkError> {
        self.send_command(Command::TriggerZero).await
    }

    pub async fn stop_sampling(&self) -> Result<(), LinkError> {
        self.send_command(Command::StopSampling).await
    }

    pub async fn start_sampling(&self) -> Result<(), LinkError> {
        self.send_command(Command::StartSampling).await
    }

    // ── Inbound dispatch ──────────────────────────────────────

    /// Process everything currently queued in the inbox.  Returns the
    /// number of transport events handled.
    pub fn pump(&self) -> usize {
        let mut handled = 0;
        while let Some(ev) = self.inbox.try_pop() {
            self.handle_transport_event(ev);
            handled += 1;
        }
        handled
    }

    /// Wait for the next inbound transport event and process it.
    pub async fn process_next(&self) {
        let ev = self.inbox.receive().await;
        self.handle_transport_event(ev);
    }

    /// Process inbound events forever.
    pub async fn run(&self) {
        loop {
            self.process_next().await;
        }
    }

    /// Apply one inbound transport event.
    pub fn handle_transport_event(&self, ev: TransportEvent) {
        match ev {
            TransportEvent::Notification(payload) => {
                if !self.accepts_notifications() {
                    debug!(
                        "Link: dropping notification received while {}",
                        self.state.get()
                    );
                    return;
                }
                let event = decode_notification(&payload);
                let seq = self.next_seq.get();
                self.next_seq.set(seq + 1);
                debug!("Link: notification #{seq}: {event:?}");
                self.publish(LinkEvent::Telemetry { seq, event });
            }
            TransportEvent::LinkLost { session } => self.handle_link_lost(session),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    async fn establish(&self, epoch: u64) -> Result<Session<T::Handle>, EstablishError> {
        let discovered = self
            .transport
            .discover_and_connect(&self.filter)
            .await
            .map_err(|e| self.fail_unless_superseded(epoch, e))?;
        let handle = discovered.handle;
        let session_inbox = self.inbox.for_session(epoch);

        if self.is_stale(epoch) {
            self.transport.teardown(&handle).await;
            return Err(EstablishError::Superseded);
        }
        self.transport
            .on_unsolicited_disconnect(&handle, session_inbox.clone());

        let channels = match self.transport.resolve_channels(&handle).await {
            Ok(c) => c,
            Err(e) => {
                self.transport.teardown(&handle).await;
                return Err(self.fail_unless_superseded(epoch, e));
            }
        };
        if self.is_stale(epoch) {
            self.transport.teardown(&handle).await;
            return Err(EstablishError::Superseded);
        }
        match channels.raw_data {
            Some(id) => debug!("Link: raw-data channel {}", format_uuid(id)),
            None => info!("Link: raw-data channel not available"),
        }

        self.subscribed_epoch.set(Some(epoch));
        if let Err(e) = self.transport.subscribe(channels.status, session_inbox).await {
            self.transport.teardown(&handle).await;
            return Err(self.fail_unless_superseded(epoch, e));
        }
        if self.is_stale(epoch) {
            self.transport.teardown(&handle).await;
            return Err(EstablishError::Superseded);
        }

        Ok(Session {
            handle,
            channels,
            device_name: discovered.name,
        })
    }

    fn fail_unless_superseded(&self, epoch: u64, e: TransportError) -> EstablishError {
        if self.is_stale(epoch) {
            debug!("Link: discarding failure of superseded connect: {e}");
            EstablishError::Superseded
        } else {
            EstablishError::Transport(e)
        }
    }

    /// Notifications are decoded once connected, and while connecting as
    /// soon as the current attempt has enabled them.
    fn accepts_notifications(&self) -> bool {
        match self.state.get() {
            ConnectionState::Connected => true,
            ConnectionState::Connecting => {
                self.subscribed_epoch.get() == Some(self.epoch.get())
            }
            ConnectionState::Disconnected => false,
        }
    }

    fn handle_link_lost(&self, session: Option<u64>) {
        if self.state.get() == ConnectionState::Disconnected {
            debug!("Link: link-lost while already disconnected");
            return;
        }
        if let Some(s) = session.filter(|&s| self.is_stale(s)) {
            debug!("Link: ignoring link-lost from superseded attempt {s}");
            return;
        }
        warn!("Link: device disconnected unexpectedly");
        self.bump_epoch();
        self.session.borrow_mut().take();
        self.set_state(ConnectionState::Disconnected, None);
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.epoch.get() != epoch
    }

    fn bump_epoch(&self) -> u64 {
        let next = self.epoch.get().wrapping_add(1);
        self.epoch.set(next);
        next
    }

    /// Move to `next`, publishing the transition.  No-op if unchanged.
    fn set_state(&self, next: ConnectionState, device_name: Option<String>) {
        let prev = self.state.get();
        if prev == next {
            return;
        }
        info!("Link transition: {prev} -> {next}");
        self.state.set(next);
        self.publish(LinkEvent::ConnectionChanged {
            state: next,
            device_name,
        });
    }

    fn publish(&self, event: LinkEvent) {
        self.bus.borrow_mut().publish(&event);
    }
}

// ── Tests ────────────────────────────────────────────────────
