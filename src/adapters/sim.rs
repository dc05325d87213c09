//! Simulated transport.
//!
//! Stands in for a BLE stack on the host: the demo binary and the test
//! suites drive the whole client through it.  Notifications are injected
//! with [`SimTransport::emit_text`] (same thread) or by pushing into the
//! inbox returned from [`SimTransport::notification_inbox`] (producer
//! thread).  Connect steps can be made to fail, and a connect can be held
//! open with [`SimTransport::hold_connect`] or
//! [`SimTransport::hold_subscribe`] to exercise cancellation and early
//! notifications.

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, info};

use crate::app::ports::{Channels, Discovered, Transport};
use crate::config::DeviceFilter;
use crate::error::TransportError;
use crate::events::Inbox;
use crate::protocol::{ChannelId, CHAR_COMMAND, CHAR_RAW_DATA, CHAR_STATUS, SERVICE_UUID};

/// Connect step at which a scripted failure is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStep {
    Discover,
    Resolve,
    Subscribe,
}

pub type SimHandle = u32;

type GateSignal = Signal<CriticalSectionRawMutex, ()>;

/// Releases a connect held by [`SimTransport::hold_connect`].
pub struct SimGate(Rc<GateSignal>);

impl SimGate {
    pub fn release(&self) {
        self.0.signal(());
    }
}

pub struct SimTransport {
    device_name: String,
    fail_at: Cell<Option<ConnectStep>>,
    fail_writes: Cell<bool>,
    raw_data_available: Cell<bool>,
    gate: RefCell<Option<Rc<GateSignal>>>,
    subscribe_gate: RefCell<Option<Rc<GateSignal>>>,

    next_handle: Cell<SimHandle>,
    live: Cell<Option<SimHandle>>,
    /// Where status notifications go while subscribed.
    subscribed: RefCell<Option<Inbox>>,
    /// Where an unsolicited disconnect is reported.
    watcher: RefCell<Option<Inbox>>,

    writes: RefCell<Vec<(ChannelId, u8)>>,
    teardowns: Cell<u32>,
}

impl SimTransport {
    /// A simulated device advertising `device_name`.
    pub fn new(device_name: &str) -> Self {
        Self {
            device_name: device_name.to_owned(),
            fail_at: Cell::new(None),
            fail_writes: Cell::new(false),
            raw_data_available: Cell::new(true),
            gate: RefCell::new(None),
            subscribe_gate: RefCell::new(None),
            next_handle: Cell::new(1),
            live: Cell::new(None),
            subscribed: RefCell::new(None),
            watcher: RefCell::new(None),
            writes: RefCell::new(Vec::new()),
            teardowns: Cell::new(0),
        }
    }

    // ── Scripting ─────────────────────────────────────────────

    /// Fail every connect at `step` until reset with `None`.
    pub fn fail_at(&self, step: Option<ConnectStep>) {
        self.fail_at.set(step);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Emulate older firmware without the raw-data characteristic.
    pub fn set_raw_data_available(&self, available: bool) {
        self.raw_data_available.set(available);
    }

    /// Suspend the next discovery until the returned gate is released.
    pub fn hold_connect(&self) -> SimGate {
        let signal = Rc::new(GateSignal::new());
        *self.gate.borrow_mut() = Some(Rc::clone(&signal));
        SimGate(signal)
    }

    /// Suspend the next subscribe after notifications are enabled, so the
    /// device can talk before the call returns.
    pub fn hold_subscribe(&self) -> SimGate {
        let signal = Rc::new(GateSignal::new());
        *self.subscribe_gate.borrow_mut() = Some(Rc::clone(&signal));
        SimGate(signal)
    }

    // ── Device side ───────────────────────────────────────────

    /// Deliver a raw notification.  Returns `false` when nothing is
    /// subscribed or the inbox refused it.
    pub fn emit_notification(&self, payload: &[u8]) -> bool {
        match self.subscribed.borrow().as_ref() {
            Some(inbox) => inbox.push_notification(payload).is_ok(),
            None => {
                debug!("Sim: notification with no subscriber dropped");
                false
            }
        }
    }

    pub fn emit_text(&self, text: &str) -> bool {
        self.emit_notification(text.as_bytes())
    }

    /// Format a reading the way the firmware does.
    pub fn emit_reading(&self, value: f64) -> bool {
        self.emit_text(&format!("{value:.3}"))
    }

    /// The subscribed inbox, for feeding notifications from another thread.
    pub fn notification_inbox(&self) -> Option<Inbox> {
        self.subscribed.borrow().clone()
    }

    /// The device goes away on its own (power loss, out of range).
    pub fn drop_link(&self) {
        info!("Sim: device dropped the link");
        self.live.set(None);
        self.subscribed.borrow_mut().take();
        if let Some(watcher) = self.watcher.borrow_mut().take() {
            watcher.push_link_lost();
        }
    }

    // ── Inspection ────────────────────────────────────────────

    /// Command bytes written so far, with their target characteristic.
    pub fn writes(&self) -> Vec<(ChannelId, u8)> {
        self.writes.borrow().clone()
    }

    pub fn teardown_count(&self) -> u32 {
        self.teardowns.get()
    }

    pub fn is_connected(&self) -> bool {
        self.live.get().is_some()
    }

    fn check_live(&self, handle: SimHandle) -> Result<(), TransportError> {
        if self.live.get() == Some(handle) {
            Ok(())
        } else {
            Err(TransportError::LinkLost)
        }
    }
}

impl Transport for SimTransport {
    type Handle = SimHandle;

    async fn discover_and_connect(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Discovered<SimHandle>, TransportError> {
        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            gate.wait().await;
        }

        if self.fail_at.get() == Some(ConnectStep::Discover) {
            return Err(TransportError::ConnectFailed);
        }
        if filter.name != self.device_name || filter.service != SERVICE_UUID {
            return Err(TransportError::DeviceNotFound);
        }

        let handle = self.next_handle.get();
        self.next_handle.set(handle.wrapping_add(1));
        self.live.set(Some(handle));
        debug!("Sim: GATT connected, handle {handle}");
        Ok(Discovered {
            handle,
            name: Some(self.device_name.clone()),
        })
    }

    async fn resolve_channels(&self, handle: &SimHandle) -> Result<Channels, TransportError> {
        self.check_live(*handle)?;
        if self.fail_at.get() == Some(ConnectStep::Resolve) {
            return Err(TransportError::ServiceNotFound);
        }
        Ok(Channels {
            status: CHAR_STATUS,
            command: CHAR_COMMAND,
            raw_data: self.raw_data_available.get().then_some(CHAR_RAW_DATA),
        })
    }

    async fn subscribe(&self, channel: ChannelId, inbox: Inbox) -> Result<(), TransportError> {
        if channel != CHAR_STATUS {
            return Err(TransportError::CharacteristicNotFound(channel));
        }
        if self.fail_at.get() == Some(ConnectStep::Subscribe) {
            return Err(TransportError::NotifyFailed);
        }
        *self.subscribed.borrow_mut() = Some(inbox);

        let gate = self.subscribe_gate.borrow_mut().take();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        Ok(())
    }

    async fn write_command(&self, channel: ChannelId, byte: u8) -> Result<(), TransportError> {
        if self.live.get().is_none() {
            return Err(TransportError::LinkLost);
        }
        if channel != CHAR_COMMAND {
            return Err(TransportError::CharacteristicNotFound(channel));
        }
        if self.fail_writes.get() {
            return Err(TransportError::WriteFailed);
        }
        self.writes.borrow_mut().push((channel, byte));
        Ok(())
    }

    async fn teardown(&self, handle: &SimHandle) {
        self.teardowns.set(self.teardowns.get() + 1);
        if self.live.get() == Some(*handle) {
            debug!("Sim: GATT disconnect, handle {handle}");
            self.live.set(None);
            self.subscribed.borrow_mut().take();
            self.watcher.borrow_mut().take();
        }
    }

    fn on_unsolicited_disconnect(&self, _handle: &SimHandle, inbox: Inbox) {
        *self.watcher.borrow_mut() = Some(inbox);
    }
}
