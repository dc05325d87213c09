//! Port traits: the hexagonal boundary between the client core and the
//! wireless stack.
//!
//! ```text
//!   BLE stack ──▶ Transport port ──▶ Link ──▶ Monitor ──▶ DisplaySink port ──▶ UI
//! ```
//!
//! A platform adapter (WebBluetooth bridge, BlueZ, the simulator in
//! [`adapters::sim`](crate::adapters::sim)) implements [`Transport`].  The
//! [`Link`](crate::link::Link) consumes it via generics, so the state
//! machine never touches a radio directly.
//!
//! Methods take `&self`: the link drives the transport from a
//! single-threaded executor and may run a `disconnect` while a `connect`
//! is suspended, so implementations keep their own state in cells.

use super::events::DisplayEvent;
use crate::config::DeviceFilter;
use crate::error::TransportError;
use crate::events::Inbox;
use crate::protocol::ChannelId;

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain ↔ radio)
// ───────────────────────────────────────────────────────────────

/// A device picked by the chooser and connected at the GATT level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered<H> {
    pub handle: H,
    /// Advertised name, when the platform exposes it.
    pub name: Option<String>,
}

/// Characteristics resolved on the primary service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    /// Notify characteristic carrying readings and status text.
    pub status: ChannelId,
    /// Write characteristic accepting single-byte commands.
    pub command: ChannelId,
    /// Optional raw ADC stream; older firmware does not expose it.
    pub raw_data: Option<ChannelId>,
}

/// Abstract BLE link to one device.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Platform connection handle.
    type Handle: Clone;

    /// Run device discovery with `filter` and open a GATT connection.
    async fn discover_and_connect(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Discovered<Self::Handle>, TransportError>;

    /// Resolve the primary service and its characteristics.
    async fn resolve_channels(&self, handle: &Self::Handle) -> Result<Channels, TransportError>;

    /// Start notifications on `channel`; every payload is pushed into `inbox`.
    async fn subscribe(&self, channel: ChannelId, inbox: Inbox) -> Result<(), TransportError>;

    /// Write one command byte to `channel`.
    async fn write_command(&self, channel: ChannelId, byte: u8) -> Result<(), TransportError>;

    /// Close the GATT connection.  Idempotent.
    async fn teardown(&self, handle: &Self::Handle);

    /// Arrange for [`Inbox::push_link_lost`] to be called if the device
    /// drops the connection on its own.
    fn on_unsolicited_disconnect(&self, handle: &Self::Handle, inbox: Inbox);
}

// ───────────────────────────────────────────────────────────────
// Display sink port (driven adapter: domain → UI)
// ───────────────────────────────────────────────────────────────

/// Consumer of display events: a chart widget, a console logger, a test
/// recorder.
pub trait DisplaySink {
    fn on_event(&mut self, event: &DisplayEvent);
}
