//! Inbound event queue and outbound event bus.
//!
//! Transport callbacks (GATT notifications, link loss) may fire on any
//! thread.  They only ever push into the [`Inbox`]; the client drains it on
//! its single stream of control, so link and monitor state is never mutated
//! concurrently.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐     ┌───────────┐
//! │ GATT notify │────▶│              │     │              │     │           │
//! │ Link loss   │────▶│    Inbox     │────▶│     Link     │────▶│ EventBus  │──▶ subscribers
//! │ (any thread)│     │ (unbounded)  │     │  (consumer)  │     │ (ordered) │
//! └─────────────┘     └──────────────┘     └──────────────┘     └───────────┘
//! ```

use core::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::debug;

use crate::protocol::MAX_PAYLOAD;

/// Events the channel holds before further arrivals spill to the heap.
pub const INBOX_DEPTH: usize = 64;

/// Raw notification bytes, bounded by the ATT MTU ceiling.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD>;

// ───────────────────────────────────────────────────────────────
// Inbox
// ───────────────────────────────────────────────────────────────

/// Something the transport reported outside of a request/response call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A status-channel notification arrived.
    Notification(Payload),
    /// The device went away (power loss, out of range).  `session` is the
    /// connect attempt the reporting inbox was issued to; `None` applies
    /// to whatever session is current.
    LinkLost { session: Option<u64> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxError {
    /// Payload exceeds [`MAX_PAYLOAD`]; it was not queued.
    PayloadTooLarge(usize),
}

impl core::fmt::Display for InboxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PayloadTooLarge(n) => {
                write!(f, "payload of {n} bytes exceeds {MAX_PAYLOAD}")
            }
        }
    }
}

struct InboxShared {
    channel: Channel<CriticalSectionRawMutex, TransportEvent, INBOX_DEPTH>,
    /// Arrivals that found the channel full, oldest first.  While it is
    /// non-empty every new event lands here too, so the channel only ever
    /// holds events older than the spill.
    spill: Mutex<CriticalSectionRawMutex, RefCell<VecDeque<TransportEvent>>>,
}

/// Cloneable producer/consumer handle onto the inbound queue.
///
/// Producers (transport callbacks) may live on other threads.  There must
/// be exactly one consumer: the [`Link`](crate::link::Link) that created it.
/// Nothing pushed is ever dropped.
#[derive(Clone)]
pub struct Inbox {
    shared: Arc<InboxShared>,
    session: Option<u64>,
}

impl Inbox {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(InboxShared {
                channel: Channel::new(),
                spill: Mutex::new(RefCell::new(VecDeque::new())),
            }),
            session: None,
        }
    }

    /// A handle onto the same queue whose link-loss reports are scoped to
    /// connect attempt `session`.
    pub fn for_session(&self, session: u64) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            session: Some(session),
        }
    }

    /// Queue a notification payload.
    pub fn push_notification(&self, payload: &[u8]) -> Result<(), InboxError> {
        let bytes = Payload::from_slice(payload)
            .map_err(|()| InboxError::PayloadTooLarge(payload.len()))?;
        self.push(TransportEvent::Notification(bytes));
        Ok(())
    }

    /// Report an unsolicited link loss.
    pub fn push_link_lost(&self) {
        self.push(TransportEvent::LinkLost {
            session: self.session,
        });
    }

    /// Pop the next event, oldest first.
    pub fn try_pop(&self) -> Option<TransportEvent> {
        self.shared.spill.lock(|spill| {
            self.shared
                .channel
                .try_receive()
                .ok()
                .or_else(|| spill.borrow_mut().pop_front())
        })
    }

    /// Wait for the next event.
    pub async fn receive(&self) -> TransportEvent {
        if let Some(ev) = self.try_pop() {
            return ev;
        }
        self.shared.channel.receive().await
    }

    /// Discard everything pending.
    pub fn clear(&self) {
        self.shared.spill.lock(|spill| {
            self.shared.channel.clear();
            spill.borrow_mut().clear();
        });
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.shared
            .spill
            .lock(|spill| self.shared.channel.len() + spill.borrow().len())
    }

    fn push(&self, ev: TransportEvent) {
        self.shared.spill.lock(|spill| {
            let mut spill = spill.borrow_mut();
            if !spill.is_empty() {
                spill.push_back(ev);
                return;
            }
            if let Err(TrySendError::Full(ev)) = self.shared.channel.try_send(ev) {
                debug!("Inbox: channel full, spilling");
                spill.push_back(ev);
            }
        });
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// EventBus
// ───────────────────────────────────────────────────────────────

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

type Handler<E> = Box<dyn FnMut(&E)>;

/// Typed, synchronous publish/subscribe.
///
/// Every subscriber sees every event in publish order.  Handlers must not
/// subscribe to or publish on the same bus re-entrantly.
pub struct EventBus<E> {
    handlers: Vec<(SubscriptionId, Handler<E>)>,
    next_id: u32,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _)| *sid != id);
        self.handlers.len() != before
    }

    /// Deliver `event` to every subscriber, in registration order.
    pub fn publish(&mut self, event: &E) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────
