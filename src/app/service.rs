//! Application service, the hexagonal core.
//!
//! [`MonitorService`] owns the [`Link`] and the [`Monitor`] and wires the
//! former's event bus into the latter.  UI adapters talk to it through
//! [`AppCommand`]s and receive [`DisplayEvent`](super::events::DisplayEvent)s
//! through a [`DisplaySink`].
//!
//! ```text
//!  Transport ──▶ ┌──────────────────────────┐ ──▶ DisplaySink
//!                │      MonitorService       │
//!  AppCommand ──▶│  Link ─▶ Monitor (alarm)  │
//!                └──────────────────────────┘
//! ```
//!
//! Everything runs on one thread.  The monitor sits behind
//! `Rc<RefCell<_>>` because the link's subscriber closure needs it; no
//! borrow is ever held across an `.await`.

use core::cell::{Ref, RefCell};
use std::rc::Rc;

use log::{info, warn};

use crate::config::MonitorConfig;
use crate::error::{ConfigError, Result};
use crate::events::SubscriptionId;
use crate::link::{ConnectionState, Link};
use crate::monitor::Monitor;

use super::commands::AppCommand;
use super::ports::{DisplaySink, Transport};

// ───────────────────────────────────────────────────────────────
// MonitorService
// ───────────────────────────────────────────────────────────────

pub struct MonitorService<T: Transport> {
    link: Link<T>,
    monitor: Rc<RefCell<Monitor>>,
}

impl<T: Transport> MonitorService<T> {
    /// Validate `config`, then build the link and monitor and connect the
    /// two.  The link starts `Disconnected`.
    pub fn new(transport: T, config: MonitorConfig) -> core::result::Result<Self, ConfigError> {
        let link = Link::new(transport, config.device_filter.clone());
        let monitor = Rc::new(RefCell::new(Monitor::new(config)?));

        let m = Rc::clone(&monitor);
        link.subscribe(move |event| m.borrow_mut().handle_link_event(event));

        info!(
            "MonitorService ready (device filter '{}')",
            monitor.borrow().config().device_filter.name
        );
        Ok(Self { link, monitor })
    }

    // ── Wiring ────────────────────────────────────────────────

    /// Route every display event to `sink`.
    pub fn attach_sink(&self, mut sink: impl DisplaySink + 'static) -> SubscriptionId {
        self.monitor
            .borrow_mut()
            .subscribe(move |event| sink.on_event(event))
    }

    pub fn detach_sink(&self, id: SubscriptionId) -> bool {
        self.monitor.borrow_mut().unsubscribe(id)
    }

    // ── Command handling ──────────────────────────────────────

    /// Interpret one UI command.
    pub async fn handle_command(&self, cmd: AppCommand) -> Result<()> {
        match cmd {
            AppCommand::ToggleConnection => match self.link.state() {
                ConnectionState::Disconnected => self.link.connect().await?,
                ConnectionState::Connecting | ConnectionState::Connected => {
                    self.link.disconnect().await;
                }
            },
            AppCommand::Connect => self.link.connect().await?,
            AppCommand::Disconnect => self.link.disconnect().await,
            AppCommand::Device(command) => {
                self.link.send_command(command).await?;
                self.monitor.borrow_mut().note_command_sent(command);
            }
            AppCommand::Clear => self.monitor.borrow_mut().reset(),
            AppCommand::SetWindow(capacity) => self.monitor.borrow_mut().set_capacity(capacity)?,
            AppCommand::SetYAxis(mode) => self.monitor.borrow_mut().set_y_axis(mode)?,
            AppCommand::SetPaused(paused) => self.monitor.borrow_mut().set_paused(paused),
            AppCommand::SetAlarmEnabled(enabled) => {
                self.monitor.borrow_mut().set_alarm_enabled(enabled);
            }
            AppCommand::SetAlarmThreshold(threshold) => {
                self.monitor.borrow_mut().set_alarm_threshold(threshold)?;
            }
        }
        Ok(())
    }

    /// [`handle_command`](Self::handle_command), logging instead of
    /// returning failures.  For fire-and-forget UI callbacks.
    pub async fn dispatch(&self, cmd: AppCommand) {
        let label = format!("{cmd:?}");
        if let Err(e) = self.handle_command(cmd).await {
            warn!("Command {label} failed: {e}");
        }
    }

    // ── Inbound processing ────────────────────────────────────

    /// Drain pending transport events and refresh the chart.  Returns the
    /// number of transport events handled.
    pub fn pump(&self) -> usize {
        let handled = self.link.pump();
        self.monitor.borrow_mut().refresh_display();
        handled
    }

    /// Wait for one transport event, process it, refresh the chart.
    pub async fn process_next(&self) {
        self.link.process_next().await;
        self.monitor.borrow_mut().refresh_display();
    }

    /// Process inbound events forever.
    pub async fn run(&self) {
        loop {
            self.process_next().await;
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    /// Read access to the monitor.  Drop the guard before awaiting.
    pub fn monitor(&self) -> Ref<'_, Monitor> {
        self.monitor.borrow()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.link.state()
    }
}
