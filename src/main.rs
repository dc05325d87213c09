//! MakeSense monitor host demo.
//!
//! Runs the full client against the simulated transport:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  producer thread ──▶ Inbox ──▶ MonitorService ──▶ LogDisplay │
//! │  (synthetic µA)                (Link · Monitor)     Sink     │
//! │                                      ▲                       │
//! │                  main task ──AppCommand┘                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `makesense-monitor [config.json]`.  Log level via `RUST_LOG`.
#![deny(unused_must_use)]

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{info, warn};

use makesense::adapters::log_sink::LogDisplaySink;
use makesense::adapters::sim::SimTransport;
use makesense::app::commands::AppCommand;
use makesense::app::events::LinkEvent;
use makesense::app::service::MonitorService;
use makesense::config::MonitorConfig;
use makesense::error::Error;
use makesense::events::Inbox;
use makesense::link::ConnectionState;
use makesense::protocol::Command;

/// Synthetic readings emitted before the simulated device powers off.
const DEMO_SAMPLES: u32 = 60;
const DEMO_INTERVAL: Duration = Duration::from_millis(50);

fn load_config() -> Result<MonitorConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            let config = MonitorConfig::from_json(&text)
                .map_err(Error::from)
                .with_context(|| format!("loading config file {path}"))?;
            info!("Config loaded from {path}");
            Ok(config)
        }
        None => {
            info!("No config file given, using defaults");
            Ok(MonitorConfig::default())
        }
    }
}

/// Device side of the demo: a slow sine around 0.6 µA with a zero
/// calibration at the start, then an unannounced power-off.
fn spawn_producer(inbox: Inbox) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let send = |text: &str| {
            if let Err(e) = inbox.push_notification(text.as_bytes()) {
                warn!("producer: {e}");
            }
        };

        send("正在调零...");
        thread::sleep(DEMO_INTERVAL * 4);
        send("调零完成");
        send("设备就绪");

        for i in 0..DEMO_SAMPLES {
            let value = 0.6 + 0.45 * (f64::from(i) * 0.25).sin();
            send(&format!("{value:.3}"));
            thread::sleep(DEMO_INTERVAL);
        }

        info!("producer: simulated device powering off");
        inbox.push_link_lost();
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("MakeSense monitor v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let transport = SimTransport::new(&config.device_filter.name);
    let service = MonitorService::new(transport, config).map_err(Error::from)?;
    service.attach_sink(LogDisplaySink::new());

    // Resolves once the link drops back to Disconnected after connecting.
    let session_over = Rc::new(Signal::<CriticalSectionRawMutex, ()>::new());
    {
        let session_over = Rc::clone(&session_over);
        let mut was_connected = false;
        service.link().subscribe(move |event| {
            if let LinkEvent::ConnectionChanged { state, .. } = event {
                match state {
                    ConnectionState::Connected => was_connected = true,
                    ConnectionState::Disconnected if was_connected => session_over.signal(()),
                    _ => {}
                }
            }
        });
    }

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
    executor.spawn(service.run()).detach();

    let producer = futures_lite::future::block_on(executor.run(async {
        service.handle_command(AppCommand::Connect).await?;

        let inbox = service
            .link()
            .transport()
            .notification_inbox()
            .context("simulated transport has no subscriber after connect")?;
        let producer = spawn_producer(inbox);

        service.handle_command(AppCommand::SetAlarmThreshold(0.9)).await?;
        service.handle_command(AppCommand::SetAlarmEnabled(true)).await?;
        service
            .handle_command(AppCommand::Device(Command::TriggerZero))
            .await?;

        session_over.wait().await;
        anyhow::Ok(producer)
    }))?;

    if producer.join().is_err() {
        warn!("producer thread panicked");
    }

    let monitor = service.monitor();
    let stats = monitor.stats();
    info!(
        "SUMMARY | retained={} exported={} stats={}",
        monitor.history().len(),
        monitor.export().len(),
        serde_json::to_string(&stats).context("serialising stats")?
    );
    if let Some((lo, hi)) = monitor.y_bounds() {
        info!("SUMMARY | y_range=[{lo:.3}, {hi:.3}] uA");
    }
    Ok(())
}
