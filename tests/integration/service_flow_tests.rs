//! Integration tests for the Transport → Link → Monitor → DisplaySink
//! pipeline, driven through `MonitorService` commands.

use futures_lite::future::{block_on, yield_now, zip};

use makesense::adapters::sim::{ConnectStep, SimTransport};
use makesense::app::commands::AppCommand;
use makesense::app::events::DisplayEvent;
use makesense::app::service::MonitorService;
use makesense::config::MonitorConfig;
use makesense::error::{Error, LinkError, TransportError};
use makesense::link::ConnectionState;
use makesense::monitor::RunningStats;
use makesense::protocol::{Command, CHAR_COMMAND};

use crate::mock_display::RecordingSink;

fn make_service(config: MonitorConfig) -> (MonitorService<SimTransport>, RecordingSink) {
    let service = MonitorService::new(SimTransport::new("MakeSense"), config).unwrap();
    let sink = RecordingSink::new();
    service.attach_sink(sink.clone());
    (service, sink)
}

fn connected(config: MonitorConfig) -> (MonitorService<SimTransport>, RecordingSink) {
    let (service, sink) = make_service(config);
    block_on(service.handle_command(AppCommand::Connect)).unwrap();
    (service, sink)
}

fn alarm_config() -> MonitorConfig {
    MonitorConfig {
        alarm_enabled: true,
        alarm_threshold: 1.0,
        ..MonitorConfig::default()
    }
}

fn emit_all(service: &MonitorService<SimTransport>, texts: &[&str]) {
    for t in texts {
        assert!(service.link().transport().emit_text(t), "emit {t}");
    }
    service.pump();
}

// ── Connection lifecycle ─────────────────────────────────────

#[test]
fn connect_stream_disconnect() {
    let (service, sink) = connected(MonitorConfig::default());
    emit_all(&service, &["0.5", "Zeroing", "1.5"]);

    assert_eq!(sink.readings(), vec![0.5, 1.5]);
    assert_eq!(sink.status_messages(), vec!["Zeroing".to_owned()]);

    block_on(service.handle_command(AppCommand::Disconnect)).unwrap();
    assert_eq!(
        sink.connection_states(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected
        ]
    );
    assert_eq!(service.monitor().history().len(), 2, "history survives disconnect");
    assert_eq!(service.monitor().stats().count, 2);
}

#[test]
fn connected_event_carries_device_name() {
    let (_service, sink) = connected(MonitorConfig::default());
    assert!(sink.events().contains(&DisplayEvent::ConnectionChanged {
        state: ConnectionState::Connected,
        device_name: Some("MakeSense".into()),
    }));
}

#[test]
fn failed_connect_surfaces_error_and_can_retry() {
    let (service, sink) = make_service(MonitorConfig::default());
    service.link().transport().fail_at(Some(ConnectStep::Resolve));

    let res = block_on(service.handle_command(AppCommand::Connect));
    assert_eq!(res, Err(Error::Transport(TransportError::ServiceNotFound)));
    assert_eq!(sink.errors(), vec!["primary service not found".to_owned()]);
    assert_eq!(
        sink.connection_states(),
        vec![ConnectionState::Connecting, ConnectionState::Disconnected]
    );

    service.link().transport().fail_at(None);
    block_on(service.handle_command(AppCommand::Connect)).unwrap();
    assert_eq!(service.connection_state(), ConnectionState::Connected);
}

#[test]
fn toggle_while_connecting_cancels_the_attempt() {
    let (service, sink) = make_service(MonitorConfig::default());
    let gate = service.link().transport().hold_connect();

    let (first, second) = block_on(zip(
        service.handle_command(AppCommand::ToggleConnection),
        async {
            yield_now().await;
            let r = service.handle_command(AppCommand::ToggleConnection).await;
            gate.release();
            r
        },
    ));

    assert_eq!(first, Err(Error::Link(LinkError::Superseded)));
    assert_eq!(second, Ok(()));
    assert_eq!(service.connection_state(), ConnectionState::Disconnected);
    assert_eq!(
        sink.connection_states(),
        vec![ConnectionState::Connecting, ConnectionState::Disconnected]
    );
    assert!(sink.errors().is_empty());
    assert!(!service.link().transport().is_connected());
}

#[test]
fn link_loss_then_reconnect_keeps_streaming() {
    let (service, sink) = connected(MonitorConfig::default());
    emit_all(&service, &["0.1", "0.2"]);

    service.link().transport().drop_link();
    service.pump();
    assert_eq!(service.connection_state(), ConnectionState::Disconnected);

    block_on(service.handle_command(AppCommand::Connect)).unwrap();
    emit_all(&service, &["0.3"]);

    assert_eq!(sink.readings(), vec![0.1, 0.2, 0.3]);
    assert_eq!(service.monitor().stats().count, 3);
}

#[test]
fn notifications_while_disconnected_are_ignored() {
    let (service, sink) = connected(MonitorConfig::default());
    block_on(service.handle_command(AppCommand::Disconnect)).unwrap();

    service.link().inbox().push_notification(b"4.2").unwrap();
    service.pump();
    assert!(sink.readings().is_empty());
    assert_eq!(service.monitor().stats(), RunningStats::default());
}

// ── Commands ─────────────────────────────────────────────────

#[test]
fn zero_calibration_is_written_and_reported() {
    let (service, sink) = connected(MonitorConfig::default());
    block_on(service.handle_command(AppCommand::Device(Command::TriggerZero))).unwrap();

    assert_eq!(service.link().transport().writes(), vec![(CHAR_COMMAND, 0x01)]);
    assert_eq!(
        sink.events().last(),
        Some(&DisplayEvent::CommandSent(Command::TriggerZero))
    );
}

#[test]
fn command_rejected_when_disconnected_publishes_nothing() {
    let (service, sink) = make_service(MonitorConfig::default());
    let res = block_on(service.handle_command(AppCommand::Device(Command::StartSampling)));
    assert_eq!(res, Err(Error::Link(LinkError::NotConnected)));
    assert!(sink.events().is_empty());
    assert!(service.link().transport().writes().is_empty());
}

// ── Alarm ────────────────────────────────────────────────────

#[test]
fn alarm_is_edge_triggered() {
    let (service, sink) = connected(alarm_config());
    emit_all(&service, &["0.5", "1.5", "1.2", "0.9"]);
    assert_eq!(sink.alarm_changes(), vec![true, false]);
}

#[test]
fn alarm_threshold_equality_stays_clear() {
    let (service, sink) = connected(alarm_config());
    emit_all(&service, &["1.0", "1.000"]);
    assert!(sink.alarm_changes().is_empty());
}

#[test]
fn link_loss_clears_triggered_alarm_only() {
    let (service, sink) = connected(alarm_config());
    emit_all(&service, &["2.0"]);
    assert!(service.monitor().alarm_active());

    service.link().transport().drop_link();
    service.pump();

    assert_eq!(sink.alarm_changes(), vec![true, false]);
    assert!(!service.monitor().alarm_active());
    assert_eq!(service.monitor().history().len(), 1);
    assert_eq!(service.monitor().current_value(), Some(2.0));
}

#[test]
fn disabling_alarm_from_ui_clears_it() {
    let (service, sink) = connected(alarm_config());
    emit_all(&service, &["3.0"]);
    block_on(service.handle_command(AppCommand::SetAlarmEnabled(false))).unwrap();
    assert_eq!(sink.alarm_changes(), vec![true, false]);

    emit_all(&service, &["5.0"]);
    assert_eq!(sink.alarm_changes(), vec![true, false]);
}

#[test]
fn raised_threshold_applies_to_next_reading() {
    let (service, sink) = connected(alarm_config());
    block_on(service.handle_command(AppCommand::SetAlarmThreshold(2.0))).unwrap();
    emit_all(&service, &["1.5", "2.5"]);
    assert_eq!(sink.alarm_changes(), vec![true]);
}

// ── History, pause, reset ────────────────────────────────────

#[test]
fn pause_freezes_everything() {
    let (service, sink) = connected(MonitorConfig::default());
    emit_all(&service, &["0.1"]);
    block_on(service.handle_command(AppCommand::SetPaused(true))).unwrap();
    sink.clear();

    emit_all(&service, &["0.2", "0.3"]);
    assert!(sink.readings().is_empty());
    assert_eq!(sink.series_updates(), 0);
    assert_eq!(service.monitor().stats().count, 1);
    assert_eq!(service.monitor().current_value(), Some(0.1));

    block_on(service.handle_command(AppCommand::SetPaused(false))).unwrap();
    emit_all(&service, &["0.4"]);
    assert_eq!(sink.readings(), vec![0.4]);
}

#[test]
fn clear_resets_history_stats_and_display() {
    let (service, sink) = connected(alarm_config());
    emit_all(&service, &["0.5", "1.5"]);
    sink.clear();

    block_on(service.handle_command(AppCommand::Clear)).unwrap();
    let events = sink.events();
    assert_eq!(events.first(), Some(&DisplayEvent::Cleared));
    assert!(events.contains(&DisplayEvent::AlarmChanged(false)));
    assert!(events.contains(&DisplayEvent::StatsUpdated(RunningStats::default())));
    assert_eq!(
        events.last(),
        Some(&DisplayEvent::DisplaySeriesUpdated(Vec::new()))
    );

    assert!(service.monitor().history().is_empty());
    assert_eq!(service.monitor().current_value(), None);
    assert_eq!(service.connection_state(), ConnectionState::Connected);
}

#[test]
fn shrinking_window_keeps_newest() {
    let (service, sink) = connected(MonitorConfig::default());
    emit_all(&service, &["1", "2", "3", "4", "5"]);
    sink.clear();

    block_on(service.handle_command(AppCommand::SetWindow(3))).unwrap();
    let kept: Vec<f64> = service.monitor().history().iter().map(|s| s.value).collect();
    assert_eq!(kept, vec![3.0, 4.0, 5.0]);
    assert_eq!(service.monitor().stats().count, 5);
    assert_eq!(sink.series_updates(), 1);
}

#[test]
fn long_history_is_decimated_for_display_but_not_export() {
    let config = MonitorConfig {
        window_capacity: 300,
        ..MonitorConfig::default()
    };
    let (service, sink) = connected(config);
    for chunk in (0..250).collect::<Vec<u32>>().chunks(50) {
        for i in chunk {
            assert!(service.link().transport().emit_reading(f64::from(*i)));
        }
        service.pump();
    }

    let last_series = sink
        .events()
        .into_iter()
        .rev()
        .find_map(|e| match e {
            DisplayEvent::DisplaySeriesUpdated(points) => Some(points),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_series.len(), 84);
    assert_eq!(last_series[0].value, 0.0);
    assert_eq!(last_series[83].value, 249.0);

    let rows = service.monitor().export();
    assert_eq!(rows.len(), 250);
    assert!(rows.windows(2).all(|w| w[0].elapsed <= w[1].elapsed));
}

#[test]
fn invalid_settings_are_rejected_without_side_effects() {
    let (service, sink) = make_service(MonitorConfig::default());
    assert!(block_on(service.handle_command(AppCommand::SetWindow(0))).is_err());
    assert!(block_on(service.handle_command(AppCommand::SetAlarmThreshold(f64::NAN))).is_err());
    assert!(sink.events().is_empty());
    assert_eq!(*service.monitor().config(), MonitorConfig::default());
}
