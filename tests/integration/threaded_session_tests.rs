//! Cross-thread delivery: a producer thread stands in for the BLE stack's
//! callback thread while the service runs on an `edge-executor` local
//! executor, the way the host binary drives it.

use std::rc::Rc;
use std::thread;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future::block_on;

use makesense::adapters::sim::SimTransport;
use makesense::app::commands::AppCommand;
use makesense::app::events::LinkEvent;
use makesense::app::service::MonitorService;
use makesense::config::MonitorConfig;
use makesense::events::Inbox;
use makesense::link::ConnectionState;

use crate::mock_display::RecordingSink;

fn spawn_producer(inbox: Inbox, count: u32) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for i in 0..count {
            let text = format!("{:.3}", f64::from(i) / 100.0);
            inbox.push_notification(text.as_bytes()).unwrap();
            if i == count / 2 {
                inbox.push_notification(b"Zeroing").unwrap();
            }
        }
        inbox.push_link_lost();
    })
}

#[test]
fn producer_thread_feeds_executor_driven_service() {
    const COUNT: u32 = 200;

    let service =
        MonitorService::new(SimTransport::new("MakeSense"), MonitorConfig::default()).unwrap();
    let sink = RecordingSink::new();
    service.attach_sink(sink.clone());

    let done = Rc::new(Signal::<CriticalSectionRawMutex, ()>::new());
    let d = Rc::clone(&done);
    service.link().subscribe(move |event| {
        if let LinkEvent::ConnectionChanged {
            state: ConnectionState::Disconnected,
            ..
        } = event
        {
            d.signal(());
        }
    });

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
    executor.spawn(service.run()).detach();

    let producer = block_on(executor.run(async {
        service.handle_command(AppCommand::Connect).await.unwrap();
        let inbox = service.link().transport().notification_inbox().unwrap();
        let producer = spawn_producer(inbox, COUNT);
        done.wait().await;
        producer
    }));
    producer.join().unwrap();

    let expected: Vec<f64> = (0..COUNT).map(|i| f64::from(i) / 100.0).collect();
    // The window holds 120; the display saw every reading in order.
    assert_eq!(sink.readings(), expected);
    assert_eq!(sink.status_messages(), vec!["Zeroing".to_owned()]);
    assert_eq!(service.monitor().stats().count, u64::from(COUNT));
    assert_eq!(service.monitor().history().len(), 120);
    assert_eq!(service.connection_state(), ConnectionState::Disconnected);
}
