use super::*;
use crate::presenter::{ClientPresence, PresenceFlag, StatusEntry, StatusSurface, SurfaceError};
use shared::{
    domain::{SensorKind, NOT_STARTED},
    protocol::ReplyAddress,
};
use std::time::Duration;
use step_engine::sources::ManualSensorHub;
use tokio::time::timeout;

#[derive(Default)]
struct RecordingSurface {
    titles: Mutex<Vec<String>>,
    cancelled: AtomicBool,
}

impl StatusSurface for RecordingSurface {
    fn post(&self, entry: &StatusEntry) -> Result<(), SurfaceError> {
        self.titles.lock().expect("titles").push(entry.title.clone());
        Ok(())
    }

    fn cancel(&self, _id: u32) -> Result<(), SurfaceError> {
        self.cancelled.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn start_host(hub: &ManualSensorHub) -> (Arc<ServiceHost>, Arc<RecordingSurface>) {
    let settings = ServiceSettings::default();
    let surface = Arc::new(RecordingSurface::default());
    let presenter = NotificationPresenter::new(
        &settings,
        Arc::clone(&surface) as Arc<dyn StatusSurface>,
        Arc::new(PresenceFlag::default()) as Arc<dyn ClientPresence>,
    );
    (ServiceHost::start(hub, presenter, &settings), surface)
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

async fn round_trip(connection: &mut Connection) -> Envelope {
    let (poll, reply_to) = Envelope::poll();
    assert!(connection.outbound.send(&poll));
    let frame = timeout(Duration::from_secs(1), connection.inbound.recv())
        .await
        .expect("reply in time")
        .expect("reply frame");
    let reply = Envelope::decode(&frame).expect("decode");
    match &reply {
        Envelope::Reply { in_reply_to, .. } => assert_eq!(*in_reply_to, reply_to),
        other => panic!("expected reply, got {other:?}"),
    }
    reply
}

fn reply_count(reply: &Envelope) -> i64 {
    match reply {
        Envelope::Reply { count, .. } => *count,
        other => panic!("expected reply, got {other:?}"),
    }
}

#[tokio::test]
async fn poll_before_any_event_answers_not_started() {
    let hub = ManualSensorHub::new([SensorKind::StepCounter]);
    let (host, _surface) = start_host(&hub);
    let mut connection = host.accept().expect("connect");

    assert_eq!(reply_count(&round_trip(&mut connection).await), NOT_STARTED);
}

#[tokio::test]
async fn poll_reads_the_live_counter_value() {
    let hub = ManualSensorHub::new([SensorKind::StepCounter]);
    let (host, _surface) = start_host(&hub);
    let mut connection = host.accept().expect("connect");

    hub.emit(SensorKind::StepCounter, 42.0);
    settle().await;
    assert_eq!(reply_count(&round_trip(&mut connection).await), 42);
}

#[tokio::test]
async fn unsupported_device_always_answers_not_started() {
    let hub = ManualSensorHub::empty();
    let (host, _surface) = start_host(&hub);
    assert!(!host.is_supported());
    let mut connection = host.accept().expect("connect");

    for _ in 0..3 {
        assert_eq!(reply_count(&round_trip(&mut connection).await), NOT_STARTED);
    }
}

#[tokio::test]
async fn status_update_renders_without_reply() {
    let hub = ManualSensorHub::new([SensorKind::StepDetector]);
    let (host, surface) = start_host(&hub);
    let mut connection = host.accept().expect("connect");

    assert!(connection.outbound.send(&Envelope::StatusUpdate {
        text: "43".to_string()
    }));
    // Anything queued after the update is answered in order, so the next
    // frame back must be the reply to this poll.
    let reply = round_trip(&mut connection).await;
    assert_eq!(reply_count(&reply), NOT_STARTED);

    assert_eq!(host.presenter().title(), "Today's steps: 43");
    let titles = surface.titles.lock().expect("titles");
    assert_eq!(titles.last().map(String::as_str), Some("Today's steps: 43"));
}

#[tokio::test]
async fn unknown_and_malformed_frames_are_ignored() {
    let hub = ManualSensorHub::new([SensorKind::StepCounter]);
    let (host, _surface) = start_host(&hub);
    let mut connection = host.accept().expect("connect");

    assert!(connection.outbound.send(&Envelope::Unknown));
    assert!(connection.outbound.send(&Envelope::Reply {
        in_reply_to: ReplyAddress::fresh(),
        count: 9,
    }));

    assert_eq!(reply_count(&round_trip(&mut connection).await), NOT_STARTED);
    assert!(connection.inbound.try_recv().is_err());
}

#[tokio::test]
async fn only_one_live_connection_at_a_time() {
    let hub = ManualSensorHub::new([SensorKind::StepCounter]);
    let (host, _surface) = start_host(&hub);

    let first = host.accept().expect("first");
    assert!(host.has_live_connection());
    assert!(matches!(
        host.accept(),
        Err(ChannelError::AlreadyConnected)
    ));

    drop(first);
    assert!(!host.has_live_connection());
    host.accept().expect("reconnect");
}

#[tokio::test]
async fn reconnect_resumes_the_same_session() {
    let hub = ManualSensorHub::new([SensorKind::StepDetector]);
    let (host, _surface) = start_host(&hub);

    let mut first = host.accept().expect("first");
    hub.emit(SensorKind::StepDetector, 1.0);
    hub.emit(SensorKind::StepDetector, 1.0);
    settle().await;
    assert_eq!(reply_count(&round_trip(&mut first).await), 2);
    drop(first);

    hub.emit(SensorKind::StepDetector, 1.0);
    settle().await;
    let mut second = host.connect().await.expect("second");
    assert_eq!(reply_count(&round_trip(&mut second).await), 3);
}

#[tokio::test]
async fn reset_engine_starts_a_new_session() {
    let hub = ManualSensorHub::new([SensorKind::StepCounter]);
    let (host, _surface) = start_host(&hub);
    hub.emit(SensorKind::StepCounter, 10.0);
    settle().await;
    assert_eq!(host.snapshot().count, 10);

    host.reset_engine(&hub).await;
    assert_eq!(host.mode(), SensorMode::Counter);
    assert_eq!(host.snapshot(), StepSnapshot::default());
}

#[tokio::test]
async fn reset_after_shutdown_does_not_restart_sensing() {
    let hub = ManualSensorHub::new([SensorKind::StepCounter]);
    let (host, _surface) = start_host(&hub);
    hub.emit(SensorKind::StepCounter, 10.0);
    settle().await;

    host.shutdown().await;
    host.reset_engine(&hub).await;
    assert_eq!(host.snapshot().count, 10);

    hub.emit(SensorKind::StepCounter, 20.0);
    settle().await;
    assert_eq!(host.snapshot().count, 10);
    assert!(host.snapshot().started);
}

#[tokio::test]
async fn shutdown_hides_status_and_refuses_connections() {
    let hub = ManualSensorHub::new([SensorKind::StepCounter]);
    let (host, surface) = start_host(&hub);
    let connection = host.accept().expect("connect");

    host.shutdown().await;
    assert!(surface.cancelled.load(Ordering::SeqCst));
    assert!(matches!(host.accept(), Err(ChannelError::Closed)));

    settle().await;
    assert!(connection.outbound.is_closed());
}
