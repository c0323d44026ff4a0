use super::*;

#[tokio::test]
async fn frames_flow_both_ways() {
    let (mut connection, mut service_end, _lease) = pipe(4);

    let (poll, reply_to) = Envelope::poll();
    assert!(connection.outbound.send(&poll));
    let frame = service_end.inbound.recv().await.expect("frame");
    assert_eq!(Envelope::decode(&frame).expect("decode"), poll);

    let reply = Envelope::Reply {
        in_reply_to: reply_to,
        count: 7,
    };
    assert!(send_frame(&service_end.outbound, &reply));
    let frame = connection.inbound.recv().await.expect("frame");
    assert_eq!(Envelope::decode(&frame).expect("decode"), reply);
}

#[test]
fn lease_dies_with_outbound() {
    let (connection, _service_end, lease) = pipe(1);
    assert!(lease.upgrade().is_some());
    drop(connection);
    assert!(lease.upgrade().is_none());
}

#[test]
fn sends_to_a_dropped_service_are_swallowed() {
    let (connection, service_end, _lease) = pipe(1);
    drop(service_end);
    assert!(connection.outbound.is_closed());
    assert!(!connection.outbound.send(&Envelope::StatusUpdate {
        text: "1".to_string()
    }));
}

#[test]
fn full_pipe_drops_instead_of_blocking() {
    let (connection, _service_end, _lease) = pipe(1);
    let update = Envelope::StatusUpdate {
        text: "1".to_string(),
    };
    assert!(connection.outbound.send(&update));
    assert!(!connection.outbound.send(&update));
}
