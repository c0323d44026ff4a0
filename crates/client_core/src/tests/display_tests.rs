use super::*;
use std::sync::{Arc, Mutex};

#[test]
fn reply_counts_are_offset_by_one() {
    assert_eq!(to_display_value(42), 43);
    assert_eq!(to_display_value(0), 1);
    assert_eq!(to_display_value(NOT_STARTED), NOT_STARTED);
    assert_eq!(to_display_value(i64::MAX), i64::MAX);
}

#[test]
fn labels_and_status_text() {
    assert_eq!(status_text(43), "43");
    assert_eq!(status_text(NOT_STARTED), "-1");
    assert_eq!(display_label(43), "Step is: 43");
}

#[test]
fn publish_updates_value_then_runs_subscribers() {
    let display = Arc::new(DisplayState::default());
    assert_eq!(display.get(), 0);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_subscriber = Arc::clone(&seen);
    // Weak so the subscriber does not keep the display alive.
    let observed = Arc::downgrade(&display);
    display.subscribe(move |value| {
        let current = observed.upgrade().map(|display| display.get());
        seen_by_subscriber
            .lock()
            .expect("seen")
            .push((value, current));
    });

    display.publish(5);
    display.publish(5);
    display.publish(9);
    assert_eq!(
        *seen.lock().expect("seen"),
        vec![(5, Some(5)), (5, Some(5)), (9, Some(9))]
    );
}

#[test]
fn subscribing_does_not_fire() {
    let display = DisplayState::new(3);
    let fired = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&fired);
    display.subscribe(move |_| *flag.lock().expect("flag") = true);
    assert!(!*fired.lock().expect("flag"));
}

#[tokio::test]
async fn watchers_see_the_latest_value() {
    let display = DisplayState::default();
    let mut rx = display.watch();
    display.publish(12);
    rx.changed().await.expect("changed");
    assert_eq!(*rx.borrow(), 12);
}
