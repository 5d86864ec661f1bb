// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use familiar_core::{Event, EventKind, FakeClock, Forge};

fn event(kind: EventKind, mr: u64) -> Event {
    Event {
        kind,
        forge: Forge::GitHub,
        repo_owner: "acme".into(),
        repo_name: "widgets".into(),
        clone_url: "https://github.com/acme/widgets.git".into(),
        mr_number: mr,
        mr_title: String::new(),
        mr_description: String::new(),
        source_branch: "feature".into(),
        target_branch: "main".into(),
        comment: None,
        actor: "alice".into(),
        received_at: chrono::Utc::now(),
        raw_payload: Vec::new(),
    }
}

#[test]
fn collapses_burst_within_window() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(Duration::from_secs(10), clock.clone());
    let e = event(EventKind::MrUpdated, 7);

    assert!(debouncer.should_process(&e));
    clock.advance(Duration::from_secs(1));
    assert!(!debouncer.should_process(&e));
    clock.advance(Duration::from_secs(1));
    assert!(!debouncer.should_process(&e));
}

#[test]
fn accepts_again_after_window() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(Duration::from_secs(10), clock.clone());
    let e = event(EventKind::MrUpdated, 7);

    assert!(debouncer.should_process(&e));
    clock.advance(Duration::from_secs(11));
    assert!(debouncer.should_process(&e));
}

#[test]
fn suppressed_event_does_not_extend_window() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(Duration::from_secs(10), clock.clone());
    let e = event(EventKind::MrComment, 3);

    assert!(debouncer.should_process(&e));
    clock.advance(Duration::from_secs(9));
    // suppressed, but must not refresh the timestamp
    assert!(!debouncer.should_process(&e));
    clock.advance(Duration::from_secs(2));
    assert!(debouncer.should_process(&e));
}

#[test]
fn distinct_keys_do_not_interfere() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(Duration::from_secs(10), clock.clone());

    assert!(debouncer.should_process(&event(EventKind::MrOpened, 1)));
    assert!(debouncer.should_process(&event(EventKind::MrOpened, 2)));
    assert!(debouncer.should_process(&event(EventKind::MrComment, 1)));
}

#[test]
fn sweep_drops_entries_past_twice_the_window() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(Duration::from_secs(10), clock.clone());

    assert!(debouncer.should_process(&event(EventKind::MrOpened, 1)));
    clock.advance(Duration::from_secs(15));
    assert!(debouncer.should_process(&event(EventKind::MrOpened, 2)));

    clock.advance(Duration::from_secs(6));
    debouncer.sweep();
    // first entry is 21s old (> 20s horizon), second is 6s old
    assert_eq!(debouncer.tracked(), 1);
}
