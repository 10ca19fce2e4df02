//! Helpers for draining a `Capture` subscription in tests.

use std::time::Duration;

use capture::{CaptureEvent, ExitStatus};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::with_timeout;

/// Receive events up to and including `End`.
///
/// Panics if the subscription closes first or nothing ends within 5 seconds.
pub async fn collect_run(rx: &mut UnboundedReceiver<CaptureEvent>) -> Vec<CaptureEvent> {
    with_timeout(async {
        let mut events = Vec::new();
        loop {
            let event = rx.recv().await.expect("subscription closed before End");
            let done = event.is_end();
            events.push(event);
            if done {
                return events;
            }
        }
    })
    .await
}

/// Receive whatever arrives within `window`, without requiring `End`.
pub async fn collect_for(
    rx: &mut UnboundedReceiver<CaptureEvent>,
    window: Duration,
) -> Vec<CaptureEvent> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + window;
    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        events.push(event);
    }
    events
}

/// Wait until a specific stdout line shows up, returning everything seen.
pub async fn wait_for_stdout(
    rx: &mut UnboundedReceiver<CaptureEvent>,
    line: &str,
) -> Vec<CaptureEvent> {
    with_timeout(async {
        let mut events = Vec::new();
        loop {
            let event = rx.recv().await.expect("subscription closed while waiting");
            let hit = matches!(&event, CaptureEvent::StdoutLine(l) if l == line);
            events.push(event);
            if hit {
                return events;
            }
        }
    })
    .await
}

pub fn stdout_lines(events: &[CaptureEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            CaptureEvent::StdoutLine(l) => Some(l.clone()),
            _ => None,
        })
        .collect()
}

pub fn stderr_lines(events: &[CaptureEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            CaptureEvent::StderrLine(l) => Some(l.clone()),
            _ => None,
        })
        .collect()
}

/// Exit status carried by the `End` event, if any.
pub fn end_status(events: &[CaptureEvent]) -> Option<ExitStatus> {
    events.iter().find_map(|e| match e {
        CaptureEvent::End(status) => Some(*status),
        _ => None,
    })
}

/// Assert the ordering every run must obey: `Begin` first, `End` last and
/// exactly once.
pub fn assert_well_ordered(events: &[CaptureEvent]) {
    assert_eq!(events.first(), Some(&CaptureEvent::Begin), "events: {events:?}");
    assert!(events.last().is_some_and(CaptureEvent::is_end), "events: {events:?}");
    assert_eq!(
        events.iter().filter(|e| e.is_end()).count(),
        1,
        "End must fire exactly once: {events:?}"
    );
    assert_eq!(
        events.iter().filter(|e| **e == CaptureEvent::Begin).count(),
        1,
        "Begin must fire exactly once: {events:?}"
    );
}
