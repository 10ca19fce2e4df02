// tests/capture_input.rs
#![cfg(unix)]

mod common;
use crate::common::*;

use std::error::Error;

use capture::capture::WRITE_CHUNK_SIZE;
use capture::{CaptureEvent, ExitStatus};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn input_is_echoed_back_by_filter() -> TestResult {
    init_tracing();

    let mut capture = shell_capture("cat");
    capture.set_input("hello\n");
    let mut rx = capture.subscribe();
    capture.execute();

    let events = collect_run(&mut rx).await;
    assert_eq!(
        events,
        vec![
            CaptureEvent::Begin,
            CaptureEvent::StdoutLine("hello".into()),
            CaptureEvent::End(ExitStatus::Exited(0)),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn large_input_arrives_byte_for_byte() -> TestResult {
    init_tracing();

    // Several chunks' worth of distinct lines.
    let lines: Vec<String> = (0..20_000).map(|i| format!("row-{i:05}")).collect();
    let payload = lines.join("\n") + "\n";
    assert!(payload.len() > 4 * WRITE_CHUNK_SIZE);

    let mut capture = shell_capture("cat");
    capture.set_input(payload.clone());
    let mut rx = capture.subscribe();
    capture.execute();

    let events = collect_run(&mut rx).await;
    assert_well_ordered(&events);
    assert_eq!(stdout_lines(&events), lines);
    Ok(())
}

#[tokio::test]
async fn stdin_is_closed_once_payload_is_written() -> TestResult {
    init_tracing();

    // `wc -c` only prints after it sees EOF on stdin.
    let payload = "x".repeat(3 * WRITE_CHUNK_SIZE + 17);
    let mut capture = shell_capture("wc -c");
    capture.set_input(payload.clone());
    let mut rx = capture.subscribe();
    capture.execute();

    let events = collect_run(&mut rx).await;
    let out = stdout_lines(&events);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].trim(), payload.len().to_string());
    assert_eq!(end_status(&events), Some(ExitStatus::Exited(0)));
    Ok(())
}

#[tokio::test]
async fn multibyte_input_is_utf8_encoded() -> TestResult {
    init_tracing();

    let mut capture = shell_capture("cat");
    capture.set_input("grüße 世界\n");
    let mut rx = capture.subscribe();
    capture.execute();

    let events = collect_run(&mut rx).await;
    assert_eq!(stdout_lines(&events), vec!["grüße 世界"]);
    Ok(())
}

#[tokio::test]
async fn child_ignoring_stdin_does_not_break_the_run() -> TestResult {
    init_tracing();

    // The child exits without reading; the writer hits a broken pipe,
    // closes stdin and the run ends normally.
    let mut capture = shell_capture("echo done");
    capture.set_input("y".repeat(50 * WRITE_CHUNK_SIZE));
    let mut rx = capture.subscribe();
    capture.execute();

    let events = collect_run(&mut rx).await;
    assert_well_ordered(&events);
    assert_eq!(stdout_lines(&events), vec!["done"]);
    assert!(stderr_lines(&events).is_empty());
    assert_eq!(end_status(&events), Some(ExitStatus::Exited(0)));
    Ok(())
}
