#![allow(dead_code)]

pub use capture_test_utils::init_tracing;
pub use capture_test_utils::recorder::{
    assert_well_ordered, collect_for, collect_run, end_status, stderr_lines, stdout_lines,
    wait_for_stdout,
};

use capture::{Capture, CaptureFlags};

/// A capture running `script` through `sh -c`, both streams captured.
pub fn shell_capture(script: &str) -> Capture {
    let mut capture = Capture::new(script);
    capture.set_flags(CaptureFlags::BOTH | CaptureFlags::NEEDS_SHELL);
    capture
}
