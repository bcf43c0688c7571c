// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use photo_capture::constants::{photo, timing};

#[test]
fn test_settle_delay_is_half_a_second() {
    assert_eq!(timing::SETTLE_DELAY_MS, 500);
}

#[test]
fn test_format_wait_outlasts_settle_delay() {
    // Waiting for a notification should never give up before the fallback delay
    assert!(timing::FORMAT_WAIT_TIMEOUT_MS >= timing::SETTLE_DELAY_MS);
}

#[test]
fn test_jpeg_quality_in_range() {
    assert!((1..=100).contains(&photo::DEFAULT_JPEG_QUALITY));
}
