// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Session timing
pub mod timing {
    use std::time::Duration;

    /// Fallback wait for the active format to settle after start
    pub const SETTLE_DELAY_MS: u64 = 500;

    /// Upper bound when a backend can notify that its format is available
    pub const FORMAT_WAIT_TIMEOUT_MS: u64 = 2_000;

    /// How long GStreamer gets to reach PLAYING
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// How long a still capture may wait for a frame from the pipeline
    pub const CAPTURE_PULL_TIMEOUT: Duration = Duration::from_secs(3);
}

/// Photo output defaults
pub mod photo {
    /// JPEG quality used when encoding captured frames (0-100)
    pub const DEFAULT_JPEG_QUALITY: u8 = 92;

    /// Directory name under the user's pictures folder
    pub const PHOTO_SUBDIR: &str = "photo-capture";

    /// Filename prefix for saved photos
    pub const PHOTO_PREFIX: &str = "photo";
}

/// Thread and queue names
pub mod threads {
    /// Serial queue that runs start/stop and format configuration
    pub const SESSION_QUEUE: &str = "capture-session-queue";

    /// Thread delivering synthetic capture completions
    pub const SYNTHETIC_CALLBACK: &str = "synthetic-photo-callback";

    /// Thread delivering V4L2 capture completions
    pub const V4L2_CALLBACK: &str = "v4l2-photo-callback";
}

/// Configuration file location
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "photo-capture";

    /// Config file name
    pub const FILE_NAME: &str = "config.json";
}
