// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! - [`camera`]: device resolution, session management and the hardware
//!   backends (synthetic, V4L2/GStreamer)

pub mod camera;
