// SPDX-License-Identifier: GPL-3.0-only

//! Photo Capture - camera session setup and single-shot photo capture
//!
//! This library provides the capture core behind a camera UI: picking the
//! camera, running a photo session with a live preview, negotiating capture
//! settings per device capability and delivering each photo exactly once.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera hardware abstraction, device resolution and session management
//! - [`pipelines`]: Photo settings negotiation, capture coordination and decoding
//! - [`service`]: The [`CameraService`] facade used by front ends
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```no_run
//! use photo_capture::backends::camera::preview::LayerStack;
//! use photo_capture::backends::camera::Dimensions;
//! use photo_capture::{CameraService, CameraServiceImpl, Config};
//!
//! let service = CameraServiceImpl::from_config(&Config::load())?;
//! service.setup_stream(&mut LayerStack::headless(Dimensions::new(1280, 720)))?;
//! service.capture_photo(Box::new(|result| match result {
//!     Ok(photo) => println!("captured {}", photo.dimensions()),
//!     Err(e) => eprintln!("{}", e),
//! }));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult, CameraError, CameraResult};
pub use pipelines::photo::CapturedImage;
pub use service::{CameraService, CameraServiceImpl};
