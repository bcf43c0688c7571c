// SPDX-License-Identifier: GPL-3.0-only

//! Photo capture pipeline
//!
//! ```text
//! capture_photo ─▶ Negotiation ─▶ Backend capture ─▶ Decoding ─▶ on_complete
//!                 (per request)   (hardware thread)   (RGBA)     (exactly once)
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Negotiation**: build fresh capture settings for the capability tier
//! 2. **Capture**: submit to the backend on the session queue
//! 3. **Decoding**: turn the delivered file data into an RGBA bitmap
//! 4. **Completion**: hand exactly one result to the caller
//!
//! [`encoding`] covers the reverse direction for backends and saving.

pub mod capture;
pub mod decoding;
pub mod encoding;
pub mod negotiation;

pub use capture::{CaptureCompletion, CaptureCoordinator};
pub use decoding::{CapturedImage, decode_photo, resolve_delivery};
pub use encoding::{EncodingFormat, PhotoEncoder, encode_jpeg};
pub use negotiation::PhotoOutputNegotiator;
