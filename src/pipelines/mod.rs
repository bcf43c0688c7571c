// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines
//!
//! - [`photo`]: settings negotiation, single-shot capture and decoding

pub mod photo;
