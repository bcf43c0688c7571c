// SPDX-License-Identifier: GPL-3.0-only

//! Photo output settings negotiation
//!
//! Each capture request gets freshly built settings. The capability tier is
//! evaluated per request because the active format may change between
//! requests.

use crate::backends::camera::CameraBackend;
use crate::backends::camera::session::PhotoOutput;
use crate::backends::camera::types::{CapabilityTier, PhotoCaptureSettings};
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds capture settings from the state of a photo output's device
#[derive(Clone)]
pub struct PhotoOutputNegotiator {
    backend: Arc<dyn CameraBackend>,
}

impl PhotoOutputNegotiator {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self { backend }
    }

    /// Settings for one capture on `output` under `tier`
    ///
    /// Modern tier requests the connected device's active format dimensions.
    /// Legacy tier, or a modern tier without a readable format, falls back to
    /// the high-resolution flag.
    pub fn build_capture_settings(
        &self,
        output: &PhotoOutput,
        tier: CapabilityTier,
    ) -> PhotoCaptureSettings {
        if !tier.supports_explicit_dimensions() {
            debug!(tier = %tier, "Requesting high-resolution photo");
            return PhotoCaptureSettings::high_resolution();
        }

        let Some(input) = output.connected_input() else {
            warn!(
                output = %output.id(),
                "Photo output has no connected input, using high-resolution flag"
            );
            return PhotoCaptureSettings::high_resolution();
        };

        match self.backend.active_format(&input.device) {
            Ok(format) => {
                debug!(
                    device = %input.device.name,
                    format = %format,
                    "Requesting active format dimensions"
                );
                PhotoCaptureSettings::with_max_dimensions(format.dimensions())
            }
            Err(e) => {
                warn!(
                    device = %input.device.name,
                    error = %e,
                    "Active format unavailable, using high-resolution flag"
                );
                PhotoCaptureSettings::high_resolution()
            }
        }
    }

    /// Tier for the output's device, unless `pinned`
    pub fn capability_tier(
        &self,
        output: &PhotoOutput,
        pinned: Option<CapabilityTier>,
    ) -> CapabilityTier {
        if let Some(tier) = pinned {
            return tier;
        }
        match output.connected_input() {
            Some(input) => self.backend.capability_tier(&input.device),
            None => CapabilityTier::Legacy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::SyntheticBackend;
    use crate::backends::camera::session::{CaptureSession, SessionPreset};
    use crate::backends::camera::types::Dimensions;

    fn connected_output(backend: &SyntheticBackend) -> PhotoOutput {
        let device = backend.default_device().unwrap();
        let mut session = CaptureSession::new(SessionPreset::Photo);
        session.add_input(backend.open_input(&device).unwrap()).unwrap();
        session.add_output(PhotoOutput::new()).unwrap();
        session.output().unwrap().clone()
    }

    #[test]
    fn modern_tier_uses_active_format_dimensions() {
        let backend = Arc::new(SyntheticBackend::new().with_active_format(4032, 3024));
        let negotiator = PhotoOutputNegotiator::new(backend.clone());
        let output = connected_output(&backend);

        let settings = negotiator.build_capture_settings(&output, CapabilityTier::Modern);
        assert_eq!(settings.max_dimensions, Some(Dimensions::new(4032, 3024)));
        assert!(!settings.high_resolution_enabled);
    }

    #[test]
    fn legacy_tier_sets_high_resolution_flag_only() {
        let backend = Arc::new(SyntheticBackend::new().with_active_format(4032, 3024));
        let negotiator = PhotoOutputNegotiator::new(backend.clone());
        let output = connected_output(&backend);

        let settings = negotiator.build_capture_settings(&output, CapabilityTier::Legacy);
        assert!(settings.high_resolution_enabled);
        assert_eq!(settings.max_dimensions, None);
    }

    #[test]
    fn format_changes_are_picked_up_per_request() {
        let backend = Arc::new(SyntheticBackend::new().with_active_format(1920, 1080));
        let negotiator = PhotoOutputNegotiator::new(backend.clone());
        let output = connected_output(&backend);

        let first = negotiator.build_capture_settings(&output, CapabilityTier::Modern);
        backend.set_active_format(3840, 2160);
        let second = negotiator.build_capture_settings(&output, CapabilityTier::Modern);

        assert_eq!(first.max_dimensions, Some(Dimensions::new(1920, 1080)));
        assert_eq!(second.max_dimensions, Some(Dimensions::new(3840, 2160)));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn unconnected_output_falls_back_to_flag() {
        let negotiator = PhotoOutputNegotiator::new(Arc::new(SyntheticBackend::new()));
        let settings =
            negotiator.build_capture_settings(&PhotoOutput::new(), CapabilityTier::Modern);
        assert!(settings.high_resolution_enabled);
    }

    #[test]
    fn pinned_tier_overrides_backend() {
        let backend =
            Arc::new(SyntheticBackend::new().with_capability_tier(CapabilityTier::Modern));
        let negotiator = PhotoOutputNegotiator::new(backend.clone());
        let output = connected_output(&backend);

        assert_eq!(
            negotiator.capability_tier(&output, None),
            CapabilityTier::Modern
        );
        assert_eq!(
            negotiator.capability_tier(&output, Some(CapabilityTier::Legacy)),
            CapabilityTier::Legacy
        );
    }
}
