// SPDX-License-Identifier: GPL-3.0-only

//! Preview surface attachment
//!
//! The preview is a layer bound to a session and inserted at the bottom of
//! the target surface so that controls drawn above it stay visible.

use super::types::Dimensions;
use uuid::Uuid;

/// Axis-aligned rectangle in surface points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Live camera preview bound to one session
///
/// Frames aspect-fill the layer, cropping whatever overhangs its bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewLayer {
    session_id: Uuid,
    frame: Rect,
}

impl PreviewLayer {
    /// Preview for `session_id` filling `bounds`
    pub fn new(session_id: Uuid, bounds: Rect) -> Self {
        Self {
            session_id,
            frame: bounds,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }
}

/// Something drawn on a display surface
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Preview(PreviewLayer),
    /// Any other UI content (buttons, overlays)
    Overlay { name: String, frame: Rect },
}

/// Target the preview is attached to
pub trait DisplaySurface {
    /// Bounds the preview should fill
    fn bounds(&self) -> Rect;

    /// Insert a layer; index 0 is the bottom-most
    fn insert_layer(&mut self, index: usize, layer: Layer);

    /// Drop the preview layers of a session
    fn remove_preview(&mut self, session_id: Uuid);
}

/// Plain bottom-to-top layer stack
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    bounds: Rect,
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            layers: Vec::new(),
        }
    }

    /// Surface with no on-screen presence, for command-line capture
    pub fn headless(size: Dimensions) -> Self {
        Self::new(Rect::new(0.0, 0.0, size.width as f32, size.height as f32))
    }

    pub fn push_overlay(&mut self, name: &str, frame: Rect) {
        self.layers.push(Layer::Overlay {
            name: name.to_string(),
            frame,
        });
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Bottom-most preview layer, if any
    pub fn preview_layer(&self) -> Option<&PreviewLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Preview(preview) => Some(preview),
            Layer::Overlay { .. } => None,
        })
    }
}

impl DisplaySurface for LayerStack {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn insert_layer(&mut self, index: usize, layer: Layer) {
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
    }

    fn remove_preview(&mut self, session_id: Uuid) {
        self.layers.retain(|layer| match layer {
            Layer::Preview(preview) => preview.session_id() != session_id,
            Layer::Overlay { .. } => true,
        });
    }
}
