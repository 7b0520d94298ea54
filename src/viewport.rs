//! Pan/zoom state of the map view and the gesture → transform mapping.
//!
//! Screen coordinates relate to world (map unit) coordinates by
//! `screen = world * scale + pan`. After every gesture the pan is clamped so the map
//! cannot be dragged off-screen.

use log::{debug, warn};

use crate::{MapConfig, PlanarPoint};

/// Zoom level and pan offset of the map view.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    scale: f64,
    pan_x: f64,
    pan_y: f64,
    view_width: f64,
    view_height: f64,
    map_width: f64,
    map_height: f64,
    min_scale: f64,
    max_scale: f64,
}

impl Viewport {
    /// Viewport of `width` × `height` screen pixels, at scale 1 with the map centred.
    ///
    /// Invalid scale limits (non-positive, NaN or inverted) fall back to the defaults.
    /// A non-finite or negative screen size is treated as zero until [`Viewport::resize`].
    pub fn new(config: &MapConfig, width: f64, height: f64) -> Self {
        let (width, height) = if valid_size(width, height) {
            (width, height)
        } else {
            warn!("Invalid view size {}x{}, using 0x0", width, height);
            (0.0, 0.0)
        };

        let (min_scale, max_scale) =
            if config.min_scale > 0.0 && config.min_scale <= config.max_scale {
                (config.min_scale, config.max_scale)
            } else {
                let defaults = MapConfig::default();
                warn!(
                    "Invalid scale limits {}..{}, using {}..{}",
                    config.min_scale, config.max_scale, defaults.min_scale, defaults.max_scale
                );
                (defaults.min_scale, defaults.max_scale)
            };

        let mut viewport = Self {
            scale: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            view_width: width,
            view_height: height,
            map_width: config.map_width,
            map_height: config.map_height,
            min_scale,
            max_scale,
        };
        viewport.reset();
        viewport
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Pan offset in screen pixels.
    pub fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    pub fn size(&self) -> (f64, f64) {
        (self.view_width, self.view_height)
    }

    /// Update the screen size (rotation, split screen) and re-clamp.
    pub fn resize(&mut self, width: f64, height: f64) {
        if !valid_size(width, height) {
            return;
        }
        self.view_width = width;
        self.view_height = height;
        self.clamp_pan();
    }

    /// Zoom by `factor` around the screen focal point `(focal_x, focal_y)`.
    ///
    /// The world point under the focal point stays put unless the scale limits or the
    /// pan clamp intervene. Non-positive, non-finite or unit factors are ignored.
    pub fn pinch(&mut self, factor: f64, focal_x: f64, focal_y: f64) {
        if !(factor.is_finite() && factor > 0.0) || factor == 1.0 {
            return;
        }
        if !(focal_x.is_finite() && focal_y.is_finite()) {
            return;
        }

        let old_scale = self.scale;
        let new_scale = (old_scale * factor).clamp(self.min_scale, self.max_scale);
        if new_scale == old_scale {
            return;
        }
        // Only move the pan by the zoom actually applied after clamping
        let effective = new_scale / old_scale;

        self.scale = new_scale;
        self.pan_x = focal_x - (focal_x - self.pan_x) * effective;
        self.pan_y = focal_y - (focal_y - self.pan_y) * effective;
        self.clamp_pan();
    }

    /// Pan by a screen-space delta.
    pub fn drag(&mut self, dx: f64, dy: f64) {
        if !(dx.is_finite() && dy.is_finite()) || (dx == 0.0 && dy == 0.0) {
            return;
        }
        self.pan_x += dx;
        self.pan_y += dy;
        self.clamp_pan();
    }

    /// Double tap: back to scale 1 with the map centred.
    pub fn double_tap(&mut self) {
        self.reset();
        debug!("Viewport reset by double tap");
    }

    pub fn reset(&mut self) {
        self.scale = 1.0_f64.clamp(self.min_scale, self.max_scale);
        self.pan_x = (self.view_width - self.map_width * self.scale) / 2.0;
        self.pan_y = (self.view_height - self.map_height * self.scale) / 2.0;
        self.clamp_pan();
    }

    /// Keep the map on screen.
    ///
    /// Per axis: when the scaled map is larger than the view, pan is limited to
    /// `[view - map * scale, 0]` so no gap opens at either edge; otherwise the map is
    /// centred on that axis.
    pub fn clamp_pan(&mut self) {
        self.pan_x = clamp_axis(self.pan_x, self.view_width, self.map_width * self.scale);
        self.pan_y = clamp_axis(self.pan_y, self.view_height, self.map_height * self.scale);
    }

    /// Centre the view on a world position, keeping the current scale.
    pub fn center_on(&mut self, world: &PlanarPoint) {
        if !(world.x.is_finite() && world.y.is_finite()) {
            return;
        }
        self.pan_x = self.view_width / 2.0 - world.x * self.scale;
        self.pan_y = self.view_height / 2.0 - world.y * self.scale;
        self.clamp_pan();
    }

    pub fn screen_to_world(&self, screen_x: f64, screen_y: f64) -> PlanarPoint {
        PlanarPoint::new(
            (screen_x - self.pan_x) / self.scale,
            (screen_y - self.pan_y) / self.scale,
        )
    }

    pub fn world_to_screen(&self, world: &PlanarPoint) -> (f64, f64) {
        (world.x * self.scale + self.pan_x, world.y * self.scale + self.pan_y)
    }

    /// World rectangle currently on screen as `(min, max)` corners.
    pub fn visible_world(&self) -> (PlanarPoint, PlanarPoint) {
        (
            self.screen_to_world(0.0, 0.0),
            self.screen_to_world(self.view_width, self.view_height),
        )
    }
}

fn valid_size(width: f64, height: f64) -> bool {
    width.is_finite() && height.is_finite() && width >= 0.0 && height >= 0.0
}

fn clamp_axis(pan: f64, view: f64, content: f64) -> f64 {
    if content <= view {
        (view - content) / 2.0
    } else {
        pan.clamp(view - content, 0.0)
    }
}
