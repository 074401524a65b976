//! Interactive mask editing.
//!
//! Starting a mask drops a rectangular overlay over the target which the
//! user moves and resizes like any other object. Committing turns the
//! overlay into the target's clip region; cancelling discards it.

use crate::document::{EditError, EditResult};
use crate::scene::Scene;
use crate::shapes::{ClipRegion, Rectangle, SerializableColor, Shape, ShapeId, ShapeMeta, ShapeStyle};

/// Tint used to draw the overlay while it is being edited.
const OVERLAY_COLOR: SerializableColor = SerializableColor {
    r: 64,
    g: 128,
    b: 255,
    a: 96,
};

/// An in-progress mask edit.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskSession {
    target: ShapeId,
    overlay: ShapeId,
    target_was_interactive: bool,
    /// Clip to the outside of the overlay instead of the inside.
    pub inverted: bool,
}

impl MaskSession {
    /// Put an overlay over `target` and freeze the target.
    pub fn start(scene: &mut Scene, target: ShapeId) -> EditResult<Self> {
        let shape = scene.get_mut(target).ok_or(EditError::ObjectNotFound(target))?;
        let bounds = shape.bounds();
        let target_was_interactive = shape.meta().interactive;
        shape.meta_mut().interactive = false;

        let mut overlay = Rectangle::from_rect(bounds);
        overlay.style = ShapeStyle {
            stroke_color: OVERLAY_COLOR,
            stroke_width: 1.0,
            fill_color: Some(OVERLAY_COLOR),
            opacity: 1.0,
        };
        overlay.meta = ShapeMeta::decorative();
        let overlay = scene.add(Shape::Rectangle(overlay));

        log::debug!("Started mask on {}", target);
        Ok(Self {
            target,
            overlay,
            target_was_interactive,
            inverted: false,
        })
    }

    pub fn target(&self) -> ShapeId {
        self.target
    }

    pub fn overlay(&self) -> ShapeId {
        self.overlay
    }

    /// Attach the overlay to the target as its clip region.
    ///
    /// The scene is only touched once both objects are known to exist.
    pub fn commit(self, scene: &mut Scene) -> EditResult<ShapeId> {
        if !scene.contains(self.target) {
            let target = self.target;
            self.cancel(scene);
            return Err(EditError::ObjectNotFound(target));
        }
        let Some(mut region) = scene.remove(self.overlay) else {
            self.restore_target(scene);
            return Err(EditError::ObjectNotFound(self.overlay));
        };

        *region.meta_mut() = ShapeMeta {
            interactive: false,
            ..ShapeMeta::default()
        };
        if let Some(shape) = scene.get_mut(self.target) {
            shape.meta_mut().clip = Some(ClipRegion {
                shape: Box::new(region),
                inverted: self.inverted,
            });
        }
        self.restore_target(scene);
        log::info!("Committed mask on {}", self.target);
        Ok(self.target)
    }

    /// Drop the overlay and give the target back untouched.
    pub fn cancel(self, scene: &mut Scene) {
        scene.remove(self.overlay);
        self.restore_target(scene);
        log::debug!("Cancelled mask on {}", self.target);
    }

    fn restore_target(&self, scene: &mut Scene) {
        if let Some(shape) = scene.get_mut(self.target) {
            shape.meta_mut().interactive = self.target_was_interactive;
        }
    }
}

/// Remove a committed clip region. Returns false if there was none.
pub fn clear_mask(scene: &mut Scene, target: ShapeId) -> EditResult<bool> {
    let shape = scene.get_mut(target).ok_or(EditError::ObjectNotFound(target))?;
    Ok(shape.meta_mut().clip.take().is_some())
}
