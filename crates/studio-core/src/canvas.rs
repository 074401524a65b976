//! The editing session: document, tools, selection and collaboration wired
//! together behind one event-driven API.
//!
//! Every operation runs to completion before the next event is handled.
//! Edits that change the committed scene go through [`Canvas::commit`],
//! which records history and, while a session is open, queues a throttled
//! canvas broadcast.

use crate::collaboration::CollaborationManager;
use crate::config::StudioConfig;
use crate::document::{Document, EditError, EditResult, PageSeed, PageSize};
use crate::input::{InputState, KeyEvent, MouseButton, PointerEvent};
use crate::mask::{self, MaskSession};
use crate::scene::{Scene, SceneSnapshot};
use crate::shapes::{
    AssetResult, FontWeight, Group, Image, ImageFilters, Path, SerializableColor, Shape, ShapeId,
};
use crate::snap::{Guide, SnapEngine};
use crate::sync::{ChatMessage, SessionCode, SyncEvent, SyncResult};
use crate::tools::{PathTool, ToolKind, ToolManager};
use kurbo::{Affine, Point, Rect, Vec2};
use std::time::Instant;

/// Offset applied to duplicated objects.
const DUPLICATE_OFFSET: Vec2 = Vec2::new(10.0, 10.0);

/// Partial font update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontChange {
    pub family: Option<String>,
    pub size: Option<f64>,
    pub weight: Option<FontWeight>,
    pub italic: Option<bool>,
}

/// An object drag in progress.
#[derive(Debug, Clone)]
struct DragState {
    start: Point,
    /// Selected objects as they were when the drag began.
    originals: Vec<Shape>,
    origin_bounds: Rect,
    moved: bool,
}

pub struct Canvas {
    pub document: Document,
    pub tool_manager: ToolManager,
    pub path_tool: PathTool,
    pub snap: SnapEngine,
    pub input: InputState,
    pub collaboration: CollaborationManager,
    config: StudioConfig,
    selection: Vec<ShapeId>,
    mask: Option<MaskSession>,
    drag: Option<DragState>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(
            Document::new("Untitled", PageSize::default()),
            StudioConfig::default(),
        )
    }
}

impl Canvas {
    pub fn new(mut document: Document, config: StudioConfig) -> Self {
        document.set_max_history(config.max_history);
        let mut snap = SnapEngine::new(config.snap_mode);
        snap.threshold = config.snap_threshold;
        snap.grid_size = config.grid_size;
        Self {
            document,
            tool_manager: ToolManager::new(),
            path_tool: PathTool::new(),
            snap,
            input: InputState::new(config.double_click_window(), config.double_click_distance),
            collaboration: CollaborationManager::default().with_throttle(config.broadcast_throttle()),
            config,
            selection: Vec::new(),
            mask: None,
            drag: None,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        self.document.scene()
    }

    // --- Commit and broadcast ---

    /// Record the live scene in history and share it with the session.
    ///
    /// Mask editing is a transient mode: nothing is committed or broadcast
    /// until the mask is committed or cancelled.
    pub fn commit(&mut self) -> bool {
        if self.mask.is_some() {
            return false;
        }
        let committed = self.document.commit();
        if committed {
            self.broadcast(Instant::now());
        }
        committed
    }

    fn broadcast(&mut self, now: Instant) {
        if self.mask.is_none() && self.collaboration.is_active() {
            self.collaboration
                .broadcast_canvas(self.document.scene().snapshot(), now);
        }
    }

    /// Abandon every in-progress interaction, leaving the scene as it was
    /// before each began.
    pub fn cancel_interactions(&mut self) {
        self.cancel_drag();
        self.tool_manager.cancel();
        self.path_tool.cancel();
        if self.mask.is_some() {
            self.cancel_mask();
        }
    }

    // --- Selection ---

    pub fn selection(&self) -> &[ShapeId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ShapeId) -> bool {
        self.selection.contains(&id)
    }

    pub fn select(&mut self, id: ShapeId) {
        self.selection.clear();
        self.add_to_selection(id);
    }

    pub fn add_to_selection(&mut self, id: ShapeId) {
        if self.scene().contains(id) && !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Select every interactive object on the active page.
    pub fn select_all(&mut self) {
        self.selection = self
            .scene()
            .iter()
            .filter(|s| s.is_interactive() && !s.is_decorative())
            .map(Shape::id)
            .collect();
    }

    fn prune_selection(&mut self) {
        let scene = self.document.scene();
        self.selection.retain(|id| scene.contains(*id));
    }

    /// Selected ids ordered back to front.
    fn selection_in_z_order(&self) -> Vec<ShapeId> {
        let scene = self.scene();
        let mut ids: Vec<(usize, ShapeId)> = self
            .selection
            .iter()
            .filter_map(|id| scene.index_of(*id).map(|i| (i, *id)))
            .collect();
        ids.sort_by_key(|(i, _)| *i);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    fn selection_bounds(&self) -> Option<Rect> {
        self.selection
            .iter()
            .filter_map(|id| self.scene().get(*id))
            .map(Shape::bounds)
            .reduce(|a, b| a.union(b))
    }

    // --- Object lifecycle ---

    /// Add an object on top and commit.
    pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
        if self.mask.is_some() {
            self.cancel_mask();
        }
        let id = self.document.scene_mut().add(shape);
        self.commit();
        id
    }

    /// Decode an image and place it, scaled to fit the page.
    ///
    /// A decode failure leaves the scene untouched.
    pub fn add_image_from_bytes(&mut self, position: Point, data: &[u8]) -> AssetResult<ShapeId> {
        let page = self.document.active_page().size();
        let image = Image::from_bytes(position, data)?.fit_within(page.width, page.height);
        Ok(self.add_shape(Shape::Image(image)))
    }

    /// Import SVG path data as a path object.
    pub fn add_svg_path(&mut self, data: &str) -> AssetResult<ShapeId> {
        let mut path = Path::from_svg(data)?;
        path.style = self.tool_manager.current_style.clone();
        Ok(self.add_shape(Shape::Path(path)))
    }

    /// Delete the selection. Returns how many objects were removed.
    ///
    /// While a mask is being edited this only discards the overlay.
    pub fn delete_selected(&mut self) -> usize {
        if self.mask.is_some() {
            self.cancel_mask();
            return 0;
        }
        let ids = std::mem::take(&mut self.selection);
        let scene = self.document.scene_mut();
        let removed = ids.into_iter().filter(|id| scene.remove(*id).is_some()).count();
        if removed > 0 {
            self.commit();
        }
        removed
    }

    /// Copy the selection with fresh ids, offset slightly, and select the
    /// copies.
    pub fn duplicate_selected(&mut self) -> Vec<ShapeId> {
        if self.mask.is_some() {
            self.cancel_mask();
            return Vec::new();
        }
        let copies: Vec<Shape> = self
            .selection_in_z_order()
            .into_iter()
            .filter_map(|id| self.scene().get(id).cloned())
            .map(|mut shape| {
                shape.regenerate_id();
                shape.transform(Affine::translate(DUPLICATE_OFFSET));
                shape
            })
            .collect();
        if copies.is_empty() {
            return Vec::new();
        }
        let scene = self.document.scene_mut();
        let ids: Vec<ShapeId> = copies.into_iter().map(|s| scene.add(s)).collect();
        self.selection = ids.clone();
        self.commit();
        ids
    }

    // --- Transforms ---

    fn edit_selected(&mut self, mut edit: impl FnMut(&mut Shape)) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        let scene = self.document.scene_mut();
        for id in &self.selection {
            if let Some(shape) = scene.get_mut(*id) {
                edit(shape);
            }
        }
        self.commit();
        true
    }

    pub fn translate_selected(&mut self, delta: Vec2) -> bool {
        self.edit_selected(|shape| shape.transform(Affine::translate(delta)))
    }

    /// Scale the selection about its combined center.
    pub fn scale_selected(&mut self, sx: f64, sy: f64) -> bool {
        let valid = |s: f64| s.is_finite() && s != 0.0;
        if !valid(sx) || !valid(sy) {
            return false;
        }
        let Some(bounds) = self.selection_bounds() else {
            return false;
        };
        let center = bounds.center().to_vec2();
        let affine = Affine::translate(center)
            * Affine::scale_non_uniform(sx, sy)
            * Affine::translate(-center);
        self.edit_selected(|shape| shape.transform(affine))
    }

    /// Rotate each selected object about its own center.
    pub fn rotate_selected(&mut self, angle: f64) -> bool {
        self.edit_selected(|shape| shape.rotate(angle))
    }

    // --- Property edits ---

    pub fn set_fill(&mut self, color: Option<SerializableColor>) -> bool {
        self.edit_selected(|shape| shape.style_mut().fill_color = color)
    }

    pub fn set_stroke(&mut self, color: SerializableColor, width: f64) -> bool {
        let width = width.max(0.0);
        self.edit_selected(|shape| {
            let style = shape.style_mut();
            style.stroke_color = color;
            style.stroke_width = width;
        })
    }

    /// Opacity is clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f64) -> bool {
        self.edit_selected(|shape| shape.style_mut().set_opacity(opacity))
    }

    /// Applies to selected images only.
    pub fn set_image_filters(&mut self, filters: ImageFilters) -> bool {
        self.edit_selected(|shape| {
            if let Some(image) = shape.as_image_mut() {
                image.set_filters(filters);
            }
        })
    }

    /// Applies to selected text objects only.
    pub fn set_font(&mut self, change: &FontChange) -> bool {
        self.edit_selected(|shape| {
            let Some(text) = shape.as_text_mut() else {
                return;
            };
            if let Some(family) = &change.family {
                text.font_family = family.clone();
            }
            if let Some(size) = change.size {
                text.font_size = size.max(1.0);
            }
            if let Some(weight) = change.weight {
                text.font_weight = weight;
            }
            if let Some(italic) = change.italic {
                text.italic = italic;
            }
        })
    }

    pub fn set_text_content(&mut self, content: &str) -> bool {
        self.edit_selected(|shape| {
            if let Some(text) = shape.as_text_mut() {
                text.content = content.to_string();
            }
        })
    }

    // --- Z-order ---

    fn reorder_selected(&mut self, top_first: bool, op: fn(&mut Scene, ShapeId) -> bool) -> bool {
        let mut ids = self.selection_in_z_order();
        if top_first {
            ids.reverse();
        }
        let scene = self.document.scene_mut();
        let mut changed = false;
        for id in ids {
            changed |= op(scene, id);
        }
        if changed {
            self.commit();
        }
        changed
    }

    /// Step each selected object one place, leading objects first. An
    /// object stays put when its neighbour in that direction is also
    /// selected, so a selection already at the end does not reshuffle.
    fn step_selected(&mut self, forward: bool) -> bool {
        let mut ids = self.selection_in_z_order();
        if forward {
            ids.reverse();
        }
        let scene = self.document.scene_mut();
        let mut changed = false;
        for id in ids {
            let order = scene.ids();
            let Some(index) = order.iter().position(|other| *other == id) else {
                continue;
            };
            let neighbour = if forward {
                order.get(index + 1)
            } else {
                index.checked_sub(1).and_then(|i| order.get(i))
            };
            let Some(neighbour) = neighbour else {
                continue;
            };
            if self.selection.contains(neighbour) {
                continue;
            }
            changed |= if forward {
                scene.bring_forward(id)
            } else {
                scene.send_backward(id)
            };
        }
        if changed {
            self.commit();
        }
        changed
    }

    pub fn bring_to_front(&mut self) -> bool {
        self.reorder_selected(false, Scene::bring_to_front)
    }

    pub fn send_to_back(&mut self) -> bool {
        self.reorder_selected(true, Scene::send_to_back)
    }

    pub fn bring_forward(&mut self) -> bool {
        self.step_selected(true)
    }

    pub fn send_backward(&mut self) -> bool {
        self.step_selected(false)
    }

    // --- Grouping ---

    /// Move the selected objects into a new group placed where the topmost
    /// of them was. Needs at least two objects.
    pub fn group_selected(&mut self) -> Option<ShapeId> {
        if self.mask.is_some() {
            self.cancel_mask();
            return None;
        }
        let ids = self.selection_in_z_order();
        if ids.len() < 2 {
            return None;
        }
        let scene = self.document.scene_mut();
        let top_index = ids.last().and_then(|id| scene.index_of(*id))?;
        let children: Vec<Shape> = ids.iter().filter_map(|id| scene.remove(*id)).collect();
        let insert_at = (top_index + 1).saturating_sub(children.len());
        let group_id = scene.insert_at(insert_at, Shape::Group(Group::new(children)));
        self.selection = vec![group_id];
        self.commit();
        Some(group_id)
    }

    /// Dissolve selected groups in place. Returns the released children.
    pub fn ungroup_selected(&mut self) -> Vec<ShapeId> {
        if self.mask.is_some() {
            self.cancel_mask();
            return Vec::new();
        }
        let groups: Vec<ShapeId> = self
            .selection_in_z_order()
            .into_iter()
            .filter(|id| self.scene().get(*id).and_then(Shape::as_group).is_some())
            .collect();
        if groups.is_empty() {
            return Vec::new();
        }

        let scene = self.document.scene_mut();
        let mut released = Vec::new();
        for group_id in groups {
            let Some(index) = scene.index_of(group_id) else {
                continue;
            };
            let Some(Shape::Group(group)) = scene.remove(group_id) else {
                continue;
            };
            for (offset, child) in group.ungroup().into_iter().enumerate() {
                released.push(scene.insert_at(index + offset, child));
            }
            self.selection.retain(|id| *id != group_id);
        }
        self.selection.extend(released.iter().copied());
        self.commit();
        released
    }

    // --- Dragging ---

    /// Start moving the selection from `point`.
    pub fn begin_drag(&mut self, point: Point) -> bool {
        let originals: Vec<Shape> = self
            .selection
            .iter()
            .filter_map(|id| self.scene().get(*id).cloned())
            .collect();
        let Some(origin_bounds) = originals.iter().map(Shape::bounds).reduce(|a, b| a.union(b))
        else {
            return false;
        };
        self.drag = Some(DragState {
            start: point,
            originals,
            origin_bounds,
            moved: false,
        });
        true
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Move the dragged objects so the pointer offset is preserved, snapped
    /// against every other visible, committed object.
    pub fn drag_to(&mut self, point: Point, now: Instant) {
        let Some(drag) = &self.drag else {
            return;
        };
        let raw = point - drag.start;
        let targets: Vec<Rect> = self
            .scene()
            .iter()
            .filter(|s| s.meta().visible && !s.is_decorative() && !self.selection.contains(&s.id()))
            .map(Shape::bounds)
            .collect();
        let outcome = self.snap.snap_drag(drag.origin_bounds + raw, &targets);
        let offset = raw + outcome.offset;
        let affine = Affine::translate(offset);

        let scene = self.document.scene_mut();
        for original in &drag.originals {
            if let Some(slot) = scene.get_mut(original.id()) {
                let mut moved = original.clone();
                moved.transform(affine);
                *slot = moved;
            }
        }
        let moved = offset != Vec2::ZERO;
        if let Some(drag) = &mut self.drag {
            drag.moved |= moved;
        }
        self.broadcast(now);
    }

    /// Finish the drag; commits if anything moved.
    pub fn end_drag(&mut self) -> bool {
        self.snap.clear_guides();
        match self.drag.take() {
            Some(drag) if drag.moved => self.commit(),
            _ => false,
        }
    }

    /// Put dragged objects back where they started.
    pub fn cancel_drag(&mut self) {
        self.snap.clear_guides();
        let Some(drag) = self.drag.take() else {
            return;
        };
        let scene = self.document.scene_mut();
        for original in drag.originals {
            if let Some(slot) = scene.get_mut(original.id()) {
                *slot = original;
            }
        }
    }

    pub fn guides(&self) -> &[Guide] {
        self.snap.guides()
    }

    // --- Masking ---

    pub fn is_masking(&self) -> bool {
        self.mask.is_some()
    }

    /// Begin editing a mask for the single selected object. The overlay
    /// becomes the selection so it can be moved and resized.
    pub fn start_mask(&mut self) -> EditResult<ShapeId> {
        if self.mask.is_some() {
            return Err(EditError::MaskInProgress);
        }
        let [target] = self.selection[..] else {
            return Err(EditError::NeedsSingleSelection);
        };
        self.cancel_drag();
        let session = MaskSession::start(self.document.scene_mut(), target)?;
        let overlay = session.overlay();
        self.mask = Some(session);
        self.selection = vec![overlay];
        Ok(overlay)
    }

    pub fn set_mask_inverted(&mut self, inverted: bool) -> EditResult<()> {
        let session = self.mask.as_mut().ok_or(EditError::NoMaskInProgress)?;
        session.inverted = inverted;
        Ok(())
    }

    /// Attach the overlay as the target's clip region and commit.
    pub fn commit_mask(&mut self) -> EditResult<ShapeId> {
        let session = self.mask.take().ok_or(EditError::NoMaskInProgress)?;
        self.cancel_drag();
        let result = session.commit(self.document.scene_mut());
        self.prune_selection();
        let target = result?;
        self.selection = vec![target];
        self.commit();
        Ok(target)
    }

    /// Drop the overlay, leaving the target exactly as before.
    pub fn cancel_mask(&mut self) {
        let Some(session) = self.mask.take() else {
            return;
        };
        self.cancel_drag();
        let target = session.target();
        session.cancel(self.document.scene_mut());
        self.selection = if self.scene().contains(target) {
            vec![target]
        } else {
            Vec::new()
        };
    }

    /// Remove the clip region from the single selected object.
    pub fn clear_mask(&mut self) -> EditResult<bool> {
        let [target] = self.selection[..] else {
            return Err(EditError::NeedsSingleSelection);
        };
        let cleared = mask::clear_mask(self.document.scene_mut(), target)?;
        if cleared {
            self.commit();
        }
        Ok(cleared)
    }

    // --- Vector paths ---

    /// Finish the path being authored and add it to the scene.
    ///
    /// With fewer than two points this is rejected and nothing changes.
    pub fn finish_path(&mut self) -> EditResult<ShapeId> {
        self.path_tool.style = self.tool_manager.current_style.clone();
        let path = self.path_tool.finish()?;
        Ok(self.add_shape(Shape::Path(path)))
    }

    /// Decorative shapes for in-progress tools; never part of the scene.
    pub fn overlay_shapes(&self) -> Vec<Shape> {
        let mut shapes = self.path_tool.preview();
        shapes.extend(self.tool_manager.preview_shape());
        shapes
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        self.cancel_interactions();
        let changed = self.document.undo();
        if changed {
            self.prune_selection();
            self.broadcast(Instant::now());
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_interactions();
        let changed = self.document.redo();
        if changed {
            self.prune_selection();
            self.broadcast(Instant::now());
        }
        changed
    }

    // --- Pages ---

    /// Append a page and make it active.
    pub fn add_page(&mut self) -> usize {
        self.add_page_seeded(PageSeed::Blank)
    }

    pub fn add_page_seeded(&mut self, seed: PageSeed) -> usize {
        let index = self.document.add_page_seeded(seed);
        // The index was just created, so switching cannot fail.
        if let Err(e) = self.switch_page(index) {
            log::error!("Could not switch to new page: {}", e);
        }
        index
    }

    pub fn delete_page(&mut self, index: usize) -> EditResult<()> {
        if index >= self.document.page_count() || self.document.page_count() == 1 {
            // Let the document report the precise error without side effects.
            return self.document.delete_page(index);
        }
        if index == self.document.active_index() {
            self.cancel_interactions();
            self.selection.clear();
        }
        self.document.delete_page(index)
    }

    pub fn switch_page(&mut self, index: usize) -> EditResult<()> {
        if index == self.document.active_index() {
            return Ok(());
        }
        if index >= self.document.page_count() {
            return self.document.switch_page(index);
        }
        self.cancel_interactions();
        self.selection.clear();
        self.document.switch_page(index)
    }

    // --- Tools and input ---

    /// Switching tools abandons any half-made shape or path.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool_manager.set_tool(tool);
        self.path_tool.cancel();
    }

    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) {
        self.input.handle_pointer_event(event, now);
        match self.tool_manager.current_tool {
            ToolKind::Select => self.select_tool_pointer(event, now),
            ToolKind::Path => self.path_tool_pointer(event),
            _ => self.create_tool_pointer(event),
        }
    }

    fn select_tool_pointer(&mut self, event: PointerEvent, now: Instant) {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => {
                let hit = self.scene().shape_at(position, self.config.hit_tolerance);
                match hit {
                    Some(id) => {
                        if self.input.modifiers.shift {
                            self.add_to_selection(id);
                        } else if !self.is_selected(id) {
                            self.select(id);
                        }
                        self.begin_drag(position);
                    }
                    // Clicking empty canvas keeps the overlay selected while
                    // a mask is being edited.
                    None if self.mask.is_none() => self.clear_selection(),
                    None => {}
                }
            }
            PointerEvent::Move { position } => self.drag_to(position, now),
            PointerEvent::Up {
                button: MouseButton::Left,
                ..
            } => {
                self.end_drag();
            }
            _ => {}
        }
    }

    fn create_tool_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => self.tool_manager.begin(position),
            PointerEvent::Move { position } => self.tool_manager.update(position),
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => {
                if let Some(shape) = self.tool_manager.end(position) {
                    let id = self.add_shape(shape);
                    self.select(id);
                }
            }
            _ => {}
        }
    }

    fn path_tool_pointer(&mut self, event: PointerEvent) {
        let PointerEvent::Down {
            position,
            button: MouseButton::Left,
        } = event
        else {
            return;
        };
        if self.input.is_double_click() {
            if let Err(e) = self.finish_path() {
                log::debug!("Path not finished: {}", e);
            }
            return;
        }
        // A click on top of the previous point is the first half of a
        // double-click, not a new vertex.
        let repeats_last = self
            .path_tool
            .points()
            .last()
            .is_some_and(|last| last.distance(position) <= self.config.double_click_distance);
        if !repeats_last {
            self.path_tool.style = self.tool_manager.current_style.clone();
            self.path_tool.add_point(position);
        }
    }

    pub fn handle_key(&mut self, event: KeyEvent) {
        self.input.handle_key_event(event.clone());
        let KeyEvent::Pressed(key) = event else {
            return;
        };
        match key.as_str() {
            "Enter" if self.path_tool.is_collecting() => {
                if let Err(e) = self.finish_path() {
                    log::debug!("Path not finished: {}", e);
                }
            }
            "Enter" if self.mask.is_some() => {
                if let Err(e) = self.commit_mask() {
                    log::warn!("Mask not committed: {}", e);
                }
            }
            "Escape" => self.cancel_interactions(),
            "Delete" | "Backspace" => {
                self.delete_selected();
            }
            _ => {}
        }
    }

    // --- Collaboration ---

    pub fn start_session(&mut self) -> SessionCode {
        self.collaboration.start_session()
    }

    pub fn join_session(&mut self, code: &str) -> SyncResult<SessionCode> {
        self.collaboration.join_session(code)
    }

    pub fn end_session(&mut self) {
        self.collaboration.end_session();
    }

    pub fn send_chat(&mut self, text: &str) -> SyncResult<ChatMessage> {
        self.collaboration.send_chat(text)
    }

    /// Feed a message from the transport into the session.
    ///
    /// A canvas update replaces the active page's scene wholesale after
    /// abandoning any local interaction in progress.
    pub fn apply_remote(&mut self, topic: &str, payload: &str) -> Option<SyncEvent> {
        let event = self.collaboration.handle_message(topic, payload)?;
        if let SyncEvent::CanvasReplaced { from, snapshot } = &event {
            self.apply_remote_scene(snapshot);
            log::debug!("Applied canvas from {}", from);
        }
        Some(event)
    }

    fn apply_remote_scene(&mut self, snapshot: &SceneSnapshot) {
        self.cancel_interactions();
        self.collaboration.discard_pending();
        self.document.replace_active_scene(snapshot);
        self.prune_selection();
    }

    /// Periodic housekeeping: sends a throttled canvas broadcast once its
    /// window opens.
    pub fn tick(&mut self, now: Instant) {
        self.collaboration.flush(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Rectangle, Text};
    use crate::snap::SnapMode;
    use crate::sync::{ChannelCommand, Feed};
    use std::time::Duration;

    fn rect_at(x: f64, y: f64, w: f64, h: f64) -> Shape {
        let mut r = Rectangle::new(Point::new(x, y), w, h);
        r.style.fill_color = Some(SerializableColor::black());
        Shape::Rectangle(r)
    }

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    fn up(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Up {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    fn mv(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
        }
    }

    #[test]
    fn test_add_shape_commits() {
        let mut canvas = Canvas::default();
        canvas.add_shape(rect_at(0.0, 0.0, 10.0, 10.0));
        assert!(canvas.document.can_undo());
        assert!(canvas.undo());
        assert!(canvas.scene().is_empty());
        assert!(canvas.redo());
        assert_eq!(canvas.scene().len(), 1);
    }

    #[test]
    fn test_drag_snaps_and_commits_once() {
        let mut canvas = Canvas::default();
        canvas.add_shape(rect_at(100.0, 0.0, 100.0, 50.0));
        let moving = canvas.add_shape(rect_at(300.0, 300.0, 60.0, 40.0));
        let history_len = canvas.document.active_page().history.len();

        canvas.select(moving);
        let now = Instant::now();
        assert!(canvas.begin_drag(Point::new(310.0, 310.0)));
        // Proposed left edge 104: within 8px of the static edge at 100.
        canvas.drag_to(Point::new(114.0, 310.0), now);
        assert_eq!(canvas.scene().get(moving).unwrap().bounds().x0, 100.0);
        assert!(!canvas.guides().is_empty());
        // Transient moves are not history entries.
        assert_eq!(canvas.document.active_page().history.len(), history_len);

        assert!(canvas.end_drag());
        assert!(canvas.guides().is_empty());
        assert_eq!(canvas.document.active_page().history.len(), history_len + 1);
    }

    #[test]
    fn test_cancel_drag_restores_positions() {
        let mut canvas = Canvas::default();
        let id = canvas.add_shape(rect_at(0.0, 0.0, 10.0, 10.0));
        canvas.select(id);
        canvas.begin_drag(Point::ZERO);
        canvas.drag_to(Point::new(250.0, 250.0), Instant::now());
        canvas.cancel_drag();
        assert_eq!(canvas.scene().get(id).unwrap().bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_pointer_drag_with_select_tool() {
        let mut canvas = Canvas::default();
        canvas.snap.mode = SnapMode::None;
        let id = canvas.add_shape(rect_at(0.0, 0.0, 50.0, 50.0));
        let now = Instant::now();
        canvas.handle_pointer(down(25.0, 25.0), now);
        assert_eq!(canvas.selection(), &[id]);
        canvas.handle_pointer(mv(75.0, 35.0), now);
        canvas.handle_pointer(up(75.0, 35.0), now);
        assert_eq!(canvas.scene().get(id).unwrap().bounds(), Rect::new(50.0, 10.0, 100.0, 60.0));

        canvas.handle_pointer(down(500.0, 500.0), now + Duration::from_secs(1));
        assert!(canvas.selection().is_empty());
    }

    #[test]
    fn test_create_tool_adds_and_selects() {
        let mut canvas = Canvas::default();
        canvas.set_tool(ToolKind::Ellipse);
        let now = Instant::now();
        canvas.handle_pointer(down(0.0, 0.0), now);
        canvas.handle_pointer(mv(40.0, 20.0), now);
        assert_eq!(canvas.overlay_shapes().len(), 1);
        canvas.handle_pointer(up(40.0, 20.0), now);
        assert_eq!(canvas.scene().len(), 1);
        assert_eq!(canvas.selection().len(), 1);
        assert!(canvas.overlay_shapes().is_empty());
    }

    #[test]
    fn test_path_tool_double_click_finishes() {
        let mut canvas = Canvas::default();
        canvas.set_tool(ToolKind::Path);
        let t0 = Instant::now();
        canvas.handle_pointer(down(10.0, 10.0), t0);
        canvas.handle_pointer(down(50.0, 10.0), t0 + Duration::from_secs(1));
        canvas.handle_pointer(down(50.0, 50.0), t0 + Duration::from_secs(2));
        assert!(!canvas.overlay_shapes().is_empty());
        canvas.handle_pointer(down(50.0, 50.0), t0 + Duration::from_millis(2100));

        assert_eq!(canvas.scene().len(), 1);
        let shape = canvas.scene().iter().next().unwrap();
        let Shape::Path(path) = shape else {
            panic!("expected a path, got {:?}", shape);
        };
        assert_eq!(path.data, "M 10 10 L 50 10 L 50 50");
        assert!(canvas.overlay_shapes().is_empty());
    }

    #[test]
    fn test_enter_with_one_point_is_rejected() {
        let mut canvas = Canvas::default();
        canvas.set_tool(ToolKind::Path);
        canvas.handle_pointer(down(10.0, 10.0), Instant::now());
        canvas.handle_key(KeyEvent::Pressed("Enter".into()));
        assert!(canvas.scene().is_empty());
        assert_eq!(canvas.finish_path(), Err(EditError::TooFewPoints(1)));
        assert!(!canvas.document.can_undo());
    }

    #[test]
    fn test_mask_flow() {
        let mut canvas = Canvas::default();
        let target = canvas.add_shape(rect_at(0.0, 0.0, 200.0, 100.0));
        assert_eq!(canvas.start_mask(), Err(EditError::NeedsSingleSelection));

        canvas.select(target);
        let overlay = canvas.start_mask().unwrap();
        assert_eq!(canvas.selection(), &[overlay]);
        assert_eq!(canvas.start_mask(), Err(EditError::MaskInProgress));
        assert!(canvas.scale_selected(0.5, 1.0));

        let history_len = canvas.document.active_page().history.len();
        assert_eq!(canvas.commit_mask(), Ok(target));
        assert_eq!(canvas.document.active_page().history.len(), history_len + 1);
        let shape = canvas.scene().get(target).unwrap();
        assert_eq!(shape.clip().unwrap().shape.bounds(), Rect::new(50.0, 0.0, 150.0, 100.0));
        assert!(shape.is_interactive());
        assert_eq!(canvas.scene().len(), 1);

        assert_eq!(canvas.clear_mask(), Ok(true));
        assert!(canvas.scene().get(target).unwrap().clip().is_none());
    }

    #[test]
    fn test_cancel_mask_restores_target() {
        let mut canvas = Canvas::default();
        let target = canvas.add_shape(rect_at(0.0, 0.0, 200.0, 100.0));
        let before = canvas.scene().snapshot();
        let history_len = canvas.document.active_page().history.len();

        canvas.select(target);
        canvas.start_mask().unwrap();
        canvas.translate_selected(Vec2::new(30.0, 0.0));
        canvas.handle_key(KeyEvent::Pressed("Escape".into()));

        assert!(!canvas.is_masking());
        assert_eq!(canvas.scene().snapshot(), before);
        assert_eq!(canvas.document.active_page().history.len(), history_len);
        assert_eq!(canvas.selection(), &[target]);
    }

    #[test]
    fn test_group_and_ungroup_keep_stacking() {
        let mut canvas = Canvas::default();
        let bottom = canvas.add_shape(rect_at(0.0, 0.0, 10.0, 10.0));
        let a = canvas.add_shape(rect_at(20.0, 0.0, 10.0, 10.0));
        let b = canvas.add_shape(rect_at(40.0, 0.0, 10.0, 10.0));
        let top = canvas.add_shape(rect_at(60.0, 0.0, 10.0, 10.0));

        canvas.select(a);
        canvas.add_to_selection(b);
        let group = canvas.group_selected().unwrap();
        assert_eq!(canvas.scene().ids(), vec![bottom, group, top]);
        assert_eq!(canvas.scene().get(group).unwrap().bounds(), Rect::new(20.0, 0.0, 50.0, 10.0));

        let released = canvas.ungroup_selected();
        assert_eq!(released, vec![a, b]);
        assert_eq!(canvas.scene().ids(), vec![bottom, a, b, top]);
    }

    #[test]
    fn test_z_order_of_multiple_selection() {
        let mut canvas = Canvas::default();
        let a = canvas.add_shape(rect_at(0.0, 0.0, 10.0, 10.0));
        let b = canvas.add_shape(rect_at(0.0, 0.0, 10.0, 10.0));
        let c = canvas.add_shape(rect_at(0.0, 0.0, 10.0, 10.0));

        canvas.select(a);
        canvas.add_to_selection(b);
        assert!(canvas.bring_to_front());
        assert_eq!(canvas.scene().ids(), vec![c, a, b]);
        assert!(canvas.send_to_back());
        assert_eq!(canvas.scene().ids(), vec![a, b, c]);
        assert!(!canvas.send_backward());
        assert_eq!(canvas.scene().ids(), vec![a, b, c]);

        assert!(canvas.bring_forward());
        assert_eq!(canvas.scene().ids(), vec![c, a, b]);
        assert!(!canvas.bring_forward());
        assert_eq!(canvas.scene().ids(), vec![c, a, b]);

        canvas.select(a);
        canvas.add_to_selection(c);
        assert!(canvas.bring_forward());
        assert_eq!(canvas.scene().ids(), vec![b, c, a]);
    }

    #[test]
    fn test_duplicate_and_delete() {
        let mut canvas = Canvas::default();
        let id = canvas.add_shape(rect_at(0.0, 0.0, 10.0, 10.0));
        canvas.select(id);
        let copies = canvas.duplicate_selected();
        assert_eq!(copies.len(), 1);
        assert_ne!(copies[0], id);
        assert_eq!(canvas.scene().get(copies[0]).unwrap().bounds().origin(), Point::new(10.0, 10.0));

        canvas.select_all();
        assert_eq!(canvas.delete_selected(), 2);
        assert!(canvas.scene().is_empty());
    }

    #[test]
    fn test_property_edits() {
        let mut canvas = Canvas::default();
        let rect = canvas.add_shape(rect_at(0.0, 0.0, 10.0, 10.0));
        let text = canvas.add_shape(Shape::Text(Text::new(Point::ZERO, "Hi")));
        assert!(!canvas.set_opacity(0.5));

        canvas.select_all();
        assert!(canvas.set_opacity(1.7));
        assert!(canvas.set_font(&FontChange {
            size: Some(48.0),
            weight: Some(FontWeight::Bold),
            ..FontChange::default()
        }));
        let red = SerializableColor::new(255, 0, 0, 255);
        assert!(canvas.set_fill(Some(red)));

        assert_eq!(canvas.scene().get(rect).unwrap().style().opacity, 1.0);
        assert_eq!(canvas.scene().get(rect).unwrap().style().fill_color, Some(red));
        let Some(Shape::Text(t)) = canvas.scene().get(text) else {
            panic!("text missing");
        };
        assert_eq!(t.font_size, 48.0);
        assert_eq!(t.font_weight, FontWeight::Bold);
    }

    #[test]
    fn test_add_page_switches_and_isolates_history() {
        let mut canvas = Canvas::default();
        canvas.add_shape(rect_at(0.0, 0.0, 10.0, 10.0));
        assert_eq!(canvas.add_page(), 1);
        assert_eq!(canvas.document.active_index(), 1);
        assert!(canvas.scene().is_empty());
        assert!(!canvas.undo());

        canvas.switch_page(0).unwrap();
        assert_eq!(canvas.scene().len(), 1);
        assert!(canvas.undo());
        assert_eq!(canvas.delete_page(5), Err(EditError::PageOutOfRange { index: 5, len: 2 }));
    }

    #[test]
    fn test_bad_image_leaves_scene_untouched() {
        let mut canvas = Canvas::default();
        assert!(canvas.add_image_from_bytes(Point::ZERO, b"not an image").is_err());
        assert!(canvas.add_svg_path("not a path").is_err());
        assert!(canvas.scene().is_empty());
        assert!(!canvas.document.can_undo());
    }

    #[test]
    fn test_commits_broadcast_when_in_session() {
        let mut canvas = Canvas::default();
        let code = canvas.start_session();
        canvas.collaboration.take_outgoing();

        canvas.add_shape(rect_at(0.0, 0.0, 10.0, 10.0));
        let commands = canvas.collaboration.take_outgoing();
        assert!(commands.iter().any(|c| matches!(
            c,
            ChannelCommand::Publish { topic, .. } if *topic == code.topic(Feed::Canvas)
        )));

        // Inside the throttle window the second commit is held back.
        canvas.add_shape(rect_at(20.0, 0.0, 10.0, 10.0));
        assert!(!canvas.collaboration.has_outgoing());
        canvas.tick(Instant::now() + Duration::from_millis(150));
        assert!(canvas.collaboration.has_outgoing());
    }
}
