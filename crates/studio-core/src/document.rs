//! Multi-page documents.

use crate::history::{DEFAULT_MAX_HISTORY, History};
use crate::scene::{Scene, SceneSnapshot};
use crate::shapes::{Image, Shape, ShapeId};
use crate::storage::DocumentRecord;
use chrono::{DateTime, Utc};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rejected editing operations. None of these leave partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("cannot delete the last remaining page")]
    LastPage,
    #[error("page index {index} out of range (document has {len} pages)")]
    PageOutOfRange { index: usize, len: usize },
    #[error("exactly one object must be selected")]
    NeedsSingleSelection,
    #[error("object {0} not found")]
    ObjectNotFound(ShapeId),
    #[error("a path needs at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("a mask is already being edited")]
    MaskInProgress,
    #[error("no mask is being edited")]
    NoMaskInProgress,
}

/// Result type for editing operations.
pub type EditResult<T> = Result<T, EditError>;

/// Named page formats at 96 DPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePreset {
    A4,
    A5,
    Letter,
    BusinessCard,
    Poster,
    SquarePost,
}

impl PagePreset {
    pub fn size(self) -> Size {
        match self {
            PagePreset::A4 => Size::new(794.0, 1123.0),
            PagePreset::A5 => Size::new(559.0, 794.0),
            PagePreset::Letter => Size::new(816.0, 1056.0),
            PagePreset::BusinessCard => Size::new(336.0, 192.0),
            PagePreset::Poster => Size::new(1728.0, 2592.0),
            PagePreset::SquarePost => Size::new(1080.0, 1080.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageSize {
    Preset { preset: PagePreset },
    Custom { width: f64, height: f64 },
}

impl PageSize {
    pub fn size(&self) -> Size {
        match self {
            PageSize::Preset { preset } => preset.size(),
            PageSize::Custom { width, height } => Size::new(*width, *height),
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Preset {
            preset: PagePreset::A4,
        }
    }
}

/// What a freshly added page starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageSeed {
    Blank,
    /// A locked image covering the whole page.
    BackgroundImage { url: String },
    /// A template resolved by the host; only the id is recorded.
    Template { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub name: String,
    pub width: f64,
    pub height: f64,
    /// Scene as of the last switch away from this page or the last save.
    pub data: SceneSnapshot,
    #[serde(flatten)]
    pub history: History,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl Page {
    fn new(name: String, size: Size, data: SceneSnapshot, max_history: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            width: size.width,
            height: size.height,
            history: History::new(data.clone()).with_max_entries(max_history),
            data,
            template: None,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Editor decorations drawn on top of the page but never exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decorations {
    pub grid: bool,
    pub guides: bool,
}

impl Decorations {
    pub const HIDDEN: Decorations = Decorations {
        grid: false,
        guides: false,
    };
}

impl Default for Decorations {
    fn default() -> Self {
        Self {
            grid: true,
            guides: true,
        }
    }
}

/// A document of one or more pages with exactly one active page.
///
/// The active page's live scene is the source of truth; it is copied into
/// the page's `data` only on page switch or save.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub page_size: PageSize,
    pub created_at: DateTime<Utc>,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub decorations: Decorations,
    pages: Vec<Page>,
    active: usize,
    scene: Scene,
    max_history: usize,
}

impl Document {
    pub fn new(name: impl Into<String>, page_size: PageSize) -> Self {
        let page = Page::new(
            "Page 1".to_string(),
            page_size.size(),
            SceneSnapshot::default(),
            DEFAULT_MAX_HISTORY,
        );
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            page_size,
            created_at: Utc::now(),
            last_saved_at: None,
            decorations: Decorations::default(),
            pages: vec![page],
            active: 0,
            scene: Scene::new(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history;
        for page in &mut self.pages {
            page.history.set_max_entries(max_history);
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access for transient edits. Call [`Document::commit`] once the
    /// edit is final.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Apply `edit` to the live scene and commit the result.
    pub fn mutate<R>(&mut self, edit: impl FnOnce(&mut Scene) -> R) -> R {
        let out = edit(&mut self.scene);
        self.commit();
        out
    }

    /// Snapshot the live scene into the active page's history.
    pub fn commit(&mut self) -> bool {
        let snapshot = self.scene.snapshot();
        let active = self.active;
        match self.pages.get_mut(active) {
            Some(page) => page.history.commit(snapshot),
            None => false,
        }
    }

    pub fn undo(&mut self) -> bool {
        let active = self.active;
        let Some(snapshot) = self.pages.get_mut(active).and_then(|p| p.history.undo()) else {
            return false;
        };
        self.scene.load(snapshot);
        true
    }

    pub fn redo(&mut self) -> bool {
        let active = self.active;
        let Some(snapshot) = self.pages.get_mut(active).and_then(|p| p.history.redo()) else {
            return false;
        };
        self.scene.load(snapshot);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.active_page().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.active_page().history.can_redo()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_page(&self) -> &Page {
        &self.pages[self.active]
    }

    /// Append a blank page sized like the active page. Returns its index.
    pub fn add_page(&mut self) -> usize {
        self.add_page_seeded(PageSeed::Blank)
    }

    pub fn add_page_seeded(&mut self, seed: PageSeed) -> usize {
        let size = self.active_page().size();
        let name = format!("Page {}", self.pages.len() + 1);
        let mut template = None;
        let data = match seed {
            PageSeed::Blank => SceneSnapshot::default(),
            PageSeed::BackgroundImage { url } => {
                let mut background = Image::from_url(Point::ZERO, url, size.width, size.height);
                background.meta.interactive = false;
                SceneSnapshot::new(vec![Shape::Image(background)])
            }
            PageSeed::Template { id } => {
                template = Some(id);
                SceneSnapshot::default()
            }
        };
        let mut page = Page::new(name, size, data, self.max_history);
        page.template = template;
        self.pages.push(page);
        log::info!("Added page {} to '{}'", self.pages.len(), self.name);
        self.pages.len() - 1
    }

    /// Delete a page. The last remaining page cannot be deleted.
    pub fn delete_page(&mut self, index: usize) -> EditResult<()> {
        let len = self.pages.len();
        if index >= len {
            return Err(EditError::PageOutOfRange { index, len });
        }
        if len == 1 {
            return Err(EditError::LastPage);
        }
        self.pages.remove(index);
        if index == self.active {
            self.active = index.min(self.pages.len() - 1);
            self.scene.load(&self.pages[self.active].data);
        } else if index < self.active {
            self.active -= 1;
        }
        log::info!("Deleted page {} of '{}'", index + 1, self.name);
        Ok(())
    }

    /// Make another page active, parking the live scene in the outgoing page.
    pub fn switch_page(&mut self, index: usize) -> EditResult<()> {
        let len = self.pages.len();
        if index >= len {
            return Err(EditError::PageOutOfRange { index, len });
        }
        if index == self.active {
            return Ok(());
        }
        self.sync_active_page();
        self.active = index;
        self.scene.load(&self.pages[index].data);
        log::debug!("Switched to page {}", index + 1);
        Ok(())
    }

    pub fn rename_page(&mut self, index: usize, name: impl Into<String>) -> EditResult<()> {
        let len = self.pages.len();
        let page = self
            .pages
            .get_mut(index)
            .ok_or(EditError::PageOutOfRange { index, len })?;
        page.name = name.into();
        Ok(())
    }

    /// Copy the live scene into the active page's `data`.
    pub fn sync_active_page(&mut self) {
        let snapshot = self.scene.snapshot();
        let active = self.active;
        if let Some(page) = self.pages.get_mut(active) {
            page.data = snapshot;
        }
    }

    /// Replace the live scene wholesale (remote updates) and commit it.
    pub fn replace_active_scene(&mut self, snapshot: &SceneSnapshot) -> bool {
        self.scene.load(snapshot);
        self.commit()
    }

    pub fn to_record(&mut self, thumbnail: Option<String>) -> DocumentRecord {
        self.sync_active_page();
        DocumentRecord {
            id: self.id,
            name: self.name.clone(),
            pages: self.pages.clone(),
            page_size: self.page_size,
            thumbnail,
            last_modified: Utc::now(),
            created_at: self.created_at,
        }
    }

    pub fn from_record(record: DocumentRecord) -> Self {
        let mut pages = record.pages;
        if pages.is_empty() {
            log::warn!("Document '{}' had no pages, adding a blank one", record.name);
            pages.push(Page::new(
                "Page 1".to_string(),
                record.page_size.size(),
                SceneSnapshot::default(),
                DEFAULT_MAX_HISTORY,
            ));
        }
        for page in &mut pages {
            let fallback = page.data.clone();
            page.history.normalize(&fallback);
        }
        let scene = Scene::from_snapshot(&pages[0].data);
        Self {
            id: record.id,
            name: record.name,
            page_size: record.page_size,
            created_at: record.created_at,
            last_saved_at: Some(record.last_modified),
            decorations: Decorations::default(),
            pages,
            active: 0,
            scene,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Rectangle;

    fn add_rect(doc: &mut Document, x: f64) -> ShapeId {
        doc.mutate(|scene| scene.add(Shape::Rectangle(Rectangle::new(Point::new(x, 0.0), 10.0, 10.0))))
    }

    #[test]
    fn test_new_document_has_one_active_page() {
        let doc = Document::new("Flyer", PageSize::default());
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.active_index(), 0);
        assert_eq!(doc.active_page().size(), PagePreset::A4.size());
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_add_page_clones_size_with_empty_history() {
        let mut doc = Document::new("Card", PageSize::Custom { width: 300.0, height: 200.0 });
        add_rect(&mut doc, 0.0);
        let idx = doc.add_page();
        assert_eq!(idx, 1);
        let page = &doc.pages()[1];
        assert_eq!(page.size(), Size::new(300.0, 200.0));
        assert!(page.data.is_empty());
        assert_eq!(page.history.len(), 1);
        assert_eq!(doc.active_index(), 0);
    }

    #[test]
    fn test_delete_last_page_is_rejected() {
        let mut doc = Document::new("Solo", PageSize::default());
        add_rect(&mut doc, 0.0);
        let before = doc.scene().snapshot();
        assert_eq!(doc.delete_page(0), Err(EditError::LastPage));
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.scene().snapshot(), before);
    }

    #[test]
    fn test_delete_repoints_active_page() {
        let mut doc = Document::new("Multi", PageSize::default());
        doc.add_page();
        doc.add_page();
        doc.switch_page(2).unwrap();
        doc.delete_page(2).unwrap();
        assert_eq!(doc.active_index(), 1);

        doc.delete_page(0).unwrap();
        assert_eq!(doc.active_index(), 0);
        assert_eq!(doc.page_count(), 1);
        assert!(matches!(
            doc.delete_page(3),
            Err(EditError::PageOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_switch_page_keeps_history_local() {
        let mut doc = Document::new("Two", PageSize::default());
        add_rect(&mut doc, 0.0);
        add_rect(&mut doc, 20.0);
        doc.undo();
        let a_scene = doc.scene().snapshot();
        let a_index = doc.active_page().history.index();

        doc.add_page();
        doc.switch_page(1).unwrap();
        assert!(doc.scene().is_empty());
        assert!(!doc.can_undo());
        add_rect(&mut doc, 50.0);

        doc.switch_page(0).unwrap();
        assert_eq!(doc.scene().snapshot(), a_scene);
        assert_eq!(doc.active_page().history.index(), a_index);
        assert!(doc.can_redo());
        assert!(doc.redo());
        assert_eq!(doc.scene().len(), 2);
    }

    #[test]
    fn test_seeded_pages() {
        let mut doc = Document::new("Seeded", PageSize::default());
        let bg = doc.add_page_seeded(PageSeed::BackgroundImage {
            url: "https://cdn.example.com/bg.jpg".into(),
        });
        let tpl = doc.add_page_seeded(PageSeed::Template { id: "tpl-42".into() });

        let page = &doc.pages()[bg];
        assert_eq!(page.data.len(), 1);
        assert!(!page.data.objects[0].is_interactive());
        assert_eq!(doc.pages()[tpl].template.as_deref(), Some("tpl-42"));

        doc.switch_page(bg).unwrap();
        assert_eq!(doc.scene().len(), 1);
    }

    #[test]
    fn test_record_roundtrip() {
        let mut doc = Document::new("Roundtrip", PageSize::default());
        add_rect(&mut doc, 0.0);
        doc.add_page();
        let record = doc.to_record(None);
        assert_eq!(record.pages[0].data.len(), 1);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"history_stack\""));
        assert!(json.contains("\"history_index\":1"));
        let loaded = Document::from_record(serde_json::from_str(&json).unwrap());
        assert_eq!(loaded.page_count(), 2);
        assert_eq!(loaded.scene().snapshot(), doc.scene().snapshot());
        assert!(loaded.can_undo());
    }
}
