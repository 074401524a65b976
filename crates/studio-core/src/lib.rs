//! Studio Core Library
//!
//! Platform-agnostic document model, editing state machines and sync
//! protocol for the Studio multi-page canvas editor.

pub mod canvas;
pub mod collaboration;
pub mod config;
pub mod document;
pub mod history;
pub mod input;
pub mod mask;
pub mod scene;
pub mod shapes;
pub mod snap;
pub mod storage;
pub mod sync;
pub mod thumbnail;
pub mod tools;
pub mod zorder;

pub use canvas::{Canvas, FontChange};
pub use collaboration::CollaborationManager;
pub use config::{AutoSaveConfig, StudioConfig};
pub use document::{Decorations, Document, EditError, EditResult, Page, PageSeed, PageSize};
pub use history::History;
pub use input::{InputState, KeyEvent, MouseButton, PointerEvent};
pub use mask::MaskSession;
pub use scene::{Scene, SceneSnapshot};
pub use snap::{Guide, SnapEngine, SnapMode};
pub use storage::{AutoSaveManager, DocumentRecord, FileStorage, MemoryStorage, Storage};
pub use sync::{LocalHub, SessionCode, SyncError, SyncEvent};
pub use thumbnail::{ThumbnailError, ThumbnailRequest, Thumbnailer};
pub use tools::{PathTool, ToolKind, ToolManager};
