use kurbo::Point;
use std::sync::Arc;
use studio_core::config::AutoSaveConfig;
use studio_core::document::{Document, PageSize};
use studio_core::shapes::{Rectangle, Shape, Text};
use studio_core::storage::{AutoSaveManager, FileStorage, MemoryStorage, Storage};

fn flyer(content: &str) -> Document {
    let mut doc = Document::new("Flyer A", PageSize::default());
    doc.mutate(|scene| {
        scene.add(Shape::Text(Text::new(Point::new(40.0, 40.0), content)));
    });
    doc
}

fn headline(doc: &Document) -> String {
    match doc.scene().iter().next() {
        Some(Shape::Text(text)) => text.content.clone(),
        other => panic!("expected text, got {:?}", other),
    }
}

async fn save_twice<S: Storage>(storage: Arc<S>) {
    let mut manager = AutoSaveManager::new(storage.clone(), AutoSaveConfig::default());
    let mut first = flyer("Summer sale");
    manager.save(&mut first).await.unwrap();
    let mut second = flyer("Winter sale");
    manager.save(&mut second).await.unwrap();

    let index = storage.list().await.unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].name, "Flyer A");
    // The record keeps its identity across upserts.
    assert_eq!(second.id, first.id);

    let loaded = manager.load_by_name("Flyer A").await.unwrap();
    assert_eq!(headline(&loaded), "Winter sale");
}

#[tokio::test]
async fn saving_the_same_name_twice_keeps_one_record_in_memory() {
    save_twice(Arc::new(MemoryStorage::new())).await;
}

#[tokio::test]
async fn saving_the_same_name_twice_keeps_one_record_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    save_twice(Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap())).await;
}

#[tokio::test]
async fn reload_restores_pages_and_history() {
    let storage = Arc::new(MemoryStorage::new());
    let mut manager = AutoSaveManager::new(storage, AutoSaveConfig::default());

    let mut doc = Document::new("Menu", PageSize::default());
    doc.mutate(|scene| {
        scene.add(Shape::Rectangle(Rectangle::new(Point::ZERO, 10.0, 10.0)));
    });
    doc.mutate(|scene| {
        scene.add(Shape::Rectangle(Rectangle::new(Point::new(50.0, 0.0), 10.0, 10.0)));
    });
    doc.undo();
    let second = doc.add_page();
    doc.switch_page(second).unwrap();
    doc.mutate(|scene| {
        scene.add(Shape::Rectangle(Rectangle::new(Point::ZERO, 5.0, 5.0)));
    });
    doc.switch_page(0).unwrap();
    manager.save(&mut doc).await.unwrap();

    let mut loaded = manager.load_by_name("Menu").await.unwrap();
    assert_eq!(loaded.page_count(), 2);
    assert_eq!(loaded.scene().len(), 1);
    // The undone edit is still redoable after a reload.
    assert!(loaded.redo());
    assert_eq!(loaded.scene().len(), 2);

    loaded.switch_page(1).unwrap();
    assert_eq!(loaded.scene().len(), 1);
    assert!(loaded.undo());
    assert!(loaded.scene().is_empty());
}

#[tokio::test]
async fn cleanup_keeps_the_newest_documents() {
    let storage = Arc::new(MemoryStorage::new());
    let config = AutoSaveConfig::default().with_max_documents(2);
    let mut manager = AutoSaveManager::new(storage.clone(), config);

    for name in ["one", "two", "three"] {
        let mut doc = Document::new(name, PageSize::default());
        manager.save(&mut doc).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert_eq!(manager.cleanup().await.unwrap(), 1);
    let names: Vec<String> = manager.index().await.unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["three", "two"]);
}
