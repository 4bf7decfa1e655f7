mod helpers;

use memex::catalog::error::CatalogError;
use memex::catalog::types::SourceType;
use memex::catalog::Catalog;
use std::fs;
use tempfile::TempDir;

fn jpeg_count(state: &TempDir) -> usize {
    let dir = state.path().join("thumbs");
    if !dir.exists() {
        return 0;
    }
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "jpg"))
        .count()
}

#[test]
fn scanning_images_generates_servable_thumbnails() {
    let state = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    helpers::write_png(files.path(), "photo.png", 64, 48);

    let catalog = helpers::test_catalog(&state);
    let root = files.path().to_string_lossy().into_owned();
    catalog.add_source(&root, SourceType::Local).unwrap();
    let report = catalog.scan_source(&root).unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(jpeg_count(&state), 1);

    let id = catalog.search(&helpers::query_all()).unwrap().memories[0]
        .id
        .clone();
    let bytes = catalog.get_thumbnail(&id).unwrap();
    assert!(
        bytes.starts_with(&[0xFF, 0xD8]),
        "thumbnail is not a JPEG stream"
    );
}

#[test]
fn thumbnails_are_refused_for_non_image_memories() {
    let state = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    helpers::write_file(files.path(), "essay.md", b"words");

    let catalog = helpers::test_catalog(&state);
    let root = files.path().to_string_lossy().into_owned();
    catalog.add_source(&root, SourceType::Local).unwrap();
    catalog.scan_source(&root).unwrap();

    let id = catalog.search(&helpers::query_all()).unwrap().memories[0]
        .id
        .clone();
    let err = catalog.get_thumbnail(&id).unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));

    let err = catalog.get_thumbnail("no-such-id").unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[test]
fn a_corrupt_image_is_cataloged_but_its_thumbnail_is_pending() {
    let state = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    helpers::write_file(files.path(), "broken.jpg", b"not image data at all");

    let catalog = helpers::test_catalog(&state);
    let root = files.path().to_string_lossy().into_owned();
    catalog.add_source(&root, SourceType::Local).unwrap();
    let report = catalog.scan_source(&root).unwrap();

    // The record lands in the catalog; only the preview fails.
    assert_eq!(report.added, 1);
    assert_eq!(report.failed(), 1);

    let id = catalog.search(&helpers::query_all()).unwrap().memories[0]
        .id
        .clone();
    let err = catalog.get_thumbnail(&id).unwrap_err();
    assert!(matches!(err, CatalogError::NotReady(_)));
}

#[test]
fn removing_a_source_clears_its_thumbnails() {
    let state = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    helpers::write_png(files.path(), "one.png", 32, 32);
    helpers::write_jpeg(files.path(), "two.jpg", 32, 32);

    let catalog = helpers::test_catalog(&state);
    let root = files.path().to_string_lossy().into_owned();
    catalog.add_source(&root, SourceType::Local).unwrap();
    catalog.scan_source(&root).unwrap();
    assert_eq!(jpeg_count(&state), 2);

    catalog.remove_source(&root, false).unwrap();
    assert_eq!(jpeg_count(&state), 0, "cache entries survived the cascade");
}

#[test]
fn thumbnails_survive_a_catalog_restart() {
    let state = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    helpers::write_png(files.path(), "keep.png", 32, 32);

    let config = helpers::test_config(&state);
    let id = {
        let catalog = Catalog::open(&config).unwrap();
        let root = files.path().to_string_lossy().into_owned();
        catalog.add_source(&root, SourceType::Local).unwrap();
        catalog.scan_source(&root).unwrap();
        catalog.search(&helpers::query_all()).unwrap().memories[0]
            .id
            .clone()
    };

    let reopened = Catalog::open(&config).unwrap();
    let bytes = reopened.get_thumbnail(&id).unwrap();
    assert!(bytes.starts_with(&[0xFF, 0xD8]));
}
