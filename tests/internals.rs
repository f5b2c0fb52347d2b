mod common;

use std::fs;

use plotbridge::{
    ArtifactLoader, ArtifactPersister, ImageFormat, PlotError, TempArtifactManager, IMAGE_FILE,
    SHELVE_FILE,
};

#[test]
fn persist_copies_image_and_suffixed_shelve() {
    let temp = tempfile::tempdir().unwrap();
    let internal = tempfile::tempdir().unwrap();
    let set = TempArtifactManager::new(temp.path()).allocate(ImageFormat::Png).unwrap();
    common::write_png(set.image_path(), 8, 6);
    fs::write(set.actual_shelve_path(), b"shelf-v1").unwrap();

    ArtifactPersister::new(internal.path()).persist(&set).unwrap();

    assert_eq!(
        fs::read(internal.path().join(IMAGE_FILE)).unwrap(),
        fs::read(set.image_path()).unwrap()
    );
    assert_eq!(fs::read(internal.path().join(SHELVE_FILE)).unwrap(), b"shelf-v1");
}

#[test]
fn persist_creates_missing_internal_dir() {
    let temp = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let internal = root.path().join("node").join("internals");
    let set = TempArtifactManager::new(temp.path()).allocate(ImageFormat::Png).unwrap();
    common::write_png(set.image_path(), 2, 2);
    fs::write(set.actual_shelve_path(), b"s").unwrap();

    ArtifactPersister::new(&internal).persist(&set).unwrap();
    ArtifactLoader::new(&internal).validate().unwrap();
}

#[test]
fn persist_without_image_fails_and_keeps_previous_pair() {
    let temp = tempfile::tempdir().unwrap();
    let internal = tempfile::tempdir().unwrap();
    common::write_png(&internal.path().join(IMAGE_FILE), 3, 3);
    fs::write(internal.path().join(SHELVE_FILE), b"old-shelf").unwrap();
    let old_image = fs::read(internal.path().join(IMAGE_FILE)).unwrap();

    let set = TempArtifactManager::new(temp.path()).allocate(ImageFormat::Png).unwrap();
    fs::write(set.actual_shelve_path(), b"new-shelf").unwrap();

    let err = ArtifactPersister::new(internal.path()).persist(&set).unwrap_err();
    assert!(matches!(err, PlotError::ExecutionFailure { artifact: "image", .. }), "got {err:?}");
    assert_eq!(fs::read(internal.path().join(IMAGE_FILE)).unwrap(), old_image);
    assert_eq!(fs::read(internal.path().join(SHELVE_FILE)).unwrap(), b"old-shelf");
}

#[test]
fn persist_ignores_shelve_written_without_backend_suffix() {
    let temp = tempfile::tempdir().unwrap();
    let internal = tempfile::tempdir().unwrap();
    let set = TempArtifactManager::new(temp.path()).allocate(ImageFormat::Png).unwrap();
    common::write_png(set.image_path(), 2, 2);
    fs::write(set.shelve_path(), b"no-suffix").unwrap();

    let err = ArtifactPersister::new(internal.path()).persist(&set).unwrap_err();
    assert!(matches!(err, PlotError::ExecutionFailure { artifact: "shelve", .. }));
    assert!(common::dir_entries(internal.path()).is_empty());
}

#[test]
fn validate_with_only_image_is_corrupt() {
    let internal = tempfile::tempdir().unwrap();
    common::write_png(&internal.path().join(IMAGE_FILE), 2, 2);

    let err = ArtifactLoader::new(internal.path()).validate().unwrap_err();
    assert!(matches!(err, PlotError::CorruptInternals { .. }));
    assert!(err.to_string().contains(SHELVE_FILE));
}

#[test]
fn validate_with_only_shelve_is_corrupt() {
    let internal = tempfile::tempdir().unwrap();
    fs::write(internal.path().join(SHELVE_FILE), b"s").unwrap();

    let err = ArtifactLoader::new(internal.path()).validate().unwrap_err();
    assert!(matches!(err, PlotError::CorruptInternals { .. }));
}

#[test]
fn image_is_decoded_lazily_and_cached() {
    let internal = tempfile::tempdir().unwrap();
    common::write_png(&internal.path().join(IMAGE_FILE), 5, 4);
    fs::write(internal.path().join(SHELVE_FILE), b"s").unwrap();

    let mut loader = ArtifactLoader::new(internal.path());
    loader.validate().unwrap();
    assert!(!loader.is_loaded());

    let image = loader.get_image().unwrap();
    assert_eq!((image.width(), image.height()), (5, 4));
    assert!(loader.is_loaded());

    // cached: removing the file does not matter any more
    fs::remove_file(internal.path().join(IMAGE_FILE)).unwrap();
    assert_eq!(loader.get_image().unwrap().width(), 5);

    loader.reset();
    assert!(!loader.is_loaded());
    assert!(loader.get_image().is_err());
}

#[test]
fn undecodable_image_is_fatal() {
    let internal = tempfile::tempdir().unwrap();
    fs::write(internal.path().join(IMAGE_FILE), b"not a png").unwrap();
    fs::write(internal.path().join(SHELVE_FILE), b"s").unwrap();

    let mut loader = ArtifactLoader::new(internal.path());
    loader.validate().unwrap();
    assert!(matches!(loader.get_image(), Err(PlotError::Image(_))));
    assert!(!loader.is_loaded());
}
