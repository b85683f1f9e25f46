use super::*;
use crate::error::ErrorCode;

// =============================================================================
// names
// =============================================================================

#[test]
fn check_name_rejects_paths_and_dot_entries() {
    for bad in ["", ".", "..", "a/b.json", "a\\b.json", "/abs.json"] {
        assert!(matches!(check_name(bad), Err(StorageError::InvalidName(_))), "{bad:?}");
    }
    check_name("Flow one.json").unwrap();
    check_name(".hidden.json").unwrap();
}

#[test]
fn only_io_errors_are_retryable() {
    let io = StorageError::Io { name: "a".into(), source: std::io::Error::other("disk") };
    assert!(io.retryable());
    assert_eq!(io.error_code(), "E_STORAGE_IO");
    assert!(!StorageError::NotFound("a".into()).retryable());
    assert_eq!(StorageError::AlreadyExists("a".into()).error_code(), "E_FILE_EXISTS");
}

#[test]
fn io_error_maps_kinds() {
    let not_found = io_error("a.json", std::io::Error::from(ErrorKind::NotFound));
    assert!(matches!(not_found, StorageError::NotFound(name) if name == "a.json"));
    let exists = io_error("a.json", std::io::Error::from(ErrorKind::AlreadyExists));
    assert!(matches!(exists, StorageError::AlreadyExists(_)));
    let denied = io_error("a.json", std::io::Error::from(ErrorKind::PermissionDenied));
    assert!(matches!(denied, StorageError::Io { .. }));
}

// =============================================================================
// MemoryStorage
// =============================================================================

#[tokio::test]
async fn memory_lists_files_and_directories() {
    let storage = MemoryStorage::new().with_file("b.json", "{}").with_file("a.json", "{}").with_directory("nested");
    let items = storage.list().await.unwrap();
    assert_eq!(
        items,
        vec![
            StorageItem { name: "nested".into(), kind: EntryKind::Directory },
            StorageItem { name: "a.json".into(), kind: EntryKind::File },
            StorageItem { name: "b.json".into(), kind: EntryKind::File },
        ]
    );
}

#[tokio::test]
async fn memory_create_modes() {
    let storage = MemoryStorage::new().with_file("a.json", "keep");
    assert!(matches!(storage.create("a.json", CreateMode::New).await, Err(StorageError::AlreadyExists(_))));
    storage.create("a.json", CreateMode::IfAbsent).await.unwrap();
    assert_eq!(storage.contents("a.json").await.as_deref(), Some("keep"));

    storage.create("b.json", CreateMode::New).await.unwrap();
    assert_eq!(storage.contents("b.json").await.as_deref(), Some(""));
}

#[tokio::test]
async fn memory_write_requires_existing_file() {
    let storage = MemoryStorage::new();
    assert!(matches!(storage.write_text("a.json", "x").await, Err(StorageError::NotFound(_))));
    storage.create("a.json", CreateMode::New).await.unwrap();
    storage.write_text("a.json", "x").await.unwrap();
    assert_eq!(storage.read_text("a.json").await.unwrap(), "x");
}

#[tokio::test]
async fn memory_remove_missing_is_not_found() {
    let storage = MemoryStorage::new().with_file("a.json", "");
    storage.remove("a.json").await.unwrap();
    assert!(matches!(storage.remove("a.json").await, Err(StorageError::NotFound(_))));
    assert!(storage.file_names().await.is_empty());
}

// =============================================================================
// FsStorage
// =============================================================================

#[tokio::test]
async fn fs_open_requires_directory() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    std::fs::write(&file, "x").unwrap();

    assert!(matches!(FsStorage::open(&file).await, Err(StorageError::NotAFolder(_))));
    assert!(matches!(FsStorage::open(dir.path().join("missing")).await, Err(StorageError::NotFound(_))));
    assert_eq!(FsStorage::open(dir.path()).await.unwrap().root(), dir.path());
}

#[tokio::test]
async fn fs_round_trip_and_listing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub.json")).unwrap();
    let storage = FsStorage::open(dir.path()).await.unwrap();

    storage.create("flow.json", CreateMode::New).await.unwrap();
    storage.write_text("flow.json", "{\"nodes\":[]}").await.unwrap();
    assert_eq!(storage.read_text("flow.json").await.unwrap(), "{\"nodes\":[]}");

    let mut items = storage.list().await.unwrap();
    items.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(
        items,
        vec![
            StorageItem { name: "flow.json".into(), kind: EntryKind::File },
            StorageItem { name: "sub.json".into(), kind: EntryKind::Directory },
        ]
    );
}

#[tokio::test]
async fn fs_write_replaces_content_and_leaves_no_staging_files() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::open(dir.path()).await.unwrap();
    storage.create("flow.json", CreateMode::New).await.unwrap();
    storage.write_text("flow.json", "first version, longer").await.unwrap();
    storage.write_text("flow.json", "second").await.unwrap();

    assert_eq!(std::fs::read_to_string(dir.path().join("flow.json")).unwrap(), "second");
    let names: Vec<String> = storage.list().await.unwrap().into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["flow.json"]);
}

#[tokio::test]
async fn fs_create_new_does_not_clobber() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("flow.json"), "keep").unwrap();
    let storage = FsStorage::open(dir.path()).await.unwrap();

    assert!(matches!(storage.create("flow.json", CreateMode::New).await, Err(StorageError::AlreadyExists(_))));
    storage.create("flow.json", CreateMode::IfAbsent).await.unwrap();
    assert_eq!(storage.read_text("flow.json").await.unwrap(), "keep");
}

#[tokio::test]
async fn fs_missing_files_and_bad_names() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::open(dir.path()).await.unwrap();

    assert!(matches!(storage.read_text("nope.json").await, Err(StorageError::NotFound(_))));
    assert!(matches!(storage.write_text("nope.json", "x").await, Err(StorageError::NotFound(_))));
    assert!(matches!(storage.remove("nope.json").await, Err(StorageError::NotFound(_))));
    assert!(matches!(storage.read_text("../escape.json").await, Err(StorageError::InvalidName(_))));
}
