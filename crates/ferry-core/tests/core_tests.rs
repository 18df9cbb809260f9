use std::path::{Path, PathBuf};

use ferry_core::{
    TransferContext, TransferError, TransferItem, TransferWarning, WarningKind, join_relative,
    relative_location,
};

#[test]
fn test_item_destination_uses_relative_location() {
    let item = TransferItem::new("/home/user/project/src/main.rs", "src/main.rs");

    assert_eq!(item.file_name(), "main.rs");
    assert_eq!(
        item.destination_in(Path::new("/backup")),
        PathBuf::from("/backup/src/main.rs")
    );
}

#[test]
fn test_item_under_root() {
    let item = TransferItem::under_root("/data/photos/2024/a.jpg", Path::new("/data/photos")).unwrap();
    assert_eq!(item.relative_location, "2024/a.jpg");

    assert!(TransferItem::under_root("/elsewhere/a.jpg", Path::new("/data/photos")).is_none());
}

#[test]
fn test_relative_location_of_root_is_empty() {
    let root = Path::new("/data/empty");
    assert_eq!(relative_location(root, root).unwrap(), "");
    assert_eq!(join_relative(Path::new("/dest"), ""), PathBuf::from("/dest"));
}

#[test]
fn test_context_round_trips_through_json() {
    let context = TransferContext::builder()
        .use_trash(false)
        .default_destination(Some(PathBuf::from("/srv/incoming")))
        .build()
        .unwrap();

    let json = serde_json::to_string(&context).unwrap();
    let parsed: TransferContext = serde_json::from_str(&json).unwrap();

    assert!(!parsed.use_trash);
    assert_eq!(parsed.default_destination, Some(PathBuf::from("/srv/incoming")));
    assert_eq!(
        parsed.resolve_destination(Path::new("")),
        PathBuf::from("/srv/incoming")
    );
    assert_eq!(parsed.resolve_destination(Path::new("/tmp")), PathBuf::from("/tmp"));
}

#[test]
fn test_error_messages_name_the_path() {
    let err = TransferError::EscalationFailed {
        path: PathBuf::from("/locked/file"),
    };
    assert!(err.to_string().contains("/locked/file"));

    let err = TransferError::archive("/tmp/a.zip", "invalid Zip archive");
    assert_eq!(err.to_string(), "Archive error at /tmp/a.zip: invalid Zip archive");
}

#[test]
fn test_warning_serializes_kind() {
    let warning = TransferWarning::unsafe_entry("../evil");
    assert_eq!(warning.kind, WarningKind::UnsafeArchiveEntry);

    let json = serde_json::to_value(&warning).unwrap();
    assert_eq!(json["kind"], "UnsafeArchiveEntry");
}
