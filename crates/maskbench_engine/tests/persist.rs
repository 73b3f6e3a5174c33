use std::fs;

use maskbench_engine::{ensure_export_dir, ArchiveWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_export_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("export");
    assert!(!new_dir.exists());
    ensure_export_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_archive() {
    let temp = TempDir::new().unwrap();
    let writer = ArchiveWriter::new(temp.path().to_path_buf());

    let first = writer.write("a1b2c3d4_masks.zip", b"PK\x03\x04old").unwrap();
    assert_eq!(first.file_name().unwrap(), "a1b2c3d4_masks.zip");
    assert_eq!(fs::read(&first).unwrap(), b"PK\x03\x04old");

    // A second export for the same job takes the old one's place.
    let second = writer.write("a1b2c3d4_masks.zip", b"PK\x03\x04new").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"PK\x03\x04new");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = ArchiveWriter::new(file_path.clone());
    let result = writer.write("a1b2c3d4_masks.zip", b"data");
    assert!(result.is_err());

    // The failed write leaves nothing behind: no archive under the target
    // path and no stray temp file next to it.
    assert!(!file_path.join("a1b2c3d4_masks.zip").exists());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "x");
}
