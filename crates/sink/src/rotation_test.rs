//! Tests for size-based rotation

use crate::rotation::{Output, RotationPolicy, archive_path, live_path};
use chrono::{Local, TimeZone};
use std::fs;
use std::io;
use tempfile::TempDir;

fn base(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).display().to_string()
}

// ============================================================================
// Naming
// ============================================================================

#[test]
fn test_live_path() {
    assert_eq!(live_path("logs/app").to_str().unwrap(), "logs/app.log");
}

#[test]
fn test_archive_path_is_deterministic() {
    let at = Local.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();

    let first = archive_path("logs/app", at);
    let second = archive_path("logs/app", at);

    assert_eq!(first, second);
    assert_eq!(first.to_str().unwrap(), "logs/app_2024-03-05_07-08-09.log");
}

// ============================================================================
// Opening
// ============================================================================

#[test]
fn test_open_creates_parent_dirs() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let name = base(&dir, "nested/deeper/app");

    let policy = RotationPolicy::open(&name, 1024).expect("open");

    assert!(live_path(&name).exists());
    assert_eq!(policy.current_size(), 0);
    assert_eq!(policy.max_size(), 1024);
    assert!(policy.output().is_file());
}

#[test]
fn test_open_appends_and_picks_up_existing_size() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let name = base(&dir, "app");
    fs::write(live_path(&name), b"0123456789").unwrap();

    let mut policy = RotationPolicy::open(&name, 1024).expect("open");
    assert_eq!(policy.current_size(), 10);

    policy.write_block(b"abc").unwrap();
    assert_eq!(fs::read(live_path(&name)).unwrap(), b"0123456789abc");
}

// ============================================================================
// Threshold
// ============================================================================

#[test]
fn test_no_rotation_at_or_below_max() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let name = base(&dir, "app");
    let mut policy = RotationPolicy::open(&name, 100).expect("open");

    assert!(policy.record(60).is_none());
    assert!(policy.record(40).is_none());
    assert_eq!(policy.current_size(), 100);
}

#[test]
fn test_rotation_when_exceeding_max() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let name = base(&dir, "app");
    let mut policy = RotationPolicy::open(&name, 10).expect("open");

    policy.write_block(b"hello world\n").unwrap();
    let rotation = policy.record(12).expect("over the limit");

    assert!(rotation.is_ok(), "{rotation:?}");
    assert!(rotation.synced.is_ok());
    assert_eq!(fs::read(&rotation.archive).unwrap(), b"hello world\n");
    assert_eq!(fs::read(live_path(&name)).unwrap(), b"");
    assert_eq!(policy.current_size(), 0);
}

#[test]
fn test_rotate_at_uses_timestamp() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let name = base(&dir, "svc");
    let mut policy = RotationPolicy::open(&name, 10).expect("open");
    policy.write_block(b"data").unwrap();

    let at = Local.with_ymd_and_hms(2023, 12, 31, 23, 59, 58).unwrap();
    let rotation = policy.rotate_at(at).expect("file output rotates");

    assert_eq!(rotation.archive, archive_path(&name, at));
    assert!(dir.path().join("svc_2023-12-31_23-59-58.log").exists());
}

#[test]
fn test_writes_after_rotation_land_in_new_file() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let name = base(&dir, "app");
    let mut policy = RotationPolicy::open(&name, 4).expect("open");

    policy.write_block(b"first").unwrap();
    let rotation = policy.record(5).expect("rotates");
    policy.write_block(b"second").unwrap();

    assert_eq!(fs::read(&rotation.archive).unwrap(), b"first");
    assert_eq!(fs::read(live_path(&name)).unwrap(), b"second");
}

#[test]
fn test_stdout_never_rotates() {
    let mut policy = RotationPolicy::stdout();

    assert!(policy.record(u64::MAX).is_none());
    assert!(policy.rotate_at(Local::now()).is_none());
    assert!(policy.live_path().is_none());
}

// ============================================================================
// Failure handling
// ============================================================================

#[cfg(unix)]
#[test]
fn test_rename_failure_keeps_live_file() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let name = base(&dir, "app");
    let mut policy = RotationPolicy::open(&name, 4).expect("open");
    policy.write_block(b"payload").unwrap();

    // a non-empty directory squatting on the archive name blocks the rename
    let at = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let blocker = archive_path(&name, at);
    fs::create_dir(&blocker).unwrap();
    fs::write(blocker.join("keep"), b"x").unwrap();

    let rotation = policy.rotate_at(at).expect("file output rotates");

    assert!(rotation.renamed.is_err());
    assert!(rotation.reopened.is_ok());
    assert!(!policy.is_degraded());
    assert_eq!(policy.current_size(), 7);

    policy.write_block(b"+more").unwrap();
    assert_eq!(fs::read(live_path(&name)).unwrap(), b"payload+more");
}

#[cfg(unix)]
#[test]
fn test_reopen_failure_falls_back_to_stdout_then_recovers() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let logs = dir.path().join("logs");
    let name = logs.join("app").display().to_string();
    let mut policy = RotationPolicy::open(&name, 1).expect("open");

    fs::remove_dir_all(&logs).unwrap();

    let rotation = policy.record(2).expect("rotates");
    assert!(rotation.renamed.is_err());
    assert!(rotation.reopened.is_err());
    assert!(policy.is_degraded());
    assert!(matches!(policy.output(), Output::Stdout));

    // still missing
    assert!(matches!(policy.reopen_if_degraded(), Some(Err(_))));

    fs::create_dir_all(&logs).unwrap();
    assert!(matches!(policy.reopen_if_degraded(), Some(Ok(()))));
    assert!(!policy.is_degraded());
    assert!(policy.output().is_file());
    assert!(policy.reopen_if_degraded().is_none());
}

#[test]
fn test_write_after_close_fails() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let name = base(&dir, "app");
    let mut policy = RotationPolicy::open(&name, 1024).expect("open");

    policy.write_block(b"line\n").unwrap();
    policy.close().unwrap();

    let err = policy.write_block(b"late\n").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(fs::read(live_path(&name)).unwrap(), b"line\n");
}

// ============================================================================
// Platform semantics
// ============================================================================

/// On Unix a file can be renamed while a handle is open; the handle keeps
/// writing to the renamed inode. Rotation closes before renaming anyway.
#[cfg(unix)]
#[test]
fn test_rename_while_open_follows_inode() {
    use std::io::Write;

    let dir = TempDir::new().expect("failed to create temp dir");
    let live = dir.path().join("open.log");
    let moved = dir.path().join("moved.log");

    let mut handle = fs::File::options()
        .create(true)
        .append(true)
        .open(&live)
        .unwrap();
    handle.write_all(b"before ").unwrap();

    fs::rename(&live, &moved).unwrap();
    handle.write_all(b"after").unwrap();
    drop(handle);

    assert!(!live.exists());
    assert_eq!(fs::read(&moved).unwrap(), b"before after");
}

/// Windows refuses to rename a file that is open without share-delete.
#[cfg(windows)]
#[test]
fn test_rename_while_open_is_refused() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let live = dir.path().join("open.log");
    let moved = dir.path().join("moved.log");

    let handle = fs::File::create(&live).unwrap();
    assert!(fs::rename(&live, &moved).is_err());
    drop(handle);
}
