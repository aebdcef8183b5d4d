use super::{COVERS_DIR_ENV, Config, default_filter};
use crate::paths::get_covers_dir;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
#[serial]
fn config_default_covers_dir() {
    let config = Config::default();
    assert_eq!(config.covers_dir, get_covers_dir());
    assert_eq!(config.port, 3000);
    assert_eq!(config.job_attempts, 1);
    assert_eq!(config.additional_pages, 2);
}

#[test]
#[serial]
fn config_new_respects_env_var() {
    let custom_dir = "/tmp/bookbound-covers-test1";
    unsafe {
        env::set_var(COVERS_DIR_ENV, custom_dir);
    }

    let config = Config::new();
    assert_eq!(config.covers_dir, PathBuf::from(custom_dir));

    unsafe {
        env::remove_var(COVERS_DIR_ENV);
    }
}

#[test]
#[serial]
fn config_builder_overrides_env_var() {
    unsafe {
        env::set_var(COVERS_DIR_ENV, "/tmp/bookbound-covers-env");
    }

    let custom_dir = PathBuf::from("/tmp/bookbound-covers-flag");
    let config = Config::new().with_covers_dir(custom_dir.clone());

    assert_eq!(config.covers_dir, custom_dir, "flag should override env var");

    unsafe {
        env::remove_var(COVERS_DIR_ENV);
    }
}

#[test]
fn default_filter_follows_verbosity() {
    assert_eq!(default_filter(0), "bookbound=debug,tower_http=debug");
    assert_eq!(default_filter(1), "bookbound=trace,tower_http=trace");
    assert_eq!(default_filter(3), "bookbound=trace,tower_http=trace");
}
