use std::fs;
use std::path::Path;

use tempfile::tempdir;
use vibe_dmg::config::{self, Config, ConfigError, DEFAULT_PALETTE};

#[test]
fn reads_every_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
boot_rom_path = "/roms/dmg_boot.bin"
frames = 120
scale = 3
palette = [0xFFFFFF, 0xAAAAAA, 0x555555, 0x000000]
"#,
    )
    .unwrap();

    let cfg = Config::load(&path).unwrap();
    assert_eq!(cfg.boot_rom_path.as_deref(), Some(Path::new("/roms/dmg_boot.bin")));
    assert_eq!(cfg.frames, 120);
    assert_eq!(cfg.scale, 3);
    assert_eq!(cfg.palette, [0xFFFFFF, 0xAAAAAA, 0x555555, 0x000000]);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("nope.toml"));
}

#[test]
fn lenient_load_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    assert_eq!(config::load_or_default(&missing), Config::default());

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "frames = \"many\"").unwrap();
    assert_eq!(config::load_or_default(&broken), Config::default());

    let bad_scale = dir.path().join("scale.toml");
    fs::write(&bad_scale, "scale = 99").unwrap();
    assert_eq!(config::load_or_default(&bad_scale).scale, 1);
}

#[test]
fn defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.boot_rom_path, None);
    assert_eq!(cfg.frames, 60);
    assert_eq!(cfg.scale, 1);
    assert_eq!(cfg.palette, DEFAULT_PALETTE);
}
