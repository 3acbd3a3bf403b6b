//! Headless front end for the `vibe-dmg-core` emulator.

/// TOML configuration file
pub mod config;
/// PNG export of rendered frames
pub mod screenshot;
