use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{debug, info};

use vibe_dmg::config::{self, Config};
use vibe_dmg::screenshot;
use vibe_dmg_core::cartridge::Cartridge;
use vibe_dmg_core::gameboy::{CYCLES_PER_SECOND, GameBoy};
use vibe_dmg_core::input::Key;
use vibe_dmg_core::ppu::{LcdReg, Ppu};

#[derive(Parser)]
struct Args {
    /// Path to ROM file
    rom: PathBuf,

    /// Path to boot ROM file (256 bytes); starts from power-on instead of
    /// the post-boot state
    #[arg(long)]
    boot_rom: Option<PathBuf>,

    /// Number of frames to run
    #[arg(long, conflicts_with = "cycles")]
    frames: Option<u64>,

    /// Number of machine cycles to run
    #[arg(long)]
    cycles: Option<u64>,

    /// Write the last completed frame to this PNG file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Integer upscaling of the PNG output
    #[arg(long)]
    scale: Option<u32>,

    /// Keep a joypad key pressed for the whole run
    #[arg(long, value_enum)]
    hold: Vec<HoldKey>,

    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum HoldKey {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl From<HoldKey> for Key {
    fn from(key: HoldKey) -> Self {
        match key {
            HoldKey::Right => Key::Right,
            HoldKey::Left => Key::Left,
            HoldKey::Up => Key::Up,
            HoldKey::Down => Key::Down,
            HoldKey::A => Key::A,
            HoldKey::B => Key::B,
            HoldKey::Select => Key::Select,
            HoldKey::Start => Key::Start,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => config::load_or_default(&config::default_config_path()),
    };
    if let Some(path) = &args.boot_rom {
        cfg.boot_rom_path = Some(path.clone());
    }
    if let Some(frames) = args.frames {
        cfg.frames = frames;
    }
    if let Some(scale) = args.scale {
        cfg.scale = scale;
    }
    if let Err(e) = cfg.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let cart = match Cartridge::from_file(&args.rom) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load ROM: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Loaded \"{}\" ({:?})", cart.title, cart.mbc);

    let mut gb = match &cfg.boot_rom_path {
        Some(path) => match std::fs::read(path) {
            Ok(data) if data.len() == 0x100 => GameBoy::new_power_on(cart, data),
            Ok(data) => {
                eprintln!("Boot ROM must be 256 bytes, got {}", data.len());
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("Failed to load boot ROM: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => GameBoy::new(cart),
    };

    for &key in &args.hold {
        gb.key_pressed(key.into());
    }

    let target = args
        .cycles
        .unwrap_or_else(|| cfg.frames.saturating_mul(Ppu::FRAME_CYCLES));
    while gb.cycles() < target {
        let next = (gb.cycles() + Ppu::FRAME_CYCLES).min(target);
        gb.run_until(next);
        debug!(
            "cycle {} PC={:04X} LY={}",
            gb.cycles(),
            gb.cpu().pc(),
            gb.ppu().reg(LcdReg::Ly)
        );
    }
    info!(
        "Ran {} cycles ({:.2} emulated seconds)",
        gb.cycles(),
        gb.cycles() as f64 / CYCLES_PER_SECOND as f64
    );
    if gb.cpu().locked() {
        info!("CPU locked at PC={:04X}", gb.cpu().pc());
    }

    if let Some(path) = &args.output {
        if let Err(e) = screenshot::save_png(gb.current_image(), &cfg.palette, cfg.scale, path) {
            eprintln!("Failed to write {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        info!("Wrote {}", path.display());
    }

    ExitCode::SUCCESS
}
