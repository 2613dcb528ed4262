// famicore - command-line entry point
//
// Takes a ROM path (.nes, .nsf, or .nsfe) and boots the matching machine.
// A broken image still opens a window: the error screen shows up instead
// of the game so the failure is visible where the user is looking.

use std::path::PathBuf;

use clap::Parser;

use famicore::display::{run_shell, WindowConfig};
use famicore::EmulatorConfig;

#[derive(Parser)]
#[command(name = "famicore")]
#[command(about = "A cycle-stepped NES/Famicom emulator and NSF player", long_about = None)]
struct Args {
    /// ROM file to run (.nes, .nsf, or .nsfe)
    rom: PathBuf,

    /// Start in fast mode (no frame-time throttling)
    #[arg(long)]
    fast: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = EmulatorConfig::load_or_default("famicore.toml");
    let rom = std::fs::read(&args.rom)?;

    if let Ok(cart) = famicore::CartInfo::parse(&rom) {
        log::info!("PRG ROM SIZE: {}", cart.prg_rom_size());
        log::info!(
            "PRG RAM SIZE: {} (battery backed: {})",
            cart.prg_ram_size(),
            cart.has_battery_backed_ram()
        );
        log::info!("CHR ROM SIZE: {}", cart.chr_rom_size());
        log::info!("MAPPER NUM: {}", cart.mapper_number());
    }

    let audio_enabled = config.audio_enabled;
    let window = WindowConfig::new()
        .with_scale(config.scale)
        .with_fast(args.fast);

    let emulator = famicore::boot(&rom, config);
    run_shell(emulator, args.rom, window, audio_enabled)
}
