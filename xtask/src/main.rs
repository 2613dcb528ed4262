// Development automation for famicore
//
// Invoked as `cargo run -p xtask -- <command>`; wraps the cargo
// subcommands used in day-to-day work and CI.

use std::process::Command;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for famicore")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all CI checks (fmt, clippy, build, test)
    Ci,
    /// Quick checks before commit (fmt, clippy)
    Check,
    /// Format code
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Run clippy
    Clippy {
        #[arg(long)]
        fix: bool,
    },
    /// Build the project
    Build {
        #[arg(long)]
        release: bool,
    },
    /// Run tests
    Test {
        /// Filter to one module (e.g. cpu, ppu, apu)
        #[arg(long)]
        module: Option<String>,
    },
    /// Run benchmarks
    Bench,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Ci => {
            run_step("fmt", &["fmt", "--all", "--", "--check"])?;
            run_step(
                "clippy",
                &["clippy", "--all-targets", "--", "-D", "warnings"],
            )?;
            run_step("build", &["build"])?;
            run_step("test", &["test"])?;
        }
        Commands::Check => {
            run_step("fmt", &["fmt", "--all", "--", "--check"])?;
            run_step(
                "clippy",
                &["clippy", "--all-targets", "--", "-D", "warnings"],
            )?;
        }
        Commands::Fmt { check } => {
            if check {
                run_step("fmt", &["fmt", "--all", "--", "--check"])?;
            } else {
                run_step("fmt", &["fmt", "--all"])?;
            }
        }
        Commands::Clippy { fix } => {
            if fix {
                run_step("clippy", &["clippy", "--fix", "--allow-dirty"])?;
            } else {
                run_step(
                    "clippy",
                    &["clippy", "--all-targets", "--", "-D", "warnings"],
                )?;
            }
        }
        Commands::Build { release } => {
            if release {
                run_step("build", &["build", "--release"])?;
            } else {
                run_step("build", &["build"])?;
            }
        }
        Commands::Test { module } => {
            if let Some(module) = module {
                run_step("test", &["test", &module])?;
            } else {
                run_step("test", &["test"])?;
            }
        }
        Commands::Bench => run_step("bench", &["bench"])?,
    }
    Ok(())
}

fn run_step(name: &str, args: &[&str]) -> Result<()> {
    println!("{} cargo {}", "running".green().bold(), args.join(" "));
    let started = Instant::now();
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        bail!("{} failed", name);
    }
    println!(
        "{} {} in {:.1}s",
        "finished".green().bold(),
        name,
        started.elapsed().as_secs_f32()
    );
    Ok(())
}
