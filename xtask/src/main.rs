use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for dawnfell")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Write an XOR-obfuscated sample level-info resource for manual
    /// testing of `dawnfell-cli decode`
    SampleInf {
        /// Output path for the obfuscated resource
        #[arg(short, long, default_value = "data/MAZE.INF")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_cargo("fmt --check", &["fmt", "--all", "--", "--check"])?;
            run_cargo(
                "clippy",
                &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
            )?;
            run_cargo("test", &["test", "--workspace"])?;
            run_cargo("doc", &["doc", "--workspace", "--no-deps"])?;
        }
        Commands::Fmt => run_cargo("fmt --check", &["fmt", "--all", "--", "--check"])?,
        Commands::Clippy => run_cargo(
            "clippy",
            &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        )?,
        Commands::Test => run_cargo("test", &["test", "--workspace"])?,
        Commands::Doc => run_cargo("doc", &["doc", "--workspace", "--no-deps"])?,
        Commands::Build => run_cargo("build", &["build", "--workspace"])?,
        Commands::SampleInf { out } => write_sample_inf(&out)?,
    }

    Ok(())
}

fn run_cargo(label: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {label}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {label} failed");
    }
    Ok(())
}

/// A small level-info source exercising every recognized section, stored
/// in the obfuscated on-disk form the decoder expects for names outside
/// the unencrypted allow-list.
fn write_sample_inf(out: &Path) -> Result<()> {
    let source = "\
@FLOORS\n\
*BOXCAP 3\n\
DUNGEON1.SET\n\
@WALLS\n\
WALL1.IMG\n\
@FLATS NOSHOW\n\
TABLE1.IMG\n\
@SOUND\n\
CRITTER1.VOC 5\n\
DOOR.VOC 9\n\
SQUISH1.VOC 11\n\
@TEXT\n\
0\n\
You feel a cold draft from the passage ahead.\n";

    let mut bytes = source.as_bytes().to_vec();
    dawnfell_assets::xor_transform(&mut bytes);

    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, bytes)?;
    println!("Wrote sample level-info resource to {}", out.display());
    Ok(())
}
