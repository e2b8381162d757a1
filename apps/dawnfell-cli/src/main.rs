use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dawnfell_assets::LevelInfo;
use dawnfell_render::{Camera, Surface};
use dawnfell_render_gpu::{RayDispatcher, KERNEL_PATH};
use dawnfell_vfs::DirVfs;

#[derive(Parser)]
#[command(name = "dawnfell-cli", about = "CLI tool for dawnfell asset and render operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Decode a level-info resource and print its record tables
    Decode {
        /// Resource name, e.g. CRYSTAL3.INF
        name: String,
        /// Directory to search for loose resources (repeatable)
        #[arg(short, long, default_value = "data")]
        root: Vec<PathBuf>,
        /// Dump the full record set as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render frames through the GPU dispatcher and write the last as PPM
    Render {
        /// Frame width in pixels
        #[arg(long, default_value = "640")]
        width: u32,
        /// Frame height in pixels
        #[arg(long, default_value = "360")]
        height: u32,
        /// Kernel source path
        #[arg(long, default_value = KERNEL_PATH)]
        kernel: PathBuf,
        /// Number of update-direction/render cycles
        #[arg(short, long, default_value = "1")]
        frames: u32,
        /// Output image path
        #[arg(short, long, default_value = "frame.ppm")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("dawnfell-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("vfs: {}", dawnfell_vfs::crate_info());
            println!("assets: {}", dawnfell_assets::crate_info());
            println!("render: {}", dawnfell_render::crate_info());
            println!("render-gpu: {}", dawnfell_render_gpu::crate_info());
        }
        Commands::Decode { name, root, json } => {
            let mut vfs = DirVfs::new();
            for r in &root {
                vfs.add_root(r);
            }

            let info =
                LevelInfo::from_vfs(&vfs, &name).with_context(|| format!("decoding {name}"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
                return Ok(());
            }

            println!("Sounds ({}):", info.sounds().len());
            for (id, filename) in info.sounds() {
                println!("  {id:>4} -> {filename}");
            }

            let ceiling = info.ceiling();
            println!(
                "Ceiling: height={} unknown={} outdoor_dungeon={}",
                ceiling.height, ceiling.unknown, ceiling.outdoor_dungeon
            );

            let counts = info.section_lines();
            println!(
                "Section lines: floors={} walls={} flats={} sound={} text={}",
                counts.floors, counts.walls, counts.flats, counts.sound, counts.text
            );

            for (label, texture) in [
                ("lava chasm", info.lava_chasm_texture()),
                ("wet chasm", info.wet_chasm_texture()),
                ("dry chasm", info.dry_chasm_texture()),
                ("level up", info.level_up_texture()),
                ("level down", info.level_down_texture()),
                ("transition", info.transition_texture()),
                ("walk-through", info.trans_walk_thru_texture()),
            ] {
                if let Some(texture) = texture {
                    println!("{label}: {texture}");
                }
            }
        }
        Commands::Render {
            width,
            height,
            kernel,
            frames,
            out,
        } => {
            let mut dispatcher = RayDispatcher::new(width, height, &kernel)
                .context("constructing GPU dispatcher")?;
            let mut surface = Surface::new(width, height);
            let mut camera = Camera::default();

            for frame in 0..frames.max(1) {
                // Sweep the yaw a little each frame.
                camera.rotate(20.0, 0.0);
                dispatcher.update_direction(camera.direction())?;
                dispatcher.render(&mut surface)?;
                tracing::debug!(frame, "frame complete");
            }

            write_ppm(&out, &surface).with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {width}x{height} frame to {}", out.display());
        }
    }

    Ok(())
}

/// Write a surface as binary PPM. Pixels are 0xAABBGGRR little-endian.
fn write_ppm(path: &Path, surface: &Surface) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(file, "P6\n{} {}\n255", surface.width(), surface.height())?;
    for &pixel in surface.pixels() {
        let [r, g, b, _a] = pixel.to_le_bytes();
        file.write_all(&[r, g, b])?;
    }
    Ok(())
}
