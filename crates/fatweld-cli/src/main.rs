use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use fatweld_fat16::structures::fat::constants::FIRST_DATA_CLUSTER;
use fatweld_fat16::{Geometry, ImageWriter, ShortName};

/// Geometry the companion boot loader is assembled with. A change here must
/// be mirrored there, or the loader reads garbage from a well-formed image.
const BOOT_GEOMETRY: Geometry = Geometry {
    bytes_per_sector: 512,
    reserved_sectors: 4096,
    fat_count: 2,
    sectors_per_fat: 256,
    root_entries: 512,
};

/// Payloads in injection order. The order is a contract: it fixes both the
/// root-directory slot order and the cluster numbering across builds.
const PAYLOADS: &[(&str, &str)] = &[
    ("WALL.BMP", "assets/wallpaper.bmp"),
    ("HELLO.ELF", "apps/hello.elf"),
    ("INIT.ELF", "apps/init.elf"),
    ("CALC.ELF", "apps/calc.elf"),
    ("DF.ELF", "apps/df.elf"),
    ("FM.ELF", "apps/fm.elf"),
    ("DEMO_IPC.ELF", "apps/demo_ipc.elf"),
    ("POSIX_T.ELF", "apps/posix_test.elf"),
];

const EXIT_FAILURE: u8 = 1;
const EXIT_IMAGE_MISSING: u8 = 2;
const EXIT_SOURCES_SKIPPED: u8 = 3;

#[derive(Debug, Parser)]
#[command(name = "fatweld", version, about = "Inject boot payloads into a FAT16 disk image")]
struct Args {
    /// Image to inject into
    #[arg(default_value = "os.img")]
    image: PathBuf,

    /// Directory the payload source paths resolve against
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .init();

    if !args.image.exists() {
        error!("image {} not found", args.image.display());
        return ExitCode::from(EXIT_IMAGE_MISSING);
    }

    match run(&args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(skipped) => {
            warn!("build completed with {skipped} payload(s) skipped");
            ExitCode::from(EXIT_SOURCES_SKIPPED)
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Runs one build: reset, then the manifest in order, threading the cluster
/// cursor from each injection into the next. Returns how many sources were
/// missing.
fn run(args: &Args) -> anyhow::Result<usize> {
    let mut writer = ImageWriter::open_file(&args.image, BOOT_GEOMETRY)
        .with_context(|| format!("opening {}", args.image.display()))?;
    writer
        .reset()
        .context("resetting FAT and root directory")?;

    let mut cluster = FIRST_DATA_CLUSTER;
    let mut skipped = 0;
    for (target, source) in PAYLOADS {
        let name = ShortName::parse(target)?;
        let path = args.root.join(source);
        match writer
            .inject_path(&name, &path, cluster)
            .with_context(|| format!("injecting {target}"))?
        {
            Some(injection) => {
                info!(
                    "injected {target} ({} sectors) at cluster {cluster}",
                    injection.sectors
                );
                cluster = injection.next_cluster;
            }
            None => {
                warn!("{} not found, skipping {target}", path.display());
                skipped += 1;
            }
        }
    }
    writer.into_inner().context("flushing image")?;
    info!(
        "{} complete, next free cluster {cluster}",
        args.image.display()
    );
    Ok(skipped)
}
