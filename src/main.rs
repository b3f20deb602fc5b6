use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use eframe::egui;

use tsxviewer::check::CheckReport;
use tsxviewer::tileset::load_tileset;
use tsxviewer::ui::TilesetViewerApp;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Tileset (.tsx) or bundle (.zip) to open in the viewer
    file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a tileset and the images it references
    Check {
        /// The .tsx file to check
        file: PathBuf,

        /// Skip comparing referenced images against their declared size
        #[arg(long)]
        no_images: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.command {
        Some(Command::Check { file, no_images }) => check(&file, no_images),
        None => {
            run_viewer(args.file)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn check(file: &Path, no_images: bool) -> anyhow::Result<ExitCode> {
    let tileset = load_tileset(file)?;
    let report = CheckReport::run(&tileset, !no_images);
    print!("{}", report);

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_viewer(file: Option<PathBuf>) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 720.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "tsxviewer",
        options,
        Box::new(move |cc| Box::new(TilesetViewerApp::new(cc, file))),
    )
    .map_err(|e| anyhow::anyhow!("Viewer failed: {e}"))
}
