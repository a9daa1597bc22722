//! sprite_forge CLI: sprite-sheet separation, slicing, and transparency prep.
//!
//! Usage:
//!   sprite_forge separate <SHEET>      Classify frames by key color and export per-movement
//!   sprite_forge slice <SHEET>         Cut a sheet into uniform tiles
//!   sprite_forge transparent <FILES>   Knock the backdrop color out to alpha
//!   sprite_forge policy                Print the default classification policy as JSON

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use image::RgbaImage;

use sprite_forge::core_modules::transparency::{self, BackgroundReference, TransparencyConfig};
use sprite_forge::parallel_pipeline::ParallelSeparationPipeline;
use sprite_forge::pipeline::{
    ClassifierPolicy, Color, DEFAULT_COMPOSITE_FILL, FramePlan, GridSpec, PipelineConfig,
    SamplerStrategy, SheetReport,
};

#[derive(Parser)]
#[command(
    name = "sprite_forge",
    about = "Offline sprite-sheet preparation for color-keyed 2D assets",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Separate a sheet into per-movement frames by background key color
    Separate {
        /// Path to the sheet image
        sheet: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "separated_sprites")]
        out: PathBuf,

        /// Number of frame rows in the sheet
        #[arg(long)]
        rows: Option<u32>,

        /// Number of frame columns in the sheet
        #[arg(long)]
        cols: Option<u32>,

        /// Frame width in pixels, as an alternative to --cols
        #[arg(long)]
        frame_width: Option<u32>,

        /// Frame height in pixels, as an alternative to --rows
        #[arg(long)]
        frame_height: Option<u32>,

        /// JSON classification policy file (defaults to the built-in table)
        #[arg(long)]
        policy: Option<PathBuf>,

        /// JSON frame plan; groups by cell index and skips classification
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Background sampler: border|corners|full-frame
        #[arg(long, default_value = "border")]
        sampler: String,

        /// Border band width in pixels for the border sampler
        #[arg(long, default_value = "1")]
        edge_width: u32,

        /// Also write one horizontal strip per movement group
        #[arg(long)]
        composites: bool,

        /// Strip fill color as R,G,B,A (defaults to transparent black)
        #[arg(long, value_parser = parse_rgba)]
        fill: Option<[u8; 4]>,
    },

    /// Cut a sheet into uniform tiles with no classification
    Slice {
        /// Path to the sheet image
        sheet: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "sprites")]
        out: PathBuf,

        /// Number of tile rows in the sheet
        #[arg(long)]
        rows: Option<u32>,

        /// Number of tile columns in the sheet
        #[arg(long)]
        cols: Option<u32>,

        /// Square tile size in pixels, as an alternative to --rows/--cols
        #[arg(long)]
        tile_size: Option<u32>,
    },

    /// Zero the alpha of backdrop-colored pixels in one or more images
    Transparent {
        /// Image files to process
        files: Vec<PathBuf>,

        /// Per-channel match tolerance (strict upper bound)
        #[arg(long, default_value = "30")]
        tolerance: u8,

        /// Fixed backdrop color as R,G,B (defaults to each image's top-left pixel)
        #[arg(long, value_parser = parse_rgb)]
        color: Option<Color>,

        /// Overwrite the input files instead of writing *_transparent.png
        #[arg(long)]
        in_place: bool,
    },

    /// Print the default classification policy as JSON
    Policy {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Separate {
            sheet,
            out,
            rows,
            cols,
            frame_width,
            frame_height,
            policy,
            plan,
            sampler,
            edge_width,
            composites,
            fill,
        } => {
            run_separate(
                sheet,
                out,
                rows,
                cols,
                frame_width,
                frame_height,
                policy,
                plan,
                sampler,
                edge_width,
                composites,
                fill,
            )
            .await
        }
        Commands::Slice {
            sheet,
            out,
            rows,
            cols,
            tile_size,
        } => run_slice(sheet, out, rows, cols, tile_size),
        Commands::Transparent {
            files,
            tolerance,
            color,
            in_place,
        } => run_transparent(files, tolerance, color, in_place),
        Commands::Policy { out } => run_policy(out),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn run_separate(
    sheet_path: PathBuf,
    out: PathBuf,
    rows: Option<u32>,
    cols: Option<u32>,
    frame_width: Option<u32>,
    frame_height: Option<u32>,
    policy_path: Option<PathBuf>,
    plan_path: Option<PathBuf>,
    sampler: String,
    edge_width: u32,
    composites: bool,
    fill: Option<[u8; 4]>,
) -> anyhow::Result<()> {
    let sheet = load_sheet(&sheet_path)?;
    let grid = resolve_grid(&sheet, rows, cols, frame_width, frame_height)?;

    let policy = match policy_path {
        Some(path) => ClassifierPolicy::from_json_file(&path)
            .map_err(|e| anyhow!("failed to load policy {}: {e}", path.display()))?,
        None => ClassifierPolicy::default(),
    };

    let config = PipelineConfig {
        grid,
        sampler: parse_sampler(&sampler, edge_width)?,
        policy,
        composite_fill: fill.unwrap_or(DEFAULT_COMPOSITE_FILL),
    };
    let pipeline = ParallelSeparationPipeline::new(config)?;

    let report = match plan_path {
        Some(path) => {
            let plan = FramePlan::from_json_file(&path)
                .map_err(|e| anyhow!("failed to load plan {}: {e}", path.display()))?;
            pipeline.inner().run_plan(&sheet, &plan)?
        }
        None => pipeline.run(&sheet).await?,
    };

    print_summary(&report);

    std::fs::create_dir_all(&out)?;
    for group in &report.groups {
        let group_dir = out.join(group.label.as_str());
        std::fs::create_dir_all(&group_dir)?;
        for cell in &group.members {
            let path = group_dir.join(format!("frame_{}_{}.png", cell.row, cell.col));
            cell.image.save(&path)?;
        }
        println!(
            "  {} -> {} frames in {}",
            group.label,
            group.members.len(),
            group_dir.display()
        );
    }

    if composites {
        let strips = pipeline.composite_strips(report.groups).await?;
        for (label, strip) in strips {
            let path = out.join(label.as_str()).join(format!("{label}_strip.png"));
            strip.save(&path)?;
            println!("  {} -> strip {}", label, path.display());
        }
    }

    Ok(())
}

fn run_slice(
    sheet_path: PathBuf,
    out: PathBuf,
    rows: Option<u32>,
    cols: Option<u32>,
    tile_size: Option<u32>,
) -> anyhow::Result<()> {
    if tile_size.is_some() && (rows.is_some() || cols.is_some()) {
        bail!("specify either --tile-size or --rows and --cols, not both");
    }
    let sheet = load_sheet(&sheet_path)?;
    let grid = match tile_size {
        Some(size) => GridSpec::from_frame_size(sheet.width(), sheet.height(), size, size)?,
        None => resolve_grid(&sheet, rows, cols, None, None)?,
    };

    let cells = sprite_forge::core_modules::grid::partition(&sheet, &grid)?;
    std::fs::create_dir_all(&out)?;
    for cell in &cells {
        let path = out.join(format!("tile_{:02}_{:02}.png", cell.row, cell.col));
        cell.image.save(&path)?;
    }
    println!(
        "Sliced {} into {} tiles ({} rows x {} cols) in {}",
        sheet_path.display(),
        cells.len(),
        grid.rows,
        grid.cols,
        out.display()
    );
    Ok(())
}

fn run_transparent(
    files: Vec<PathBuf>,
    tolerance: u8,
    color: Option<Color>,
    in_place: bool,
) -> anyhow::Result<()> {
    if files.is_empty() {
        bail!("no input files given");
    }

    let config = TransparencyConfig {
        reference: match color {
            Some(color) => BackgroundReference::Fixed(color),
            None => BackgroundReference::TopLeft,
        },
        tolerance,
    };

    for file in files {
        let mut image = load_sheet(&file)?;
        let cleared = transparency::knock_out_background(&mut image, &config);

        let target = if in_place {
            file.clone()
        } else {
            suffixed_path(&file, "_transparent")
        };
        image.save(&target)?;
        println!(
            "  {} -> {} ({cleared} pixels cleared)",
            file.display(),
            target.display()
        );
    }
    Ok(())
}

fn run_policy(out: Option<PathBuf>) -> anyhow::Result<()> {
    let json = ClassifierPolicy::default().to_json_pretty()?;
    match out {
        Some(path) => {
            std::fs::write(&path, &json)?;
            println!("Wrote default policy to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn load_sheet(path: &Path) -> anyhow::Result<RgbaImage> {
    Ok(image::open(path)
        .map_err(|e| anyhow!("failed to open {}: {e}", path.display()))?
        .to_rgba8())
}

/// Resolves the grid from frame counts or frame dimensions, requiring
/// exactly one complete pair.
fn resolve_grid(
    sheet: &RgbaImage,
    rows: Option<u32>,
    cols: Option<u32>,
    frame_width: Option<u32>,
    frame_height: Option<u32>,
) -> anyhow::Result<GridSpec> {
    match (rows, cols, frame_width, frame_height) {
        (Some(rows), Some(cols), None, None) => Ok(GridSpec::new(rows, cols)),
        (None, None, Some(width), Some(height)) => Ok(GridSpec::from_frame_size(
            sheet.width(),
            sheet.height(),
            width,
            height,
        )?),
        _ => bail!("specify either --rows and --cols, or --frame-width and --frame-height"),
    }
}

fn parse_sampler(name: &str, edge_width: u32) -> anyhow::Result<SamplerStrategy> {
    match name {
        "border" => Ok(SamplerStrategy::BorderFrequency { edge_width }),
        "corners" => Ok(SamplerStrategy::Corners),
        "full-frame" => Ok(SamplerStrategy::FullFrame),
        other => bail!("unknown sampler '{other}' (expected border|corners|full-frame)"),
    }
}

fn print_summary(report: &SheetReport) {
    println!(
        "Classified {} cells into {} groups:",
        report.total_cells(),
        report.groups.len()
    );
    for (label, count) in report.label_counts() {
        println!("  {label}: {count}");
    }
}

fn parse_rgba(text: &str) -> Result<[u8; 4], String> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 4 {
        return Err("expected R,G,B,A".to_string());
    }
    let mut rgba = [0u8; 4];
    for (slot, part) in rgba.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<u8>()
            .map_err(|e| format!("bad channel '{part}': {e}"))?;
    }
    Ok(rgba)
}

fn parse_rgb(text: &str) -> Result<Color, String> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 3 {
        return Err("expected R,G,B".to_string());
    }
    let mut rgb = [0u8; 3];
    for (slot, part) in rgb.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<u8>()
            .map_err(|e| format!("bad channel '{part}': {e}"))?;
    }
    Ok(Color::from(rgb))
}

fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let mut target = path.to_path_buf();
    target.set_file_name(format!("{stem}{suffix}.png"));
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_parsing() {
        assert_eq!(parse_rgba("0, 0, 0, 0").unwrap(), [0, 0, 0, 0]);
        assert_eq!(parse_rgba("255,128,0,255").unwrap(), [255, 128, 0, 255]);
        assert!(parse_rgba("1,2,3").is_err());
        assert!(parse_rgba("1,2,3,600").is_err());
    }

    #[test]
    fn rgb_parsing() {
        assert_eq!(parse_rgb("10,20,30").unwrap(), Color::new(10, 20, 30));
        assert!(parse_rgb("10,20").is_err());
    }

    #[test]
    fn suffix_keeps_directory() {
        let path = PathBuf::from("assets/hero.png");
        assert_eq!(
            suffixed_path(&path, "_transparent"),
            PathBuf::from("assets/hero_transparent.png")
        );
    }

    #[test]
    fn slice_rejects_mixed_grid_flags() {
        // The conflict is caught before the sheet path is ever opened.
        let err = run_slice(
            PathBuf::from("missing.png"),
            PathBuf::from("out"),
            Some(2),
            Some(3),
            Some(16),
        )
        .unwrap_err();
        assert!(err.to_string().contains("--tile-size"));
    }
}
