use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use photo_sorter::{
    folder_map, ExecutionResult, FileOutcome, Granularity, OrganizationConfig, OrganizationPlan,
    PlanExecutor, Planner, TransferMode,
};

/// Number of file names listed per folder in the preview
const PREVIEW_FILES_PER_FOLDER: usize = 5;

#[derive(Parser)]
#[command(name = "photo-sorter")]
#[command(version)]
#[command(about = "Organize photos into year, season, month or day folders")]
#[command(long_about = "Reads the photos in a folder, determines each capture date from EXIF metadata \
(falling back to the file modification time) and copies or moves them into dated folders.

Folder formats:
- year:   2024_Photos
- season: 2024_Spring_Photos
- month:  2024-03_Photos
- day:    2024-03-24_Photos

Supported file types: JPG, JPEG, PNG, HEIC
Collisions: identical files are skipped, different files get -2, -3, etc. suffixes")]
struct Cli {
    /// Increase verbosity (-v=INFO, -vv=DEBUG, -vvv=TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where each photo would go without changing anything
    Preview {
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Preview, ask for confirmation, then copy or move the photos
    Organize {
        #[command(flatten)]
        plan: PlanArgs,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Print the destination folder tree when done
        #[arg(long, conflicts_with = "json")]
        tree: bool,
    },
}

#[derive(Args)]
struct PlanArgs {
    /// Folder containing the photos
    source: PathBuf,
    /// Folder granularity: year, season, month or day
    #[arg(short, long, default_value = "year")]
    by: Granularity,
    /// Nest season, month and day folders under a year folder
    #[arg(long)]
    year_parent: bool,
    /// Move files instead of copying them
    #[arg(long = "move")]
    move_files: bool,
    /// Also organize photos in subfolders
    #[arg(short, long)]
    recursive: bool,
    /// Use dates found in file names before the modification time
    #[arg(long)]
    filename_dates: bool,
    /// Destination root (default: the source folder)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the plan and result as JSON
    #[arg(long)]
    json: bool,
}

impl PlanArgs {
    fn config(&self) -> OrganizationConfig {
        OrganizationConfig::new(self.by)
            .with_year_parent(self.year_parent)
            .with_move_files(self.move_files)
            .with_recursive(self.recursive)
            .with_filename_dates(self.filename_dates)
    }

    fn build_plan(&self) -> Result<OrganizationPlan> {
        let destination = self.output.as_ref().unwrap_or(&self.source);
        Planner::new(self.config())
            .with_progress(!self.json)
            .plan(&self.source, destination)
            .with_context(|| format!("Cannot plan photos in {}", self.source.display()))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose)?;

    info!("Starting photo-sorter");

    match cli.command {
        Commands::Preview { plan } => preview(&plan),
        Commands::Organize { plan, yes, tree } => organize(&plan, yes, tree),
    }
}

fn setup_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    Ok(())
}

fn preview(args: &PlanArgs) -> Result<()> {
    let plan = args.build_plan()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        write_preview(&plan, &mut io::stdout().lock())?;
    }
    Ok(())
}

fn organize(args: &PlanArgs, yes: bool, tree: bool) -> Result<()> {
    let plan = args.build_plan()?;

    if args.json {
        if plan.is_empty() {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }
    } else {
        write_preview(&plan, &mut io::stdout().lock())?;
        if plan.is_empty() {
            return Ok(());
        }
    }

    // stdout may carry JSON, so the prompt never goes there
    if !yes && !confirm(&plan, &mut io::stdin().lock(), &mut io::stderr())? {
        eprintln!("Cancelled, nothing was changed.");
        return Ok(());
    }

    let destination_root = plan.destination_root.clone();
    let result = PlanExecutor::new().with_progress(!args.json).execute(plan);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    if tree {
        let map = folder_map(&destination_root)
            .with_context(|| format!("Cannot list {}", destination_root.display()))?;
        println!("\n{}", map);
    }

    if !result.is_complete_success() {
        anyhow::bail!("{} of {} photos failed", result.failed, result.outcomes.len());
    }
    Ok(())
}

fn write_preview<W: Write>(plan: &OrganizationPlan, out: &mut W) -> io::Result<()> {
    if plan.is_empty() {
        writeln!(out, "No supported photos found in {}", plan.source_root.display())?;
    } else {
        let folders = plan.folders();
        writeln!(
            out,
            "\nFound {} photos to {} into {} folders under {}",
            plan.len(),
            plan.config.transfer_mode(),
            folders.len(),
            plan.destination_root.display()
        )?;

        for (folder, records) in &folders {
            writeln!(out, "\n📁 {} ({} photos)", folder.display(), records.len())?;
            for record in records.iter().take(PREVIEW_FILES_PER_FOLDER) {
                writeln!(out, "   📄 {}", record.file_name().to_string_lossy())?;
            }
            if records.len() > PREVIEW_FILES_PER_FOLDER {
                writeln!(out, "   ... and {} more photos", records.len() - PREVIEW_FILES_PER_FOLDER)?;
            }
        }
    }

    if !plan.unreadable.is_empty() {
        writeln!(out, "\nUnreadable files (not included):")?;
        for file in &plan.unreadable {
            writeln!(out, "  {}: {}", file.path.display(), file.reason)?;
        }
    }
    Ok(())
}

fn confirm<R: BufRead, W: Write>(plan: &OrganizationPlan, input: &mut R, prompt: &mut W) -> Result<bool> {
    write!(
        prompt,
        "\nProceed to {} {} photos? [y/N] ",
        plan.config.transfer_mode(),
        plan.len()
    )?;
    prompt.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_summary(result: &ExecutionResult) {
    println!("\nOrganization complete!");
    println!("Photos {}: {}", past_tense(result), result.succeeded);
    println!("Photos skipped: {}", result.skipped);
    println!("Errors: {}", result.failed);

    let skipped: Vec<_> = result
        .outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            FileOutcome::Skipped { destination, reason, .. } => Some((outcome.source(), destination, reason)),
            _ => None,
        })
        .collect();
    if !skipped.is_empty() {
        println!("\nSkipped:");
        for (source, destination, reason) in skipped {
            println!("  {} ({:?} at {})", source.display(), reason, destination.display());
        }
    }

    if result.failed > 0 {
        println!("\nErrors:");
        for (source, reason) in result.failures() {
            println!("  {}: {}", source.display(), reason);
        }
    }
}

fn past_tense(result: &ExecutionResult) -> &'static str {
    match result.mode {
        TransferMode::Copy => "copied",
        TransferMode::Move => "moved",
    }
}
