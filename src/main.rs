use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use clippings_sync::cover::{CoverChain, CoverProvider};
use clippings_sync::{input, pipeline, LocaleMode, Outcome, PrepareOptions, Reconciler};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs;
use std::path::{Path, PathBuf};

// Written inside the output directory when --debug is given without --log-file.
const DEFAULT_LOG_FILE: &str = ".clippings-sync.log";

#[derive(Parser, Debug)]
#[command(
    name = "clippings-sync",
    version,
    about = "Turn Kindle 'My Clippings.txt' into one Markdown note per book"
)]
struct Cli {
    /// Path to the 'My Clippings.txt' export
    #[arg(short, long)]
    input: PathBuf,

    /// Directory holding the Markdown notes
    #[arg(short, long)]
    output: PathBuf,

    /// Rewrite every note and re-fetch covers, ignoring freshness checks
    #[arg(long, action = ArgAction::SetTrue)]
    rebuild: bool,

    /// Keep only the latest highlight per book position
    #[arg(long, action = ArgAction::SetTrue)]
    dedup: bool,

    /// Keep clippings without highlight text (bookmarks)
    #[arg(long, action = ArgAction::SetTrue)]
    keep_empty: bool,

    /// Do not look up cover images online
    #[arg(long, action = ArgAction::SetTrue)]
    no_covers: bool,

    /// Show what would be created/updated without writing anything
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Export language (auto|en|pt-br)
    #[arg(long, default_value = "auto")]
    locale: String,

    /// HTTP timeout in seconds for cover lookups
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Enable debug logs (written to a file)
    #[arg(long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Explicit log file path (enables file logging). Ignored if empty.
    #[arg(long, default_value = "")]
    log_file: String,
}

fn init_logging(args: &Cli) {
    if args.debug || !args.log_file.is_empty() {
        let log_path = if !args.log_file.is_empty() {
            PathBuf::from(&args.log_file)
        } else {
            args.output.join(DEFAULT_LOG_FILE)
        };
        if let Some(parent) = log_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match fs::File::create(&log_path) {
            Ok(file) => {
                let cfg = ConfigBuilder::new()
                    .set_time_format_rfc3339()
                    .set_target_level(LevelFilter::Off)
                    .build();
                if let Err(e) = WriteLogger::init(LevelFilter::Debug, cfg, file) {
                    eprintln!("[warn] file logger init failed: {e}");
                } else {
                    println!("[debug] logs → {:?}", log_path);
                }
                return;
            }
            Err(e) => {
                eprintln!("[warn] cannot create log file {:?}: {e}", log_path);
            }
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn ensure_output_dir(path: &Path, dry_run: bool) -> Result<()> {
    if dry_run || path.exists() {
        return Ok(());
    }
    fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))
}

fn run() -> Result<()> {
    let args = Cli::parse();
    let locale = LocaleMode::from_arg(&args.locale)
        .ok_or_else(|| anyhow!("unknown locale {:?} (expected auto, en or pt-br)", args.locale))?;

    init_logging(&args);
    debug!("arguments: {:?}", args);

    let content = input::read_source(&args.input)?;
    ensure_output_dir(&args.output, args.dry_run)?;
    let opts = PrepareOptions {
        locale,
        dedup: args.dedup,
        keep_empty: args.keep_empty,
    };
    let (groups, mut report) = pipeline::prepare(&content, &opts);

    let covers = if args.no_covers || args.dry_run {
        None
    } else {
        Some(CoverChain::online(args.timeout)?)
    };
    let mut reconciler = Reconciler::new(&args.output)
        .rebuild(args.rebuild)
        .dry_run(args.dry_run);
    if let Some(chain) = &covers {
        reconciler = reconciler.covers(chain as &dyn CoverProvider);
    }

    let pb = ProgressBar::new(groups.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let tally = reconciler.run(&groups, |group, outcome| {
        let label = match outcome {
            Outcome::Created(_) => "created",
            Outcome::Updated(_) => "updated",
            Outcome::Skipped(_) => "up to date",
            Outcome::Failed(_) => "FAILED",
        };
        pb.inc(1);
        pb.set_message(format!("{} ({label})", group.title));
        if let Outcome::Failed(reason) = outcome {
            pb.println(format!("✗ {}: {reason}", group.title));
        }
    })?;
    pb.finish_with_message("Done");

    report.absorb(tally);
    info!("{report}");
    println!(
        "{}{}",
        if args.dry_run { "(dry-run) " } else { "" },
        report
    );
    Ok(())
}

fn main() -> Result<()> {
    run()
}
