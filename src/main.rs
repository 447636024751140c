use clap::{Args, Parser, Subcommand};
use sozluk::correct::CorrectConfig;
use sozluk::extract::ExtractConfig;
use sozluk::reconcile::ReconcileConfig;
use sozluk::similarity::Strategy;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "sozluk")]
#[command(about = "Extract OCR dictionary text and reconcile it with an existing dataset")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse raw OCR text into a per-letter CSV dataset
    Extract(ExtractArgs),
    /// Match a freshly extracted dataset against an existing one
    Reconcile(ReconcileArgs),
    /// Repair OCR-mangled terms in one bucket file against its text source
    Correct(CorrectArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// Path to the raw OCR text file
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the extracted dataset
    #[arg(short, long)]
    output: PathBuf,

    /// Only keep entries routed to this letter's bucket
    #[arg(short, long)]
    letter: Option<String>,
}

#[derive(Args)]
struct ReconcileArgs {
    /// Directory of the existing dataset
    #[arg(long)]
    old: PathBuf,

    /// Directory of the newly extracted dataset
    #[arg(long)]
    new: PathBuf,

    /// Output directory for the updated dataset and reports
    #[arg(long)]
    out: PathBuf,

    /// Similarity strategy for ambiguous candidates
    #[arg(long, value_enum, default_value_t = Strategy::Jaccard)]
    strategy: Strategy,

    /// Acceptance threshold for the best ambiguous score
    #[arg(long, default_value_t = sozluk::config::DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Restrict the run to this letter's bucket
    #[arg(short, long)]
    letter: Option<String>,
}

#[derive(Args)]
struct CorrectArgs {
    /// Raw OCR text covering the same letter as the dataset file
    #[arg(short, long)]
    text: PathBuf,

    /// Single-bucket dataset CSV to correct (bucket taken from the file name)
    #[arg(short, long)]
    dataset: PathBuf,

    /// Corrected dataset CSV
    #[arg(short, long)]
    output: PathBuf,

    /// Corrections report CSV
    #[arg(short, long)]
    report: Option<PathBuf>,
}

fn run_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let config = ExtractConfig {
        input: args.input,
        out_dir: args.output,
        bucket: args.letter,
    };

    let start = Instant::now();
    let summary = sozluk::extract::run_extraction(&config)?;
    let duration = start.elapsed();

    println!();
    println!("=== Summary ===");
    println!("Extraction time:    {:.2}s", duration.as_secs_f64());
    println!();
    println!("Entries extracted:  {}", summary.entries);
    println!("Entries filtered:   {}", summary.filtered_out);
    println!("Lines skipped:      {}", summary.skipped_lines);
    println!();
    for (bucket, count) in &summary.buckets {
        println!("[{}] {}", bucket, count);
    }

    Ok(())
}

fn run_reconcile(args: ReconcileArgs) -> anyhow::Result<()> {
    let config = ReconcileConfig {
        old_dir: args.old,
        new_dir: args.new,
        out_dir: args.out,
        strategy: args.strategy,
        threshold: args.threshold,
        bucket: args.letter,
    };

    let start = Instant::now();
    let summary = sozluk::reconcile::run_reconciliation(&config)?;
    let duration = start.elapsed();
    let totals = summary.totals();

    println!();
    println!("=== Summary ===");
    println!("Reconcile time:     {:.2}s", duration.as_secs_f64());
    println!();
    println!("Entries processed:  {}", totals.total);
    println!("Matched:            {}", totals.matched);
    println!("Added:              {}", totals.added);
    println!("Ambiguous:          {}", totals.ambiguous);
    println!("  accepted:         {}", summary.ambiguous_accepted);
    println!("  rejected:         {}", summary.ambiguous_rejected);
    println!("Rows left absent:   {}", summary.absent_rows);
    println!("Rows skipped:       {}", summary.skipped_rows);
    println!("Entries skipped:    {}", summary.skipped_entries);
    println!();
    for (bucket, counts) in &summary.buckets {
        println!(
            "[{}] total={} matched={} added={} ambiguous={}",
            bucket, counts.total, counts.matched, counts.added, counts.ambiguous
        );
    }

    Ok(())
}

fn run_correct(args: CorrectArgs) -> anyhow::Result<()> {
    let report_path = args.report.unwrap_or_else(|| {
        let mut p = args.output.clone();
        p.set_extension("report.csv");
        p
    });
    let config = CorrectConfig {
        text_path: args.text,
        dataset_path: args.dataset,
        out_path: args.output,
        report_path,
    };

    let start = Instant::now();
    let summary = sozluk::correct::run_correction(&config)?;
    let duration = start.elapsed();

    println!();
    println!("=== Summary ===");
    println!("Correction time:    {:.2}s", duration.as_secs_f64());
    println!();
    println!("Rows examined:      {}", summary.rows);
    println!("Rows corrected:     {}", summary.corrected);
    println!("Entries parsed:     {}", summary.parsed_entries);
    println!("Rows skipped:       {}", summary.skipped_rows);

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Extract(args) => run_extract(args),
        Commands::Reconcile(args) => run_reconcile(args),
        Commands::Correct(args) => run_correct(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
