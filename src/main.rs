use log::{debug, info};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;

use fragment_assembler::fragments::read_fragments;
use fragment_assembler::instances::{
    run_instance, scan_instances, Instance, InstanceReport, RunOptions,
};

fn default_workers() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Greedy error-tolerant fragment assembler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fragment file (lines, FASTA or FASTQ, optionally gzipped) or a directory of instances
    input: String,

    /// Length of the original string (default: parsed from `<id>.<length>-<errors>` file names)
    #[arg(long)]
    target_length: Option<usize>,

    /// Highest overlap shift tried by the error-tolerant rounds
    #[arg(long, default_value_t = 5)]
    max_offset: usize,

    /// Enable threaded overlap index construction (default: off)
    #[arg(long, default_value_t = false)]
    threads: bool,

    /// Number of worker threads for index construction (default: max available - 1)
    #[arg(long, default_value_t = default_workers())]
    max_workers: usize,

    /// Optional file holding the original string, used to report edit distance
    #[arg(long)]
    reference: Option<String>,

    /// Optional output path for the assembled string
    #[arg(long)]
    output: Option<String>,

    /// Optional JSON file receiving one report per instance
    #[arg(long)]
    report_json: Option<String>,

    /// Verbose/info output (default: quiet)
    #[arg(long, short = 'v', alias = "info")]
    verbose: bool,

    /// Debug output
    #[arg(long)]
    debug: bool,

    /// Trace output
    #[arg(long)]
    trace: bool,
}

fn main() {
    let args = Args::parse();
    let log_level = if args.trace {
        "trace"
    } else if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "error"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(error) = run(&args) {
        eprintln!("Assembly failed: {error:?}");
        std::process::exit(1);
    }
}

fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

fn load_reference(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("Reference path {} does not exist", path.display());
    }
    let parts = read_fragments(path)
        .with_context(|| format!("Failed to read reference {}", path.display()))?;
    Ok(parts.concat())
}

fn run(args: &Args) -> Result<()> {
    let input = Path::new(&args.input);
    let reference = args
        .reference
        .as_deref()
        .map(|path| load_reference(Path::new(path)))
        .transpose()?;

    let options = RunOptions {
        target_length: args.target_length,
        max_offset: args.max_offset,
        use_threads: args.threads,
        max_workers: args.max_workers,
        reference,
    };

    let instances = if input.is_dir() {
        scan_instances(input)
            .with_context(|| format!("Failed to scan instances in {}", input.display()))?
    } else {
        vec![Instance::new(input.to_path_buf())]
    };
    info!("Assembling {} input(s) from {}", instances.len(), input.display());

    let mut reports: Vec<InstanceReport> = Vec::with_capacity(instances.len());
    for instance in &instances {
        let report = run_instance(instance, &options)
            .with_context(|| format!("Failed to assemble {}", instance.path.display()))?;
        println!("{}", report.summary());
        debug!("{}: {}", report.instance, report.sequence);
        reports.push(report);
    }

    if let Some(path) = &args.output {
        let path = Path::new(path);
        create_parent_dirs(path)?;
        let mut fh = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for report in &reports {
            if reports.len() > 1 {
                writeln!(fh, ">{}", report.instance)?;
            }
            writeln!(fh, "{}", report.sequence)?;
        }
        info!("Assembled sequence written to {}", path.display());
    }

    if let Some(path) = &args.report_json {
        let path = Path::new(path);
        create_parent_dirs(path)?;
        let mut fh = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writeln!(fh, "{}", serde_json::to_string_pretty(&reports)?)?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
