use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use bmc_rs::aiger::load_aag;
use bmc_rs::bmc::{run, BmcParams, Verdict};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Input file in ASCII AIGER format.
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Number of frames to check.
    #[clap(short = 'F', long, value_name = "INT", default_value = "100")]
    frames: u32,

    /// Nodes added to the unrolled copy per iteration.
    #[clap(short = 'N', long, value_name = "INT", default_value = "2000")]
    nodes: usize,

    /// Conflict limit per target (0 = no limit).
    #[clap(short = 'C', long, value_name = "INT", default_value = "0")]
    conflicts: u64,

    /// Conflict limit for the whole run (0 = no limit).
    #[clap(short = 'G', long, value_name = "INT", default_value = "0")]
    global_conflicts: u64,

    /// Timeout in seconds.
    #[clap(short = 'T', long, value_name = "SEC")]
    timeout: Option<u64>,

    /// First frame handed to the SAT solver.
    #[clap(short = 'S', long, value_name = "INT", default_value = "0")]
    start: u32,

    /// Print the counterexample in AIGER witness format.
    #[clap(long)]
    witness: bool,

    /// Log every iteration.
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let aig = load_aag(&args.path)?;
    println!("aig = {:?}", aig);

    let mut params = BmcParams::default()
        .with_max_frames(args.frames)
        .with_node_budget(args.nodes)
        .with_conflict_limit(args.conflicts)
        .with_global_conflict_limit(args.global_conflicts)
        .with_start_frame(args.start)
        .with_ternary_frames(args.frames)
        .with_verbose(args.verbose);
    if let Some(secs) = args.timeout {
        params = params.with_timeout(Duration::from_secs(secs));
    }

    let verdict = run(&aig, params)?;
    println!("verdict: {}", verdict);
    if let Verdict::Sat(cex) = &verdict {
        if args.witness {
            println!("{}", cex);
        }
    }

    println!("\nAll done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
