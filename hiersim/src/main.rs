use std::fs::File;
use std::io::{self, BufRead};
use std::time::Instant;
use clap::{Parser, ValueEnum};
use hierlib::config::{HierarchyConfig, LevelConfig};
use hierlib::io::get_reader;
use hierlib::simulator::{SimulationResult, Simulator};
use tracing_subscriber::{fmt, EnvFilter};

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(about = String::from("Trace driven simulator for a split L1 and unified L2 cache hierarchy"))]
struct Args {
    /// Trace file with one `<hex address> <I|D>` access per line, standard input when omitted or -
    trace: Option<String>,

    /// JSON hierarchy configuration, the flags below override it
    #[arg(short, long)]
    config: Option<String>,

    #[arg(long, value_name = "SETS:ASSOC:HIT_TIME")]
    icache: Option<LevelConfig>,

    #[arg(long, value_name = "SETS:ASSOC:HIT_TIME")]
    dcache: Option<LevelConfig>,

    #[arg(long, value_name = "SETS:ASSOC:HIT_TIME")]
    l2cache: Option<LevelConfig>,

    /// Keep every L1 line resident in the L2
    #[arg(long, overrides_with = "no_inclusive")]
    inclusive: bool,

    /// Let the L2 evict lines the L1s still hold, even if the config file is inclusive
    #[arg(long, overrides_with = "inclusive")]
    no_inclusive: bool,

    /// Block size in bytes, shared by every level
    #[arg(long)]
    blocksize: Option<u32>,

    /// Main memory latency in cycles
    #[arg(long)]
    memspeed: Option<u32>,

    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,
}

impl Args {
    fn hierarchy_config(&self) -> Result<HierarchyConfig, String> {
        let mut config = match &self.config {
            Some(path) => HierarchyConfig::from_file(path).map_err(|e| format!("Couldn't load the config file: {e}"))?,
            None => HierarchyConfig::default(),
        };
        if let Some(icache) = self.icache {
            config.icache = icache;
        }
        if let Some(dcache) = self.dcache {
            config.dcache = dcache;
        }
        if let Some(l2) = self.l2cache {
            config.l2 = l2;
        }
        if let Some(block_size) = self.blocksize {
            config.block_size = block_size;
        }
        if let Some(memory_latency) = self.memspeed {
            config.memory_latency = memory_latency;
        }
        if self.inclusive {
            config.inclusive = true;
        } else if self.no_inclusive {
            config.inclusive = false;
        }
        Ok(config)
    }
}

fn run<R: BufRead>(simulator: &mut Simulator, reader: R) -> Result<SimulationResult, String> {
    simulator.simulate(reader).map_err(|e| format!("Couldn't simulate the trace: {e}"))
}

fn main() -> Result<(), String> {
    fmt::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let start = Instant::now();
    let args = Args::parse();
    let config = args.hierarchy_config()?;
    let mut simulator = Simulator::new(&config).map_err(|e| format!("Invalid configuration: {e}"))?;
    tracing::info!(trace = args.trace.as_deref().unwrap_or("-"), "simulating trace");
    let result = match args.trace.as_deref() {
        None | Some("-") => run(&mut simulator, io::stdin().lock())?,
        Some(path) => {
            let trace_file = File::open(path).map_err(|e| format!("Couldn't open the trace file at path {path}: {e}"))?;
            let reader = get_reader(trace_file).map_err(|e| format!("Couldn't open the trace file at path {path}: {e}"))?;
            run(&mut simulator, reader)?
        }
    };
    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result).map_err(|e| format!("Couldn't serialise the output {e}"))?),
        Format::Text => print!("{result}"),
    }
    if args.performance {
        let end = Instant::now();
        let simulation_time = simulator.get_execution_time();
        let total_time = end - start;
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!("Total execution time (includes initial parsing, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {config:?}");
        let resident_lines = simulator.get_resident_line_counts();
        let formatted = resident_lines
            .iter()
            .map(|(name, count)| format!("{name}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Resident cache lines by level: ({formatted})");
        println!("Total resident cache lines: {}", resident_lines.iter().map(|(_, count)| count).sum::<usize>());
        let hierarchy = simulator.hierarchy();
        if config.inclusive && config.l2.is_present() && !hierarchy.check_inclusion() {
            return Err("Inclusion violated: an L1 holds a line the L2 doesn't".to_string());
        }
        println!("L1 lines also resident in the L2: {}", hierarchy.check_inclusion());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/alpha_inclusive.json");

    fn config(args: &[&str]) -> HierarchyConfig {
        let args = Args::try_parse_from(["hiersim"].iter().chain(args).copied()).unwrap();
        args.hierarchy_config().unwrap()
    }

    #[test]
    fn inclusion_follows_the_config_file_unless_overridden() {
        assert!(config(&["-c", CONFIG]).inclusive);
        assert!(!config(&["-c", CONFIG, "--no-inclusive"]).inclusive);
        assert!(config(&["--inclusive"]).inclusive);
        assert!(!config(&[]).inclusive);
        // The last of the two flags wins
        assert!(!config(&["-c", CONFIG, "--inclusive", "--no-inclusive"]).inclusive);
        assert!(config(&["--no-inclusive", "--inclusive"]).inclusive);
    }

    #[test]
    fn level_flags_override_the_config_file() {
        let config = config(&["-c", CONFIG, "--l2cache", "0:0:0", "--memspeed", "120"]);
        assert_eq!(config.l2, LevelConfig::ABSENT);
        assert_eq!(config.icache, LevelConfig::new(512, 2, 2));
        assert_eq!(config.memory_latency, 120);
    }
}
