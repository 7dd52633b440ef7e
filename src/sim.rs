use env_logger::Env;
use log::info;
use sim_lib::error::{ConfigError, SimulatorError};
use sim_lib::loader;
use sim_lib::memory::action::{PrintLog, Transfer};
use sim_lib::memory::cache::Cache;
use sim_lib::memory::main_memory::MainMemory;
use sim_lib::run_wrapper::{self, SimPolicy};
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::process;

const USAGE: &str = "usage: sim <trace> -b <block size> -s <sets> \
                     -l <lines per set> [-m <memory image>] [-c <csv>] [-v] [-h]";

/// Parse a geometry parameter. Zero and negative values are
/// configuration errors rather than malformed arguments
fn parse_geometry_arg(
    flag: &str,
    value: Option<String>,
) -> Result<usize, Box<dyn Error>> {
    let value = value.ok_or_else(|| format!("missing {}\n{}", flag, USAGE))?;
    match value.parse::<i64>() {
        Ok(n) if n > 0 => Ok(usize::try_from(n)?),
        Ok(_) => Err(ConfigError::NonPositive.into()),
        Err(_) => Err(format!("invalid number after {}: '{}'", flag, value).into()),
    }
}

fn init_cache(
    block_size: Option<String>,
    num_sets: Option<String>,
    lines_per_set: Option<String>,
) -> Result<Cache, Box<dyn Error>> {
    let block_size = parse_geometry_arg("-b", block_size)?;
    let num_sets = parse_geometry_arg("-s", num_sets)?;
    let lines_per_set = parse_geometry_arg("-l", lines_per_set)?;
    Ok(Cache::init(block_size, num_sets, lines_per_set)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(Env::default().filter_or("CACHESIM_LOG", "warn"));

    let mut args = env::args().skip(1);
    let trace_file: PathBuf = args.next().ok_or(USAGE)?.into();

    let mut policy = SimPolicy::default();
    let mut block_size = None;
    let mut num_sets = None;
    let mut lines_per_set = None;
    let mut image_file: Option<PathBuf> = None;
    let mut csv_file: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" => policy.verbose = true,
            "-h" => policy.history = true,
            "-b" => block_size = args.next(),
            "-s" => num_sets = args.next(),
            "-l" => lines_per_set = args.next(),
            "-m" => {
                let path = args
                    .next()
                    .ok_or("You should specify a memory image after -m")?;
                image_file = Some(path.into());
            }
            "-c" => {
                let path =
                    args.next().ok_or("You should specify a CSV file after -c")?;
                csv_file = Some(path.into());
            }
            _ => {
                return Err(format!("Unknown parameter: {}\n{}", arg, USAGE).into())
            }
        }
    }

    // Configuration errors end the run before any access
    let mut cache = match init_cache(block_size, num_sets, lines_per_set) {
        Ok(cache) => cache,
        Err(e) => {
            println!("error: {}", e);
            process::exit(1);
        }
    };
    println!(
        "Simulating a cache with {} total lines; each line has {} words",
        cache.geometry.num_lines(),
        cache.geometry.block_size
    );
    println!(
        "Each set in the cache contains {} lines; there are {} sets",
        cache.geometry.lines_per_set, cache.geometry.num_sets
    );

    let mut memory = MainMemory::make();
    if let Some(image_file) = &image_file {
        let loaded = loader::load_memory_image(&mut memory, image_file)?;
        info!("loaded {} words from {}", loaded, image_file.display());
    }

    let operations = run_wrapper::fetch_operations(&trace_file)?;
    info!("{} operations in {}", operations.len(), trace_file.display());

    let stdout = std::io::stdout().lock();
    let mut log = (PrintLog::new(stdout), Vec::<Transfer>::new());
    run_wrapper::run_trace(
        &mut cache,
        &mut memory,
        &mut log,
        &operations,
        policy,
    )?;

    let (print_log, transfers) = log;
    print_log.finish().map_err(SimulatorError::IoError)?;

    if let Some(csv_file) = &csv_file {
        run_wrapper::write_transfers_csv(csv_file, &transfers)?;
    }

    Ok(())
}
