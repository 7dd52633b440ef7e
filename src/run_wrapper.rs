//! A simulator wrapper

use std::path::Path;

use crate::error::SimulatorResult;
use crate::error::TraceError;
use crate::loader::parse_word;
use crate::memory::action::{ActionLog, Transfer};
use crate::memory::cache::{Cache, CacheHistory};
use crate::memory::main_memory::MainMemory;
use crate::memory::Word;

/// One memory reference issued by the processor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Load(u32),
    Store(u32, Word),
}

/// Simulation policy
#[derive(Clone, Copy, Default)]
pub struct SimPolicy {
    /// Dump the cache after every access
    pub verbose: bool,
    /// Print end of run statistics
    pub history: bool,
}

/// End of run statistics
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunStats {
    pub history: CacheHistory,
    pub miss_rate: f64,
    pub mem_accesses: u64,
}

fn parse_address(
    trace_path: &Path,
    line_num: usize,
    token: &str,
) -> SimulatorResult<u32> {
    let address = match token.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => token.parse::<u32>(),
    };
    address.map_err(|_| {
        TraceError::ParseError(
            trace_path.into(),
            line_num,
            format!("invalid address '{}'", token),
        )
        .into()
    })
}

/// Parse trace content.
///
/// Each line is `r <address>` or `w <address> <data>`.
/// Blank lines and text after `#` are ignored.
pub fn parse_operations(
    trace_path: &Path,
    content: &str,
) -> SimulatorResult<Vec<Operation>> {
    let mut operations: Vec<Operation> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let line_num = i + 1;
        let line = line.split('#').next().unwrap_or_default();
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        let operation = match parts.as_slice() {
            ["r", address] => {
                Operation::Load(parse_address(trace_path, line_num, address)?)
            }
            ["w", address, data] => {
                let address = parse_address(trace_path, line_num, address)?;
                let data = parse_word(data).ok_or_else(|| {
                    TraceError::ParseError(
                        trace_path.into(),
                        line_num,
                        format!("invalid data word '{}'", data),
                    )
                })?;
                Operation::Store(address, data)
            }
            _ => {
                return Err(TraceError::ParseError(
                    trace_path.into(),
                    line_num,
                    "expected 'r address' or 'w address data'".to_string(),
                )
                .into())
            }
        };
        operations.push(operation);
    }

    Ok(operations)
}

/// Fetch operations from the trace file
pub fn fetch_operations(trace_path: &Path) -> SimulatorResult<Vec<Operation>> {
    let content = std::fs::read_to_string(trace_path)
        .map_err(|e| TraceError::FileReadError(trace_path.into(), e))?;
    parse_operations(trace_path, &content)
}

/// Run the operations through the cache
pub fn run_trace(
    cache: &mut Cache,
    memory: &mut MainMemory,
    log: &mut impl ActionLog,
    operations: &[Operation],
    policy: SimPolicy,
) -> SimulatorResult<RunStats> {
    for operation in operations {
        match *operation {
            Operation::Load(address) => {
                let word = cache.load(memory, log, address)?;
                if policy.verbose {
                    eprintln!("[VERBOSE] load {} -> {}", address, word);
                }
            }
            Operation::Store(address, word) => {
                cache.store(memory, log, address, word)?;
                if policy.verbose {
                    eprintln!("[VERBOSE] store {} <- {}", address, word);
                }
            }
        }
        if policy.verbose {
            eprintln!("{}", cache);
        }
    }

    cache.verify_invariants()?;

    let stats = RunStats {
        history: cache.history,
        miss_rate: cache.get_miss_rate(),
        mem_accesses: memory.get_num_accesses(),
    };

    if policy.history {
        eprintln!(
            "[HISTORY] hits = {}, misses = {}, miss rate = {:.3}",
            stats.history.num_hit, stats.history.num_miss, stats.miss_rate
        );
        eprintln!(
            "[HISTORY] write-backs = {}, discards = {}",
            stats.history.num_writeback, stats.history.num_discard
        );
        eprintln!("[HISTORY] memory accesses = {}", stats.mem_accesses);
    }

    Ok(stats)
}

/// Write a recorded transfer log as CSV
pub fn write_transfers_csv(
    output_path: &Path,
    transfers: &[Transfer],
) -> SimulatorResult<()> {
    let mut writer = csv::Writer::from_path(output_path)?;
    writer.write_record(["Start", "End", "Size", "Transfer"])?;
    for transfer in transfers {
        writer.write_record([
            transfer.address.to_string(),
            transfer.last_address().to_string(),
            transfer.size.to_string(),
            format!("{:?}", transfer.kind),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
