use env_logger::Env;
use sim_lib::error::SimulatorResult;
use sim_lib::memory::cache::Cache;
use sim_lib::memory::main_memory::MainMemory;
use sim_lib::run_wrapper::{fetch_operations, run_trace, Operation, SimPolicy};
use std::error::Error;
use std::path::Path;

// Every geometry gets the same number of lines
const TOTAL_LINES: usize = 32;

const ASSOCIATIVITIES: [usize; 4] = [1, 2, 4, 8];
const BLOCK_SIZES: [usize; 6] = [1, 2, 4, 8, 16, 32];

/// Result of one geometry on the trace
#[derive(Clone, Copy, Debug)]
struct SweepPoint {
    block_size: usize,
    lines_per_set: usize,
    num_sets: usize,
    miss_rate: f64,
    mem_accesses: u64,
}

/// Run the operations against every geometry.
/// For a fixed associativity, vary the block size
fn sweep(operations: &[Operation]) -> SimulatorResult<Vec<SweepPoint>> {
    let mut points = Vec::new();
    for lines_per_set in ASSOCIATIVITIES {
        let num_sets = TOTAL_LINES / lines_per_set;
        for block_size in BLOCK_SIZES {
            let mut cache = Cache::init(block_size, num_sets, lines_per_set)?;
            let mut memory = MainMemory::make();
            let stats = run_trace(
                &mut cache,
                &mut memory,
                &mut (),
                operations,
                SimPolicy::default(),
            )?;
            points.push(SweepPoint {
                block_size,
                lines_per_set,
                num_sets,
                miss_rate: stats.miss_rate,
                mem_accesses: stats.mem_accesses,
            });
        }
    }
    Ok(points)
}

fn write_csv(csv_path: &str, points: &[SweepPoint]) -> SimulatorResult<()> {
    let mut writer = csv::Writer::from_path(csv_path)?;
    writer.write_record([
        "Block size",
        "Lines per set",
        "Sets",
        "Miss rate",
        "Memory accesses",
    ])?;
    for point in points {
        writer.write_record([
            point.block_size.to_string(),
            point.lines_per_set.to_string(),
            point.num_sets.to_string(),
            format!("{:.4}", point.miss_rate),
            point.mem_accesses.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Plot one miss rate series per associativity
fn plot(
    output_path: &str,
    plot_title: &str,
    points: &[SweepPoint],
) -> Result<(), Box<dyn Error>> {
    use plotters::prelude::*;

    let y_max = points.iter().map(|p| p.miss_rate).fold(0., f64::max);

    let root = SVGBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(plot_title, ("sans-serif", 40).into_font())
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(1..32, 0.0..(y_max * 1.1).max(0.01))?;
    ctx.configure_mesh()
        .x_desc("Block size (words)")
        .y_desc("Miss rate")
        .draw()?;

    for (i, lines_per_set) in ASSOCIATIVITIES.iter().enumerate() {
        let series = points
            .iter()
            .filter(|p| p.lines_per_set == *lines_per_set)
            .map(|p| (p.block_size as i32, p.miss_rate));
        let label = format!("{}-way", lines_per_set);
        let color = Palette99::pick(i).to_rgba();
        ctx.draw_series(LineSeries::new(series, color))?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color)
            });
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(Env::default().filter_or("CACHESIM_LOG", "warn"));

    let param_tokens: Vec<String> = std::env::args().collect();
    let trace_path =
        param_tokens.get(1).ok_or("You should specify exactly one trace file")?;
    let operations = fetch_operations(Path::new(trace_path))?;

    let points = sweep(&operations)?;

    let trace_base_name = Path::new(trace_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| trace_path.clone());
    std::fs::create_dir_all("eval")?;

    let csv_path = format!("eval/sweep_eval_{}.csv", trace_base_name);
    write_csv(&csv_path, &points)?;

    let plot_title =
        format!("Miss rate, {} lines: {}", TOTAL_LINES, trace_base_name);
    let output_path = format!("eval/sweep_eval_{}.svg", trace_base_name);
    plot(&output_path, &plot_title, &points)?;

    Ok(())
}
