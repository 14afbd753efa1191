use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use grid_navigate::map_io::{load_ros_map, save_overlay_image};
use grid_navigate::planner::{format_duration, timeout_report};
use grid_navigate::{AlgoResult, Algorithm, AlgorithmSelection, Cell, Graph, OccupancyGrid, PlannerConfig, run_algorithm};


/// Test different path planning algorithms on a ROS map
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Map yaml filepath
    #[arg(short, long)]
    file: PathBuf,

    /// Size of obstacle boundaries
    #[arg(short, long, default_value_t = 3)]
    inflate_size: usize,

    /// One of bfs, a-star, rrt-star, all
    #[arg(short, long, default_value = "all")]
    algorithm: AlgorithmSelection,

    /// Iteration limit for sample-based methods
    #[arg(short = 'l', long = "iter-limit", default_value_t = 10_000)]
    max_iter: usize,

    /// Start position as "x,y"
    #[arg(short, long = "start-pos", value_parser = parse_cell)]
    start: Cell,

    /// End position as "x,y"
    #[arg(short, long = "end-pos", value_parser = parse_cell)]
    end: Cell,

    /// Per-algorithm timeout in milliseconds
    #[arg(short, long, default_value_t = 600_000)]
    timeout: u64,

    /// Fixed RRT* seed
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for overlay images
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print paths and paint travelled cells
    #[arg(short, long)]
    debug: bool,
}

fn parse_cell(s: &str) -> Result<Cell, String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected \"x,y\", got {s:?}"))?;
    let x = x.trim().parse().map_err(|_| format!("{x:?} is not an integer"))?;
    let y = y.trim().parse().map_err(|_| format!("{y:?} is not an integer"))?;
    Ok(Cell::new(x, y))
}

fn print_result(result: &AlgoResult, debug: bool) {
    let (elapsed, unit) = format_duration(result.elapsed);
    println!("{}", result.algorithm);
    println!("Elapsed Time: {elapsed} {unit}");

    if result.algorithm == Algorithm::RrtStar && !result.goal_reached {
        println!("Goal could not be reached. Please check the following:");
        println!("\tstart point\n\tend point\n\t# of max iterations");
        return;
    }

    println!("# of Nodes: {}", result.path.len());
    if debug {
        let cells: Vec<String> = result.path.iter().map(Cell::to_string).collect();
        println!("Path: [{}]", cells.join(", "));
    }
    println!("Distance: {}", result.cost);
}

fn save_overlay(dir: &Path, map: &OccupancyGrid, result: &AlgoResult, start: Cell, end: Cell, debug: bool) {
    let overlay = if debug {
        map.debug_overlay(&result.path, &result.travelled, start, end)
    } else {
        map.with_path(&result.path, start, end)
    };

    let name = match result.algorithm {
        Algorithm::Bfs => "bfs",
        Algorithm::AStar => "a_star",
        Algorithm::RrtStar => "rrt_star",
    };
    let path = dir.join(format!("{}{name}.png", if debug { "debug_" } else { "" }));
    match save_overlay_image(&overlay, &path) {
        Ok(()) => info!("Saved {}", path.display()),
        Err(e) => error!("Could not save {}: {e}", path.display()),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = PlannerConfig {
        timeout: Duration::from_millis(args.timeout),
        max_iterations: args.max_iter,
        inflate_size: args.inflate_size,
        seed: args.seed,
    };

    let map = match load_ros_map(&args.file) {
        Ok(map) => map.inflate(config.inflate_size),
        Err(e) => {
            error!("Could not load map {}: {e}", args.file.display());
            return ExitCode::FAILURE;
        }
    };
    let graph = Graph::from_grid(&map);

    let mut valid = true;
    if !graph.is_node_valid(args.start) {
        println!("Start node: {} is invalid", args.start);
        valid = false;
    }
    if !graph.is_node_valid(args.end) {
        println!("End node: {} is invalid", args.end);
        valid = false;
    }
    if !valid {
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &args.output {
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!("Could not create {}: {e}", dir.display());
            return ExitCode::FAILURE;
        }
    }

    let mut results = Vec::new();
    for algorithm in args.algorithm.algorithms() {
        let result = match run_algorithm(&graph, algorithm, args.start, args.end, &config) {
            Ok(result) => result,
            Err(e) => {
                error!("{algorithm} failed: {e}");
                return ExitCode::FAILURE;
            }
        };
        print_result(&result, args.debug);
        if let Some(dir) = &args.output {
            save_overlay(dir, &map, &result, args.start, args.end, args.debug);
        }
        results.push(result);
    }

    let report = timeout_report(&results, config.timeout);
    if !report.is_empty() {
        print!("{report}");
    }
    ExitCode::SUCCESS
}
