//! Voronoi painter CLI - Evolve a Voronoi painting toward a target image.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use voronoi_painter::{
    compute::{
        TargetImage,
        evolution::{EvolutionEngine, OutputWriter, PopulationCheckpoint},
    },
    schema::EvolutionConfig,
};

fn usage(program: &str) {
    eprintln!("Usage: {} <target-image> [config.json] [--resume checkpoint.json]", program);
    eprintln!();
    eprintln!("Evolve a Voronoi painting that approximates the target image.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  target-image  PNG or JPEG image to approximate");
    eprintln!("  config.json   Evolution configuration (default: built-in schedule)");
    eprintln!("  --resume      Continue from a population checkpoint");
    eprintln!();
    eprintln!("Example configuration is generated with --example flag.");
}

fn exit_with(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("{context}: {err}");
    std::process::exit(1);
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.get(1).is_some_and(|a| a == "--example") {
        print_example_config();
        return;
    }
    if args.len() < 2 {
        usage(&args[0]);
        std::process::exit(1);
    }

    let target_path = PathBuf::from(&args[1]);
    let mut config_path = None;
    let mut resume_path = None;
    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--resume" => match rest.next() {
                Some(path) => resume_path = Some(PathBuf::from(path)),
                None => {
                    usage(&args[0]);
                    std::process::exit(1);
                }
            },
            path => config_path = Some(PathBuf::from(path)),
        }
    }

    // Load configuration
    let config: EvolutionConfig = match &config_path {
        Some(path) => {
            let config_str = fs::read_to_string(path)
                .unwrap_or_else(|e| exit_with("Error reading config file", e));
            serde_json::from_str(&config_str).unwrap_or_else(|e| exit_with("Error parsing config", e))
        }
        None => EvolutionConfig::default(),
    };

    let target = TargetImage::open(&target_path)
        .map(Arc::new)
        .unwrap_or_else(|e| exit_with("Error loading target image", e));

    println!("Voronoi Painter");
    println!("===============");
    println!("Target: {} ({}x{})", target_path.display(), target.width(), target.height());
    println!(
        "Population: {} x {} points",
        config.population_size, config.num_points
    );
    println!(
        "Schedule: {} stages, {} generations",
        config.stages.len(),
        config.total_generations()
    );
    println!("Output: {}", config.output.dir.display());
    println!();

    let output = OutputWriter::new(&config.output)
        .unwrap_or_else(|e| exit_with("Error creating output directory", e));

    let engine = match &resume_path {
        Some(path) => {
            let checkpoint = PopulationCheckpoint::load(path)
                .unwrap_or_else(|e| exit_with("Error loading checkpoint", e));
            println!("Resuming from generation {}", checkpoint.generation);
            EvolutionEngine::resume(config, target, checkpoint)
        }
        None => EvolutionEngine::new(config, target),
    };
    let mut engine = engine
        .unwrap_or_else(|e| exit_with("Error starting evolution", e))
        .with_output(output);

    println!("Running evolution...");
    let start = Instant::now();
    let report_every = (engine.config().total_generations() / 100).max(1);

    let result = engine
        .run_with_callback(|progress| {
            if progress.generation % report_every == 0 {
                println!(
                    "  Generation {}/{} [{}]: best={:.0}, avg={:.0}, points={}, {:.1}s",
                    progress.generation,
                    progress.total_generations,
                    progress.stage_name,
                    progress.best_fitness,
                    progress.avg_fitness,
                    progress.num_points,
                    start.elapsed().as_secs_f32()
                );
            }
        })
        .unwrap_or_else(|e| exit_with("Evolution failed", e));

    if let Some(best) = engine.best() {
        let path = engine.config().output.dir.join("best.png");
        best.painting
            .render(engine.config().output.render_scale)
            .save(&path)
            .unwrap_or_else(|e| exit_with("Error saving final render", e));
        let checkpoint = engine.config().output.dir.join("final.json");
        engine
            .snapshot()
            .save(&checkpoint)
            .unwrap_or_else(|e| exit_with("Error saving final checkpoint", e));
        println!();
        println!("Best painting: {} ({} points)", path.display(), best.painting.num_points());
    }

    let stats = &result.stats;
    println!();
    println!("Stopped: {:?}", stats.stop_reason);
    println!("Generations: {}", stats.generations);
    println!("Best fitness: {:.0}", stats.best_fitness);
    println!("Final average fitness: {:.0}", stats.final_avg_fitness);
    println!(
        "Time: {:.2}s ({:.1} evaluations/s)",
        stats.elapsed_seconds,
        stats.total_evaluations as f64 / stats.elapsed_seconds.max(f64::EPSILON)
    );
}

fn print_example_config() {
    let config = EvolutionConfig::default();
    let json = serde_json::to_string_pretty(&config)
        .unwrap_or_else(|e| exit_with("Error serializing config", e));

    println!("Example configuration (config.json):");
    println!("{json}");
}
