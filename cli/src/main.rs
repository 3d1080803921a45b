use clap::{Parser, Subcommand};
use eda_common::db::layout::Layout;
use eda_common::util::config::Config;
use eda_common::util::{generator, logger, visualization};
use eda_router::{StrategyRegistry, verify};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Route the design named in the [input] section.
    Route,
    /// Write a random routing problem in the demo technology.
    Generate {
        #[arg(long, default_value_t = 20)]
        nets: usize,
        #[arg(long, default_value_t = 10)]
        obstacles: usize,
        #[arg(long, default_value_t = 200.0)]
        die: f64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, default_value = "inputs/design.toml")]
        output: String,
    },
    /// List the registered routing strategies.
    Strategies,
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    match args.command.unwrap_or(Commands::Route) {
        Commands::Generate {
            nets,
            obstacles,
            die,
            seed,
            output,
        } => {
            prepare_output_dir(&output)?;
            log::info!(
                "Generating random benchmark (Nets: {}, Obstacles: {}, Die: {:.0}, Seed: {})...",
                nets,
                obstacles,
                die,
                seed
            );
            let layout = generator::generate_random_design(nets, obstacles, die, seed);
            save_layout(&layout, &output)?;
            log::info!("Generated: {}", output);
        }
        Commands::Route => {
            if !Path::new(&config.input.design_file).exists() {
                return Err(anyhow::anyhow!(
                    "Design file missing: '{}'. Did you run 'generate'?",
                    config.input.design_file
                ));
            }
            prepare_output_dir(&config.input.output_file)?;

            if let Err(e) = run_routing(&config) {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Strategies => {
            for name in StrategyRegistry::new().names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent() {
        if !parent.exists() && !parent.as_os_str().is_empty() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn load_layout(path: &str) -> anyhow::Result<Layout> {
    log::info!("Reading design: {}", path);
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read design '{}': {}", path, e))?;
    toml::from_str(&text).map_err(|e| anyhow::anyhow!("Invalid design TOML in '{}': {}", path, e))
}

fn save_layout(layout: &Layout, path: &str) -> anyhow::Result<()> {
    let text = toml::to_string(layout)?;
    std::fs::write(path, text)?;
    Ok(())
}

fn run_routing(config: &Config) -> anyhow::Result<()> {
    let mut layout = load_layout(&config.input.design_file)?;

    let summary = eda_router::route(&mut layout, config)?;
    log::info!(
        "Routing finished in {:?}: {}/{} nets, {} errors",
        summary.elapsed,
        summary.nets_routed,
        summary.nets_attempted,
        summary.errors.len()
    );

    log::info!("Writing routed design to {}", config.input.output_file);
    save_layout(&layout, &config.input.output_file)?;

    if let Some(image) = &config.input.image_file {
        log::info!("Generating routed visualization...");
        prepare_output_dir(image)?;
        visualization::draw_layout(&layout, image, config.input.image_size)?;
    }

    let report = verify::run(&layout)?;
    if !report.is_clean() {
        return Err(anyhow::anyhow!(
            "Verification failed with {} violations",
            report.violations()
        ));
    }
    if !summary.is_complete() {
        log::warn!(
            "{} nets left unrouted: {}",
            summary.failed_nets.len(),
            summary.failed_nets.join(", ")
        );
    }
    Ok(())
}
