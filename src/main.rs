//! demogen - Demonstration Augmentation Engine
//!
//! Turns a handful of recorded robot manipulation demonstrations into a
//! large synthetic dataset by re-synthesizing them under sampled spatial
//! offsets.

use demogen::app::cli::{Cli, Commands, ConfigAction};
use demogen::app::config::Config;
use demogen::dataset::assembler::JsonDatasetStore;
use demogen::dataset::episode::load_episodes;
use demogen::parsing::{FrameParser, ParserThresholds};
use demogen::workflow::{DemoGenerator, TaskShape};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Initialize tracing (--verbose enables debug-level output)
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    match cli.command {
        Commands::Generate {
            input,
            output,
            demos,
        } => {
            run_generate(&input, output, demos, &config)?;
        }
        Commands::Inspect { input, detailed } => {
            run_inspect(&input, detailed, &config)?;
        }
        Commands::Init { force } => {
            run_init(force, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, &config)?;
        }
    }

    Ok(())
}

fn run_generate(
    input: &std::path::Path,
    output: Option<std::path::PathBuf>,
    demos: Option<usize>,
    config: &Config,
) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Source episode file not found: {:?}", input);
    }

    let sources = load_episodes(input)?;
    info!("Loaded {} source episodes from {:?}", sources.len(), input);

    let mut settings = config.generation_settings();
    if let Some(n) = demos {
        settings.demos_per_source = n;
    }
    let total = settings.demos_per_source * sources.len();

    let generator = DemoGenerator::new(settings)?;
    let masks = config.mask_source();

    let output_path = output.unwrap_or_else(|| {
        Cli::datasets_dir().join(format!(
            "{}_x{}.json",
            input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dataset".to_string()),
            total
        ))
    });

    let store = JsonDatasetStore::new(&output_path);
    generator.generate_to_store(&sources, &masks, &store)?;

    println!("\nDataset generated successfully!");
    println!("  Source episodes: {}", sources.len());
    println!("  Synthetic episodes: {}", total);
    println!("  Output: {:?}", output_path);

    Ok(())
}

fn run_inspect(
    input: &std::path::Path,
    detailed: bool,
    config: &Config,
) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Source episode file not found: {:?}", input);
    }

    let sources = load_episodes(input)?;
    println!("Source file {:?}: {} episodes", input, sources.len());

    let settings = config.generation_settings();
    let parser = match settings.boundaries {
        demogen::workflow::BoundarySource::Parsed { mode, thresholds } => {
            Some(FrameParser::new(mode, thresholds))
        }
        demogen::workflow::BoundarySource::Manual(ref all) => {
            for (i, b) in all.iter().enumerate() {
                println!("  episode {i}: manual boundaries {b:?}");
            }
            None
        }
    };

    let masks = config.mask_source();
    for (i, episode) in sources.iter().enumerate() {
        let points = episode.clouds.first().map(|c| c.len()).unwrap_or(0);
        println!(
            "  episode {i}: {} frames, {} points per cloud",
            episode.len(),
            points
        );

        if detailed {
            for frame in 0..episode.len() {
                let pos = episode.state_position(frame)?;
                println!("    frame {frame}: ee at {pos}");
            }
        }

        if let Some(parser) = &parser {
            let result = match config.task.shape {
                TaskShape::OneObject => parser
                    .parse_one_stage(i, episode, &masks)
                    .map(|f| format!("skill_1 = {f}")),
                TaskShape::TwoObject => parser
                    .parse_two_stage(i, episode, &masks)
                    .map(|b| format!("{b:?}")),
            };
            match result {
                Ok(desc) => println!("    parsed boundaries: {desc}"),
                Err(e) => println!("    parsing failed: {e}"),
            }
        }
    }

    // Show the thresholds in play so tuning is visible
    let t = ParserThresholds {
        arrive_object: config.parsing.arrive_object,
        depart_object: config.parsing.depart_object,
        arrive_target: config.parsing.arrive_target,
    };
    println!(
        "Parser: mode {:?}, one-stage arrive {}, two-stage {:?}",
        config.parsing.mode, config.parsing.one_stage_arrive, t
    );

    Ok(())
}

fn run_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = Config::default_path();

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    config.save_default()?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    std::fs::create_dir_all(Cli::datasets_dir())?;
    println!("Created dataset directory: {:?}", Cli::datasets_dir());

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", Config::default_path());
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Reset { force } => {
            let config_path = Config::default_path();

            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            Config::default().save_default()?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}
