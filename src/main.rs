use anyhow::{Context, Result};
use qregvar::config::AppConfig;
use qregvar::data::{CsvReturnSource, ForecastExporter, ReturnSource, SyntheticGarchSource};
use qregvar::engines::VarPipeline;
use std::path::PathBuf;

const USAGE: &str = "usage: qregvar [DATA_CSV] [CONFIG_TOML]";

/// Length and seed of the demo series used when no data file is given.
const SYNTHETIC_OBSERVATIONS: usize = 2500;
const SYNTHETIC_SEED: u64 = 42;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") || args.len() > 2 {
        println!("{}", USAGE);
        return Ok(());
    }

    let data_path = args.first().map(PathBuf::from);
    let config_path = args.get(1).map(PathBuf::from);

    let config = AppConfig::load_layered(config_path.as_deref())
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let source: Box<dyn ReturnSource> = match data_path.or_else(|| config.data.input_path.clone()) {
        Some(path) => Box::new(CsvReturnSource::new(path, config.data.clone())),
        None => {
            log::info!("No data file given, using a synthetic GARCH(1,1) series");
            Box::new(SyntheticGarchSource::new(SYNTHETIC_OBSERVATIONS, SYNTHETIC_SEED))
        }
    };

    let output_dir = config.data.output_dir.clone();
    let pipeline = VarPipeline::new(config).context("Invalid configuration")?;
    let report = pipeline
        .run(source.as_ref())
        .with_context(|| format!("Pipeline failed for {}", source.describe()))?;

    print!("{}", report);

    if let Some(dir) = output_dir {
        ForecastExporter::write_all(&report, &dir)
            .with_context(|| format!("Failed to write outputs to {}", dir.display()))?;
    }

    Ok(())
}
