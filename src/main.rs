use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use u2net_bgremove::{BackgroundRemover, Config};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    ensure!(
        config.input.exists(),
        "Input file {} does not exist",
        config.input.display()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed}] {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message("Loading model");
    let remover = BackgroundRemover::new(&config.settings())
        .context("Failed to load the background removal model")?;
    log::debug!(
        "Using {} with providers {:?}",
        remover.model_path().display(),
        remover.providers()
    );

    let output_path = config.output_path();
    spinner.set_message(format!("Processing {}", config.input.display()));
    remover
        .remove_background_from_path(&config.input, &output_path)
        .with_context(|| format!("Failed to process image: {}", config.input.display()))?;

    spinner.finish_and_clear();
    println!("Saved background-free image to {}", output_path.display());

    Ok(())
}
