pub mod parser;
pub mod reader;

pub use parser::{parse_config, Settings};
pub use reader::{read_config, Config};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[clap(about = "Mirror git repositories from one host to another")]
pub struct Args {
    /// Path to the migration configuration.
    #[clap(parse(from_os_str), default_value = "config.yaml")]
    pub config: PathBuf,
}

pub fn run() -> Result<Settings> {
    let args = Args::parse();
    load(&args.config)
}

/// Read, parse and validate the configuration at `path`.
pub fn load(path: &Path) -> Result<Settings> {
    let result = std::fs::read_to_string(path)
        .with_context(|| format!("could not read file `{}`", path.display()))?;

    let content = read_config(&result)
        .with_context(|| format!("could not parse `{}`", path.display()))?;
    let settings = parse_config(content)?;

    Ok(settings)
}
