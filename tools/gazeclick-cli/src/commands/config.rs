//! Show or create the config file.

use std::path::Path;

use gazeclick_common::config::GazeConfig;

pub fn show(config: &GazeConfig, path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        println!("# Loaded from {}", path.display());
    } else {
        println!("# {} does not exist; showing defaults", path.display());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    GazeConfig::default().save_to(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
