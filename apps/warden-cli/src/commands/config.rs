// config.rs — Print the effective configuration.

use std::path::Path;

use warden_core::WardenConfig;

pub fn execute(path: Option<&Path>) -> anyhow::Result<()> {
    print!("{}", render(path)?);
    Ok(())
}

/// `load` validates; the defaults are valid by construction.
fn render(path: Option<&Path>) -> anyhow::Result<String> {
    let config = match path {
        Some(path) => WardenConfig::load(path)?,
        None => WardenConfig::default(),
    };
    Ok(config.to_toml()?)
}
