//! Encosy Runtime
//!
//! Minimal binary that boots logging and settings, then pushes the configured
//! sample values through a converter registry.

mod settings;

use anyhow::{bail, Result};
use encosy_core::variant::ConverterRegistry;
use settings::RuntimeSettings;
use std::path::PathBuf;

fn main() -> Result<()> {
    let settings = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => RuntimeSettings::load(&path)?,
        None => RuntimeSettings::default(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(settings.level()?)
        .init();

    tracing::info!("Encosy Runtime v{}", encosy_core::VERSION);

    let registry = ConverterRegistry::new();
    for sample in &settings.samples {
        let variant = sample.pack(&registry)?;
        if !sample.matches(&registry, &variant) {
            bail!("sample {sample:?} did not survive a round trip");
        }
        tracing::info!(
            tag = %variant.tag(),
            storage = ?variant.storage_kind(),
            "{}",
            registry.stringify(&variant)
        );
    }

    let stats = registry.stats();
    tracing::info!(
        converters = registry.len(),
        lookups = stats.lookups,
        resolutions = stats.resolutions,
        failures = stats.failures,
        "registry ready"
    );

    Ok(())
}
