//! substate - scripted statechart runner
//!
//! Runs an event script against a hierarchical machine definition and prints
//! the resulting state after every event.

use substate_harness::{output, presets, Config, EventScript, ScriptRunner};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration (from file if SUBSTATE_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("SUBSTATE_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // If a config file was explicitly specified, fail on error
            if std::env::var("SUBSTATE_CONFIG").is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::info!("Using default configuration");
            Config::default()
        }
    };

    let definition = presets::load_machine(&config.machine.definition).map_err(|e| {
        tracing::error!(
            "Failed to load machine {} [{}]: {}",
            config.machine.definition,
            e.error_code(),
            e
        );
        e
    })?;

    let script = match &config.script.path {
        Some(path) => EventScript::from_file(path).map_err(|e| {
            tracing::error!("Failed to load script {} [{}]: {}", path.display(), e.error_code(), e);
            e
        })?,
        None => {
            if definition.id() != "subscription" {
                tracing::warn!(
                    "Built-in script targets the subscription machine, running it against '{}'",
                    definition.id()
                );
            }
            presets::reference_script()?
        }
    };

    tracing::info!("Running substate");
    tracing::info!("  Machine: {} ({})", definition.id(), config.machine.definition);
    tracing::info!("  States: {}", definition.len());
    tracing::info!("  Checksum: {}", definition.checksum);
    tracing::info!(
        "  Script: {} ({} events)",
        config
            .script
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "builtin:reference".to_string()),
        script.events.len()
    );

    let runner = ScriptRunner::new(definition).stop_on_error(config.script.stop_on_error);
    let report = runner.run(&script).map_err(|e| {
        tracing::error!("Run aborted [{}]: {}", e.error_code(), e);
        e
    })?;

    print!("{}", output::render(&report, &config.output)?);

    if report.error_count() > 0 {
        tracing::warn!("{} event(s) failed", report.error_count());
    }
    tracing::info!("Finished in {}", report.final_state());
    Ok(())
}
