//! CLI subcommands: effects, apply, init, config, logs, and config loading.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use super::LogCommands;
use crate::config::Config;
use crate::effects::{EffectCatalog, FilterChainBuilder};
use crate::logging;
use crate::pipeline::{
    ArtifactStore, FfmpegEngine, FileSource, TransformPipeline, TransformResult,
};
use crate::utils::format_bytes;

/// Load configuration from file or defaults
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config = if let Some(path) = config_path {
        tracing::info!("Loading configuration from custom path: {}", path);
        Config::load_from_path(path)?
    } else {
        tracing::debug!("Loading default configuration");
        Config::load()?
    };

    config.validate()?;

    Ok(config)
}

/// List effects with their compiled filter graphs
pub(crate) fn cmd_effects(json: bool) -> Result<()> {
    let catalog = EffectCatalog::global();
    let builder = FilterChainBuilder::default();

    if json {
        let mut entries = Vec::with_capacity(catalog.len());
        for effect in catalog.iter() {
            let graph = builder
                .build(effect.chain)
                .with_context(|| format!("Effect {} has an invalid chain", effect.id))?;
            entries.push(serde_json::json!({
                "id": effect.id.as_str(),
                "label": effect.label,
                "description": effect.description,
                "operations": effect.chain,
                "filter": graph.as_str(),
            }));
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("🎛 VoiceMorph Effects\n");
    for effect in catalog.iter() {
        let graph = builder
            .build(effect.chain)
            .with_context(|| format!("Effect {} has an invalid chain", effect.id))?;
        println!("{:<18} {}", effect.id.as_str(), effect.label);
        println!("{:<18} {}", "", effect.description);
        println!("{:<18} {}\n", "", graph);
    }

    Ok(())
}

/// Run one effect over a local file
pub(crate) async fn cmd_apply(
    config: &Config,
    effect: &str,
    input: &Path,
    output: &Path,
) -> Result<()> {
    let definition = EffectCatalog::global().resolve(effect)?;
    if !input.is_file() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let store = Arc::new(
        ArtifactStore::new(&config.storage.temp_dir).with_context(|| {
            format!(
                "Failed to create temp directory {}",
                config.storage.temp_dir.display()
            )
        })?,
    );
    let engine = FfmpegEngine::discover(config.engine.ffmpeg_path.as_deref())?;
    let pipeline = TransformPipeline::new(
        store,
        Arc::new(FileSource),
        Arc::new(engine),
        config.pipeline_settings(),
    );

    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let request = pipeline.prepare(
        definition.id.as_str(),
        &input.to_string_lossy(),
        extension,
    );

    let outcome = match pipeline.execute(&request).await {
        TransformResult::Success {
            output: produced,
            degraded,
        } => tokio::fs::copy(&produced, output)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))
            .map(|bytes| (bytes, degraded)),
        TransformResult::Failure { kind, detail } => {
            Err(anyhow::anyhow!("{} failed ({}): {}", definition.id, kind, detail))
        }
    };
    request.dispose().await;

    let (bytes, degraded) = outcome?;
    if degraded {
        println!(
            "⚠️  {} could not be applied; wrote a re-encoded copy of the input",
            definition.label
        );
    } else {
        println!("✅ {} applied", definition.label);
    }
    println!("   {} ({})", output.display(), format_bytes(bytes));

    Ok(())
}

/// Initialize configuration file
pub(crate) fn cmd_init(force: bool) -> Result<()> {
    println!("🎙 VoiceMorph Configuration Initialization\n");

    let config_path =
        Config::system_config_path().context("Could not determine config directory")?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    Config::default().save(&config_path)?;

    println!("✅ Configuration initialized at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set TELEGRAM_BOT_TOKEN (or add it under [telegram])");
    println!("   2. Make sure ffmpeg is installed or set engine.ffmpeg_path");
    println!("   3. Run 'voicemorph' to start the bot");

    Ok(())
}

/// Show configuration
pub(crate) fn cmd_config(config: &Config, show_secrets: bool) -> Result<()> {
    println!("🎙 VoiceMorph Configuration\n");

    if show_secrets {
        println!("{:#?}", config);
        return Ok(());
    }

    println!("Log level: {}", config.logging.level);
    if let Some(ref file) = config.logging.file {
        println!("Log file: {}", file.display());
    }

    println!("\nTelegram:");
    println!("  Enabled: {}", config.telegram.enabled);
    println!(
        "  Bot token: {}",
        if config.telegram.token.is_some() {
            "[SET]"
        } else {
            "[NOT SET]"
        }
    );
    if config.telegram.allowed_users.is_empty() {
        println!("  Allowed users: everyone");
    } else {
        println!("  Allowed users: {:?}", config.telegram.allowed_users);
    }
    println!(
        "  Max file size: {}",
        format_bytes(config.telegram.max_file_bytes)
    );

    let engine = &config.engine;
    println!("\nEngine:");
    match engine.ffmpeg_path {
        Some(ref path) => println!("  ffmpeg: {}", path.display()),
        None => println!("  ffmpeg: (from PATH)"),
    }
    println!(
        "  Output: {} {} {} Hz, {} channel(s), .{}",
        engine.codec,
        engine.bitrate,
        engine.sample_rate,
        engine.channels,
        engine.encoding().extension()
    );
    println!("  Timeout: {}s", engine.timeout_secs);
    println!("  Fallback: {:?}", engine.fallback);

    println!("\nTemp dir: {}", config.storage.temp_dir.display());
    if config.gateway.enabled {
        println!("Liveness endpoint: http://{}", config.gateway.address());
    } else {
        println!("Liveness endpoint: disabled");
    }

    println!("\n💡 Use --show-secrets to display the bot token");
    Ok(())
}

/// Log management
pub(crate) fn cmd_logs(operation: LogCommands) -> Result<()> {
    let log_dir = logging::log_dir();

    match operation {
        LogCommands::Status => {
            println!("📊 VoiceMorph Logging Status\n");
            println!("Log directory: {}", log_dir.display());

            if !log_dir.exists() {
                println!("Status: ❌ No logs found");
                println!("\n💡 To enable file logging, run with -d flag:");
                println!("   voicemorph -d");
                return Ok(());
            }

            let mut file_count = 0;
            let mut total_size = 0u64;
            for entry in std::fs::read_dir(&log_dir)? {
                let entry = entry?;
                if entry.path().is_file() {
                    file_count += 1;
                    total_size += entry.metadata().map(|m| m.len()).unwrap_or(0);
                }
            }

            println!("Status: ✅ Active");
            println!("Log files: {}", file_count);
            println!("Total size: {}", format_bytes(total_size));
            if let Some(latest) = logging::get_log_path() {
                println!("Latest log: {}", latest.display());
            }

            Ok(())
        }

        LogCommands::Clean { days } => {
            println!("🧹 Cleaning up log files older than {} days...\n", days);

            match logging::cleanup_old_logs(days) {
                Ok(removed) => {
                    if removed > 0 {
                        println!("✅ Removed {} old log file(s)", removed);
                    } else {
                        println!("✅ No old log files to remove");
                    }
                }
                Err(e) => {
                    println!("❌ Error cleaning logs: {}", e);
                }
            }

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_effects_listing() {
        assert!(cmd_effects(false).is_ok());
        assert!(cmd_effects(true).is_ok());
    }

    #[tokio::test]
    async fn test_apply_rejects_unknown_effect() {
        let dir = TempDir::new().unwrap();
        let err = cmd_apply(
            &Config::default(),
            "robot",
            &dir.path().join("in.ogg"),
            &dir.path().join("out.mp3"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("robot"));
    }

    #[tokio::test]
    async fn test_apply_requires_input_file() {
        let dir = TempDir::new().unwrap();
        let err = cmd_apply(
            &Config::default(),
            "female_soft",
            &dir.path().join("missing.ogg"),
            &dir.path().join("out.mp3"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_config_missing_path() {
        assert!(load_config(Some("/no/such/voicemorph.toml")).is_err());
    }
}
