use std::path::{Path, PathBuf};

use agentdoc_agent::StorageConfig;
use agentdoc_core::{ChainContext, MetadataRecord};
use anyhow::{Context, Result};

use crate::ChainArgs;

mod document;
mod load;
mod upload;

pub use document::{run_annotations, run_format};
pub use load::run_load;
pub use upload::run_upload;

pub async fn run_command(config_file: PathBuf, cmd: crate::Commands) -> Result<()> {
    let config_dir = config_file.parent();
    match cmd {
        crate::Commands::Config { cmd } => cmd.run(config_file.clone()),
        crate::Commands::Format { record, chain } => {
            let config = load_config(&config_file)?;
            run_format(&record, chain_context(&chain, &config))
        }
        crate::Commands::Annotations { record, chain } => {
            let config = load_config(&config_file)?;
            run_annotations(&record, chain_context(&chain, &config))
        }
        crate::Commands::Upload {
            record,
            backend,
            chain,
            dry_run,
        } => {
            let config = load_config(&config_file)?;
            let chain = chain_context(&chain, &config);
            run_upload(&record, backend, chain, dry_run, &config, config_dir).await
        }
        crate::Commands::Load { uri } => {
            let config = load_config(&config_file)?;
            run_load(&uri, &config, config_dir).await
        }
    }
}

/// Reads the config file, falling back to defaults when there is none yet.
fn load_config(config_file: &Path) -> Result<StorageConfig> {
    if !config_file.exists() {
        tracing::debug!("no config at {config_file:?}, using defaults");
        return Ok(StorageConfig::default());
    }
    StorageConfig::load(config_file)
}

/// Command line chain flags win over the config's `[chain]` table.
fn chain_context(args: &ChainArgs, config: &StorageConfig) -> Option<ChainContext> {
    match args.chain_id {
        Some(chain_id) => {
            let ctx = ChainContext::new(chain_id);
            Some(match &args.registry {
                Some(address) => ctx.with_registry(address),
                None => ctx,
            })
        }
        None => config.chain_context(),
    }
}

fn read_record(path: &Path) -> Result<MetadataRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read record file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid metadata record", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdoc_agent::ChainConfig;

    #[test]
    fn flags_override_config_chain() {
        let config = StorageConfig {
            chain: Some(ChainConfig {
                chain_id: 1,
                identity_registry: Some("0xconfig".into()),
                reputation_registry: None,
            }),
            ..Default::default()
        };

        let from_config = chain_context(
            &ChainArgs {
                chain_id: None,
                registry: None,
            },
            &config,
        );
        assert_eq!(
            from_config,
            Some(ChainContext::new(1).with_registry("0xconfig"))
        );

        let from_flags = chain_context(
            &ChainArgs {
                chain_id: Some(84532),
                registry: None,
            },
            &config,
        );
        assert_eq!(from_flags, Some(ChainContext::new(84532)));
    }

    #[tokio::test]
    async fn config_is_read_only_by_commands_that_need_it() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("config.toml");

        let load = || crate::Commands::Load { uri: String::new() };
        run_command(config_file.clone(), load()).await.unwrap();

        let init = crate::Commands::Config {
            cmd: crate::init_config::CmdConfig::Init,
        };
        run_command(config_file.clone(), init).await.unwrap();
        run_command(config_file.clone(), load()).await.unwrap();

        std::fs::write(&config_file, "[gateways\n").unwrap();
        let err = run_command(config_file.clone(), load()).await.unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, StorageConfig::default());
    }

    #[test]
    fn record_file_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        std::fs::write(&path, "{\"name\": 3}").unwrap();
        let err = read_record(&path).unwrap_err();
        assert!(format!("{err:#}").contains("agent.json"));
    }
}
