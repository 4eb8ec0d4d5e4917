use std::path::Path;

use agentdoc_agent::{StorageClients, StorageConfig};
use agentdoc_resolve::Loaded;
use anyhow::{Result, bail};

pub async fn run_load(uri: &str, config: &StorageConfig, config_dir: Option<&Path>) -> Result<()> {
    let resolver = StorageClients::from_config(config, config_dir)?.uri_resolver();
    match resolver.load(uri).await? {
        Loaded::Content(document) => {
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Loaded::Unconfigured => println!("no document: the uri is empty"),
        Loaded::UnsupportedScheme(scheme) => {
            bail!("cannot load {uri}: unsupported scheme {scheme}")
        }
    }
    Ok(())
}
