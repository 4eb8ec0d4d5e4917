use std::{fs, io::Write, path::PathBuf};

use agentdoc_agent::DEFAULT_CONFIRMATION_TIMEOUT_MS;
use agentdoc_backend_arweave::TURBO_UPLOAD_URL;
use agentdoc_core::gateway::DEFAULT_GATEWAY_TIMEOUT;
use anyhow::{Context, anyhow};
use clap::Subcommand;
use rand::RngCore;
use toml_edit::{DocumentMut, Item, Table, value};
use tracing::info;

#[derive(Subcommand)]
pub enum CmdConfig {
    /// Creates the config file if it doesn't exist and generates a signing key
    Init,
}

impl CmdConfig {
    pub fn run(self, config_file: PathBuf) -> anyhow::Result<()> {
        let mut doc = if config_file.exists() {
            fs::read_to_string(&config_file)?
        } else {
            if let Some(parent) = config_file.parent() {
                fs::create_dir_all(parent)?;
            }
            String::new()
        }
        .parse::<DocumentMut>()
        .context("could not parse config file")?;

        match self {
            Self::Init => {
                let secretkey_file = config_file.with_extension("secretkey");
                let secretkey_name = secretkey_file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .ok_or_else(|| anyhow!("config path {config_file:?} has no usable file name"))?
                    .to_owned();

                if !doc.contains_key("signer_key") {
                    doc.entry("signer_key_file").or_insert(value(secretkey_name));
                }

                table_mut(&mut doc, "arweave")?
                    .entry("upload_url")
                    .or_insert(value(TURBO_UPLOAD_URL));
                table_mut(&mut doc, "gateways")?
                    .entry("timeout_ms")
                    .or_insert(value(DEFAULT_GATEWAY_TIMEOUT.as_millis() as i64));
                table_mut(&mut doc, "confirmation")?
                    .entry("timeout_ms")
                    .or_insert(value(DEFAULT_CONFIRMATION_TIMEOUT_MS as i64));

                if !secretkey_file.exists() {
                    info!("generating secure random signing key");
                    let mut bytes = [0u8; 32];
                    rand::rng().fill_bytes(&mut bytes);
                    fs::write(&secretkey_file, bytes)?;
                }
            }
        }

        info!("writing to config file {config_file:?}");

        let tmp_path = config_file.with_extension("tmp");
        let mut tmp = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.write_all(doc.to_string().as_bytes())?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, &config_file)?;
        Ok(())
    }
}

fn table_mut<'a>(doc: &'a mut DocumentMut, key: &str) -> anyhow::Result<&'a mut Table> {
    doc.entry(key)
        .or_insert(Item::Table(Table::new()))
        .as_table_mut()
        .with_context(|| format!("'{key}' in config file is not a table"))
}
