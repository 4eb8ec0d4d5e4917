use std::path::Path;

use agentdoc_agent::{StorageClients, StorageConfig};
use agentdoc_backend_memory::MemoryBackend;
use agentdoc_core::{ChainContext, MetadataRecord, Scheme, StorageBackend, StorageUri};
use anyhow::{Context, Result, anyhow, bail};
use tracing::info;

use super::document::print_annotations;
use super::read_record;
use crate::BackendChoice;

pub async fn run_upload(
    record_path: &Path,
    backend: BackendChoice,
    chain: Option<ChainContext>,
    dry_run: bool,
    config: &StorageConfig,
    config_dir: Option<&Path>,
) -> Result<()> {
    let record = read_record(record_path)?;
    record
        .validate_for_write(chain.as_ref())
        .context("record cannot be uploaded")?;

    let uri = if dry_run {
        let scheme = match backend {
            BackendChoice::Ipfs => Scheme::Ipfs,
            BackendChoice::Auto | BackendChoice::Arweave => Scheme::Arweave,
        };
        let memory = MemoryBackend::new(scheme);
        let id = memory.upload_document(&record, chain.as_ref()).await?;
        if let Some(stored) = memory.get(&id) {
            info!("dry run, {} bytes would be stored", stored.payload.len());
            print_annotations(&stored.annotations);
        }
        memory.uri_for(id)
    } else {
        let clients = StorageClients::from_config(config, config_dir)?;
        upload_with(&clients, backend, &record, chain.as_ref()).await?
    };

    println!("{uri}");
    Ok(())
}

async fn upload_with(
    clients: &StorageClients,
    backend: BackendChoice,
    record: &MetadataRecord,
    chain: Option<&ChainContext>,
) -> Result<StorageUri> {
    let scheme = match backend {
        BackendChoice::Auto => {
            let writer = clients.priority_writer();
            if writer.is_empty() {
                bail!("no storage backend configured, add an [arweave] or [ipfs] section");
            }
            return writer
                .store_document(record, chain)
                .await
                .ok_or_else(|| anyhow!("no configured backend accepted the document"));
        }
        BackendChoice::Arweave => Scheme::Arweave,
        BackendChoice::Ipfs => Scheme::Ipfs,
    };

    let backend = clients
        .backend(scheme)
        .with_context(|| format!("{} backend is not configured", scheme.backend_name()))?;
    let id = backend.upload_document(record, chain).await?;
    Ok(backend.uri_for(id))
}
