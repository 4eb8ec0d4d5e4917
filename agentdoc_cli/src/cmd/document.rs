use std::path::Path;

use agentdoc_core::{Annotation, ChainContext, format_document, generate_annotations};
use anyhow::{Result, anyhow};

use super::read_record;

pub fn run_format(record_path: &Path, chain: Option<ChainContext>) -> Result<()> {
    let record = read_record(record_path)?;
    let document = format_document(&record, chain.as_ref());
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

pub fn run_annotations(record_path: &Path, chain: Option<ChainContext>) -> Result<()> {
    let record = read_record(record_path)?;
    let chain = chain
        .or_else(|| record.agent_id.map(|id| ChainContext::new(id.chain_id)))
        .ok_or_else(|| anyhow!("annotations need a chain id, pass --chain-id or set [chain]"))?;
    print_annotations(&generate_annotations(&record, &chain));
    Ok(())
}

pub(super) fn print_annotations(annotations: &[Annotation]) {
    for Annotation { name, value } in annotations {
        println!("{name}: {value}");
    }
}
