use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use bytes::Bytes;
use tracing::info;
use tracing_subscriber::EnvFilter;

use acsstore_client::{ClientConfig, DataStore, HttpGateway};
use acsstore_common::naming::compose_file_id;

const DEFAULT_CONFIG_PATH: &str = "acsstore.toml";
const FALLBACK_PART_SIZE: u64 = 8 * 1024 * 1024;

const USAGE: &str = "usage: acsstore [--config <path>] <command>

commands:
  backends                                          print the default backend id
  put <path> [account_id]                           upload a file, print its file id and part count
  get <file_id> <total_size> [offset] [length] [out] read a byte range";

type Store = DataStore<HttpGateway>;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = if args.first().map(|s| s.as_str()) == Some("--config") {
        if args.len() < 2 {
            bail!("--config requires a path\n{}", USAGE);
        }
        let path = args.remove(1);
        args.remove(0);
        PathBuf::from(path)
    } else {
        PathBuf::from(
            std::env::var("ACSSTORE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
        )
    };

    let Some(command) = args.first().cloned() else {
        bail!("{}", USAGE);
    };

    let config = ClientConfig::load(&config_path)?;
    info!(gateway = %config.gateway_url, "acsstore starting");

    let gateway = HttpGateway::new(
        &config.gateway_url,
        config.api_token.clone(),
        config.gateway_timeout(),
    );
    let store = DataStore::new(gateway, config.datastore_options());

    match command.as_str() {
        "backends" => {
            let backend = resolve_backend(&store, &config)?;
            println!("{}", backend);
        }
        "put" => {
            let path = args.get(1).context("put requires a file path")?;
            let (file_id, parts) =
                put_file(&store, &config, Path::new(path), args.get(2).cloned())?;
            println!("{}", put_summary(&file_id, parts));
        }
        "get" => {
            let file_id = args.get(1).context("get requires a file id")?;
            let total_size: i64 = args
                .get(2)
                .context("get requires the object's total size")?
                .parse()
                .context("total_size must be an integer")?;
            let offset: i64 = parse_opt(args.get(3), 0)?;
            let length: i64 = parse_opt(args.get(4), -1)?;
            let backend = resolve_backend(&store, &config)?;
            let data = store.read_by_offset(
                &config.prefix,
                file_id,
                &backend,
                offset,
                length,
                total_size,
            )?;
            match args.get(5) {
                Some(out) => std::fs::write(out, &data)
                    .with_context(|| format!("Failed to write {}", out))?,
                None => std::io::stdout().write_all(&data)?,
            }
            info!(file_id = %file_id, bytes = data.len(), "Read complete");
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }

    Ok(())
}

fn parse_opt(arg: Option<&String>, default: i64) -> anyhow::Result<i64> {
    match arg {
        Some(s) => s.parse().with_context(|| format!("not an integer: {}", s)),
        None => Ok(default),
    }
}

/// Configured backend, or the gateway's default one.
fn resolve_backend(store: &Store, config: &ClientConfig) -> anyhow::Result<String> {
    if let Some(id) = config.backend_id.as_ref().filter(|id| !id.is_empty()) {
        return Ok(id.clone());
    }
    let id = store.default_backend_id()?;
    if id.is_empty() {
        bail!("no storage backend configured on the gateway");
    }
    Ok(id)
}

fn put_file(
    store: &Store,
    config: &ClientConfig,
    path: &Path,
    account_id: Option<String>,
) -> anyhow::Result<(String, usize)> {
    let data = Bytes::from(
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
    );
    let backend = resolve_backend(store, config)?;
    let account_id = account_id.unwrap_or_else(|| store.new_account_id());
    let obj_id = store.new_object_id();

    let session = store.init_upload(&config.prefix, &account_id, &obj_id, &backend)?;
    let part_size = [config.transfer.part_size, session.part_size]
        .into_iter()
        .find(|&s| s > 0)
        .unwrap_or(FALLBACK_PART_SIZE) as usize;

    let mut parts = BTreeMap::new();
    let mut offset = 0usize;
    let mut sequence = 0u32;
    loop {
        let end = (offset + part_size).min(data.len());
        let record = store.upload_block(
            &config.prefix,
            &session.account_id,
            &session.obj_id,
            &session.backend_id,
            &session.upload_id,
            data.slice(offset..end),
            offset as u64,
            sequence,
        )?;
        parts.insert(sequence, record);
        sequence += 1;
        offset = end;
        if offset >= data.len() {
            break;
        }
    }

    store.complete_upload(
        &config.prefix,
        &session.account_id,
        &session.obj_id,
        &session.backend_id,
        &session.upload_id,
        &parts,
    )?;

    info!(
        path = %path.display(),
        size = data.len(),
        parts = parts.len(),
        upload_id = %session.upload_id,
        "Upload complete"
    );
    Ok((compose_file_id(&session.account_id, &session.obj_id), parts.len()))
}

fn put_summary(file_id: &str, parts: usize) -> String {
    format!("{}\tparts={}", file_id, parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_summary_has_file_id_and_part_count() {
        assert_eq!(put_summary("acct/obj", 3), "acct/obj\tparts=3");
    }
}
