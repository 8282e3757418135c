use anyhow::{Context, Result};
use featureswitch_lib::Feature;

use crate::serve::{open_store, resolve_config, ServeOverrides};
use crate::server::config::StorageBackend;

/// Print every stored feature, one per line, ordered by friendly id.
pub async fn run_list(config_path: &str, data_dir: Option<String>, show_buckets: bool) -> Result<()> {
    let config = resolve_config(
        config_path,
        ServeOverrides {
            data_dir,
            storage: Some(StorageBackend::Sled),
            ..ServeOverrides::default()
        },
    );
    let store = open_store(&config)?;
    let features = store
        .list_all()
        .await
        .context("failed to read features")?;

    if features.is_empty() {
        println!("No features stored in {}", config.storage.data_dir);
        return Ok(());
    }
    for feature in &features {
        println!("{}", format_line(feature, show_buckets));
    }
    Ok(())
}

fn format_line(feature: &Feature, show_buckets: bool) -> String {
    let base = format!(
        "{:>6}  {:<32}  {}  buckets={}",
        feature.friendly_id,
        feature.name,
        feature.id,
        feature.bucket_list.len()
    );
    if show_buckets && !feature.bucket_list.is_empty() {
        format!("{} ({})", base, feature.bucket_list.join(", "))
    } else {
        base
    }
}
