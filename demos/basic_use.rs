use color_eyre::eyre::eyre;
use property_analyzer::{ImageAsset, PropertyContext, ProviderSettings};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Usage: `cargo run --example basic_use -- <photo> [estimated value]`
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("property_analyzer=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| eyre!("usage: basic_use <photo> [estimated value]"))?;
    let estimated_value = args.next().map(|v| v.parse::<f64>()).transpose()?;

    let path = Path::new(&path);
    let name = path
        .file_name()
        .map_or_else(|| "photo".to_string(), |n| n.to_string_lossy().into_owned());
    let asset = ImageAsset::new(name, "application/octet-stream", std::fs::read(path)?);

    let analyzer = ProviderSettings::from_env().build_analyzer()?;
    let context = PropertyContext {
        estimated_value,
        ..PropertyContext::default()
    };
    let report = analyzer.analyze(&asset, None, &context).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
