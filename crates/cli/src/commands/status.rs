//! `sketchtrace status`: show effective configuration.

use sketchtrace_config::AppConfig;

fn presence(value: &Option<String>) -> &'static str {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => "set",
        _ => "missing",
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("SketchTrace Status");
    println!("==================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Relay:        {}{}", config.relay.bind_addr(), config.relay.path);
    println!("  Public bind:  {}", if config.relay.allow_public_bind { "allowed" } else { "loopback only" });
    println!("  Ingest API:   {}", config.ingest.api_url);
    println!(
        "  Dataset:      {}",
        config.ingest.dataset.as_deref().unwrap_or("(missing)")
    );
    println!("  Write key:    {}", presence(&config.ingest.write_key));
    println!("  Client relay: {}", config.client.relay_url);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file; run `sketchtrace onboard` first");
    }

    Ok(())
}
