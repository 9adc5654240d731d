//! `sketchtrace relay`: start the event relay.

use sketchtrace_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.relay.port = port;
    }

    println!("SketchTrace Relay");
    println!("   Listening: {}", config.relay.bind_addr());
    println!("   Endpoint:  {}", config.relay.path);

    sketchtrace_relay::start(config).await?;

    Ok(())
}
