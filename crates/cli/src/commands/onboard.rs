//! `sketchtrace onboard`: first-time setup.

use sketchtrace_config::{AppConfig, DATASET_VARS, WRITE_KEY_VARS};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("SketchTrace Setup");
    println!("=================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. export {}=<your ingest write key>", WRITE_KEY_VARS[0]);
    println!("   2. export {}=<your dataset>", DATASET_VARS[0]);
    println!("   3. Run: sketchtrace relay\n");

    Ok(())
}
