//! `sketchtrace doctor`: diagnose configuration problems.

use sketchtrace_config::{AppConfig, DATASET_VARS, WRITE_KEY_VARS};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("SketchTrace Doctor");
    println!("==================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  [ok]   Config file found at {}", config_path.display());
    } else {
        println!("  [info] No config file; defaults and environment only");
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Configuration valid");

            match config.ingest.credentials() {
                Ok(credentials) => {
                    println!("  [ok]   Ingest credentials present");
                    println!("         Events go to {}", credentials.endpoint());
                }
                Err(e) => {
                    println!("  [fail] {e}");
                    println!(
                        "         Set {} (or {}) and {} (or {})",
                        WRITE_KEY_VARS[0], WRITE_KEY_VARS[1], DATASET_VARS[0], DATASET_VARS[1]
                    );
                    issues += 1;
                }
            }

            if !config.client.relay_url.ends_with(&config.relay.path) {
                println!(
                    "  [warn] client.relay_url {} does not end in relay.path {}",
                    config.client.relay_url, config.relay.path
                );
                issues += 1;
            }
        }
        Err(e) => {
            println!("  [fail] {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
