use anyhow::Result;
use serde_json::json;

use medremind::models::config::Config;

use super::print_json;

pub fn run_show(config: &Config, human: bool) -> Result<()> {
    if human {
        let toml_str = toml::to_string_pretty(config)?;
        println!("{}", toml_str);
    } else {
        print_json("config", json!({ "config": config }))?;
    }
    Ok(())
}

pub fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;
    print_json("config", json!({ "key": key, "value": value }))
}
