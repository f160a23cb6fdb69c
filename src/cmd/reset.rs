use anyhow::Result;
use serde_json::json;

use medremind::core::med;

use super::{Session, print_json};

pub async fn run(s: &Session, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("reset deletes every medication and dose record; pass --yes to confirm");
    }
    let cancelled = med::reset_all(&s.db, &s.db).await?;
    if s.human {
        println!("All data cleared ({cancelled} reminder(s) cancelled)");
    } else {
        print_json("reset", json!({ "cancelled": cancelled }))?;
    }
    Ok(())
}
