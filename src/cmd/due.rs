use anyhow::Result;
use chrono::NaiveDate;
use serde_json::json;

use medremind::core::med;
use medremind::output::human;

use super::{Session, print_json};

pub async fn run(s: &Session, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(|| s.clock.today());
    let report = med::due_on(&s.db, date).await?;
    if s.human {
        println!("{}", human::format_day_report(&report));
    } else {
        print_json("due", json!(report))?;
    }
    Ok(())
}
