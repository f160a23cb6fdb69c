use anyhow::Result;
use serde_json::json;

use medremind::output::human;

use super::{Session, print_json};

pub async fn run(
    s: &Session,
    level: Option<&str>,
    search: Option<&str>,
    stats: bool,
    clear: bool,
) -> Result<()> {
    if clear {
        s.journal.clear(&s.db).await?;
        if s.human {
            println!("Log journal cleared");
        } else {
            print_json("logs", json!({ "cleared": true }))?;
        }
        return Ok(());
    }

    if stats {
        let stats = s.journal.stats();
        if s.human {
            println!("{}", human::format_log_stats(&stats));
        } else {
            print_json("logs", json!({ "stats": stats }))?;
        }
        return Ok(());
    }

    let entries = match (level, search) {
        (Some(level), Some(term)) => s
            .journal
            .search(term)
            .into_iter()
            .filter(|e| e.level.eq_ignore_ascii_case(level))
            .collect(),
        (Some(level), None) => s.journal.filter_level(level),
        (None, Some(term)) => s.journal.search(term),
        (None, None) => s.journal.entries(),
    };

    if s.human {
        for e in &entries {
            println!("{}", human::format_log_entry(e));
        }
    } else {
        print_json("logs", json!({ "entries": entries }))?;
    }
    Ok(())
}
