use anyhow::Result;
use chrono::NaiveDate;
use serde_json::json;

use medremind::core::med::{self, AddMedicationParams};
use medremind::models::med::DoseTime;
use medremind::output::human;
use medremind::store::MedicationStore;

use super::{Session, print_json};

pub async fn run_add(s: &Session, params: AddMedicationParams<'_>) -> Result<()> {
    let medication = med::add_medication(&s.db, &s.db, s.clock.as_ref(), params).await?;
    if s.human {
        println!("Added {}", human::format_med_line(&medication));
    } else {
        print_json("med_add", json!({ "medication": medication }))?;
    }
    Ok(())
}

pub async fn run_list(s: &Session) -> Result<()> {
    let meds = MedicationStore::load(&s.db).await?;
    if s.human {
        println!("{}", human::format_med_table(meds.all()));
    } else {
        print_json("med_list", json!({ "medications": meds.all() }))?;
    }
    Ok(())
}

pub async fn run_remove(s: &Session, id_or_name: &str) -> Result<()> {
    let medication = med::remove_medication(&s.db, &s.db, s.clock.as_ref(), id_or_name).await?;
    if s.human {
        println!("Removed {}", medication.name);
    } else {
        print_json(
            "med_remove",
            json!({ "id": medication.id, "name": medication.name }),
        )?;
    }
    Ok(())
}

pub async fn run_pause(
    s: &Session,
    id_or_name: &str,
    until: Option<NaiveDate>,
    days: Option<u32>,
) -> Result<()> {
    let clock = s.clock.as_ref();
    let medication = match (until, days) {
        (Some(until), _) => med::pause_until(&s.db, &s.db, clock, id_or_name, until).await?,
        (None, Some(days)) => med::pause_for_days(&s.db, &s.db, clock, id_or_name, days).await?,
        (None, None) => anyhow::bail!("give --until or --days"),
    };
    if s.human {
        println!("Paused {}", human::format_med_line(&medication));
    } else {
        print_json("med_pause", json!({ "medication": medication }))?;
    }
    Ok(())
}

pub async fn run_unpause(s: &Session, id_or_name: &str) -> Result<()> {
    let medication = med::unpause(&s.db, &s.db, s.clock.as_ref(), id_or_name).await?;
    if s.human {
        println!("Resumed {}", human::format_med_line(&medication));
    } else {
        print_json("med_unpause", json!({ "medication": medication }))?;
    }
    Ok(())
}

pub async fn run_take(
    s: &Session,
    id_or_name: &str,
    time: &str,
    date: Option<NaiveDate>,
) -> Result<()> {
    let time: DoseTime = time.parse()?;
    let outcome = med::take_dose(
        &s.db,
        &s.db,
        s.clock.as_ref(),
        s.policy(),
        id_or_name,
        time,
        date,
    )
    .await?;

    if s.human {
        println!("{}", human::format_outcome(&outcome));
    } else {
        let mut data = json!({ "outcome": outcome });
        if let Some(notice) = outcome.notice() {
            data["warning"] = json!(notice);
        }
        print_json("med_take", data)?;
    }
    Ok(())
}
