mod common;

use chrono::Duration;
use common::{at, date, setup_db};
use medremind::core::clock::{Clock, FixedClock};
use medremind::core::dispatch::Dispatcher;
use medremind::core::escalation::Outcome;
use medremind::core::med::{self, AddMedicationParams};
use medremind::models::notification::{Action, EventDetail, EventType, NotificationKind};
use medremind::notify::Notifier;
use medremind::store::{DoseLog, FollowupRegistry};

#[tokio::test]
async fn full_day_against_sqlite() {
    let (_dir, db) = setup_db();
    let clock = FixedClock::new(at(2024, 1, 10, 7, 0));
    let m = med::add_medication(
        &db,
        &db,
        &clock,
        AddMedicationParams {
            name: "Aspirin",
            times: Some("08:00"),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(db.fire_due(clock.now()).unwrap().is_empty());

    // 08:00: the initial reminder fires and the chain starts.
    clock.set(at(2024, 1, 10, 8, 0));
    let fired = db.fire_due(clock.now()).unwrap();
    assert_eq!(fired.len(), 1);
    let dispatcher = Dispatcher::new(&db, &db, &clock);
    for n in fired {
        dispatcher
            .on_background_event(EventType::Delivered, EventDetail::delivered(n))
            .await;
    }
    assert_eq!(db.list_triggers().await.unwrap().len(), 4);

    // 08:10: first follow-up is shown; the user presses take on it.
    clock.advance(Duration::minutes(10));
    let fired = db.fire_due(clock.now()).unwrap();
    assert_eq!(fired.len(), 1);
    let followup = fired.into_iter().next().unwrap();
    assert_eq!(followup.payload().kind(), NotificationKind::Followup);
    assert!(db.displayed_notification(&followup.id).unwrap().is_some());

    let result = dispatcher
        .on_foreground_event(
            EventType::ActionPress,
            EventDetail::pressed(followup.clone(), &Action::Take),
        )
        .await;
    assert!(matches!(
        result.outcome(),
        Some(Outcome::Taken { recorded: true, .. })
    ));

    assert!(db.displayed_notification(&followup.id).unwrap().is_none());
    let pending = db.list_triggers().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].trigger.fire_at, at(2024, 1, 11, 8, 0));
    assert!(FollowupRegistry::load(&db).await.unwrap().is_empty());
    assert!(DoseLog::load(&db).await.unwrap().has_dose(
        &m.id,
        date(2024, 1, 10),
        "08:00".parse().unwrap()
    ));

    // Nothing else fires for the rest of the day.
    clock.set(at(2024, 1, 10, 23, 59));
    assert!(db.fire_due(clock.now()).unwrap().is_empty());
}

#[tokio::test]
async fn late_wakeup_fires_daily_once() {
    let (_dir, db) = setup_db();
    let clock = FixedClock::new(at(2024, 1, 10, 7, 0));
    med::add_medication(
        &db,
        &db,
        &clock,
        AddMedicationParams {
            name: "Aspirin",
            times: Some("08:00"),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // The host slept through three mornings.
    let fired = db.fire_due(at(2024, 1, 13, 9, 0)).unwrap();
    assert_eq!(fired.len(), 1);
    let pending = db.list_triggers().await.unwrap();
    assert_eq!(pending[0].trigger.fire_at, at(2024, 1, 14, 8, 0));
}
