mod common;

use chrono::Timelike;
use common::{Harness, at, date, med};
use medremind::core::clock::Clock;
use medremind::core::schedule;
use medremind::models::notification::NotificationKind;

fn initial_count(h: &Harness) -> usize {
    h.notifier
        .pending()
        .iter()
        .filter(|p| p.notification.payload().kind() == NotificationKind::Initial)
        .count()
}

#[tokio::test]
async fn reschedule_twice_leaves_one_trigger_per_time() {
    let h = Harness::new(at(2024, 1, 10, 7, 0));
    let m = med("aspirin", &["08:00", "20:00"], date(2024, 1, 1));

    schedule::reschedule(&h.notifier, &m, h.clock.now()).await.unwrap();
    let once = initial_count(&h);
    schedule::reschedule(&h.notifier, &m, h.clock.now()).await.unwrap();

    assert_eq!(once, 2);
    assert_eq!(initial_count(&h), once);
}

#[tokio::test]
async fn initial_triggers_repeat_daily_with_payload() {
    let h = Harness::new(at(2024, 1, 10, 9, 0));
    let m = med("aspirin", &["08:00", "20:00"], date(2024, 1, 1));
    schedule::reschedule(&h.notifier, &m, h.clock.now()).await.unwrap();

    let morning = h.notifier.get(&schedule::initial_id(&m.id, "08:00".parse().unwrap())).unwrap();
    assert!(morning.trigger.repeat_daily);
    // 08:00 already passed at 09:00, so the first firing is tomorrow.
    assert_eq!(morning.trigger.fire_at.date_naive(), date(2024, 1, 11));
    assert_eq!(morning.trigger.fire_at.hour(), 8);

    let evening = h.notifier.get(&schedule::initial_id(&m.id, "20:00".parse().unwrap())).unwrap();
    assert_eq!(evening.trigger.fire_at.date_naive(), date(2024, 1, 10));

    let payload = morning.notification.payload();
    assert_eq!(payload.kind(), NotificationKind::Initial);
    assert_eq!(payload.med_id.as_deref(), Some(m.id.as_str()));
    assert_eq!(payload.med_name.as_deref(), Some("aspirin"));
    assert_eq!(payload.time.as_deref(), Some("08:00"));
}

#[tokio::test]
async fn expired_medication_schedules_nothing() {
    let h = Harness::new(at(2024, 1, 10, 7, 0));
    let mut m = med("done", &["08:00"], date(2024, 1, 1));
    schedule::reschedule(&h.notifier, &m, h.clock.now()).await.unwrap();
    assert_eq!(initial_count(&h), 1);

    m.end_date = Some(date(2024, 1, 9));
    let n = schedule::reschedule(&h.notifier, &m, h.clock.now()).await.unwrap();
    assert_eq!(n, 0);
    assert_eq!(initial_count(&h), 0);
}

#[tokio::test]
async fn ending_today_is_still_scheduled() {
    let h = Harness::new(at(2024, 1, 10, 7, 0));
    let mut m = med("last-day", &["08:00"], date(2024, 1, 1));
    m.end_date = Some(date(2024, 1, 10));
    let n = schedule::reschedule(&h.notifier, &m, h.clock.now()).await.unwrap();
    assert_eq!(n, 1);
}

#[tokio::test]
async fn reschedule_leaves_other_medications_alone() {
    let h = Harness::new(at(2024, 1, 10, 7, 0));
    let a = med("a", &["08:00"], date(2024, 1, 1));
    let b = med("b", &["09:00"], date(2024, 1, 1));
    schedule::reschedule(&h.notifier, &a, h.clock.now()).await.unwrap();
    schedule::reschedule(&h.notifier, &b, h.clock.now()).await.unwrap();
    schedule::reschedule(&h.notifier, &a, h.clock.now()).await.unwrap();
    assert_eq!(initial_count(&h), 2);

    let cancelled = schedule::cancel_all_for(&h.notifier, &a.id).await.unwrap();
    assert_eq!(cancelled, 1);
    assert_eq!(
        h.notifier.pending_ids(),
        vec![schedule::initial_id(&b.id, "09:00".parse().unwrap())]
    );
}

#[tokio::test]
async fn failed_registration_surfaces_and_retry_is_safe() {
    let h = Harness::new(at(2024, 1, 10, 7, 0));
    let m = med("flaky", &["08:00", "12:00"], date(2024, 1, 1));

    h.notifier.set_fail_creates(true);
    assert!(schedule::reschedule(&h.notifier, &m, h.clock.now()).await.is_err());

    h.notifier.set_fail_creates(false);
    schedule::reschedule(&h.notifier, &m, h.clock.now()).await.unwrap();
    assert_eq!(initial_count(&h), 2);
}

#[tokio::test]
async fn scheduled_is_sorted_and_test_alert_fires_in_five_seconds() {
    let h = Harness::new(at(2024, 1, 10, 7, 0));
    let m = med("aspirin", &["20:00", "08:00"], date(2024, 1, 1));
    schedule::reschedule(&h.notifier, &m, h.clock.now()).await.unwrap();
    let id = schedule::schedule_test(&h.notifier, h.clock.now()).await.unwrap();

    let pending = schedule::scheduled(&h.notifier).await.unwrap();
    let order: Vec<&str> = pending.iter().map(|p| p.notification.id.as_str()).collect();
    assert_eq!(order[0], id);
    assert!(pending.windows(2).all(|w| w[0].trigger.fire_at <= w[1].trigger.fire_at));

    let test = &pending[0];
    assert_eq!(test.trigger.fire_at, at(2024, 1, 10, 7, 0) + chrono::Duration::seconds(5));
    assert!(!test.trigger.repeat_daily);
    assert_eq!(test.notification.payload().kind(), NotificationKind::Test);
}
