pub mod clock;
pub mod dispatch;
pub mod eligibility;
pub mod escalation;
pub mod journal;
pub mod med;
pub mod schedule;
