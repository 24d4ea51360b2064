use super::*;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

fn rule(id: i64, days: Vec<Weekday>, hms: (u32, u32, u32), action: ScheduleAction) -> ScheduleRule {
    ScheduleRule {
        id: RuleId::new(id),
        name: format!("Rule {}", id),
        days,
        fire_time: NaiveTime::from_hms_opt(hms.0, hms.1, hms.2).unwrap(),
        action,
        enabled: true,
    }
}

/// A local time on a known Monday (2024-01-01 was a Monday)
fn monday_at(hour: u32, minute: u32, second: u32) -> chrono::DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 1, 1, hour, minute, second)
        .single()
        .unwrap()
}

#[test]
fn test_schedule_rule_creation() {
    let r = rule(
        1,
        vec![Weekday::Monday, Weekday::Friday],
        (7, 0, 0),
        ScheduleAction::SendDigest,
    );

    assert_eq!(r.id, RuleId(1));
    assert_eq!(r.days.len(), 2);
    assert!(r.enabled);
}

#[test]
fn test_weekday_conversion() {
    use chrono::Weekday as ChronoWd;

    assert_eq!(Weekday::from_chrono(ChronoWd::Mon), Weekday::Monday);
    assert_eq!(Weekday::from_chrono(ChronoWd::Fri), Weekday::Friday);
    assert_eq!(Weekday::from_chrono(ChronoWd::Sun), Weekday::Sunday);

    assert_eq!(Weekday::Monday.to_chrono(), ChronoWd::Mon);
    assert_eq!(Weekday::Friday.to_chrono(), ChronoWd::Fri);
    assert_eq!(Weekday::Sunday.to_chrono(), ChronoWd::Sun);
}

#[test]
fn test_schedule_rule_serialization() {
    let r = rule(
        42,
        vec![Weekday::Monday, Weekday::Tuesday],
        (6, 30, 0),
        ScheduleAction::CheckFeeds,
    );

    let json = serde_json::to_string(&r).unwrap();
    assert!(json.contains("\"06:30:00\""));

    let deserialized: ScheduleRule = serde_json::from_str(&json).unwrap();
    assert_eq!(r, deserialized);
}

#[test]
fn test_time_format_rejects_bad_strings() {
    #[derive(Serialize, Deserialize)]
    struct TestStruct {
        #[serde(with = "time_format")]
        time: NaiveTime,
    }

    let result: Result<TestStruct, _> = serde_json::from_str(r#"{"time": "25:00:00"}"#);
    assert!(result.is_err());

    let result: Result<TestStruct, _> = serde_json::from_str(r#"{"time": "not a time"}"#);
    assert!(result.is_err());
}

#[test]
fn test_rule_due_in_its_minute() {
    let scheduler = Scheduler::new(vec![rule(1, vec![], (7, 0, 0), ScheduleAction::SendDigest)]);

    assert_eq!(
        scheduler.due_actions(monday_at(7, 0, 30)),
        vec![ScheduleAction::SendDigest]
    );
    // Seconds in the fire time are ignored
    assert_eq!(
        scheduler.due_actions(monday_at(7, 0, 0)),
        vec![ScheduleAction::SendDigest]
    );
    assert!(scheduler.due_actions(monday_at(7, 1, 0)).is_empty());
    assert!(scheduler.due_actions(monday_at(6, 59, 59)).is_empty());
}

#[test]
fn test_disabled_rule_never_fires() {
    let mut r = rule(1, vec![], (7, 0, 0), ScheduleAction::SendDigest);
    r.enabled = false;
    let scheduler = Scheduler::new(vec![r]);

    assert!(scheduler.due_actions(monday_at(7, 0, 0)).is_empty());
}

#[test]
fn test_day_restriction() {
    let scheduler = Scheduler::new(vec![rule(
        1,
        vec![Weekday::Tuesday],
        (7, 0, 0),
        ScheduleAction::CheckFeeds,
    )]);

    // 2024-01-01 is a Monday
    assert!(scheduler.due_actions(monday_at(7, 0, 0)).is_empty());

    let tuesday = Local
        .with_ymd_and_hms(2024, 1, 2, 7, 0, 0)
        .single()
        .unwrap();
    assert_eq!(
        scheduler.due_actions(tuesday),
        vec![ScheduleAction::CheckFeeds]
    );
}

#[test]
fn test_duplicate_actions_collapse() {
    let scheduler = Scheduler::new(vec![
        rule(1, vec![], (7, 0, 0), ScheduleAction::SendDigest),
        rule(2, vec![], (7, 0, 30), ScheduleAction::SendDigest),
        rule(3, vec![], (7, 0, 0), ScheduleAction::CheckFeeds),
    ]);

    let due = scheduler.due_actions(monday_at(7, 0, 0));
    assert_eq!(
        due,
        vec![ScheduleAction::SendDigest, ScheduleAction::CheckFeeds]
    );
}

#[test]
fn test_empty_rules_get_default_digest() {
    let scheduler = Scheduler::new(vec![]);
    assert_eq!(scheduler.rules().len(), 1);
    assert_eq!(scheduler.rules()[0].action, ScheduleAction::SendDigest);
    assert_eq!(
        scheduler.due_actions(monday_at(7, 0, 0)),
        vec![ScheduleAction::SendDigest]
    );

    let scheduler = Scheduler::empty();
    assert!(scheduler.rules().is_empty());
    assert!(scheduler.due_actions(monday_at(7, 0, 0)).is_empty());
}

#[test]
fn test_rule_management() {
    let mut scheduler = Scheduler::empty();

    scheduler.add_rule(rule(1, vec![], (7, 0, 0), ScheduleAction::SendDigest));
    scheduler.add_rule(rule(2, vec![], (6, 0, 0), ScheduleAction::CheckFeeds));
    assert_eq!(scheduler.rules().len(), 2);

    let mut updated = rule(2, vec![], (5, 0, 0), ScheduleAction::CheckFeeds);
    updated.name = "Earlier sweep".into();
    assert!(scheduler.update_rule(updated));
    assert_eq!(scheduler.rules()[1].name, "Earlier sweep");

    assert!(!scheduler.update_rule(rule(9, vec![], (1, 0, 0), ScheduleAction::SendDigest)));

    assert!(scheduler.remove_rule(RuleId::new(1)));
    assert!(!scheduler.remove_rule(RuleId::new(1)));
    assert_eq!(scheduler.rules().len(), 1);
}
