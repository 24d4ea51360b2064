//! Time-based triggers for feed checks and digest delivery.
//!
//! Rules pair a fire time and days of week with an action. A background task
//! evaluates the rules once per minute and fires each rule exactly once when
//! its minute arrives. Common setups:
//! - Check all feeds every morning before the digest goes out
//! - Send the daily digest at a fixed time
//!
//! # Example
//!
//! ```rust
//! use podbrief::scheduler::{ScheduleRule, ScheduleAction, RuleId, Weekday};
//! use chrono::NaiveTime;
//!
//! // Morning feed sweep on weekdays
//! let sweep = ScheduleRule {
//!     id: RuleId::new(1),
//!     name: "Morning sweep".into(),
//!     days: vec![Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday,
//!                Weekday::Thursday, Weekday::Friday],
//!     fire_time: NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
//!     action: ScheduleAction::CheckFeeds,
//!     enabled: true,
//! };
//!
//! // Digest every day at 07:00
//! let digest = ScheduleRule {
//!     id: RuleId::new(2),
//!     name: "Daily digest".into(),
//!     days: vec![],  // All days
//!     fire_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
//!     action: ScheduleAction::SendDigest,
//!     enabled: true,
//! };
//! ```

use chrono::{Datelike, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Unique identifier for a schedule rule
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct RuleId(pub i64);

impl RuleId {
    /// Create a new RuleId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for RuleId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RuleId> for i64 {
    fn from(id: RuleId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for RuleId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RuleId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// A rule that fires an action at a specific time on specific days
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ScheduleRule {
    /// Unique identifier for this rule
    pub id: RuleId,

    /// Human-readable name for this rule
    pub name: String,

    /// Days this rule applies (empty = all days)
    pub days: Vec<Weekday>,

    /// Time of day the rule fires (HH:MM:SS, 24-hour format; seconds ignored)
    #[serde(with = "time_format")]
    #[schema(value_type = String, example = "07:00:00")]
    pub fire_time: NaiveTime,

    /// Action to fire
    pub action: ScheduleAction,

    /// Whether this rule is currently active
    pub enabled: bool,
}

impl ScheduleRule {
    /// The built-in daily digest rule, used when no rules are configured
    pub fn default_daily_digest() -> Self {
        Self {
            id: RuleId::new(0),
            name: "Daily digest".into(),
            days: vec![],
            fire_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
            action: ScheduleAction::SendDigest,
            enabled: true,
        }
    }
}

/// Action a schedule rule fires
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "type")]
pub enum ScheduleAction {
    /// Check every enabled feed and annotate what turns up
    CheckFeeds,
    /// Assemble and send the email digest
    SendDigest,
}

/// Days of the week for schedule rules
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub enum Weekday {
    /// Monday
    Monday,
    /// Tuesday
    Tuesday,
    /// Wednesday
    Wednesday,
    /// Thursday
    Thursday,
    /// Friday
    Friday,
    /// Saturday
    Saturday,
    /// Sunday
    Sunday,
}

impl Weekday {
    /// Convert from chrono::Weekday to our Weekday
    pub fn from_chrono(wd: chrono::Weekday) -> Self {
        use chrono::Weekday as ChronoWd;
        match wd {
            ChronoWd::Mon => Weekday::Monday,
            ChronoWd::Tue => Weekday::Tuesday,
            ChronoWd::Wed => Weekday::Wednesday,
            ChronoWd::Thu => Weekday::Thursday,
            ChronoWd::Fri => Weekday::Friday,
            ChronoWd::Sat => Weekday::Saturday,
            ChronoWd::Sun => Weekday::Sunday,
        }
    }

    /// Convert to chrono::Weekday
    pub fn to_chrono(self) -> chrono::Weekday {
        use chrono::Weekday as ChronoWd;
        match self {
            Weekday::Monday => ChronoWd::Mon,
            Weekday::Tuesday => ChronoWd::Tue,
            Weekday::Wednesday => ChronoWd::Wed,
            Weekday::Thursday => ChronoWd::Thu,
            Weekday::Friday => ChronoWd::Fri,
            Weekday::Saturday => ChronoWd::Sat,
            Weekday::Sunday => ChronoWd::Sun,
        }
    }
}

/// Scheduler manages time-based rules for feed checks and digests
///
/// The Scheduler maintains a list of schedule rules and reports which rules
/// are due at a given minute. Firing at most once per minute is the caller's
/// job; see the evaluation loop in the service.
#[derive(Clone, Debug)]
pub struct Scheduler {
    rules: Vec<ScheduleRule>,
}

impl Scheduler {
    /// Create a new Scheduler with the given rules
    ///
    /// An empty rule list gets the built-in daily digest rule, so a bare
    /// config still produces one digest per day.
    pub fn new(rules: Vec<ScheduleRule>) -> Self {
        if rules.is_empty() {
            Self {
                rules: vec![ScheduleRule::default_daily_digest()],
            }
        } else {
            Self { rules }
        }
    }

    /// Create a scheduler with no rules at all, not even the default digest
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Get the list of all rules
    pub fn rules(&self) -> &[ScheduleRule] {
        &self.rules
    }

    /// Update the list of rules
    ///
    /// This replaces all existing rules with the new list.
    pub fn set_rules(&mut self, rules: Vec<ScheduleRule>) {
        self.rules = rules;
    }

    /// Add a new rule to the scheduler
    pub fn add_rule(&mut self, rule: ScheduleRule) {
        self.rules.push(rule);
    }

    /// Remove a rule by ID
    ///
    /// Returns true if a rule was removed, false if no rule with that ID exists.
    pub fn remove_rule(&mut self, id: RuleId) -> bool {
        let original_len = self.rules.len();
        self.rules.retain(|r| r.id != id);
        self.rules.len() < original_len
    }

    /// Update an existing rule
    ///
    /// Returns true if the rule was found and updated, false otherwise.
    pub fn update_rule(&mut self, rule: ScheduleRule) -> bool {
        if let Some(existing) = self.rules.iter_mut().find(|r| r.id == rule.id) {
            *existing = rule;
            true
        } else {
            false
        }
    }

    /// Get the actions due at the given time
    ///
    /// A rule is due when:
    /// 1. It is enabled
    /// 2. It matches the current day (empty days = all days)
    /// 3. Its fire time falls in the current minute (seconds are ignored)
    ///
    /// Duplicate actions are collapsed so two rules firing `SendDigest` in
    /// the same minute produce one digest.
    pub fn due_actions(&self, now: chrono::DateTime<chrono::Local>) -> Vec<ScheduleAction> {
        let weekday = Weekday::from_chrono(now.weekday());
        let time = now.time();

        let mut due = Vec::new();
        for rule in &self.rules {
            if !rule.enabled {
                continue;
            }
            if !rule.days.is_empty() && !rule.days.contains(&weekday) {
                continue;
            }
            if rule.fire_time.hour() == time.hour()
                && rule.fire_time.minute() == time.minute()
                && !due.contains(&rule.action)
            {
                due.push(rule.action);
            }
        }
        due
    }
}

impl Default for Scheduler {
    /// Create a scheduler with the built-in daily digest rule
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Serde module for serializing/deserializing NaiveTime as HH:MM:SS strings
mod time_format {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = time.format("%H:%M:%S").to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, "%H:%M:%S").map_err(serde::de::Error::custom)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
