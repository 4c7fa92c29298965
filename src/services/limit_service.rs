use chrono::{ NaiveDate, Utc };
use sea_orm::{ ActiveModelTrait, DatabaseConnection, Set };
use serde::Serialize;

use crate::config::Config;
use crate::db::entity::account;
use crate::enums::{ AccountStatus, ActionKind };
use crate::error::Result;

/// Which daily counter an action kind draws from. Inbox syncs are
/// engine bookkeeping and run unmetered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    Connections,
    Messages,
    Views,
}

pub fn quota_kind(kind: ActionKind) -> Option<QuotaKind> {
    match kind {
        ActionKind::ConnectionRequest => Some(QuotaKind::Connections),
        ActionKind::Message => Some(QuotaKind::Messages),
        ActionKind::ProfileView | ActionKind::CheckAcceptance => Some(QuotaKind::Views),
        ActionKind::SyncMessages => None,
    }
}

/// Linear ramp: 20% of the base limit on day 0, full capacity from
/// day 8 onward.
pub fn warmup_multiplier(warmup_day: i32) -> f64 {
    (0.2 + 0.1 * (warmup_day.max(0) as f64)).min(1.0)
}

pub fn effective_limit(base_limit: i32, warming_up: bool, warmup_day: i32) -> i32 {
    if !warming_up {
        return base_limit;
    }
    ((base_limit as f64) * warmup_multiplier(warmup_day)).floor() as i32
}

/// Engine-level limits for accounts whose rows carry no positive
/// limit of their own.
#[derive(Debug, Clone, Copy)]
pub struct DailyDefaults {
    pub connections: i32,
    pub messages: i32,
    pub views: i32,
}

impl DailyDefaults {
    pub fn from_config(config: &Config) -> Self {
        Self {
            connections: config.default_daily_connections,
            messages: config.default_daily_messages,
            views: config.default_daily_views,
        }
    }
}

/// A limit column at zero or below means the engine default applies.
pub fn base_limit(stored: i32, default: i32) -> i32 {
    if stored > 0 {
        stored
    } else {
        default
    }
}

/// Today's usage next to the limits actually in force, shaped for the
/// dashboard layer.
#[derive(Debug, Clone, Serialize)]
pub struct AccountUsage {
    pub connections_used: i32,
    pub connections_limit: i32,
    pub messages_used: i32,
    pub messages_limit: i32,
    pub views_used: i32,
    pub views_limit: i32,
    pub warming_up: bool,
    pub warmup_day: i32,
}

pub fn usage(account: &account::Model, defaults: DailyDefaults) -> AccountUsage {
    AccountUsage {
        connections_used: account.connections_today,
        connections_limit: effective_limit(
            base_limit(account.daily_connection_limit, defaults.connections),
            account.warming_up,
            account.warmup_day
        ),
        messages_used: account.messages_today,
        messages_limit: effective_limit(
            base_limit(account.daily_message_limit, defaults.messages),
            account.warming_up,
            account.warmup_day
        ),
        views_used: account.views_today,
        views_limit: effective_limit(
            base_limit(account.daily_view_limit, defaults.views),
            account.warming_up,
            account.warmup_day
        ),
        warming_up: account.warming_up,
        warmup_day: account.warmup_day,
    }
}

/// The slice of account state the daily window owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCounters {
    pub connections_today: i32,
    pub messages_today: i32,
    pub views_today: i32,
    pub counters_reset_on: NaiveDate,
    pub warming_up: bool,
    pub warmup_day: i32,
}

impl From<&account::Model> for DailyCounters {
    fn from(model: &account::Model) -> Self {
        Self {
            connections_today: model.connections_today,
            messages_today: model.messages_today,
            views_today: model.views_today,
            counters_reset_on: model.counters_reset_on,
            warming_up: model.warming_up,
            warmup_day: model.warmup_day,
        }
    }
}

/// Roll the window forward when the calendar date changed: zero all
/// three counters, advance the warmup ramp, and drop out of warmup
/// once the ramp hits full capacity.
pub fn roll_daily(mut counters: DailyCounters, today: NaiveDate) -> DailyCounters {
    if counters.counters_reset_on == today {
        return counters;
    }

    counters.connections_today = 0;
    counters.messages_today = 0;
    counters.views_today = 0;
    counters.counters_reset_on = today;

    if counters.warming_up {
        counters.warmup_day += 1;
        if warmup_multiplier(counters.warmup_day) >= 1.0 {
            counters.warming_up = false;
        }
    }

    counters
}

/// Per-account daily quota bookkeeping.
///
/// `allow` only inspects; callers increment after the platform
/// confirmed the action, so retries never double-count.
#[derive(Clone)]
pub struct LimitService {
    db: DatabaseConnection,
    defaults: DailyDefaults,
}

impl LimitService {
    pub fn new(db: DatabaseConnection, defaults: DailyDefaults) -> Self {
        Self { db, defaults }
    }

    /// Today's counters next to the limits actually in force.
    pub fn usage(&self, account: &account::Model) -> AccountUsage {
        usage(account, self.defaults)
    }

    /// Persist a daily rollover if one is due, returning the current
    /// model either way. A throttled account gets its status back once
    /// the window that throttled it has passed.
    pub async fn ensure_current(&self, account: account::Model) -> Result<account::Model> {
        let today = Utc::now().date_naive();
        if account.counters_reset_on == today {
            return Ok(account);
        }

        let rolled = roll_daily(DailyCounters::from(&account), today);
        let was_rate_limited = account.status == AccountStatus::RateLimited.as_str();

        let mut model: account::ActiveModel = account.into();
        model.connections_today = Set(rolled.connections_today);
        model.messages_today = Set(rolled.messages_today);
        model.views_today = Set(rolled.views_today);
        model.counters_reset_on = Set(rolled.counters_reset_on);
        model.warming_up = Set(rolled.warming_up);
        model.warmup_day = Set(rolled.warmup_day);
        if was_rate_limited {
            model.status = Set(AccountStatus::Connected.to_string());
            model.error_code = Set(None);
            model.error_message = Set(None);
        }
        model.updated_at = Set(Utc::now());

        Ok(model.update(&self.db).await?)
    }

    /// A freshly verified account starts the ramp over from day zero,
    /// whatever its history. Counters reset with it so the first day
    /// is a genuinely quiet one.
    pub async fn restart_warmup(&self, account: account::Model) -> Result<account::Model> {
        let mut model: account::ActiveModel = account.into();
        model.warming_up = Set(true);
        model.warmup_day = Set(0);
        model.connections_today = Set(0);
        model.messages_today = Set(0);
        model.views_today = Set(0);
        model.counters_reset_on = Set(Utc::now().date_naive());
        model.updated_at = Set(Utc::now());

        Ok(model.update(&self.db).await?)
    }

    /// Whether one more action of this kind fits in today's window.
    pub fn allow(&self, account: &account::Model, kind: ActionKind) -> bool {
        let quota = match quota_kind(kind) {
            Some(quota) => quota,
            None => {
                return true;
            }
        };

        let (used, base) = match quota {
            QuotaKind::Connections => (
                account.connections_today,
                base_limit(account.daily_connection_limit, self.defaults.connections),
            ),
            QuotaKind::Messages => (
                account.messages_today,
                base_limit(account.daily_message_limit, self.defaults.messages),
            ),
            QuotaKind::Views => (
                account.views_today,
                base_limit(account.daily_view_limit, self.defaults.views),
            ),
        };

        used < effective_limit(base, account.warming_up, account.warmup_day)
    }

    /// Count a confirmed action against today's window.
    pub async fn increment(
        &self,
        account: account::Model,
        kind: ActionKind
    ) -> Result<account::Model> {
        let quota = match quota_kind(kind) {
            Some(quota) => quota,
            None => {
                return Ok(account);
            }
        };

        let connections = account.connections_today;
        let messages = account.messages_today;
        let views = account.views_today;

        let mut model: account::ActiveModel = account.into();
        match quota {
            QuotaKind::Connections => {
                model.connections_today = Set(connections + 1);
            }
            QuotaKind::Messages => {
                model.messages_today = Set(messages + 1);
            }
            QuotaKind::Views => {
                model.views_today = Set(views + 1);
            }
        }
        model.updated_at = Set(Utc::now());

        Ok(model.update(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn account(warming_up: bool, warmup_day: i32) -> account::Model {
        let now = Utc::now();
        account::Model {
            id: Uuid::new_v4(),
            tenant_id: "t1".to_string(),
            display_name: "Test".to_string(),
            profile_url: None,
            status: AccountStatus::Connected.to_string(),
            encrypted_session: None,
            encrypted_credentials: None,
            connections_today: 2,
            messages_today: 5,
            views_today: 9,
            daily_connection_limit: 25,
            daily_message_limit: 40,
            daily_view_limit: 50,
            counters_reset_on: now.date_naive(),
            warming_up,
            warmup_day,
            last_verified_at: None,
            last_synced_at: None,
            error_code: None,
            error_message: None,
            locked_at: None,
            locked_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn counters(reset_on: NaiveDate) -> DailyCounters {
        DailyCounters {
            connections_today: 7,
            messages_today: 3,
            views_today: 12,
            counters_reset_on: reset_on,
            warming_up: true,
            warmup_day: 2,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn defaults() -> DailyDefaults {
        DailyDefaults { connections: 20, messages: 50, views: 100 }
    }

    #[test]
    fn test_warmup_multiplier_ramp() {
        assert!((warmup_multiplier(0) - 0.2).abs() < f64::EPSILON);
        assert!((warmup_multiplier(4) - 0.6).abs() < 1e-9);
        assert!((warmup_multiplier(8) - 1.0).abs() < f64::EPSILON);
        assert!((warmup_multiplier(30) - 1.0).abs() < f64::EPSILON);
        assert!((warmup_multiplier(-3) - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_effective_limit_floors() {
        // 20 * 0.2 = 4 on the first warmup day
        assert_eq!(effective_limit(20, true, 0), 4);
        // 25 * 0.3 = 7.5 floors to 7
        assert_eq!(effective_limit(25, true, 1), 7);
        assert_eq!(effective_limit(20, true, 8), 20);
        assert_eq!(effective_limit(20, false, 0), 20);
    }

    #[test]
    fn test_roll_daily_same_day_is_noop() {
        let today = date(2025, 11, 4);
        let before = counters(today);
        assert_eq!(roll_daily(before.clone(), today), before);
    }

    #[test]
    fn test_roll_daily_resets_and_advances_warmup() {
        let rolled = roll_daily(counters(date(2025, 11, 3)), date(2025, 11, 4));
        assert_eq!(rolled.connections_today, 0);
        assert_eq!(rolled.messages_today, 0);
        assert_eq!(rolled.views_today, 0);
        assert_eq!(rolled.counters_reset_on, date(2025, 11, 4));
        assert_eq!(rolled.warmup_day, 3);
        assert!(rolled.warming_up);
    }

    #[test]
    fn test_roll_daily_graduates_out_of_warmup() {
        let mut c = counters(date(2025, 11, 3));
        c.warmup_day = 7;
        let rolled = roll_daily(c, date(2025, 11, 4));
        assert_eq!(rolled.warmup_day, 8);
        assert!(!rolled.warming_up);
    }

    #[test]
    fn test_day_zero_window_admits_four_of_ten() {
        // Base limit 20, first warmup day: the window holds exactly 4
        let mut used = 0;
        let mut admitted = 0;
        for _ in 0..10 {
            if used < effective_limit(20, true, 0) {
                admitted += 1;
                used += 1;
            }
        }
        assert_eq!(admitted, 4);
    }

    #[test]
    fn test_quota_kind_mapping() {
        assert_eq!(quota_kind(ActionKind::ConnectionRequest), Some(QuotaKind::Connections));
        assert_eq!(quota_kind(ActionKind::Message), Some(QuotaKind::Messages));
        assert_eq!(quota_kind(ActionKind::ProfileView), Some(QuotaKind::Views));
        assert_eq!(quota_kind(ActionKind::CheckAcceptance), Some(QuotaKind::Views));
        assert_eq!(quota_kind(ActionKind::SyncMessages), None);
    }

    #[test]
    fn test_usage_reports_effective_limits() {
        let warming = usage(&account(true, 1), defaults());
        // 25 * 0.3 floors to 7, 40 * 0.3 = 12, 50 * 0.3 = 15
        assert_eq!(warming.connections_limit, 7);
        assert_eq!(warming.messages_limit, 12);
        assert_eq!(warming.views_limit, 15);
        assert_eq!(warming.connections_used, 2);

        let graduated = usage(&account(false, 8), defaults());
        assert_eq!(graduated.connections_limit, 25);
        assert_eq!(graduated.messages_limit, 40);
        assert_eq!(graduated.views_limit, 50);
    }

    #[test]
    fn test_zero_limit_falls_back_to_engine_default() {
        assert_eq!(base_limit(25, 20), 25);
        assert_eq!(base_limit(0, 20), 20);
        assert_eq!(base_limit(-5, 50), 50);

        let mut bare = account(false, 8);
        bare.daily_connection_limit = 0;
        bare.daily_message_limit = 0;
        bare.daily_view_limit = 0;
        let report = usage(&bare, defaults());
        assert_eq!(report.connections_limit, 20);
        assert_eq!(report.messages_limit, 50);
        assert_eq!(report.views_limit, 100);
    }
}
