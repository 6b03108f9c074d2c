use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{agent::Role, daily_activity, prelude::DailyActivity};

/// One row of the admin-editable points table, as persisted in the local
/// store under the `agent_point_settings` key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSetting {
    pub role: Role,
    pub points_per_activity: u32,
}

/// Explicit configuration object for points computation. Loaded once at
/// startup and passed into every computation; never read ambiently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointSettings {
    weights: HashMap<Role, u32>,
}

impl Default for PointSettings {
    fn default() -> Self {
        Self::from_rows(vec![
            PointSetting {
                role: Role::Coordinator,
                points_per_activity: 5,
            },
            PointSetting {
                role: Role::Supervisor,
                points_per_activity: 3,
            },
            PointSetting {
                role: Role::GroupLeader,
                points_per_activity: 2,
            },
            PointSetting {
                role: Role::Pro,
                points_per_activity: 1,
            },
        ])
    }
}

impl PointSettings {
    pub fn from_rows(rows: Vec<PointSetting>) -> Self {
        let weights = rows
            .into_iter()
            .map(|s| (s.role, s.points_per_activity))
            .collect();
        Self { weights }
    }

    pub fn to_rows(&self) -> Vec<PointSetting> {
        let mut rows: Vec<PointSetting> = self
            .weights
            .iter()
            .map(|(&role, &points_per_activity)| PointSetting {
                role,
                points_per_activity,
            })
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse(s.points_per_activity));
        rows
    }

    /// Roles missing from the configured table fall back to a weight of 1,
    /// matching the points-check behavior of the admin panel.
    pub fn points_for(&self, role: Role) -> u32 {
        self.weights.get(&role).copied().unwrap_or(1)
    }

    pub fn set(&mut self, role: Role, points_per_activity: u32) {
        self.weights.insert(role, points_per_activity);
    }
}

/// Aggregation window for points totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointsWindow {
    Lifetime,
    CurrentMonth,
    TrailingWeek,
}

impl PointsWindow {
    /// Inclusive date bounds relative to `today`. `None` means unbounded.
    pub fn bounds(self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self {
            PointsWindow::Lifetime => (None, None),
            PointsWindow::CurrentMonth => {
                (Some(start_of_month(today)), Some(end_of_month(today)))
            }
            PointsWindow::TrailingWeek => (Some(today - Days::new(7)), None),
        }
    }

    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        let (start, end) = self.bounds(today);
        start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
    }
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .expect("first day of a month is always valid")
}

pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).expect("first day of a month is always valid")
        - Days::new(1)
}

/// Points are always recomputed fresh from the activity rows; changing a
/// role weight never rewrites previously displayed totals.
pub fn points(activity_count: u64, weight: u32) -> u64 {
    activity_count * u64::from(weight)
}

/// Point totals for the three standard display windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PointsSummary {
    pub total_points: u64,
    pub monthly_points: u64,
    pub weekly_points: u64,
    pub total_activities: u64,
}

pub fn summarize(dates: &[NaiveDate], weight: u32, today: NaiveDate) -> PointsSummary {
    let count_in = |window: PointsWindow| {
        dates.iter().filter(|d| window.contains(**d, today)).count() as u64
    };

    let total = count_in(PointsWindow::Lifetime);
    PointsSummary {
        total_points: points(total, weight),
        monthly_points: points(count_in(PointsWindow::CurrentMonth), weight),
        weekly_points: points(count_in(PointsWindow::TrailingWeek), weight),
        total_activities: total,
    }
}

/// Fetches the agent's activity dates and folds them into a
/// [`PointsSummary`] using the configured weight for `role`.
pub async fn agent_points_summary(
    db: &DatabaseConnection,
    agent_id: Uuid,
    role: Role,
    settings: &PointSettings,
    today: NaiveDate,
) -> Result<PointsSummary, DbErr> {
    let dates: Vec<NaiveDate> = DailyActivity::find()
        .filter(daily_activity::Column::AgentId.eq(agent_id))
        .all(db)
        .await?
        .into_iter()
        .map(|a| a.activity_date)
        .collect();

    Ok(summarize(&dates, settings.points_for(role), today))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_weights_match_role_table() {
        let settings = PointSettings::default();
        assert_eq!(settings.points_for(Role::Coordinator), 5);
        assert_eq!(settings.points_for(Role::Supervisor), 3);
        assert_eq!(settings.points_for(Role::GroupLeader), 2);
        assert_eq!(settings.points_for(Role::Pro), 1);
    }

    #[test]
    fn missing_role_falls_back_to_one() {
        let settings = PointSettings::from_rows(vec![PointSetting {
            role: Role::Coordinator,
            points_per_activity: 5,
        }]);
        assert_eq!(settings.points_for(Role::Pro), 1);
    }

    #[test]
    fn settings_round_trip_through_rows() {
        let mut settings = PointSettings::default();
        settings.set(Role::Pro, 4);
        let restored = PointSettings::from_rows(settings.to_rows());
        assert_eq!(restored, settings);
    }

    #[test]
    fn month_bounds_cover_whole_calendar_month() {
        let (start, end) = PointsWindow::CurrentMonth.bounds(date(2026, 2, 17));
        assert_eq!(start, Some(date(2026, 2, 1)));
        assert_eq!(end, Some(date(2026, 2, 28)));

        let (start, end) = PointsWindow::CurrentMonth.bounds(date(2026, 12, 5));
        assert_eq!(start, Some(date(2026, 12, 1)));
        assert_eq!(end, Some(date(2026, 12, 31)));
    }

    #[test]
    fn trailing_week_is_inclusive_of_seven_days_back() {
        let today = date(2026, 3, 10);
        assert!(PointsWindow::TrailingWeek.contains(date(2026, 3, 3), today));
        assert!(!PointsWindow::TrailingWeek.contains(date(2026, 3, 2), today));
        assert!(PointsWindow::TrailingWeek.contains(today, today));
    }

    #[test]
    fn summary_multiplies_counts_by_weight() {
        let today = date(2026, 3, 15);
        let dates = vec![
            date(2026, 3, 14), // in week and month
            date(2026, 3, 2),  // in month only
            date(2026, 1, 20), // lifetime only
        ];
        let summary = summarize(&dates, 5, today);
        assert_eq!(summary.total_points, 15);
        assert_eq!(summary.monthly_points, 10);
        assert_eq!(summary.weekly_points, 5);
        assert_eq!(summary.total_activities, 3);
    }

    #[test]
    fn weight_change_only_affects_fresh_computations() {
        let today = date(2026, 3, 15);
        let dates = vec![date(2026, 3, 14)];

        let before = summarize(&dates, 2, today);
        assert_eq!(before.total_points, 2);

        // A new weight changes newly computed totals; the earlier summary
        // value is untouched.
        let after = summarize(&dates, 7, today);
        assert_eq!(before.total_points, 2);
        assert_eq!(after.total_points, 7);
    }
}
