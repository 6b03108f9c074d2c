use std::collections::HashSet;

use chrono::{Days, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::{
    agent, daily_activity, panchayath,
    prelude::{Agent, DailyActivity, ManagementTeamMember, Panchayath},
};
use crate::ops::points::{self, PointSettings, PointsWindow};

/// Auto-generated placeholder description for a missed day.
pub const LEAVE_DESCRIPTION: &str = "Leave";

#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("agent not found")]
    AgentNotFound,

    #[error("activity description is required")]
    EmptyDescription,

    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Agent as resolved by mobile lookup, enriched the way the activity log
/// presents it.
#[derive(Clone, Debug, serde::Serialize)]
pub struct AgentProfile {
    pub agent: agent::Model,
    pub panchayath: Option<panchayath::Model>,
    pub is_team_member: bool,
}

/// Exact-match lookup by mobile number. No fuzzy matching; a miss is
/// terminal for the calling flow.
pub async fn find_agent_by_mobile(
    db: &DatabaseConnection,
    mobile: &str,
) -> Result<AgentProfile, ActivityError> {
    let agent = Agent::find()
        .filter(agent::Column::Phone.eq(mobile.trim()))
        .one(db)
        .await?
        .ok_or(ActivityError::AgentNotFound)?;

    let panchayath = Panchayath::find_by_id(agent.panchayath_id).one(db).await?;

    let is_team_member = ManagementTeamMember::find()
        .filter(crate::entities::management_team_member::Column::AgentId.eq(agent.id))
        .one(db)
        .await?
        .is_some();

    Ok(AgentProfile {
        agent,
        panchayath,
        is_team_member,
    })
}

pub async fn list_activities(
    db: &DatabaseConnection,
    agent_id: Uuid,
) -> Result<Vec<daily_activity::Model>, DbErr> {
    DailyActivity::find()
        .filter(daily_activity::Column::AgentId.eq(agent_id))
        .order_by_desc(daily_activity::Column::ActivityDate)
        .all(db)
        .await
}

/// Result of [`record_activity`]. The points notification is carried only
/// on the first-ever entry for that date; re-submissions update silently.
#[derive(Clone, Debug)]
pub enum RecordOutcome {
    Logged {
        activity: daily_activity::Model,
        points_earned: u64,
        monthly_total: u64,
        monthly_activities: u64,
    },
    Updated {
        activity: daily_activity::Model,
    },
}

/// Records one activity note per agent per calendar date: updates the
/// existing row for `(agent, date)` when present, inserts otherwise.
pub async fn record_activity(
    db: &DatabaseConnection,
    agent: &agent::Model,
    date: NaiveDate,
    description: &str,
    settings: &PointSettings,
    today: NaiveDate,
) -> Result<RecordOutcome, ActivityError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(ActivityError::EmptyDescription);
    }

    let existing = DailyActivity::find()
        .filter(daily_activity::Column::AgentId.eq(agent.id))
        .filter(daily_activity::Column::ActivityDate.eq(date))
        .one(db)
        .await?;

    if let Some(existing) = existing {
        let mut activity: daily_activity::ActiveModel = existing.into();
        activity.activity_description = Set(description.to_owned());
        activity.updated_at = Set(Utc::now().naive_utc());
        let activity = activity.update(db).await?;
        return Ok(RecordOutcome::Updated { activity });
    }

    let now = Utc::now().naive_utc();
    let activity = daily_activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        agent_id: Set(agent.id),
        mobile_number: Set(agent.phone.clone()),
        activity_date: Set(date),
        activity_description: Set(description.to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    // Monthly total for the points popup, recomputed over the current
    // calendar month including the row just inserted.
    let weight = settings.points_for(agent.role);
    let monthly_activities = list_activities(db, agent.id)
        .await?
        .into_iter()
        .filter(|a| PointsWindow::CurrentMonth.contains(a.activity_date, today))
        .count() as u64;

    Ok(RecordOutcome::Logged {
        activity,
        points_earned: u64::from(weight),
        monthly_total: points::points(monthly_activities, weight),
        monthly_activities,
    })
}

/// Back-fills yesterday as "Leave" when no entry exists. Exactly one day is
/// checked; older gaps are left alone. Idempotent. Invoked from the mobile
/// lookup flow but independently callable.
pub async fn ensure_leave_for_yesterday(
    db: &DatabaseConnection,
    agent: &agent::Model,
    today: NaiveDate,
) -> Result<Option<daily_activity::Model>, DbErr> {
    let yesterday = today - Days::new(1);

    let existing = DailyActivity::find()
        .filter(daily_activity::Column::AgentId.eq(agent.id))
        .filter(daily_activity::Column::ActivityDate.eq(yesterday))
        .one(db)
        .await?;

    if existing.is_some() {
        return Ok(None);
    }

    let now = Utc::now().naive_utc();
    let leave = daily_activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        agent_id: Set(agent.id),
        mobile_number: Set(agent.phone.clone()),
        activity_date: Set(yesterday),
        activity_description: Set(LEAVE_DESCRIPTION.to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    tracing::debug!(agent = %agent.id, date = %yesterday, "created leave entry for missed day");
    Ok(Some(leave))
}

/// Display classification for a calendar date. Derived, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateClass {
    HasActivity,
    NoActivity,
    Open,
}

pub fn classify_date(date: NaiveDate, today: NaiveDate, logged: &HashSet<NaiveDate>) -> DateClass {
    if logged.contains(&date) {
        DateClass::HasActivity
    } else if date < today - Days::new(1) {
        DateClass::NoActivity
    } else {
        DateClass::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::agent::Role;
    use sea_orm::{DatabaseBackend, MockDatabase, Transaction};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn asha() -> agent::Model {
        let now = Utc::now().naive_utc();
        agent::Model {
            id: Uuid::new_v4(),
            name: "Asha".to_owned(),
            phone: "9000000001".to_owned(),
            role: Role::Coordinator,
            panchayath_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn activity(agent: &agent::Model, on: NaiveDate, text: &str) -> daily_activity::Model {
        let now = Utc::now().naive_utc();
        daily_activity::Model {
            id: Uuid::new_v4(),
            agent_id: agent.id,
            mobile_number: agent.phone.clone(),
            activity_date: on,
            activity_description: text.to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn first_entry_inserts_and_notifies_points() {
        let agent = asha();
        let today = date(2026, 3, 10);
        let inserted = activity(&agent, today, "Visited ward 4");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<daily_activity::Model>::new()]) // no existing row
            .append_query_results([vec![inserted.clone()]]) // insert returning
            .append_query_results([vec![inserted.clone()]]) // month recount
            .into_connection();

        let outcome = record_activity(
            &db,
            &agent,
            today,
            "Visited ward 4",
            &PointSettings::default(),
            today,
        )
        .await
        .unwrap();

        match outcome {
            RecordOutcome::Logged {
                points_earned,
                monthly_total,
                monthly_activities,
                ..
            } => {
                assert_eq!(points_earned, 5);
                assert_eq!(monthly_activities, 1);
                assert_eq!(monthly_total, 5);
            }
            RecordOutcome::Updated { .. } => panic!("expected insert outcome"),
        }
    }

    #[tokio::test]
    async fn resubmission_updates_without_notification() {
        let agent = asha();
        let today = date(2026, 3, 10);
        let existing = activity(&agent, today, "Visited ward 4");
        let mut updated = existing.clone();
        updated.activity_description = "Visited wards 4 and 5".to_owned();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing]])
            .append_query_results([vec![updated.clone()]])
            .into_connection();

        let outcome = record_activity(
            &db,
            &agent,
            today,
            "Visited wards 4 and 5",
            &PointSettings::default(),
            today,
        )
        .await
        .unwrap();

        match outcome {
            RecordOutcome::Updated { activity } => {
                assert_eq!(activity.activity_description, "Visited wards 4 and 5");
            }
            RecordOutcome::Logged { .. } => panic!("expected update outcome"),
        }
    }

    #[tokio::test]
    async fn empty_description_is_rejected_before_any_query() {
        let agent = asha();
        let today = date(2026, 3, 10);
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = record_activity(&db, &agent, today, "   ", &PointSettings::default(), today)
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::EmptyDescription));

        let log: Vec<Transaction> = db.into_transaction_log();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn leave_backfill_inserts_once() {
        let agent = asha();
        let today = date(2026, 3, 10);
        let leave = activity(&agent, today - Days::new(1), LEAVE_DESCRIPTION);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<daily_activity::Model>::new()])
            .append_query_results([vec![leave.clone()]])
            .into_connection();

        let created = ensure_leave_for_yesterday(&db, &agent, today).await.unwrap();
        assert_eq!(
            created.map(|a| a.activity_description),
            Some(LEAVE_DESCRIPTION.to_owned())
        );
    }

    #[tokio::test]
    async fn leave_backfill_is_idempotent() {
        let agent = asha();
        let today = date(2026, 3, 10);
        let existing = activity(&agent, today - Days::new(1), LEAVE_DESCRIPTION);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing]])
            .into_connection();

        let created = ensure_leave_for_yesterday(&db, &agent, today).await.unwrap();
        assert!(created.is_none());

        // Only the existence check hit the store.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn calendar_classification() {
        let today = date(2026, 3, 10);
        let logged: HashSet<NaiveDate> = [date(2026, 3, 7)].into_iter().collect();

        assert_eq!(
            classify_date(date(2026, 3, 7), today, &logged),
            DateClass::HasActivity
        );
        // Strictly before yesterday with no entry.
        assert_eq!(
            classify_date(date(2026, 3, 8), today, &logged),
            DateClass::NoActivity
        );
        // Yesterday and today stay open even without an entry.
        assert_eq!(
            classify_date(date(2026, 3, 9), today, &logged),
            DateClass::Open
        );
        assert_eq!(classify_date(today, today, &logged), DateClass::Open);
    }
}
