use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{
    agent, management_team_member,
    prelude::{Agent, ManagementTeamMember, Task, TaskRemark},
    task::{self, Priority, Status},
    task_remark,
};

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found")]
    NotFound,

    #[error("remark not found")]
    RemarkNotFound,

    #[error("task is no longer pending")]
    AlreadyClosed,

    #[error("not allowed to act on this task")]
    Unauthorized,

    #[error("task title is required")]
    EmptyTitle,

    #[error("remark text is required")]
    EmptyRemark,

    #[error("a task may be allocated to an agent or a team, not both")]
    InvalidAllocation,

    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
    Cancelled,
    Expired,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentFilter {
    #[default]
    All,
    Agent,
    Team,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub assignment: AssignmentFilter,
}

/// Derived view over `status` and `due_date`; "expired" is never stored.
pub fn is_expired(task: &task::Model, now: NaiveDateTime) -> bool {
    task.status == Status::Pending && task.due_date.is_some_and(|due| due < now)
}

impl TaskFilter {
    pub fn matches(&self, task: &task::Model, now: NaiveDateTime) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Pending => task.status == Status::Pending,
            StatusFilter::Completed => task.status == Status::Completed,
            StatusFilter::Cancelled => task.status == Status::Cancelled,
            StatusFilter::Expired => is_expired(task, now),
        };
        let assignment_ok = match self.assignment {
            AssignmentFilter::All => true,
            AssignmentFilter::Agent => task.allocated_to_agent.is_some(),
            AssignmentFilter::Team => task.allocated_to_team.is_some(),
        };
        status_ok && assignment_ok
    }
}

/// Newest-first task listing with the derived expired view applied
/// in-process, since it cannot be expressed as a stored-status predicate.
pub async fn list_tasks(
    db: &DatabaseConnection,
    filter: TaskFilter,
    now: NaiveDateTime,
) -> Result<Vec<task::Model>, DbErr> {
    let mut tasks = Task::find()
        .order_by_desc(task::Column::CreatedAt)
        .all(db)
        .await?;
    tasks.retain(|t| filter.matches(t, now));
    Ok(tasks)
}

/// Whoever is performing a lifecycle operation. Remarks are attributed to
/// the display name, falling back to the mobile number.
#[derive(Clone, Debug, Default)]
pub struct Actor {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub is_admin: bool,
}

impl Actor {
    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            mobile: None,
            is_admin: true,
        }
    }

    pub fn member(name: Option<String>, mobile: Option<String>) -> Self {
        Self {
            name,
            mobile,
            is_admin: false,
        }
    }

    pub fn attribution(&self) -> Option<String> {
        self.name
            .as_ref()
            .filter(|n| !n.trim().is_empty())
            .or(self.mobile.as_ref())
            .cloned()
    }
}

/// Server-side authorization: the actor must be an admin, the allocated
/// agent (matched by mobile), or a member of the allocated team. Tasks with
/// no allocation are admin-only.
async fn authorize(
    db: &DatabaseConnection,
    task: &task::Model,
    actor: &Actor,
) -> Result<(), TaskError> {
    if actor.is_admin {
        return Ok(());
    }
    let Some(mobile) = actor.mobile.as_deref() else {
        return Err(TaskError::Unauthorized);
    };

    if let Some(agent_id) = task.allocated_to_agent {
        let allocated = Agent::find_by_id(agent_id).one(db).await?;
        if allocated.is_some_and(|a| a.phone == mobile) {
            return Ok(());
        }
    }

    if let Some(team_id) = task.allocated_to_team {
        let acting_agent = Agent::find()
            .filter(agent::Column::Phone.eq(mobile))
            .one(db)
            .await?;
        if let Some(acting_agent) = acting_agent {
            let membership = ManagementTeamMember::find()
                .filter(management_team_member::Column::TeamId.eq(team_id))
                .filter(management_team_member::Column::AgentId.eq(acting_agent.id))
                .one(db)
                .await?;
            if membership.is_some() {
                return Ok(());
            }
        }
    }

    Err(TaskError::Unauthorized)
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub due_date: Option<NaiveDateTime>,
    pub allocated_to_agent: Option<Uuid>,
    pub allocated_to_team: Option<Uuid>,
}

fn default_priority() -> Priority {
    Priority::Normal
}

/// Creates a task; the initial status is always `pending`.
pub async fn create_task(db: &DatabaseConnection, new: NewTask) -> Result<task::Model, TaskError> {
    if new.title.trim().is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    if new.allocated_to_agent.is_some() && new.allocated_to_team.is_some() {
        return Err(TaskError::InvalidAllocation);
    }

    let now = Utc::now().naive_utc();
    let task = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(new.title.trim().to_owned()),
        description: Set(new.description),
        status: Set(Status::Pending),
        priority: Set(new.priority),
        due_date: Set(new.due_date),
        allocated_to_agent: Set(new.allocated_to_agent),
        allocated_to_team: Set(new.allocated_to_team),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(task)
}

/// The only transitions out of `pending`; both are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosingStatus {
    Completed,
    Cancelled,
}

impl From<ClosingStatus> for Status {
    fn from(closing: ClosingStatus) -> Self {
        match closing {
            ClosingStatus::Completed => Status::Completed,
            ClosingStatus::Cancelled => Status::Cancelled,
        }
    }
}

/// Transitions a pending task to a terminal status and, when `remark` is
/// non-empty, appends an attributed remark. The status update stands even
/// if the remark insert fails afterwards; the failure is logged only.
pub async fn change_status(
    db: &DatabaseConnection,
    task_id: Uuid,
    new_status: ClosingStatus,
    remark: Option<&str>,
    actor: &Actor,
) -> Result<task::Model, TaskError> {
    let task = Task::find_by_id(task_id)
        .one(db)
        .await?
        .ok_or(TaskError::NotFound)?;

    if task.status != Status::Pending {
        return Err(TaskError::AlreadyClosed);
    }

    authorize(db, &task, actor).await?;

    let mut active: task::ActiveModel = task.into();
    active.status = Set(new_status.into());
    active.updated_at = Set(Utc::now().naive_utc());
    let updated = active.update(db).await?;

    if let Some(text) = remark.map(str::trim).filter(|t| !t.is_empty()) {
        if let Err(err) = insert_remark(db, task_id, text, actor.attribution()).await {
            tracing::warn!(task = %task_id, %err, "status changed but remark insert failed");
        }
    }

    Ok(updated)
}

async fn insert_remark(
    db: &DatabaseConnection,
    task_id: Uuid,
    text: &str,
    updated_by: Option<String>,
) -> Result<task_remark::Model, DbErr> {
    let now = Utc::now().naive_utc();
    task_remark::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_id: Set(task_id),
        remark: Set(text.to_owned()),
        updated_by: Set(updated_by),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

/// Appends a remark without touching the task status.
pub async fn add_remark(
    db: &DatabaseConnection,
    task_id: Uuid,
    text: &str,
    actor: &Actor,
) -> Result<task_remark::Model, TaskError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TaskError::EmptyRemark);
    }

    Task::find_by_id(task_id)
        .one(db)
        .await?
        .ok_or(TaskError::NotFound)?;

    Ok(insert_remark(db, task_id, text, actor.attribution()).await?)
}

pub async fn edit_remark(
    db: &DatabaseConnection,
    remark_id: Uuid,
    new_text: &str,
) -> Result<task_remark::Model, TaskError> {
    let new_text = new_text.trim();
    if new_text.is_empty() {
        return Err(TaskError::EmptyRemark);
    }

    let remark = TaskRemark::find_by_id(remark_id)
        .one(db)
        .await?
        .ok_or(TaskError::RemarkNotFound)?;

    let mut active: task_remark::ActiveModel = remark.into();
    active.remark = Set(new_text.to_owned());
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

pub async fn list_remarks(
    db: &DatabaseConnection,
    task_id: Uuid,
) -> Result<Vec<task_remark::Model>, DbErr> {
    TaskRemark::find()
        .filter(task_remark::Column::TaskId.eq(task_id))
        .order_by_desc(task_remark::Column::CreatedAt)
        .all(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::agent::Role;
    use chrono::Days;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn pending_task() -> task::Model {
        task::Model {
            id: Uuid::new_v4(),
            title: "Collect survey forms".to_owned(),
            description: None,
            status: Status::Pending,
            priority: Priority::Normal,
            due_date: None,
            allocated_to_agent: None,
            allocated_to_team: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn remark_row(task_id: Uuid, text: &str, by: Option<&str>) -> task_remark::Model {
        task_remark::Model {
            id: Uuid::new_v4(),
            task_id,
            remark: text.to_owned(),
            updated_by: by.map(str::to_owned),
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn expired_is_pending_with_past_due_date() {
        let ts = now();
        let mut task = pending_task();
        task.due_date = Some(ts - Days::new(1));
        assert!(is_expired(&task, ts));

        // A completed task past its due date is not expired.
        task.status = Status::Completed;
        assert!(!is_expired(&task, ts));

        // A pending task due in the future is not expired.
        task.status = Status::Pending;
        task.due_date = Some(ts + Days::new(1));
        assert!(!is_expired(&task, ts));
    }

    #[test]
    fn filters_compose_status_and_assignment() {
        let ts = now();
        let mut team_task = pending_task();
        team_task.allocated_to_team = Some(Uuid::new_v4());

        let filter = TaskFilter {
            status: StatusFilter::Pending,
            assignment: AssignmentFilter::Team,
        };
        assert!(filter.matches(&team_task, ts));

        let filter = TaskFilter {
            status: StatusFilter::Pending,
            assignment: AssignmentFilter::Agent,
        };
        assert!(!filter.matches(&team_task, ts));
    }

    #[test]
    fn attribution_prefers_name_over_mobile() {
        let actor = Actor::member(Some("Asha".to_owned()), Some("9000000001".to_owned()));
        assert_eq!(actor.attribution().as_deref(), Some("Asha"));

        let actor = Actor::member(None, Some("9000000001".to_owned()));
        assert_eq!(actor.attribution().as_deref(), Some("9000000001"));
    }

    #[tokio::test]
    async fn admin_completes_pending_task_with_remark() {
        let task = pending_task();
        let mut completed = task.clone();
        completed.status = Status::Completed;
        let remark = remark_row(task.id, "duplicate request", Some("admin"));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![task.clone()]])
            .append_query_results([vec![completed.clone()]])
            .append_query_results([vec![remark]])
            .into_connection();

        let updated = change_status(
            &db,
            task.id,
            ClosingStatus::Completed,
            Some("duplicate request"),
            &Actor::admin("admin"),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, Status::Completed);

        // select + update + remark insert
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn terminal_task_rejects_second_transition() {
        let mut task = pending_task();
        task.status = Status::Cancelled;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![task.clone()]])
            .into_connection();

        let err = change_status(
            &db,
            task.id,
            ClosingStatus::Completed,
            None,
            &Actor::admin("admin"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskError::AlreadyClosed));

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn stranger_mobile_is_unauthorized() {
        let agent_id = Uuid::new_v4();
        let mut task = pending_task();
        task.allocated_to_agent = Some(agent_id);

        let allocated = agent::Model {
            id: agent_id,
            name: "Asha".to_owned(),
            phone: "9000000001".to_owned(),
            role: Role::Coordinator,
            panchayath_id: Uuid::new_v4(),
            created_at: now(),
            updated_at: now(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![task.clone()]])
            .append_query_results([vec![allocated]])
            .into_connection();

        let err = change_status(
            &db,
            task.id,
            ClosingStatus::Completed,
            None,
            &Actor::member(None, Some("9000000002".to_owned())),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskError::Unauthorized));
    }

    #[tokio::test]
    async fn team_member_may_cancel_team_task() {
        let team_id = Uuid::new_v4();
        let mut task = pending_task();
        task.allocated_to_team = Some(team_id);
        let mut cancelled = task.clone();
        cancelled.status = Status::Cancelled;

        let acting = agent::Model {
            id: Uuid::new_v4(),
            name: "Biju".to_owned(),
            phone: "9000000003".to_owned(),
            role: Role::Supervisor,
            panchayath_id: Uuid::new_v4(),
            created_at: now(),
            updated_at: now(),
        };
        let membership = management_team_member::Model {
            id: Uuid::new_v4(),
            team_id,
            agent_id: acting.id,
            created_at: now(),
            updated_at: now(),
        };
        let remark = remark_row(task.id, "duplicate request", Some("Biju"));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![task.clone()]])
            .append_query_results([vec![acting.clone()]])
            .append_query_results([vec![membership]])
            .append_query_results([vec![cancelled]])
            .append_query_results([vec![remark]])
            .into_connection();

        let updated = change_status(
            &db,
            task.id,
            ClosingStatus::Cancelled,
            Some("duplicate request"),
            &Actor::member(Some("Biju".to_owned()), Some("9000000003".to_owned())),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, Status::Cancelled);
    }

    #[tokio::test]
    async fn empty_remark_is_rejected_before_any_query() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = add_remark(&db, Uuid::new_v4(), "  ", &Actor::admin("admin"))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::EmptyRemark));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn create_task_rejects_double_allocation() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = create_task(
            &db,
            NewTask {
                title: "Collect survey forms".to_owned(),
                description: None,
                priority: Priority::Normal,
                due_date: None,
                allocated_to_agent: Some(Uuid::new_v4()),
                allocated_to_team: Some(Uuid::new_v4()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskError::InvalidAllocation));
        assert!(db.into_transaction_log().is_empty());
    }
}
