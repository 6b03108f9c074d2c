use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::{
    prelude::{Agent, RegistrationRequest},
    registration_request::{self, Status},
};

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("agent not found")]
    AgentNotFound,

    #[error("this agent is already registered as a member")]
    AlreadyRegistered,

    #[error("registration request not found")]
    RequestNotFound,

    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Submits a self-registration request for the selected agent. Username and
/// mobile are copied from the agent record; the request starts `pending`.
pub async fn register_from_agent(
    db: &DatabaseConnection,
    agent_id: Uuid,
) -> Result<registration_request::Model, RegistrationError> {
    let agent = Agent::find_by_id(agent_id)
        .one(db)
        .await?
        .ok_or(RegistrationError::AgentNotFound)?;

    let existing = RegistrationRequest::find()
        .filter(registration_request::Column::Username.eq(&agent.name))
        .filter(registration_request::Column::MobileNumber.eq(&agent.phone))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(RegistrationError::AlreadyRegistered);
    }

    let now = Utc::now().naive_utc();
    let request = registration_request::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(agent.name),
        mobile_number: Set(agent.phone),
        panchayath_id: Set(agent.panchayath_id),
        status: Set(Status::Pending),
        approved_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(request)
}

pub async fn list_requests(
    db: &DatabaseConnection,
) -> Result<Vec<registration_request::Model>, DbErr> {
    RegistrationRequest::find()
        .order_by_desc(registration_request::Column::CreatedAt)
        .all(db)
        .await
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

/// Admin decision on a pending request. `approved_by` is recorded on
/// approval only.
pub async fn decide(
    db: &DatabaseConnection,
    request_id: Uuid,
    decision: Decision,
    decided_by: &str,
) -> Result<registration_request::Model, RegistrationError> {
    let request = RegistrationRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(RegistrationError::RequestNotFound)?;

    let mut active: registration_request::ActiveModel = request.into();
    match decision {
        Decision::Approved => {
            active.status = Set(Status::Approved);
            active.approved_by = Set(Some(decided_by.to_owned()));
        }
        Decision::Rejected => {
            active.status = Set(Status::Rejected);
        }
    }
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

pub async fn delete_request(
    db: &DatabaseConnection,
    request_id: Uuid,
) -> Result<(), RegistrationError> {
    let request = RegistrationRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(RegistrationError::RequestNotFound)?;
    request.delete(db).await?;
    Ok(())
}

/// Member login resolves to one of four distinct outcomes; none of them is
/// an error at the transport level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    Approved(registration_request::Model),
    Pending,
    Rejected,
    InvalidCredentials,
}

pub fn login_outcome(row: Option<registration_request::Model>) -> LoginOutcome {
    match row {
        Some(row) => match row.status {
            Status::Approved => LoginOutcome::Approved(row),
            Status::Pending => LoginOutcome::Pending,
            Status::Rejected => LoginOutcome::Rejected,
        },
        None => LoginOutcome::InvalidCredentials,
    }
}

/// Exact match on name + mobile against the registration requests; the
/// approved request is the credential record.
pub async fn member_login(
    db: &DatabaseConnection,
    name: &str,
    mobile: &str,
) -> Result<LoginOutcome, DbErr> {
    let row = RegistrationRequest::find()
        .filter(registration_request::Column::Username.eq(name.trim()))
        .filter(registration_request::Column::MobileNumber.eq(mobile.trim()))
        .one(db)
        .await?;
    Ok(login_outcome(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn request(status: Status) -> registration_request::Model {
        let now = Utc::now().naive_utc();
        registration_request::Model {
            id: Uuid::new_v4(),
            username: "Asha".to_owned(),
            mobile_number: "9000000002".to_owned(),
            panchayath_id: Uuid::new_v4(),
            status,
            approved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn login_outcomes_follow_request_status() {
        assert!(matches!(
            login_outcome(Some(request(Status::Approved))),
            LoginOutcome::Approved(_)
        ));
        assert_eq!(login_outcome(Some(request(Status::Pending))), LoginOutcome::Pending);
        assert_eq!(
            login_outcome(Some(request(Status::Rejected))),
            LoginOutcome::Rejected
        );
        assert_eq!(login_outcome(None), LoginOutcome::InvalidCredentials);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let existing = request(Status::Pending);
        let agent = crate::entities::agent::Model {
            id: Uuid::new_v4(),
            name: existing.username.clone(),
            phone: existing.mobile_number.clone(),
            role: crate::entities::agent::Role::Pro,
            panchayath_id: existing.panchayath_id,
            created_at: existing.created_at,
            updated_at: existing.updated_at,
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![agent.clone()]])
            .append_query_results([vec![existing]])
            .into_connection();

        let err = register_from_agent(&db, agent.id).await.unwrap_err();
        assert!(matches!(err, RegistrationError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn approval_records_the_deciding_admin() {
        let pending = request(Status::Pending);
        let mut approved = pending.clone();
        approved.status = Status::Approved;
        approved.approved_by = Some("admin".to_owned());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![pending.clone()]])
            .append_query_results([vec![approved]])
            .into_connection();

        let updated = decide(&db, pending.id, Decision::Approved, "admin")
            .await
            .unwrap();
        assert_eq!(updated.status, Status::Approved);
        assert_eq!(updated.approved_by.as_deref(), Some("admin"));
    }
}
