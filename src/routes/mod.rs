pub mod activity;
pub mod admin;
pub mod dashboard;
pub mod events;
pub mod points;
pub mod registration;
pub mod reports;
pub mod staff;
pub mod tasks;
