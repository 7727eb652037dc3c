pub mod auth;
pub mod chat;
pub mod crm;
pub mod dashboard;
pub mod permissions;
pub mod reports;
pub mod sales;
pub mod tasks;
pub mod users;
