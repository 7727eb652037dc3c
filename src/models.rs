pub mod auth;
pub mod chat;
pub mod crm;
pub mod dashboard;
pub mod module;
pub mod report;
pub mod sales;
pub mod task;
pub mod user;
