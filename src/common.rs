pub mod envelope;
pub mod error;
pub mod i18n;
