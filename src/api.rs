pub mod accounts;
pub mod base;
pub mod login;
pub mod profile;
pub mod session;
