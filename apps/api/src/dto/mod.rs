//! Request and response payloads for the HTTP surface.

pub mod audit;
pub mod auth;
pub mod site;
pub mod tasks;
pub mod users;
