//! Database row structs and create/update DTOs.

pub mod activity;
pub mod contact;
pub mod notification;
pub mod opportunity;
pub mod project;
pub mod run;
pub mod task;
pub mod user;
pub mod workflow;
