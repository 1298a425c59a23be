//! Landed fish and the keep/release policy

pub mod base;
pub mod fish_service;

pub use base::{Catch, Decision};
pub use fish_service::CatchPolicy;
