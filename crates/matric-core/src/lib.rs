//! Core types and trait definitions for the Matric admissions CRM.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

pub mod activity;
pub mod directory;
pub mod document;
pub mod email;
pub mod lead;
pub mod staff;
pub mod store;
pub mod student;
