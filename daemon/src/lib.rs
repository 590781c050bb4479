//! Background service that watches which executables are running on the
//! host, classifies each against a persisted catalog of user-categorized
//! applications, and raises domain events for policy consumers (time-limit
//! enforcement, categorization prompts).
//!
//! The process table is polled on a background task; transitions cross to
//! the main event loop over an order-preserving channel, where all catalog
//! state lives and mutates.

pub mod application;
pub mod categorization;
pub mod config;
pub mod dispatcher;
pub mod enforcement;
pub mod event;
pub mod logging;
pub mod monitor;
pub mod paths;
pub mod pipeline;
pub mod repository;
pub mod snapshot;
