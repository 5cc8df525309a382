//! Fitness Tracker Backend Library
//!
//! A modular monolith: the Identity, Users and Exercises modules each own
//! their tables, receive requests through the [`mediator`] and exchange
//! integration events through the transactional outbox in [`messaging`].

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod mediator;
pub mod messaging;
pub mod modules;
pub mod routes;
pub mod state;
