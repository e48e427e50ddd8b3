//! Bamazon shop library.
//!
//! The request pipeline, route handlers and persistence of the shop, exposed
//! as a library so the pipeline can be assembled in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use app::{build_router, with_pipeline};
