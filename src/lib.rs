//! Student attendance bookkeeping: record repositories over SQLite, the
//! attendance service, CSV reports, and the JSON line protocol the desktop
//! front end drives.

pub mod config;
pub mod db;
pub mod export;
pub mod ipc;
pub mod model;
pub mod repo;
pub mod service;
pub mod validate;
