pub mod classify;
pub mod config;
pub mod entitlement;
pub mod execution;
pub mod manifest;
pub mod models;
pub mod scan;
pub mod sources;
pub mod status;
pub mod version;
