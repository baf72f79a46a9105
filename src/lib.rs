//! deploy-sync - a GitHub bot that keeps a downstream repository pinned to
//! its primary repository and reverts commits on request.
//!
//! The library holds everything but process startup: configuration, the
//! command runner, checkout management, webhook intake, the bump and revert
//! workflows, and the HTTP router that ties them together.

pub mod command;
pub mod config;
pub mod git;
pub mod report;
pub mod server;
pub mod types;
pub mod webhooks;
pub mod workflows;

#[cfg(test)]
mod test_utils;
