//! taskwell-lib: task orchestration for container-shipped projects
//!
//! This crate provides the pieces behind the `taskwell` CLI:
//! - `config`: resolves tunables into one immutable `ConfigSnapshot`
//! - `task`: declarative task records and the validated `TaskRegistry`
//! - `execute`: the `Orchestrator`, running plans directly or in a sandbox
//! - `sandbox`: container engine probes and the multi-platform builder
//! - `release`: per-platform fan-out followed by a single publish

pub mod config;
pub mod consts;
pub mod execute;
pub mod placeholder;
pub mod platform;
pub mod release;
pub mod sandbox;
pub mod task;
pub mod util;
