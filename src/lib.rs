#![allow(unused_assignments)] // thiserror/miette proc macros trigger false positives

pub mod chocolatey;
pub mod cli;
pub mod config;
pub mod disk;
pub mod error;
pub mod iso;
pub mod launch;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod privilege;
pub mod progress;
pub mod toolchain;
