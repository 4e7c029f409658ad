//! Multi-thread and multi-process contention on shared names.

#[path = "../common/mod.rs"]
mod common;

mod cross_process;
mod locking;
mod threads;
