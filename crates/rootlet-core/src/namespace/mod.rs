//! Linux namespace management for process isolation.
//!
//! Only the PID namespace is used: the launched command gets its own
//! process ID space while sharing the host's network and IPC.

pub mod pid;
