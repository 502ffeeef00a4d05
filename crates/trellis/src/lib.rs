//! Trellis - a task relationship graph.
//!
//! Tasks are linked by two independent kinds of directed edge: dependencies
//! ("task depends on counterpart") and parents ("task is a sub-task of
//! counterpart"). Neither kind may ever contain a cycle. On top of the graph
//! sit read-only scheduling views such as ready-to-start, overdue and
//! today's focus.
//!
//! The crate provides both the `trellis` CLI and a library. The main entry
//! points are:
//!
//! - [`app::App`]: wires a store to the services below
//! - [`relations::RelationshipService`]: validated edge mutations and reads
//! - [`tasks::TaskService`]: task CRUD with cascading hard delete
//! - [`schedule::SchedulingViews`]: derived task lists and statistics
//! - [`graph::would_create_cycle`]: the cycle check itself

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod relations;
pub mod schedule;
pub mod storage;
pub mod tasks;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

// Terminal and JSON rendering
pub mod output;
