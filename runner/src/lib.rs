//! Collaborators consumed by the grading pipeline at their boundary:
//! build tool invocation, repository introspection, CI status lookup,
//! coverage report merging and static analysis of student sources.

pub mod ci;
pub mod coverage;
pub mod git_history;
pub mod maven;
pub mod repo;
pub mod style;
