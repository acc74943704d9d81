//! Core trait abstractions.
//!
//! The consumer loop only talks to its collaborators through these traits, so
//! every one of them can be swapped for an in-memory fake in tests.

pub mod queue;
pub mod store;
pub mod validator;
