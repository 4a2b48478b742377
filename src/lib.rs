//! Human-in-the-loop agent client
//!
//! Streams agent runs from a graph backend, keeps the conversation view in
//! step with the server, and lets a person approve, edit, ignore or answer
//! the interrupts an agent raises before it continues.

pub mod artifact;
pub mod config;
pub mod frame;
pub mod interrupt;
pub mod message;
pub mod reconcile;
pub mod session;
pub mod transport;
