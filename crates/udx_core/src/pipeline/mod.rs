//! Multi-phase transforms over partitioned, ordered rows.
//!
//! A transform is planned once against its input schema, each phase
//! validating what it receives and declaring what it emits. At execution
//! time the executor groups and sorts rows per phase and hands each
//! partition to a fresh processor instance.

pub mod executor;
pub mod inverted_index;
pub mod phase;
pub mod reader;
