//! Stateless repositories — every method takes `&Connection`.
//!
//! Repositories know SQL and row mapping, nothing else. Transaction
//! boundaries and per-node locking live in [`crate::store`].

pub mod event;
pub mod graph;
pub mod message;
pub mod node;
pub mod summary;

pub use event::EventRepo;
pub use graph::GraphRepo;
pub use message::MessageRepo;
pub use node::NodeRepo;
pub use summary::SummaryRepo;
