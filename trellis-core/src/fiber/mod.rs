//! Work-Node Model
//!
//! The work tree mirrors the latest tree description. Each logical node has
//! at most two versions at a time: the one in the committed ("current") tree
//! and the one being built. The two name each other through `alternate`.
//!
//! # Design Decisions
//!
//! 1. Nodes live in a [`FiberArena`] keyed by [`FiberId`]; `parent`, `child`,
//!    `sibling` and `alternate` are ids. There is no ownership cycle to break.
//!
//! 2. A node's kind is a closed [`WorkTag`], matched exhaustively by the work
//!    loop and the committer.
//!
//! 3. `flags` starts as `PLACEMENT` and is only replaced when the reconciler
//!    proves a node can be reused.

mod arena;
mod node;

pub use arena::FiberArena;
pub use node::{FiberId, Flags, StateNode, WorkNode, WorkTag};
