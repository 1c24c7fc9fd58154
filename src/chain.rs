//! The immutable linked chain that a [`Stack`](crate::Stack) dispatches
//! through.
//!
//! # Shape
//!
//! `[h0, h1, h2]` becomes
//!
//! ```text
//! Link(h0) ──▶ Link(h1) ──▶ Link(h2) ──▶ End
//! ```
//!
//! Each link hands its handler a [`Next`] pointing at the following node.
//! `End` absorbs any continuation that runs past the last handler, so no
//! handler ever needs to check whether it is last.
//!
//! The chain is built back to front: every `next` is fully constructed
//! before the node that owns it, so there is no back-patching and no
//! reference cycle. Nodes are never mutated after construction; appending a
//! handler to a stack builds a brand-new chain, and requests still running
//! against a previous [`Chain`] handle keep seeing the old one.

use std::sync::Arc;

use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::Response;

enum Node {
    Link { handler: BoxedHandler, next: Box<Node> },
    End,
}

impl Node {
    fn invoke(&self, rw: &mut Response<'_>, req: &mut Request) {
        match self {
            Self::Link { handler, next } => handler.serve(rw, req, Next { node: &**next }),
            Self::End => {}
        }
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The continuation handed to every [`Handler`](crate::Handler).
///
/// `Next` is `Copy`: running it twice re-runs the remainder of the chain,
/// which is legal but rarely what you want. Running it from the last handler
/// in a stack does nothing.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    node: &'a Node,
}

impl Next<'_> {
    /// Runs the rest of the chain.
    pub fn run(self, rw: &mut Response<'_>, req: &mut Request) {
        self.node.invoke(rw, req);
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// A shared handle to a fully-built chain.
///
/// Cloning is one atomic increment. The nodes behind it are immutable and
/// `Send + Sync`, so any number of requests can run through the same chain
/// concurrently.
#[derive(Clone)]
pub struct Chain {
    head: Arc<Node>,
    len: usize,
}

impl Chain {
    /// Builds `[h0, .., hn-1]` into `h0 -> .. -> hn-1 -> End`. O(n).
    pub fn build(handlers: &[BoxedHandler]) -> Self {
        let head = handlers.iter().rev().fold(Node::End, |next, handler| Node::Link {
            handler: Arc::clone(handler),
            next: Box::new(next),
        });
        Self { head: Arc::new(head), len: handlers.len() }
    }

    /// Runs the chain from its first handler.
    pub fn invoke(&self, rw: &mut Response<'_>, req: &mut Request) {
        self.head.invoke(rw, req);
    }

    /// Number of links before the terminal node.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Walks `next` references from the head; used to check that the
    /// recorded length and the linked structure agree.
    #[cfg(test)]
    fn depth(&self) -> usize {
        let mut node: &Node = &self.head;
        let mut steps = 0;
        while let Node::Link { next, .. } = node {
            node = &**next;
            steps += 1;
        }
        steps
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::build(&[])
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("len", &self.len).finish()
    }
}
