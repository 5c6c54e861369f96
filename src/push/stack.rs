//! A single typed stack.

use serde::{Deserialize, Serialize};

use crate::push::value::{StackKind, Value};

/// Per-value limits enforced on push.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackLimits {
    /// Clamp for numeric magnitudes.
    pub number_magnitude: f64,
    /// Truncation length for strings, vectors and code.
    pub collection_size: usize,
}

/// Ordered values of one [`StackKind`]. Index 0 of `nth` is the top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    kind: StackKind,
    items: Vec<Value>,
    limits: StackLimits,
}

impl Stack {
    /// Create an empty stack.
    #[must_use]
    pub fn new(kind: StackKind, limits: StackLimits) -> Self {
        Self {
            kind,
            items: Vec::new(),
            limits,
        }
    }

    /// Stack identifier.
    #[must_use]
    pub fn kind(&self) -> StackKind {
        self.kind
    }

    /// Number of items.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.items.len()
    }

    /// Whether the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Push a value after clamping and truncation.
    ///
    /// Returns `false` if the value was rejected: a NaN float, or a value of
    /// the wrong variant (a programmer error, asserted in debug builds).
    pub fn push(&mut self, value: Value) -> bool {
        if !self.kind.accepts(&value) {
            debug_assert!(false, "{:?} pushed onto {} stack", value, self.kind);
            return false;
        }
        match value.limited(&self.limits) {
            Some(value) => {
                self.items.push(value);
                true
            }
            None => false,
        }
    }

    /// Remove and return the top item.
    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop()
    }

    /// Top item, if any.
    #[must_use]
    pub fn top(&self) -> Option<&Value> {
        self.items.last()
    }

    /// Item `k` positions below the top.
    #[must_use]
    pub fn nth(&self, k: usize) -> Option<&Value> {
        let depth = self.items.len();
        if k < depth {
            self.items.get(depth - 1 - k)
        } else {
            None
        }
    }

    /// Insert a value so it ends up `k` positions below the top.
    ///
    /// `k` is clamped to the depth, so out-of-range positions insert at the
    /// bottom.
    pub fn insert(&mut self, k: usize, value: Value) -> bool {
        if !self.kind.accepts(&value) {
            return false;
        }
        let Some(value) = value.limited(&self.limits) else {
            return false;
        };
        let k = k.min(self.items.len());
        let at = self.items.len() - k;
        self.items.insert(at, value);
        true
    }

    /// Replace the item `k` positions below the top.
    pub fn set_nth(&mut self, k: usize, value: Value) -> bool {
        let depth = self.items.len();
        if k >= depth || !self.kind.accepts(&value) {
            return false;
        }
        let Some(value) = value.limited(&self.limits) else {
            return false;
        };
        self.items[depth - 1 - k] = value;
        true
    }

    /// Remove and return the item `k` positions below the top.
    pub fn remove_nth(&mut self, k: usize) -> Option<Value> {
        let depth = self.items.len();
        if k < depth {
            Some(self.items.remove(depth - 1 - k))
        } else {
            None
        }
    }

    /// Remove every item.
    pub fn flush(&mut self) {
        self.items.clear();
    }

    /// Items from bottom to top.
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }
}
