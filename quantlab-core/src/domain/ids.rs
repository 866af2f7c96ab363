use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a submitted order. Assigned at submission, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderRef(pub u64);

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sequential ID generator. One per run, so IDs replay identically.
#[derive(Debug, Clone, Default)]
pub struct IdGen {
    next_order: u64,
}

impl IdGen {
    pub fn next_order_ref(&mut self) -> OrderRef {
        self.next_order += 1;
        OrderRef(self.next_order)
    }
}
