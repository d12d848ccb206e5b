//! Explicit work stack replacing native recursion.
//!
//! Every walk over formulas and tableaux in this crate is written as a set of steps
//! pushed onto a [`Trampoline`]. A step that needs the results of sub-computations pushes
//! *itself* first and the sub-computations after it, so the sub-computations run first
//! (last in, first out). When the step runs again it finds their results in a memo table
//! owned by the context and restarts from scratch.
//!
//! ```
//! use mucalc_rs::trampoline::Trampoline;
//!
//! // Sum 1..=n without recursion, collecting into the context.
//! fn sum(t: &mut Trampoline<'_, u64>, n: u64) {
//!     if n > 0 {
//!         t.push(move |acc: &mut u64, t: &mut Trampoline<'_, u64>| {
//!             *acc += n;
//!             sum(t, n - 1);
//!         });
//!     }
//! }
//!
//! let mut t = Trampoline::new();
//! let mut acc = 0;
//! sum(&mut t, 100_000);
//! t.run(&mut acc);
//! assert_eq!(acc, 5_000_050_000);
//! ```

use std::fmt;

/// A single unit of work.
pub type Step<'a, C> = Box<dyn FnOnce(&mut C, &mut Trampoline<'a, C>) + 'a>;

pub struct Trampoline<'a, C> {
    stack: Vec<Step<'a, C>>,
    executed: usize,
}

impl<'a, C> Default for Trampoline<'a, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, C> fmt::Debug for Trampoline<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trampoline")
            .field("pending", &self.stack.len())
            .field("executed", &self.executed)
            .finish()
    }
}

impl<'a, C> Trampoline<'a, C> {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            executed: 0,
        }
    }

    /// Schedule a step. The most recently pushed step runs first.
    pub fn push<F>(&mut self, step: F)
    where
        F: FnOnce(&mut C, &mut Trampoline<'a, C>) + 'a,
    {
        self.stack.push(Box::new(step));
    }

    /// Run exactly one step. Returns `false` if there was nothing to run.
    pub fn step(&mut self, context: &mut C) -> bool {
        match self.stack.pop() {
            Some(step) => {
                self.executed += 1;
                step(context, self);
                true
            }
            None => false,
        }
    }

    /// Run steps until the stack is empty.
    pub fn run(&mut self, context: &mut C) {
        while self.step(context) {}
    }

    /// Run at most `limit` steps. Returns the number of steps actually run.
    pub fn run_for(&mut self, context: &mut C, limit: usize) -> usize {
        let mut n = 0;
        while n < limit && self.step(context) {
            n += 1;
        }
        n
    }

    /// Drop all pending steps.
    pub fn abort(&mut self) {
        self.stack.clear();
    }

    /// Number of pending steps.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Number of steps run so far.
    pub fn executed(&self) -> usize {
        self.executed
    }
}
