//! Small value types shared by formulas and transition systems.
//!
//! Names and labels are reference-counted strings, so cloning them is cheap and
//! they can be used freely as keys. Everything here is single-threaded by design.
use std::fmt;
use std::rc::Rc;

use crate::utils::hash_str;

/// Name of a formula variable or of a function symbol.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Name(Rc<str>);

impl Name {
    pub fn new(name: impl AsRef<str>) -> Self {
        Name(Rc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn my_hash(&self) -> u64 {
        hash_str(&self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Name::new(name)
    }
}

/// An event label of a transition system (and of a modality).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Label(Rc<str>);

impl Label {
    pub fn new(label: impl AsRef<str>) -> Self {
        Label(Rc::from(label.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn my_hash(&self) -> u64 {
        hash_str(&self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(label: &str) -> Self {
        Label::new(label)
    }
}

/// Kind of a modality: `<a>f` or `[a]f`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Modality {
    /// Some `a`-successor satisfies the inner formula.
    Exists,
    /// Every `a`-successor satisfies the inner formula.
    Forall,
}

impl Modality {
    pub fn dual(self) -> Self {
        match self {
            Modality::Exists => Modality::Forall,
            Modality::Forall => Modality::Exists,
        }
    }
}

/// Polarity of a fixed point.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Polarity {
    /// `mu X.f`: unfolding cycles default to failure.
    Least,
    /// `nu X.f`: unfolding cycles default to success.
    Greatest,
}

impl Polarity {
    pub fn dual(self) -> Self {
        match self {
            Polarity::Least => Polarity::Greatest,
            Polarity::Greatest => Polarity::Least,
        }
    }

    /// Verdict for a variable whose unfolding at the same state repeats along a branch.
    pub fn regress_value(self) -> bool {
        matches!(self, Polarity::Greatest)
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Least => write!(f, "mu"),
            Polarity::Greatest => write!(f, "nu"),
        }
    }
}

/// A state identifier of the explicit [`Lts`][crate::lts::Lts].
///
/// States are numbered densely from 0; the initial state is usually `StateId(0)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateId(u32);

impl StateId {
    pub const fn new(index: u32) -> Self {
        StateId(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}
