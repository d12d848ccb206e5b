use std::fmt::{Display, Formatter};

/// A handle to an interned formula node.
///
/// Two handles obtained from the same [`TermPool`][crate::pool::TermPool] are equal
/// if and only if the formulas they point to are structurally equal.
///
/// # Reserved Values
///
/// - `FormulaId::TRUE`: the constant `true`
/// - `FormulaId::FALSE`: the constant `false`
///
/// Index 0 is the sentinel cell of the underlying table and never refers to a formula.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FormulaId(u32);

impl FormulaId {
    /// The constant `true`, allocated first by every pool.
    pub const TRUE: FormulaId = FormulaId(1);

    /// The constant `false`, allocated second by every pool.
    pub const FALSE: FormulaId = FormulaId(2);

    pub const fn new(index: u32) -> Self {
        FormulaId(index)
    }

    /// Returns the raw index value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the index for table access.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_constant(self) -> bool {
        self.0 == Self::TRUE.0 || self.0 == Self::FALSE.0
    }
}

impl Display for FormulaId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            FormulaId::TRUE => write!(f, "⊤"),
            FormulaId::FALSE => write!(f, "⊥"),
            _ => write!(f, "@{}", self.0),
        }
    }
}
