/// Implementation category of a registered function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Trailing window along one symbol's date-ordered rows.
    Ts,
    /// Across all symbols sharing one date.
    Cs,
    /// Independently per cell.
    Elem,
}

impl Domain {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ts => "ts",
            Self::Cs => "cs",
            Self::Elem => "elem",
        }
    }
}
