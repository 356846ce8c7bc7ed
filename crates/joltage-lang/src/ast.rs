use crate::lexer::Span;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub machines: Vec<Machine>,
}

/// One input line: `[.##.] (3) (1,3) (2) {3,5,4,7}`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub span: Span,
    /// Light diagram, `true` for `#`
    pub lights: Option<Vec<bool>>,
    pub buttons: Vec<Button>,
    /// Joltage target per counter
    pub joltages: Vec<i64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub span: Span,
    /// Counters (and lights) this button acts on
    pub counters: Vec<usize>,
}
