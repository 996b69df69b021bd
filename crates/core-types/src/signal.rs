use crate::enums::OrderSide;
use rust_decimal::Decimal;

/// Direction of an entry signal as written by the channel's analysts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Maps the signal direction onto the order side that opens the position.
    pub fn order_side(&self) -> OrderSide {
        match self {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        }
    }
}

/// Instruction to open a leveraged position with take-profit and stop-loss.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySignal {
    /// Bare asset token, without the quote suffix (e.g. "BTC").
    pub asset: String,
    pub direction: Direction,
    pub leverage: Decimal,
    pub tp: Decimal,
    pub sl: Decimal,
}

/// How much of the open position an exit signal closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitMode {
    All,
    /// Always in (0, 100]; enforced by the signal grammar.
    Percentage(Decimal),
}

/// Instruction to close all or part of an open position.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitSignal {
    pub asset: String,
    pub mode: ExitMode,
}

/// A classifier answer parsed into a typed trading instruction.
///
/// `Noise` covers both an explicit "NOISE" classification and any answer the
/// grammar could not parse; callers treat the two identically.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Noise,
    Entry(EntrySignal),
    Exit(ExitSignal),
}
