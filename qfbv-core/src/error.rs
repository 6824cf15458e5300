//! Error taxonomy for expression construction.

use crate::bv::BvWidth;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ExprError>;

/// Errors returned by fallible constructors and constant accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    /// Operands of a width-sensitive operation have different widths.
    #[error("operands have different widths ({lhs} and {rhs})")]
    WidthMismatch {
        /// Width of the left (or first) operand.
        lhs: BvWidth,
        /// Width of the right (or offending) operand.
        rhs: BvWidth,
    },

    /// An extract or truncate range does not fit the operand.
    #[error("range [{high}:{low}] out of bounds for width {width}")]
    OutOfBounds {
        /// High bit of the requested range.
        high: BvWidth,
        /// Low bit of the requested range.
        low: BvWidth,
        /// Width of the operand the range was applied to.
        width: BvWidth,
    },

    /// A constant value was requested from a non-constant expression.
    #[error("expression is not a constant")]
    NotAConstant,
}
