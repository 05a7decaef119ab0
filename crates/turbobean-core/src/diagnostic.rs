//! Unified diagnostic taxonomy for lexing, parsing, and booking.
//!
//! Diagnostics are attached to a file and a source range; they never abort
//! a solve. A single entry may carry more than one diagnostic, and an
//! `Error`-severity diagnostic marks its entry `dirty` for the purposes of
//! balance-affecting passes, while a `Warning` does not.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::intern::InternedStr;
use crate::span::Span;

/// Whether a diagnostic prevents its entry from affecting balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// The entry is treated as `dirty`: structural info remains usable but
    /// it must not affect balances.
    Error,
    /// Non-blocking; the entry still participates in booking.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// The closed set of diagnostic kinds produced across lexing, parsing,
/// account lifecycle, currency restrictions, balance/booking, balance
/// assertions, and pad realization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum DiagnosticKind {
    // Lex
    /// A `number` token did not scan as a valid decimal lexeme.
    #[error("invalid number literal")]
    InvalidNumber,
    /// A `date` token did not scan as a valid calendar date.
    #[error("invalid date literal")]
    InvalidDate,
    /// A `string` token's closing quote was never found.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// An `account` token did not match the root-then-segments grammar.
    #[error("invalid account name")]
    InvalidAccount,
    /// No lexical category matched at this position.
    #[error("invalid token")]
    InvalidToken,

    // Parse
    /// A token appeared where the grammar did not expect it.
    #[error("unexpected token: {found}")]
    UnexpectedToken {
        /// Human-readable description of the token actually found.
        found: String,
    },
    /// A directive required an account but none was given.
    #[error("missing account")]
    MissingAccount,
    /// Extra tokens remained after a directive was otherwise complete.
    #[error("trailing garbage on line")]
    TrailingGarbage,
    /// A lot spec named the same component kind more than once.
    #[error("duplicate lot spec component")]
    DuplicateLotComponent,

    // Account lifecycle
    /// A posting or balance referenced an account with no open `open`.
    #[error("account not open: {account}")]
    AccountNotOpen {
        /// The account referenced.
        account: InternedStr,
    },
    /// An `open` directive named an account that is already open.
    #[error("account already open: {account}")]
    AccountAlreadyOpen {
        /// The account referenced.
        account: InternedStr,
    },
    /// A `close` directive named an account with no matching `open`.
    #[error("close without open: {account}")]
    CloseWithoutOpen {
        /// The account referenced.
        account: InternedStr,
    },
    /// An `open` directive's booking method string did not match any
    /// supported method; the account opened with `PLAIN` booking instead.
    #[error("invalid booking method for {account}: {method}")]
    InvalidBookingMethod {
        /// The account referenced.
        account: InternedStr,
        /// The unparsed booking method string.
        method: String,
    },

    // Currency
    /// A posting's currency is not among the account's allowed currencies.
    #[error("account {account} does not hold currency {currency}")]
    DoesNotHoldCurrency {
        /// The account referenced.
        account: InternedStr,
        /// The disallowed currency.
        currency: InternedStr,
    },

    // Balance / booking
    /// A transaction's postings did not sum to zero within tolerance.
    #[error("transaction does not balance in {currency}: residual {residual}")]
    TransactionDoesNotBalance {
        /// The currency whose weight sum was non-zero.
        currency: InternedStr,
        /// The residual amount beyond tolerance.
        residual: String,
    },
    /// Zero or more than one posting omitted its amount.
    #[error("ambiguous auto amount")]
    AmbiguousAutoAmount,
    /// A posting with cost or price information targeted a plain account.
    #[error("posting requires a booked account: {account}")]
    RequiresBookedAccount {
        /// The account referenced.
        account: InternedStr,
    },
    /// A plain posting (no cost, no price) targeted a lots account that
    /// demands one.
    #[error("account is not a booked account: {account}")]
    NotABookedAccount {
        /// The account referenced.
        account: InternedStr,
    },
    /// STRICT booking found more than one candidate lot and the reduction
    /// did not exactly cover every candidate.
    #[error("ambiguous strict booking for {currency}")]
    AmbiguousStrictBooking {
        /// The currency being reduced.
        currency: InternedStr,
    },
    /// A lot spec matched no held lot.
    #[error("lot spec matches no lot for {currency}")]
    LotSpecNoMatch {
        /// The currency being reduced.
        currency: InternedStr,
    },
    /// A lot spec matched more than one held lot.
    #[error("lot spec matches more than one lot for {currency}")]
    LotSpecAmbiguousMatch {
        /// The currency being reduced.
        currency: InternedStr,
    },
    /// A lot spec's matching lots held fewer units than requested, and the
    /// posting was not permitted to cross.
    #[error("lot spec match too small for {currency}")]
    LotSpecMatchTooSmall {
        /// The currency being reduced.
        currency: InternedStr,
    },

    // Assertion
    /// A `balance` directive's asserted amount did not match the account's
    /// actual holdings within tolerance.
    #[error("balance assertion failed for {account}: expected {expected}, got {actual}")]
    BalanceAssertionFailed {
        /// The account referenced.
        account: InternedStr,
        /// The asserted amount.
        expected: String,
        /// The account's actual balance.
        actual: String,
    },

    // Pad
    /// A `pad` directive never reached a matching `balance` to realize
    /// against.
    #[error("pad directive was never used")]
    PadUnused,
}

impl DiagnosticKind {
    /// The severity this kind always carries. Every kind above is
    /// error-severity except [`Self::PadUnused`], which is a warning.
    #[must_use]
    pub const fn default_severity(&self) -> Severity {
        match self {
            Self::PadUnused | Self::InvalidBookingMethod { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A single diagnostic, attached to a file and a source span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The kind of problem.
    pub kind: DiagnosticKind,
    /// Error vs. warning.
    pub severity: Severity,
    /// The source range this diagnostic concerns.
    pub span: Span,
    /// Which loaded file this diagnostic belongs to.
    pub file_id: usize,
    /// A rendered, human-readable message (equal to `kind`'s `Display` by
    /// default, but kept as an owned field so callers can add context).
    pub message: String,
}

impl Diagnostic {
    /// Build a diagnostic from a kind, using the kind's default severity
    /// and its `Display` text as the message.
    #[must_use]
    pub fn new(kind: DiagnosticKind, span: Span, file_id: usize) -> Self {
        let severity = kind.default_severity();
        let message = kind.to_string();
        Self {
            kind,
            severity,
            span,
            file_id,
            message,
        }
    }

    /// True if this diagnostic should mark its entry `dirty`.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.file_id, self.message)
    }
}
