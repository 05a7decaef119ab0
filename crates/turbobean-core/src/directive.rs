//! Directive types representing all beancount directives, and the columnar
//! posting table they reference.
//!
//! Beancount directives are a tagged union sharing a `{date, meta}` prefix:
//!
//! - [`Transaction`] — records transfers between accounts.
//! - [`Balance`] — asserts an account's balance at a point in time.
//! - [`Open`] / [`Close`] — account lifecycle.
//! - [`Commodity`] — declares a currency/commodity.
//! - [`Pad`] — defers balancing to the next [`Balance`].
//! - [`Event`], [`Query`], [`Note`], [`Document`], [`Price`], [`Custom`],
//!   [`Pnl`].
//!
//! Postings are not stored inline on [`Transaction`]: per the data model,
//! they live in a columnar [`PostingTable`] shared by every transaction in a
//! file, and a transaction carries only a `[start, end)` range into it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use crate::cost::CostSpec;
use crate::intern::InternedStr;
use crate::{Amount, IncompleteAmount};

/// Metadata value types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaValue {
    /// String value
    String(String),
    /// Account reference
    Account(String),
    /// Currency code
    Currency(String),
    /// Tag reference
    Tag(String),
    /// Link reference
    Link(String),
    /// Date value
    Date(NaiveDate),
    /// Numeric value
    Number(Decimal),
    /// Boolean value
    Bool(bool),
    /// Amount value
    Amount(Amount),
    /// Null/None value
    None,
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Account(a) => write!(f, "{a}"),
            Self::Currency(c) => write!(f, "{c}"),
            Self::Tag(t) => write!(f, "#{t}"),
            Self::Link(l) => write!(f, "^{l}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Amount(a) => write!(f, "{a}"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Metadata is a key-value map attached to directives and postings.
pub type Metadata = HashMap<String, MetaValue>;

/// The `{…}` annotation on a posting, narrowing or overriding lot fields.
///
/// Any combination of fields may be present, including all-none (an empty
/// `{}`, which under `STRICT`/`FIFO`/`LIFO` still narrows the candidate set
/// to "any lot of this currency" but carries no override for augmenting).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotSpec {
    /// An explicit per-unit `(number, currency)` cost component, from either
    /// `{N CCY}` or the part of `{N # M CCY}` before the `#`.
    pub cost: Option<(Decimal, InternedStr)>,
    /// An explicit total-cost `(number, currency)` component, from either
    /// `{{N CCY}}` or the part of `{N # M CCY}` after the `#`. The currency
    /// here is only present when `cost` didn't already supply one.
    pub cost_total: Option<(Decimal, Option<InternedStr>)>,
    /// An explicit acquisition date component.
    pub date: Option<NaiveDate>,
    /// An explicit label component.
    pub label: Option<String>,
    /// The `*` merge marker (average-cost booking), parsed but not acted on
    /// since average-cost booking is not implemented.
    pub merge: bool,
}

impl LotSpec {
    /// An empty lot spec (`{}`): matches any lot of the currency, overrides
    /// nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            cost: None,
            cost_total: None,
            date: None,
            label: None,
            merge: false,
        }
    }

    /// True if no component is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cost.is_none()
            && self.cost_total.is_none()
            && self.date.is_none()
            && self.label.is_none()
            && !self.merge
    }

    /// Convert to a [`CostSpec`] for use by the booking engine's matching
    /// and lot-construction logic, which already implements the override
    /// priority described in the design notes.
    #[must_use]
    pub fn to_cost_spec(&self) -> CostSpec {
        let mut spec = CostSpec::empty();
        if let Some((number, currency)) = &self.cost {
            spec = spec.with_number_per(*number).with_currency(currency);
        }
        if let Some((number, currency)) = &self.cost_total {
            spec = spec.with_number_total(*number);
            if let Some(currency) = currency {
                if spec.currency.is_none() {
                    spec = spec.with_currency(currency);
                }
            }
        }
        if let Some(date) = self.date {
            spec = spec.with_date(date);
        }
        if let Some(label) = &self.label {
            spec = spec.with_label(label.clone());
        }
        if self.merge {
            spec = spec.with_merge();
        }
        spec
    }
}

impl fmt::Display for LotSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some((number, currency)) = &self.cost {
            parts.push(format!("{number} {currency}"));
        }
        if let Some((number, currency)) = &self.cost_total {
            match currency {
                Some(c) => parts.push(format!("# {number} {c}")),
                None => parts.push(format!("# {number}")),
            }
        }
        if let Some(date) = self.date {
            parts.push(date.to_string());
        }
        if let Some(label) = &self.label {
            parts.push(format!("\"{label}\""));
        }
        if self.merge {
            parts.push("*".to_string());
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Which kind of price annotation a posting column slot holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceKind {
    /// No price annotation.
    #[default]
    None,
    /// Per-unit price (`@`).
    PerUnit,
    /// Total price (`@@`).
    Total,
}

/// A half-open `[start, end)` range into a file's [`PostingTable`].
pub type PostingRange = Range<usize>;

/// The columnar storage for every posting in a file.
///
/// Parallel arrays avoid one allocation per posting: parsing a file appends
/// rows to each column as it encounters postings, and a [`Transaction`]
/// stores only the `[start, end)` range of rows it owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostingTable {
    account: Vec<InternedStr>,
    number: Vec<Option<Decimal>>,
    currency: Vec<Option<InternedStr>>,
    price_kind: Vec<PriceKind>,
    price_number: Vec<Option<Decimal>>,
    price_currency: Vec<Option<InternedStr>>,
    lot_spec: Vec<Option<LotSpec>>,
    flag: Vec<Option<char>>,
    meta: Vec<Metadata>,
}

/// A single posting, before it is appended to a [`PostingTable`].
#[derive(Debug, Clone, Default)]
pub struct PostingRow {
    /// Account for this posting.
    pub account: InternedStr,
    /// Amount number, if given (`None` when fully auto or currency-only).
    pub number: Option<Decimal>,
    /// Amount currency, if given (`None` when fully auto or number-only).
    pub currency: Option<InternedStr>,
    /// Price annotation kind.
    pub price_kind: PriceKind,
    /// Price number, if the annotation gave one.
    pub price_number: Option<Decimal>,
    /// Price currency, if the annotation gave one.
    pub price_currency: Option<InternedStr>,
    /// Lot spec, if a `{…}` annotation was present.
    pub lot_spec: Option<LotSpec>,
    /// Per-posting flag (e.g. `!`).
    pub flag: Option<char>,
    /// Posting metadata.
    pub meta: Metadata,
}

impl PostingRow {
    /// A posting with a complete amount.
    #[must_use]
    pub fn new(account: impl Into<InternedStr>, units: Amount) -> Self {
        Self {
            account: account.into(),
            number: Some(units.number),
            currency: Some(units.currency),
            ..Self::default()
        }
    }

    /// A posting with no amount at all, to be fully interpolated.
    #[must_use]
    pub fn auto(account: impl Into<InternedStr>) -> Self {
        Self {
            account: account.into(),
            ..Self::default()
        }
    }

    /// Attach a lot spec.
    #[must_use]
    pub fn with_lot_spec(mut self, spec: LotSpec) -> Self {
        self.lot_spec = Some(spec);
        self
    }

    /// Attach a per-unit price.
    #[must_use]
    pub fn with_unit_price(mut self, price: Amount) -> Self {
        self.price_kind = PriceKind::PerUnit;
        self.price_number = Some(price.number);
        self.price_currency = Some(price.currency);
        self
    }

    /// Attach a total price.
    #[must_use]
    pub fn with_total_price(mut self, price: Amount) -> Self {
        self.price_kind = PriceKind::Total;
        self.price_number = Some(price.number);
        self.price_currency = Some(price.currency);
        self
    }

    /// Attach a posting-level flag.
    #[must_use]
    pub const fn with_flag(mut self, flag: char) -> Self {
        self.flag = Some(flag);
        self
    }
}

impl PostingTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of postings stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.account.len()
    }

    /// True if no postings have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.account.is_empty()
    }

    /// Append a posting, returning its index.
    pub fn push(&mut self, row: PostingRow) -> usize {
        let idx = self.len();
        self.account.push(row.account);
        self.number.push(row.number);
        self.currency.push(row.currency);
        self.price_kind.push(row.price_kind);
        self.price_number.push(row.price_number);
        self.price_currency.push(row.price_currency);
        self.lot_spec.push(row.lot_spec);
        self.flag.push(row.flag);
        self.meta.push(row.meta);
        idx
    }

    /// Append a contiguous run of postings, returning the `[start, end)`
    /// range a [`Transaction`] should store.
    pub fn push_all(&mut self, rows: impl IntoIterator<Item = PostingRow>) -> PostingRange {
        let start = self.len();
        for row in rows {
            self.push(row);
        }
        start..self.len()
    }

    /// Borrow the posting at `idx`.
    #[must_use]
    pub fn get(&self, idx: usize) -> PostingRef<'_> {
        PostingRef { table: self, idx }
    }

    /// Iterate the postings in `range`.
    pub fn slice(&self, range: PostingRange) -> impl Iterator<Item = PostingRef<'_>> {
        range.map(move |idx| self.get(idx))
    }

    /// Overwrite the amount of the posting at `idx`.
    ///
    /// Used by interpolation to fill in a number and/or currency left
    /// incomplete at parse time (an auto-posting, or one missing only its
    /// number or only its currency). Leaves every other column untouched.
    pub fn set_amount(&mut self, idx: usize, amount: Amount) {
        self.number[idx] = Some(amount.number);
        self.currency[idx] = Some(amount.currency);
    }
}

/// A read-only view of one row of a [`PostingTable`].
#[derive(Debug, Clone, Copy)]
pub struct PostingRef<'a> {
    table: &'a PostingTable,
    idx: usize,
}

impl<'a> PostingRef<'a> {
    /// This posting's account.
    #[must_use]
    pub fn account(&self) -> &'a InternedStr {
        &self.table.account[self.idx]
    }

    /// Reconstruct the posting's (possibly incomplete) amount. `None` means
    /// the posting is fully auto (no amount given at all).
    #[must_use]
    pub fn units(&self) -> Option<IncompleteAmount> {
        let number = self.table.number[self.idx];
        let currency = self.table.currency[self.idx].clone();
        match (number, currency) {
            (Some(n), Some(c)) => Some(IncompleteAmount::Complete(Amount::new(n, c))),
            (Some(n), None) => Some(IncompleteAmount::NumberOnly(n)),
            (None, Some(c)) => Some(IncompleteAmount::CurrencyOnly(c)),
            (None, None) => None,
        }
    }

    /// The posting's complete amount, if it has one.
    #[must_use]
    pub fn amount(&self) -> Option<Amount> {
        self.units().and_then(IncompleteAmount::into_amount)
    }

    /// True if this posting has no amount at all (fully auto).
    #[must_use]
    pub fn is_auto(&self) -> bool {
        self.table.number[self.idx].is_none() && self.table.currency[self.idx].is_none()
    }

    /// Reconstruct the posting's price annotation, if any.
    #[must_use]
    pub fn price(&self) -> Option<PriceAnnotation> {
        let number = self.table.price_number[self.idx];
        let currency = self.table.price_currency[self.idx].clone();
        match (self.table.price_kind[self.idx], number, currency) {
            (PriceKind::None, _, _) => None,
            (PriceKind::PerUnit, Some(n), Some(c)) => {
                Some(PriceAnnotation::Unit(Amount::new(n, c)))
            }
            (PriceKind::Total, Some(n), Some(c)) => {
                Some(PriceAnnotation::Total(Amount::new(n, c)))
            }
            (PriceKind::PerUnit, Some(n), None) => {
                Some(PriceAnnotation::UnitIncomplete(IncompleteAmount::NumberOnly(n)))
            }
            (PriceKind::Total, Some(n), None) => {
                Some(PriceAnnotation::TotalIncomplete(IncompleteAmount::NumberOnly(n)))
            }
            (PriceKind::PerUnit, None, Some(c)) => Some(PriceAnnotation::UnitIncomplete(
                IncompleteAmount::CurrencyOnly(c),
            )),
            (PriceKind::Total, None, Some(c)) => Some(PriceAnnotation::TotalIncomplete(
                IncompleteAmount::CurrencyOnly(c),
            )),
            (PriceKind::PerUnit, None, None) => Some(PriceAnnotation::UnitEmpty),
            (PriceKind::Total, None, None) => Some(PriceAnnotation::TotalEmpty),
        }
    }

    /// The posting's lot spec, if a `{…}` annotation was present.
    #[must_use]
    pub fn lot_spec(&self) -> Option<&'a LotSpec> {
        self.table.lot_spec[self.idx].as_ref()
    }

    /// The posting's flag, if any.
    #[must_use]
    pub fn flag(&self) -> Option<char> {
        self.table.flag[self.idx]
    }

    /// The posting's metadata.
    #[must_use]
    pub fn meta(&self) -> &'a Metadata {
        &self.table.meta[self.idx]
    }
}

impl fmt::Display for PostingRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        if let Some(flag) = self.flag() {
            write!(f, "{flag} ")?;
        }
        write!(f, "{}", self.account())?;
        if let Some(units) = self.units() {
            write!(f, "  {units}")?;
        }
        if let Some(spec) = self.lot_spec() {
            write!(f, " {spec}")?;
        }
        if let Some(price) = self.price() {
            write!(f, " {price}")?;
        }
        Ok(())
    }
}

/// Price annotation for a posting (`@` or `@@`).
///
/// Price annotations can be incomplete (missing number or currency) before
/// interpolation fills in the missing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceAnnotation {
    /// Per-unit price (`@`) with complete amount
    Unit(Amount),
    /// Total price (`@@`) with complete amount
    Total(Amount),
    /// Per-unit price (`@`) with incomplete amount
    UnitIncomplete(IncompleteAmount),
    /// Total price (`@@`) with incomplete amount
    TotalIncomplete(IncompleteAmount),
    /// Empty per-unit price (`@` with no amount)
    UnitEmpty,
    /// Empty total price (`@@` with no amount)
    TotalEmpty,
}

impl PriceAnnotation {
    /// Get the complete amount if available.
    #[must_use]
    pub const fn amount(&self) -> Option<&Amount> {
        match self {
            Self::Unit(a) | Self::Total(a) => Some(a),
            Self::UnitIncomplete(ia) | Self::TotalIncomplete(ia) => ia.as_amount(),
            Self::UnitEmpty | Self::TotalEmpty => None,
        }
    }

    /// Check if this is a per-unit price (`@` vs `@@`).
    #[must_use]
    pub const fn is_unit(&self) -> bool {
        matches!(
            self,
            Self::Unit(_) | Self::UnitIncomplete(_) | Self::UnitEmpty
        )
    }
}

impl fmt::Display for PriceAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(a) => write!(f, "@ {a}"),
            Self::Total(a) => write!(f, "@@ {a}"),
            Self::UnitIncomplete(ia) => write!(f, "@ {ia}"),
            Self::TotalIncomplete(ia) => write!(f, "@@ {ia}"),
            Self::UnitEmpty => write!(f, "@"),
            Self::TotalEmpty => write!(f, "@@"),
        }
    }
}

/// Directive ordering priority for sorting same-date directives.
///
/// The project solver's merge key is `(date, file_id, entry_index)`, which
/// alone does not guarantee `open` precedes same-day transactions or `pad`
/// precedes same-day `balance` when a file lists them out of order. This
/// priority is a tie-breaker layered under the date key, ahead of
/// `(file_id, entry_index)`, for exactly that reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectivePriority {
    /// Open accounts first so they exist before use
    Open = 0,
    /// Commodities declared before use
    Commodity = 1,
    /// Padding before balance assertions
    Pad = 2,
    /// Balance assertions checked at start of day
    Balance = 3,
    /// Main entries
    Transaction = 4,
    /// Annotations after transactions
    Note = 5,
    /// Attachments after transactions
    Document = 6,
    /// State changes
    Event = 7,
    /// Queries defined after data
    Query = 8,
    /// Prices at end of day
    Price = 9,
    /// Profit/loss accumulation after prices are known
    Pnl = 10,
    /// Accounts closed after all activity
    Close = 11,
    /// User extensions last
    Custom = 12,
}

/// All directive types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Transaction directive - records transfers between accounts
    Transaction(Transaction),
    /// Balance assertion - asserts an account balance at a point in time
    Balance(Balance),
    /// Open account - opens an account for use
    Open(Open),
    /// Close account - closes an account
    Close(Close),
    /// Commodity declaration - declares a currency/commodity
    Commodity(Commodity),
    /// Pad directive - auto-pad an account to match a balance
    Pad(Pad),
    /// Event directive - records a life event
    Event(Event),
    /// Query directive - stores a named BQL query
    Query(Query),
    /// Note directive - adds a note to an account
    Note(Note),
    /// Document directive - links a document to an account
    Document(Document),
    /// Price directive - records a commodity price
    Price(Price),
    /// Custom directive - custom user-defined directive
    Custom(Custom),
    /// Pnl directive - accumulates realized profit/loss to an account
    Pnl(Pnl),
}

impl Directive {
    /// Get the date of this directive.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        match self {
            Self::Transaction(t) => t.date,
            Self::Balance(b) => b.date,
            Self::Open(o) => o.date,
            Self::Close(c) => c.date,
            Self::Commodity(c) => c.date,
            Self::Pad(p) => p.date,
            Self::Event(e) => e.date,
            Self::Query(q) => q.date,
            Self::Note(n) => n.date,
            Self::Document(d) => d.date,
            Self::Price(p) => p.date,
            Self::Custom(c) => c.date,
            Self::Pnl(p) => p.date,
        }
    }

    /// Get the metadata of this directive.
    #[must_use]
    pub const fn meta(&self) -> &Metadata {
        match self {
            Self::Transaction(t) => &t.meta,
            Self::Balance(b) => &b.meta,
            Self::Open(o) => &o.meta,
            Self::Close(c) => &c.meta,
            Self::Commodity(c) => &c.meta,
            Self::Pad(p) => &p.meta,
            Self::Event(e) => &e.meta,
            Self::Query(q) => &q.meta,
            Self::Note(n) => &n.meta,
            Self::Document(d) => &d.meta,
            Self::Price(p) => &p.meta,
            Self::Custom(c) => &c.meta,
            Self::Pnl(p) => &p.meta,
        }
    }

    /// Check if this is a transaction.
    #[must_use]
    pub const fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }

    /// Get as a transaction, if this is one.
    #[must_use]
    pub const fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Transaction(t) => Some(t),
            _ => None,
        }
    }

    /// Get the directive type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Transaction(_) => "transaction",
            Self::Balance(_) => "balance",
            Self::Open(_) => "open",
            Self::Close(_) => "close",
            Self::Commodity(_) => "commodity",
            Self::Pad(_) => "pad",
            Self::Event(_) => "event",
            Self::Query(_) => "query",
            Self::Note(_) => "note",
            Self::Document(_) => "document",
            Self::Price(_) => "price",
            Self::Custom(_) => "custom",
            Self::Pnl(_) => "pnl",
        }
    }

    /// Get the sorting priority for this directive.
    #[must_use]
    pub const fn priority(&self) -> DirectivePriority {
        match self {
            Self::Open(_) => DirectivePriority::Open,
            Self::Commodity(_) => DirectivePriority::Commodity,
            Self::Pad(_) => DirectivePriority::Pad,
            Self::Balance(_) => DirectivePriority::Balance,
            Self::Transaction(_) => DirectivePriority::Transaction,
            Self::Note(_) => DirectivePriority::Note,
            Self::Document(_) => DirectivePriority::Document,
            Self::Event(_) => DirectivePriority::Event,
            Self::Query(_) => DirectivePriority::Query,
            Self::Price(_) => DirectivePriority::Price,
            Self::Pnl(_) => DirectivePriority::Pnl,
            Self::Close(_) => DirectivePriority::Close,
            Self::Custom(_) => DirectivePriority::Custom,
        }
    }
}

/// Sort directives by `(date, type priority)`.
///
/// Callers that also have `(file_id, entry_index)` available (the project
/// solver) should sort by the full `(date, file_id, entry_index)` key first
/// and use this only as the type-priority tie-break within a single date;
/// see [`DirectivePriority`].
pub fn sort_directives(directives: &mut [Directive]) {
    directives.sort_by(|a, b| {
        a.date()
            .cmp(&b.date())
            .then_with(|| a.priority().cmp(&b.priority()))
    });
}

/// A transaction directive.
///
/// Transactions record transfers between accounts and must balance (the
/// signed per-currency weight sum is zero within tolerance). Its postings
/// live in a [`PostingTable`] shared by the whole file; `postings` is the
/// `[start, end)` range this transaction owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction date
    pub date: NaiveDate,
    /// Transaction flag (`*` or `!`)
    pub flag: char,
    /// Payee (optional)
    pub payee: Option<String>,
    /// Narration (description)
    pub narration: String,
    /// Tags attached to this transaction
    pub tags: Vec<String>,
    /// Links attached to this transaction
    pub links: Vec<String>,
    /// Transaction metadata
    pub meta: Metadata,
    /// `[start, end)` range of this transaction's postings in the file's
    /// [`PostingTable`].
    pub postings: PostingRange,
    /// Set when the entry failed validation: structural info remains
    /// usable, but booking must skip it.
    pub dirty: bool,
}

impl Transaction {
    /// Check if this transaction is marked as complete (`*`).
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.flag == '*'
    }

    /// Check if this transaction is marked as incomplete (`!`).
    #[must_use]
    pub const fn is_incomplete(&self) -> bool {
        self.flag == '!'
    }

    /// Borrow this transaction's postings from the file's table.
    pub fn postings<'a>(&self, table: &'a PostingTable) -> impl Iterator<Item = PostingRef<'a>> {
        table.slice(self.postings.clone())
    }

    /// A stable fingerprint mixing `(date, kind, account handles,
    /// narration, posting count)`, unchanged across re-parses of
    /// unaffected text. Used to keep UI selection across updates.
    #[must_use]
    pub fn fingerprint(&self, table: &PostingTable) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.date.hash(&mut hasher);
        "transaction".hash(&mut hasher);
        for p in self.postings(table) {
            p.account().hash(&mut hasher);
        }
        self.narration.hash(&mut hasher);
        self.postings.len().hash(&mut hasher);
        hasher.finish()
    }
}

/// Builds a [`Transaction`] and its postings together, then commits the
/// postings to a shared [`PostingTable`] on [`TransactionBuilder::finish`].
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    date: NaiveDate,
    flag: char,
    payee: Option<String>,
    narration: String,
    tags: Vec<String>,
    links: Vec<String>,
    meta: Metadata,
    rows: Vec<PostingRow>,
    dirty: bool,
}

impl TransactionBuilder {
    /// Start building a transaction.
    #[must_use]
    pub fn new(date: NaiveDate, narration: impl Into<String>) -> Self {
        Self {
            date,
            flag: '*',
            payee: None,
            narration: narration.into(),
            tags: Vec::new(),
            links: Vec::new(),
            meta: Metadata::new(),
            rows: Vec::new(),
            dirty: false,
        }
    }

    /// Set the flag.
    #[must_use]
    pub const fn with_flag(mut self, flag: char) -> Self {
        self.flag = flag;
        self
    }

    /// Set the payee.
    #[must_use]
    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a link.
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    /// Mark dirty (fails validation, must not affect balances).
    #[must_use]
    pub const fn with_dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }

    /// Attach a key to the transaction-level metadata.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: MetaValue) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Add a posting.
    #[must_use]
    pub fn with_posting(mut self, row: PostingRow) -> Self {
        self.rows.push(row);
        self
    }

    /// Append this transaction's postings to `table` and produce the
    /// finished [`Transaction`].
    pub fn finish(self, table: &mut PostingTable) -> Transaction {
        let postings = table.push_all(self.rows);
        Transaction {
            date: self.date,
            flag: self.flag,
            payee: self.payee,
            narration: self.narration,
            tags: self.tags,
            links: self.links,
            meta: self.meta,
            postings,
            dirty: self.dirty,
        }
    }
}

/// A balance assertion directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Assertion date
    pub date: NaiveDate,
    /// Account to check
    pub account: InternedStr,
    /// Expected amount
    pub amount: Amount,
    /// Tolerance (if explicitly specified)
    pub tolerance: Option<Decimal>,
    /// Metadata
    pub meta: Metadata,
}

impl Balance {
    /// Create a new balance assertion.
    #[must_use]
    pub fn new(date: NaiveDate, account: impl Into<InternedStr>, amount: Amount) -> Self {
        Self {
            date,
            account: account.into(),
            amount,
            tolerance: None,
            meta: Metadata::new(),
        }
    }

    /// Set explicit tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} balance {} {}", self.date, self.account, self.amount)?;
        if let Some(tol) = self.tolerance {
            write!(f, " ~ {tol}")?;
        }
        Ok(())
    }
}

/// An open account directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Open {
    /// Date account was opened
    pub date: NaiveDate,
    /// Account name (e.g., "Assets:Bank:Checking")
    pub account: InternedStr,
    /// Allowed currencies (empty = any currency allowed)
    pub currencies: Vec<InternedStr>,
    /// Booking method name, absent meaning `plain`.
    pub booking: Option<String>,
    /// Metadata
    pub meta: Metadata,
}

impl Open {
    /// Create a new open directive.
    #[must_use]
    pub fn new(date: NaiveDate, account: impl Into<InternedStr>) -> Self {
        Self {
            date,
            account: account.into(),
            currencies: Vec::new(),
            booking: None,
            meta: Metadata::new(),
        }
    }

    /// Set allowed currencies.
    #[must_use]
    pub fn with_currencies(mut self, currencies: Vec<InternedStr>) -> Self {
        self.currencies = currencies;
        self
    }

    /// Set booking method.
    #[must_use]
    pub fn with_booking(mut self, booking: impl Into<String>) -> Self {
        self.booking = Some(booking.into());
        self
    }
}

impl fmt::Display for Open {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} open {}", self.date, self.account)?;
        if !self.currencies.is_empty() {
            let names: Vec<&str> = self.currencies.iter().map(|c| c.as_ref()).collect();
            write!(f, " {}", names.join(","))?;
        }
        if let Some(booking) = &self.booking {
            write!(f, " \"{booking}\"")?;
        }
        Ok(())
    }
}

/// A close account directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Close {
    /// Date account was closed
    pub date: NaiveDate,
    /// Account name
    pub account: InternedStr,
    /// Metadata
    pub meta: Metadata,
}

impl Close {
    /// Create a new close directive.
    #[must_use]
    pub fn new(date: NaiveDate, account: impl Into<InternedStr>) -> Self {
        Self {
            date,
            account: account.into(),
            meta: Metadata::new(),
        }
    }
}

impl fmt::Display for Close {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} close {}", self.date, self.account)
    }
}

/// A commodity declaration directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodity {
    /// Declaration date
    pub date: NaiveDate,
    /// Currency/commodity code (e.g., "USD", "AAPL")
    pub currency: InternedStr,
    /// Metadata
    pub meta: Metadata,
}

impl Commodity {
    /// Create a new commodity declaration.
    #[must_use]
    pub fn new(date: NaiveDate, currency: impl Into<InternedStr>) -> Self {
        Self {
            date,
            currency: currency.into(),
            meta: Metadata::new(),
        }
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} commodity {}", self.date, self.currency)
    }
}

/// A pad directive: defers balancing to the next [`Balance`] on the same
/// account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pad {
    /// Pad date
    pub date: NaiveDate,
    /// Account to pad
    pub account: InternedStr,
    /// Source account the padding amount is drawn from
    pub pad_from: InternedStr,
    /// Index of the synthetic transaction realizing this pad, once solved.
    pub synthetic_index: Option<usize>,
    /// Metadata
    pub meta: Metadata,
}

impl Pad {
    /// Create a new pad directive.
    #[must_use]
    pub fn new(
        date: NaiveDate,
        account: impl Into<InternedStr>,
        pad_from: impl Into<InternedStr>,
    ) -> Self {
        Self {
            date,
            account: account.into(),
            pad_from: pad_from.into(),
            synthetic_index: None,
            meta: Metadata::new(),
        }
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pad {} {}", self.date, self.account, self.pad_from)
    }
}

/// An event directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event date
    pub date: NaiveDate,
    /// Event type (e.g., "location", "employer")
    pub event_type: String,
    /// Event value
    pub value: String,
    /// Metadata
    pub meta: Metadata,
}

impl Event {
    /// Create a new event directive.
    #[must_use]
    pub fn new(date: NaiveDate, event_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            date,
            event_type: event_type.into(),
            value: value.into(),
            meta: Metadata::new(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} event \"{}\" \"{}\"",
            self.date, self.event_type, self.value
        )
    }
}

/// A query directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Query date
    pub date: NaiveDate,
    /// Query name
    pub name: String,
    /// Query string (opaque to this implementation; no query language)
    pub query: String,
    /// Metadata
    pub meta: Metadata,
}

impl Query {
    /// Create a new query directive.
    #[must_use]
    pub fn new(date: NaiveDate, name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
            query: query.into(),
            meta: Metadata::new(),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} query \"{}\" \"{}\"", self.date, self.name, self.query)
    }
}

/// A note directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Note date
    pub date: NaiveDate,
    /// Account
    pub account: InternedStr,
    /// Note text
    pub comment: String,
    /// Metadata
    pub meta: Metadata,
}

impl Note {
    /// Create a new note directive.
    #[must_use]
    pub fn new(
        date: NaiveDate,
        account: impl Into<InternedStr>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            date,
            account: account.into(),
            comment: comment.into(),
            meta: Metadata::new(),
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} note {} \"{}\"", self.date, self.account, self.comment)
    }
}

/// A document directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document date
    pub date: NaiveDate,
    /// Account
    pub account: InternedStr,
    /// File path to the document
    pub path: String,
    /// Tags
    pub tags: Vec<String>,
    /// Links
    pub links: Vec<String>,
    /// Metadata
    pub meta: Metadata,
}

impl Document {
    /// Create a new document directive.
    #[must_use]
    pub fn new(date: NaiveDate, account: impl Into<InternedStr>, path: impl Into<String>) -> Self {
        Self {
            date,
            account: account.into(),
            path: path.into(),
            tags: Vec::new(),
            links: Vec::new(),
            meta: Metadata::new(),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} document {} \"{}\"", self.date, self.account, self.path)
    }
}

/// A price directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Price date
    pub date: NaiveDate,
    /// Currency being priced
    pub currency: InternedStr,
    /// Price amount (in another currency)
    pub amount: Amount,
    /// Metadata
    pub meta: Metadata,
}

impl Price {
    /// Create a new price directive.
    #[must_use]
    pub fn new(date: NaiveDate, currency: impl Into<InternedStr>, amount: Amount) -> Self {
        Self {
            date,
            currency: currency.into(),
            amount,
            meta: Metadata::new(),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} price {} {}", self.date, self.currency, self.amount)
    }
}

/// A custom directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custom {
    /// Custom directive date
    pub date: NaiveDate,
    /// Custom type name (e.g., "budget", "autopay")
    pub custom_type: String,
    /// Values/arguments for this custom directive
    pub values: Vec<MetaValue>,
    /// Metadata
    pub meta: Metadata,
}

impl Custom {
    /// Create a new custom directive.
    #[must_use]
    pub fn new(date: NaiveDate, custom_type: impl Into<String>) -> Self {
        Self {
            date,
            custom_type: custom_type.into(),
            values: Vec::new(),
            meta: Metadata::new(),
        }
    }

    /// Add a value.
    #[must_use]
    pub fn with_value(mut self, value: MetaValue) -> Self {
        self.values.push(value);
        self
    }
}

impl fmt::Display for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} custom \"{}\"", self.date, self.custom_type)?;
        for value in &self.values {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}

/// A `pnl` directive: accumulate realized profit/loss from reduces against
/// `from_account` (or any descendant) into `to_account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pnl {
    /// Directive date
    pub date: NaiveDate,
    /// Account (or ancestor of accounts) whose reduces generate gains
    pub from_account: InternedStr,
    /// Account the synthetic gains posting is appended to
    pub to_account: InternedStr,
    /// Metadata
    pub meta: Metadata,
}

impl Pnl {
    /// Create a new pnl directive.
    #[must_use]
    pub fn new(
        date: NaiveDate,
        from_account: impl Into<InternedStr>,
        to_account: impl Into<InternedStr>,
    ) -> Self {
        Self {
            date,
            from_account: from_account.into(),
            to_account: to_account.into(),
            meta: Metadata::new(),
        }
    }
}

impl fmt::Display for Pnl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pnl {} {}", self.date, self.from_account, self.to_account)
    }
}
