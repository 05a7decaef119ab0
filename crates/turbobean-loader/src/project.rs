//! The project solver.
//!
//! A [`Project`] owns every loaded file and the merged, date-ordered walk
//! over their directives. Loading or reloading a file re-solves the whole
//! project: the account tree and price table are rebuilt from scratch and
//! every directive is re-applied in order, since booking is history-order
//! dependent and a partial re-solve would have to reconstruct that history
//! anyway. Readers take a [`ProjectSnapshot`] (a read lock over the solved
//! state) rather than a deep copy, so iterating `sorted_entries` or an
//! account's inventory never blocks a concurrent solve from starting, only
//! from completing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::{RwLock, RwLockReadGuard};
use rust_decimal::Decimal;
use turbobean_core::{
    AccountTree, Amount, Diagnostic, DiagnosticKind, Directive, DirectivePriority, IncompleteAmount,
    InternedStr, NaiveDate, PostingRow, PostingTable, PriceTable, Span as CoreSpan, Transaction,
    TransactionBuilder,
};
use turbobean_booking::{currency_tolerances, interpolate, is_balanced, post_one, weight_sums, PnlRule, PostingSnapshot};
use turbobean_parser::Span as ParserSpan;

use crate::broadcast::{Broadcaster, Listener};
use crate::options::Options;
use crate::source_map::SourceMap;
use crate::{LoadError, LoadedFile, Loader, Plugin};

fn core_span(span: ParserSpan) -> CoreSpan {
    CoreSpan::new(span.start, span.end)
}

/// One entry in the merged, stably sorted walk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedEntry {
    /// A directive parsed from a loaded file, at `files[file_id].directives[entry_index]`.
    File {
        /// Which file this directive came from.
        file_id: usize,
        /// Its index within that file's directive list.
        entry_index: usize,
    },
    /// A transaction synthesized while realizing a `pad`, at
    /// `synthetic_transactions()[index]`. Anchored for sorting purposes at
    /// the position of the `pad` directive that produced it.
    Synthetic {
        /// Index into the synthetic transaction table.
        index: usize,
    },
}

/// A pad directive awaiting the next `balance` on its account.
struct PendingPad {
    pad_from: InternedStr,
    date: NaiveDate,
    file_id: usize,
    entry_index: usize,
    span: CoreSpan,
    rows: Vec<PostingRow>,
    consumed: bool,
}

struct Solved {
    files: Vec<LoadedFile>,
    options: Options,
    plugins: Vec<Plugin>,
    source_map: SourceMap,
    load_errors: Vec<LoadError>,
    tree: AccountTree,
    prices: PriceTable,
    diagnostics: Vec<Diagnostic>,
    sorted_entries: Vec<ResolvedEntry>,
    synthetic_postings: PostingTable,
    synthetic_transactions: Vec<Transaction>,
    synthetic_origin: Vec<(usize, usize)>,
}

impl Default for Solved {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            options: Options::new(),
            plugins: Vec::new(),
            source_map: SourceMap::new(),
            load_errors: Vec::new(),
            tree: AccountTree::new(),
            prices: PriceTable::new(),
            diagnostics: Vec::new(),
            sorted_entries: Vec::new(),
            synthetic_postings: PostingTable::new(),
            synthetic_transactions: Vec::new(),
            synthetic_origin: Vec::new(),
        }
    }
}

/// Merges loaded files into one date-ordered entry stream and drives the
/// booking engine over it.
pub struct Project {
    state: RwLock<Solved>,
    broadcaster: Broadcaster,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    /// An empty project with nothing loaded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Solved::default()),
            broadcaster: Broadcaster::new(),
        }
    }

    /// Load `path` and everything it transitively includes, then solve.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] for the cases [`Loader::load`] does (I/O
    /// failure, include cycle); parse errors are collected per-file instead
    /// of aborting the load.
    pub fn load(&self, path: &Path) -> Result<(), LoadError> {
        tracing::debug!(path = %path.display(), "loading project root");
        let result = Loader::new().load(path)?;
        let mut state = self.state.write();
        state.files = result.files;
        state.options = result.options;
        state.plugins = result.plugins;
        state.source_map = result.source_map;
        state.load_errors = result.errors;
        solve(&mut state);
        self.broadcaster.bump();
        tracing::info!(
            file_count = state.files.len(),
            diagnostic_count = state.diagnostics.len(),
            version = self.broadcaster.version(),
            "project solved"
        );
        drop(state);
        Ok(())
    }

    /// Re-read and re-parse a single already-loaded file from disk, then
    /// solve the whole project again.
    ///
    /// Only this file's directive and posting tables are rebuilt; the
    /// account tree and diagnostics are always rebuilt from scratch
    /// regardless, since booking depends on the full date-ordered history.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] if `file_id` is out of range or the file
    /// can no longer be read.
    pub fn reload_file(&self, file_id: usize) -> Result<(), LoadError> {
        let mut state = self.state.write();
        let Some(existing) = state.files.get(file_id) else {
            return Err(LoadError::Io {
                path: PathBuf::new(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "unknown file_id"),
            });
        };
        let path = existing.path.clone();
        tracing::debug!(path = %path.display(), file_id, "reloading file");
        let source = std::fs::read_to_string(&path).map_err(|e| LoadError::Io {
            path: path.clone(),
            source: e,
        })?;
        let parsed = turbobean_parser::parse(&source);
        state.source_map.replace(file_id, source.clone());
        state.files[file_id] = LoadedFile {
            file_id,
            path,
            source,
            directives: parsed.directives,
            postings: parsed.postings,
            options: parsed.options,
            includes: parsed.includes,
            plugins: parsed.plugins,
            errors: parsed.errors,
        };
        solve(&mut state);
        self.broadcaster.bump();
        tracing::info!(version = self.broadcaster.version(), "project re-solved");
        drop(state);
        Ok(())
    }

    /// Re-parse one already-loaded file from an in-memory buffer and
    /// re-solve the whole project, without touching disk.
    ///
    /// This is the entry point editors use: an unsaved buffer's text can be
    /// pushed straight through re-parse and re-solve so the rest of the
    /// project (diagnostics, inventories) reflects it immediately, the way
    /// [`Self::reload_file`] does for a file that was saved externally.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] if `uri` does not match any already-loaded
    /// file's path.
    pub fn update_file(&self, uri: &Path, source: String) -> Result<(), LoadError> {
        let mut state = self.state.write();
        let Some(file_id) = state.files.iter().position(|f| f.path == uri) else {
            return Err(LoadError::Io {
                path: uri.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not loaded in project"),
            });
        };
        tracing::debug!(path = %uri.display(), file_id, "updating file from buffer");
        let parsed = turbobean_parser::parse(&source);
        state.source_map.replace(file_id, source.clone());
        state.files[file_id] = LoadedFile {
            file_id,
            path: uri.to_path_buf(),
            source,
            directives: parsed.directives,
            postings: parsed.postings,
            options: parsed.options,
            includes: parsed.includes,
            plugins: parsed.plugins,
            errors: parsed.errors,
        };
        solve(&mut state);
        self.broadcaster.bump();
        tracing::info!(version = self.broadcaster.version(), "project re-solved from buffer update");
        drop(state);
        Ok(())
    }

    /// A read-only view of the current solve. Acquiring a snapshot never
    /// blocks [`Self::load`]/[`Self::reload_file`] from starting, only from
    /// completing while the snapshot is held.
    #[must_use]
    pub fn snapshot(&self) -> ProjectSnapshot<'_> {
        ProjectSnapshot {
            guard: self.state.read(),
        }
    }

    /// The current solve's version, incremented once per completed solve.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.broadcaster.version()
    }

    /// A listener that wakes whenever a solve completes.
    #[must_use]
    pub fn listen(&self) -> Listener {
        self.broadcaster.listen()
    }
}

/// A read-only view of a [`Project`]'s most recently completed solve.
pub struct ProjectSnapshot<'a> {
    guard: RwLockReadGuard<'a, Solved>,
}

impl ProjectSnapshot<'_> {
    /// Every loaded file, in ascending `file_id` order.
    #[must_use]
    pub fn files(&self) -> &[LoadedFile] {
        &self.guard.files
    }

    /// Options merged across every loaded file.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.guard.options
    }

    /// Plugins declared across every loaded file.
    #[must_use]
    pub fn plugins(&self) -> &[Plugin] {
        &self.guard.plugins
    }

    /// Source map for error reporting.
    #[must_use]
    pub fn source_map(&self) -> &SourceMap {
        &self.guard.source_map
    }

    /// Errors encountered while loading (I/O, include cycles, parse
    /// errors); distinct from booking [`Self::diagnostics`].
    #[must_use]
    pub fn load_errors(&self) -> &[LoadError] {
        &self.guard.load_errors
    }

    /// The solved account tree.
    #[must_use]
    pub fn tree(&self) -> &AccountTree {
        &self.guard.tree
    }

    /// The solved price table.
    #[must_use]
    pub fn prices(&self) -> &PriceTable {
        &self.guard.prices
    }

    /// Diagnostics raised while booking (distinct from load-time errors).
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.guard.diagnostics
    }

    /// The merged, stably sorted walk order covering every file directive
    /// and every synthetic pad transaction.
    #[must_use]
    pub fn sorted_entries(&self) -> &[ResolvedEntry] {
        &self.guard.sorted_entries
    }

    /// The synthetic postings table backing every realized pad.
    #[must_use]
    pub fn synthetic_postings(&self) -> &PostingTable {
        &self.guard.synthetic_postings
    }

    /// The synthetic transactions realized from `pad` directives, indexed
    /// by a `pad`'s `synthetic_index`.
    #[must_use]
    pub fn synthetic_transactions(&self) -> &[Transaction] {
        &self.guard.synthetic_transactions
    }

    /// Resolve an entry to its directive, if it's a file entry. Synthetic
    /// entries are always transactions; fetch them from
    /// [`Self::synthetic_transactions`] instead.
    #[must_use]
    pub fn directive(&self, entry: ResolvedEntry) -> Option<&Directive> {
        match entry {
            ResolvedEntry::File { file_id, entry_index } => self
                .guard
                .files
                .get(file_id)
                .and_then(|file| file.directives.get(entry_index))
                .map(|spanned| &spanned.value),
            ResolvedEntry::Synthetic { .. } => None,
        }
    }
}

/// Reset the account tree and price table, then walk every directive in
/// `(date, priority, file_id, entry_index)` order, applying it and
/// collecting diagnostics.
fn solve(state: &mut Solved) {
    tracing::debug!(files = state.files.len(), "re-solving project");
    state.tree = AccountTree::new();
    state.prices.clear();
    state.diagnostics.clear();
    state.synthetic_postings = PostingTable::new();
    state.synthetic_transactions.clear();
    state.synthetic_origin.clear();

    let mut order: Vec<(NaiveDate, DirectivePriority, usize, usize)> = Vec::new();
    for file in &state.files {
        for (entry_index, spanned) in file.directives.iter().enumerate() {
            order.push((spanned.value.date(), spanned.value.priority(), file.file_id, entry_index));
        }
    }
    order.sort();
    tracing::trace!(entries = order.len(), "solving merged directive order");

    let mut pnl_rules: Vec<PnlRule> = Vec::new();
    let mut pending_pads: HashMap<InternedStr, PendingPad> = HashMap::new();

    for (_, _, file_id, entry_index) in order {
        let span = core_span(state.files[file_id].directives[entry_index].span);
        let directive = state.files[file_id].directives[entry_index].value.clone();
        apply(state, &mut pnl_rules, &mut pending_pads, file_id, entry_index, span, directive);
    }

    for (_, pending) in pending_pads {
        finalize_pad(state, pending);
    }

    rebuild_sorted_entries(state);
}

#[allow(clippy::too_many_arguments)]
fn apply(
    state: &mut Solved,
    pnl_rules: &mut Vec<PnlRule>,
    pending_pads: &mut HashMap<InternedStr, PendingPad>,
    file_id: usize,
    entry_index: usize,
    span: CoreSpan,
    directive: Directive,
) {
    match directive {
        Directive::Open(open) => {
            if state.tree.get(open.account.as_str()).is_some_and(|n| n.is_open()) {
                state.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::AccountAlreadyOpen { account: open.account },
                    span,
                    file_id,
                ));
            } else {
                if let Some(method) = &open.booking {
                    if method.parse::<turbobean_core::BookingMethod>().is_err() {
                        state.diagnostics.push(Diagnostic::new(
                            DiagnosticKind::InvalidBookingMethod {
                                account: open.account.clone(),
                                method: method.to_string(),
                            },
                            span,
                            file_id,
                        ));
                    }
                }
                state
                    .tree
                    .open(open.account.as_str(), open.currencies, open.booking.as_deref());
            }
        }
        Directive::Close(close) => {
            if state.tree.close(close.account.as_str()).is_none() {
                state.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::CloseWithoutOpen { account: close.account },
                    span,
                    file_id,
                ));
            }
        }
        Directive::Commodity(_) | Directive::Note(_) | Directive::Document(_) | Directive::Event(_)
        | Directive::Query(_) | Directive::Custom(_) => {}
        Directive::Price(price) => {
            state.prices.set(price.currency, price.amount.currency, price.amount.number);
        }
        Directive::Pnl(pnl) => {
            pnl_rules.push(PnlRule {
                from_account: pnl.from_account,
                to_account: pnl.to_account,
            });
        }
        Directive::Pad(pad) => {
            if let Some(previous) = pending_pads.remove(&pad.account) {
                finalize_pad(state, previous);
            }
            pending_pads.insert(
                pad.account,
                PendingPad {
                    pad_from: pad.pad_from,
                    date: pad.date,
                    file_id,
                    entry_index,
                    span,
                    rows: Vec::new(),
                    consumed: false,
                },
            );
        }
        Directive::Balance(balance) => apply_balance(state, pnl_rules, pending_pads, file_id, span, &balance),
        Directive::Transaction(txn) => apply_transaction(state, pnl_rules, file_id, span, &txn),
    }
}

fn apply_balance(
    state: &mut Solved,
    pnl_rules: &[PnlRule],
    pending_pads: &mut HashMap<InternedStr, PendingPad>,
    file_id: usize,
    span: CoreSpan,
    balance: &turbobean_core::Balance,
) {
    let Some(node) = state.tree.get(balance.account.as_str()) else {
        state.diagnostics.push(Diagnostic::new(
            DiagnosticKind::AccountNotOpen { account: balance.account.clone() },
            span,
            file_id,
        ));
        return;
    };
    if !node.is_open() {
        state.diagnostics.push(Diagnostic::new(
            DiagnosticKind::AccountNotOpen { account: balance.account.clone() },
            span,
            file_id,
        ));
        return;
    }

    if let Some(pending) = pending_pads.get_mut(&balance.account) {
        let current = state
            .tree
            .get(balance.account.as_str())
            .expect("checked above")
            .inventory()
            .units(balance.amount.currency.as_str());
        if let Some(fill) = turbobean_booking::compute_pad(
            balance.account.clone(),
            pending.pad_from.clone(),
            current,
            &balance.amount,
        ) {
            pending.consumed = true;
            pending
                .rows
                .push(PostingRow::new(fill.account.clone(), fill.amount.clone()));
            pending
                .rows
                .push(PostingRow::new(fill.pad_from.clone(), -fill.amount.clone()));

            let pad_date = pending.date;
            let credit = PostingSnapshot {
                idx: 0,
                account: fill.account,
                units: Some(IncompleteAmount::Complete(fill.amount.clone())),
                price: None,
                lot_spec: None,
                flag: None,
            };
            let debit = PostingSnapshot {
                idx: 1,
                account: fill.pad_from,
                units: Some(IncompleteAmount::Complete(-fill.amount)),
                price: None,
                lot_spec: None,
                flag: None,
            };
            for snapshot in [&credit, &debit] {
                let kinds = post_one(&mut state.tree, snapshot, pad_date, pnl_rules);
                state
                    .diagnostics
                    .extend(kinds.into_iter().map(|kind| Diagnostic::new(kind, span, file_id)));
            }
        }
    }

    let actual = state
        .tree
        .get(balance.account.as_str())
        .expect("checked above")
        .inventory()
        .units(balance.amount.currency.as_str());
    let tolerance = balance.tolerance.unwrap_or_else(|| balance.amount.inferred_tolerance());
    if (actual - balance.amount.number).abs() > tolerance {
        state.diagnostics.push(Diagnostic::new(
            DiagnosticKind::BalanceAssertionFailed {
                account: balance.account.clone(),
                expected: balance.amount.to_string(),
                actual: Amount::new(actual, balance.amount.currency.clone()).to_string(),
            },
            span,
            file_id,
        ));
    }
}

fn apply_transaction(
    state: &mut Solved,
    pnl_rules: &[PnlRule],
    file_id: usize,
    span: CoreSpan,
    txn: &Transaction,
) {
    if txn.dirty {
        return;
    }

    let table = &mut state.files[file_id].postings;
    let mut snapshots: Vec<PostingSnapshot> = txn
        .postings
        .clone()
        .map(|idx| PostingSnapshot::from_ref(idx, table.get(idx)))
        .collect();

    match interpolate(&snapshots, txn.date) {
        Err(kind) => state.diagnostics.push(Diagnostic::new(kind, span, file_id)),
        Ok(filled) => {
            if let Some(filled) = filled {
                table.set_amount(filled.idx, filled.amount.clone());
                if let Some(snapshot) = snapshots.iter_mut().find(|s| s.idx == filled.idx) {
                    snapshot.units = Some(IncompleteAmount::Complete(filled.amount));
                }
            }

            let sums = weight_sums(&snapshots, txn.date);
            let tolerances = currency_tolerances(&snapshots, txn.date);
            if is_balanced(&sums, &tolerances) {
                for snapshot in &snapshots {
                    let kinds = post_one(&mut state.tree, snapshot, txn.date, pnl_rules);
                    state
                        .diagnostics
                        .extend(kinds.into_iter().map(|kind| Diagnostic::new(kind, span, file_id)));
                }
            } else {
                for (currency, residual) in &sums {
                    let tolerance = tolerances.get(currency).copied().unwrap_or(Decimal::ZERO);
                    if residual.abs() > tolerance {
                        state.diagnostics.push(Diagnostic::new(
                            DiagnosticKind::TransactionDoesNotBalance {
                                currency: currency.clone(),
                                residual: residual.to_string(),
                            },
                            span,
                            file_id,
                        ));
                    }
                }
            }
        }
    }
}

/// Either realize `pending` as a synthetic transaction (if it picked up any
/// fills) or flag it as an unused pad.
fn finalize_pad(state: &mut Solved, pending: PendingPad) {
    if !pending.consumed {
        tracing::warn!(
            pad_from = %pending.pad_from,
            date = %pending.date,
            file_id = pending.file_id,
            "pad directive never reached a matching balance"
        );
        state
            .diagnostics
            .push(Diagnostic::new(DiagnosticKind::PadUnused, pending.span, pending.file_id));
        return;
    }

    let mut builder = TransactionBuilder::new(pending.date, "(Padding inserted)").with_flag('P');
    for row in pending.rows {
        builder = builder.with_posting(row);
    }
    let txn = builder.finish(&mut state.synthetic_postings);

    let index = state.synthetic_transactions.len();
    state.synthetic_transactions.push(txn);
    state.synthetic_origin.push((pending.file_id, pending.entry_index));

    if let Directive::Pad(p) = &mut state.files[pending.file_id].directives[pending.entry_index].value {
        p.synthetic_index = Some(index);
    }
}

fn rebuild_sorted_entries(state: &mut Solved) {
    let mut resolved: Vec<(NaiveDate, DirectivePriority, usize, usize, ResolvedEntry)> = Vec::new();
    for file in &state.files {
        for (entry_index, spanned) in file.directives.iter().enumerate() {
            resolved.push((
                spanned.value.date(),
                spanned.value.priority(),
                file.file_id,
                entry_index,
                ResolvedEntry::File { file_id: file.file_id, entry_index },
            ));
        }
    }
    for (index, txn) in state.synthetic_transactions.iter().enumerate() {
        let (file_id, entry_index) = state.synthetic_origin[index];
        resolved.push((
            txn.date,
            DirectivePriority::Transaction,
            file_id,
            entry_index,
            ResolvedEntry::Synthetic { index },
        ));
    }
    resolved.sort_by(|a, b| (a.0, a.1, a.2, a.3).cmp(&(b.0, b.1, b.2, b.3)));
    state.sorted_entries = resolved.into_iter().map(|entry| entry.4).collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ledger(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.beancount");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn simple_transaction_balances_and_posts() {
        let (_dir, path) = ledger(
            "2024-01-01 open Assets:Cash USD\n\
             2024-01-01 open Expenses:Food USD\n\
             2024-01-02 * \"Groceries\"\n  \
             Expenses:Food  50.00 USD\n  \
             Assets:Cash\n",
        );
        let project = Project::new();
        project.load(&path).unwrap();
        let snapshot = project.snapshot();
        assert!(snapshot.diagnostics().is_empty(), "{:?}", snapshot.diagnostics());
        assert_eq!(
            snapshot.tree().get("Assets:Cash").unwrap().inventory().units("USD"),
            rust_decimal_macros::dec!(-50.00)
        );
    }

    #[test]
    fn posting_to_unopened_account_is_flagged() {
        let (_dir, path) = ledger(
            "2024-01-01 open Expenses:Food USD\n\
             2024-01-02 * \"Oops\"\n  \
             Expenses:Food  10.00 USD\n  \
             Assets:Cash\n",
        );
        let project = Project::new();
        project.load(&path).unwrap();
        let snapshot = project.snapshot();
        assert!(snapshot
            .diagnostics()
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::AccountNotOpen { .. })));
    }

    #[test]
    fn pad_realizes_against_the_next_balance() {
        let (_dir, path) = ledger(
            "2024-01-01 open Assets:Checking USD\n\
             2024-01-01 open Equity:Opening-Balances USD\n\
             2024-01-01 pad Assets:Checking Equity:Opening-Balances\n\
             2024-01-15 balance Assets:Checking  1000.00 USD\n",
        );
        let project = Project::new();
        project.load(&path).unwrap();
        let snapshot = project.snapshot();
        assert!(snapshot.diagnostics().is_empty(), "{:?}", snapshot.diagnostics());
        assert_eq!(
            snapshot.tree().get("Assets:Checking").unwrap().inventory().units("USD"),
            rust_decimal_macros::dec!(1000.00)
        );
        assert_eq!(
            snapshot
                .tree()
                .get("Equity:Opening-Balances")
                .unwrap()
                .inventory()
                .units("USD"),
            rust_decimal_macros::dec!(-1000.00)
        );
        assert_eq!(snapshot.synthetic_transactions().len(), 1);
    }

    #[test]
    fn unused_pad_is_a_warning() {
        let (_dir, path) = ledger(
            "2024-01-01 open Assets:Checking USD\n\
             2024-01-01 open Equity:Opening-Balances USD\n\
             2024-01-01 pad Assets:Checking Equity:Opening-Balances\n",
        );
        let project = Project::new();
        project.load(&path).unwrap();
        let snapshot = project.snapshot();
        assert!(snapshot
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::PadUnused));
    }

    #[test]
    fn unsupported_booking_method_is_flagged_and_falls_back_to_plain() {
        let (_dir, path) = ledger("2024-01-01 open Assets:Cash USD \"AVERAGE\"\n");
        let project = Project::new();
        project.load(&path).unwrap();
        let snapshot = project.snapshot();
        assert!(snapshot
            .diagnostics()
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::InvalidBookingMethod { .. })));
        assert_eq!(
            snapshot.tree().get("Assets:Cash").unwrap().booking,
            turbobean_core::BookingMethod::Plain
        );
    }

    #[test]
    fn balance_assertion_failure_is_reported() {
        let (_dir, path) = ledger(
            "2024-01-01 open Assets:Checking USD\n\
             2024-01-01 open Expenses:Food USD\n\
             2024-01-02 * \"Lunch\"\n  \
             Expenses:Food  12.00 USD\n  \
             Assets:Checking\n\
             2024-01-03 balance Assets:Checking  0.00 USD\n",
        );
        let project = Project::new();
        project.load(&path).unwrap();
        let snapshot = project.snapshot();
        assert!(snapshot
            .diagnostics()
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::BalanceAssertionFailed { .. })));
    }

    #[test]
    fn update_file_reparses_from_buffer_without_touching_disk() {
        let (_dir, path) = ledger("2024-01-01 open Assets:Cash USD\n");
        let project = Project::new();
        project.load(&path).unwrap();
        assert_eq!(project.version(), 1);

        project
            .update_file(&path, "2024-01-01 open Assets:Cash USD\n2024-01-01 open Assets:Savings USD\n".to_string())
            .unwrap();
        assert_eq!(project.version(), 2);
        assert!(project.snapshot().tree().get("Assets:Savings").is_some());
        // The on-disk file was never written; only the in-memory buffer changed.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "2024-01-01 open Assets:Cash USD\n");
    }

    #[test]
    fn update_file_rejects_an_unknown_uri() {
        let (_dir, path) = ledger("2024-01-01 open Assets:Cash USD\n");
        let project = Project::new();
        project.load(&path).unwrap();
        let other = path.with_file_name("other.beancount");
        assert!(project.update_file(&other, String::new()).is_err());
    }

    #[test]
    fn reload_file_rebuilds_the_solve() {
        let (_dir, path) = ledger("2024-01-01 open Assets:Cash USD\n");
        let project = Project::new();
        project.load(&path).unwrap();
        assert_eq!(project.version(), 1);

        std::fs::write(&path, "2024-01-01 open Assets:Cash USD\n2024-01-01 open Assets:Savings USD\n").unwrap();
        project.reload_file(0).unwrap();
        assert_eq!(project.version(), 2);
        assert!(project.snapshot().tree().get("Assets:Savings").is_some());
    }
}
