//! Hierarchical account node graph.
//!
//! An [`AccountTree`] is rooted at an anonymous node with the five
//! Beancount account-type roots (`Assets`, `Liabilities`, `Equity`,
//! `Income`, `Expenses`) as its direct children. Opening an account walks
//! its colon-separated segments, creating intermediate nodes as needed,
//! and installs an [`Inventory`] of the declared kind on the leaf.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::inventory::{BookingMethod, Inventory, InventoryKind};
use crate::intern::InternedStr;
use crate::position::Position;

/// One node in the account tree: either an intermediate grouping node (no
/// inventory of its own) or an opened account (inventory present).
#[derive(Debug, Clone)]
pub struct AccountNode {
    /// This node's own name segment (e.g. `"Checking"` for
    /// `Assets:Bank:Checking`), empty for the anonymous root.
    pub name: String,
    /// Full dotted-colon account name from the root, empty for the
    /// anonymous root.
    pub full_name: String,
    /// Currencies this account is restricted to holding; empty means any
    /// currency is allowed. Only meaningful once the account is open.
    pub currencies: Vec<InternedStr>,
    /// The booking method this account was opened with.
    pub booking: BookingMethod,
    /// Whether an `open` directive has installed an inventory here.
    open: bool,
    /// Whether a `close` directive has been applied.
    closed: bool,
    /// This node's own holdings (not including descendants).
    inventory: Inventory,
    /// Child nodes keyed by their own name segment, kept sorted for
    /// lexicographic-order rendering.
    children: BTreeMap<String, AccountNode>,
}

impl AccountNode {
    fn new(name: String, full_name: String) -> Self {
        Self {
            name,
            full_name,
            currencies: Vec::new(),
            booking: BookingMethod::Plain,
            open: false,
            closed: false,
            inventory: Inventory::new(InventoryKind::Plain),
            children: BTreeMap::new(),
        }
    }

    /// True once `open` has been applied and `close` has not.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open && !self.closed
    }

    /// True once a matching `close` directive has been applied.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// This node's own inventory (not aggregated with descendants).
    #[must_use]
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Mutable access to this node's own inventory.
    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    /// Children in lexicographic name order.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.values()
    }

    /// Whether a currency is permitted here. An account with no declared
    /// restrictions (`currencies` empty) allows any currency.
    #[must_use]
    pub fn allows_currency(&self, currency: &str) -> bool {
        self.currencies.is_empty() || self.currencies.iter().any(|c| c.as_str() == currency)
    }

    /// This node's inventory unioned with every descendant's, as a plain
    /// inventory expressed in units (cost stripped, matching the caller's
    /// currency).
    #[must_use]
    pub fn aggregated_inventory(&self) -> Inventory {
        let mut result = Inventory::new(InventoryKind::Plain);
        self.accumulate_into(&mut result);
        result
    }

    fn accumulate_into(&self, result: &mut Inventory) {
        for pos in self.inventory.at_units().positions() {
            result.add(pos.clone());
        }
        for child in self.children.values() {
            child.accumulate_into(result);
        }
    }

    /// Zero out this node's own inventory and every descendant's,
    /// returning the sum that was cleared (in units, one entry per
    /// currency).
    fn sweep(&mut self) -> Vec<(InternedStr, Decimal)> {
        let mut totals = Vec::new();
        for currency in self.inventory.currencies() {
            let currency = InternedStr::new(currency);
            totals.push((currency.clone(), self.inventory.units(currency.as_str())));
        }
        self.inventory = Inventory::new(self.inventory.kind());

        for child in self.children.values_mut() {
            for (currency, amount) in child.sweep() {
                if let Some(entry) = totals.iter_mut().find(|(c, _)| *c == currency) {
                    entry.1 += amount;
                } else {
                    totals.push((currency, amount));
                }
            }
        }
        totals
    }
}

/// The hierarchical account tree rooted at the five Beancount account
/// types.
///
/// # Examples
///
/// ```
/// use turbobean_core::AccountTree;
///
/// let mut tree = AccountTree::new();
/// tree.open("Assets:Bank:Checking", Vec::new(), None);
/// assert!(tree.get("Assets:Bank:Checking").unwrap().is_open());
/// assert!(tree.get("Assets:Bank").unwrap().children().count() == 1);
/// ```
#[derive(Debug, Clone)]
pub struct AccountTree {
    root: AccountNode,
}

impl Default for AccountTree {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountTree {
    /// An empty tree with the five standard roots present but unopened.
    #[must_use]
    pub fn new() -> Self {
        let mut root = AccountNode::new(String::new(), String::new());
        for name in ["Assets", "Liabilities", "Equity", "Income", "Expenses"] {
            root.children
                .insert(name.to_string(), AccountNode::new(name.to_string(), name.to_string()));
        }
        Self { root }
    }

    fn segments(account: &str) -> impl Iterator<Item = &str> {
        account.split(':')
    }

    /// Open an account, creating intermediate nodes as needed, and install
    /// an inventory of the kind implied by `booking` (`None` or `"PLAIN"`
    /// gives a plain inventory; any other valid booking method gives a
    /// lots inventory).
    pub fn open(
        &mut self,
        account: &str,
        currencies: Vec<InternedStr>,
        booking: Option<&str>,
    ) -> &mut AccountNode {
        let method: BookingMethod = booking
            .and_then(|b| b.parse().ok())
            .unwrap_or(BookingMethod::Plain);
        let kind = match method {
            BookingMethod::Plain => InventoryKind::Plain,
            BookingMethod::Fifo | BookingMethod::Lifo | BookingMethod::Strict => InventoryKind::Lots,
        };

        let mut node = &mut self.root;
        let mut path = String::new();
        for segment in Self::segments(account) {
            if path.is_empty() {
                path.push_str(segment);
            } else {
                path.push(':');
                path.push_str(segment);
            }
            let path_clone = path.clone();
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| AccountNode::new(segment.to_string(), path_clone));
        }

        node.open = true;
        node.closed = false;
        node.currencies = currencies;
        node.booking = method;
        node.inventory = Inventory::new(kind);
        node
    }

    /// Mark an account closed. Its node (and inventory) remain in the
    /// tree; only its lifecycle flag changes.
    pub fn close(&mut self, account: &str) -> Option<&mut AccountNode> {
        let node = self.get_mut(account)?;
        node.closed = true;
        Some(node)
    }

    /// Look up a node by its full dotted-colon name.
    #[must_use]
    pub fn get(&self, account: &str) -> Option<&AccountNode> {
        let mut node = &self.root;
        for segment in Self::segments(account) {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Mutable lookup by full dotted-colon name.
    pub fn get_mut(&mut self, account: &str) -> Option<&mut AccountNode> {
        let mut node = &mut self.root;
        for segment in Self::segments(account) {
            node = node.children.get_mut(segment)?;
        }
        Some(node)
    }

    /// The anonymous root node, whose children are the five account-type
    /// roots.
    #[must_use]
    pub const fn root(&self) -> &AccountNode {
        &self.root
    }

    /// Aggregated inventory (this account plus every descendant) for the
    /// named account, or an empty plain inventory if it doesn't exist.
    #[must_use]
    pub fn aggregated_inventory(&self, account: &str) -> Inventory {
        self.get(account)
            .map(AccountNode::aggregated_inventory)
            .unwrap_or_else(|| Inventory::new(InventoryKind::Plain))
    }

    /// Post a single position against an account's own inventory. The
    /// caller is responsible for account-lifecycle and currency-
    /// restriction checks; this only mutates the tree.
    pub fn post(&mut self, account: &str, position: Position) -> Option<()> {
        let node = self.get_mut(account)?;
        node.inventory_mut().add(position);
        Some(())
    }

    /// Sweep every currency balance out of `Income` and `Expenses` and
    /// into `target_account`, zeroing the source subtrees. Used to
    /// distinguish previous-period earnings from in-range activity.
    pub fn clear_earnings(&mut self, target_account: &str) {
        let mut cleared = Vec::new();
        for root_name in ["Income", "Expenses"] {
            if let Some(node) = self.root.children.get_mut(root_name) {
                cleared.extend(node.sweep());
            }
        }

        let Some(target) = self.get_mut(target_account) else {
            return;
        };
        for (currency, amount) in cleared {
            target
                .inventory_mut()
                .add(Position::simple(crate::Amount::new(amount, currency)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Amount;
    use rust_decimal_macros::dec;

    #[test]
    fn opening_creates_intermediate_nodes() {
        let mut tree = AccountTree::new();
        tree.open("Assets:Bank:Checking", Vec::new(), None);

        assert!(tree.get("Assets").is_some());
        assert!(tree.get("Assets:Bank").is_some());
        let leaf = tree.get("Assets:Bank:Checking").unwrap();
        assert!(leaf.is_open());
        assert_eq!(leaf.inventory().kind(), InventoryKind::Plain);
    }

    #[test]
    fn booking_method_selects_inventory_kind() {
        let mut tree = AccountTree::new();
        tree.open("Assets:Broker", Vec::new(), Some("FIFO"));
        let node = tree.get("Assets:Broker").unwrap();
        assert_eq!(node.booking, BookingMethod::Fifo);
        assert_eq!(node.inventory().kind(), InventoryKind::Lots);
    }

    #[test]
    fn close_without_open_returns_none() {
        let mut tree = AccountTree::new();
        assert!(tree.close("Assets:Nowhere").is_none());
    }

    #[test]
    fn close_marks_closed_but_keeps_node() {
        let mut tree = AccountTree::new();
        tree.open("Assets:Cash", Vec::new(), None);
        tree.close("Assets:Cash");
        let node = tree.get("Assets:Cash").unwrap();
        assert!(node.is_closed());
        assert!(!node.is_open());
    }

    #[test]
    fn currency_restriction() {
        let mut tree = AccountTree::new();
        tree.open(
            "Assets:Cash",
            vec![InternedStr::new("USD")],
            None,
        );
        let node = tree.get("Assets:Cash").unwrap();
        assert!(node.allows_currency("USD"));
        assert!(!node.allows_currency("EUR"));
    }

    #[test]
    fn aggregation_unions_subtree() {
        let mut tree = AccountTree::new();
        tree.open("Assets:Bank:Checking", Vec::new(), None);
        tree.open("Assets:Bank:Savings", Vec::new(), None);

        tree.post("Assets:Bank:Checking", Position::simple(Amount::new(dec!(100), "USD")));
        tree.post("Assets:Bank:Savings", Position::simple(Amount::new(dec!(50), "USD")));

        let agg = tree.aggregated_inventory("Assets:Bank");
        assert_eq!(agg.units("USD"), dec!(150));
    }

    #[test]
    fn children_enumerated_lexicographically() {
        let mut tree = AccountTree::new();
        tree.open("Assets:Zebra", Vec::new(), None);
        tree.open("Assets:Apple", Vec::new(), None);

        let names: Vec<&str> = tree
            .get("Assets")
            .unwrap()
            .children()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Apple", "Zebra"]);
    }

    #[test]
    fn clear_earnings_sweeps_into_target() {
        let mut tree = AccountTree::new();
        tree.open("Income:Salary", Vec::new(), None);
        tree.open("Expenses:Rent", Vec::new(), None);
        tree.open("Equity:Earnings", Vec::new(), None);

        tree.post("Income:Salary", Position::simple(Amount::new(dec!(-1000), "USD")));
        tree.post("Expenses:Rent", Position::simple(Amount::new(dec!(400), "USD")));

        tree.clear_earnings("Equity:Earnings");

        assert_eq!(tree.aggregated_inventory("Income").units("USD"), dec!(0));
        assert_eq!(tree.aggregated_inventory("Expenses").units("USD"), dec!(0));
        assert_eq!(
            tree.aggregated_inventory("Equity:Earnings").units("USD"),
            dec!(-600)
        );
    }
}
