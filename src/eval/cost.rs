//! Label Cost Policy
//!
//! Relabel costs between command-tree labels (`KIND_value`). Equal
//! labels are free, a table of known-equivalent pairs overrides the
//! default unit cost, and in loose mode any two arguments match.

use std::collections::HashMap;

use crate::ast::Node;

use super::distance::CostPolicy;

/// Separator between the two labels of a table key
pub const PAIR_SEPARATOR: &str = ":::";

/// Prefix shared by all argument labels
pub const ARGUMENT_LABEL_PREFIX: &str = "ARGUMENT_";

lazy_static::lazy_static! {
    static ref DEFAULT_TABLE: SubstitutionTable = {
        let mut table = SubstitutionTable::empty();
        // Adding or dropping an output action costs nothing.
        for flag in ["FLAG_-ls", "FLAG_-print", "FLAG_-print0"] {
            table.insert(flag, "", 0.0);
            table.insert("", flag, 0.0);
        }
        table.insert("FLAG_-print", "FLAG_-print0", 0.0);
        table.insert("FLAG_-print0", "FLAG_-print", 0.0);
        table.insert("FLAG_-name", "FLAG_-regex", 0.0);
        table.insert("FLAG_-regex", "FLAG_-name", 0.0);
        table
    };
}

/// Ordered label pairs with an overriding relabel cost.
///
/// An empty label on one side stands for insertion or removal. Each
/// direction of a pair is a separate entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubstitutionTable {
    entries: HashMap<String, f64>,
}

impl SubstitutionTable {
    /// A table with no overrides
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: &str, to: &str, cost: f64) {
        self.entries.insert(pair_key(from, to), cost);
    }

    pub fn get(&self, from: &str, to: &str) -> Option<f64> {
        self.entries.get(&pair_key(from, to)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The built-in table of equivalent `find` actions and tests
pub fn default_table() -> SubstitutionTable {
    DEFAULT_TABLE.clone()
}

fn pair_key(from: &str, to: &str) -> String {
    format!("{}{}{}", from, PAIR_SEPARATOR, to)
}

/// Cost of turning label `a` into label `b`
pub fn local_dist(table: &SubstitutionTable, a: &str, b: &str, skip_argument: bool) -> f64 {
    if a == b {
        return 0.0;
    }
    if skip_argument && a.starts_with(ARGUMENT_LABEL_PREFIX) && b.starts_with(ARGUMENT_LABEL_PREFIX) {
        return 0.0;
    }
    table.get(a, b).unwrap_or(1.0)
}

/// Strict distance: literal argument values must agree
pub fn str_local_dist(table: &SubstitutionTable, a: &str, b: &str) -> f64 {
    local_dist(table, a, b, false)
}

/// Template distance: any two arguments are interchangeable
pub fn temp_local_dist(table: &SubstitutionTable, a: &str, b: &str) -> f64 {
    local_dist(table, a, b, true)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    Strict,
    Loose,
}

impl MatchMode {
    pub fn from_ignore_arg_value(ignore_arg_value: bool) -> Self {
        if ignore_arg_value {
            Self::Loose
        } else {
            Self::Strict
        }
    }

    fn skips_arguments(self) -> bool {
        matches!(self, Self::Loose)
    }
}

/// Tree-edit costs over command-tree labels
#[derive(Debug, Clone, Copy)]
pub struct LabelCostPolicy<'t> {
    table: &'t SubstitutionTable,
    mode: MatchMode,
}

impl<'t> LabelCostPolicy<'t> {
    pub fn new(table: &'t SubstitutionTable, mode: MatchMode) -> Self {
        Self { table, mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    fn dist(&self, a: &str, b: &str) -> f64 {
        local_dist(self.table, a, b, self.mode.skips_arguments())
    }
}

impl CostPolicy<Node> for LabelCostPolicy<'_> {
    fn insert_cost(&self, node: &Node) -> f64 {
        self.dist("", &node.get_label())
    }

    fn remove_cost(&self, node: &Node) -> f64 {
        self.dist(&node.get_label(), "")
    }

    fn relabel_cost(&self, a: &Node, b: &Node) -> f64 {
        self.dist(&a.get_label(), &b.get_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArgType, TreeBuilder};
    use crate::eval::distance::tree_distance;

    #[test]
    fn test_equal_labels_are_free() {
        let table = default_table();
        assert_eq!(str_local_dist(&table, "FLAG_-type", "FLAG_-type"), 0.0);
        assert_eq!(str_local_dist(&table, "FLAG_-type", "FLAG_-size"), 1.0);
    }

    #[test]
    fn test_print_variants_are_interchangeable() {
        let table = default_table();
        assert_eq!(str_local_dist(&table, "FLAG_-print", "FLAG_-print0"), 0.0);
        assert_eq!(str_local_dist(&table, "FLAG_-print0", "FLAG_-print"), 0.0);
        assert_eq!(str_local_dist(&table, "FLAG_-print", ""), 0.0);
        assert_eq!(str_local_dist(&table, "", "FLAG_-ls"), 0.0);
        assert_eq!(str_local_dist(&table, "FLAG_-name", "FLAG_-regex"), 0.0);
    }

    #[test]
    fn test_table_is_order_sensitive() {
        let mut table = SubstitutionTable::empty();
        table.insert("FLAG_-a", "FLAG_-b", 0.25);
        assert_eq!(str_local_dist(&table, "FLAG_-a", "FLAG_-b"), 0.25);
        assert_eq!(str_local_dist(&table, "FLAG_-b", "FLAG_-a"), 1.0);
    }

    #[test]
    fn test_loose_mode_skips_arguments() {
        let table = default_table();
        assert_eq!(str_local_dist(&table, "ARGUMENT_a.txt", "ARGUMENT_b.txt"), 1.0);
        assert_eq!(temp_local_dist(&table, "ARGUMENT_a.txt", "ARGUMENT_b.txt"), 0.0);
        assert_eq!(temp_local_dist(&table, "ARGUMENT_a.txt", "FLAG_-a"), 1.0);
    }

    fn find_with(flag: &str, pattern: &str) -> crate::ast::CommandTree {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let find = b.add(root, Node::utility("find")).unwrap();
        b.add(find, Node::argument(".", ArgType::Path)).unwrap();
        let f = b.add(find, Node::flag(flag)).unwrap();
        b.add(f, Node::argument(pattern, ArgType::Regex)).unwrap();
        b.finish()
    }

    #[test]
    fn test_policy_over_command_trees() {
        let table = default_table();
        let a = find_with("-name", "*.txt");
        let b = find_with("-regex", "*.log");
        let strict = LabelCostPolicy::new(&table, MatchMode::Strict);
        let loose = LabelCostPolicy::new(&table, MatchMode::Loose);
        assert_eq!(tree_distance(&a, &b, &strict), 1.0);
        assert_eq!(tree_distance(&a, &b, &loose), 0.0);
    }

    #[test]
    fn test_free_insertion_of_print() {
        let table = default_table();
        let mut b = TreeBuilder::new();
        let root = b.root();
        let find = b.add(root, Node::utility("find")).unwrap();
        b.add(find, Node::argument(".", ArgType::Path)).unwrap();
        let plain = b.finish();

        let mut b = TreeBuilder::new();
        let root = b.root();
        let find = b.add(root, Node::utility("find")).unwrap();
        b.add(find, Node::argument(".", ArgType::Path)).unwrap();
        b.add(find, Node::flag("-print")).unwrap();
        let printing = b.finish();

        let policy = LabelCostPolicy::new(&table, MatchMode::Strict);
        assert_eq!(tree_distance(&plain, &printing, &policy), 0.0);
    }
}
