//! Tree Edit Distance
//!
//! Zhang–Shasha dynamic program over two annotated trees. Each keyroot
//! pair solves one forest-distance table; sub-tree results are kept in
//! a shared `tree_dist` matrix and reused by later keyroot pairs.

use super::annotate::{AnnotatedTree, Labeled, Tree};

/// Costs of the three edit operations
pub trait CostPolicy<N: ?Sized> {
    fn insert_cost(&self, node: &N) -> f64;
    fn remove_cost(&self, node: &N) -> f64;
    fn relabel_cost(&self, a: &N, b: &N) -> f64;
}

/// Unit insert/remove cost; relabel costs 0 for equal labels, else 1
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitCost;

impl<N: Labeled + ?Sized> CostPolicy<N> for UnitCost {
    fn insert_cost(&self, _node: &N) -> f64 {
        1.0
    }

    fn remove_cost(&self, _node: &N) -> f64 {
        1.0
    }

    fn relabel_cost(&self, a: &N, b: &N) -> f64 {
        if a.label() == b.label() {
            0.0
        } else {
            1.0
        }
    }
}

/// Cost policy assembled from three closures
pub struct CustomCost<I, R, U> {
    insert: I,
    remove: R,
    update: U,
}

impl<I, R, U> CustomCost<I, R, U> {
    pub fn new(insert: I, remove: R, update: U) -> Self {
        Self { insert, remove, update }
    }
}

impl<N, I, R, U> CostPolicy<N> for CustomCost<I, R, U>
where
    N: ?Sized,
    I: Fn(&N) -> f64,
    R: Fn(&N) -> f64,
    U: Fn(&N, &N) -> f64,
{
    fn insert_cost(&self, node: &N) -> f64 {
        (self.insert)(node)
    }

    fn remove_cost(&self, node: &N) -> f64 {
        (self.remove)(node)
    }

    fn relabel_cost(&self, a: &N, b: &N) -> f64 {
        (self.update)(a, b)
    }
}

/// Minimum cost of edits turning tree `a` into tree `b`
pub fn tree_distance<N, A, B, P>(a: &A, b: &B, policy: &P) -> f64
where
    N: ?Sized,
    A: Tree<Node = N>,
    B: Tree<Node = N>,
    P: CostPolicy<N> + ?Sized,
{
    let a = AnnotatedTree::new(a);
    let b = AnnotatedTree::new(b);

    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 0.0,
        (true, false) => return b.nodes.iter().map(|&n| policy.insert_cost(n)).sum(),
        (false, true) => return a.nodes.iter().map(|&n| policy.remove_cost(n)).sum(),
        (false, false) => {}
    }

    let mut tree_dist = vec![vec![0.0f64; b.len()]; a.len()];
    for &i in &a.keyroots {
        for &j in &b.keyroots {
            forest_distance(&a, &b, i, j, policy, &mut tree_dist);
        }
    }
    tree_dist[a.len() - 1][b.len() - 1]
}

/// Unit-cost distance over node labels
pub fn distance<N, A, B>(a: &A, b: &B) -> f64
where
    N: Labeled + ?Sized,
    A: Tree<Node = N>,
    B: Tree<Node = N>,
{
    tree_distance(a, b, &UnitCost)
}

/// Fill the forest table for keyroots `i` of `a` and `j` of `b`.
///
/// Row `x` of the table stands for the forest of nodes `lmds[i] ..
/// lmds[i] + x - 1`; row 0 is the empty forest. Columns likewise.
fn forest_distance<N, P>(
    a: &AnnotatedTree<'_, N>,
    b: &AnnotatedTree<'_, N>,
    i: usize,
    j: usize,
    policy: &P,
    tree_dist: &mut [Vec<f64>],
) where
    N: ?Sized,
    P: CostPolicy<N> + ?Sized,
{
    let (al, bl) = (&a.lmds, &b.lmds);
    let (ai, bj) = (al[i], bl[j]);
    let rows = i - ai + 2;
    let cols = j - bj + 2;
    let mut fd = vec![vec![0.0f64; cols]; rows];

    for x in 1..rows {
        fd[x][0] = fd[x - 1][0] + policy.remove_cost(a.nodes[ai + x - 1]);
    }
    for y in 1..cols {
        fd[0][y] = fd[0][y - 1] + policy.insert_cost(b.nodes[bj + y - 1]);
    }

    for x in 1..rows {
        let xi = ai + x - 1;
        for y in 1..cols {
            let yj = bj + y - 1;
            let remove = fd[x - 1][y] + policy.remove_cost(a.nodes[xi]);
            let insert = fd[x][y - 1] + policy.insert_cost(b.nodes[yj]);

            if al[xi] == ai && bl[yj] == bj {
                // Both forests are whole trees
                let update = fd[x - 1][y - 1] + policy.relabel_cost(a.nodes[xi], b.nodes[yj]);
                fd[x][y] = remove.min(insert).min(update);
                tree_dist[xi][yj] = fd[x][y];
            } else {
                let p = al[xi] - ai;
                let q = bl[yj] - bj;
                let reuse = fd[p][q] + tree_dist[xi][yj];
                fd[x][y] = remove.min(insert).min(reuse);
            }
        }
    }
}
