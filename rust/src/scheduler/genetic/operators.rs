//! Permutation operators for the genetic search.
//!
//! An individual is a permutation of task indices. Every operator returns a
//! fresh vector or mutates only the child it is given; parents are never
//! modified in place.

use rand::seq::SliceRandom;
use rand::Rng;

/// A candidate ordering: permutation of indices into the task slice.
pub type Candidate = Vec<usize>;

/// Uniformly random permutation of `0..n`.
pub fn random_permutation<R: Rng>(n: usize, rng: &mut R) -> Candidate {
    let mut order: Candidate = (0..n).collect();
    order.shuffle(rng);
    order
}

/// Order crossover (OX).
///
/// Copies `parent1[lo..=hi]` into the same positions of the child, then fills
/// the remaining positions left to right with `parent2`'s elements in their
/// order, skipping any already copied. The result is always a permutation of
/// the parents' elements.
pub fn order_crossover<R: Rng>(parent1: &[usize], parent2: &[usize], rng: &mut R) -> Candidate {
    let n = parent1.len();
    if n < 2 {
        return parent1.to_vec();
    }
    let a = rng.random_range(0..n);
    let b = rng.random_range(0..n);
    order_crossover_at(parent1, parent2, a.min(b), a.max(b))
}

/// OX with explicit inclusive cut points.
pub fn order_crossover_at(parent1: &[usize], parent2: &[usize], lo: usize, hi: usize) -> Candidate {
    let n = parent1.len();
    let mut child: Vec<Option<usize>> = vec![None; n];
    // Indices are 0..n, so membership is a flat bitmap
    let mut used = vec![false; n];

    for pos in lo..=hi.min(n.saturating_sub(1)) {
        child[pos] = Some(parent1[pos]);
        used[parent1[pos]] = true;
    }

    let mut donors = parent2.iter().copied().filter(|gene| !used[*gene]);
    for slot in child.iter_mut().filter(|slot| slot.is_none()) {
        *slot = donors.next();
    }

    child.into_iter().flatten().collect()
}

/// Exchange two distinct, uniformly chosen positions.
pub fn swap_mutation<R: Rng>(order: &mut [usize], rng: &mut R) {
    let n = order.len();
    if n < 2 {
        return;
    }
    let i = rng.random_range(0..n);
    let mut j = rng.random_range(0..n - 1);
    if j >= i {
        j += 1;
    }
    order.swap(i, j);
}

/// Draw `size` individuals uniformly (with replacement) and return the index
/// of the fittest.
pub fn tournament_select<R: Rng>(fitness: &[f64], size: usize, rng: &mut R) -> usize {
    let mut best = rng.random_range(0..fitness.len());
    for _ in 1..size {
        let challenger = rng.random_range(0..fitness.len());
        if fitness[challenger] > fitness[best] {
            best = challenger;
        }
    }
    best
}
