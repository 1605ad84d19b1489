//! Dependency ordering.
//!
//! Graphs are given as parent lists: `parents[i]` holds the indices node `i`
//! depends on. Node indices are registration positions.

use core::cmp::Reverse;
use std::collections::BinaryHeap;

/// Sorts nodes so every node comes after all of its parents.
///
/// Among the nodes whose parents are all placed, the one registered first
/// goes next, so unrelated nodes keep their registration order wherever the
/// dependencies allow it.
///
/// # Errors
///
/// Returns one dependency cycle if the graph is not acyclic. The cycle lists
/// node indices, each depending on the next, with the first node repeated at
/// the end.
///
/// # Panics
///
/// Panics if a parent index is not less than `parents.len()`. Parent lists
/// built by the autowirer always satisfy this.
pub fn sort(parents: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let n = parents.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (child, child_parents) in parents.iter().enumerate() {
        for &parent in child_parents {
            dependents[parent].push(child);
            in_degree[child] += 1;
        }
    }

    // Kahn's algorithm, lowest registration index first
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut sorted = Vec::with_capacity(n);
    while let Some(Reverse(idx)) = ready.pop() {
        sorted.push(idx);
        for &dependent in &dependents[idx] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if sorted.len() == n {
        return Ok(sorted);
    }

    // Every unsorted node still waits on an unsorted parent, so walking
    // parents from any of them must close a cycle.
    let stuck: Vec<bool> = in_degree.iter().map(|degree| *degree > 0).collect();
    Err(find_cycle(parents, &stuck))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Finds a cycle among the nodes flagged in `candidates`.
fn find_cycle(parents: &[Vec<usize>], candidates: &[bool]) -> Vec<usize> {
    let mut marks = vec![Mark::Unvisited; parents.len()];
    let mut path = Vec::new();

    for start in 0..parents.len() {
        if candidates[start] && marks[start] == Mark::Unvisited {
            if let Some(cycle) = visit(parents, candidates, start, &mut marks, &mut path) {
                return cycle;
            }
        }
    }

    Vec::new()
}

fn visit(
    parents: &[Vec<usize>],
    candidates: &[bool],
    node: usize,
    marks: &mut [Mark],
    path: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    marks[node] = Mark::Visiting;
    path.push(node);

    for &parent in &parents[node] {
        if !candidates[parent] {
            continue;
        }
        match marks[parent] {
            Mark::Visiting => {
                let start = path.iter().position(|&n| n == parent).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(parent);
                return Some(cycle);
            }
            Mark::Unvisited => {
                if let Some(cycle) = visit(parents, candidates, parent, marks, path) {
                    return Some(cycle);
                }
            }
            Mark::Done => {}
        }
    }

    path.pop();
    marks[node] = Mark::Done;
    None
}

/// Returns true if `child` depends on `ancestor`, directly or transitively.
///
/// Each node is visited at most once, so cyclic graphs terminate.
#[must_use]
pub fn depends_on(parents: &[Vec<usize>], child: usize, ancestor: usize) -> bool {
    let Some(first) = parents.get(child) else {
        return false;
    };

    let mut visited = vec![false; parents.len()];
    let mut stack: Vec<usize> = first.clone();

    while let Some(node) = stack.pop() {
        if node == ancestor {
            return true;
        }
        if core::mem::replace(&mut visited[node], true) {
            continue;
        }
        stack.extend_from_slice(&parents[node]);
    }

    false
}
