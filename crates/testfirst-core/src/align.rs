//! # Commit Graph Aligner
//!
//! Eliminates merge topology from a commit DAG.
//!
//! Side branches are spliced into the main branch at the point where they
//! were merged, producing one linear order in which every merged branch's
//! commits appear contiguously:
//!
//! ```text
//!            F-------->G-------->H
//!            ^                   |
//!     B----->C----->D---->E      |
//!     ^                   |      |
//!     |                   v      v
//!     W-------->X-------->Y----->Z
//!
//!     becomes W, X, B, C, D, E, Y, F, G, H, Z
//! ```
//!
//! Commits live in an arena addressed by index; rewiring a parent is an
//! index update on a working copy of the parent lists.

use crate::types::{CommitRecord, TfdError};
use std::collections::BTreeMap;

/// A side branch merged into the main branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Hash of the merge commit on the main branch.
    pub merge: String,
    /// Branch commits, oldest (head) first.
    pub commits: Vec<String>,
}

impl Branch {
    /// The oldest commit of the branch.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        self.commits.first().map(String::as_str)
    }

    /// The newest commit of the branch, the merge's second parent.
    #[must_use]
    pub fn tail(&self) -> Option<&str> {
        self.commits.last().map(String::as_str)
    }
}

/// Validated commit DAG with a unique root and a unique tip.
#[derive(Debug, Clone)]
pub struct CommitAligner {
    records: Vec<CommitRecord>,
    index: BTreeMap<String, usize>,
    /// Parent indices per commit, first parent first, without duplicates.
    parents: Vec<Vec<usize>>,
    root: usize,
    tip: usize,
}

impl CommitAligner {
    /// Validate the topology of `records`.
    ///
    /// # Errors
    /// Returns `TfdError::MalformedTopology` when the records are empty,
    /// repeat a hash, name a parent outside the set, contain a cycle, or do
    /// not have exactly one root and one tip.
    pub fn new(records: Vec<CommitRecord>) -> Result<Self, TfdError> {
        if records.is_empty() {
            return Err(TfdError::MalformedTopology("no commits".to_string()));
        }

        let mut index = BTreeMap::new();
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.hash.clone(), position).is_some() {
                return Err(TfdError::MalformedTopology(format!(
                    "duplicate commit {}",
                    record.hash
                )));
            }
        }

        let mut parents = Vec::with_capacity(records.len());
        let mut is_parent = vec![false; records.len()];
        for (position, record) in records.iter().enumerate() {
            let mut resolved: Vec<usize> = Vec::with_capacity(record.parents.len());
            for hash in &record.parents {
                let Some(&parent) = index.get(hash) else {
                    return Err(TfdError::MalformedTopology(format!(
                        "commit {} has unknown parent {}",
                        record.hash, hash
                    )));
                };
                if parent == position {
                    return Err(TfdError::MalformedTopology(format!(
                        "commit {} is its own parent",
                        record.hash
                    )));
                }
                if !resolved.contains(&parent) {
                    resolved.push(parent);
                }
                is_parent[parent] = true;
            }
            parents.push(resolved);
        }

        let roots: Vec<usize> = (0..records.len())
            .filter(|&i| parents[i].is_empty())
            .collect();
        let tips: Vec<usize> = (0..records.len()).filter(|&i| !is_parent[i]).collect();

        let root = single(&roots, "root", &records)?;
        let tip = single(&tips, "tip", &records)?;

        ensure_acyclic(&parents)?;

        Ok(Self {
            records,
            index,
            parents,
            root,
            tip,
        })
    }

    /// Hash of the commit without parents.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.records[self.root].hash
    }

    /// Hash of the commit nobody descends from.
    #[must_use]
    pub fn tip(&self) -> &str {
        &self.records[self.tip].hash
    }

    /// Number of commits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record by hash.
    #[must_use]
    pub fn record(&self, hash: &str) -> Option<&CommitRecord> {
        self.index.get(hash).map(|&i| &self.records[i])
    }

    fn first_parent_chain(&self) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut current = Some(self.tip);
        while let Some(node) = current {
            chain.push(node);
            current = self.parents[node].first().copied();
        }
        chain.reverse();
        chain
    }

    /// Hashes of the main branch (first-parent chain), root first.
    #[must_use]
    pub fn main_branch(&self) -> Vec<&str> {
        self.first_parent_chain()
            .into_iter()
            .map(|i| self.records[i].hash.as_str())
            .collect()
    }

    /// Side branches merged into the main branch, in merge order.
    ///
    /// Each branch follows first parents back from a merge's extra parent
    /// until the main branch is reached.
    #[must_use]
    pub fn merged_branches(&self) -> Vec<Branch> {
        let chain = self.first_parent_chain();
        let mut on_main = vec![false; self.records.len()];
        for &node in &chain {
            on_main[node] = true;
        }

        let mut branches = Vec::new();
        for &merge in &chain {
            for &side in self.parents[merge].iter().skip(1) {
                let mut commits = Vec::new();
                let mut current = Some(side);
                while let Some(node) = current.filter(|&n| !on_main[n]) {
                    commits.push(self.records[node].hash.clone());
                    current = self.parents[node].first().copied();
                }
                if commits.is_empty() {
                    continue;
                }
                commits.reverse();
                branches.push(Branch {
                    merge: self.records[merge].hash.clone(),
                    commits,
                });
            }
        }
        branches
    }

    /// Linear commit order with every side branch spliced in.
    fn linear_order(&self) -> Result<Vec<usize>, TfdError> {
        let n = self.records.len();
        let mut parents = self.parents.clone();
        let mut visited = vec![false; n];
        let mut next: Vec<Option<usize>> = vec![None; n];

        let chain = self.first_parent_chain();
        for pair in chain.windows(2) {
            next[pair[0]] = Some(pair[1]);
        }

        let mut current = Some(self.root);
        while let Some(node) = current {
            visited[node] = true;

            if parents[node].len() < 2 {
                current = next[node];
                continue;
            }

            let side = parents[node].remove(1);
            if visited[side] {
                // Diamond: the side branch is already part of the chain.
                continue;
            }

            // Side branch from its tail back to the first unvisited commit.
            let mut path = vec![side];
            let mut earliest = side;
            while let Some(&parent) = parents[earliest].first() {
                if visited[parent] {
                    break;
                }
                earliest = parent;
                path.push(earliest);
            }

            let fork = parents[node][0];
            match parents[earliest].first_mut() {
                Some(slot) => *slot = fork,
                None => {
                    return Err(TfdError::MalformedTopology(format!(
                        "side branch at {} reaches a second root",
                        self.records[earliest].hash
                    )));
                }
            }
            parents[node][0] = side;

            next[fork] = Some(earliest);
            for pair in path.windows(2) {
                next[pair[1]] = Some(pair[0]);
            }
            next[side] = Some(node);

            current = Some(earliest);
        }

        let mut order = Vec::with_capacity(n);
        let mut cursor = Some(self.tip);
        while let Some(node) = cursor {
            if order.len() == n {
                return Err(TfdError::MalformedTopology(
                    "aligned chain does not terminate".to_string(),
                ));
            }
            order.push(node);
            cursor = parents[node].first().copied();
        }
        order.reverse();

        if order.len() != n {
            return Err(TfdError::MalformedTopology(format!(
                "alignment kept {} of {} commits",
                order.len(),
                n
            )));
        }
        Ok(order)
    }

    /// Align the history.
    ///
    /// Returns the commits in linear order, each with at most one parent:
    /// the commit before it.
    pub fn align(&self) -> Result<Vec<CommitRecord>, TfdError> {
        let order = self.linear_order()?;
        let mut aligned = Vec::with_capacity(order.len());
        let mut previous: Option<&str> = None;
        for node in order {
            let record = &self.records[node];
            aligned.push(CommitRecord {
                hash: record.hash.clone(),
                parents: previous.map(str::to_string).into_iter().collect(),
                changes: record.changes.clone(),
            });
            previous = Some(record.hash.as_str());
        }
        tracing::debug!(commits = aligned.len(), "aligned commit history");
        Ok(aligned)
    }
}

fn single(candidates: &[usize], what: &str, records: &[CommitRecord]) -> Result<usize, TfdError> {
    match candidates {
        [one] => Ok(*one),
        [] => Err(TfdError::MalformedTopology(format!("history has no {}", what))),
        many => {
            let hashes: Vec<&str> = many.iter().map(|&i| records[i].hash.as_str()).collect();
            Err(TfdError::MalformedTopology(format!(
                "history has {} {}s: {}",
                many.len(),
                what,
                hashes.join(", ")
            )))
        }
    }
}

/// Kahn's algorithm over the parent lists.
fn ensure_acyclic(parents: &[Vec<usize>]) -> Result<(), TfdError> {
    let n = parents.len();
    let mut pending: Vec<usize> = parents.iter().map(Vec::len).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (child, list) in parents.iter().enumerate() {
        for &parent in list {
            children[parent].push(child);
        }
    }

    let mut ready: Vec<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut processed = 0;
    while let Some(node) = ready.pop() {
        processed += 1;
        for &child in &children[node] {
            pending[child] -= 1;
            if pending[child] == 0 {
                ready.push(child);
            }
        }
    }

    if processed == n {
        Ok(())
    } else {
        Err(TfdError::MalformedTopology(format!(
            "{} commits lie on a cycle",
            n - processed
        )))
    }
}

// =============================================================================
// TESTS
// =============================================================================
