//! Hint solver
//!
//! A hint is the hash of some permutation of the alphabet with exactly one
//! character left out. The solver tries each exclusion index from left to
//! right and, for each, enumerates every permutation of the remaining
//! characters until one hashes to an unsolved hint. The character left out is
//! guaranteed not to occur in the password.
//!
//! Several hints over the same alphabet can share one solver: every generated
//! permutation is compared against all hints still unsolved.

use crate::hash::Digest;
use crate::permutation::HeapPermutations;
use crate::search::SearchStep;
use std::time::{Duration, Instant};

/// A solved hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrackedHint {
    /// Caller-chosen index of the hint
    pub hint: usize,
    /// The alphabet character the hint leaves out
    pub excluded: char,
}

/// Resumable search over (exclusion index, permutation of the remainder)
#[derive(Debug, Clone)]
pub struct HintSolver {
    alphabet: Vec<char>,
    targets: Vec<(usize, Digest)>,
    /// Hints matched by an earlier permutation, reported before scanning on
    pending: Vec<CrackedHint>,
    excluded: usize,
    permutations: Option<HeapPermutations<char>>,
    scratch: String,
}

impl HintSolver {
    /// Solver for `hints` (index, digest) over `alphabet`
    pub fn new(alphabet: &[char], hints: impl IntoIterator<Item = (usize, Digest)>) -> Self {
        Self {
            alphabet: alphabet.to_vec(),
            targets: hints.into_iter().collect(),
            pending: Vec::new(),
            excluded: 0,
            permutations: None,
            scratch: String::with_capacity(alphabet.len() * 4),
        }
    }

    /// Hints not yet solved
    pub fn remaining(&self) -> usize {
        self.targets.len() + self.pending.len()
    }

    /// Alphabet index currently being left out
    pub fn excluded_index(&self) -> usize {
        self.excluded
    }

    /// Scan for up to `budget` of wall-clock time.
    ///
    /// Each call makes progress before checking the clock. After [`SearchStep::Cracked`]
    /// the solver can be resumed for the remaining hints; hints sharing a
    /// digest are all matched by the same permutation and reported one per
    /// call. A solver with no hints left reports [`SearchStep::Exhausted`].
    pub fn resume(&mut self, budget: Duration) -> SearchStep<CrackedHint> {
        if let Some(hit) = self.pending.pop() {
            return SearchStep::Cracked(hit);
        }
        if self.targets.is_empty() {
            return SearchStep::Exhausted;
        }
        let started = Instant::now();

        loop {
            if self.excluded >= self.alphabet.len() {
                return SearchStep::Exhausted;
            }

            let alphabet = &self.alphabet;
            let excluded = self.excluded;
            let permutations = self.permutations.get_or_insert_with(|| {
                let mut remainder = alphabet.clone();
                remainder.remove(excluded);
                HeapPermutations::new(remainder)
            });

            let scratch = &mut self.scratch;
            let digest = permutations
                .next_permutation()
                .map(|candidate| Digest::of_chars(candidate, scratch));

            match digest {
                Some(digest) => {
                    if self.targets.iter().any(|(_, d)| *d == digest) {
                        let excluded = self.alphabet[self.excluded];
                        let (hits, rest): (Vec<_>, Vec<_>) = self
                            .targets
                            .drain(..)
                            .partition(|(_, d)| *d == digest);
                        self.targets = rest;
                        // Popped from the back, so keep caller order reversed.
                        self.pending.extend(
                            hits.into_iter()
                                .rev()
                                .map(|(hint, _)| CrackedHint { hint, excluded }),
                        );
                        if let Some(hit) = self.pending.pop() {
                            return SearchStep::Cracked(hit);
                        }
                    }
                }
                None => {
                    self.excluded += 1;
                    self.permutations = None;
                }
            }

            if started.elapsed() >= budget {
                return SearchStep::Yielded;
            }
        }
    }

    /// Run to completion for the next solved hint, ignoring time slices
    pub fn solve(&mut self) -> Option<CrackedHint> {
        loop {
            match self.resume(Duration::MAX) {
                SearchStep::Cracked(hit) => return Some(hit),
                SearchStep::Exhausted => return None,
                SearchStep::Yielded => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    /// Hash of a shuffled alphabet with `missing` removed
    fn hint_for(alphabet: &str, missing: char) -> Digest {
        let mut rest: Vec<char> = alphabet.chars().filter(|c| *c != missing).collect();
        let half = rest.len() / 2;
        rest.rotate_left(half);
        rest.reverse();
        Digest::of(&rest.into_iter().collect::<String>())
    }

    #[test]
    fn finds_the_excluded_character() {
        let alphabet = "ABCDEF";
        for missing in alphabet.chars() {
            let mut solver = HintSolver::new(&chars(alphabet), [(0, hint_for(alphabet, missing))]);
            assert_eq!(
                solver.solve(),
                Some(CrackedHint { hint: 0, excluded: missing }),
                "missing {missing}"
            );
            assert_eq!(solver.remaining(), 0);
        }
    }

    #[test]
    fn zero_budget_resumes_to_the_same_answer() {
        let alphabet = chars("ABCDE");
        let target = hint_for("ABCDE", 'D');
        let mut solver = HintSolver::new(&alphabet, [(3, target)]);

        let mut slices = 0;
        let hit = loop {
            slices += 1;
            match solver.resume(Duration::ZERO) {
                SearchStep::Yielded => continue,
                SearchStep::Cracked(hit) => break hit,
                SearchStep::Exhausted => panic!("hint should be solvable"),
            }
        };
        assert_eq!(hit, CrackedHint { hint: 3, excluded: 'D' });
        // Three full exclusion rounds of 4! permutations precede index 3.
        assert!(slices > 3 * 24, "only {slices} slices");
    }

    #[test]
    fn shared_solver_cracks_every_hint() {
        let alphabet = "ABCDEFG";
        let missing = ['G', 'B', 'E'];
        let hints = missing
            .iter()
            .enumerate()
            .map(|(i, c)| (i, hint_for(alphabet, *c)));
        let mut solver = HintSolver::new(&chars(alphabet), hints);

        let mut found = Vec::new();
        while let Some(hit) = solver.solve() {
            found.push(hit);
        }
        found.sort_by_key(|h| h.hint);
        assert_eq!(
            found,
            vec![
                CrackedHint { hint: 0, excluded: 'G' },
                CrackedHint { hint: 1, excluded: 'B' },
                CrackedHint { hint: 2, excluded: 'E' },
            ]
        );
    }

    #[test]
    fn two_hints_leaving_out_the_same_character() {
        let alphabet = "ABCD";
        let a = Digest::of("DCA");
        let b = Digest::of("ACD");
        let mut solver = HintSolver::new(&chars(alphabet), [(0, a), (1, b)]);

        let first = solver.solve().unwrap();
        let second = solver.solve().unwrap();
        assert_eq!(first.excluded, 'B');
        assert_eq!(second.excluded, 'B');
        assert_ne!(first.hint, second.hint);
    }

    #[test]
    fn identical_hints_are_all_cracked() {
        let alphabet = chars("ABCD");
        let digest = Digest::of("ACD");
        let mut solver = HintSolver::new(&alphabet, [(0, digest), (1, digest), (2, digest)]);

        let mut found = Vec::new();
        while let Some(hit) = solver.solve() {
            assert_eq!(solver.remaining(), 2 - found.len());
            found.push(hit);
        }
        assert_eq!(
            found,
            vec![
                CrackedHint { hint: 0, excluded: 'B' },
                CrackedHint { hint: 1, excluded: 'B' },
                CrackedHint { hint: 2, excluded: 'B' },
            ]
        );
    }

    #[test]
    fn unsolvable_hint_is_exhausted() {
        let mut solver = HintSolver::new(&chars("ABCD"), [(0, Digest::of("nope"))]);
        assert_eq!(solver.solve(), None);
        assert_eq!(solver.excluded_index(), 4);
        assert_eq!(solver.resume(Duration::MAX), SearchStep::Exhausted);
    }

    #[test]
    fn single_character_alphabet_hint_is_the_empty_string() {
        let mut solver = HintSolver::new(&['Q'], [(0, Digest::of(""))]);
        assert_eq!(solver.solve(), Some(CrackedHint { hint: 0, excluded: 'Q' }));
    }
}
