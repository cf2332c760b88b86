//! Password solver
//!
//! Enumerates every string of a fixed length over an alphabet as a base-|A|
//! counter: most significant digit on the left, carry moving leftward, all
//! positions starting at the first alphabet character. The cursor is the
//! candidate buffer plus the per-position digit indices, so a search can stop
//! after any candidate and resume exactly there.

use crate::hash::Digest;
use crate::search::SearchStep;
use std::time::{Duration, Instant};

/// Resumable fixed-radix enumeration
#[derive(Debug, Clone)]
pub struct PasswordSolver {
    alphabet: Vec<char>,
    target: Digest,
    candidate: Vec<char>,
    digits: Vec<usize>,
    exhausted: bool,
    scratch: String,
}

impl PasswordSolver {
    /// Solver for passwords of `length` characters over `alphabet` hashing to `target`
    pub fn new(alphabet: &[char], length: usize, target: Digest) -> Self {
        let (candidate, exhausted) = match alphabet.first() {
            Some(first) => (vec![*first; length], false),
            // Nothing to enumerate unless the only candidate is the empty string.
            None => (Vec::new(), length > 0),
        };
        Self {
            alphabet: alphabet.to_vec(),
            target,
            digits: vec![0; candidate.len()],
            candidate,
            exhausted,
            scratch: String::with_capacity(length * 4),
        }
    }

    /// Candidate the next slice will test first
    pub fn candidate(&self) -> &[char] {
        &self.candidate
    }

    /// Per-position alphabet indices of the current candidate
    pub fn digits(&self) -> &[usize] {
        &self.digits
    }

    /// Whether the space has been fully scanned
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Step the counter to the next candidate; `false` when the carry runs off the left end
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let radix = self.alphabet.len();
        for place in (0..self.candidate.len()).rev() {
            self.digits[place] += 1;
            if self.digits[place] == radix {
                self.digits[place] = 0;
                self.candidate[place] = self.alphabet[0];
            } else {
                self.candidate[place] = self.alphabet[self.digits[place]];
                return true;
            }
        }
        self.exhausted = true;
        false
    }

    /// Scan for up to `budget` of wall-clock time; at least one candidate is tested per call
    pub fn resume(&mut self, budget: Duration) -> SearchStep<String> {
        if self.exhausted {
            return SearchStep::Exhausted;
        }
        let started = Instant::now();

        loop {
            if Digest::of_chars(&self.candidate, &mut self.scratch) == self.target {
                return SearchStep::Cracked(self.scratch.clone());
            }
            if !self.advance() {
                return SearchStep::Exhausted;
            }
            if started.elapsed() >= budget {
                return SearchStep::Yielded;
            }
        }
    }

    /// Run to completion, ignoring time slices
    pub fn solve(&mut self) -> Option<String> {
        loop {
            match self.resume(Duration::MAX) {
                SearchStep::Cracked(password) => return Some(password),
                SearchStep::Exhausted => return None,
                SearchStep::Yielded => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enumerate(alphabet: &str, length: usize) -> Vec<String> {
        let alphabet: Vec<char> = alphabet.chars().collect();
        let mut solver = PasswordSolver::new(&alphabet, length, Digest::of("unreachable"));
        let mut seen = vec![solver.candidate().iter().collect::<String>()];
        while solver.advance() {
            seen.push(solver.candidate().iter().collect());
        }
        seen
    }

    #[test]
    fn counts_in_fixed_radix_order() {
        assert_eq!(
            enumerate("ab", 3),
            ["aaa", "aab", "aba", "abb", "baa", "bab", "bba", "bbb"]
        );
        assert_eq!(enumerate("xyz", 1), ["x", "y", "z"]);
    }

    #[test]
    fn zero_length_has_exactly_one_candidate() {
        assert_eq!(enumerate("abc", 0), [""]);

        let mut solver = PasswordSolver::new(&['a'], 0, Digest::of(""));
        assert_eq!(solver.solve().as_deref(), Some(""));
    }

    #[test]
    fn empty_alphabet_is_immediately_exhausted() {
        let mut solver = PasswordSolver::new(&[], 2, Digest::of(""));
        assert!(solver.is_exhausted());
        assert_eq!(solver.resume(Duration::MAX), SearchStep::Exhausted);
    }

    #[test]
    fn cracks_the_reference_password() {
        let mut solver = PasswordSolver::new(&['F', 'G'], 10, Digest::of("GGGFGFFFFG"));
        assert_eq!(solver.solve().as_deref(), Some("GGGFGFFFFG"));
    }

    #[test]
    fn zero_budget_tests_one_candidate_per_slice() {
        let target = Digest::of("ba");
        let mut solver = PasswordSolver::new(&['a', 'b'], 2, target);

        assert_eq!(solver.resume(Duration::ZERO), SearchStep::Yielded);
        assert_eq!(solver.candidate(), &['a', 'b']);
        assert_eq!(solver.digits(), &[0, 1]);
        assert_eq!(solver.resume(Duration::ZERO), SearchStep::Yielded);
        assert_eq!(solver.resume(Duration::ZERO), SearchStep::Cracked("ba".to_string()));
    }

    #[test]
    fn missing_password_is_exhausted_after_full_scan() {
        let mut solver = PasswordSolver::new(&['a', 'b', 'c'], 3, Digest::of("abcd"));
        assert_eq!(solver.solve(), None);
        assert!(solver.is_exhausted());
        assert!(!solver.advance());
    }
}
