use ahash::AHashSet;
use hashcrack::dispatch::{Directive, Dispatcher};
use hashcrack::hint::{CrackedHint, HintSolver};
use hashcrack::password::PasswordSolver;
use hashcrack::transfer::MessageTransfer;
use hashcrack::{sha256_hex, Digest, Record};
use proptest::prelude::*;
use proptest::sample::subsequence;

const LETTERS: &[char] = &['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I'];

/// Alphabets of `min..=max` distinct letters, in shuffled order
fn alphabet(min: usize, max: usize) -> impl Strategy<Value = Vec<char>> {
    subsequence(LETTERS.to_vec(), min..=max).prop_shuffle()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn enumeration_visits_every_string_once_in_counter_order(
        alphabet in alphabet(1, 4),
        length in 0usize..5,
    ) {
        let mut solver = PasswordSolver::new(&alphabet, length, Digest::of("\u{0}"));
        let mut seen: Vec<Vec<usize>> = vec![solver.digits().to_vec()];
        while solver.advance() {
            seen.push(solver.digits().to_vec());
        }

        let expected = alphabet.len().pow(length as u32);
        prop_assert_eq!(seen.len(), expected);
        prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
        let distinct: AHashSet<&Vec<usize>> = seen.iter().collect();
        prop_assert_eq!(distinct.len(), expected);
        prop_assert!(solver.is_exhausted());
    }

    #[test]
    fn password_solver_finds_any_string_in_the_space(
        alphabet in alphabet(1, 4),
        picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..5),
    ) {
        let password: String = picks.iter().map(|i| alphabet[i.index(alphabet.len())]).collect();
        let mut solver = PasswordSolver::new(&alphabet, picks.len(), Digest::of(&password));
        prop_assert_eq!(solver.solve(), Some(password));
    }

    #[test]
    fn hint_solver_names_the_missing_character(
        alphabet in alphabet(2, 6),
        missing in any::<prop::sample::Index>(),
        shift in 0usize..8,
    ) {
        let missing = alphabet[missing.index(alphabet.len())];
        let mut rest: Vec<char> = alphabet.iter().copied().filter(|c| *c != missing).collect();
        let shift = shift % rest.len().max(1);
        rest.rotate_left(shift);
        let hint: String = rest.into_iter().collect();

        let mut solver = HintSolver::new(&alphabet, [(0, Digest::of(&hint))]);
        prop_assert_eq!(solver.solve(), Some(CrackedHint { hint: 0, excluded: missing }));
    }

    #[test]
    fn transfer_reassembles_any_payload(
        bytes in proptest::collection::vec(any::<u8>(), 0..600),
        chunk_size in 1usize..80,
    ) {
        let mut tx = MessageTransfer::new(1, chunk_size);
        let mut rx = MessageTransfer::new(2, chunk_size);

        let mut wire = Some(tx.send_bytes(&bytes, 1, 2));
        let mut delivered = None;
        let mut chunks = 0;
        while let Some(chunk) = wire.take() {
            chunks += 1;
            let (ack, delivery) = rx.on_chunk(chunk).unwrap();
            if delivery.is_some() {
                prop_assert!(delivered.is_none());
                delivered = delivery;
            }
            wire = tx.on_ack(&ack);
        }

        prop_assert_eq!(chunks, bytes.len().div_ceil(chunk_size).max(1));
        prop_assert_eq!(delivered.map(|d| d.bytes), Some(bytes));
        prop_assert_eq!(tx.outgoing_len(), 0);
        prop_assert_eq!(rx.incoming_len(), 0);
    }
}

/// Events a scheduler can observe, replayed against the dispatcher
#[derive(Debug, Clone)]
enum Event {
    Register,
    Complete(usize),
    Lose(usize),
    Deliver(usize),
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        2 => Just(Event::Register),
        4 => any::<usize>().prop_map(Event::Complete),
        1 => any::<usize>().prop_map(Event::Lose),
        2 => (0usize..5).prop_map(Event::Deliver),
    ]
}

fn row(line_id: u32) -> Record {
    vec![
        line_id.to_string(),
        String::new(),
        "AB".into(),
        "1".into(),
        sha256_hex("A"),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn dispatch_never_double_assigns_and_finishes_exactly_when_done(
        events in proptest::collection::vec(event(), 1..80),
        total_lines in 0u32..20,
    ) {
        let mut d = Dispatcher::new(3);
        let mut pending_lines = (1..=total_lines).collect::<std::collections::VecDeque<_>>();
        let mut next_worker = 100u64;
        let mut workers: Vec<u64> = Vec::new();
        let mut holding: ahash::AHashMap<u64, u32> = ahash::AHashMap::new();
        let mut completed: Vec<u32> = Vec::new();
        let mut read_requested = false;
        let mut finishes = 0;

        let apply = |out: Vec<Directive>,
                         holding: &mut ahash::AHashMap<u64, u32>,
                         read_requested: &mut bool,
                         finishes: &mut usize|
         -> Result<(), TestCaseError> {
            for directive in out {
                match directive {
                    Directive::Assign { worker, task } => {
                        prop_assert!(holding.insert(worker, task.line_id).is_none(), "worker double-booked");
                        prop_assert!(
                            holding.values().filter(|l| **l == task.line_id).count() == 1,
                            "line assigned twice"
                        );
                    }
                    Directive::RequestBatch => {
                        prop_assert!(!*read_requested, "two reads outstanding");
                        *read_requested = true;
                    }
                    Directive::Finish { .. } => {
                        prop_assert!(holding.is_empty(), "finished with a task outstanding");
                        *finishes += 1;
                    }
                }
            }
            Ok(())
        };

        apply(d.start(), &mut holding, &mut read_requested, &mut finishes)?;

        let settle = std::iter::repeat([Event::Deliver(5), Event::Complete(0)]).flatten().take(80);
        let drive = events.into_iter().chain(settle);
        for event in drive {
            let out = match event {
                Event::Register => {
                    next_worker += 1;
                    workers.push(next_worker);
                    d.register_worker(next_worker)
                }
                Event::Complete(pick) => {
                    let busy: Vec<u64> = holding.keys().copied().collect();
                    if busy.is_empty() {
                        continue;
                    }
                    let worker = busy[pick % busy.len()];
                    let line = holding.remove(&worker).unwrap_or_default();
                    completed.push(line);
                    d.report_result(worker, line).unwrap()
                }
                Event::Lose(pick) => {
                    if workers.is_empty() {
                        continue;
                    }
                    let worker = workers.swap_remove(pick % workers.len());
                    holding.remove(&worker);
                    d.worker_lost(worker)
                }
                Event::Deliver(n) => {
                    if !read_requested {
                        continue;
                    }
                    read_requested = false;
                    // Only a truly empty source may answer with an empty batch.
                    let take = n.max(1).min(pending_lines.len());
                    let batch = pending_lines.drain(..take).map(row).collect();
                    d.submit_lines(batch)
                }
            };
            apply(out, &mut holding, &mut read_requested, &mut finishes)?;
        }

        // Finish appears at most once, and only when every line completed.
        prop_assert!(finishes <= 1);
        if finishes == 1 {
            let mut done = completed.clone();
            done.sort_unstable();
            done.dedup();
            prop_assert_eq!(done.len(), completed.len(), "a line completed twice");
            prop_assert_eq!(done, (1..=total_lines).collect::<Vec<_>>());
        }
        prop_assert_eq!(d.is_finished(), finishes == 1);
    }
}

/// Hint vectors over the eleven-character alphabet; each needs millions of hashes.
#[test]
#[ignore = "long-running"]
fn solves_reference_hints() {
    let alphabet: Vec<char> = "ABCDEFGHIJK".chars().collect();
    let cases = [
        ("52be0093f91b90872aa54533b8ee9b38f794999bae9371834eca23ce51139b99", 'C'),
        ("1582824a01c4b842e207a51e3cfc47212885e58eb147e33ea29ba212e611904d", 'A'),
    ];
    for (hex, missing) in cases {
        let digest: Digest = hex.parse().unwrap();
        let mut solver = HintSolver::new(&alphabet, [(0, digest)]);
        assert_eq!(solver.solve().map(|h| h.excluded), Some(missing));
    }
}
