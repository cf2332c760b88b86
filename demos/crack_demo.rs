//! Crack a handful of generated passwords on an in-process cluster.
//!
//! Run with `cargo run --release --example crack_demo`. Pass a path to a
//! `;`-separated input file to crack that instead, and `--verbose` to see
//! per-slice and chunk traffic.

use hashcrack::prelude::*;
use hashcrack::{parse_records, sha256_hex};
use std::fs::File;
use std::io::BufReader;
use std::time::{Duration, Instant};

const ALPHABET: &str = "ABCDEFGHI";

/// Build an input row the way the generator of the original exercise does:
/// one hint per alphabet character the password leaves out.
fn generated_row(line_id: u32, password: &str) -> Record {
    let mut row = vec![
        line_id.to_string(),
        format!("user{}", line_id),
        ALPHABET.to_string(),
        password.len().to_string(),
        sha256_hex(password),
    ];
    for missing in ALPHABET.chars().filter(|c| !password.contains(*c)) {
        let hint: String = ALPHABET.chars().filter(|c| *c != missing).rev().collect();
        row.push(sha256_hex(&hint));
    }
    row
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    tracing_subscriber::fmt()
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_thread_names(true)
        .init();

    let records = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => {
            let file = File::open(&path)?;
            parse_records(BufReader::new(file))?
        }
        None => ["BIBIBIBI", "HEADACHE", "DIGDIGDI", "ABBAABBA", "FIFEHFIF", "CCCCCCCC"]
            .iter()
            .zip(1..)
            .map(|(password, id)| generated_row(id, password))
            .collect(),
    };

    let workers = num_cpus::get().max(2);
    println!("=== hashcrack demo: {} lines, {} workers ===", records.len(), workers);

    let config = ClusterConfig::new()
        .with_num_workers(workers)
        .with_worker_config(CrackerConfig::new().with_time_slice(Duration::from_millis(250)));

    let started = Instant::now();
    let cluster = Cluster::launch(config, records)?;
    let results = cluster.wait(Duration::from_secs(3600))?;

    println!("\n=== Results ({:?}) ===", started.elapsed());
    for solution in &results {
        println!("line {:>4}: {}", solution.line_id, solution.password);
    }
    Ok(())
}
