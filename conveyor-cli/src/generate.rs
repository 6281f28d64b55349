//! Synthetic test-data generation.

use anyhow::Context as _;
use chrono::{Duration, Utc};
use clap::{Args, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

const NAMES: &[&str] = &[
    "alice", "bob", "charlie", "diana", "erik", "fatima", "grace", "hiro",
];
const CITIES: &[&str] = &[
    "paris", "tokyo", "nairobi", "lima", "oslo", "sydney", "toronto",
];

/// Output format for generated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenerateFormat {
    /// One JSON document per line.
    Jsonl,
    /// Header-driven CSV with `id` and `content` columns.
    Csv,
}

/// Arguments for the `generate` subcommand.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Output file path.
    #[arg(long)]
    pub output: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value = "jsonl")]
    pub format: GenerateFormat,

    /// Number of records to generate.
    #[arg(long, default_value_t = 1000)]
    pub count: u64,

    /// Fraction of records that reuse an earlier id, exercising dedup.
    #[arg(long, default_value_t = 0.0)]
    pub duplicate_ratio: f64,

    /// RNG seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,
}

fn record_content(rng: &mut StdRng) -> serde_json::Value {
    let minutes_ago = rng.gen_range(0..60 * 24 * 30);
    let timestamp = Utc::now() - Duration::minutes(minutes_ago);
    json!({
        "name": NAMES[rng.gen_range(0..NAMES.len())],
        "age": rng.gen_range(18..90),
        "city": CITIES[rng.gen_range(0..CITIES.len())],
        "@timestamp": timestamp.to_rfc3339(),
    })
}

/// Writes `count` synthetic records to the output file.
pub fn run(args: &GenerateArgs) -> anyhow::Result<()> {
    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);

    let mut rng = args.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let ratio = args.duplicate_ratio.clamp(0.0, 1.0);

    if args.format == GenerateFormat::Csv {
        writeln!(writer, "id,content")?;
    }

    let mut fresh_ids: u64 = 0;
    for _ in 0..args.count {
        let id = if fresh_ids > 0 && rng.gen_bool(ratio) {
            format!("record_{:06}", rng.gen_range(0..fresh_ids))
        } else {
            fresh_ids += 1;
            format!("record_{:06}", fresh_ids - 1)
        };
        let content = record_content(&mut rng);

        match args.format {
            GenerateFormat::Jsonl => {
                let line = json!({"id": id, "content": content});
                writeln!(writer, "{line}")?;
            }
            GenerateFormat::Csv => {
                let cell = content.to_string().replace('"', "\"\"");
                writeln!(writer, "{id},\"{cell}\"")?;
            }
        }
    }
    writer.flush()?;

    info!(
        path = %args.output.display(),
        count = args.count,
        distinct_ids = fresh_ids,
        "test data generated"
    );
    println!(
        "wrote {} records ({} distinct ids) to {}",
        args.count,
        fresh_ids,
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(count: u64, ratio: f64, format: GenerateFormat) -> Vec<String> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out");
        let args = GenerateArgs {
            output: path.clone(),
            format,
            count,
            duplicate_ratio: ratio,
            seed: Some(7),
        };
        run(&args).unwrap();
        std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn jsonl_output_parses_and_counts() {
        let lines = generate(25, 0.0, GenerateFormat::Jsonl);
        assert_eq!(lines.len(), 25);
        for line in &lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("id").is_some());
            assert!(value["content"].get("@timestamp").is_some());
        }
    }

    #[test]
    fn csv_output_has_header_row() {
        let lines = generate(10, 0.0, GenerateFormat::Csv);
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "id,content");
    }

    #[test]
    fn duplicate_ratio_reuses_ids() {
        let lines = generate(200, 0.5, GenerateFormat::Jsonl);
        let mut ids: Vec<String> = lines
            .iter()
            .map(|line| {
                serde_json::from_str::<serde_json::Value>(line).unwrap()["id"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert!(ids.len() < total);
    }
}
