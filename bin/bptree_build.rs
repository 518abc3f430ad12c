//! Builds a B+ tree file from a newline-delimited `key\tvalue` input file.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use structopt::StructOpt;

use bptree::storage::file::FileStorage;
use bptree::BpTree;

#[derive(Debug, StructOpt)]
#[structopt(name = "bptree-build", about = "Bulk-load a B+ tree from sorted key/value lines")]
struct CommandLineArgs {
    /// Verbosity: repeat for more detail (-v, -vv).
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Block size in bytes for the on-disk storage.
    #[structopt(long, default_value = "4096")]
    block_size: u64,

    /// Input file of `key\tvalue` lines, sorted ascending by key.
    #[structopt(parse(from_os_str))]
    input_filename: PathBuf,

    /// Output tree file, created or truncated.
    #[structopt(parse(from_os_str))]
    output_filename: PathBuf,
}

fn parse_line(line: &str) -> Result<(u64, Vec<u8>)> {
    let mut parts = line.splitn(2, '\t');
    let key = parts
        .next()
        .context("missing key column")?
        .parse::<u64>()
        .context("key is not a u64")?;
    let value = parts.next().context("missing value column")?;
    Ok((key, value.as_bytes().to_vec()))
}

fn main() -> Result<()> {
    let opts = CommandLineArgs::from_args();
    env_logger::Builder::new()
        .filter_level(match opts.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let input = BufReader::new(
        File::open(&opts.input_filename)
            .with_context(|| format!("opening {}", opts.input_filename.display()))?,
    );
    let mut entries = Vec::new();
    for line in input.lines() {
        entries.push(parse_line(&line?)?);
    }
    entries.sort_by_key(|(k, _)| *k);

    let mut storage = FileStorage::create(&opts.output_filename, opts.block_size)
        .with_context(|| format!("creating {}", opts.output_filename.display()))?;
    BpTree::construct(&mut storage, &entries).context("building tree")?;
    storage.finalize().context("finalizing checksum")?;

    println!(
        "built {} with {} entries, block size {}",
        opts.output_filename.display(),
        entries.len(),
        opts.block_size
    );
    Ok(())
}
