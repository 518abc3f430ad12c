//! Looks up a key in a B+ tree file built by `bptree-build`.
use std::path::PathBuf;

use anyhow::{Context, Result};
use structopt::StructOpt;

use bptree::storage::file::FileStorage;
use bptree::{BpTree, Error};

#[derive(Debug, StructOpt)]
#[structopt(name = "bptree-lookup", about = "Look up a key in a B+ tree file")]
struct CommandLineArgs {
    /// Verbosity: repeat for more detail (-v, -vv).
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Verify the file's checksum before looking up.
    #[structopt(long)]
    verify: bool,

    #[structopt(parse(from_os_str))]
    tree_filename: PathBuf,

    key: u64,
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

    let storage = FileStorage::open(&opts.tree_filename, opts.verify)
        .with_context(|| format!("opening {}", opts.tree_filename.display()))?;

    match BpTree::lookup(&storage, opts.key) {
        Ok(payload) => {
            println!("{}", String::from_utf8_lossy(&payload));
            Ok(())
        }
        Err(Error::NotFound) => {
            println!("not found");
            std::process::exit(1);
        }
        Err(err) => Err(err).context("lookup failed"),
    }
}
