//! Command line entry point of the hatload load generator.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    hatload::cli::execute()
}
