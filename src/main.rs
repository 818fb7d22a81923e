//! content-registry command-line entry point.

use anyhow::Result;

fn main() -> Result<()> {
    content_registry::cli::run()
}
