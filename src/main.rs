//! Spanstore CLI entry point.

use spanstore::cli::{self, Cli};
use spanstore::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Execute the command
    cli::execute(cli).await
}
