//! Outpaint preparation CLI
//!
//! Acquires an image from a file or URL and writes the expanded canvas and
//! mask used for outpainting requests.

use outpaint_prep::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}
