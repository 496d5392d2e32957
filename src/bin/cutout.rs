//! Background removal CLI binary
//!
//! Thin wrapper around the library's CLI module.

#[cfg(feature = "cli")]
use cutout::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
