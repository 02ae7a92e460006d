//! IMG.LY Background Compositing CLI Tool
//!
//! Command-line front end for the imgly-bgcompose preview pipeline: background
//! removal through a server, filters, gallery backgrounds and PNG export.

#[cfg(feature = "cli")]
use imgly_bgcompose::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
