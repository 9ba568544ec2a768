//! cc-sandbox CLI entry point
//!
//! Parses arguments, runs the selected command and renders errors with
//! suggestions.

use anyhow::Result;
use cc_sandbox::cli;
use cc_sandbox::core::error::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
