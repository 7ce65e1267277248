#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]

//! Binary entrypoint for the seedline terminal client.

use std::process;

/// Runs the client and exits with its status.
#[tokio::main]
async fn main() {
    let exit_code = seedline_app::run().await;
    if exit_code != 0 {
        process::exit(exit_code);
    }
}
