//! # Chunk Pipeline Demo
//!
//! Entry point of the demo binary. It calls into the library's `run()`, which
//! streams chunks around a moving viewer and prints the final statistics.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- --frames 600 --headless-host
//! ```

fn main() -> anyhow::Result<()> {
    chunk_pipeline::run()
}
