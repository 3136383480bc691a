//! Command-line configuration: `engine <mode> <threading> <memory>`.
//! Parsed with `clap`'s derive API, so an invalid or missing argument
//! prints `clap`'s own usage message and exits with its conventional
//! code 2.

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Bind TCP and serve real client connections.
    Live,
    /// Run the in-memory synthetic-order benchmark, then exit.
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Threading {
    /// Network workers enqueue onto the handoff queue; one matching thread
    /// drains it.
    Queue,
    /// Network workers call into the book directly, serialized by a mutex.
    Sync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Memory {
    /// Orders are allocated from the fixed-capacity lock-free pool.
    Mempool,
    /// Orders are heap-allocated individually.
    Os,
}

/// `engine <mode> <threading> <memory>`.
#[derive(Debug, Parser)]
#[command(name = "engine", about = "Single-symbol limit order matching engine")]
pub struct RunConfig {
    pub mode: Mode,
    pub threading: Threading,
    pub memory: Memory,
}

impl RunConfig {
    pub fn parse_args() -> Self {
        RunConfig::parse()
    }
}
