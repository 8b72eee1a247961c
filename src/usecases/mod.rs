//! Use-case layer: one module per pipeline, each a thin orchestration of
//! the domain functions and `db` repositories over one stage's inputs and
//! outputs. The CLI binary is the only caller.

pub mod ingest;
pub mod process;
pub mod snapshot;
