//! The statement sink: the kernel's only boundary with the outside world.
//!
//! Compilers emit ordered statement batches; a [`Sink`] applies them. The
//! kernel delivers statements sequentially, checks a cancellation token
//! between them, and maps sink failures to [`Error::Sink`] with the failing
//! statement index. Retry policy belongs to the sink's driver, never here.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Error;
use crate::schema::StatementBatch;

/// A failure reported by the sink for one statement.
#[derive(Debug, Clone)]
pub struct SinkFailure(pub String);

impl fmt::Display for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An executor of SQL statements (a database connection, a script file, an
/// in-memory recorder). Owned exclusively by the compiler using it for the
/// duration of an invocation.
pub trait Sink {
    /// Execute one statement.
    fn execute(&mut self, statement: &str) -> Result<(), SinkFailure>;

    /// Unitless cost estimate for a statement, when the engine offers one.
    fn estimate_cost(&mut self, _statement: &str) -> Result<f64, SinkFailure> {
        Err(SinkFailure("cost estimation not supported".into()))
    }
}

/// Cooperative cancellation flag checked between statements.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation at the next statement boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Deliver a batch to the sink in order, checking the token between
/// statements.
pub fn run_batch(
    sink: &mut dyn Sink,
    batch: &StatementBatch,
    token: &CancelToken,
) -> Result<(), Error> {
    for (index, statement) in batch.statements.iter().enumerate() {
        if token.is_cancelled() {
            tracing::warn!(index, "batch cancelled before statement");
            return Err(Error::Cancelled);
        }
        tracing::debug!(index, "executing statement");
        sink.execute(statement).map_err(|failure| Error::Sink {
            index,
            message: failure.0,
        })?;
    }
    Ok(())
}

/// A sink that records statements instead of executing them. Used for dry
/// runs and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Statements received, in order.
    pub statements: Vec<String>,
}

impl RecordingSink {
    /// A fresh, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for RecordingSink {
    fn execute(&mut self, statement: &str) -> Result<(), SinkFailure> {
        self.statements.push(statement.to_string());
        Ok(())
    }
}
