//! Link-health checking for saved leads.
//!
//! A probe is a single HEAD request bounded by a timeout. Failures of any
//! kind (DNS, connect, timeout, 4xx/5xx) collapse to "unreachable"; there are
//! no retries. Batches fan out with `buffer_unordered` and finish only when
//! every probe has settled.

mod checker;

pub use checker::{
    LinkChecker, ProbeResult, DEFAULT_PROBE_CONCURRENCY, DEFAULT_PROBE_TIMEOUT,
};
