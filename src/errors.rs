use thiserror::Error;

/// Host-protocol violations.
///
/// Malformed markup is never an error: the tokenizer always recovers and
/// always produces a token sequence. The only fallible operations are the
/// callbacks the host driver can invoke out of order.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenizerError {
    /// `on_external_script_loaded` was called while no fetch was pending.
    /// The loader must invoke the completion callback exactly once per
    /// [`ScriptFetchRequest`](crate::ScriptFetchRequest).
    #[error("no external script fetch is pending")]
    NoPendingFetch,
}
