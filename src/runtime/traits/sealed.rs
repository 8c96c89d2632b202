// ABOUTME: Sealed trait pattern for engine client traits.
// ABOUTME: Only this crate's clients may implement StreamOps and ExecOps.

/// Implemented by the crate's engine clients only.
///
/// Lets `StreamOps` and `ExecOps` gain methods without breaking downstream
/// implementations, since there are none.
pub trait Sealed {}
