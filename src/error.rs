/// Errors returned by fallible tree operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The operation needs at least one element, but the tree is empty.
    #[error("the tree is empty")]
    Empty,
}
