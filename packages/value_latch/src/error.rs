use std::marker::PhantomData;

use thiserror::Error;

/// Indicates that a latch was already closed when a close-family operation was called.
///
/// This is an expected, recoverable condition, not a fault: the typical reaction is to
/// ignore it (some other party finished the work first) or to use it to detect exactly
/// that. The latch state is never modified by the call that reports it.
#[derive(Debug, Error)]
#[error("the latch is already closed")]
pub struct AlreadyClosed {
    _private: PhantomData<()>,
}

impl AlreadyClosed {
    pub(crate) fn new() -> Self {
        Self {
            _private: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(AlreadyClosed: Debug, Send, Sync);

    #[test]
    fn displays_human_readable_message() {
        let error = AlreadyClosed::new();
        assert_eq!(error.to_string(), "the latch is already closed");
    }
}
