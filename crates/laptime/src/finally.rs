/// Runs a closure exactly once when dropped.
///
/// This is the cleanup region of an instrumented body: it is bound at the top
/// of the protected block, so it fires on every way out of that block,
/// including early returns, `?` and unwinding panics. It never catches
/// anything.
#[must_use = "the cleanup runs when the guard is dropped"]
pub struct Finally<F: FnOnce()> {
    cleanup: Option<F>,
}

impl<F: FnOnce()> Finally<F> {
    pub fn new(cleanup: F) -> Self {
        Self {
            cleanup: Some(cleanup),
        }
    }
}

impl<F: FnOnce()> Drop for Finally<F> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn test_runs_on_scope_exit() {
        let runs = Cell::new(0);
        {
            let _guard = Finally::new(|| runs.set(runs.get() + 1));
            assert_eq!(runs.get(), 0);
        }
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_runs_on_early_return() {
        fn early(runs: &Cell<u32>, stop: bool) -> u32 {
            let _guard = Finally::new(|| runs.set(runs.get() + 1));
            if stop {
                return 1;
            }
            2
        }

        let runs = Cell::new(0);
        assert_eq!(early(&runs, true), 1);
        assert_eq!(early(&runs, false), 2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_runs_while_unwinding_and_keeps_the_panic() {
        let runs = Cell::new(0);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = Finally::new(|| runs.set(runs.get() + 1));
            panic!("original failure");
        }));

        assert_eq!(runs.get(), 1);
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"original failure"));
    }
}
