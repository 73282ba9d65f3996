use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

thread_local! {
    static LOG_CONTEXT: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Scope guard that pushes a logging context for the current thread.
///
/// Contexts nest: an inner `LogContext` renders as `[Outer][Inner]` until it is dropped.
///
/// ```rust
/// use stowage::primitives::logger::{get_context, LogContext};
///
/// let _service = LogContext::new("MigrationService");
/// {
///     let _scan = LogContext::new("Scanner");
///     assert_eq!(get_context().as_deref(), Some("[MigrationService][Scanner]"));
/// }
/// assert_eq!(get_context().as_deref(), Some("[MigrationService]"));
/// ```
#[must_use = "the context is cleared as soon as the guard is dropped"]
pub struct LogContext {
    depth: usize,
}

impl LogContext {
    /// Pushes `module` onto the current thread's context stack.
    pub fn new(module: &str) -> Self {
        let depth = LOG_CONTEXT.with(|ctx| {
            let mut ctx = ctx.borrow_mut();
            ctx.push(format!("[{module}]"));
            ctx.len() - 1
        });
        Self { depth }
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        LOG_CONTEXT.with(|ctx| ctx.borrow_mut().truncate(self.depth));
    }
}

/// Returns the rendered context stack, or `None` outside any scope.
#[must_use]
pub fn get_context() -> Option<String> {
    LOG_CONTEXT.with(|ctx| {
        let ctx = ctx.borrow();
        if ctx.is_empty() {
            None
        } else {
            Some(ctx.concat())
        }
    })
}

/// Future that enters a named logging context for the duration of each poll.
///
/// A [`LogContext`] guard must not be held across `.await`: the task may resume on
/// another worker thread and pop that thread's stack. Wrap the future instead.
///
/// ```rust
/// use stowage::primitives::logger::{get_context, in_log_context};
///
/// # futures::executor::block_on(async {
/// let context = in_log_context("MigrationService", async { get_context() }).await;
/// assert_eq!(context.as_deref(), Some("[MigrationService]"));
/// assert!(get_context().is_none());
/// # });
/// ```
#[must_use = "futures do nothing unless polled"]
pub struct WithLogContext<F> {
    module: &'static str,
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for WithLogContext<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _ctx = LogContext::new(self.module);
        self.inner.as_mut().poll(cx)
    }
}

/// Wraps `future` so every poll runs inside the `module` logging context.
pub fn in_log_context<F, T>(module: &'static str, future: F) -> WithLogContext<F>
where
    F: Future<Output = T>,
{
    WithLogContext {
        module,
        inner: Box::pin(future),
    }
}

/// Runs a block inside a named logging context.
///
/// ```rust
/// use stowage::with_log_context;
///
/// with_log_context!("Validator" => {
///     stowage::debug!("validating batch");
/// });
/// ```
#[macro_export]
macro_rules! with_log_context {
    ($module:expr => $block:block) => {{
        let _ctx = $crate::primitives::logger::LogContext::new($module);
        $block
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clears_context_on_drop() {
        assert!(get_context().is_none());
        {
            let _ctx = LogContext::new("Scanner");
            assert_eq!(get_context().as_deref(), Some("[Scanner]"));
        }
        assert!(get_context().is_none());
    }

    #[test]
    fn wrapped_future_holds_context_only_while_polled() {
        let mut future = Box::pin(in_log_context("MigrationService", async {
            let before = get_context();
            let mut yielded = false;
            futures::future::poll_fn(|_| {
                if yielded {
                    Poll::Ready(())
                } else {
                    yielded = true;
                    Poll::Pending
                }
            })
            .await;
            (before, get_context())
        }));
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        assert!(future.as_mut().poll(&mut cx).is_pending());
        assert!(get_context().is_none());

        let Poll::Ready((before, after)) = future.as_mut().poll(&mut cx) else {
            panic!("future should complete on the second poll");
        };
        assert_eq!(before.as_deref(), Some("[MigrationService]"));
        assert_eq!(after.as_deref(), Some("[MigrationService]"));
        assert!(get_context().is_none());
    }

    #[test]
    fn nests_contexts() {
        let _outer = LogContext::new("MigrationService");
        let inner = LogContext::new("Validator");
        assert_eq!(
            get_context().as_deref(),
            Some("[MigrationService][Validator]")
        );
        drop(inner);
        assert_eq!(get_context().as_deref(), Some("[MigrationService]"));
    }
}
