use std::io;
use std::thread::{Scope, ScopedJoinHandle};

/// Identifier of a worker inside a single partitioner invocation, `0..workers`.
pub type WorkerId = usize;

/// Call a function if this struct goes out of scope without calling `defuse`, including during a
/// panic stack-unwinding.
pub(crate) struct CatchPanic<F: FnOnce()> {
    /// True if the function should be called.
    primed: bool,
    /// Function to call.
    ///
    /// The `Drop` implementation will move out the function.
    handler: Option<F>,
}

impl<F: FnOnce()> CatchPanic<F> {
    pub(crate) fn new(handler: F) -> Self {
        Self {
            primed: true,
            handler: Some(handler),
        }
    }

    /// Avoid calling the function on drop.
    pub(crate) fn defuse(&mut self) {
        self.primed = false;
    }
}

impl<F: FnOnce()> Drop for CatchPanic<F> {
    fn drop(&mut self) {
        if self.primed {
            if let Some(handler) = self.handler.take() {
                handler();
            }
        }
    }
}

/// Run a function exactly once when dropped, whether the owner returned or unwound.
///
/// The pipeline workers use this to emit their "done" signal: the closer counts one signal per
/// worker, so a worker that panics must still be accounted for.
pub(crate) struct OnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> OnDrop<F> {
    pub(crate) fn new(f: F) -> Self {
        Self(Some(f))
    }
}

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

/// Spawn a named thread inside `scope` running `body`.
///
/// Every worker logs when it starts and completes; if `body` unwinds an error is logged and the
/// panic surfaces from the join handle.
pub(crate) fn spawn_worker<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    name: String,
    body: F,
) -> io::Result<ScopedJoinHandle<'scope, T>>
where
    T: Send + 'scope,
    F: FnOnce() -> T + Send + 'scope,
{
    std::thread::Builder::new()
        .name(name)
        .spawn_scoped(scope, move || {
            let name = current_name();
            debug!("starting {}", name);
            let mut catch_panic = CatchPanic::new(|| {
                error!("{} crashed!", current_name());
            });
            let result = body();
            catch_panic.defuse();
            debug!("{} completed", name);
            result
        })
}

fn current_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or("unnamed")
        .to_string()
}
