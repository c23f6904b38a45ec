//! Structured coroutine fan-out
//!
//! Every unit runs in its own `may` coroutine. The caller blocks until all spawned
//! coroutines have been joined, so nothing outlives the call. Once a unit fails,
//! units that have not started yet are skipped; units already in flight finish.

use crate::error::{AdminError, Result};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Stack size of each unit's coroutine, in words
///
/// Units run regex matching, formatting, and store I/O, which outgrow the
/// runtime's default coroutine stack.
const UNIT_STACK_SIZE: usize = 0x4000;

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run `task` for every item concurrently and collect the results
///
/// Results come back in item order. On failure, the error of the first unit (in
/// item order) that ran and failed is returned, after every coroutine has been joined.
pub fn fan_out<T, R, F>(items: impl IntoIterator<Item = T>, task: F) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R> + Send + Sync + 'static,
{
    let task = Arc::new(task);
    let aborted = Arc::new(AtomicBool::new(false));

    let mut handles = Vec::new();
    let mut first_error = None;
    for item in items {
        let task = Arc::clone(&task);
        let aborted_flag = Arc::clone(&aborted);
        let spawned = may::go!(
            may::coroutine::Builder::new().stack_size(UNIT_STACK_SIZE),
            move || {
                if aborted_flag.load(Ordering::Acquire) {
                    return None;
                }
                let result = task(item);
                if result.is_err() {
                    aborted_flag.store(true, Ordering::Release);
                }
                Some(result)
            }
        );
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                // Join what is already running, start nothing else
                aborted.store(true, Ordering::Release);
                first_error = Some(AdminError::Io(e));
                break;
            }
        }
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.join() {
            Ok(Some(Ok(value))) => results.push(value),
            Ok(Some(Err(e))) => {
                first_error.get_or_insert(e);
            }
            // Skipped after an earlier failure
            Ok(None) => {}
            Err(payload) => {
                aborted.store(true, Ordering::Release);
                first_error.get_or_insert(AdminError::TaskPanicked(panic_message(payload)));
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(results),
    }
}
