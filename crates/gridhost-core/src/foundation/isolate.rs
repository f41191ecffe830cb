//! Error boundaries around extension code.
//!
//! Every handler, listener and cleanup supplied by an extension is invoked
//! through one of these helpers. Both `Err` results and panics come back as a
//! [`BoxError`], leaving the caller to decide what "no opinion" means for its
//! own chain.

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::FutureExt;

use crate::error::{BoxError, CoreError, HandlerResult};

/// Invokes a synchronous handler, converting a panic into an error.
pub fn call_isolated<T, F>(f: F) -> HandlerResult<T>
where
    F: FnOnce() -> HandlerResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(panic_error(payload.as_ref())),
    }
}

/// Awaits an asynchronous handler, converting a panic into an error.
pub async fn call_isolated_async<T, Fut>(fut: Fut) -> HandlerResult<T>
where
    Fut: Future<Output = HandlerResult<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(panic_error(payload.as_ref())),
    }
}

fn panic_error(payload: &(dyn Any + Send)) -> BoxError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    Box::new(CoreError::Panicked(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_passes_through() {
        assert_eq!(call_isolated(|| Ok(7)).unwrap(), 7);
    }

    #[test]
    fn test_panic_becomes_error() {
        let result: HandlerResult<()> = call_isolated(|| panic!("bad cell"));
        assert!(result.unwrap_err().to_string().contains("bad cell"));
    }

    #[tokio::test]
    async fn test_async_panic_becomes_error() {
        let result: HandlerResult<bool> = call_isolated_async(async {
            let owned = String::from("async failure");
            if !owned.is_empty() {
                panic!("{owned}");
            }
            Ok(true)
        })
        .await;
        assert!(result.unwrap_err().to_string().contains("async failure"));
    }
}
