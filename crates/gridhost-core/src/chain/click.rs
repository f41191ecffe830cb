//! Cell-click interceptors: an async **short-circuit** chain.
//!
//! [`ClickChain::dispatch`] awaits each interceptor in ascending priority.
//! The first one that resolves to `true` claims the click; nothing after it
//! runs and the renderer skips its default selection behavior. Interceptors
//! that fail are logged and count as "not claimed".
//!
//! Because lower-priority interceptors are only reached when everything before
//! them declined, an interceptor should only perform visible side effects once
//! it has decided to return `true`.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{Chain, delegate_chain};
use crate::error::HandlerResult;
use crate::foundation::{Cleanup, call_isolated_async};

/// Mouse button that produced a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Keyboard modifiers held during a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer details accompanying a cell click.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Canvas x coordinate of the pointer.
    pub x: f64,
    /// Canvas y coordinate of the pointer.
    pub y: f64,
    #[serde(default)]
    pub button: MouseButton,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// 1 for a single click, 2 for a double click.
    #[serde(default = "default_click_count")]
    pub click_count: u8,
}

fn default_click_count() -> u8 {
    1
}

impl ClickEvent {
    /// A plain single primary-button click at `(x, y)`.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            button: MouseButton::Primary,
            modifiers: Modifiers::default(),
            click_count: 1,
        }
    }

    pub fn is_double_click(&self) -> bool {
        self.click_count >= 2
    }
}

/// Signature of a click interceptor.
pub type ClickInterceptorFn =
    dyn Fn(u32, u32, ClickEvent) -> BoxFuture<'static, HandlerResult<bool>> + Send + Sync;

/// Outcome of running the click chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickDispatch {
    /// Id of the interceptor that claimed the click.
    pub claimed_by: Option<String>,
    /// Number of interceptors invoked.
    pub consulted: usize,
}

impl ClickDispatch {
    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }
}

/// Registry of click interceptors.
#[derive(Clone, Debug)]
pub struct ClickChain {
    chain: Chain<ClickInterceptorFn>,
}

impl Default for ClickChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ClickChain {
    pub fn new() -> Self {
        Self {
            chain: Chain::new("click interceptor"),
        }
    }

    /// Wraps an async closure into a [`ClickInterceptorFn`].
    pub fn interceptor<F, Fut>(f: F) -> Arc<ClickInterceptorFn>
    where
        F: Fn(u32, u32, ClickEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<bool>> + Send + 'static,
    {
        Arc::new(move |row, col, event| Box::pin(f(row, col, event)))
    }

    /// Registers a click interceptor under `id`.
    pub fn register<F, Fut>(&self, id: impl Into<String>, priority: i32, f: F) -> Cleanup
    where
        F: Fn(u32, u32, ClickEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<bool>> + Send + 'static,
    {
        self.chain.register(None, id, priority, Self::interceptor(f))
    }

    /// Registers an interceptor on behalf of the extension `owner`.
    pub fn register_owned(
        &self,
        owner: &str,
        id: impl Into<String>,
        priority: i32,
        interceptor: Arc<ClickInterceptorFn>,
    ) -> Cleanup {
        self.chain.register(Some(owner), id, priority, interceptor)
    }

    /// Offers a click on `(row, col)` to each interceptor until one claims it.
    pub async fn dispatch(&self, row: u32, col: u32, event: ClickEvent) -> ClickDispatch {
        let entries = self.chain.snapshot();
        let mut outcome = ClickDispatch::default();

        for entry in entries.iter() {
            outcome.consulted += 1;
            match call_isolated_async(async { (entry.handler)(row, col, event).await }).await {
                Ok(true) => {
                    debug!(interceptor = %entry.id, row, col, "Click claimed");
                    outcome.claimed_by = Some(entry.id.clone());
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(
                        interceptor = %entry.id,
                        row,
                        col,
                        error = %e,
                        "Click interceptor failed, treating as not claimed"
                    );
                }
            }
        }
        outcome
    }
}

delegate_chain!(ClickChain);
