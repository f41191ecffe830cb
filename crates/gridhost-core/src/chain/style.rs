//! Style interceptors: a synchronous **compose** chain.
//!
//! The renderer calls [`StyleChain::resolve`] once per visible cell per paint.
//! Resolution starts from the base style and merges every non-`None` override
//! on top, walking the chain in ascending priority. Later merges win field
//! conflicts, which means:
//!
//! - the interceptor with the numerically **larger** priority wins a field;
//! - at equal priority, the interceptor registered **later** wins.
//!
//! Every interceptor sees the original base style, never the partially merged
//! result, so no interceptor can observe another one's output.
//!
//! Interceptors run inside the paint loop and must be fast and synchronous.
//! Anything that needs I/O must read from a cache the extension maintains
//! out-of-band.

use std::sync::Arc;

use tracing::error;

use super::{Chain, delegate_chain};
use crate::error::HandlerResult;
use crate::foundation::{CellCoords, CellStyle, CellValue, Cleanup, call_isolated};

/// Signature of a style interceptor.
pub type StyleInterceptorFn =
    dyn Fn(&CellValue, &CellStyle, CellCoords) -> HandlerResult<Option<CellStyle>> + Send + Sync;

/// Registry of style interceptors.
#[derive(Clone, Debug)]
pub struct StyleChain {
    chain: Chain<StyleInterceptorFn>,
}

impl Default for StyleChain {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleChain {
    pub fn new() -> Self {
        Self {
            chain: Chain::new("style interceptor"),
        }
    }

    /// Registers a style interceptor under `id`.
    pub fn register<F>(&self, id: impl Into<String>, priority: i32, interceptor: F) -> Cleanup
    where
        F: Fn(&CellValue, &CellStyle, CellCoords) -> HandlerResult<Option<CellStyle>>
            + Send
            + Sync
            + 'static,
    {
        self.chain.register(None, id, priority, Arc::new(interceptor))
    }

    /// Registers an interceptor on behalf of the extension `owner`.
    pub fn register_owned(
        &self,
        owner: &str,
        id: impl Into<String>,
        priority: i32,
        interceptor: Arc<StyleInterceptorFn>,
    ) -> Cleanup {
        self.chain.register(Some(owner), id, priority, interceptor)
    }

    /// Computes the final style of one cell.
    ///
    /// A failing or panicking interceptor contributes no override.
    pub fn resolve(&self, value: &CellValue, base: &CellStyle, coords: CellCoords) -> CellStyle {
        let entries = self.chain.snapshot();
        let mut style = base.clone();
        for entry in entries.iter() {
            match call_isolated(|| (entry.handler)(value, base, coords)) {
                Ok(Some(over)) => style.merge(&over),
                Ok(None) => {}
                Err(e) => {
                    error!(
                        interceptor = %entry.id,
                        cell = %coords,
                        error = %e,
                        "Style interceptor failed, ignoring its override"
                    );
                }
            }
        }
        style
    }
}

delegate_chain!(StyleChain);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Color;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);
    const GREY: Color = Color::rgb(240, 240, 240);

    fn at(row: u32, col: u32) -> CellCoords {
        CellCoords::new(row, col)
    }

    #[test]
    fn test_no_interceptors_returns_base() {
        let chain = StyleChain::new();
        let base = CellStyle::new().background(Color::WHITE);
        assert_eq!(chain.resolve(&CellValue::Empty, &base, at(0, 0)), base);
    }

    #[test]
    fn test_disjoint_overrides_union_regardless_of_order() {
        let base = CellStyle::new().background(Color::WHITE).font_size(11);

        let forward = StyleChain::new();
        forward.register("bold", 1, |_, _, _| Ok(Some(CellStyle::new().bold(true))));
        forward.register("red", 2, |_, _, _| Ok(Some(CellStyle::new().text(RED))));

        let reverse = StyleChain::new();
        reverse.register("red", 2, |_, _, _| Ok(Some(CellStyle::new().text(RED))));
        reverse.register("bold", 1, |_, _, _| Ok(Some(CellStyle::new().bold(true))));

        let expected = CellStyle::new()
            .background(Color::WHITE)
            .font_size(11)
            .bold(true)
            .text(RED);
        assert_eq!(forward.resolve(&CellValue::Empty, &base, at(1, 1)), expected);
        assert_eq!(reverse.resolve(&CellValue::Empty, &base, at(1, 1)), expected);
    }

    #[test]
    fn test_conflicting_field_higher_priority_wins() {
        let chain = StyleChain::new();
        // Conditional formatting registered first but at a higher priority.
        chain.register("conditional-format", 20, |value, _, _| {
            Ok((value.as_number().unwrap_or(0.0) < 0.0).then(|| CellStyle::new().background(RED)))
        });
        chain.register("table-banding", 10, |_, _, coords| {
            Ok((coords.row % 2 == 1).then(|| CellStyle::new().background(GREY).bold(false)))
        });

        let base = CellStyle::new();
        let negative = chain.resolve(&CellValue::Number(-3.0), &base, at(1, 0));
        assert_eq!(negative.background_color, Some(RED));
        assert_eq!(negative.bold, Some(false));

        let positive = chain.resolve(&CellValue::Number(3.0), &base, at(1, 0));
        assert_eq!(positive.background_color, Some(GREY));
    }

    #[test]
    fn test_equal_priority_later_registration_wins() {
        let chain = StyleChain::new();
        chain.register("first", 5, |_, _, _| Ok(Some(CellStyle::new().background(RED))));
        chain.register("second", 5, |_, _, _| Ok(Some(CellStyle::new().background(BLUE))));

        let style = chain.resolve(&CellValue::Empty, &CellStyle::new(), at(0, 0));
        assert_eq!(style.background_color, Some(BLUE));
    }

    #[test]
    fn test_interceptors_see_original_base() {
        let chain = StyleChain::new();
        chain.register("paint", 1, |_, _, _| Ok(Some(CellStyle::new().bold(true))));
        chain.register("observer", 2, |_, base, _| {
            assert_eq!(base.bold, None);
            Ok(None)
        });
        let style = chain.resolve(&CellValue::Empty, &CellStyle::new(), at(0, 0));
        assert_eq!(style.bold, Some(true));
    }

    #[test]
    fn test_failing_interceptor_means_no_override() {
        let chain = StyleChain::new();
        chain.register("broken", 1, |_, _, _| Err("cache miss".into()));
        chain.register("panics", 2, |_, _, _| panic!("style blew up"));
        chain.register("italic", 3, |_, _, _| Ok(Some(CellStyle::new().italic(true))));

        let style = chain.resolve(&CellValue::Empty, &CellStyle::new(), at(0, 0));
        assert_eq!(style, CellStyle::new().italic(true));
    }

    #[test]
    fn test_cleanup_removes_interceptor() {
        let chain = StyleChain::new();
        let cleanup = chain.register("bold", 1, |_, _, _| Ok(Some(CellStyle::new().bold(true))));
        cleanup.run().unwrap();
        assert!(chain.is_empty());
        assert!(chain.resolve(&CellValue::Empty, &CellStyle::new(), at(0, 0)).is_empty());
    }
}
