//! Extensions bundled with the demo binary.
//!
//! Both are contributed through `BUILTIN_EXTENSIONS`, so `main` never names
//! them; the host discovers them at startup.

mod banding;
mod header_lock;

pub use banding::TableBanding;
pub use header_lock::HeaderLock;
