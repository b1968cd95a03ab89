//! livepad-runtime — the contract between the target process and the
//! snippet libraries it loads.
//!
//! Both sides link this crate: the embedded server resolves the entry point
//! and reads back the context, the generated snippet source calls into it.
//! The two must be built by the same compiler against the same runtime
//! version — the entry point uses the Rust ABI.

pub mod bitmap;
pub mod context;
pub mod reflect;

pub use bitmap::Bitmap;
pub use context::{DumpRequest, SnippetContext};
pub use reflect::{FieldError, FieldRead, MixedSeq, Reflect, ScalarValue, Shape};

/// Exported symbol name of a snippet library's entry point.
pub const ENTRY_SYMBOL: &str = "livepad_snippet_main";

/// Runtime crate version, reported to clients so they can compile snippets
/// against a matching runtime.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Signature of the conventional entry point.
///
/// `host` is the application's scriptable state (downcast to the concrete
/// type published by the host app); `ctx` is the side channel snippets dump
/// results and execution progress into.
pub type SnippetEntry = fn(host: &mut dyn std::any::Any, ctx: &mut SnippetContext);

/// Everything a generated snippet needs in scope.
pub mod prelude {
    pub use crate::bitmap::Bitmap;
    pub use crate::context::SnippetContext;
    pub use crate::reflect::{FieldError, FieldRead, MixedSeq, Reflect, ScalarValue, Shape};
    pub use crate::reflect_fields;
}
