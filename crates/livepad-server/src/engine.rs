//! Dynamic execution engine.
//!
//! Loads a compiled snippet library into the running process, invokes the
//! conventional entry point with the host's scriptable state, and always
//! returns a structured outcome — a fault in user code never reaches the
//! caller as anything but data.
//!
//! Per invocation: payload → staged library file → loaded → entry resolved
//! → invoked → either captured dumps or the offset of the last statement
//! that began executing plus the fault message.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use libloading::Library;

use livepad_core::dump::{ExecuteResponse, ResultPair};
use livepad_core::protocol::exception_message;
use livepad_runtime::{SnippetContext, SnippetEntry, ENTRY_SYMBOL};

use crate::dumper::dump_value;

#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error("failed to stage snippet library: {0}")]
    Stage(std::io::Error),
    #[error("not a loadable snippet library: {0}")]
    Load(libloading::Error),
    #[error("snippet library has no '{ENTRY_SYMBOL}' entry point: {0}")]
    MissingEntry(libloading::Error),
}

/// One engine per embedded server, driven from the executor thread only —
/// that thread's serial job loop is what guarantees the single-execution
/// contract.
pub struct Engine {
    work_dir: PathBuf,
    default_dump_depth: usize,
    max_sequence_items: usize,
}

impl Engine {
    pub fn new(work_dir: PathBuf, default_dump_depth: usize, max_sequence_items: usize) -> Self {
        Self {
            work_dir,
            default_dump_depth,
            max_sequence_items,
        }
    }

    /// Execute one snippet payload against the host state.
    ///
    /// Every invocation loads a fresh library, closed when the invocation
    /// ends. Anything the snippet leaked into the process (threads, statics)
    /// survives until process exit — running each snippet in a disposable
    /// process would bound that growth, and is a known open improvement.
    pub fn execute(&self, payload: &[u8], host: &mut dyn Any) -> ExecuteResponse {
        let (library, _staged) = match self.load(payload) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(error = %e, "snippet load failed");
                // Execution never began, so there is no offset to report.
                return ExecuteResponse::error(e.to_string());
            }
        };

        let symbol = format!("{ENTRY_SYMBOL}\0");
        let entry = match unsafe { library.get::<SnippetEntry>(symbol.as_bytes()) } {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "entry point missing");
                return ExecuteResponse::error(LoadError::MissingEntry(e).to_string());
            }
        };

        let mut ctx = SnippetContext::new(self.default_dump_depth, self.max_sequence_items);
        let outcome = run_entry(*entry, host, &mut ctx);

        let response = match outcome {
            Ok(()) => {
                let max_items = ctx.max_sequence_items();
                let results: Vec<ResultPair> = ctx
                    .take_dumps()
                    .into_iter()
                    .map(|request| ResultPair {
                        result_key: request.label.clone(),
                        result_value: dump_value(
                            request.value.as_ref(),
                            request.depth_limit,
                            max_items,
                        ),
                    })
                    .collect();
                tracing::info!(results = results.len(), "snippet executed");
                ExecuteResponse::results(results)
            }
            Err(fault) => {
                let offset = ctx.last_offset();
                tracing::warn!(offset, fault = %fault, "snippet faulted");
                ExecuteResponse::error(exception_message(offset, &fault))
            }
        };

        // Order matters: the context owns boxed values whose vtables live in
        // the snippet library. They must be gone before the library closes.
        drop(ctx);
        drop(library);
        response
    }

    /// Stage the payload as an on-disk library and load it. The staged file
    /// is deleted when the returned guard drops.
    fn load(&self, payload: &[u8]) -> Result<(Library, tempfile::NamedTempFile), LoadError> {
        std::fs::create_dir_all(&self.work_dir).map_err(LoadError::Stage)?;
        let staged = tempfile::Builder::new()
            .prefix("snippet-")
            .suffix(".so")
            .tempfile_in(&self.work_dir)
            .map_err(LoadError::Stage)?;
        std::fs::write(staged.path(), payload).map_err(LoadError::Stage)?;

        let library = unsafe { Library::new(staged.path()) }.map_err(LoadError::Load)?;
        tracing::debug!(path = %staged.path().display(), bytes = payload.len(), "snippet library loaded");
        Ok((library, staged))
    }
}

/// Invoke an entry point, converting an unwind into the fault message.
/// Split from [`Engine::execute`] so fault capture is testable without a
/// compiled library.
pub(crate) fn run_entry(
    entry: SnippetEntry,
    host: &mut dyn Any,
    ctx: &mut SnippetContext,
) -> Result<(), String> {
    let invoked = std::panic::catch_unwind(AssertUnwindSafe(|| entry(host, ctx)));
    invoked.map_err(|panic| panic_message(panic.as_ref()))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livepad_core::protocol::parse_exception_message;

    fn test_engine() -> Engine {
        Engine::new(std::env::temp_dir().join("livepad-engine-tests"), 3, 1000)
    }

    #[test]
    fn garbage_payload_is_a_load_failure_without_offset() {
        let engine = test_engine();
        let mut host: Box<dyn Any> = Box::new(());
        let response = engine.execute(b"definitely not an ELF file", host.as_mut());

        let message = response.error_message.expect("load failure must surface");
        assert!(message.contains("not a loadable snippet library"), "{message}");
        assert!(parse_exception_message(&message).is_none());
        assert!(response.results.is_none());
    }

    #[test]
    fn fault_reports_the_last_tracked_offset() {
        // Three tracked statements; the third divides by zero.
        fn entry(host: &mut dyn Any, ctx: &mut SnippetContext) {
            let divisor = *host.downcast_ref::<i32>().unwrap();
            ctx.track_offset(0);
            let a = 10;
            ctx.track_offset(12);
            let b = 20 + a;
            ctx.track_offset(31);
            let _ = b / divisor;
        }

        let mut host: Box<dyn Any> = Box::new(0i32);
        let mut ctx = SnippetContext::default();
        let fault = run_entry(entry, host.as_mut(), &mut ctx).unwrap_err();
        assert!(fault.contains("divide by zero"), "{fault}");
        assert_eq!(ctx.last_offset(), 31);

        let wire = exception_message(ctx.last_offset(), &fault);
        let (offset, message) = parse_exception_message(&wire).unwrap();
        assert_eq!(offset, 31);
        assert!(message.contains("divide by zero"));
    }

    #[test]
    fn fault_before_any_tracking_reports_offset_zero() {
        fn entry(_host: &mut dyn Any, _ctx: &mut SnippetContext) {
            panic!("immediate failure");
        }
        let mut host: Box<dyn Any> = Box::new(());
        let mut ctx = SnippetContext::default();
        let fault = run_entry(entry, host.as_mut(), &mut ctx).unwrap_err();
        assert_eq!(fault, "immediate failure");
        assert_eq!(ctx.last_offset(), 0);
    }

    #[test]
    fn successful_entry_keeps_its_dumps() {
        fn entry(_host: &mut dyn Any, ctx: &mut SnippetContext) {
            ctx.track_offset(0);
            ctx.dump("answer", 42i32);
            ctx.track_offset(20);
            ctx.dump("label", "text".to_string());
        }
        let mut host: Box<dyn Any> = Box::new(());
        let mut ctx = SnippetContext::default();
        run_entry(entry, host.as_mut(), &mut ctx).unwrap();
        let dumps = ctx.take_dumps();
        assert_eq!(dumps.len(), 2);
        assert_eq!(dumps[0].label, "answer");
        assert_eq!(dumps[1].label, "label");
    }
}
