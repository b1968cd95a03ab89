//! The per-invocation context handed to a snippet's entry point.
//!
//! Replaces hidden global state with an explicit object: the snippet dumps
//! values and reports execution progress through `ctx`, and the engine reads
//! everything back after the entry point returns (or faults). The executor
//! runs one snippet at a time, so a context is never shared.

use crate::reflect::Reflect;

/// Fallback per-dump depth when a snippet does not pass one.
pub const DEFAULT_DUMP_DEPTH: usize = 3;

/// Fallback per-sequence item cap.
pub const DEFAULT_MAX_SEQUENCE_ITEMS: usize = 1000;

/// One `ctx.dump(...)` call, collected in arrival order and converted to a
/// dump tree after the snippet finishes.
pub struct DumpRequest {
    pub label: String,
    pub value: Box<dyn Reflect>,
    pub depth_limit: usize,
    pub render_as_table: bool,
}

/// Side channel between the engine and one snippet invocation.
pub struct SnippetContext {
    dumps: Vec<DumpRequest>,
    last_offset: usize,
    default_depth: usize,
    max_sequence_items: usize,
}

impl SnippetContext {
    pub fn new(default_depth: usize, max_sequence_items: usize) -> Self {
        Self {
            dumps: Vec::new(),
            last_offset: 0,
            default_depth,
            max_sequence_items,
        }
    }

    /// Record that the statement starting at `offset` (a zero-based
    /// character position in the snippet source) began executing.
    /// Instrumentation inserts a call before every top-level statement.
    pub fn track_offset(&mut self, offset: usize) {
        self.last_offset = offset;
    }

    /// Offset of the last statement that began executing.
    pub fn last_offset(&self) -> usize {
        self.last_offset
    }

    /// Dump a value with the default depth.
    pub fn dump(&mut self, label: impl Into<String>, value: impl Reflect + 'static) {
        let depth = self.default_depth;
        self.dump_with(label, value, depth, false);
    }

    /// Dump a value with an explicit depth limit and render hint.
    pub fn dump_with(
        &mut self,
        label: impl Into<String>,
        value: impl Reflect + 'static,
        depth_limit: usize,
        render_as_table: bool,
    ) {
        self.dumps.push(DumpRequest {
            label: label.into(),
            value: Box::new(value),
            depth_limit,
            render_as_table,
        });
    }

    /// Override the per-sequence item cap for this invocation.
    pub fn set_max_sequence_items(&mut self, max: usize) {
        self.max_sequence_items = max;
    }

    pub fn max_sequence_items(&self) -> usize {
        self.max_sequence_items
    }

    pub fn dump_count(&self) -> usize {
        self.dumps.len()
    }

    /// Drain the collected requests, preserving arrival order.
    pub fn take_dumps(&mut self) -> Vec<DumpRequest> {
        std::mem::take(&mut self.dumps)
    }
}

impl Default for SnippetContext {
    fn default() -> Self {
        Self::new(DEFAULT_DUMP_DEPTH, DEFAULT_MAX_SEQUENCE_ITEMS)
    }
}
