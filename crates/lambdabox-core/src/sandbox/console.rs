//! Call-scoped capture of console writes

use deno_core::{JsRuntime, OpState, op2, v8};
use std::cell::RefCell;
use std::rc::Rc;

/// Writes recorded while a capture is active
struct ConsoleBuffer {
    lines: Vec<String>,
    bytes: usize,
    limit: usize,
    exceeded: bool,
    isolate: v8::IsolateHandle,
}

impl ConsoleBuffer {
    /// Record `line`, or terminate the isolate once the byte cap is passed.
    /// Nothing is recorded after that.
    fn push(&mut self, line: &str) {
        if self.exceeded {
            return;
        }
        let bytes = self.bytes.saturating_add(line.len());
        if bytes > self.limit {
            self.exceeded = true;
            tracing::warn!(limit = self.limit, "console output limit exceeded, terminating");
            self.isolate.terminate_execution();
            return;
        }
        self.bytes = bytes;
        self.lines.push(line.to_owned());
    }
}

#[op2(fast)]
fn op_lambdabox_console(state: &mut OpState, #[string] line: &str) {
    match state.try_borrow_mut::<ConsoleBuffer>() {
        Some(buffer) => buffer.push(line),
        None => tracing::trace!("console write outside of a lambda call dropped"),
    }
}

deno_core::extension!(lambdabox_console, ops = [op_lambdabox_console]);

/// Installs a fresh buffer on creation and removes it when dropped, so a
/// write can only ever land in the buffer of the call that produced it.
pub struct ConsoleCapture {
    state: Rc<RefCell<OpState>>,
}

impl ConsoleCapture {
    /// Start capturing; at most `limit` bytes are kept for this call
    pub fn begin(runtime: &mut JsRuntime, limit: usize) -> Self {
        let isolate = runtime.v8_isolate().thread_safe_handle();
        let state = runtime.op_state();
        state.borrow_mut().put(ConsoleBuffer {
            lines: Vec::new(),
            bytes: 0,
            limit,
            exceeded: false,
            isolate,
        });
        Self { state }
    }

    /// Whether the call was terminated for writing past the cap
    pub fn exceeded(&self) -> bool {
        self.state
            .borrow()
            .try_borrow::<ConsoleBuffer>()
            .is_some_and(|buffer| buffer.exceeded)
    }

    /// End the capture and return the writes in emission order
    pub fn finish(self) -> Vec<String> {
        self.state
            .borrow_mut()
            .try_take::<ConsoleBuffer>()
            .map(|buffer| buffer.lines)
            .unwrap_or_default()
    }
}

impl Drop for ConsoleCapture {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.try_take::<ConsoleBuffer>();
        }
    }
}
