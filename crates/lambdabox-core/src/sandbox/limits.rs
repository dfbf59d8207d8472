//! Wall-clock and heap limits for a running isolate

use deno_core::v8;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Shared with V8's near-heap-limit callback
pub struct HeapLimitState {
    handle: v8::IsolateHandle,
    triggered: AtomicBool,
}

impl HeapLimitState {
    pub fn new(handle: v8::IsolateHandle) -> Box<Self> {
        Box::new(Self {
            handle,
            triggered: AtomicBool::new(false),
        })
    }

    pub fn triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Register `near_heap_limit_callback` on `isolate` with `self` as data.
    /// `self` must outlive the isolate.
    pub fn install(&self, isolate: &mut v8::Isolate) {
        isolate.add_near_heap_limit_callback(
            near_heap_limit_callback,
            std::ptr::from_ref(self).cast_mut().cast::<std::ffi::c_void>(),
        );
    }
}

/// Terminates execution and grants 1MB so the termination can unwind.
extern "C" fn near_heap_limit_callback(
    data: *mut std::ffi::c_void,
    current_heap_limit: usize,
    _initial_heap_limit: usize,
) -> usize {
    // SAFETY: `data` is the `HeapLimitState` registered in `install`. The
    // sandbox owns it in a Box declared after its runtime, so it is dropped
    // only once the isolate is gone. Only the atomic is touched.
    #[allow(unsafe_code)]
    let state = unsafe { &*data.cast::<HeapLimitState>() };
    if !state.triggered.swap(true, Ordering::SeqCst) {
        tracing::warn!("lambda approached heap limit, terminating");
        state.handle.terminate_execution();
    }
    current_heap_limit + 1024 * 1024
}

/// Terminates the isolate if the call outlives `timeout`
pub struct Watchdog {
    cancel: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
    fired: Arc<AtomicBool>,
}

impl Watchdog {
    pub fn arm(handle: v8::IsolateHandle, timeout: Duration) -> Self {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let thread = std::thread::spawn(move || {
            if let Err(mpsc::RecvTimeoutError::Timeout) = cancelled.recv_timeout(timeout) {
                flag.store(true, Ordering::SeqCst);
                handle.terminate_execution();
            }
        });

        Self {
            cancel,
            thread: Some(thread),
            fired,
        }
    }

    /// Stop the watchdog and report whether it terminated the call
    pub fn disarm(mut self) -> bool {
        self.stop();
        self.fired.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        // A send error means the deadline already passed and the thread exited.
        let _ = self.cancel.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("watchdog thread panicked");
            }
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
