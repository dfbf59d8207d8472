//! Isolated lambda executor
//!
//! A [`Sandbox`] owns one V8 isolate with no host extensions: there is no
//! filesystem, network, timer, process or module-loader surface. The only
//! native op is the console sink in [`console`]. Lambdas are loaded as
//! `module.exports = <source>` inside a CommonJS-style factory and called
//! once with the JSON-decoded input.
//!
//! `JsRuntime` is `!Send`, so a sandbox stays on the thread that built it and
//! is driven through `&mut self`: one caller at a time.

mod console;
mod limits;

use crate::{LambdaError, Result, SandboxConfig};
use console::ConsoleCapture;
use deno_core::{JsRuntime, RuntimeOptions, v8};
use limits::{HeapLimitState, Watchdog};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const BOOTSTRAP: &str = include_str!("bootstrap.js");

/// Deepest array/object nesting a lambda may return
pub const MAX_RESPONSE_DEPTH: usize = 100;

/// Values produced by a successful call
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub response: Value,
    pub console_output: Vec<String>,
}

/// What the in-isolate runner reports back
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Ok(Value),
    Error(String),
}

pub struct Sandbox {
    // Declared before `runtime`: globals must be released while the isolate
    // is still alive.
    runner: v8::Global<v8::Function>,
    runtime: JsRuntime,
    heap: Box<HeapLimitState>,
    console_limit: usize,
    executions: u64,
}

impl Sandbox {
    /// Build an isolate and run the bootstrap script in it
    pub fn new(config: &SandboxConfig) -> Result<Self> {
        let create_params = v8::CreateParams::default().heap_limits(0, config.max_heap_size);
        let mut runtime = JsRuntime::new(RuntimeOptions {
            extensions: vec![console::lambdabox_console::init()],
            create_params: Some(create_params),
            ..Default::default()
        });

        let heap = HeapLimitState::new(runtime.v8_isolate().thread_safe_handle());
        heap.install(runtime.v8_isolate());

        let completion = runtime
            .execute_script("[lambdabox:bootstrap]", BOOTSTRAP)
            .map_err(|e| LambdaError::Sandbox(format!("bootstrap failed: {e}")))?;

        let runner = {
            let scope = &mut runtime.handle_scope();
            let local = v8::Local::new(scope, &completion);
            let function = v8::Local::<v8::Function>::try_from(local).map_err(|e| {
                LambdaError::Sandbox(format!("bootstrap did not yield a function: {e}"))
            })?;
            v8::Global::new(scope, function)
        };
        drop(completion);

        tracing::debug!(max_heap_size = config.max_heap_size, "sandbox isolate created");

        Ok(Self {
            runner,
            runtime,
            heap,
            console_limit: config.max_console_bytes,
            executions: 0,
        })
    }

    /// Number of calls this isolate has served
    #[must_use]
    pub const fn executions(&self) -> u64 {
        self.executions
    }

    /// Load `source` and call it once with `input`
    ///
    /// Console writes are only returned on success. Any exception raised while
    /// loading or calling the lambda becomes [`LambdaError::Runtime`] carrying
    /// the exception message. Writing more than `max_console_bytes` of console
    /// output terminates the call.
    pub fn execute(
        &mut self,
        source: &str,
        input: &Value,
        timeout: Option<Duration>,
    ) -> Result<Execution> {
        let input = serde_json::to_string(input)?;
        self.executions += 1;

        let capture = ConsoleCapture::begin(&mut self.runtime, self.console_limit);
        let watchdog =
            timeout.map(|t| Watchdog::arm(self.runtime.v8_isolate().thread_safe_handle(), t));

        let raw = self.call(source, &input);

        let timed_out = watchdog.is_some_and(Watchdog::disarm);
        let heap_exceeded = self.heap.triggered();
        let console_exceeded = capture.exceeded();
        if timed_out || heap_exceeded || console_exceeded {
            self.runtime.v8_isolate().cancel_terminate_execution();
        }

        if heap_exceeded {
            return Err(LambdaError::HeapLimitExceeded);
        }
        if console_exceeded {
            return Err(LambdaError::ConsoleLimitExceeded);
        }
        if timed_out {
            let ms = timeout.map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
            tracing::warn!(timeout_ms = ms, "lambda call terminated by watchdog");
            return Err(LambdaError::Timeout(ms));
        }

        let raw = raw?;
        // The report wraps the return value in one more object.
        if nesting_depth(&raw) > MAX_RESPONSE_DEPTH + 1 {
            return Err(LambdaError::Runtime(format!(
                "return value nests deeper than {MAX_RESPONSE_DEPTH} levels"
            )));
        }

        match serde_json::from_str::<Outcome>(&raw)? {
            Outcome::Ok(response) => Ok(Execution {
                response,
                console_output: capture.finish(),
            }),
            Outcome::Error(message) => Err(LambdaError::Runtime(message)),
        }
    }

    /// Invoke the runner; returns its JSON report
    fn call(&mut self, source: &str, input: &str) -> Result<String> {
        let scope = &mut self.runtime.handle_scope();
        let runner = v8::Local::new(scope, &self.runner);
        let recv: v8::Local<v8::Value> = v8::undefined(scope).into();

        let source = v8::String::new(scope, source)
            .ok_or_else(|| LambdaError::Sandbox("lambda source too large".into()))?;
        let input = v8::String::new(scope, input)
            .ok_or_else(|| LambdaError::Sandbox("lambda input too large".into()))?;

        let scope = &mut v8::TryCatch::new(scope);
        if let Some(report) = runner.call(scope, recv, &[source.into(), input.into()]) {
            return Ok(report.to_rust_string_lossy(scope));
        }

        if scope.has_terminated() {
            return Err(LambdaError::Sandbox("execution terminated".into()));
        }
        let message = scope
            .exception()
            .map_or_else(|| "unknown error".to_owned(), |e| e.to_rust_string_lossy(scope));
        Err(LambdaError::Runtime(message))
    }
}

/// Deepest array/object nesting in a JSON text
fn nesting_depth(json: &str) -> usize {
    let (mut depth, mut deepest) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for byte in json.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("executions", &self.executions)
            .finish_non_exhaustive()
    }
}
