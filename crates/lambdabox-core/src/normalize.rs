//! Source normalization into the sandbox's native dialect
//!
//! Every [`Language`] maps to a [`Normalizer`] in a [`NormalizerRegistry`].
//! JavaScript passes through untouched; TypeScript is lowered with swc (via
//! `deno_ast`), erasing types while keeping the `function(<params>) {` shape
//! the executor expects.

use crate::{LambdaError, Language, Result};
use deno_ast::diagnostics::Diagnostic;
use deno_ast::{
    EmitOptions, FoldProgramError, MediaType, ModuleSpecifier, ParseDiagnostic,
    ParseDiagnosticsError, ParseParams, SourceMapOption, TranspileError, TranspileModuleOptions,
    TranspileOptions,
};
use std::borrow::Cow;
use std::collections::HashMap;

/// Converts lambda source into JavaScript
pub trait Normalizer: Send + Sync {
    fn normalize<'a>(&self, source: &'a str) -> Result<Cow<'a, str>>;
}

/// Source that is already JavaScript
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl Normalizer for Passthrough {
    fn normalize<'a>(&self, source: &'a str) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(source))
    }
}

const DEFAULT_EXPORT: &str = "export default ";

/// TypeScript to JavaScript lowering
///
/// The body is compiled as the default export of a module so the anonymous
/// function is a legal declaration, then the export prefix is stripped from
/// the emitted text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeScriptTranspiler;

impl TypeScriptTranspiler {
    fn specifier() -> Result<ModuleSpecifier> {
        ModuleSpecifier::parse("file:///lambda.ts")
            .map_err(|e| LambdaError::Transpile(format!("invalid module specifier: {e}")))
    }
}

impl Normalizer for TypeScriptTranspiler {
    fn normalize<'a>(&self, source: &'a str) -> Result<Cow<'a, str>> {
        let parsed = deno_ast::parse_module(ParseParams {
            specifier: Self::specifier()?,
            text: format!("{DEFAULT_EXPORT}{source}").into(),
            media_type: MediaType::TypeScript,
            capture_tokens: false,
            scope_analysis: false,
            maybe_syntax: None,
        })
        .map_err(|e| LambdaError::Transpile(describe(&e)))?;

        let emitted = parsed
            .transpile(
                &TranspileOptions::default(),
                &TranspileModuleOptions::default(),
                &EmitOptions {
                    source_map: SourceMapOption::None,
                    ..Default::default()
                },
            )
            .map_err(transpile_error)?
            .into_source();

        let text = emitted.text.trim_start();
        let lowered = text.strip_prefix(DEFAULT_EXPORT).ok_or_else(|| {
            LambdaError::Transpile("transpiled lambda is not a default-exported function".into())
        })?;

        tracing::debug!(
            source_len = source.len(),
            lowered_len = lowered.len(),
            "lowered typescript lambda"
        );

        Ok(Cow::Owned(lowered.to_owned()))
    }
}

/// `<message> at lambda:<line>:<column>`, positioned in the submitted body
/// rather than in the wrapped module
fn describe(diagnostic: &ParseDiagnostic) -> String {
    let position = diagnostic.display_position();
    let column = if position.line_number == 1 {
        position
            .column_number
            .saturating_sub(DEFAULT_EXPORT.len())
            .max(1)
    } else {
        position.column_number
    };
    format!(
        "{} at lambda:{}:{column}",
        diagnostic.message(),
        position.line_number
    )
}

fn transpile_error(error: TranspileError) -> LambdaError {
    match error {
        TranspileError::ParseErrors(ParseDiagnosticsError(diagnostics))
        | TranspileError::FoldProgram(FoldProgramError::ParseDiagnostics(ParseDiagnosticsError(
            diagnostics,
        ))) => LambdaError::Transpile(
            diagnostics
                .iter()
                .map(describe)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => LambdaError::Transpile(other.to_string()),
    }
}

/// Per-dialect normalizers
pub struct NormalizerRegistry {
    normalizers: HashMap<Language, Box<dyn Normalizer>>,
}

impl NormalizerRegistry {
    /// Registry with no dialects
    #[must_use]
    pub fn empty() -> Self {
        Self {
            normalizers: HashMap::new(),
        }
    }

    /// Add or replace the normalizer of a dialect
    #[must_use]
    pub fn register(mut self, language: Language, normalizer: impl Normalizer + 'static) -> Self {
        self.normalizers.insert(language, Box::new(normalizer));
        self
    }

    /// Normalize `source` declared as `language`
    pub fn normalize<'a>(&self, source: &'a str, language: Language) -> Result<Cow<'a, str>> {
        self.normalizers
            .get(&language)
            .ok_or_else(|| LambdaError::Transpile(format!("unsupported language: {language}")))?
            .normalize(source)
    }
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        Self::empty()
            .register(Language::JavaScript, Passthrough)
            .register(Language::TypeScript, TypeScriptTranspiler)
    }
}

impl std::fmt::Debug for NormalizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizerRegistry")
            .field("languages", &self.normalizers.keys().collect::<Vec<_>>())
            .finish()
    }
}
