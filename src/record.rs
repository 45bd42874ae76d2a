//! The normalized record schema produced by extraction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One documented parameter of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub description: String,
}

/// The normalized unit of knowledge for one reference page.
///
/// A record is always producible from any text input: absent sections degrade
/// to empty fields rather than parse failures. Records are created once per
/// document parse, are immutable afterwards, and are replaced wholesale on
/// every index rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Canonical lookup key; matched exactly and case-sensitively.
    pub name: String,
    /// Call signatures in order of appearance, one entry per overload.
    pub syntax_forms: Vec<String>,
    /// Prose description, empty when the source omits it.
    pub description: String,
    /// Parameters in source order; names need not be unique.
    pub parameters: Vec<Parameter>,
    /// One entry per documented return case, e.g. "0: success".
    pub return_values: Vec<String>,
    /// Verbatim example code with the fence language tag stripped.
    pub example: Option<String>,
    /// Free-text applicability tag, e.g. a product/edition list.
    pub valid_for: Option<String>,
    /// Originating document, kept for diagnostics.
    pub source_path: PathBuf,
}
