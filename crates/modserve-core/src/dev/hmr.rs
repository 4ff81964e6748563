//! `import.meta.hot` detection results and hot-context injection.

use std::collections::HashSet;

/// What a module declares through `import.meta.hot`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HmrIntent {
    /// `import.meta.hot` appears anywhere in the module.
    pub has_hmr: bool,
    /// Some `accept` call had no literal dependency argument.
    pub is_self_accepting: bool,
    /// Raw dependency specifiers passed to `accept`, not yet resolved.
    pub accepted_specifiers: HashSet<String>,
}

impl HmrIntent {
    /// Short label for debug logs.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        if self.is_self_accepting {
            "self-accepts"
        } else if !self.accepted_specifiers.is_empty() {
            "accepts-deps"
        } else {
            "detected api usage"
        }
    }
}

/// The two statements creating `import.meta.hot` for a served module.
///
/// Emitted on the first line without a trailing newline so that line
/// numbers in the module stay unchanged.
#[must_use]
pub fn hmr_preamble(client_path: &str, module_url: &str) -> String {
    format!(
        "import {{ createHotContext as __modserve__createHotContext }} from {};\
         import.meta.hot = __modserve__createHotContext({});",
        js_string(client_path),
        js_string(module_url),
    )
}

/// Double-quoted JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
