//! URL and specifier helpers for the import rewriter.
//!
//! Module URLs are POSIX-style paths rooted at the dev server (`/src/App.js`),
//! optionally followed by a query string.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Prefix for modules served straight from the filesystem.
pub const FS_PREFIX: &str = "/@fs/";

/// Extensions treated as stylesheets.
const CSS_EXTENSIONS: &[&str] = &[
    ".css", ".less", ".sass", ".scss", ".styl", ".stylus", ".postcss",
];

/// Classification predicates consulted by the rewriter.
pub trait ModuleClassifier: Send + Sync {
    /// Whether a resolved id is a stylesheet served as a JS module.
    fn is_css_resource(&self, id: &str) -> bool {
        is_css_request(id)
    }

    /// Whether an importer never needs rewriting.
    fn is_skippable(&self, id: &str) -> bool {
        can_skip_rewrite(id)
    }
}

/// Extension- and query-based classification.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultClassifier;

impl ModuleClassifier for DefaultClassifier {}

/// Split `url` into its path and query (without `?`).
#[must_use]
pub fn split_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

/// The query of `url` (without `?`), if any.
#[must_use]
pub fn query_of(url: &str) -> Option<&str> {
    split_query(url).1
}

/// `url` without query or hash.
#[must_use]
pub fn clean_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Whether `id` names a stylesheet.
#[must_use]
pub fn is_css_request(id: &str) -> bool {
    let path = clean_url(id);
    CSS_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Source maps, JSON and stylesheets are served without import analysis.
#[must_use]
pub fn can_skip_rewrite(id: &str) -> bool {
    let path = clean_url(id);
    path.ends_with(".map") || path.ends_with(".json") || is_css_request(id)
}

/// A bare specifier is anything not starting with `/` or `./`.
#[must_use]
pub fn is_bare_specifier(specifier: &str) -> bool {
    !specifier.starts_with('/') && !specifier.starts_with("./")
}

/// A specifier that names a path (`./`, `../`, `/`) rather than a package.
#[must_use]
pub fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with('/')
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
}

#[must_use]
pub fn is_external_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//")
}

#[must_use]
pub fn is_data_url(url: &str) -> bool {
    url.trim_start().starts_with("data:")
}

/// The `/@fs/` URL serving a resolved filesystem id.
#[must_use]
pub fn fs_url(id: &str) -> String {
    let slashed = id.replace('\\', "/");
    format!("{FS_PREFIX}{}", slashed.trim_start_matches('/'))
}

/// Resolve `url` against the directory of `importer_url`.
///
/// POSIX semantics: `.` and `..` segments are collapsed, `..` never climbs
/// above the root, and the query/hash of `url` is preserved.
#[must_use]
pub fn to_absolute_url(importer_url: &str, url: &str) -> String {
    let suffix_at = url.find(['?', '#']).unwrap_or(url.len());
    let (path, suffix) = url.split_at(suffix_at);

    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        let importer = clean_url(importer_url);
        let dir = importer.rfind('/').map_or("", |i| &importer[..i]);
        format!("{dir}/{path}")
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(joined.len() + suffix.len() + 1);
    out.push('/');
    out.push_str(&segments.join("/"));
    if path.ends_with('/') && !segments.is_empty() {
        out.push('/');
    }
    out.push_str(suffix);
    out
}

fn ignore_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/\*\s*@vite-ignore\s*\*/").expect("ignore regex is valid"))
}

/// Whether a dynamic import argument carries `/* @vite-ignore */`.
#[must_use]
pub fn has_ignore_marker(expr: &str) -> bool {
    ignore_marker_re().is_match(expr)
}

/// Position after the whitespace and comments starting at `i`, or `None`
/// inside an unterminated block comment.
fn skip_trivia(bytes: &[u8], mut i: usize) -> Option<usize> {
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let close = bytes[i + 2..].windows(2).position(|w| w == b"*/")?;
                i += 2 + close + 2;
            }
            _ => break,
        }
    }
    Some(i)
}

/// If the dynamic import argument `expr` is exactly one `'...'` or `"..."`
/// literal, surrounded only by whitespace, comments and an optional trailing
/// comma, returns the byte offset of its contents within `expr` and the
/// contents themselves.
///
/// Literals with escapes are not analyzable.
#[must_use]
pub fn literal_specifier(expr: &str) -> Option<(usize, &str)> {
    let bytes = expr.as_bytes();
    let open = skip_trivia(bytes, 0)?;
    let quote = *bytes.get(open)?;
    if quote != b'\'' && quote != b'"' {
        return None;
    }

    let inner_start = open + 1;
    let mut close = inner_start;
    loop {
        match *bytes.get(close)? {
            b if b == quote => break,
            b'\\' | b'\n' => return None,
            _ => close += 1,
        }
    }
    if close == inner_start {
        return None;
    }

    let mut rest = skip_trivia(bytes, close + 1)?;
    if bytes.get(rest) == Some(&b',') {
        rest = skip_trivia(bytes, rest + 1)?;
    }
    (rest == bytes.len()).then(|| (inner_start, &expr[inner_start..close]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_absolute_url_relative() {
        assert_eq!(to_absolute_url("/src/main.js", "./App.js"), "/src/App.js");
        assert_eq!(to_absolute_url("/src/a/b.js", "../c.js"), "/src/c.js");
        assert_eq!(to_absolute_url("/src/main.js", "./x.css?raw"), "/src/x.css?raw");
        assert_eq!(to_absolute_url("/main.js", "../../up.js"), "/up.js");
    }

    #[test]
    fn test_to_absolute_url_absolute() {
        assert_eq!(to_absolute_url("/src/main.js", "/lib/./x.js"), "/lib/x.js");
        assert_eq!(
            to_absolute_url("/src/main.js", "/@fs/abs/pkg/index.js"),
            "/@fs/abs/pkg/index.js"
        );
    }

    #[test]
    fn test_to_absolute_url_ignores_importer_query() {
        assert_eq!(to_absolute_url("/src/main.js?t=12", "./a.js"), "/src/a.js");
    }

    #[test]
    fn test_split_and_clean() {
        assert_eq!(split_query("./a.css?raw"), ("./a.css", Some("raw")));
        assert_eq!(split_query("./a.css"), ("./a.css", None));
        assert_eq!(query_of("./a.css?raw"), Some("raw"));
        assert_eq!(query_of("./a.css?raw&x"), Some("raw&x"));
        assert_eq!(clean_url("/a.js?x=1#h"), "/a.js");
    }

    #[test]
    fn test_css_classification() {
        assert!(is_css_request("/src/a.css"));
        assert!(is_css_request("/src/a.scss?inline"));
        assert!(!is_css_request("/src/a.css.js"));
        assert!(!is_css_request("/src/a.js"));
    }

    #[test]
    fn test_can_skip_rewrite() {
        assert!(can_skip_rewrite("/src/a.js.map"));
        assert!(can_skip_rewrite("/src/data.json"));
        assert!(can_skip_rewrite("/src/style.css"));
        assert!(!can_skip_rewrite("/src/main.js"));
        assert!(DefaultClassifier.is_skippable("/x.json"));
    }

    #[test]
    fn test_bare_specifier() {
        assert!(is_bare_specifier("react"));
        assert!(is_bare_specifier("@scope/pkg"));
        assert!(is_bare_specifier("../up.js"));
        assert!(!is_bare_specifier("./a.js"));
        assert!(!is_bare_specifier("/src/a.js"));
    }

    #[test]
    fn test_fs_url() {
        assert_eq!(
            fs_url("/abs/node_modules/pkg/index.js"),
            "/@fs/abs/node_modules/pkg/index.js"
        );
        assert_eq!(fs_url(r"C:\proj\pkg.js"), "/@fs/C:/proj/pkg.js");
    }

    #[test]
    fn test_path_specifier() {
        assert!(is_path_specifier("./a.js"));
        assert!(is_path_specifier("../src/a.js"));
        assert!(is_path_specifier("/src/a.js"));
        assert!(!is_path_specifier("react"));
        assert!(!is_path_specifier("@scope/pkg/x.js"));
        assert!(!is_path_specifier(".hidden"));
    }

    #[test]
    fn test_ignore_marker() {
        assert!(has_ignore_marker("/* @vite-ignore */ path"));
        assert!(has_ignore_marker("path /*@vite-ignore*/"));
        assert!(!has_ignore_marker("path // @vite-ignore"));
    }

    #[test]
    fn test_literal_specifier() {
        assert_eq!(literal_specifier("'./a.js'"), Some((1, "./a.js")));
        assert_eq!(literal_specifier("\"./a.js\""), Some((1, "./a.js")));
        assert_eq!(literal_specifier(" './a.js', "), Some((2, "./a.js")));
        assert_eq!(literal_specifier("`./a.js`"), None);
        assert_eq!(literal_specifier("'./a' + b + 'c'"), None);
        assert_eq!(literal_specifier("name"), None);
        assert_eq!(literal_specifier("''"), None);
        assert_eq!(literal_specifier("'./a.js', { with: { type: 'json' } }"), None);
    }

    #[test]
    fn test_literal_specifier_skips_comments() {
        let expr = "/* 'decoy' */ 'pkg' /* 'pkg' */ // 'pkg'\n";
        let (offset, literal) = literal_specifier(expr).unwrap();
        assert_eq!(literal, "pkg");
        assert_eq!(offset, 15);
        assert_eq!(&expr[offset - 1..offset + 4], "'pkg'");

        assert_eq!(literal_specifier("/* never closed 'pkg'"), None);
    }

    #[test]
    fn test_literal_specifier_keeps_slashes_in_strings() {
        assert_eq!(literal_specifier("'./a//b.js'"), Some((1, "./a//b.js")));
        assert_eq!(
            literal_specifier("'http://x.com/a.js'"),
            Some((1, "http://x.com/a.js"))
        );
        assert_eq!(literal_specifier("'./a/*b*/.js'"), Some((1, "./a/*b*/.js")));
    }

    #[test]
    fn test_external_and_data_urls() {
        assert!(is_external_url("https://cdn.example.com/x.js"));
        assert!(is_external_url("//cdn.example.com/x.js"));
        assert!(!is_external_url("/src/x.js"));
        assert!(is_data_url("data:text/javascript,export default 1"));
    }
}
