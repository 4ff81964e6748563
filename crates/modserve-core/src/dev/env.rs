//! `.env` loading and `import.meta.env` serialization.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files read from the root for `mode`, lowest precedence first.
fn env_files(root: &Path, mode: &str) -> [PathBuf; 4] {
    [
        root.join(".env"),
        root.join(".env.local"),
        root.join(format!(".env.{mode}")),
        root.join(format!(".env.{mode}.local")),
    ]
}

/// Parse `.env` content.
///
/// Lines are `KEY=value`, optionally prefixed with `export `. Double-quoted
/// values understand `\n`, `\r`, `\t`, `\\` and `\"`; single-quoted values
/// are literal; unquoted values end at ` #`. Blank lines, `#` comments and
/// lines without `=` are ignored.
#[must_use]
pub fn parse_env_file(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            let key = key.strip_prefix("export ").unwrap_or(key).trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), parse_value(value.trim())))
        })
        .collect()
}

fn parse_value(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix('"') {
        let mut out = String::with_capacity(rest.len());
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => break,
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some(e @ ('\\' | '"')) => out.push(e),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => {}
                },
                _ => out.push(c),
            }
        }
        out
    } else if let Some(rest) = raw.strip_prefix('\'') {
        rest.split('\'').next().unwrap_or_default().to_string()
    } else {
        raw.split(" #").next().unwrap_or_default().trim_end().to_string()
    }
}

/// Merge the `.env` files under `root` for `mode`.
///
/// Later files override earlier ones; keys already present in the process
/// environment are left out.
#[must_use]
pub fn load_env_files(root: &Path, mode: &str) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    for file in env_files(root, mode) {
        if let Ok(content) = std::fs::read_to_string(&file) {
            debug!(file = %file.display(), "loaded env file");
            env.extend(parse_env_file(&content));
        }
    }
    env.retain(|key, _| std::env::var_os(key).is_none());
    env
}

/// Prefixes of environment variables exposed to client code.
pub const CLIENT_ENV_PREFIXES: &[&str] = &["VITE_", "MODSERVE_"];

/// Build the `import.meta.env` object served to the browser.
///
/// Only variables with a [`CLIENT_ENV_PREFIXES`] prefix are exposed. The
/// built-ins always win over user keys of the same name:
/// - `BASE_URL` → the public base path
/// - `MODE` → the current mode
/// - `DEV` / `PROD` → `true` / `false` depending on whether mode is `production`
#[must_use]
pub fn client_env(
    env: &BTreeMap<String, String>,
    mode: &str,
    base: &str,
) -> Map<String, Value> {
    let mut map = Map::new();

    for (key, value) in env {
        if CLIENT_ENV_PREFIXES.iter().any(|p| key.starts_with(p)) {
            map.insert(key.clone(), Value::String(value.clone()));
        }
    }

    let is_prod = mode == "production";
    map.insert("BASE_URL".to_string(), Value::String(base.to_string()));
    map.insert("MODE".to_string(), Value::String(mode.to_string()));
    map.insert("DEV".to_string(), Value::Bool(!is_prod));
    map.insert("PROD".to_string(), Value::Bool(is_prod));

    map
}

/// The statement that installs `import.meta.env` at the top of a module.
#[must_use]
pub fn env_preamble(env: &Map<String, Value>) -> String {
    // Serializing a map of strings and bools cannot fail.
    let json = serde_json::to_string(env).unwrap_or_else(|_| "{}".to_string());
    format!("import.meta.env = {json};")
}
