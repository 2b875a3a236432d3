//! PascalCase → kebab-case conversion for the reflection registration
//! path (spec.md §4.3: "native methods whose names are convertible
//! PascalCase → kebab-case (including acronym handling, e.g.
//! `GetHTTPURL` → `get-http-url`)").

use heck::ToKebabCase;

/// Acronyms `heck`'s case-boundary detection cannot split on its own:
/// a trailing run of uppercase letters with no following lowercase
/// (e.g. the `HTTPURL` in `GetHTTPURL`) looks like one word to any
/// transition-based splitter. Known multi-acronym runs are segmented
/// by greedy longest-match against this list instead.
const KNOWN_ACRONYMS: &[&str] = &[
    "https", "http", "url", "uri", "json", "html", "xml", "id", "api", "tcp", "udp", "ip", "cpu",
    "gpu", "sql", "ssl", "tls",
];

fn split_acronym_run(word: &str) -> Vec<String> {
    let mut rest = word;
    let mut parts = Vec::new();
    while !rest.is_empty() {
        match KNOWN_ACRONYMS.iter().find(|ac| rest.starts_with(**ac)) {
            Some(ac) => {
                parts.push((*ac).to_string());
                rest = &rest[ac.len()..];
            }
            None => return vec![word.to_string()],
        }
    }
    parts
}

/// Converts a native method name to its WIT kebab-case form
/// (spec.md §4.3's `GetHTTPURL` → `get-http-url` example).
pub fn to_kebab(name: &str) -> String {
    name.to_kebab_case()
        .split('-')
        .flat_map(split_acronym_run)
        .collect::<Vec<_>>()
        .join("-")
}

/// Names reflection must never auto-register: these only exist in
/// their `[form]Type.method` shape and require the explicit
/// registration map (spec.md §4.3 "Explicit" mode).
pub fn is_reserved_reflection_name(name: &str) -> bool {
    matches!(
        name,
        "new" | "drop" | "clone" | "default" | "from" | "into" | "try_from" | "try_into"
    )
}

/// One of the special WIT name forms that only the explicit
/// registration map can express (spec.md §4.3, §6).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Constructor(String),
    Method(String, String),
    Static(String, String),
    ResourceDrop(String),
    ResourceNew(String),
    ResourceRep(String),
}

impl SpecialForm {
    /// Parses the bracketed WIT forms, e.g. `[method]blob.read` or
    /// `[resource-drop]blob`. Returns `None` for a plain function name,
    /// which the caller should treat as an ordinary registration.
    pub fn parse(wit_name: &str) -> Option<SpecialForm> {
        let rest = wit_name.strip_prefix('[')?;
        let (tag, rest) = rest.split_once(']')?;
        match tag {
            "constructor" => Some(SpecialForm::Constructor(rest.to_string())),
            "resource-drop" => Some(SpecialForm::ResourceDrop(rest.to_string())),
            "resource-new" => Some(SpecialForm::ResourceNew(rest.to_string())),
            "resource-rep" => Some(SpecialForm::ResourceRep(rest.to_string())),
            "method" => rest
                .split_once('.')
                .map(|(ty, f)| SpecialForm::Method(ty.to_string(), f.to_string())),
            "static" => rest
                .split_once('.')
                .map(|(ty, f)| SpecialForm::Static(ty.to_string(), f.to_string())),
            _ => None,
        }
    }
}
