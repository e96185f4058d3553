//! Route key synthesis for object bindings.
//!
//! A binding pattern may contain the built-in placeholders `{.struct}` and
//! `{.method}`; they are replaced with the URI form of the bound type and
//! method names. In whole-object mode a pattern without `{.method}` gets the
//! method name appended as a new path segment:
//!
//! ```rust
//! use objroute::binding::keys::merge_builtin_names;
//! use objroute::config::UriType;
//!
//! let key = merge_builtin_names("/test@default", "Shop", "ShowList", true, UriType::Default);
//! assert_eq!(key, "/test/show-list@default");
//!
//! let key = merge_builtin_names("/{.struct}/{.method}", "Shop", "ShowList", true, UriType::Default);
//! assert_eq!(key, "/shop/show-list");
//! ```

use crate::config::UriType;

const STRUCT_PLACEHOLDER: &str = "{.struct}";
const METHOD_PLACEHOLDER: &str = "{.method}";
const INDEX_SEGMENT: &str = "/index";

/// Render a type or method name as a path segment.
#[must_use]
pub fn name_to_uri(name: &str, uri_type: UriType) -> String {
    match uri_type {
        UriType::FullName => name.to_string(),
        UriType::AllLower => name.to_lowercase(),
        UriType::Camel => {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        UriType::Default => split_words(name).join("-"),
    }
}

/// Lower-case words of a camel, snake or kebab case name.
///
/// Runs of capitals are kept together (`HTTPServer` → `http`, `server`).
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Substitute the built-in placeholders and, when `allow_append` is set and
/// the pattern has no `{.method}`, append the method segment before any
/// `@domain` suffix.
#[must_use]
pub fn merge_builtin_names(
    pattern: &str,
    type_name: &str,
    method_name: &str,
    allow_append: bool,
    uri_type: UriType,
) -> String {
    let struct_uri = name_to_uri(type_name, uri_type);
    let method_uri = name_to_uri(method_name, uri_type);
    let pattern = pattern.replace(STRUCT_PLACEHOLDER, &struct_uri);
    if pattern.contains(METHOD_PLACEHOLDER) {
        return pattern.replace(METHOD_PLACEHOLDER, &method_uri);
    }
    if !allow_append {
        return pattern;
    }
    match pattern.rsplit_once('@') {
        Some((uri, domain)) => format!("{}/{}@{}", uri.trim_end_matches('/'), method_uri, domain),
        None => format!("{}/{}", pattern.trim_end_matches('/'), method_uri),
    }
}

/// The key with its last `/index` segment removed, e.g. `/user/index@default`
/// → `/user@default`. An emptied path becomes `/`.
#[must_use]
pub fn index_alias(key: &str) -> Option<String> {
    let pos = key.to_ascii_lowercase().rfind(INDEX_SEGMENT)?;
    let stripped = format!("{}{}", &key[..pos], &key[pos + INDEX_SEGMENT.len()..]);

    // Keep any `METHOD:` prefix in front of the restored root.
    let (prefix, rest) = match stripped.find(':') {
        Some(colon) if !stripped[..colon].contains('/') => stripped.split_at(colon + 1),
        _ => ("", stripped.as_str()),
    };
    if rest.is_empty() || rest.starts_with('@') {
        Some(format!("{prefix}/{rest}"))
    } else {
        Some(stripped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_to_uri_default() {
        assert_eq!(name_to_uri("ShowList", UriType::Default), "show-list");
        assert_eq!(name_to_uri("show_list", UriType::Default), "show-list");
        assert_eq!(name_to_uri("Foo", UriType::Default), "foo");
        assert_eq!(name_to_uri("HTTPServer", UriType::Default), "http-server");
        assert_eq!(name_to_uri("GetV2Items", UriType::Default), "get-v2-items");
    }

    #[test]
    fn test_name_to_uri_other_types() {
        assert_eq!(name_to_uri("ShowList", UriType::FullName), "ShowList");
        assert_eq!(name_to_uri("ShowList", UriType::AllLower), "showlist");
        assert_eq!(name_to_uri("ShowList", UriType::Camel), "showList");
        assert_eq!(name_to_uri("", UriType::Camel), "");
    }

    #[test]
    fn test_append_keeps_domain() {
        let key = merge_builtin_names("/test/@example.com", "T", "Foo", true, UriType::Default);
        assert_eq!(key, "/test/foo@example.com");
        assert_eq!(merge_builtin_names("/", "T", "Foo", true, UriType::Default), "/foo");
        let key = merge_builtin_names("/a@b/c@example.com", "T", "Foo", true, UriType::Default);
        assert_eq!(key, "/a@b/c/foo@example.com");
    }

    #[test]
    fn test_single_method_mode_does_not_append() {
        let key = merge_builtin_names("/{.struct}/run", "JobRunner", "Start", false, UriType::Default);
        assert_eq!(key, "/job-runner/run");
    }

    #[test]
    fn test_index_alias() {
        assert_eq!(index_alias("/user/index@default").as_deref(), Some("/user@default"));
        assert_eq!(index_alias("/index@default").as_deref(), Some("/@default"));
        assert_eq!(index_alias("/index").as_deref(), Some("/"));
        assert_eq!(index_alias("GET:/index@default").as_deref(), Some("GET:/@default"));
        assert_eq!(index_alias("/user/Index").as_deref(), Some("/user"));
        assert_eq!(index_alias("/user/show"), None);
    }
}
