//! Radix tree implementation of [`PathMatcher`]
//!
//! Paths are split into segments and stored in a tree where:
//! - Each node represents a path segment
//! - Static segments (e.g., `users`) match exactly
//! - Parameter segments (e.g., `{id}` or `{id:[0-9]+}`) match any single
//!   segment, optionally constrained by a regex
//! - Routes are stored at terminal nodes together with their methods and an
//!   optional host template
//!
//! Static children are tried before parameter children, and the search
//! backtracks when a branch dead-ends, so `/users/me` and `/users/{id}` can
//! coexist. Lookup cost is proportional to the path length, not the number
//! of routes.

use http::Method;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::matcher::{MatchOutcome, PathMatcher, RouteId};
use crate::dispatcher::ParamVec;
use crate::error::RegistrationError;

fn invalid(pattern: &str, reason: impl Into<String>) -> RegistrationError {
    RegistrationError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// A `{name}` or `{name:regex}` placeholder.
struct Placeholder<'a> {
    name: &'a str,
    constraint: Option<&'a str>,
}

/// Parse the inside of a `{...}` placeholder.
fn parse_placeholder<'a>(
    pattern: &str,
    inner: &'a str,
) -> Result<Placeholder<'a>, RegistrationError> {
    let (name, constraint) = match inner.split_once(':') {
        Some((n, c)) => (n.trim(), Some(c)),
        None => (inner.trim(), None),
    };
    if name.is_empty() {
        return Err(invalid(pattern, "empty parameter name"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(invalid(pattern, format!("invalid parameter name '{name}'")));
    }
    if constraint.is_some_and(str::is_empty) {
        return Err(invalid(pattern, format!("empty constraint for '{name}'")));
    }
    Ok(Placeholder { name, constraint })
}

/// Split `template` into literal text and `{...}` placeholders, checking that
/// braces are balanced.
fn tokenize(template: &str) -> Result<Vec<(bool, &str)>, RegistrationError> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in template.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    if i > start {
                        tokens.push((false, &template[start..i]));
                    }
                    start = i + 1;
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    return Err(invalid(template, "unbalanced '}'"));
                }
                depth -= 1;
                if depth == 0 {
                    tokens.push((true, &template[start..i]));
                    start = i + 1;
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(invalid(template, "unbalanced '{'"));
    }
    if start < template.len() {
        tokens.push((false, &template[start..]));
    }
    Ok(tokens)
}

fn compile(pattern: &str, source: &str) -> Result<Regex, RegistrationError> {
    Regex::new(source).map_err(|e| invalid(pattern, e.to_string()))
}

/// Compiled host template such as `{tenant}.example.com`.
///
/// Matching is case-insensitive and each placeholder matches one DNS label
/// unless it carries its own constraint.
struct HostPattern {
    regex: Regex,
    labels: Vec<Arc<str>>,
}

impl HostPattern {
    fn compile(template: &str) -> Result<Self, RegistrationError> {
        let mut source = String::with_capacity(template.len() + 8);
        source.push_str("(?i)^");
        let mut labels = Vec::new();
        for (is_param, text) in tokenize(template)? {
            if is_param {
                let placeholder = parse_placeholder(template, text)?;
                source.push('(');
                source.push_str(placeholder.constraint.unwrap_or("[^.]+"));
                source.push(')');
                labels.push(Arc::<str>::from(placeholder.name));
            } else {
                source.push_str(&regex::escape(text));
            }
        }
        source.push('$');
        Ok(Self {
            regex: compile(template, &source)?,
            labels,
        })
    }

    fn captures(&self, host: &str, params: &mut ParamVec) -> bool {
        let Some(caps) = self.regex.captures(host) else {
            return false;
        };
        for (i, label) in self.labels.iter().enumerate() {
            if let Some(m) = caps.get(i + 1) {
                params.push((Arc::clone(label), m.as_str().to_string()));
            }
        }
        true
    }
}

/// A route stored at a terminal node.
struct Entry {
    id: RouteId,
    methods: Vec<Method>,
    host: Option<HostPattern>,
    trailing_slash: bool,
}

/// Parameter segment attached to a node.
struct ParamSegment {
    name: Arc<str>,
    /// Constraint as written, used to tell `{id}` and `{id:[0-9]+}` apart
    source: Option<String>,
    constraint: Option<Regex>,
}

/// Node in the radix tree
///
/// Each node represents one path segment. Static children share prefixes with
/// every other route under the same parent.
struct RadixNode {
    segment: String,
    param: Option<ParamSegment>,
    entries: Vec<Entry>,
    children: Vec<RadixNode>,
    param_children: Vec<RadixNode>,
}

/// One parsed path segment, ready for insertion.
enum Segment<'a> {
    Static(&'a str),
    Param {
        name: &'a str,
        constraint: Option<&'a str>,
    },
}

impl RadixNode {
    fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            param: None,
            entries: Vec::new(),
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    fn insert(
        &mut self,
        pattern: &str,
        segments: &[Segment<'_>],
        entry: Entry,
    ) -> Result<(), RegistrationError> {
        let Some((segment, remaining)) = segments.split_first() else {
            self.entries.push(entry);
            return Ok(());
        };

        match segment {
            Segment::Static(text) => {
                if let Some(child) = self.children.iter_mut().find(|c| c.segment == *text) {
                    return child.insert(pattern, remaining, entry);
                }
                let mut child = RadixNode::new(text);
                child.insert(pattern, remaining, entry)?;
                self.children.push(child);
                Ok(())
            }
            Segment::Param { name, constraint } => {
                // Reuse a parameter child with the same name and constraint
                let existing = self.param_children.iter_mut().find(|c| {
                    c.param.as_ref().is_some_and(|p| {
                        p.name.as_ref() == *name && p.source.as_deref() == *constraint
                    })
                });
                if let Some(child) = existing {
                    return child.insert(pattern, remaining, entry);
                }

                let constraint_regex = match constraint {
                    Some(source) => Some(compile(pattern, &format!("^(?:{source})$"))?),
                    None => None,
                };
                let mut child = RadixNode::new("");
                child.param = Some(ParamSegment {
                    name: Arc::from(*name),
                    source: constraint.map(str::to_string),
                    constraint: constraint_regex,
                });
                child.insert(pattern, remaining, entry)?;
                self.param_children.push(child);
                Ok(())
            }
        }
    }

    /// Visit every entry whose path template matches `segments`, static
    /// branches first. Stops as soon as `visit` returns `true`.
    fn walk(
        &self,
        segments: &[&str],
        params: &mut ParamVec,
        visit: &mut dyn FnMut(&Entry, &ParamVec) -> bool,
    ) -> bool {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.entries.iter().any(|e| visit(e, params));
        };

        for child in &self.children {
            if child.segment == *segment && child.walk(remaining, params, visit) {
                return true;
            }
        }

        for param_child in &self.param_children {
            let Some(param) = &param_child.param else {
                continue;
            };
            let value = urlencoding::decode(segment)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| (*segment).to_string());
            if param
                .constraint
                .as_ref()
                .is_some_and(|re| !re.is_match(&value))
            {
                continue;
            }
            params.push((Arc::clone(&param.name), value));
            if param_child.walk(remaining, params, visit) {
                return true;
            }
            // Backtrack: drop the parameter if this branch failed
            params.pop();
        }

        false
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn has_trailing_slash(path: &str) -> bool {
    path.len() > 1 && path.ends_with('/')
}

/// Radix tree path matcher
///
/// With `strict_slash` off, trailing and repeated slashes are ignored. With it
/// on, `/users/` and `/users` are different paths.
pub struct RadixMatcher {
    root: RadixNode,
    strict_slash: bool,
    next_id: usize,
    names: HashMap<String, RouteId>,
}

impl RadixMatcher {
    pub fn new(strict_slash: bool) -> Self {
        Self {
            root: RadixNode::new(""),
            strict_slash,
            next_id: 0,
            names: HashMap::new(),
        }
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.next_id
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }

    fn parse_path(pattern: &str) -> Result<Vec<Segment<'_>>, RegistrationError> {
        if !pattern.starts_with('/') {
            return Err(invalid(pattern, "path must start with '/'"));
        }
        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        for raw in split_path(pattern) {
            if !raw.contains(['{', '}']) {
                segments.push(Segment::Static(raw));
                continue;
            }
            let inner = raw
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .ok_or_else(|| invalid(pattern, "a parameter must span a whole segment"))?;
            let tokens = tokenize(raw)?;
            if tokens.len() != 1 {
                return Err(invalid(pattern, "a parameter must span a whole segment"));
            }
            let placeholder = parse_placeholder(pattern, inner)?;
            if !seen.insert(placeholder.name) {
                return Err(invalid(
                    pattern,
                    format!("duplicate parameter '{}'", placeholder.name),
                ));
            }
            segments.push(Segment::Param {
                name: placeholder.name,
                constraint: placeholder.constraint,
            });
        }
        Ok(segments)
    }
}

impl Default for RadixMatcher {
    fn default() -> Self {
        Self::new(false)
    }
}

impl PathMatcher for RadixMatcher {
    fn register(
        &mut self,
        methods: &[Method],
        pattern: &str,
        host: Option<&str>,
    ) -> Result<RouteId, RegistrationError> {
        let segments = Self::parse_path(pattern)?;
        let host = host.map(HostPattern::compile).transpose()?;
        let id = RouteId(self.next_id);
        let entry = Entry {
            id,
            methods: methods.to_vec(),
            host,
            trailing_slash: has_trailing_slash(pattern),
        };
        self.root.insert(pattern, &segments, entry)?;
        self.next_id += 1;
        Ok(id)
    }

    fn match_route(&self, method: &Method, host: Option<&str>, path: &str) -> MatchOutcome {
        let segments = split_path(path);
        let trailing = has_trailing_slash(path);
        let mut params = ParamVec::new();
        let mut found = None;
        let mut allowed: Vec<Method> = Vec::new();

        self.root.walk(&segments, &mut params, &mut |entry, path_params| {
            if self.strict_slash && entry.trailing_slash != trailing {
                return false;
            }
            let mut captured = ParamVec::new();
            if let Some(pattern) = &entry.host {
                if !host.is_some_and(|h| pattern.captures(h, &mut captured)) {
                    return false;
                }
            }
            if entry.methods.contains(method) {
                captured.extend(path_params.iter().cloned());
                found = Some((entry.id, captured));
                true
            } else {
                for m in &entry.methods {
                    if !allowed.contains(m) {
                        allowed.push(m.clone());
                    }
                }
                false
            }
        });

        match found {
            Some((id, params)) => MatchOutcome::Matched { id, params },
            None if !allowed.is_empty() => MatchOutcome::MethodNotAllowed { allowed },
            None => MatchOutcome::NotFound,
        }
    }

    fn set_name(&mut self, id: RouteId, name: &str) {
        self.names.insert(name.to_string(), id);
    }

    fn named(&self, name: &str) -> Option<RouteId> {
        self.names.get(name).copied()
    }
}
