use std::fmt;

use crate::error::{ResolveError, Result};

/// Separator between path segments in expressions and canonical paths.
pub const PATH_SEPARATOR: char = '/';

// =====================
// Argument schema
// =====================

/// Display-only metadata for one endpoint argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgDescriptor {
    pub name: String,
    pub type_name: String,
    pub desc: String,
    pub default: String,
}

impl fmt::Display for ArgDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.type_name, self.desc)?;
        if !self.default.is_empty() {
            write!(f, " (default: {})", self.default)?;
        }
        Ok(())
    }
}

/// An ordered set of argument descriptors attached to a leaf endpoint.
///
/// The order is the catalog order; it is not meaningful for resolution but
/// keeps rendered help output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgSchema {
    entries: Vec<ArgDescriptor>,
}

impl ArgSchema {
    #[must_use]
    pub fn new(entries: Vec<ArgDescriptor>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArgDescriptor> {
        self.entries.iter()
    }

    /// All argument names in schema order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|a| a.name.clone()).collect()
    }

    /// Resolve an abbreviated argument key to its canonical name.
    ///
    /// Matching is a case-insensitive prefix scan over the argument names.
    /// When several names match, an exact (case-sensitive) hit wins; without
    /// one the token is ambiguous. Note the contrast with `Node::pick_child`,
    /// which has no such tie-break.
    ///
    /// # Errors
    ///
    /// `NotFound` when no name matches, `Ambiguous` when several match and
    /// none is exact.
    pub fn resolve(&self, token: &str) -> Result<&str> {
        let lowered = token.to_lowercase();
        let matching: Vec<&str> = self
            .entries
            .iter()
            .map(|a| a.name.as_str())
            .filter(|name| name.to_lowercase().starts_with(&lowered))
            .collect();
        match matching.as_slice() {
            [] => Err(ResolveError::NotFound {
                token: token.to_string(),
                candidates: self.names(),
            }),
            [only] => Ok(*only),
            several => {
                if let Some(exact) = several.iter().copied().find(|name| *name == token) {
                    Ok(exact)
                } else {
                    Err(ResolveError::Ambiguous {
                        token: token.to_string(),
                        matches: several.iter().map(|s| (*s).to_string()).collect(),
                        candidates: self.names(),
                    })
                }
            }
        }
    }

    /// One ` - name (type): desc` line per descriptor, in schema order.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for arg in &self.entries {
            out.push_str(&format!(" - {}\n", arg));
        }
        out
    }
}

// =====================
// Endpoint tree
// =====================

/// A node is either a namespace grouping with children or a leaf endpoint
/// with a URL and an argument schema, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Branch { children: Vec<Node> },
    Leaf { url: String, args: ArgSchema },
}

/// One named node of the endpoint tree. Labels are unique among siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    label: String,
    kind: NodeKind,
}

impl Node {
    #[must_use]
    pub fn branch(label: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            label: label.into(),
            kind: NodeKind::Branch { children },
        }
    }

    #[must_use]
    pub fn leaf(label: impl Into<String>, url: impl Into<String>, args: ArgSchema) -> Self {
        Self {
            label: label.into(),
            kind: NodeKind::Leaf {
                url: url.into(),
                args,
            },
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Children in stored order; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Branch { children } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

    /// The URL template; `None` for grouping nodes.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf { url, .. } => Some(url),
            NodeKind::Branch { .. } => None,
        }
    }

    /// The argument schema; `None` for grouping nodes.
    #[must_use]
    pub fn arg_schema(&self) -> Option<&ArgSchema> {
        match &self.kind {
            NodeKind::Leaf { args, .. } => Some(args),
            NodeKind::Branch { .. } => None,
        }
    }

    /// Match one path token against this node's children.
    ///
    /// A child matches when its label starts with the token, case-sensitive.
    /// There is deliberately no exact-match tie-break: a token equal to one
    /// label but also a prefix of a sibling stays ambiguous.
    ///
    /// # Errors
    ///
    /// `NotFound` when no child label matches, `Ambiguous` when several do.
    pub fn pick_child(&self, token: &str) -> Result<&Node> {
        let children = self.children();
        let matching: Vec<&Node> = children
            .iter()
            .filter(|c| c.label.starts_with(token))
            .collect();
        match matching.as_slice() {
            [] => Err(ResolveError::NotFound {
                token: token.to_string(),
                candidates: labels(children),
            }),
            [only] => Ok(*only),
            several => Err(ResolveError::Ambiguous {
                token: token.to_string(),
                matches: several.iter().map(|n| n.label.clone()).collect(),
                candidates: labels(children),
            }),
        }
    }

    /// Walk the tree along a separator-joined expression, one `pick_child`
    /// per token. The empty expression resolves to this node itself.
    ///
    /// # Errors
    ///
    /// Propagates the first failing token's error; nothing partial survives.
    pub fn resolve_node(&self, expr: &str) -> Result<&Node> {
        let mut node = self;
        for token in tokens(expr) {
            node = node.pick_child(token)?;
        }
        Ok(node)
    }

    /// Reconstruct the canonical, unabbreviated path for an expression.
    ///
    /// The result is separator-prefixed (`/v1/cryptocurrency/quotes/latest`)
    /// and expanding it again returns it unchanged. The empty expression
    /// expands to the empty string.
    ///
    /// # Errors
    ///
    /// Propagates the first failing token's error.
    pub fn expand_expression(&self, expr: &str) -> Result<String> {
        let mut node = self;
        let mut expanded = String::new();
        for token in tokens(expr) {
            node = node.pick_child(token)?;
            expanded.push(PATH_SEPARATOR);
            expanded.push_str(&node.label);
        }
        Ok(expanded)
    }

    /// Resolve an expression and require the result to be a leaf endpoint.
    ///
    /// # Errors
    ///
    /// `NotEndpoint` (carrying the canonical path and a rendering of the
    /// offending subtree) when the expression stops at a grouping node, plus
    /// anything `resolve_node` can return.
    pub fn resolve_leaf(&self, expr: &str) -> Result<&Node> {
        let node = self.resolve_node(expr)?;
        if node.is_leaf() {
            Ok(node)
        } else {
            Err(ResolveError::NotEndpoint {
                path: self.expand_expression(expr)?,
                subtree: node.render(),
            })
        }
    }

    /// Resolve an expression down to the leaf's URL template.
    ///
    /// # Errors
    ///
    /// Same failures as `resolve_leaf`.
    pub fn resolve_url(&self, expr: &str) -> Result<&str> {
        let node = self.resolve_leaf(expr)?;
        match &node.kind {
            NodeKind::Leaf { url, .. } => Ok(url),
            NodeKind::Branch { .. } => unreachable!("resolve_leaf returned a branch"),
        }
    }

    /// Deterministic pretty-printed view of the subtree rooted here.
    /// Children render in stored order, indented three spaces per level.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into("", &mut out);
        out
    }

    fn render_into(&self, prefix: &str, out: &mut String) {
        match &self.kind {
            NodeKind::Leaf { url, .. } => {
                out.push_str(&format!("{}\u{2570} {} \u{2192} {}\n", prefix, self.label, url));
            }
            NodeKind::Branch { children } => {
                out.push_str(&format!("{}\u{2570} {}\n", prefix, self.label));
                let child_prefix = format!("{}   ", prefix);
                for child in children {
                    child.render_into(&child_prefix, out);
                }
            }
        }
    }
}

fn labels(nodes: &[Node]) -> Vec<String> {
    nodes.iter().map(|n| n.label.clone()).collect()
}

fn tokens(expr: &str) -> impl Iterator<Item = &str> {
    // Empty segments would prefix-match every sibling, so leading and
    // doubled separators are dropped rather than resolved.
    expr.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
}
