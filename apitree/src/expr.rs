use crate::error::{ResolveError, Result};
use crate::tree::ArgSchema;

/// What to do with a resolved expression, selected by its trailing suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No suffix: resolve the leaf and issue the request.
    Get,
    /// `!`: print only the canonical expanded path.
    Expand,
    /// `+`: print the subtree under the resolved node.
    Tree,
    /// `?`: print the leaf and its argument schema.
    Help,
}

/// A parsed command-line expression: `path ['.' args] [suffix]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub path: String,
    pub args: String,
    pub mode: Mode,
}

impl Expression {
    /// Split an input into path, argument string, and mode.
    ///
    /// The suffix is a single trailing `?`, `+`, or `!`; the argument string
    /// starts at the first `.` so values may themselves contain dots
    /// (`amount=1.5,convert=eth`).
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let (body, mode) = if let Some(rest) = input.strip_suffix('?') {
            (rest, Mode::Help)
        } else if let Some(rest) = input.strip_suffix('+') {
            (rest, Mode::Tree)
        } else if let Some(rest) = input.strip_suffix('!') {
            (rest, Mode::Expand)
        } else {
            (input, Mode::Get)
        };
        let (path, args) = match body.split_once('.') {
            Some((path, args)) => (path, args),
            None => (body, ""),
        };
        Self {
            path: path.to_string(),
            args: args.to_string(),
            mode,
        }
    }

    /// Parse the argument string into ordered `(key, value)` pairs.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a pair without `=` or with an empty key.
    pub fn arg_pairs(&self) -> Result<Vec<(String, String)>> {
        if self.args.is_empty() {
            return Ok(Vec::new());
        }
        let mut pairs = Vec::new();
        for chunk in self.args.split(',') {
            let Some((key, value)) = chunk.split_once('=') else {
                return Err(ResolveError::InvalidArgument {
                    pair: chunk.to_string(),
                    reason: "expected key=value".to_string(),
                });
            };
            if key.is_empty() {
                return Err(ResolveError::InvalidArgument {
                    pair: chunk.to_string(),
                    reason: "empty argument name".to_string(),
                });
            }
            pairs.push((key.to_string(), value.to_string()));
        }
        Ok(pairs)
    }
}

/// Map user-supplied pairs through a leaf's argument schema, producing
/// canonical names in the order the user gave them. A repeated canonical
/// key overwrites the earlier value.
///
/// # Errors
///
/// Propagates `ArgSchema::resolve` failures for unknown or ambiguous keys.
pub fn normalize_args(
    schema: &ArgSchema,
    pairs: &[(String, String)],
) -> Result<Vec<(String, String)>> {
    let mut normalized: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        let canonical = schema.resolve(key)?;
        if let Some(existing) = normalized.iter_mut().find(|(name, _)| name == canonical) {
            existing.1 = value.clone();
        } else {
            normalized.push((canonical.to_string(), value.clone()));
        }
    }
    Ok(normalized)
}
