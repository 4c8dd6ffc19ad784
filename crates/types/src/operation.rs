//! Textual operation descriptors
//!
//! Operations are declared as `Name(arg1,arg2,...)`. Inside the argument
//! list `\,`, `\(`, `\)` and `\\` escape the literal characters.

use ifw_errors::{Error, FormatError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An operation name together with its raw, unsubstituted arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub arguments: Vec<String>,
}

impl OperationDescriptor {
    pub fn new<I, S>(name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse `Name(a,b)`
    ///
    /// # Errors
    ///
    /// Returns `FormatError::InvalidOperationDescriptor` for a missing name,
    /// unbalanced parentheses or a dangling escape.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let invalid = |message: &str| FormatError::InvalidOperationDescriptor {
            input: input.to_string(),
            message: message.to_string(),
        };

        let trimmed = input.trim();
        let open = trimmed.find('(').ok_or_else(|| invalid("missing '('"))?;
        let name = trimmed[..open].trim();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(invalid("missing or malformed operation name").into());
        }

        let mut arguments = Vec::new();
        let mut current = String::new();
        let mut chars = trimmed[open + 1..].chars();
        let mut closed = false;
        let mut saw_separator = false;

        while let Some(ch) = chars.next() {
            match ch {
                '\\' => {
                    let escaped = chars.next().ok_or_else(|| invalid("dangling escape"))?;
                    current.push(escaped);
                }
                ',' => {
                    arguments.push(std::mem::take(&mut current));
                    saw_separator = true;
                }
                '(' => return Err(invalid("unescaped '(' inside arguments").into()),
                ')' => {
                    closed = true;
                    break;
                }
                other => current.push(other),
            }
        }

        if !closed {
            return Err(invalid("missing ')'").into());
        }
        if !chars.as_str().trim().is_empty() {
            return Err(invalid("trailing characters after ')'").into());
        }
        if saw_separator || !current.is_empty() {
            arguments.push(current);
        }

        Ok(Self {
            name: name.to_string(),
            arguments,
        })
    }
}

fn escape(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len());
    for ch in arg.chars() {
        if matches!(ch, ',' | '(' | ')' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.arguments.iter().map(|a| escape(a)).collect();
        write!(f, "{}({})", self.name, args.join(","))
    }
}

impl FromStr for OperationDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let op = OperationDescriptor::parse("Copy(/a/b,/c/d)").unwrap();
        assert_eq!(op.name, "Copy");
        assert_eq!(op.arguments, vec!["/a/b", "/c/d"]);
    }

    #[test]
    fn test_parse_escapes() {
        let op = OperationDescriptor::parse(r"Replace(file,a\,b,c\(d\))").unwrap();
        assert_eq!(op.arguments, vec!["file", "a,b", "c(d)"]);
        assert_eq!(op.to_string(), r"Replace(file,a\,b,c\(d\))");
    }

    #[test]
    fn test_empty_arguments() {
        assert!(OperationDescriptor::parse("Noop()").unwrap().arguments.is_empty());
        assert_eq!(
            OperationDescriptor::parse("Pair(,)").unwrap().arguments,
            vec!["", ""]
        );
    }

    #[test]
    fn test_malformed() {
        for input in ["Copy", "(a,b)", "Copy(a,b", r"Copy(a\", "Copy(a)b", "Co py(a)"] {
            assert!(OperationDescriptor::parse(input).is_err(), "{input}");
        }
    }
}
