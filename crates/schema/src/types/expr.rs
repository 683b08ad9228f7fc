//! Type-name syntax.
//!
//! Type names are either plain registered names (`float`, `interval`) or
//! parametric combinators applied to other type names:
//!
//! ```text
//! maybe[T]   list[T]   map[T]   tree[T]   union[T, U, ...]
//! ```
//!
//! Combinators nest (`map[list[float]]`) and whitespace around names and
//! brackets is ignored. Parsing is purely syntactic; whether a plain name is
//! registered is decided by the registry at lookup time.

use std::fmt;

use chumsky::prelude::*;
use tracing::trace;

/// Parsed form of a type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named(String),
    Maybe(Box<TypeExpr>),
    List(Box<TypeExpr>),
    Map(Box<TypeExpr>),
    Tree(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
}

impl TypeExpr {
    /// Parse a type name. Returns `None` for malformed names, including
    /// names nested deeper than [`MAX_NESTING`].
    ///
    /// ```
    /// # use bigraph_schema::types::TypeExpr;
    /// let expr = TypeExpr::parse("map[ list[float] ]").unwrap();
    /// assert_eq!(expr.to_string(), "map[list[float]]");
    /// assert!(TypeExpr::parse("map[float").is_none());
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        let depth = nesting(name);
        if depth > MAX_NESTING {
            trace!(depth, "type name nested too deeply");
            return None;
        }
        type_expr().then_ignore(end()).parse(name).into_result().ok()
    }

    /// Whether this is a combinator rather than a plain name.
    pub fn is_parametric(&self) -> bool {
        !matches!(self, TypeExpr::Named(_))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Maybe(inner) => write!(f, "maybe[{}]", inner),
            TypeExpr::List(inner) => write!(f, "list[{}]", inner),
            TypeExpr::Map(inner) => write!(f, "map[{}]", inner),
            TypeExpr::Tree(inner) => write!(f, "tree[{}]", inner),
            TypeExpr::Union(options) => {
                let parts: Vec<String> = options.iter().map(TypeExpr::to_string).collect();
                write!(f, "union[{}]", parts.join(","))
            }
        }
    }
}

type ParseError<'src> = Rich<'src, char>;

/// Deepest combinator nesting accepted by [`TypeExpr::parse`].
pub const MAX_NESTING: usize = 64;

fn nesting(name: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    for c in name.chars() {
        match c {
            '[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// Registered name or combinator keyword.
fn name<'src>() -> impl Parser<'src, &'src str, String, extra::Err<ParseError<'src>>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &str| s.to_string())
}

fn combinator(name: &str, mut args: Vec<TypeExpr>) -> Option<TypeExpr> {
    if name == "union" {
        return Some(TypeExpr::Union(args));
    }
    let inner = match args.len() {
        1 => Box::new(args.pop()?),
        _ => return None,
    };
    match name {
        "maybe" => Some(TypeExpr::Maybe(inner)),
        "list" => Some(TypeExpr::List(inner)),
        "map" => Some(TypeExpr::Map(inner)),
        "tree" => Some(TypeExpr::Tree(inner)),
        _ => None,
    }
}

fn type_expr<'src>() -> impl Parser<'src, &'src str, TypeExpr, extra::Err<ParseError<'src>>> + Clone {
    recursive(|type_expr_recurse| {
        name()
            .padded()
            .then(
                type_expr_recurse
                    .separated_by(just(','))
                    .at_least(1)
                    .collect::<Vec<_>>()
                    .delimited_by(just('['), just(']'))
                    .or_not(),
            )
            .try_map(|(name, args), span| match args {
                None => Ok(TypeExpr::Named(name)),
                Some(args) => {
                    let arity = args.len();
                    combinator(&name, args)
                        .ok_or_else(|| Rich::custom(span, format!("'{name}' does not take {arity} argument(s)")))
                }
            })
            .padded()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_name() {
        assert_eq!(TypeExpr::parse("float"), Some(TypeExpr::Named("float".into())));
    }

    #[test]
    fn test_parse_nested_combinators() {
        let expr = TypeExpr::parse("maybe[map[list[integer]]]").unwrap();
        assert_eq!(
            expr,
            TypeExpr::Maybe(Box::new(TypeExpr::Map(Box::new(TypeExpr::List(Box::new(
                TypeExpr::Named("integer".into())
            ))))))
        );
    }

    #[test]
    fn test_parse_union() {
        let expr = TypeExpr::parse("union[integer, string]").unwrap();
        assert_eq!(expr.to_string(), "union[integer,string]");
    }

    #[test]
    fn test_reject_malformed_names() {
        for name in ["", "map[]", "map[float", "list[a,b]", "float]", "nope[float]", "fl oat"] {
            assert!(TypeExpr::parse(name).is_none(), "{name} should not parse");
        }
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}float{}", "maybe[".repeat(depth), "]".repeat(depth));
        assert!(TypeExpr::parse(&nested(MAX_NESTING)).is_some());
        assert!(TypeExpr::parse(&nested(MAX_NESTING + 1)).is_none());
        assert!(TypeExpr::parse(&nested(200_000)).is_none());
    }
}
