use crate::model::Value;
use std::fmt;

/// A `{Invocation Name}.output.field...` reference to an earlier result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathRef {
    pub invocation: String,
    pub output: String,
    /// Field path walked from the output when it is a record.
    pub fields: Vec<String>,
}

impl fmt::Display for PathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}.{}", self.invocation, self.output)?;
        for field in &self.fields {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

/// The parsed form of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Logical
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),

    // Comparison
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    SmallerThan(Box<Expression>, Box<Expression>),
    SmallerThanOrEqual(Box<Expression>, Box<Expression>),

    // Leaf nodes
    Literal(Value),
    Reference(PathRef),
}

impl Expression {
    /// Collects every reference in the tree, in source order.
    pub fn collect_references<'a>(&'a self, refs: &mut Vec<&'a PathRef>) {
        match self {
            Expression::Reference(path) => refs.push(path),
            Expression::Not(inner) => inner.collect_references(refs),
            Expression::And(l, r)
            | Expression::Or(l, r)
            | Expression::Equal(l, r)
            | Expression::NotEqual(l, r)
            | Expression::GreaterThan(l, r)
            | Expression::GreaterThanOrEqual(l, r)
            | Expression::SmallerThan(l, r)
            | Expression::SmallerThanOrEqual(l, r) => {
                l.collect_references(refs);
                r.collect_references(refs);
            }
            Expression::Literal(_) => {}
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Reference(path) => write!(f, "{}", path),
            Expression::Not(inner) => write!(f, "not ({})", inner),
            Expression::And(l, r) => write!(f, "({} and {})", l, r),
            Expression::Or(l, r) => write!(f, "({} or {})", l, r),
            Expression::Equal(l, r) => write!(f, "{} = {}", l, r),
            Expression::NotEqual(l, r) => write!(f, "{} <> {}", l, r),
            Expression::GreaterThan(l, r) => write!(f, "{} > {}", l, r),
            Expression::GreaterThanOrEqual(l, r) => write!(f, "{} >= {}", l, r),
            Expression::SmallerThan(l, r) => write!(f, "{} < {}", l, r),
            Expression::SmallerThanOrEqual(l, r) => write!(f, "{} <= {}", l, r),
        }
    }
}
