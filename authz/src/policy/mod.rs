//! Policy expressions as returned by the authority.
//!
//! On the wire a policy is a tree of `{"op", "content"}` combinator nodes and
//! `{"op", "field", "value"}` leaves. It is parsed into [`Policy`], a tagged
//! variant, so that the compiler and the evaluator match on it exhaustively.

pub mod eval;

use crate::error::{AuthzError, Result};
use crate::iam::TypeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use eval::evaluate;

/// Boolean combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// Leaf operators. Unknown operators are kept so that compiling them fails
/// with a precise error instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    In,
    NotIn,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Lt,
    Lte,
    Gt,
    Gte,
    Any,
    Other(String),
}

impl Operator {
    pub fn parse(op: &str) -> Self {
        match op {
            "eq" => Operator::Eq,
            "not_eq" => Operator::NotEq,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            "contains" => Operator::Contains,
            "not_contains" => Operator::NotContains,
            "starts_with" => Operator::StartsWith,
            "not_starts_with" => Operator::NotStartsWith,
            "ends_with" => Operator::EndsWith,
            "not_ends_with" => Operator::NotEndsWith,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "any" => Operator::Any,
            other => Operator::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::NotEq => "not_eq",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::StartsWith => "starts_with",
            Operator::NotStartsWith => "not_starts_with",
            Operator::EndsWith => "ends_with",
            Operator::NotEndsWith => "not_ends_with",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Any => "any",
            Operator::Other(op) => op,
        }
    }

    /// Negated operators hold when none of a multi-valued attribute matches.
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Operator::NotEq
                | Operator::NotIn
                | Operator::NotContains
                | Operator::NotStartsWith
                | Operator::NotEndsWith
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<resource type>.<attribute>` reference of a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub resource_type: TypeId,
    pub attribute: String,
}

impl Field {
    pub fn new(resource_type: TypeId, attribute: impl Into<String>) -> Self {
        Self {
            resource_type,
            attribute: attribute.into(),
        }
    }

    pub fn parse(field: &str) -> Result<Self> {
        let (resource_type, attribute) = field
            .split_once('.')
            .filter(|(rt, attr)| !rt.is_empty() && !attr.is_empty())
            .ok_or_else(|| AuthzError::InvalidPolicy(format!("invalid policy field {}", field)))?;
        Ok(Self::new(TypeId::new(resource_type), attribute))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.attribute)
    }
}

/// A leaf: one attribute compared with a literal or an array.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub field: Field,
    pub op: Operator,
    pub value: Value,
}

/// A policy expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Policy {
    /// Everything of the action's resource types.
    Any,
    Combinator {
        op: Combinator,
        content: Vec<Policy>,
    },
    Leaf(FieldValue),
}

impl Policy {
    pub fn leaf(field: Field, op: Operator, value: Value) -> Self {
        Policy::Leaf(FieldValue { field, op, value })
    }

    pub fn and(content: Vec<Policy>) -> Self {
        Policy::Combinator {
            op: Combinator::And,
            content,
        }
    }

    pub fn or(content: Vec<Policy>) -> Self {
        Policy::Combinator {
            op: Combinator::Or,
            content,
        }
    }

    /// Parses a wire expression. An empty operator means "no policy".
    pub fn from_raw(raw: RawPolicy) -> Result<Option<Policy>> {
        match raw.op.as_str() {
            "" => Ok(None),
            "any" => Ok(Some(Policy::Any)),
            "AND" | "OR" => {
                let op = if raw.op == "AND" {
                    Combinator::And
                } else {
                    Combinator::Or
                };
                let content = raw.content.unwrap_or_default();
                if content.is_empty() {
                    return Err(AuthzError::InvalidPolicy(format!(
                        "filter op {} content can't be empty",
                        raw.op
                    )));
                }
                let mut children = Vec::with_capacity(content.len());
                for child in content {
                    if let Some(child) = Policy::from_raw(child)? {
                        children.push(child);
                    }
                }
                if children.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Policy::Combinator {
                    op,
                    content: children,
                }))
            }
            op => {
                if raw.content.is_some() {
                    return Err(AuthzError::InvalidPolicy(format!(
                        "invalid policy with unknown element for op {}",
                        op
                    )));
                }
                let field = raw.field.ok_or_else(|| {
                    AuthzError::InvalidPolicy(format!("filter op {} has no field", op))
                })?;
                Ok(Some(Policy::leaf(
                    Field::parse(&field)?,
                    Operator::parse(op),
                    raw.value.unwrap_or(Value::Null),
                )))
            }
        }
    }

    /// Parses a JSON expression. `null` and `{}` mean "no policy".
    pub fn from_value(value: Value) -> Result<Option<Policy>> {
        if value.is_null() {
            return Ok(None);
        }
        let raw: RawPolicy = serde_json::from_value(value)
            .map_err(|e| AuthzError::InvalidPolicy(e.to_string()))?;
        Policy::from_raw(raw)
    }

    pub fn to_raw(&self) -> RawPolicy {
        match self {
            Policy::Any => RawPolicy {
                op: "any".to_string(),
                content: None,
                field: Some(String::new()),
                value: Some(Value::Array(Vec::new())),
            },
            Policy::Combinator { op, content } => RawPolicy {
                op: op.as_str().to_string(),
                content: Some(content.iter().map(Policy::to_raw).collect()),
                field: None,
                value: None,
            },
            Policy::Leaf(leaf) => RawPolicy {
                op: leaf.op.as_str().to_string(),
                content: None,
                field: Some(leaf.field.to_string()),
                value: Some(leaf.value.clone()),
            },
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self.to_raw()).unwrap_or(Value::Null)
    }
}

/// Wire form of a policy expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPolicy {
    #[serde(default)]
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<RawPolicy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Policy of one action, as returned by `query_by_actions`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPolicy {
    pub action: String,
    pub policy: Option<Policy>,
}
