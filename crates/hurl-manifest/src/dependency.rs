//! Dependency entries such as `bar >= 1.2`.

use std::fmt;

use serde::Serialize;

/// A version comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "=")]
    Eq,
}

impl Operator {
    /// Search order. Two-character operators come first so `>=` is never
    /// read as `>`.
    pub const ALL: [Operator; 5] = [
        Operator::Ge,
        Operator::Le,
        Operator::Gt,
        Operator::Lt,
        Operator::Eq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed dependency. Serializes as `[name]` or `[name, op, version]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "Vec<String>")]
pub struct Dependency {
    pub name: String,
    pub constraint: Option<(Operator, String)>,
}

impl Dependency {
    pub fn parts(&self) -> Vec<String> {
        match &self.constraint {
            None => vec![self.name.clone()],
            Some((op, version)) => vec![self.name.clone(), op.as_str().to_string(), version.clone()],
        }
    }
}

impl From<Dependency> for Vec<String> {
    fn from(dep: Dependency) -> Self {
        dep.parts()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            None => f.write_str(&self.name),
            Some((op, version)) => write!(f, "{} {op} {version}", self.name),
        }
    }
}

/// Split a dependency string at the first operator, in [`Operator::ALL`]
/// order, that it contains. Name and version are trimmed; a string with no
/// operator is the bare name, untouched.
pub fn parse_dependency(dep: &str) -> Dependency {
    for op in Operator::ALL {
        if let Some((name, version)) = dep.split_once(op.as_str()) {
            return Dependency {
                name: name.trim().to_string(),
                constraint: Some((op, version.trim().to_string())),
            };
        }
    }
    Dependency {
        name: dep.to_string(),
        constraint: None,
    }
}
