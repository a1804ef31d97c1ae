//! Class expressions used as node types.
//!
//! A node's type set holds named classes as well as structured expressions
//! (existential restrictions, intersections, unions, complements). Expressions
//! are totally ordered so type sets compare exactly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::Iri;

/// A type expression asserted on an individual.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClassExpr {
    /// A named class.
    Named { id: Iri },
    /// `property some filler`.
    SomeValuesFrom {
        property: Iri,
        filler: Box<ClassExpr>,
    },
    /// `A and B and ...`.
    Intersection { operands: Vec<ClassExpr> },
    /// `A or B or ...`.
    Union { operands: Vec<ClassExpr> },
    /// `not A`.
    Complement { operand: Box<ClassExpr> },
}

impl ClassExpr {
    pub fn named(id: impl Into<Iri>) -> Self {
        ClassExpr::Named { id: id.into() }
    }

    pub fn some_values_from(property: impl Into<Iri>, filler: ClassExpr) -> Self {
        ClassExpr::SomeValuesFrom {
            property: property.into(),
            filler: Box::new(filler),
        }
    }

    /// Returns `true` for a plain named class.
    pub fn is_named(&self) -> bool {
        matches!(self, ClassExpr::Named { .. })
    }

    /// Collects every class and property IRI mentioned by the expression.
    pub fn signature(&self) -> Vec<&Iri> {
        let mut out = Vec::new();
        self.collect_signature(&mut out);
        out
    }

    fn collect_signature<'a>(&'a self, out: &mut Vec<&'a Iri>) {
        match self {
            ClassExpr::Named { id } => out.push(id),
            ClassExpr::SomeValuesFrom { property, filler } => {
                out.push(property);
                filler.collect_signature(out);
            }
            ClassExpr::Intersection { operands } | ClassExpr::Union { operands } => {
                for operand in operands {
                    operand.collect_signature(out);
                }
            }
            ClassExpr::Complement { operand } => operand.collect_signature(out),
        }
    }
}

impl From<Iri> for ClassExpr {
    fn from(id: Iri) -> Self {
        ClassExpr::Named { id }
    }
}

impl fmt::Display for ClassExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassExpr::Named { id } => write!(f, "{}", id),
            ClassExpr::SomeValuesFrom { property, filler } => {
                write!(f, "({} some {})", property, filler)
            }
            ClassExpr::Intersection { operands } => write_joined(f, operands, " and "),
            ClassExpr::Union { operands } => write_joined(f, operands, " or "),
            ClassExpr::Complement { operand } => write!(f, "(not {})", operand),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, operands: &[ClassExpr], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", operand)?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nested_expression() {
        let expr = ClassExpr::Intersection {
            operands: vec![
                ClassExpr::named("GO:1"),
                ClassExpr::some_values_from("BFO:50", ClassExpr::named("GO:2")),
            ],
        };
        assert_eq!(expr.to_string(), "(GO:1 and (BFO:50 some GO:2))");
    }

    #[test]
    fn signature_lists_classes_and_properties() {
        let expr = ClassExpr::Complement {
            operand: Box::new(ClassExpr::some_values_from("p", ClassExpr::named("c"))),
        };
        let sig: Vec<&str> = expr.signature().into_iter().map(|i| i.as_str()).collect();
        assert_eq!(sig, vec!["p", "c"]);
    }

    #[test]
    fn tagged_json_shape() {
        let json = serde_json::to_value(ClassExpr::named("GO:1")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "named", "id": "GO:1"}));
    }
}
