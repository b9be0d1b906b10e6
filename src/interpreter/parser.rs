//! Parser for compiled assignment documents.
//!
//! Documents are JSON trees of `{"op": <name>, ...fields}` objects. Bare
//! scalars are literals; bare arrays are lists whose elements are parsed as
//! nodes (all-literal arrays collapse into a single literal).

use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

use crate::error::{AssignmentError, AssignmentResult};

use super::ast::{CondBranch, Node, OpKind};
use super::value::Value;

/// Parse a compiled document into a [`Node`] tree.
pub fn parse_node(doc: &Json) -> AssignmentResult<Node> {
    match doc {
        Json::Array(items) => {
            let nodes = items.iter().map(parse_node).collect::<AssignmentResult<Vec<_>>>()?;
            if nodes.iter().all(|node| matches!(node, Node::Literal(_))) {
                let values = nodes
                    .into_iter()
                    .filter_map(|node| match node {
                        Node::Literal(value) => Some(value),
                        _ => None,
                    })
                    .collect();
                return Ok(Node::Literal(Value::List(values)));
            }
            Ok(Node::List(nodes))
        }
        Json::Object(fields) => parse_object(fields),
        scalar => Ok(Node::Literal(Value::from_json(scalar))),
    }
}

fn parse_object(fields: &Map<String, Json>) -> AssignmentResult<Node> {
    let op = match fields.get("op") {
        Some(Json::String(name)) => name.as_str(),
        Some(other) => {
            return Err(validation(format!(
                "operator name must be a string, found {}",
                other
            )));
        }
        None => return Err(validation("object node is missing the 'op' field")),
    };

    match op {
        "literal" => Ok(Node::Literal(
            fields.get("value").map(Value::from_json).unwrap_or_default(),
        )),
        "get" => Ok(Node::Get(var_name(fields, "get")?)),
        "set" => {
            let var = var_name(fields, "set")?;
            let value = required(fields, "set", "value")?;
            Ok(Node::Set {
                var,
                value: Box::new(parse_node(value)?),
            })
        }
        "seq" => match required(fields, "seq", "seq")? {
            Json::Array(statements) => Ok(Node::Seq(
                statements.iter().map(parse_node).collect::<AssignmentResult<_>>()?,
            )),
            other => Err(validation(format!("seq expects an array, found {}", other))),
        },
        "cond" => parse_cond(fields),
        "return" => {
            let value = fields.get("value").map(parse_node).transpose()?;
            Ok(Node::Return(Box::new(
                value.unwrap_or(Node::Literal(Value::Boolean(true))),
            )))
        }
        name => {
            let kind: OpKind = name.parse()?;
            let mut args = BTreeMap::new();
            for (key, value) in fields {
                if key != "op" {
                    args.insert(key.clone(), parse_node(value)?);
                }
            }
            Ok(Node::Operator { kind, args })
        }
    }
}

fn parse_cond(fields: &Map<String, Json>) -> AssignmentResult<Node> {
    let arms = match required(fields, "cond", "cond")? {
        Json::Array(arms) => arms,
        other => {
            return Err(validation(format!("cond expects an array, found {}", other)));
        }
    };

    let mut branches = Vec::with_capacity(arms.len());
    for arm in arms {
        let Json::Object(arm) = arm else {
            return Err(validation(format!(
                "cond branch must be an object, found {}",
                arm
            )));
        };
        branches.push(CondBranch {
            when: parse_node(required(arm, "cond", "if")?)?,
            then: parse_node(required(arm, "cond", "then")?)?,
        });
    }

    let otherwise = fields
        .get("else")
        .map(parse_node)
        .transpose()?
        .map(Box::new);
    Ok(Node::Cond {
        branches,
        otherwise,
    })
}

fn var_name(fields: &Map<String, Json>, op: &str) -> AssignmentResult<String> {
    match required(fields, op, "var")? {
        Json::String(name) => Ok(name.clone()),
        other => Err(validation(format!(
            "{} expects a string 'var', found {}",
            op, other
        ))),
    }
}

fn required<'a>(fields: &'a Map<String, Json>, op: &str, key: &str) -> AssignmentResult<&'a Json> {
    fields
        .get(key)
        .ok_or_else(|| validation(format!("{} is missing the '{}' field", op, key)))
}

fn validation(message: impl Into<String>) -> AssignmentError {
    AssignmentError::Validation(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::ast::PureOp;
    use crate::random::RandomOpKind;
    use serde_json::json;

    #[test]
    fn parses_set_with_random_operator() {
        let node = parse_node(&json!({
            "op": "set",
            "var": "foo",
            "value": {"op": "uniformChoice", "choices": ["a", "b"], "unit": {"op": "get", "var": "i"}}
        }))
        .unwrap();

        let Node::Set { var, value } = node else {
            panic!("expected set node");
        };
        assert_eq!(var, "foo");
        let Node::Operator { kind, args } = *value else {
            panic!("expected operator node");
        };
        assert_eq!(kind, OpKind::Random(RandomOpKind::UniformChoice));
        assert_eq!(args["choices"], Node::Literal(Value::from(vec!["a", "b"])));
        assert_eq!(args["unit"], Node::Get("i".to_string()));
    }

    #[test]
    fn mixed_arrays_stay_lists() {
        let node = parse_node(&json!([1, {"op": "get", "var": "x"}])).unwrap();
        assert_eq!(
            node,
            Node::List(vec![Node::Literal(Value::Integer(1)), Node::Get("x".into())])
        );
    }

    #[test]
    fn parses_cond_with_else() {
        let node = parse_node(&json!({
            "op": "cond",
            "cond": [{"if": {"op": "equals", "left": 1, "right": 1}, "then": {"op": "set", "var": "x", "value": 1}}],
            "else": {"op": "set", "var": "x", "value": 2}
        }))
        .unwrap();
        let Node::Cond { branches, otherwise } = node else {
            panic!("expected cond node");
        };
        assert_eq!(branches.len(), 1);
        assert!(matches!(
            branches[0].when,
            Node::Operator { kind: OpKind::Pure(PureOp::Equals), .. }
        ));
        assert!(otherwise.is_some());
    }

    #[test]
    fn literal_op_keeps_structured_values() {
        let node = parse_node(&json!({"op": "literal", "value": {"k": [1, 2]}})).unwrap();
        assert!(matches!(node, Node::Literal(Value::Map(_))));
    }

    #[test]
    fn unknown_operator_is_unsupported() {
        let err = parse_node(&json!({"op": "quantumChoice", "choices": [1]})).unwrap_err();
        assert_eq!(err, AssignmentError::UnsupportedOperator("quantumChoice".into()));
    }

    #[test]
    fn malformed_nodes_fail_validation() {
        for doc in [
            json!({"var": "x"}),
            json!({"op": "set", "value": 1}),
            json!({"op": "seq", "seq": 3}),
            json!({"op": 7}),
            json!({"op": "cond", "cond": [{"then": 1}]}),
        ] {
            assert!(
                matches!(parse_node(&doc), Err(AssignmentError::Validation(_))),
                "expected validation error for {}",
                doc
            );
        }
    }
}
