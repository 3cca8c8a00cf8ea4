//! Handler registry: one pure evaluation function per operation kind.
//!
//! Every handler receives the scene, the outputs of the node's inputs and the
//! node's literal side inputs, and returns the node's output. Arity and
//! operand variants are checked up front; a mismatch is a contract violation,
//! not an `Invalid` answer.

use crate::error::{EvalError, EvalResult};
use kiwi_types::{AttrValue, Attribute, OpKind, Relationships, Scene, SceneObject, Value};
use std::collections::BTreeSet;

/// Operands of one handler call.
#[derive(Debug, Clone, Copy)]
pub struct HandlerArgs<'a> {
    pub kind: OpKind,
    pub scene: &'a Scene,
    pub inputs: &'a [Value],
    pub side_inputs: &'a [String],
}

impl<'a> HandlerArgs<'a> {
    pub fn new(
        kind: OpKind,
        scene: &'a Scene,
        inputs: &'a [Value],
        side_inputs: &'a [String],
    ) -> Self {
        Self {
            kind,
            scene,
            inputs,
            side_inputs,
        }
    }

    fn arity(&self, inputs: usize, side_inputs: usize) -> EvalResult<()> {
        if self.inputs.len() != inputs {
            return Err(EvalError::InputArity {
                kind: self.kind,
                expected: inputs,
                got: self.inputs.len(),
            });
        }
        if self.side_inputs.len() != side_inputs {
            return Err(EvalError::SideInputArity {
                kind: self.kind,
                expected: side_inputs,
                got: self.side_inputs.len(),
            });
        }
        Ok(())
    }

    fn input(&self, i: usize) -> EvalResult<&'a Value> {
        self.inputs.get(i).ok_or(EvalError::InputArity {
            kind: self.kind,
            expected: i + 1,
            got: self.inputs.len(),
        })
    }

    fn side(&self, i: usize) -> EvalResult<&'a str> {
        self.side_inputs
            .get(i)
            .map(String::as_str)
            .ok_or(EvalError::SideInputArity {
                kind: self.kind,
                expected: i + 1,
                got: self.side_inputs.len(),
            })
    }

    fn mismatch(&self, expected: &'static str, got: &Value) -> EvalError {
        EvalError::TypeMismatch {
            kind: self.kind,
            expected,
            got: got.type_name(),
        }
    }

    fn list(&self, i: usize) -> EvalResult<&'a [usize]> {
        let value = self.input(i)?;
        value
            .as_objects()
            .ok_or_else(|| self.mismatch("object list", value))
    }

    fn index(&self, i: usize) -> EvalResult<usize> {
        let value = self.input(i)?;
        value.as_object().ok_or_else(|| self.mismatch("object", value))
    }

    fn integer(&self, i: usize) -> EvalResult<i64> {
        let value = self.input(i)?;
        value.as_integer().ok_or_else(|| self.mismatch("integer", value))
    }

    fn object(&self, idx: usize) -> EvalResult<&'a SceneObject> {
        self.scene.object(idx).ok_or(EvalError::UnknownObject(idx))
    }

    fn attribute(&self, idx: usize, attribute: Attribute) -> EvalResult<&'a AttrValue> {
        self.object(idx)?
            .attribute(attribute)
            .ok_or(EvalError::MissingAttribute {
                object: idx,
                attribute,
            })
    }
}

/// Evaluate one node.
///
/// `query_text_q` reads run state rather than the scene and has no handler
/// here; the executor answers it directly.
pub fn dispatch(args: &HandlerArgs<'_>) -> EvalResult<Value> {
    match args.kind {
        OpKind::Scene => scene(args),
        OpKind::Filter(attribute) => filter(args, attribute),
        OpKind::Unique => unique(args),
        OpKind::Relate => relate(args),
        OpKind::RelateTriple => relate_triple(args),
        OpKind::Union => set_op(args, |a, b| a.union(b).copied().collect()),
        OpKind::Intersect => set_op(args, |a, b| a.intersection(b).copied().collect()),
        OpKind::Count => count(args),
        OpKind::Query(attribute) => query(args, attribute),
        OpKind::QueryTextTerminal => query_text_terminal(args),
        OpKind::Exist => exist(args),
        OpKind::Equal(_) => equal(args),
        OpKind::LessThan => compare(args, |a, b| a < b),
        OpKind::GreaterThan => compare(args, |a, b| a > b),
        OpKind::Same(attribute) => same(args, attribute),
        OpKind::QueryTextQuestion => Err(EvalError::NoHandler(args.kind)),
    }
}

// ── Object sets ──────────────────────────────────────────────────────────────

fn scene(args: &HandlerArgs<'_>) -> EvalResult<Value> {
    Ok(Value::Objects((0..args.scene.len()).collect()))
}

fn filter(args: &HandlerArgs<'_>, attribute: Attribute) -> EvalResult<Value> {
    args.arity(1, 1)?;
    let literal = args.side(0)?;
    let mut kept = Vec::new();
    for &idx in args.list(0)? {
        if attribute_matches(args.attribute(idx, attribute)?, literal) {
            kept.push(idx);
        }
    }
    Ok(Value::Objects(kept))
}

/// Whether `literal` equals or is contained in an attribute value.
///
/// Tokens and text bodies match by substring (equality being the whole-string
/// case); token lists match by membership.
pub fn attribute_matches(value: &AttrValue, literal: &str) -> bool {
    match value {
        AttrValue::Token(token) => token.contains(literal),
        AttrValue::Tokens(tokens) => tokens.iter().any(|t| t == literal),
        AttrValue::Text(text) => text.body.contains(literal),
        AttrValue::Other(_) => false,
    }
}

fn unique(args: &HandlerArgs<'_>) -> EvalResult<Value> {
    args.arity(1, 0)?;
    match args.list(0)? {
        [only] => Ok(Value::Object(*only)),
        _ => Ok(Value::Invalid),
    }
}

fn set_op(
    args: &HandlerArgs<'_>,
    op: fn(&BTreeSet<usize>, &BTreeSet<usize>) -> Vec<usize>,
) -> EvalResult<Value> {
    args.arity(2, 0)?;
    let a: BTreeSet<usize> = args.list(0)?.iter().copied().collect();
    let b: BTreeSet<usize> = args.list(1)?.iter().copied().collect();
    Ok(Value::Objects(op(&a, &b)))
}

// ── Relations ────────────────────────────────────────────────────────────────

fn relate(args: &HandlerArgs<'_>) -> EvalResult<Value> {
    args.arity(1, 1)?;
    let idx = args.index(0)?;
    let relation = args.side(0)?;
    let Relationships::Adjacency(relations) = args.scene.relationships() else {
        return Err(shape_error(args, "adjacency"));
    };
    let related = relations
        .get(relation)
        .ok_or_else(|| EvalError::UnknownRelation(relation.to_string()))?
        .get(idx)
        .ok_or(EvalError::UnknownObject(idx))?;
    let mut out = related.clone();
    out.sort_unstable();
    out.dedup();
    Ok(Value::Objects(out))
}

fn relate_triple(args: &HandlerArgs<'_>) -> EvalResult<Value> {
    args.arity(1, 1)?;
    let idx = args.index(0)?;
    let predicate = args.side(0)?;
    let Relationships::Triples(triples) = args.scene.relationships() else {
        return Err(shape_error(args, "triple"));
    };
    let related: BTreeSet<usize> = triples
        .iter()
        .filter(|t| t.subject_idx == idx && t.predicate == predicate)
        .map(|t| t.object_idx)
        .collect();
    Ok(Value::Objects(related.into_iter().collect()))
}

fn shape_error(args: &HandlerArgs<'_>, expected: &'static str) -> EvalError {
    EvalError::RelationshipShape {
        kind: args.kind,
        expected,
        found: args.scene.relationships().shape_name(),
    }
}

// ── Queries ──────────────────────────────────────────────────────────────────

fn count(args: &HandlerArgs<'_>) -> EvalResult<Value> {
    args.arity(1, 0)?;
    Ok(Value::Integer(args.list(0)?.len() as i64))
}

fn exist(args: &HandlerArgs<'_>) -> EvalResult<Value> {
    args.arity(1, 0)?;
    Ok(Value::Bool(!args.list(0)?.is_empty()))
}

fn query(args: &HandlerArgs<'_>, attribute: Attribute) -> EvalResult<Value> {
    args.arity(1, 0)?;
    let idx = args.index(0)?;
    match args.attribute(idx, attribute)? {
        AttrValue::Token(token) => Ok(Value::Literal(token.clone())),
        AttrValue::Tokens(tokens) => match tokens.as_slice() {
            [only] => Ok(Value::Literal(only.clone())),
            _ => Ok(Value::Invalid),
        },
        AttrValue::Text(text) => Ok(Value::Literal(text.body.clone())),
        AttrValue::Other(_) => Err(EvalError::NonLiteralAttribute {
            object: idx,
            attribute,
        }),
    }
}

fn query_text_terminal(args: &HandlerArgs<'_>) -> EvalResult<Value> {
    args.arity(1, 0)?;
    let idx = args.index(0)?;
    let body = args
        .object(idx)?
        .text_body()
        .ok_or(EvalError::MissingAttribute {
            object: idx,
            attribute: Attribute::Text,
        })?;
    Ok(Value::literal(body))
}

// ── Comparisons ──────────────────────────────────────────────────────────────

fn equal(args: &HandlerArgs<'_>) -> EvalResult<Value> {
    args.arity(2, 0)?;
    Ok(Value::Bool(args.input(0)? == args.input(1)?))
}

fn compare(args: &HandlerArgs<'_>, op: fn(i64, i64) -> bool) -> EvalResult<Value> {
    args.arity(2, 0)?;
    Ok(Value::Bool(op(args.integer(0)?, args.integer(1)?)))
}

// ── Same-attribute ───────────────────────────────────────────────────────────

fn same(args: &HandlerArgs<'_>, attribute: Attribute) -> EvalResult<Value> {
    args.arity(1, 0)?;
    let idx = args.index(0)?;
    let index = match args.scene.same_attribute_index(attribute) {
        Some(index) => index,
        None => {
            let built = build_same_index(args.scene, attribute)?;
            args.scene.init_same_attribute_index(attribute, built)
        }
    };
    let others = index.get(idx).ok_or(EvalError::UnknownObject(idx))?;
    Ok(Value::Objects(others.clone()))
}

/// For every object, the other objects with an equal `attribute` value, in
/// ascending order.
fn build_same_index(scene: &Scene, attribute: Attribute) -> EvalResult<Vec<Vec<usize>>> {
    let values = scene
        .objects()
        .iter()
        .enumerate()
        .map(|(object, obj)| {
            obj.attribute(attribute)
                .ok_or(EvalError::MissingAttribute { object, attribute })
        })
        .collect::<EvalResult<Vec<_>>>()?;

    let index: Vec<Vec<usize>> = values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            values
                .iter()
                .enumerate()
                .filter(|&(j, other)| i != j && value == other)
                .map(|(j, _)| j)
                .collect()
        })
        .collect();
    tracing::trace!(%attribute, objects = values.len(), "built same-attribute index");
    Ok(index)
}
