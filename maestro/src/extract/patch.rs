//! JSON patch application: `add`, `replace` and `remove` over JSON pointers.

use crate::error::PatchError;
use crate::tool::PatchOp;
use serde_json::Value;

/// Apply operations in order. On error the document may be partially patched,
/// so callers patch a copy.
pub fn apply(doc: &mut Value, ops: &[PatchOp]) -> Result<(), PatchError> {
    for op in ops {
        apply_one(doc, op)?;
    }
    Ok(())
}

fn apply_one(doc: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    let tokens = parse_pointer(&op.path)?;
    match op.op.as_str() {
        "add" => {
            let value = required_value(op)?;
            match tokens.split_last() {
                None => *doc = value,
                Some((last, parent)) => insert(resolve_mut(doc, parent, &op.path)?, last, value, &op.path)?,
            }
        }
        "replace" => {
            let value = required_value(op)?;
            let target = resolve_mut(doc, &tokens, &op.path)?;
            *target = value;
        }
        "remove" => match tokens.split_last() {
            None => *doc = Value::Null,
            Some((last, parent)) => remove(resolve_mut(doc, parent, &op.path)?, last, &op.path)?,
        },
        other => return Err(PatchError::UnsupportedOp(other.to_string())),
    }
    Ok(())
}

fn required_value(op: &PatchOp) -> Result<Value, PatchError> {
    op.value
        .clone()
        .ok_or_else(|| PatchError::MissingValue(op.path.clone()))
}

fn parse_pointer(path: &str) -> Result<Vec<String>, PatchError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| PatchError::InvalidPath(path.to_string()))?;
    Ok(rest
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn resolve_mut<'a>(doc: &'a mut Value, tokens: &[String], path: &str) -> Result<&'a mut Value, PatchError> {
    let mut current = doc;
    for token in tokens {
        current = match current {
            Value::Object(map) => map.get_mut(token),
            Value::Array(items) => token.parse::<usize>().ok().and_then(move |i| items.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| PatchError::MissingPath(path.to_string()))?;
    }
    Ok(current)
}

fn insert(parent: &mut Value, token: &str, value: Value, path: &str) -> Result<(), PatchError> {
    match parent {
        Value::Object(map) => {
            map.insert(token.to_string(), value);
            Ok(())
        }
        Value::Array(items) if token == "-" => {
            items.push(value);
            Ok(())
        }
        Value::Array(items) => {
            let index = token
                .parse::<usize>()
                .ok()
                .filter(|i| *i <= items.len())
                .ok_or_else(|| PatchError::MissingPath(path.to_string()))?;
            items.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::MissingPath(path.to_string())),
    }
}

fn remove(parent: &mut Value, token: &str, path: &str) -> Result<(), PatchError> {
    let removed = match parent {
        Value::Object(map) => map.remove(token),
        Value::Array(items) => token
            .parse::<usize>()
            .ok()
            .filter(|i| *i < items.len())
            .map(|i| items.remove(i)),
        _ => None,
    };
    removed
        .map(|_| ())
        .ok_or_else(|| PatchError::MissingPath(path.to_string()))
}
