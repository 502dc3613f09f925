use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};
use crate::object::{HashPair, Object, Pairs, Path};

/// Converts host values into interpreter bindings.
pub fn bindings(values: &Map<String, Value>) -> Result<HashMap<String, Object>> {
  values
    .iter()
    .map(|(name, value)| Ok((name.clone(), to_object(value)?)))
    .collect()
}

/// Like [`bindings`], but only imports the listed names.
pub fn select_bindings<S: AsRef<str>>(context: &Map<String, Value>, names: &[S]) -> Result<HashMap<String, Object>> {
  let mut objects = HashMap::with_capacity(names.len());

  for name in names {
    let name = name.as_ref();
    match context.get(name) {
      Some(value) => {
        objects.insert(name.to_owned(), to_object(value)?);
      }
      None => return Err(Error::Conversion(format!("variable does not exist: {}", name))),
    }
  }

  Ok(objects)
}

pub fn to_object(value: &Value) -> Result<Object> {
  let object = match value {
    Value::Null => Object::Null,
    Value::Bool(value) => Object::Boolean(*value),
    Value::Number(number) => Object::Integer(to_integer(number)?),
    Value::String(value) => Object::String(value.clone()),
    Value::Array(elements) => Object::array(elements.iter().map(to_object).collect::<Result<Vec<_>>>()?),
    Value::Object(members) => {
      let mut pairs = Pairs::with_capacity(members.len());
      for (key, value) in members {
        let key = Object::String(key.clone());
        if let Some(hash_key) = key.hash_key() {
          pairs.insert(hash_key, HashPair { key, value: to_object(value)? });
        }
      }
      Object::hash_map(pairs)
    }
  };

  Ok(object)
}

// Floats truncate toward zero.
fn to_integer(number: &Number) -> Result<i64> {
  if let Some(value) = number.as_i64() {
    return Ok(value);
  }

  if number.is_u64() {
    return Err(Error::Conversion(format!("integer out of range: {}", number)));
  }

  match number.as_f64() {
    Some(value) => Ok(value.trunc() as i64),
    None => Err(Error::Conversion(format!("unsupported number: {}", number))),
  }
}

/// Converts an evaluation result back into a host value. A null or absent
/// result is `None`.
pub fn to_native(result: Option<Object>) -> Result<Option<Value>> {
  match result {
    None | Some(Object::Null) => Ok(None),
    Some(object) => to_value(&object).map(Some),
  }
}

pub fn to_value(object: &Object) -> Result<Value> {
  value_of(object, &mut Vec::new())
}

fn value_of(object: &Object, path: &mut Path) -> Result<Value> {
  match object {
    Object::Integer(value) => Ok(Value::from(*value)),
    Object::Boolean(value) => Ok(Value::Bool(*value)),
    Object::String(value) => Ok(Value::String(value.clone())),
    Object::Null => Ok(Value::Null),
    Object::Array(elements) => {
      let ptr = Rc::as_ptr(elements);
      if path.contains(&ptr) {
        return Err(Error::Conversion(format!(
          "cannot convert cyclic {} to a native value",
          object.object_type()
        )));
      }

      path.push(ptr);
      let values = elements
        .borrow()
        .iter()
        .map(|element| value_of(element, path))
        .collect::<Result<Vec<_>>>()?;
      path.pop();

      Ok(Value::Array(values))
    }
    Object::HashMap(pairs) => {
      let mut members = Map::new();
      for pair in pairs.values() {
        members.insert(pair.key.to_string(), value_of(&pair.value, path)?);
      }
      Ok(Value::Object(members))
    }
    Object::Error(message) => Err(Error::Runtime(message.clone())),
    Object::Return(value) => value_of(value, path),
    other => Err(Error::Conversion(format!(
      "cannot convert {} to a native value",
      other.object_type()
    ))),
  }
}
