use std::collections::HashMap;
use std::sync::OnceLock;

use crate::object::{Builtin, BuiltinFunction, Object, ObjectType};

static BUILTINS: OnceLock<HashMap<&'static str, BuiltinFunction>> = OnceLock::new();

fn builtins() -> &'static HashMap<&'static str, BuiltinFunction> {
  BUILTINS.get_or_init(|| {
    let mut builtins: HashMap<&'static str, BuiltinFunction> = HashMap::new();
    builtins.insert("len", builtin_len);
    builtins.insert("push", builtin_push);
    builtins.insert("first", builtin_first);
    builtins.insert("last", builtin_last);
    builtins.insert("intToString", builtin_int_to_string);
    builtins
  })
}

/// Looks up a native function by name. The table is built once and shared by
/// every evaluation.
pub fn lookup(name: &str) -> Option<Object> {
  builtins()
    .get_key_value(name)
    .map(|(name, function)| Object::Builtin(Builtin { name: *name, function: *function }))
}

fn error(message: String) -> Object {
  Object::Error(message)
}

fn check_arity(args: &[Object], want: usize) -> Option<Object> {
  if args.len() == want {
    None
  } else {
    Some(error(format!("wrong number of arguments: {} want: {}", args.len(), want)))
  }
}

fn builtin_len(args: Vec<Object>) -> Object {
  if let Some(error) = check_arity(&args, 1) {
    return error;
  }

  match &args[0] {
    Object::String(value) => Object::Integer(value.len() as i64),
    Object::Array(elements) => Object::Integer(elements.borrow().len() as i64),
    other => error(format!("type of argument not supported: {}", other.object_type())),
  }
}

fn builtin_push(args: Vec<Object>) -> Object {
  if let Some(error) = check_arity(&args, 2) {
    return error;
  }

  let mut args = args.into_iter();
  match (args.next(), args.next()) {
    (Some(Object::Array(elements)), Some(value)) => {
      elements.borrow_mut().push(value);
      Object::Array(elements)
    }
    (Some(other), _) => error(format!("first argument must be ARRAY, got: {}", other.object_type())),
    _ => Object::Null,
  }
}

fn builtin_first(args: Vec<Object>) -> Object {
  if let Some(error) = check_arity(&args, 1) {
    return error;
  }

  match &args[0] {
    Object::Array(elements) => elements.borrow().first().cloned().unwrap_or(Object::Null),
    other => error(format!("argument must be {}, got: {}", ObjectType::Array, other.object_type())),
  }
}

fn builtin_last(args: Vec<Object>) -> Object {
  if let Some(error) = check_arity(&args, 1) {
    return error;
  }

  match &args[0] {
    Object::Array(elements) => elements.borrow().last().cloned().unwrap_or(Object::Null),
    other => error(format!("argument must be {}, got: {}", ObjectType::Array, other.object_type())),
  }
}

fn builtin_int_to_string(args: Vec<Object>) -> Object {
  if let Some(error) = check_arity(&args, 1) {
    return error;
  }

  match &args[0] {
    Object::Integer(value) => Object::String(value.to_string()),
    other => error(format!("argument must be {}, got: {}", ObjectType::Integer, other.object_type())),
  }
}
