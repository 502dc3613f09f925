use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Formatter;
use std::rc::Rc;

use crate::ast::BlockStatement;
use crate::env::Env;

pub type BuiltinFunction = fn(Vec<Object>) -> Object;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
  Integer,
  Boolean,
  String,
  Null,
  Array,
  HashMap,
  Function,
  Builtin,
  Error,
  Return,
}

impl fmt::Display for ObjectType {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    let name = match self {
      ObjectType::Integer => "INTEGER",
      ObjectType::Boolean => "BOOLEAN",
      ObjectType::String => "STRING",
      ObjectType::Null => "NULL",
      ObjectType::Array => "ARRAY",
      ObjectType::HashMap => "HASHMAP",
      ObjectType::Function => "FUNCTION",
      ObjectType::Builtin => "BUILTIN",
      ObjectType::Error => "ERROR",
      ObjectType::Return => "RETURN_VALUE",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
  pub kind: ObjectType,
  pub value: u64,
}

/// Values that may be used as hashmap keys.
pub trait Hashable {
  fn hash_key(&self) -> HashKey;
}

impl Hashable for i64 {
  fn hash_key(&self) -> HashKey {
    HashKey {
      kind: ObjectType::Integer,
      value: *self as u64,
    }
  }
}

impl Hashable for bool {
  fn hash_key(&self) -> HashKey {
    HashKey {
      kind: ObjectType::Boolean,
      value: u64::from(*self),
    }
  }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl Hashable for str {
  // 64-bit FNV-1a over the UTF-8 bytes.
  fn hash_key(&self) -> HashKey {
    let value = self.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
      (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });

    HashKey {
      kind: ObjectType::String,
      value,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
  pub key: Object,
  pub value: Object,
}

pub type Pairs = HashMap<HashKey, HashPair>;

/// Arrays being visited by a recursive walk. `push` can make an array contain
/// itself, and every cycle passes through an array.
pub(crate) type Path = Vec<*const RefCell<Vec<Object>>>;

pub struct Function {
  pub parameters: Vec<String>,
  pub body: Rc<BlockStatement>,
  pub env: Rc<RefCell<Env>>,
}

// The captured environment usually contains the function itself.
impl fmt::Debug for Function {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.debug_struct("Function")
      .field("parameters", &self.parameters)
      .finish_non_exhaustive()
  }
}

#[derive(Clone, Copy)]
pub struct Builtin {
  pub name: &'static str,
  pub function: BuiltinFunction,
}

impl fmt::Debug for Builtin {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "Builtin({})", self.name)
  }
}

#[derive(Clone)]
pub enum Object {
  Integer(i64),
  Boolean(bool),
  String(String),
  Null,
  Array(Rc<RefCell<Vec<Object>>>),
  HashMap(Rc<Pairs>),
  Function(Rc<Function>),
  Builtin(Builtin),
  Error(String),
  Return(Box<Object>),
}

impl Object {
  pub fn array(elements: Vec<Object>) -> Object {
    Object::Array(Rc::new(RefCell::new(elements)))
  }

  pub fn hash_map(pairs: Pairs) -> Object {
    Object::HashMap(Rc::new(pairs))
  }

  pub fn object_type(&self) -> ObjectType {
    match self {
      Object::Integer(_) => ObjectType::Integer,
      Object::Boolean(_) => ObjectType::Boolean,
      Object::String(_) => ObjectType::String,
      Object::Null => ObjectType::Null,
      Object::Array(_) => ObjectType::Array,
      Object::HashMap(_) => ObjectType::HashMap,
      Object::Function(_) => ObjectType::Function,
      Object::Builtin(_) => ObjectType::Builtin,
      Object::Error(_) => ObjectType::Error,
      Object::Return(_) => ObjectType::Return,
    }
  }

  /// The key under which this value is stored in a hashmap, or `None` if the
  /// value is not hashable.
  pub fn hash_key(&self) -> Option<HashKey> {
    match self {
      Object::Integer(value) => Some(value.hash_key()),
      Object::Boolean(value) => Some(value.hash_key()),
      Object::String(value) => Some(value.as_str().hash_key()),
      _ => None,
    }
  }

  pub fn is_error(&self) -> bool {
    matches!(self, Object::Error(_))
  }

  // Structural equality. Arrays already on the path compare by identity.
  fn equals(&self, other: &Object, path: &mut Path) -> bool {
    match (self, other) {
      (Object::Array(left), Object::Array(right)) => {
        if Rc::ptr_eq(left, right) {
          return true;
        }

        let (l, r) = (Rc::as_ptr(left), Rc::as_ptr(right));
        if path.contains(&l) || path.contains(&r) {
          return false;
        }

        path.push(l);
        path.push(r);
        let equal = {
          let left = left.borrow();
          let right = right.borrow();
          left.len() == right.len() && left.iter().zip(right.iter()).all(|(a, b)| a.equals(b, path))
        };
        path.truncate(path.len() - 2);

        equal
      }
      (Object::HashMap(left), Object::HashMap(right)) => {
        Rc::ptr_eq(left, right)
          || (left.len() == right.len()
            && left.iter().all(|(key, pair)| match right.get(key) {
              Some(other) => pair.key.equals(&other.key, path) && pair.value.equals(&other.value, path),
              None => false,
            }))
      }
      (Object::Return(left), Object::Return(right)) => left.equals(right, path),
      _ => self == other,
    }
  }

  fn write_to(&self, f: &mut Formatter<'_>, path: &mut Path) -> fmt::Result {
    match self {
      Object::Array(elements) => {
        let ptr = Rc::as_ptr(elements);
        if path.contains(&ptr) {
          return f.write_str("[...]");
        }

        path.push(ptr);
        f.write_str("[")?;
        for (i, element) in elements.borrow().iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          element.write_to(f, path)?;
        }
        path.pop();
        f.write_str("]")
      }
      Object::HashMap(pairs) => {
        f.write_str("{")?;
        for (i, pair) in pairs.values().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          pair.key.write_to(f, path)?;
          f.write_str(": ")?;
          pair.value.write_to(f, path)?;
        }
        f.write_str("}")
      }
      Object::Return(value) => value.write_to(f, path),
      Object::Integer(value) => write!(f, "{}", value),
      Object::Boolean(value) => write!(f, "{}", value),
      Object::String(value) => write!(f, "{}", value),
      Object::Null => f.write_str("null"),
      Object::Function(function) => {
        write!(f, "fn({}) {}", function.parameters.join(", "), function.body)
      }
      Object::Builtin(builtin) => write!(f, "{}() {{ [native code] }}", builtin.name),
      Object::Error(message) => write!(f, "error: {}", message),
    }
  }
}

impl PartialEq for Object {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Object::Integer(left), Object::Integer(right)) => left == right,
      (Object::Boolean(left), Object::Boolean(right)) => left == right,
      (Object::String(left), Object::String(right)) => left == right,
      (Object::Null, Object::Null) => true,
      (Object::Array(_), Object::Array(_)) | (Object::HashMap(_), Object::HashMap(_)) => {
        self.equals(other, &mut Vec::new())
      }
      (Object::Function(left), Object::Function(right)) => Rc::ptr_eq(left, right),
      (Object::Builtin(left), Object::Builtin(right)) => left.name == right.name,
      (Object::Error(left), Object::Error(right)) => left == right,
      (Object::Return(left), Object::Return(right)) => left.equals(right, &mut Vec::new()),
      _ => false,
    }
  }
}

// Arrays and hashmaps go through `Display`, which stops at cycles.
impl fmt::Debug for Object {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Object::Integer(value) => f.debug_tuple("Integer").field(value).finish(),
      Object::Boolean(value) => f.debug_tuple("Boolean").field(value).finish(),
      Object::String(value) => f.debug_tuple("String").field(value).finish(),
      Object::Null => f.write_str("Null"),
      Object::Array(_) => write!(f, "Array({})", self),
      Object::HashMap(_) => write!(f, "HashMap({})", self),
      Object::Function(function) => f.debug_tuple("Function").field(function).finish(),
      Object::Builtin(builtin) => f.debug_tuple("Builtin").field(builtin).finish(),
      Object::Error(message) => f.debug_tuple("Error").field(message).finish(),
      Object::Return(value) => f.debug_tuple("Return").field(value).finish(),
    }
  }
}

impl fmt::Display for Object {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    self.write_to(f, &mut Vec::new())
  }
}
