use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Object;

type Objects = HashMap<String, Object>;

/// One lexical scope. Lookups walk outward through the parents; writes always
/// land in this scope.
#[derive(Debug, Default)]
pub struct Env {
  objects: Objects,
  parent: Option<Rc<RefCell<Env>>>,
}

impl Env {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from(objects: Objects) -> Self {
    Self {
      objects,
      parent: None,
    }
  }

  pub fn new_with_parent(parent: Rc<RefCell<Env>>) -> Self {
    Self {
      objects: HashMap::new(),
      parent: Some(parent),
    }
  }

  pub fn get(&self, name: &str) -> Option<Object> {
    if let Some(object) = self.objects.get(name) {
      return Some(object.clone());
    }

    match self.parent {
      Some(ref parent) => parent.borrow().get(name),
      None => None,
    }
  }

  pub fn set(&mut self, name: String, value: Object) {
    self.objects.insert(name, value);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookup_walks_outward() {
    let outer = Rc::new(RefCell::new(Env::new()));
    outer.borrow_mut().set("x".to_owned(), Object::Integer(1));
    outer.borrow_mut().set("y".to_owned(), Object::Integer(2));

    let mut inner = Env::new_with_parent(Rc::clone(&outer));
    inner.set("y".to_owned(), Object::Integer(20));

    assert_eq!(inner.get("x"), Some(Object::Integer(1)));
    assert_eq!(inner.get("y"), Some(Object::Integer(20)));
    assert_eq!(inner.get("z"), None);
  }

  #[test]
  fn set_never_writes_through() {
    let outer = Rc::new(RefCell::new(Env::new()));
    outer.borrow_mut().set("x".to_owned(), Object::Integer(1));

    let mut inner = Env::new_with_parent(Rc::clone(&outer));
    inner.set("x".to_owned(), Object::Integer(2));

    assert_eq!(outer.borrow().get("x"), Some(Object::Integer(1)));
    assert_eq!(inner.get("x"), Some(Object::Integer(2)));
    assert_eq!(inner.objects.len(), 1);
  }

  #[test]
  fn from_bindings() {
    let mut objects = HashMap::new();
    objects.insert("name".to_owned(), Object::String("bql".to_owned()));

    let env = Env::from(objects);
    assert_eq!(env.get("name"), Some(Object::String("bql".to_owned())));
    assert_eq!(env.objects.len(), 1);
  }
}
