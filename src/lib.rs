pub mod ast;
pub mod token;
pub mod lexer;
pub mod parser;
pub mod object;
pub mod evaluator;
pub mod env;
mod builtin;
pub mod native;
mod error;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, trace};
use serde_json::{Map, Value};

use crate::ast::Program;
use crate::env::Env;
use crate::evaluator::Evaluator;
use crate::lexer::Lexer;
use crate::object::Object;
use crate::parser::Parser;

pub use crate::error::{Error, Result};

/// Parses `source` into a program. Every syntax error found in the pass is
/// reported, in source order.
pub fn parse(source: &str) -> Result<Program> {
  let (program, errors) = Parser::new(Lexer::new(source)).parse_program();

  if !errors.is_empty() {
    debug!("parse failed with {} errors", errors.len());
    return Err(Error::Syntax(errors));
  }

  debug!("parsed {} statements", program.statements.len());
  trace!("{:#?}", program);
  Ok(program)
}

/// Evaluates `source` with every member of `bindings` in scope.
pub fn eval(source: &str, bindings: &Map<String, Value>) -> Result<Option<Value>> {
  let program = parse(source)?;
  run(&program, native::bindings(bindings)?)
}

/// Evaluates `source` with only the `pass_vars` members of `context` in scope.
pub fn eval_with_context<S: AsRef<str>>(
  source: &str,
  context: &Map<String, Value>,
  pass_vars: &[S],
) -> Result<Option<Value>> {
  let program = parse(source)?;
  run(&program, native::select_bindings(context, pass_vars)?)
}

fn run(program: &Program, objects: HashMap<String, Object>) -> Result<Option<Value>> {
  debug!("evaluating with {} bindings", objects.len());

  let env = Rc::new(RefCell::new(Env::from(objects)));
  let result = Evaluator::new(env).eval(program);

  trace!("result: {:?}", result);
  native::to_native(result)
}
