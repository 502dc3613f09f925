use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use crate::ast::{BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement};
use crate::builtin;
use crate::env::Env;
use crate::object::{Function, HashPair, Object, Pairs};

/// Tree-walking evaluator. Runtime errors are ordinary [`Object::Error`]
/// values; they and [`Object::Return`] cut evaluation short until a function
/// call or the program boundary handles them.
#[derive(Debug)]
pub struct Evaluator {
  pub env: Rc<RefCell<Env>>,
}

impl Evaluator {
  pub fn new(env: Rc<RefCell<Env>>) -> Self {
    Evaluator { env }
  }

  fn error(msg: String) -> Object {
    Object::Error(msg)
  }

  /// Errors and return values both stop the evaluation of their siblings.
  fn is_signal(obj: &Object) -> bool {
    matches!(obj, Object::Error(_) | Object::Return(_))
  }

  /// Evaluates a program. `None` means the last statement produced no value
  /// (an assignment, or an empty program).
  pub fn eval(&self, program: &Program) -> Option<Object> {
    let env = Rc::clone(&self.env);
    let mut result = None;

    for statement in &program.statements {
      match self.eval_statement(statement, &env) {
        Some(Object::Return(value)) => return Some(*value),
        Some(Object::Error(message)) => return Some(Object::Error(message)),
        obj => result = obj,
      }
    }

    result
  }

  fn eval_block(&self, block: &BlockStatement, env: &Rc<RefCell<Env>>) -> Option<Object> {
    let mut result = None;

    for statement in &block.statements {
      result = self.eval_statement(statement, env);

      if let Some(ref obj) = result {
        if Self::is_signal(obj) {
          return result;
        }
      }
    }

    result
  }

  fn eval_statement(&self, statement: &Statement, env: &Rc<RefCell<Env>>) -> Option<Object> {
    match statement {
      Statement::Assign { name, value } => {
        let value = self.eval_expression(value, env);

        if Self::is_signal(&value) {
          Some(value)
        } else {
          env.borrow_mut().set(name.clone(), value);
          None
        }
      }
      Statement::Return(value) => {
        let value = self.eval_expression(value, env);

        if Self::is_signal(&value) {
          Some(value)
        } else {
          Some(Object::Return(Box::new(value)))
        }
      }
      Statement::Expression(expression) => Some(self.eval_expression(expression, env)),
      Statement::Block(block) => self.eval_block(block, env),
    }
  }

  fn eval_expression(&self, expression: &Expression, env: &Rc<RefCell<Env>>) -> Object {
    match expression {
      Expression::Integer(value) => Object::Integer(*value),
      Expression::Boolean(value) => Object::Boolean(*value),
      Expression::String(value) => Object::String(value.clone()),
      Expression::Identifier(name) => self.eval_identifier(name, env),
      Expression::Prefix { operator, operand } => {
        let operand = self.eval_expression(operand, env);
        if Self::is_signal(&operand) {
          return operand;
        }

        self.eval_prefix_expression(*operator, operand)
      }
      Expression::Infix { left, operator, right } => {
        let left = self.eval_expression(left, env);
        if Self::is_signal(&left) {
          return left;
        }

        let right = self.eval_expression(right, env);
        if Self::is_signal(&right) {
          return right;
        }

        self.eval_infix_expression(*operator, left, right)
      }
      Expression::If {
        condition,
        consequence,
        alternative,
      } => self.eval_if_expression(condition, consequence, alternative.as_ref(), env),
      Expression::Function { parameters, body } => Object::Function(Rc::new(Function {
        parameters: parameters.clone(),
        body: Rc::clone(body),
        env: Rc::clone(env),
      })),
      Expression::Call { callee, arguments } => {
        let callee = self.eval_expression(callee, env);
        if Self::is_signal(&callee) {
          return callee;
        }

        match self.eval_expressions(arguments, env) {
          Ok(args) => self.apply_function(callee, args),
          Err(signal) => signal,
        }
      }
      Expression::Array(elements) => match self.eval_expressions(elements, env) {
        Ok(elements) => Object::array(elements),
        Err(signal) => signal,
      },
      Expression::Index { collection, index } => {
        let collection = self.eval_expression(collection, env);
        if Self::is_signal(&collection) {
          return collection;
        }

        let index = self.eval_expression(index, env);
        if Self::is_signal(&index) {
          return index;
        }

        self.eval_index_expression(collection, index)
      }
      Expression::HashMap(pairs) => self.eval_hash_literal(pairs, env),
    }
  }

  fn eval_expressions(&self, expressions: &[Expression], env: &Rc<RefCell<Env>>) -> Result<Vec<Object>, Object> {
    let mut objects = Vec::with_capacity(expressions.len());

    for expression in expressions {
      let obj = self.eval_expression(expression, env);
      if Self::is_signal(&obj) {
        return Err(obj);
      }
      objects.push(obj);
    }

    Ok(objects)
  }

  fn eval_identifier(&self, name: &str, env: &Rc<RefCell<Env>>) -> Object {
    let value = env.borrow().get(name);

    match value.or_else(|| builtin::lookup(name)) {
      Some(object) => object,
      None => Self::error(format!("identifier not found: {}", name)),
    }
  }

  fn eval_prefix_expression(&self, op: PrefixOperator, right: Object) -> Object {
    match op {
      PrefixOperator::Not => match right {
        Object::Boolean(value) => Object::Boolean(!value),
        _ => Object::Boolean(false),
      },
      PrefixOperator::Negate => match right {
        Object::Integer(value) => Object::Integer(value.wrapping_neg()),
        other => Self::error(format!("unknown operator: -{}", other.object_type())),
      },
    }
  }

  fn eval_infix_expression(&self, op: InfixOperator, left: Object, right: Object) -> Object {
    if left.object_type() != right.object_type() {
      return Self::error(format!(
        "type mismatch: {} {} {}",
        left.object_type(),
        op,
        right.object_type()
      ));
    }

    match (&left, &right) {
      (Object::Integer(l), Object::Integer(r)) if !Self::is_logical(op) => {
        self.eval_integer_infix_expression(op, *l, *r)
      }
      (Object::String(l), Object::String(r)) if !Self::is_logical(op) => {
        self.eval_string_infix_expression(op, l, r)
      }
      (Object::Boolean(l), Object::Boolean(r)) if Self::is_logical(op) => match op {
        InfixOperator::And => Object::Boolean(*l && *r),
        _ => Object::Boolean(*l || *r),
      },
      _ if Self::is_logical(op) => Self::error(format!(
        "type mismatch: {} {} {}",
        left.object_type(),
        op,
        right.object_type()
      )),
      _ => match op {
        InfixOperator::Equal => Object::Boolean(left == right),
        InfixOperator::NotEqual => Object::Boolean(left != right),
        _ => Self::error(format!(
          "unknown operator: {} {} {}",
          left.object_type(),
          op,
          right.object_type()
        )),
      },
    }
  }

  fn is_logical(op: InfixOperator) -> bool {
    matches!(op, InfixOperator::And | InfixOperator::Or)
  }

  fn eval_integer_infix_expression(&self, op: InfixOperator, left: i64, right: i64) -> Object {
    match op {
      InfixOperator::Add => Object::Integer(left.wrapping_add(right)),
      InfixOperator::Subtract => Object::Integer(left.wrapping_sub(right)),
      InfixOperator::Multiply => Object::Integer(left.wrapping_mul(right)),
      InfixOperator::Divide | InfixOperator::Modulo if right == 0 => {
        Self::error("division by zero".to_owned())
      }
      InfixOperator::Divide => Object::Integer(left.wrapping_div(right)),
      InfixOperator::Modulo => Object::Integer(left.wrapping_rem(right)),
      InfixOperator::Equal => Object::Boolean(left == right),
      InfixOperator::NotEqual => Object::Boolean(left != right),
      InfixOperator::Less => Object::Boolean(left < right),
      InfixOperator::LessEqual => Object::Boolean(left <= right),
      InfixOperator::Greater => Object::Boolean(left > right),
      InfixOperator::GreaterEqual => Object::Boolean(left >= right),
      InfixOperator::And | InfixOperator::Or => {
        Self::error(format!("type mismatch: INTEGER {} INTEGER", op))
      }
    }
  }

  // Ordering is byte-lexicographic.
  fn eval_string_infix_expression(&self, op: InfixOperator, left: &str, right: &str) -> Object {
    match op {
      InfixOperator::Add => Object::String(format!("{}{}", left, right)),
      InfixOperator::Equal => Object::Boolean(left == right),
      InfixOperator::NotEqual => Object::Boolean(left != right),
      InfixOperator::Less => Object::Boolean(left < right),
      InfixOperator::LessEqual => Object::Boolean(left <= right),
      InfixOperator::Greater => Object::Boolean(left > right),
      InfixOperator::GreaterEqual => Object::Boolean(left >= right),
      _ => Self::error(format!("unknown operator: STRING {} STRING", op)),
    }
  }

  fn eval_if_expression(
    &self,
    condition: &Expression,
    consequence: &BlockStatement,
    alternative: Option<&BlockStatement>,
    env: &Rc<RefCell<Env>>,
  ) -> Object {
    let condition = self.eval_expression(condition, env);
    if Self::is_signal(&condition) {
      return condition;
    }

    let branch = match condition {
      Object::Boolean(true) => Some(consequence),
      Object::Boolean(false) => alternative,
      _ => return Self::error("non boolean condition in if statement".to_owned()),
    };

    branch
      .and_then(|block| self.eval_block(block, env))
      .unwrap_or(Object::Null)
  }

  fn apply_function(&self, callee: Object, args: Vec<Object>) -> Object {
    match callee {
      Object::Function(function) => {
        if args.len() != function.parameters.len() {
          return Self::error(format!(
            "wrong number of arguments: {} want: {}",
            args.len(),
            function.parameters.len()
          ));
        }

        trace!("calling fn({})", function.parameters.join(", "));

        let mut scope = Env::new_with_parent(Rc::clone(&function.env));
        for (parameter, arg) in function.parameters.iter().zip(args) {
          scope.set(parameter.clone(), arg);
        }
        let scope = Rc::new(RefCell::new(scope));

        match self.eval_block(&function.body, &scope) {
          Some(Object::Return(value)) => *value,
          Some(obj) => obj,
          None => Object::Null,
        }
      }
      Object::Builtin(builtin) => (builtin.function)(args),
      other => Self::error(format!("call not a function: {}", other.object_type())),
    }
  }

  fn eval_index_expression(&self, collection: Object, index: Object) -> Object {
    match (&collection, &index) {
      (Object::Array(elements), Object::Integer(i)) => {
        let elements = elements.borrow();

        usize::try_from(*i)
          .ok()
          .and_then(|i| elements.get(i).cloned())
          .unwrap_or(Object::Null)
      }
      (Object::Array(_), other) => {
        Self::error(format!("index must be INTEGER, got: {}", other.object_type()))
      }
      (Object::HashMap(pairs), key) => match key.hash_key() {
        Some(hash_key) => pairs
          .get(&hash_key)
          .map(|pair| pair.value.clone())
          .unwrap_or(Object::Null),
        None => Self::error(format!("unusable as hash key: {}", key.object_type())),
      },
      (other, _) => Self::error(format!("index operator not supported: {}", other.object_type())),
    }
  }

  fn eval_hash_literal(&self, pairs: &[(Expression, Expression)], env: &Rc<RefCell<Env>>) -> Object {
    let mut map = Pairs::with_capacity(pairs.len());

    for (key, value) in pairs {
      let key = self.eval_expression(key, env);
      if Self::is_signal(&key) {
        return key;
      }

      let hash_key = match key.hash_key() {
        Some(hash_key) => hash_key,
        None => return Self::error(format!("unusable as hash key: {}", key.object_type())),
      };

      let value = self.eval_expression(value, env);
      if Self::is_signal(&value) {
        return value;
      }

      map.insert(hash_key, HashPair { key, value });
    }

    Object::hash_map(map)
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;
  use std::rc::Rc;

  use crate::env::Env;
  use crate::evaluator::Evaluator;
  use crate::object::Object;
  use crate::parser::parse;

  fn eval(input: &str) -> Option<Object> {
    let (program, errors) = parse(input);
    assert!(errors.is_empty(), "input {:?} has errors: {:?}", input, errors);

    let evaluator = Evaluator::new(Rc::new(RefCell::new(Env::new())));
    evaluator.eval(&program)
  }

  fn assert_integer(input: &str, expected: i64) {
    assert_eq!(eval(input), Some(Object::Integer(expected)), "input: {:?}", input);
  }

  fn assert_boolean(input: &str, expected: bool) {
    assert_eq!(eval(input), Some(Object::Boolean(expected)), "input: {:?}", input);
  }

  fn assert_null(input: &str) {
    assert_eq!(eval(input), Some(Object::Null), "input: {:?}", input);
  }

  fn assert_error(input: &str, expected: &str) {
    assert_eq!(eval(input), Some(Object::Error(expected.to_owned())), "input: {:?}", input);
  }

  #[test]
  fn integer_expressions() {
    let tests = [
      ("4", 4),
      ("-15", -15),
      ("2 + 2", 4),
      ("1 + 2 + 3 + 4 + 5 - 1 - 2 - 3", 9),
      ("2 * 3 * 4 * 5 * 6 * 7 * 8 * 9", 362880),
      ("10 + 10 * 2", 30),
      ("(10 + 10) * 2", 40),
      ("100 / 2 * 2 + 5", 105),
      ("100 / (2 * 2) - 200", -175),
      ("5 % 2", 1),
      ("4 % 2", 0),
      ("-7 / 2", -3),
      ("-7 % 2", -1),
      ("7 % -2", 1),
    ];

    for (input, expected) in tests {
      assert_integer(input, expected);
    }
  }

  #[test]
  fn integer_overflow_wraps() {
    assert_integer("9223372036854775807 + 1", i64::MIN);
    assert_integer("-9223372036854775807 - 2", i64::MAX);
  }

  #[test]
  fn division_by_zero() {
    assert_error("1 / 0", "division by zero");
    assert_error("1 % 0", "division by zero");
  }

  #[test]
  fn boolean_expressions() {
    let tests = [
      ("true", true),
      ("1 == 1", true),
      ("1 != 1", false),
      ("1 < 2", true),
      ("1 > 2", false),
      ("1 <= 1", true),
      ("1 >= 2", false),
      ("true == true", true),
      ("true != false", true),
      ("(true == false) == false", true),
      ("(1 <= 1) == false", false),
      ("true || false", true),
      ("true && false", false),
      ("false || false", false),
      ("1 < 2 && 2 < 3", true),
    ];

    for (input, expected) in tests {
      assert_boolean(input, expected);
    }
  }

  #[test]
  fn bang_operator() {
    assert_boolean("!true", false);
    assert_boolean("!false", true);
    assert_boolean("!!true", true);
    assert_boolean("!5", false);
    assert_boolean("!\"\"", false);
  }

  #[test]
  fn string_expressions() {
    assert_eq!(eval("\"Hello\" + \" \" + \"World!\""), Some(Object::String("Hello World!".to_owned())));
    assert_boolean("\"a\" == \"a\"", true);
    assert_boolean("\"a\" != \"a\"", false);
    assert_boolean("\"abc\" < \"abd\"", true);
    assert_boolean("\"b\" > \"abc\"", true);
    assert_boolean("\"abc\" <= \"abc\"", true);
    assert_boolean("\"\" >= \"a\"", false);
    assert_error("\"a\" - \"b\"", "unknown operator: STRING - STRING");
  }

  #[test]
  fn if_else_expressions() {
    assert_integer("if (true) { 50 }", 50);
    assert_null("if (false) { 50 }");
    assert_integer("if (!false) { 50 }", 50);
    assert_integer("if (1 < 2) { 50 } else { 100 }", 50);
    assert_integer("if (1 > 2) { 50 } else { 100 }", 100);
    assert_integer("if (true && false) { 50 } else { 100 }", 100);
    assert_null("if (true) { }");
    assert_integer("x = if (1 > 2) { 1 } else { 2 }; x", 2);
  }

  #[test]
  fn return_statements() {
    assert_integer("return 15", 15);
    assert_integer("return 25; 1;", 25);
    assert_integer("if (true) { return 99 }", 99);
    assert_integer("if (1 > 0) {\n\tif (2 > 0) {\n\t\treturn 3\n\t}\n\n\treturn 1;\n}", 3);
    assert_integer("if (0 == 0) {\n\tif (2 == 0) {\n\t\treturn 3\n\t}\n\n\treturn 1;\n}", 1);
  }

  #[test]
  fn error_handling() {
    let tests = [
      ("true + false", "unknown operator: BOOLEAN + BOOLEAN"),
      ("1; true - false; 2", "unknown operator: BOOLEAN - BOOLEAN"),
      ("1; true + false + true + true; 2", "unknown operator: BOOLEAN + BOOLEAN"),
      ("-true", "unknown operator: -BOOLEAN"),
      ("true + 3", "type mismatch: BOOLEAN + INTEGER"),
      ("3 * false", "type mismatch: INTEGER * BOOLEAN"),
      ("\"a\" + 1", "type mismatch: STRING + INTEGER"),
      ("if (3) { 1 }", "non boolean condition in if statement"),
      ("if (1 > 0) {\n\tif (2 > 0) {\n\t\treturn true + false\n\t}\n\treturn 1\n}", "unknown operator: BOOLEAN + BOOLEAN"),
      ("x = 10; q", "identifier not found: q"),
      ("ijk", "identifier not found: ijk"),
      ("1 && 2", "type mismatch: INTEGER && INTEGER"),
      ("\"a\" || \"b\"", "type mismatch: STRING || STRING"),
      ("true && 1", "type mismatch: BOOLEAN && INTEGER"),
      ("5(1)", "call not a function: INTEGER"),
    ];

    for (input, expected) in tests {
      assert_error(input, expected);
    }
  }

  #[test]
  fn errors_stop_evaluation() {
    assert_error("x = 1; y = q; x = 2; x", "identifier not found: q");
    assert_error("[1, q, 3]", "identifier not found: q");
    assert_error("f = fn(a) { a }; f(q)", "identifier not found: q");
    assert_error("{q: 1}", "identifier not found: q");
  }

  #[test]
  fn assignment() {
    assert_integer("x = 10; x", 10);
    assert_integer("x = 10; x = 15; x", 15);
    assert_integer("x = 10 * 2; y = x * 3; y", 60);
    assert_integer("x = 10; y = x * 2; z = x + y - 20; z", 10);
    assert_eq!(eval("x = 10"), None);
    assert_eq!(eval(""), None);
  }

  #[test]
  fn functions_and_calls() {
    assert_integer("x = fn(x,y){ return x*y }; x(10,9)", 90);
    assert_integer("identity = fn(x) { x; }; identity(5);", 5);
    assert_integer("double = fn(x) { x * 2; }; double(5);", 10);
    assert_integer("add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", 20);
    assert_integer("fn(x) { x; }(5)", 5);
    assert_null("f = fn() { x = 1 }; f()");
    assert_error("f = fn(a, b) { a }; f(1)", "wrong number of arguments: 1 want: 2");
    assert_error("f = fn() { 1 }; f(1, 2)", "wrong number of arguments: 2 want: 0");
  }

  #[test]
  fn closures() {
    assert_integer("c = fn(x){ fn(y){ x + y } }; a = c(5); a(4)", 9);
    assert_integer(
      "counter = fn(start) { step = 2; fn(n) { start + n * step } }; by2 = counter(10); by2(3)",
      16,
    );
  }

  #[test]
  fn function_scope_is_isolated() {
    assert_integer("x = 1; f = fn() { x = 2; x }; f() + x", 3);
    assert_integer("x = 1; { x = 5 }; x", 5);
  }

  #[test]
  fn recursion() {
    assert_integer(
      "fact = fn(n) { if (n == 0) { 1 } else { n * fact(n - 1) } }; fact(10)",
      3628800,
    );
    assert_integer(
      "fib = fn(n) { if (n < 2) { return n }; fib(n - 1) + fib(n - 2) }; fib(15)",
      610,
    );
  }

  #[test]
  fn arrays() {
    assert_eq!(
      eval("[1, 2 * 2, 3 + 3]"),
      Some(Object::array(vec![Object::Integer(1), Object::Integer(4), Object::Integer(6)]))
    );
    assert_integer("[1, 2, 3][0]", 1);
    assert_integer("i = 0; [1][i];", 1);
    assert_integer("myArray = [1, 2, 3]; myArray[0] + myArray[1] + myArray[2];", 6);
    assert_null("[1, 2, 5][3]");
    assert_null("[1, 2, 5][-1]");
    assert_error("[1][\"a\"]", "index must be INTEGER, got: STRING");
    assert_error("1[0]", "index operator not supported: INTEGER");
  }

  #[test]
  fn array_equality() {
    assert_boolean("[1, 2] == [1, 2]", true);
    assert_boolean("[1, 2] != [2, 1]", true);
    assert_boolean("a = [1]; b = a; push(b, 2); a == [1, 2]", true);
  }

  #[test]
  fn self_containing_arrays() {
    assert_boolean("a = []; push(a, a); b = []; push(b, b); a == b", false);
    assert_boolean("a = []; push(a, a); a == a", true);
    assert_boolean("a = [1]; b = [a]; push(a, b); a == [1, b]", true);

    let result = eval("a = [1]; push(a, a); a");
    assert_eq!(result.map(|obj| obj.to_string()), Some("[1, [...]]".to_owned()));
  }

  #[test]
  fn hash_maps() {
    assert_integer("{\"a\": 1}[\"a\"]", 1);
    assert_integer("{1: 10, 2: 20}[2]", 20);
    assert_integer("{true: 5}[1 == 1]", 5);
    assert_integer("key = \"x\"; {key: 1, \"y\": 2}[\"x\"]", 1);
    assert_integer("{\"a\": 1, \"a\": 2}[\"a\"]", 2);
    assert_null("{\"a\": 1}[\"b\"]");
    assert_null("{}[1]");
    assert_null("{1: 1}[\"1\"]");
    assert_error("{\"a\": 1}[[]]", "unusable as hash key: ARRAY");
    assert_error("{\"a\": 1}[{}]", "unusable as hash key: HASHMAP");
    assert_error("{[1]: 1}", "unusable as hash key: ARRAY");
    assert_error("{fn(x) { x }: 1}", "unusable as hash key: FUNCTION");
  }

  #[test]
  fn builtins() {
    assert_integer("len(\"four\")", 4);
    assert_integer("len([1, 2, 3])", 3);
    assert_error("len(1)", "type of argument not supported: INTEGER");
    assert_eq!(eval("push([], 4)"), Some(Object::array(vec![Object::Integer(4)])));
    assert_integer("a = [1]; push(a, 2); len(a)", 2);
    assert_integer("first([7, 8])", 7);
    assert_integer("last([7, 8])", 8);
    assert_null("first([])");
    assert_eq!(eval("intToString(12)"), Some(Object::String("12".to_owned())));
    assert_integer("len = fn(x) { 0 }; len([1])", 0);
  }

  #[test]
  fn return_inside_expression_propagates() {
    assert_integer("f = fn() { 1 + if (true) { return 10 } }; f()", 10);
    assert_integer("f = fn() { x = if (true) { return 3 }; 4 }; f()", 3);
  }
}
