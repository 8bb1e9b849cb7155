///
/// Script evaluation against a registry.
///
/// A top-level form must be a call `(command arg ...)`. Arguments that are
/// themselves lists headed by a symbol are evaluated first, so
/// `(sqlite3-step 0 (sqlite3-prepare 0 "..."))` works; any other argument
/// is passed through as a literal value.
///
/// Each result is printed on its own line. A failing form prints
/// `error: <message>` and evaluation moves on to the next form, unless
/// fail-fast is set.
///

use std::io::{self, Write};

use hostsql_core::Value;
use hostsql_sqlite3::{Config, DbError, Registry, call};
use thiserror::Error;
use tracing::debug;

use crate::printer::Printed;
use crate::reader::Form;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("not a command call: {0}")]
    NotACall(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub evaluated: usize,
    pub failed: usize,
}

pub struct Session {
    registry: Registry,
    fail_fast: bool,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            registry: Registry::with_config(config),
            fail_fast: false,
        }
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn eval(&mut self, form: Value) -> Result<Value, EvalError> {
        match form {
            Value::List(items) => {
                let mut items = items.into_iter();
                match items.next() {
                    Some(Value::Symbol(name)) => {
                        let args = items
                            .map(|arg| self.eval_arg(arg))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(call(&mut self.registry, &name, args)?)
                    }
                    head => {
                        let list = Value::List(head.into_iter().chain(items).collect());
                        Err(EvalError::NotACall(Printed(&list).to_string()))
                    }
                }
            }
            other => Err(EvalError::NotACall(Printed(&other).to_string())),
        }
    }

    fn eval_arg(&mut self, arg: Value) -> Result<Value, EvalError> {
        let is_call =
            matches!(&arg, Value::List(items) if matches!(items.first(), Some(Value::Symbol(_))));
        if is_call { self.eval(arg) } else { Ok(arg) }
    }

    pub fn run(
        &mut self,
        forms: Vec<Form>,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> io::Result<Outcome> {
        let mut outcome = Outcome::default();
        for form in forms {
            outcome.evaluated += 1;
            match self.eval(form.value) {
                Ok(value) => writeln!(out, "{}", Printed(&value))?,
                Err(e) => {
                    outcome.failed += 1;
                    debug!(span = ?form.span, "form failed: {}", e);
                    writeln!(err, "error: {}", e)?;
                    if self.fail_fast {
                        break;
                    }
                }
            }
        }
        Ok(outcome)
    }
}
