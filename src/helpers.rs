use std::{fmt, rc::Rc};

use crate::{HelperOptions, TemplateError, TemplateResult, Value};

/// Signature shared by helpers and callable context values: `this`, positional
/// arguments, then the scope frame of the call.
pub type HelperFn = dyn Fn(&Value, &[Value], &HelperOptions<'_>) -> TemplateResult<Value>;

/// A reference-counted helper function.
#[derive(Clone)]
pub struct Helper(Rc<HelperFn>);

impl Helper {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value], &HelperOptions<'_>) -> TemplateResult<Value> + 'static,
    {
        Self(Rc::new(func))
    }

    pub fn call(
        &self,
        this: &Value,
        args: &[Value],
        options: &HelperOptions<'_>,
    ) -> TemplateResult<Value> {
        (self.0)(this, args, options)
    }

    /// True when both handles point at the same function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Helper({:p})", Rc::as_ptr(&self.0))
    }
}

/// The helpers every registry starts with.
pub(crate) fn builtins() -> [(&'static str, Helper); 9] {
    [
        ("noop", Helper::new(noop)),
        ("with", Helper::new(with)),
        ("if", Helper::new(if_helper)),
        ("unless", Helper::new(unless)),
        ("each", Helper::new(each)),
        ("lookup", Helper::new(lookup)),
        ("log", Helper::new(log)),
        ("blockHelperMissing", Helper::new(block_helper_missing)),
        ("helperMissing", Helper::new(helper_missing)),
    ]
}

fn require_args(args: &[Value], expected: usize, options: &HelperOptions<'_>) -> TemplateResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(TemplateError::WrongArgumentCount {
            helper: options.name().to_string(),
            got: args.len(),
            expected,
        })
    }
}

fn noop(this: &Value, args: &[Value], options: &HelperOptions<'_>) -> TemplateResult<Value> {
    require_args(args, 0, options)?;
    options.then(this).map(Value::from)
}

fn with(this: &Value, args: &[Value], options: &HelperOptions<'_>) -> TemplateResult<Value> {
    require_args(args, 1, options)?;
    if args[0].is_empty() {
        options.inverse(this).map(Value::from)
    } else {
        options.then(&args[0]).map(Value::from)
    }
}

fn if_helper(this: &Value, args: &[Value], options: &HelperOptions<'_>) -> TemplateResult<Value> {
    require_args(args, 1, options)?;
    if args[0].is_empty() {
        options.inverse(this).map(Value::from)
    } else {
        options.then(this).map(Value::from)
    }
}

fn unless(this: &Value, args: &[Value], options: &HelperOptions<'_>) -> TemplateResult<Value> {
    require_args(args, 1, options)?;
    if args[0].is_empty() {
        options.then(this).map(Value::from)
    } else {
        options.inverse(this).map(Value::from)
    }
}

fn each(this: &Value, args: &[Value], options: &HelperOptions<'_>) -> TemplateResult<Value> {
    require_args(args, 1, options)?;

    let mut output = String::new();
    let mut iterations = 0;
    match &args[0] {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let mut frame = options.create_frame();
                frame.insert("first".to_string(), Value::from(index == 0));
                frame.insert("last".to_string(), Value::from(index + 1 == items.len()));
                frame.insert("index".to_string(), Value::from(index));
                output.push_str(&options.then_with_data(item, frame)?);
            }
            iterations = items.len();
        }
        Value::Object(map) => {
            for (index, (key, value)) in map.iter().enumerate() {
                let mut frame = options.create_frame();
                frame.insert("first".to_string(), Value::from(index == 0));
                frame.insert("key".to_string(), Value::from(key.as_str()));
                frame.insert("index".to_string(), Value::from(index));
                output.push_str(&options.then_with_data(value, frame)?);
            }
            iterations = map.len();
        }
        _ => {}
    }

    if iterations > 0 {
        Ok(Value::from(output))
    } else {
        options.inverse(this).map(Value::from)
    }
}

fn lookup(_this: &Value, args: &[Value], options: &HelperOptions<'_>) -> TemplateResult<Value> {
    require_args(args, 2, options)?;
    if args[0].is_truthy() {
        Ok(args[0].get(&args[1].to_output()))
    } else {
        Ok(Value::Null)
    }
}

fn log(_this: &Value, args: &[Value], options: &HelperOptions<'_>) -> TemplateResult<Value> {
    require_args(args, 1, options)?;
    tracing::info!(target: "sleuth::log", value = ?args[0], "{}", args[0].to_output());
    Ok(Value::from(""))
}

fn block_helper_missing(
    this: &Value,
    args: &[Value],
    options: &HelperOptions<'_>,
) -> TemplateResult<Value> {
    require_args(args, 1, options)?;
    let arg = &args[0];
    if arg.is_empty() {
        options.inverse(this).map(Value::from)
    } else if arg.is_array() {
        each(this, args, options)
    } else if arg.is_object() {
        options.then(arg).map(Value::from)
    } else {
        options.then(this).map(Value::from)
    }
}

fn helper_missing(
    _this: &Value,
    _args: &[Value],
    options: &HelperOptions<'_>,
) -> TemplateResult<Value> {
    Err(TemplateError::MissingHelper {
        name: options.name().to_string(),
    })
}
