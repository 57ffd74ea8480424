use std::fmt;

use crate::{
    HelperOptions, Object, TemplateError, TemplateResult, Value,
    ast::{Callee, Fragments, HelperCall, Node, PartialCall, Path},
    parser::{CompileFlags, Parser},
    registry::Registry,
    value::escape_expression,
};

/// A compiled template.
///
/// Compilation turns the source into a tree of nodes once; rendering walks that
/// tree against a context value and never re-reads the source.
///
/// # Example
///
/// ```rust
/// use sleuth::{Template, Value};
///
/// let template = Template::new("Hello, {{ name }}!").unwrap();
/// let context = Value::from(serde_json::json!({"name": "World"}));
/// assert_eq!(template.render(&context).unwrap(), "Hello, World!");
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Template {
    source: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    body: Fragments,
}

/// Only the source is stored. Deserializing recompiles it with
/// [`Template::new`], so it sees the built-in helpers and no partials: a
/// template that includes `{{> partial}}` fails to deserialize, and helpers
/// registered on an `Environment` are looked up in the context instead (a call
/// with arguments then fails to render with `MissingHelper`). Recompile the
/// source through [`crate::SleuthInterface::compile`] to keep them.
#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Template {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct TemplateSource {
            source: String,
        }

        let helper = TemplateSource::deserialize(deserializer)?;
        Template::new(helper.source)
            .map_err(|e| serde::de::Error::custom(format!("Failed to compile template: {}", e)))
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Template {
    /// Compiles `source` against the built-in helpers.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Syntax` if the template is malformed.
    pub fn new<S: Into<String>>(source: S) -> TemplateResult<Self> {
        Self::compile(source.into(), &Registry::default(), CompileFlags::default())
    }

    pub(crate) fn compile(
        source: String,
        registry: &Registry,
        flags: CompileFlags,
    ) -> TemplateResult<Self> {
        let body = Parser::new(&source, registry, flags).parse()?;
        Ok(Self { source, body })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) const fn body(&self) -> &Fragments {
        &self.body
    }

    /// Renders with `context` as both the current context and `@root`.
    ///
    /// # Arguments
    /// - `context`: the value `{{this}}` and top-level paths resolve against.
    ///
    /// # Errors
    /// - `TemplateError::WrongArgumentCount` if a built-in helper gets the wrong number of arguments.
    /// - `TemplateError::MissingHelper` if a call with arguments names neither a helper nor a callable value.
    /// - `TemplateError::MissingPartial` if a self-including partial never finished compiling.
    /// - Any error returned by a user helper or callable value.
    pub fn render(&self, context: &Value) -> TemplateResult<String> {
        self.render_with_data(context, &Object::new())
    }

    /// Renders with extra entries merged into the root local-data frame.
    ///
    /// # Arguments
    /// - `context`: the current context and `@root`.
    /// - `data`: seeds reachable as `@name` from anywhere in the template.
    ///
    /// # Errors
    /// The same failures as [`Template::render`].
    pub fn render_with_data(&self, context: &Value, data: &Object) -> TemplateResult<String> {
        let frame = HelperOptions::root(context, data);
        self.body.render(context, &frame)
    }

    /// Renders as a partial called from inside `frame`.
    pub(crate) fn render_in(
        &self,
        context: &Value,
        frame: &HelperOptions<'_>,
    ) -> TemplateResult<String> {
        let frame = frame.child(context.clone());
        self.body.render(context, &frame)
    }
}

impl Fragments {
    pub(crate) fn render(
        &self,
        context: &Value,
        frame: &HelperOptions<'_>,
    ) -> TemplateResult<String> {
        let mut output = String::new();
        for node in &self.0 {
            output.push_str(&node.eval(context, frame)?.to_output());
        }
        Ok(output)
    }
}

impl Node {
    pub(crate) fn eval(&self, context: &Value, frame: &HelperOptions<'_>) -> TemplateResult<Value> {
        match self {
            Self::Const(value) => Ok(value.clone()),
            Self::This { data: true, up } => {
                Ok(frame.walk(*up).map_or(Value::Undefined, |f| f.data_value()))
            }
            Self::This { data: false, up: 0 } => Ok(context.clone()),
            Self::This { data: false, up } => Ok(frame
                .walk(up - 1)
                .map_or(Value::Undefined, |f| f.context().clone())),
            Self::Path(path) => path.resolve(context, frame),
            Self::Unquoted(node) => match node.eval(context, frame)? {
                Value::Undefined | Value::Null => Ok(Value::from("")),
                value => Ok(value),
            },
            Self::Quoted(node) => Ok(Value::from(escape_expression(
                &node.eval(context, frame)?,
            ))),
            Self::Not(node) => Ok(Value::Bool(node.eval(context, frame)?.is_empty())),
            Self::Helper(call) => call.invoke(context, frame),
            Self::Partial(call) => call.invoke(context, frame).map(Value::from),
        }
    }
}

impl Path {
    fn resolve(&self, context: &Value, frame: &HelperOptions<'_>) -> TemplateResult<Value> {
        if self.data {
            let Some(level) = frame.walk(self.up) else {
                return Ok(Value::Undefined);
            };
            let mut value = level.data_value();
            for name in &self.names {
                if value.is_nullish() {
                    break;
                }
                value = value.get(name);
            }
            return Ok(value);
        }

        let mut value = match self.up {
            0 => context.clone(),
            up => frame
                .walk(up - 1)
                .map_or(Value::Undefined, |f| f.context().clone()),
        };
        let mut owner = Value::Undefined;
        for name in &self.names {
            if value.is_nullish() {
                break;
            }
            owner = value;
            value = owner.get(name);
        }

        match value {
            Value::Undefined => {
                tracing::trace!(path = %self.names.join("."), "undefined value");
                Ok(Value::Undefined)
            }
            Value::Function(func) if self.run_func => func.call(&owner, &[], frame),
            value => Ok(value),
        }
    }
}

fn eval_hash(
    hash: &[(String, Node)],
    context: &Value,
    frame: &HelperOptions<'_>,
) -> TemplateResult<Object> {
    hash.iter()
        .map(|(key, node)| Ok((key.clone(), node.eval(context, frame)?)))
        .collect()
}

impl HelperCall {
    fn invoke(&self, context: &Value, frame: &HelperOptions<'_>) -> TemplateResult<Value> {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        let helper = match &self.callee {
            Callee::Static(helper) => helper.clone(),
            Callee::Dynamic(head) => match head.eval(context, frame)? {
                Value::Function(helper) => helper,
                value => {
                    args.push(value);
                    self.fallback
                        .clone()
                        .ok_or_else(|| TemplateError::MissingHelper {
                            name: self.name.clone(),
                        })?
                }
            },
        };

        for arg in &self.args {
            args.push(arg.eval(context, frame)?);
        }
        let hash = eval_hash(&self.hash, context, frame)?;

        let options = frame.for_call(context.clone(), self, hash);
        helper.call(context, &args, &options)
    }
}

impl PartialCall {
    fn invoke(&self, context: &Value, frame: &HelperOptions<'_>) -> TemplateResult<String> {
        let template = self
            .target
            .resolve()
            .ok_or_else(|| TemplateError::MissingPartial {
                name: self.name.clone(),
            })?;

        let mut partial_context = match self.args.first() {
            Some(arg) => arg.eval(context, frame)?,
            None => context.clone(),
        };
        if !self.hash.is_empty() {
            let mut merged = match &partial_context {
                Value::Object(map) => (**map).clone(),
                _ => Object::new(),
            };
            merged.extend(eval_hash(&self.hash, context, frame)?);
            partial_context = Value::from(merged);
        }
        template.render_in(&partial_context, frame)
    }
}
