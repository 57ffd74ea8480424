use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    Helper, Options, Partial, Template, TemplateResult, Value,
    interface::SleuthInterface,
    parser::CompileFlags,
    registry::Registry,
};

/// `Environment` is the primary implementation of [`SleuthInterface`]: an
/// independent helper/partial registry plus a compiled-template cache.
///
/// # Examples
///
/// ```
/// use sleuth::{Environment, Helper, Options, SleuthInterface, Value};
/// use serde_json::json;
///
/// let mut env = Environment::new();
/// env.register_helper(
///     "shout",
///     Helper::new(|_, args, _| Ok(Value::from(args[0].to_output().to_uppercase()))),
/// );
/// env.register_partial("greeting", "Hello, {{ shout name }}!");
///
/// let context = Value::from(json!({"name": "world"}));
/// let output = env.render("{{> greeting }}", &context, &Options::new()).unwrap();
/// assert_eq!(output, "Hello, WORLD!");
/// ```
#[derive(Debug, Default)]
pub struct Environment {
    registry: Registry,
    cache: RefCell<HashMap<String, Rc<Template>>>,
    known_helpers_only: bool,
    no_function_values: bool,
}

impl Environment {
    /// Creates an environment with only the built-in helpers and an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment-wide default for [`Options::known_helpers_only`].
    pub fn set_known_helpers_only(&mut self, enabled: bool) -> &mut Self {
        self.known_helpers_only = enabled;
        self
    }

    /// Environment-wide default for [`Options::no_function_values`].
    pub fn set_no_function_values(&mut self, enabled: bool) -> &mut Self {
        self.no_function_values = enabled;
        self
    }

    /// Compiles `source` without consulting or filling the cache.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Syntax` for malformed templates and missing partials.
    pub fn compile_uncached<S: AsRef<str>>(
        &self,
        source: S,
        options: &Options,
    ) -> TemplateResult<Template> {
        let no_function_values = options
            .no_function_values
            .unwrap_or(self.no_function_values);
        let flags = CompileFlags {
            known_helpers_only: no_function_values
                || options
                    .known_helpers_only
                    .unwrap_or(self.known_helpers_only),
            no_function_values,
        };
        let registry = self.registry.merged(options);
        Template::compile(source.as_ref().to_string(), &registry, flags)
    }

    /// Drops every cached compilation.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl SleuthInterface for Environment {
    fn compile<S: AsRef<str>>(&self, source: S, options: &Options) -> TemplateResult<Rc<Template>> {
        let source = source.as_ref();
        if let Some(template) = self.cache.borrow().get(source) {
            tracing::trace!(len = source.len(), "template cache hit");
            return Ok(Rc::clone(template));
        }

        tracing::debug!(len = source.len(), "compiling template");
        let template = Rc::new(self.compile_uncached(source, options)?);
        self.cache
            .borrow_mut()
            .insert(source.to_string(), Rc::clone(&template));
        Ok(template)
    }

    fn render<S: AsRef<str>>(
        &self,
        source: S,
        context: &Value,
        options: &Options,
    ) -> TemplateResult<String> {
        self.compile(source, options)?
            .render_with_data(context, &options.data)
    }

    fn register_helper<N: Into<String>>(&mut self, name: N, helper: Helper) -> Option<Helper> {
        self.registry.register_helper(name.into(), helper)
    }

    fn unregister_helper<N: AsRef<str>>(&mut self, name: N) -> Option<Helper> {
        self.registry.unregister_helper(name.as_ref())
    }

    fn register_partial<N: Into<String>, P: Into<Partial>>(
        &mut self,
        name: N,
        partial: P,
    ) -> Option<Partial> {
        self.registry.register_partial(name.into(), partial.into())
    }

    fn unregister_partial<N: AsRef<str>>(&mut self, name: N) -> Option<Partial> {
        self.registry.unregister_partial(name.as_ref())
    }
}
