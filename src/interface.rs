use std::{collections::HashMap, rc::Rc};

use crate::{Helper, Object, Partial, Template, Value};

/// Per-call compile and render options.
///
/// Helpers and partials listed here are laid over the environment's own
/// registry for this call only. Flags left unset fall back to the
/// environment's defaults.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub(crate) helpers: HashMap<String, Helper>,
    pub(crate) partials: HashMap<String, Partial>,
    pub(crate) known_helpers_only: Option<bool>,
    pub(crate) no_function_values: Option<bool>,
    pub(crate) data: Object,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn helper<N: Into<String>>(mut self, name: N, helper: Helper) -> Self {
        self.helpers.insert(name.into(), helper);
        self
    }

    pub fn partial<N: Into<String>, P: Into<Partial>>(mut self, name: N, partial: P) -> Self {
        self.partials.insert(name.into(), partial.into());
        self
    }

    /// Reject block and argument-taking calls whose head is not a registered helper.
    pub fn known_helpers_only(mut self, enabled: bool) -> Self {
        self.known_helpers_only = Some(enabled);
        self
    }

    /// Never invoke callable context values. Implies `known_helpers_only`.
    pub fn no_function_values(mut self, enabled: bool) -> Self {
        self.no_function_values = Some(enabled);
        self
    }

    /// Seeds `@name` in the root local-data frame.
    pub fn data<N: Into<String>, V: Into<Value>>(mut self, name: N, value: V) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }
}

/// `SleuthInterface` is the compile and render surface of a template
/// environment: a helper registry, a partial registry and a cache of compiled
/// templates keyed by their exact source text.
pub trait SleuthInterface {
    /// `compile` returns the compiled form of `source`, reusing a previous
    /// compilation of the same text when there is one.
    ///
    /// # Errors
    /// - If the template is malformed.
    /// - If it references a missing partial.
    fn compile<S: AsRef<str>>(&self, source: S, options: &Options) -> crate::TemplateResult<Rc<Template>>;

    /// `render` compiles `source` (cached) and renders it against `context`.
    ///
    /// # Errors
    /// - Any compile error.
    /// - Any error raised by a helper, including calls to missing helpers.
    fn render<S: AsRef<str>>(
        &self,
        source: S,
        context: &Value,
        options: &Options,
    ) -> crate::TemplateResult<String>;

    /// Registers or replaces a helper, returning the previous one.
    fn register_helper<N: Into<String>>(&mut self, name: N, helper: Helper) -> Option<Helper>;

    fn unregister_helper<N: AsRef<str>>(&mut self, name: N) -> Option<Helper>;

    /// Registers or replaces a partial, returning the previous one.
    fn register_partial<N: Into<String>, P: Into<Partial>>(
        &mut self,
        name: N,
        partial: P,
    ) -> Option<Partial>;

    fn unregister_partial<N: AsRef<str>>(&mut self, name: N) -> Option<Partial>;
}
