use std::{
    borrow::Cow,
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use crate::{
    Options, Template, TemplateResult,
    ast::PartialTarget,
    helpers::{Helper, builtins},
    parser::CompileFlags,
};

/// A registered partial. Sources are compiled the first time a template uses
/// them and the compiled form replaces the source in place.
#[derive(Debug, Clone)]
pub enum Partial {
    Source(Rc<str>),
    Compiled(Rc<Template>),
}

impl From<&str> for Partial {
    fn from(source: &str) -> Self {
        Self::Source(Rc::from(source))
    }
}

impl From<String> for Partial {
    fn from(source: String) -> Self {
        Self::Source(Rc::from(source))
    }
}

impl From<Template> for Partial {
    fn from(template: Template) -> Self {
        Self::Compiled(Rc::new(template))
    }
}

impl From<Rc<Template>> for Partial {
    fn from(template: Rc<Template>) -> Self {
        Self::Compiled(template)
    }
}

/// Name to helper and name to partial mappings shared by everything compiled
/// against them.
#[derive(Debug, Clone)]
pub(crate) struct Registry {
    helpers: HashMap<String, Helper>,
    partials: RefCell<HashMap<String, Partial>>,
    /// Partials whose compilation is in progress, with the slot their
    /// self-references are bound to.
    compiling: RefCell<HashMap<String, Rc<RefCell<Weak<Template>>>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            helpers: builtins()
                .into_iter()
                .map(|(name, helper)| (name.to_string(), helper))
                .collect(),
            partials: RefCell::default(),
            compiling: RefCell::default(),
        }
    }
}

impl Registry {
    pub fn helper(&self, name: &str) -> Option<&Helper> {
        self.helpers.get(name)
    }

    pub fn register_helper(&mut self, name: String, helper: Helper) -> Option<Helper> {
        self.helpers.insert(name, helper)
    }

    pub fn unregister_helper(&mut self, name: &str) -> Option<Helper> {
        self.helpers.remove(name)
    }

    pub fn register_partial(&mut self, name: String, partial: Partial) -> Option<Partial> {
        self.partials.get_mut().insert(name, partial)
    }

    pub fn unregister_partial(&mut self, name: &str) -> Option<Partial> {
        self.partials.get_mut().remove(name)
    }

    /// This registry with the per-call helpers and partials of `options` laid over it.
    pub fn merged<'a>(&'a self, options: &Options) -> Cow<'a, Registry> {
        if options.helpers.is_empty() && options.partials.is_empty() {
            return Cow::Borrowed(self);
        }
        let mut registry = self.clone();
        registry.helpers.extend(
            options
                .helpers
                .iter()
                .map(|(name, helper)| (name.clone(), helper.clone())),
        );
        registry.partials.get_mut().extend(
            options
                .partials
                .iter()
                .map(|(name, partial)| (name.clone(), partial.clone())),
        );
        Cow::Owned(registry)
    }

    /// Resolves a partial, compiling and memoizing it on first use.
    ///
    /// A partial referenced while it is itself being compiled (directly or
    /// through other partials) resolves to a pending target that is bound
    /// once the outer compilation succeeds.
    pub fn partial(
        &self,
        name: &str,
        flags: CompileFlags,
    ) -> TemplateResult<Option<PartialTarget>> {
        if let Some(slot) = self.compiling.borrow().get(name) {
            return Ok(Some(PartialTarget::Pending(Rc::clone(slot))));
        }
        let source = match self.partials.borrow().get(name) {
            None => return Ok(None),
            Some(Partial::Compiled(template)) => {
                return Ok(Some(PartialTarget::Compiled(Rc::clone(template))));
            }
            Some(Partial::Source(source)) => Rc::clone(source),
        };

        tracing::debug!(partial = name, "compiling partial");
        let slot = Rc::new(RefCell::new(Weak::new()));
        self.compiling
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&slot));
        let compiled = Template::compile(source.to_string(), self, flags);
        self.compiling.borrow_mut().remove(name);

        let template = Rc::new(compiled?);
        *slot.borrow_mut() = Rc::downgrade(&template);
        self.partials
            .borrow_mut()
            .insert(name.to_string(), Partial::Compiled(Rc::clone(&template)));
        Ok(Some(PartialTarget::Compiled(template)))
    }
}
