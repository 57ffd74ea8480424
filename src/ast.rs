use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use crate::{Template, Value, helpers::Helper};

/// A compiled unit of template output. Evaluation lives in `template.rs`.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    /// Literal text or a constant argument.
    Const(Value),
    /// `.`, `this`, `..`, or `@.` style references to a whole level.
    This { data: bool, up: usize },
    /// A dotted lookup, optionally against the local-data frame.
    Path(Path),
    /// `{{{ expr }}}` and `{{& expr }}`.
    Unquoted(Box<Node>),
    /// `{{ expr }}`, escaped unless the value is already safe.
    Quoted(Box<Node>),
    /// Emptiness negation, the head of a `{{^expr}}` section.
    Not(Box<Node>),
    Helper(Box<HelperCall>),
    Partial(PartialCall),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Path {
    pub names: Vec<String>,
    /// Read from the `@` data frame instead of the context.
    pub data: bool,
    pub up: usize,
    /// Invoke the resolved value if it is callable.
    pub run_func: bool,
}

/// An ordered run of nodes whose outputs are concatenated.
#[derive(Debug, Clone, Default)]
pub(crate) struct Fragments(pub Vec<Node>);

impl Fragments {
    pub fn push(&mut self, node: Node) {
        self.0.push(node);
    }
}

/// How a helper call finds its function.
#[derive(Debug, Clone)]
pub(crate) enum Callee {
    /// Bound from the registry while parsing.
    Static(Helper),
    /// Resolved from the context on every render.
    Dynamic(Node),
}

#[derive(Debug, Clone)]
pub(crate) struct HelperCall {
    pub callee: Callee,
    /// `helperMissing` or `blockHelperMissing`, used when a dynamic head is not callable.
    pub fallback: Option<Helper>,
    pub args: Vec<Node>,
    pub hash: Vec<(String, Node)>,
    pub then: Option<Fragments>,
    pub inverse: Option<Fragments>,
    /// Source text of the call head, reported to helpers and matched against close tags.
    pub name: String,
    /// Chained `{{else helper}}` blocks attach to the enclosing block's parent frame.
    pub skip_level: bool,
}

/// How a partial call reaches its template.
#[derive(Debug, Clone)]
pub(crate) enum PartialTarget {
    Compiled(Rc<Template>),
    /// The partial was still compiling when referenced, i.e. it includes
    /// itself. Filled once that compilation finishes; weak to avoid a cycle.
    Pending(Rc<RefCell<Weak<Template>>>),
}

impl PartialTarget {
    pub fn resolve(&self) -> Option<Rc<Template>> {
        match self {
            Self::Compiled(template) => Some(Rc::clone(template)),
            Self::Pending(slot) => slot.borrow().upgrade(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PartialCall {
    pub name: String,
    pub target: PartialTarget,
    pub args: Vec<Node>,
    pub hash: Vec<(String, Node)>,
}
