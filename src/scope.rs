use std::rc::Rc;

use crate::{
    Object, TemplateResult, Value,
    ast::{Fragments, HelperCall},
};

/// One frame of the block-helper call stack.
///
/// Every helper call opens a frame that remembers the context it was called
/// with, borrows its parent frame, and shares the parent's local-data map
/// (`@index`, `@root`, ...). Helpers that need new local data copy the map with
/// [`HelperOptions::create_frame`] and render through
/// [`HelperOptions::then_with_data`]; the parent's map is never mutated.
#[derive(Clone)]
pub struct HelperOptions<'a> {
    context: Value,
    parent: Option<&'a HelperOptions<'a>>,
    data: Rc<Object>,
    hash: Rc<Object>,
    then: Option<&'a Fragments>,
    inverse: Option<&'a Fragments>,
    name: &'a str,
}

impl HelperOptions<'static> {
    /// The frame a top-level render starts from: `@root` plus any seeded data.
    pub(crate) fn root(context: &Value, seed: &Object) -> Self {
        let mut data = Object::with_capacity(seed.len() + 1);
        data.insert("root".to_string(), context.clone());
        data.extend(seed.iter().map(|(key, value)| (key.clone(), value.clone())));
        Self {
            context: Value::Undefined,
            parent: None,
            data: Rc::new(data),
            hash: Rc::default(),
            then: None,
            inverse: None,
            name: "",
        }
    }
}

impl<'a> HelperOptions<'a> {
    /// A plain child frame, as opened when a partial renders.
    pub(crate) fn child<'b>(&'b self, context: Value) -> HelperOptions<'b> {
        HelperOptions {
            context,
            parent: Some(self),
            data: Rc::clone(&self.data),
            hash: Rc::default(),
            then: None,
            inverse: None,
            name: "",
        }
    }

    /// The frame handed to the helper of `call`.
    pub(crate) fn for_call<'b>(
        &'b self,
        context: Value,
        call: &'b HelperCall,
        hash: Object,
    ) -> HelperOptions<'b> {
        let parent: &'b HelperOptions<'b> = match self.parent {
            Some(parent) if call.skip_level => parent,
            _ => self,
        };
        HelperOptions {
            context,
            parent: Some(parent),
            data: Rc::clone(&self.data),
            hash: Rc::new(hash),
            then: call.then.as_ref(),
            inverse: call.inverse.as_ref(),
            name: &call.name,
        }
    }

    /// Walks `levels` frames up. `None` once the chain runs out.
    pub(crate) fn walk(&self, levels: usize) -> Option<&HelperOptions<'a>> {
        let mut frame = self;
        for _ in 0..levels {
            frame = frame.parent?;
        }
        Some(frame)
    }

    /// The context this frame's helper was called with.
    pub(crate) const fn context(&self) -> &Value {
        &self.context
    }

    pub(crate) fn data_value(&self) -> Value {
        Value::Object(Rc::clone(&self.data))
    }

    /// Local data visible through `@name`.
    pub fn data(&self) -> &Object {
        &self.data
    }

    /// Resolved `key=value` arguments of the call.
    pub fn hash(&self) -> &Object {
        &self.hash
    }

    /// The helper name as written at the call site.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Whether the call has a block body, i.e. it was opened with `{{#` or `{{{{`.
    pub const fn is_block(&self) -> bool {
        self.then.is_some()
    }

    /// Renders the main block body against `context`. Without a body this is
    /// the empty string.
    ///
    /// # Errors
    /// Whatever rendering the body raises, e.g. `TemplateError::MissingHelper`
    /// or an error from a nested helper.
    pub fn then(&self, context: &Value) -> TemplateResult<String> {
        match self.then {
            Some(body) => body.render(context, self),
            None => Ok(String::new()),
        }
    }

    /// Renders the `{{else}}` body against `context`.
    ///
    /// # Errors
    /// The same failures as [`HelperOptions::then`].
    pub fn inverse(&self, context: &Value) -> TemplateResult<String> {
        match self.inverse {
            Some(body) => body.render(context, self),
            None => Ok(String::new()),
        }
    }

    /// Renders the main block body with `data` replacing this frame's local data.
    ///
    /// # Errors
    /// The same failures as [`HelperOptions::then`].
    pub fn then_with_data(&self, context: &Value, data: Object) -> TemplateResult<String> {
        let Some(body) = self.then else {
            return Ok(String::new());
        };
        let frame = HelperOptions {
            data: Rc::new(data),
            ..self.clone()
        };
        body.render(context, &frame)
    }

    /// A shallow copy of the local data, ready to be extended.
    pub fn create_frame(&self) -> Object {
        (*self.data).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Callee, Node, Path};
    use crate::helpers::Helper;

    fn call(skip_level: bool, body: Fragments) -> HelperCall {
        HelperCall {
            callee: Callee::Static(Helper::new(|_, _, _| Ok(Value::Undefined))),
            fallback: None,
            args: Vec::new(),
            hash: Vec::new(),
            then: Some(body),
            inverse: None,
            name: "test".to_string(),
            skip_level,
        }
    }

    fn data_path(name: &str, up: usize) -> Node {
        Node::Path(Path {
            names: vec![name.to_string()],
            data: true,
            up,
            run_func: false,
        })
    }

    #[test]
    fn test_root_frame_seeds_data() {
        let mut seed = Object::new();
        seed.insert("misc".to_string(), Value::from("M"));
        let root = HelperOptions::root(&Value::from("ctx"), &seed);
        assert_eq!(root.data().get("root"), Some(&Value::from("ctx")));
        assert_eq!(root.data().get("misc"), Some(&Value::from("M")));
        assert!(root.context().is_undefined());
    }

    #[test]
    fn test_walk_past_root() {
        let root = HelperOptions::root(&Value::Null, &Object::new());
        let child = root.child(Value::from(1));
        let grandchild = child.child(Value::from(2));
        assert_eq!(grandchild.walk(1).map(|f| f.context().clone()), Some(Value::from(1)));
        assert!(grandchild.walk(2).is_some());
        assert!(grandchild.walk(3).is_none());
    }

    #[test]
    fn test_child_shares_data() {
        let root = HelperOptions::root(&Value::Null, &Object::new());
        let child = root.child(Value::Null);
        assert!(Rc::ptr_eq(&root.data, &child.data));
    }

    #[test]
    fn test_skip_level_attaches_to_grandparent() {
        let root = HelperOptions::root(&Value::Null, &Object::new());
        let outer = root.child(Value::from("outer"));

        let chained = call(true, Fragments::default());
        let frame = outer.for_call(Value::Null, &chained, Object::new());
        assert!(frame.walk(1).is_some_and(|f| f.context().is_undefined()));

        let nested = call(false, Fragments::default());
        let frame = outer.for_call(Value::Null, &nested, Object::new());
        assert_eq!(frame.walk(1).map(|f| f.context().clone()), Some(Value::from("outer")));
    }

    #[test]
    fn test_then_with_data_does_not_leak() {
        let root = HelperOptions::root(&Value::Null, &Object::new());
        let body = Fragments(vec![data_path("index", 0)]);
        let block = call(false, body);
        let frame = root.for_call(Value::Null, &block, Object::new());

        let mut data = frame.create_frame();
        data.insert("index".to_string(), Value::from(7));
        assert_eq!(frame.then_with_data(&Value::Null, data).unwrap(), "7");

        assert!(frame.data().get("index").is_none());
        assert!(root.data().get("index").is_none());
    }

    #[test]
    fn test_missing_bodies_render_empty() {
        let root = HelperOptions::root(&Value::Null, &Object::new());
        assert_eq!(root.then(&Value::Null).unwrap(), "");
        assert_eq!(root.inverse(&Value::Null).unwrap(), "");
        assert!(!root.is_block());
    }
}
