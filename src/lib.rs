mod ast;
mod engine;
mod error;
mod helpers;
mod interface;
mod lexer;
mod parser;
mod registry;
mod scope;
mod template;
mod value;

// Public exports.
pub use engine::Environment;
pub use error::{SyntaxError, SyntaxErrorKind, TemplateError, TemplateResult};
pub use helpers::{Helper, HelperFn};
pub use interface::{Options, SleuthInterface};
pub use registry::Partial;
pub use scope::HelperOptions;
pub use template::Template;
pub use value::{Object, Value, escape_expression, escape_html};
