mod ast;
mod expression;
mod lexer;
mod params;
mod parser;
mod translate;

pub use ast::{CompareOp, Comparison, Operand, Placeholder, Predicate};
pub use expression::{render, render_update, RenderedExpression, RenderedUpdate};
pub use params::{ParameterBinding, Parameters};
pub use parser::parse;
pub use translate::{
    bind_named_query, bind_query, is_shorthand, translate, FilterExpression, KeyCondition,
    Operation, QueryCondition, SortCondition,
};
