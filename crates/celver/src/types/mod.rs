//! Type system and declarations.

mod cel_type;
mod decls;

pub use cel_type::CelType;
pub use decls::{FunctionDecl, FunctionImpl, OverloadDecl, VariableDecl};
