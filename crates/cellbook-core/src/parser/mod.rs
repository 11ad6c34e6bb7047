//! Command language parser.
//!
//! Cells are parsed one line at a time. Parsing depends on the variable
//! context (bare identifiers in argument lists resolve to the values bound at
//! the moment the line is reached), so the interpreter calls [`parse_line`]
//! lazily inside its line loop rather than parsing the whole cell up front.
//!
//! The grammar:
//!
//! ```text
//! // comment            # comment
//! display(value)        display(value, "table")
//! name = Namespace.function(args)
//! name = literal-or-variable
//! Namespace.function(args)
//! name
//! ```

mod literal;
mod statement;

pub use literal::{parse_args, parse_value};
pub use statement::{Call, Statement, parse_call, parse_line};

pub(crate) use literal::{Item, parse_items};
