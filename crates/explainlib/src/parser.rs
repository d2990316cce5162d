//! Kconfig source parsing: preprocessing, tokenizing and building the menu tree.

mod error;
mod expr;
mod location;
mod macros;
mod menu;
mod streams;
mod string_literal;
mod token;
mod types;

pub(crate) use menu::{MenuParser, Scope};
pub use {error::*, expr::*, location::*, macros::*, streams::*, string_literal::*, token::*, types::*};
