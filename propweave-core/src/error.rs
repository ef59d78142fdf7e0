#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use propweave_ast::Span;
use miette::Diagnostic;
use thiserror::Error;

/// A template could not be instantiated because the substitution turned a
/// position that must name a variable into some other expression. This
/// always points at an inconsistent pattern/template pair.
#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum InstantiateError {
    #[error("assignment target `{var}` must remain an identifier after substitution, got `{found}`")]
    #[diagnostic(
        code(propweave::instantiate::lhs),
        help("the property template binds an assigned variable to a non-variable expression")
    )]
    LhsNotIdentifier {
        var: String,
        found: String,
        #[label("assigned here")]
        span: Span,
    },

    #[error("call output `{var}` must remain an identifier after substitution, got `{found}`")]
    #[diagnostic(code(propweave::instantiate::call_out))]
    CallOutNotIdentifier {
        var: String,
        found: String,
        #[label]
        span: Span,
    },

    #[error("havoc target `{var}` must remain an identifier after substitution, got `{found}`")]
    #[diagnostic(code(propweave::instantiate::havoc))]
    HavocNotIdentifier {
        var: String,
        found: String,
        #[label]
        span: Span,
    },
}

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(propweave::config))]
pub struct ConfigError {
    pub message: String,
}
