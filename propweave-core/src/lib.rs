#![forbid(unsafe_code)]

mod config;
mod error;
mod matcher;
mod mem_access;
mod signature;
mod subst;
pub mod visit;

pub use config::MatchOptions;
pub use error::{ConfigError, InstantiateError};
pub use matcher::{ExprMatcher, MatchResult, Mismatch};
pub use mem_access::{MemAccess, collect_cmd_mem_accesses, collect_mem_accesses};
pub use signature::{
    ANY_PARAMS, AttributeOracle, KeyValueSubset, NAME_WILDCARD_PREFIX, SigMatch, SigMismatch,
    SignatureMatcher, filter_params,
};
pub use subst::{Instantiate, Substituter, Substitution, instantiate_cmds};
pub use visit::{collect_cmd_identifiers, collect_identifiers, free_decls};
