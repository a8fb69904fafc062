//! Command implementations.

mod info;
mod resolve;
mod run;
mod validate;

pub use info::run_info;
pub use resolve::run_resolve;
pub use run::run_session;
pub use validate::run_validate;
