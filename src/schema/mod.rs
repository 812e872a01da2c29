//! Document schemas and validation.

pub mod finding;
pub mod profile;
pub mod resolver;
pub mod validator;

pub use finding::{Report, Severity};
pub use profile::ProfileKind;
pub use resolver::FsResolver;
pub use validator::{ValidationOptions, Validator};
