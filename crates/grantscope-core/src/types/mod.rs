//! Types shared by every stage of a reconciliation run.
//!
//! The spec document types describe the declarative input, grant types
//! describe privileges and their targets as seen on the warehouse, and
//! statement types describe the output handed to the executor.

mod grant;
mod serde_utils;
mod spec;
mod statement;

pub use grant::{Container, FutureScope, GrantTarget, ObjectKind, Privilege};
pub use spec::{
    DatabaseConfig, IntegrationConfig, MemberOf, Named, Owns, Privileges, ReadWrite, RoleConfig,
    SpecDocument, UserConfig, WarehouseConfig,
};
pub use statement::{Action, Grantee, Statement};
