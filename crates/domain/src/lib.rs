//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod assignment;
mod binding;
mod email;
mod role;

pub use assignment::{AssignmentRequest, AssignmentRow, AssignmentTarget, ValidatedAssignment};
pub use binding::{
    BINDING_NAME_MAX_LENGTH, BINDING_SUFFIX_MAX_LENGTH, BindingName, RoleBinding, binding_suffix,
    generate_binding_name, sanitize_name,
};
pub use email::EmailAddress;
pub use role::{DEFAULT_ROLE, RoleCatalog, RoleId, RoleScope};
