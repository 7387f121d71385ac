//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod csv_assignment_reader;
mod http_rbac_client;

pub use csv_assignment_reader::{parse_assignment_rows, preflight_csv_file, read_assignment_rows};
pub use http_rbac_client::{HttpRbacClient, HttpRbacClientConfig};
