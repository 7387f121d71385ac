//! JSON shapes exchanged with the RBAC REST API.

use rolebind_domain::{BindingName, RoleBinding};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub(super) const API_VERSION: &str = "n9/v1alpha";
pub(super) const ROLE_BINDING_KIND: &str = "RoleBinding";

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UsersResponse {
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserEntry {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct ManifestMetadata {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RoleBindingSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub role_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RoleBindingManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: ManifestMetadata,
    pub spec: RoleBindingSpec,
}

impl RoleBindingManifest {
    pub fn from_binding(binding: &RoleBinding) -> Self {
        Self {
            api_version: API_VERSION.to_owned(),
            kind: ROLE_BINDING_KIND.to_owned(),
            metadata: ManifestMetadata {
                name: binding.name().to_string(),
            },
            spec: RoleBindingSpec {
                user: Some(binding.user_id().to_owned()),
                role_ref: binding.role_ref().to_owned(),
                project_ref: binding.project_ref().map(str::to_owned),
            },
        }
    }

    /// Group bindings are not managed here.
    pub fn into_binding(self) -> Option<RoleBinding> {
        let Some(user_id) = self.spec.user.filter(|user| !user.is_empty()) else {
            debug!(binding = %self.metadata.name, "ignoring binding without a user");
            return None;
        };

        match BindingName::existing(self.metadata.name.as_str()) {
            Ok(name) => Some(RoleBinding::new(
                name,
                self.spec.role_ref,
                user_id,
                self.spec.project_ref,
            )),
            Err(error) => {
                warn!(error = %error, user_id = %user_id, "ignoring listed binding without a name");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProjectManifest {
    pub metadata: ManifestMetadata,
}
