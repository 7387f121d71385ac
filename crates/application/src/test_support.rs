use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rolebind_core::{AppError, AppResult, UserIdentity};
use rolebind_domain::{BindingName, EmailAddress, RoleBinding, RoleCatalog, RoleId, RoleScope};
use tokio::sync::Mutex;

use crate::{IdentityResolver, ProjectDirectory, RetryPolicy, RoleBindingRepository};

/// In-memory stand-in for the remote RBAC service.
#[derive(Default)]
pub(crate) struct FakeRbacService {
    users: HashMap<String, String>,
    projects: Vec<String>,
    bindings: Mutex<Vec<RoleBinding>>,
    applied: Mutex<Vec<RoleBinding>>,
    resolve_failures: Mutex<VecDeque<AppError>>,
    list_failures: Mutex<VecDeque<AppError>>,
    apply_failures: Mutex<VecDeque<AppError>>,
    resolve_calls: AtomicUsize,
    list_calls: AtomicUsize,
    apply_calls: AtomicUsize,
}

impl FakeRbacService {
    pub(crate) fn with_user(mut self, email: &str, user_id: &str) -> Self {
        self.users.insert(email.to_lowercase(), user_id.to_owned());
        self
    }

    pub(crate) fn with_project(mut self, project: &str) -> Self {
        self.projects.push(project.to_owned());
        self
    }

    pub(crate) fn with_binding(mut self, binding: RoleBinding) -> Self {
        self.bindings.get_mut().push(binding);
        self
    }

    pub(crate) fn failing_resolve(mut self, error: AppError, times: usize) -> Self {
        self.resolve_failures
            .get_mut()
            .extend(std::iter::repeat_n(error, times));
        self
    }

    pub(crate) fn failing_list(mut self, error: AppError, times: usize) -> Self {
        self.list_failures
            .get_mut()
            .extend(std::iter::repeat_n(error, times));
        self
    }

    pub(crate) fn failing_apply(mut self, error: AppError, times: usize) -> Self {
        self.apply_failures
            .get_mut()
            .extend(std::iter::repeat_n(error, times));
        self
    }

    pub(crate) async fn bindings(&self) -> Vec<RoleBinding> {
        self.bindings.lock().await.clone()
    }

    pub(crate) async fn applied(&self) -> Vec<RoleBinding> {
        self.applied.lock().await.clone()
    }

    pub(crate) fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityResolver for FakeRbacService {
    async fn resolve_user(&self, email: &EmailAddress) -> AppResult<UserIdentity> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.resolve_failures.lock().await.pop_front() {
            return Err(error);
        }

        self.users
            .get(&email.as_str().to_lowercase())
            .map(|user_id| UserIdentity::new(email.as_str(), user_id.as_str()))
            .ok_or_else(|| AppError::UserNotFound(email.to_string()))
    }
}

#[async_trait]
impl RoleBindingRepository for FakeRbacService {
    async fn list_role_bindings(&self) -> AppResult<Vec<RoleBinding>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.list_failures.lock().await.pop_front() {
            return Err(error);
        }

        Ok(self.bindings.lock().await.clone())
    }

    async fn apply_binding(&self, binding: &RoleBinding) -> AppResult<()> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.apply_failures.lock().await.pop_front() {
            return Err(error);
        }

        if let Some(project_ref) = binding.project_ref()
            && !self.projects.is_empty()
            && !self.projects.iter().any(|project| project == project_ref)
        {
            return Err(AppError::ProjectNotFound(project_ref.to_owned()));
        }

        let mut bindings = self.bindings.lock().await;
        if let Some(existing) = bindings
            .iter_mut()
            .find(|existing| existing.name() == binding.name())
        {
            *existing = binding.clone();
        } else if bindings.iter().any(|existing| {
            existing.user_id() == binding.user_id()
                && existing.project_ref() == binding.project_ref()
                && (existing.role_ref() == binding.role_ref()
                    || existing.scope() == RoleScope::Organization)
        }) {
            return Err(AppError::BindingConflict(binding.name().to_string()));
        } else {
            bindings.push(binding.clone());
        }

        self.applied.lock().await.push(binding.clone());
        Ok(())
    }
}

#[async_trait]
impl ProjectDirectory for FakeRbacService {
    async fn list_project_names(&self) -> AppResult<Vec<String>> {
        if let Some(error) = self.list_failures.lock().await.pop_front() {
            return Err(error);
        }

        Ok(self.projects.clone())
    }
}

pub(crate) fn role(name: &str) -> RoleId {
    RoleCatalog::standard()
        .parse(name)
        .unwrap_or_else(|error| panic!("test role: {error}"))
}

pub(crate) fn org_binding(name: &str, role: &str, user_id: &str) -> RoleBinding {
    RoleBinding::organization(
        BindingName::existing(name).unwrap_or_else(|error| panic!("test binding name: {error}")),
        role,
        user_id,
    )
}

/// Default backoff without jitter, so paused-clock tests are exact.
pub(crate) fn fixed_retry_policy() -> RetryPolicy {
    RetryPolicy {
        jitter: false,
        ..RetryPolicy::default()
    }
}
