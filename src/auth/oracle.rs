//! Oracle trait, request descriptors and the built-in oracles.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::ResourceType;

/// What the request wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Get,
    List,
    Watch,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "Create",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
            Operation::Get => "Get",
            Operation::List => "List",
            Operation::Watch => "Watch",
        }
    }

    /// True for operations that may write
    pub fn is_mutation(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update | Operation::Delete)
    }
}

/// Everything the oracle gets to see about a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub operation: Operation,
    pub resource: ResourceType,
    /// Empty for requests spanning all tenants
    pub tenant: String,
    pub name: String,
    pub version: String,
}

impl RequestDescriptor {
    pub fn new(operation: Operation, resource: ResourceType, tenant: impl Into<String>) -> Self {
        Self {
            operation,
            resource,
            tenant: tenant.into(),
            name: String::new(),
            version: String::new(),
        }
    }

    pub fn with_target(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.name = name.into();
        self.version = version.into();
        self
    }

    /// Operation name as policies refer to it, e.g. `CreateApplication`
    pub fn operation_name(&self) -> String {
        let resource: String = self
            .resource
            .as_str()
            .split('-')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect();
        format!("{}{}", self.operation.as_str(), resource)
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tenant={}", self.operation_name(), self.tenant)?;
        if !self.name.is_empty() {
            write!(f, " target={}", self.name)?;
            if !self.version.is_empty() {
                write!(f, ":{}", self.version)?;
            }
        }
        Ok(())
    }
}

/// Oracle verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

/// Opaque allow/deny decision for one request
#[async_trait]
pub trait AuthorizationOracle: Send + Sync {
    async fn check(&self, request: &RequestDescriptor) -> Decision;
}

/// Allows every request
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AuthorizationOracle for AllowAll {
    async fn check(&self, _request: &RequestDescriptor) -> Decision {
        Decision::Allow
    }
}

/// Static deny rules by operation name or tenant; everything else is
/// allowed.
#[derive(Debug, Clone, Default)]
pub struct RuleOracle {
    denied_operations: HashSet<String>,
    denied_tenants: HashSet<String>,
}

impl RuleOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny an operation such as `DeleteApplication`
    pub fn deny_operation(mut self, operation: impl Into<String>) -> Self {
        self.denied_operations.insert(operation.into());
        self
    }

    /// Deny every request scoped to `tenant`
    pub fn deny_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.denied_tenants.insert(tenant.into());
        self
    }
}

#[async_trait]
impl AuthorizationOracle for RuleOracle {
    async fn check(&self, request: &RequestDescriptor) -> Decision {
        let operation = request.operation_name();
        if self.denied_operations.contains(&operation) {
            return Decision::Deny(format!("{} is not permitted", operation));
        }
        if self.denied_tenants.contains(&request.tenant) {
            return Decision::Deny(format!("tenant {} is not permitted", request.tenant));
        }
        Decision::Allow
    }
}
