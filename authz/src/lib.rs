//! Authorization policy engine for the CMDB.
//!
//! This crate bridges CMDB resources and actions with an external IAM-style
//! policy authority. It adapts CMDB requests into the authority's vocabulary,
//! compiles the authority's policies into store filters and describes what a
//! denied user would need to apply for.
//!
//! # Architecture Overview
//!
//! A request flows through the crate bottom-up:
//!
//! 1. **Adaptor** ([`adaptor`]) maps `(ResourceType, Action, business)` to
//!    `(TypeId, ActionId)`
//! 2. **Generator** ([`generator`]) turns a [`ResourceAttribute`] into the
//!    [`Resource`] descriptors the authority reasons about
//! 3. **Authority** ([`authority`]) returns the subject's [`Policy`] for an action
//! 4. The policy is either **evaluated** in memory ([`policy::evaluate`]) to
//!    decide the request, or **compiled** ([`compiler`]) into a store filter to
//!    enumerate authorized instances
//! 5. On denial the **permission builder** ([`permission`]) describes what
//!    to apply for
//!
//! [`Authorizer`] sequences these steps for the HTTP service.
//!
//! The authority also needs CMDB's model and instances: [`model`] registers
//! and keeps in sync the resource types, selections and actions, and
//! [`provider`] answers the authority's resource pull callbacks.
//!
//! # Example
//!
//! ```rust
//! use authz::adaptor::convert_resource;
//! use authz::meta::{Action, ResourceType};
//! use authz::ResourceAttribute;
//!
//! let attribute = ResourceAttribute::new(ResourceType::HostInstance, Action::Update)
//!     .with_business(3);
//! let (type_id, action_id) = convert_resource(&attribute).unwrap();
//! assert_eq!(type_id.as_str(), "host");
//! assert_eq!(action_id.as_str(), "edit_biz_host");
//! ```

pub mod adaptor;
pub mod authority;
pub mod client;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod fields;
pub mod generator;
pub mod iam;
pub mod meta;
pub mod model;
pub mod permission;
pub mod policy;
pub mod provider;
pub mod resource;
pub mod store;

#[cfg(test)]
mod testing;

pub use authority::{HttpPolicyAuthority, PolicyAuthority, Subject};
pub use client::{AuthorizeList, Authorizer, Decision, ListAuthorizedResourcesRequest};
pub use compiler::{HostPathResolver, PolicyCompiler};
pub use config::AuthConfig;
pub use context::RequestContext;
pub use error::{AuthzError, Result};
pub use iam::{ActionId, TypeId};
pub use model::ModelRegistrar;
pub use permission::IamPermission;
pub use policy::{ActionPolicy, Policy};
pub use provider::ResourceProvider;
pub use resource::{Resource, ResourceAttribute};
pub use store::{Filter, ResourceStore, SearchParam};
