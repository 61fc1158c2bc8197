//! Keeps the authority's copy of the CMDB model in line with [`catalogue`].
//!
//! Entries depend on each other: actions reference selections and types,
//! selections reference types. Deletions therefore run actions first and
//! types last, registrations the other way round. An action's policies are
//! dropped before the action itself.

use super::catalogue::{self, is_sys_instance_selection, validate_object};
use super::{
    ActionGroup, DeleteCmdbResourceParam, IamModelClient, InstanceSelection, ModelObject,
    RegisteredSystemInfo, ResourceAction, ResourceType, SysConfig, System, SystemQueryField,
    PROVIDER_AUTH_BASIC,
};
use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::error::{AuthzError, Result};
use crate::iam::{ActionId, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Selection mode the authority reports when none was registered.
const SELECTION_MODE_INSTANCE: &str = "instance";

/// Suffix that parks a name while its holder is renamed or removed.
const NAME_PARKING_SUFFIX: &str = "_";

const SYNC_FIELDS: [SystemQueryField; 4] = [
    SystemQueryField::ResourceTypes,
    SystemQueryField::Actions,
    SystemQueryField::ActionGroups,
    SystemQueryField::InstanceSelections,
];

/// An entry of the model with a unique id and unique names.
trait ModelEntry: Clone {
    type Id: Ord + Clone + std::hash::Hash;

    fn entry_id(&self) -> &Self::Id;
    fn names(&self) -> (&str, &str);
    fn names_mut(&mut self) -> (&mut String, &mut String);

    /// Prepares a leftover entry for the update that parks its names.
    fn before_parking(&mut self) {}
}

impl ModelEntry for ResourceType {
    type Id = TypeId;

    fn entry_id(&self) -> &TypeId {
        &self.id
    }

    fn names(&self) -> (&str, &str) {
        (&self.name, &self.name_en)
    }

    fn names_mut(&mut self) -> (&mut String, &mut String) {
        (&mut self.name, &mut self.name_en)
    }

    fn before_parking(&mut self) {
        if self.version == 0 {
            self.version = super::MODEL_VERSION;
        }
    }
}

impl ModelEntry for InstanceSelection {
    type Id = String;

    fn entry_id(&self) -> &String {
        &self.id
    }

    fn names(&self) -> (&str, &str) {
        (&self.name, &self.name_en)
    }

    fn names_mut(&mut self) -> (&mut String, &mut String) {
        (&mut self.name, &mut self.name_en)
    }
}

impl ModelEntry for ResourceAction {
    type Id = ActionId;

    fn entry_id(&self) -> &ActionId {
        &self.id
    }

    fn names(&self) -> (&str, &str) {
        (&self.name, &self.name_en)
    }

    fn names_mut(&mut self) -> (&mut String, &mut String) {
        (&mut self.name, &mut self.name_en)
    }
}

struct Comparison<T: ModelEntry> {
    new: Vec<T>,
    /// Parking renames first, then the real updates.
    update: Vec<T>,
    removed: Vec<T::Id>,
}

/// Splits the generated entries into new and changed ones and lists the
/// registered entries nothing generates anymore.
///
/// Names are unique in the authority, so an update may not take a name that
/// another entry still holds. When an updated entry's current name is wanted
/// by another generated entry, it is first parked under `<name>_`. With
/// `park_removed`, leftovers holding a wanted name are parked the same way
/// before they are deleted.
fn cross_compare<T: ModelEntry>(
    registered: &[T],
    generated: Vec<T>,
    unchanged: impl Fn(&T, &T) -> bool,
    park_removed: bool,
) -> Comparison<T> {
    let mut leftover: BTreeMap<T::Id, T> = registered
        .iter()
        .map(|entry| (entry.entry_id().clone(), entry.clone()))
        .collect();
    let mut names: HashMap<String, T::Id> = HashMap::new();
    let mut names_en: HashMap<String, T::Id> = HashMap::new();

    let mut new = Vec::new();
    let mut updates: Vec<(T, T)> = Vec::new();
    for entry in generated {
        let (name, name_en) = entry.names();
        names.insert(name.to_string(), entry.entry_id().clone());
        names_en.insert(name_en.to_string(), entry.entry_id().clone());

        match leftover.remove(entry.entry_id()) {
            Some(previous) if unchanged(&previous, &entry) => {}
            Some(previous) => updates.push((previous, entry)),
            None => new.push(entry),
        }
    }

    let held_by_other = |map: &HashMap<String, T::Id>, name: &str, id: &T::Id| {
        map.get(name).is_some_and(|holder| holder != id)
    };

    let mut parked = Vec::new();
    for (previous, entry) in &updates {
        let (prev_name, prev_name_en) = previous.names();
        let mut interim = entry.clone();
        let mut conflict = false;
        if held_by_other(&names, prev_name, entry.entry_id()) {
            *interim.names_mut().0 = format!("{}{}", prev_name, NAME_PARKING_SUFFIX);
            conflict = true;
        }
        if held_by_other(&names_en, prev_name_en, entry.entry_id()) {
            *interim.names_mut().1 = format!("{}{}", prev_name_en, NAME_PARKING_SUFFIX);
            conflict = true;
        }
        if conflict {
            parked.push(interim);
        }
    }

    let mut removed = Vec::with_capacity(leftover.len());
    for (id, mut entry) in leftover {
        if park_removed {
            let (name, name_en) = entry.names();
            let name_taken = names.contains_key(name);
            let name_en_taken = names_en.contains_key(name_en);
            if name_taken || name_en_taken {
                let (name, name_en) = entry.names_mut();
                if name_taken {
                    name.push_str(NAME_PARKING_SUFFIX);
                }
                if name_en_taken {
                    name_en.push_str(NAME_PARKING_SUFFIX);
                }
                entry.before_parking();
                parked.push(entry);
            }
        }
        removed.push(id);
    }

    parked.extend(updates.into_iter().map(|(_, entry)| entry));
    Comparison {
        new,
        update: parked,
        removed,
    }
}

fn resource_type_unchanged(registered: &ResourceType, generated: &ResourceType) -> bool {
    registered.id == generated.id
        && registered.name == generated.name
        && registered.name_en == generated.name_en
        && registered.description == generated.description
        && registered.description_en == generated.description_en
        && registered.version >= generated.version
        && registered.provider_config.path == generated.provider_config.path
        && registered.parents == generated.parents
}

fn selection_mode(mode: &str) -> &str {
    if mode.is_empty() {
        SELECTION_MODE_INSTANCE
    } else {
        mode
    }
}

/// Related selections are not compared: the authority does not return them.
fn action_unchanged(registered: &ResourceAction, generated: &ResourceAction) -> bool {
    registered.id == generated.id
        && registered.name == generated.name
        && registered.name_en == generated.name_en
        && registered.action_type == generated.action_type
        && registered.version >= generated.version
        && registered.related_resource_types.len() == generated.related_resource_types.len()
        && registered
            .related_resource_types
            .iter()
            .zip(&generated.related_resource_types)
            .all(|(a, b)| {
                a.id == b.id
                    && selection_mode(&a.selection_mode) == selection_mode(&b.selection_mode)
                    && a.scope == b.scope
            })
        && registered.related_actions == generated.related_actions
}

/// Generated dynamic entries the authority lacks, and dynamic entries it
/// holds that nothing generates.
fn diff_dynamic<T: ModelEntry>(
    generated: Vec<T>,
    registered: &[T],
    is_dynamic: impl Fn(&T::Id) -> bool,
) -> (Vec<T>, Vec<T::Id>) {
    let mut stale: BTreeSet<T::Id> = registered
        .iter()
        .map(|entry| entry.entry_id())
        .filter(|&id| is_dynamic(id))
        .cloned()
        .collect();
    let added = generated
        .into_iter()
        .filter(|entry| !stale.remove(entry.entry_id()))
        .collect();
    (added, stale.into_iter().collect())
}

/// Ids of `requested` the authority actually holds.
fn registered_ids<T: ModelEntry>(requested: &[T::Id], registered: &[T]) -> Vec<T::Id> {
    let known: HashSet<&T::Id> = registered.iter().map(ModelEntry::entry_id).collect();
    requested
        .iter()
        .filter(|id| known.contains(id))
        .cloned()
        .collect()
}

/// The groups restricted to actions in `existing`; groups left empty are dropped.
fn groups_with_existing_actions(
    groups: Vec<ActionGroup>,
    existing: &HashSet<ActionId>,
) -> Vec<ActionGroup> {
    groups
        .into_iter()
        .filter_map(|mut group| {
            group.actions.retain(|action| existing.contains(&action.id));
            group.sub_groups = groups_with_existing_actions(group.sub_groups, existing);
            (!group.actions.is_empty() || !group.sub_groups.is_empty()).then_some(group)
        })
        .collect()
}

/// Registers CMDB with the authority and keeps its model in sync.
pub struct ModelRegistrar {
    config: AuthConfig,
    client: Arc<dyn IamModelClient>,
}

impl ModelRegistrar {
    pub fn new(config: AuthConfig, client: Arc<dyn IamModelClient>) -> Self {
        Self { config, client }
    }

    fn system(&self, host: &str) -> System {
        System {
            id: self.config.system_id.clone(),
            name: self.config.system_name.clone(),
            name_en: self.config.system_id.clone(),
            clients: self.config.system_id.clone(),
            provider_config: Some(SysConfig {
                host: host.to_string(),
                auth: PROVIDER_AUTH_BASIC.to_string(),
            }),
            ..Default::default()
        }
    }

    async fn system_info(
        &self,
        ctx: &RequestContext,
        fields: &[SystemQueryField],
    ) -> Result<RegisteredSystemInfo> {
        self.client.get_system_info(ctx, fields).await?.ok_or_else(|| {
            AuthzError::remote(
                ctx.rid.clone(),
                format!("system {} is not registered", self.config.system_id),
            )
        })
    }

    pub async fn is_registered(&self, ctx: &RequestContext) -> Result<bool> {
        let info = self
            .client
            .get_system_info(ctx, &[SystemQueryField::BaseInfo])
            .await?;
        Ok(info.is_some())
    }

    /// Registers the bare system when the authority does not know it yet.
    pub async fn register_to_iam(&self, ctx: &RequestContext, host: &str) -> Result<()> {
        if self.is_registered(ctx).await? {
            return Ok(());
        }
        self.client.register_system(ctx, &self.system(host)).await?;
        info!(rid = %ctx.rid, host, "registered system {}", self.config.system_id);
        Ok(())
    }

    /// What the authority holds, registering the system first when missing
    /// and pointing its pull callback at `host`.
    async fn register_system(
        &self,
        ctx: &RequestContext,
        host: &str,
    ) -> Result<RegisteredSystemInfo> {
        let Some(info) = self
            .client
            .get_system_info(ctx, &SystemQueryField::ALL)
            .await?
        else {
            self.client.register_system(ctx, &self.system(host)).await?;
            info!(rid = %ctx.rid, host, "registered system {}", self.config.system_id);
            return Ok(RegisteredSystemInfo::default());
        };

        let registered_host = info
            .base_info
            .provider_config
            .as_ref()
            .map(|config| config.host.as_str());
        if registered_host != Some(host) {
            let config = SysConfig {
                host: host.to_string(),
                auth: PROVIDER_AUTH_BASIC.to_string(),
            };
            self.client.update_system_config(ctx, &config).await?;
            info!(rid = %ctx.rid, from = ?registered_host, to = host, "updated provider host");
        }
        Ok(info)
    }

    async fn remove_actions(&self, ctx: &RequestContext, ids: &[ActionId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        info!(rid = %ctx.rid, count = ids.len(), "deleting actions {:?}", ids);
        for id in ids {
            self.client.delete_action_policies(ctx, id).await?;
        }
        self.client.delete_actions(ctx, ids).await
    }

    async fn remove_selections(&self, ctx: &RequestContext, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        info!(rid = %ctx.rid, count = ids.len(), "deleting instance selections {:?}", ids);
        self.client.delete_instance_selections(ctx, ids).await
    }

    async fn remove_types(&self, ctx: &RequestContext, ids: &[TypeId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        info!(rid = %ctx.rid, count = ids.len(), "deleting resource types {:?}", ids);
        self.client.delete_resource_types(ctx, ids).await
    }

    /// Registers the whole model: the system, the static catalogue and the
    /// dynamic entries of `objects`. Safe to call on every start.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        host: &str,
        objects: &[ModelObject],
    ) -> Result<()> {
        if !self.config.enabled {
            debug!(rid = %ctx.rid, "authorization disabled, skip model registration");
            return Ok(());
        }
        for object in objects {
            validate_object(object)?;
        }

        let registered = self.register_system(ctx, host).await?;
        let types = cross_compare(
            &registered.resource_types,
            catalogue::resource_types(objects),
            resource_type_unchanged,
            true,
        );
        let selections = cross_compare(
            &registered.instance_selections,
            catalogue::instance_selections(objects),
            |a, b| a == b,
            true,
        );
        let actions = cross_compare(
            &registered.actions,
            catalogue::actions(objects),
            action_unchanged,
            false,
        );

        self.remove_actions(ctx, &actions.removed).await?;

        for resource in &types.update {
            self.client.update_resource_type(ctx, resource).await?;
        }
        if !types.new.is_empty() {
            self.client.register_resource_types(ctx, &types.new).await?;
        }
        for selection in &selections.update {
            self.client.update_instance_selection(ctx, selection).await?;
        }
        if !selections.new.is_empty() {
            self.client
                .register_instance_selections(ctx, &selections.new)
                .await?;
        }
        for action in &actions.update {
            self.client.update_action(ctx, action).await?;
        }
        if !actions.new.is_empty() {
            self.client.register_actions(ctx, &actions.new).await?;
        }

        self.remove_selections(ctx, &selections.removed).await?;
        self.remove_types(ctx, &types.removed).await?;

        let groups = catalogue::action_groups(objects);
        if registered.action_groups.is_empty() {
            self.client.register_action_groups(ctx, &groups).await?;
        } else if registered.action_groups != groups {
            self.client.update_action_groups(ctx, &groups).await?;
        }

        let creator_actions = catalogue::resource_creator_actions(objects);
        if registered.resource_creator_actions.config.is_empty() {
            self.client
                .register_resource_creator_actions(ctx, &creator_actions)
                .await?;
        } else if registered.resource_creator_actions != creator_actions {
            self.client
                .update_resource_creator_actions(ctx, &creator_actions)
                .await?;
        }

        let common_actions = catalogue::common_actions();
        if registered.common_actions.is_empty() {
            self.client.register_common_actions(ctx, &common_actions).await?;
        } else if registered.common_actions != common_actions {
            self.client.update_common_actions(ctx, &common_actions).await?;
        }

        info!(
            rid = %ctx.rid,
            new_types = types.new.len(),
            new_actions = actions.new.len(),
            removed_actions = actions.removed.len(),
            "model registered"
        );
        Ok(())
    }

    /// Aligns the dynamic entries held by the authority with `objects`,
    /// leaving the static catalogue untouched.
    pub async fn sync_sys_instances(
        &self,
        ctx: &RequestContext,
        objects: &[ModelObject],
    ) -> Result<()> {
        for object in objects {
            if let Err(e) = validate_object(object) {
                warn!(rid = %ctx.rid, object = ?object, "cannot sync invalid model");
                return Err(e);
            }
        }

        let registered = self.system_info(ctx, &SYNC_FIELDS).await?;
        let generated_actions = catalogue::dynamic_actions(objects);
        let generated_action_ids: Vec<ActionId> =
            generated_actions.iter().map(|a| a.id.clone()).collect();

        let (added_actions, deleted_actions) =
            diff_dynamic(generated_actions, &registered.actions, ActionId::is_sys_instance);
        let (added_selections, deleted_selections) = diff_dynamic(
            catalogue::dynamic_instance_selections(objects),
            &registered.instance_selections,
            |id: &String| is_sys_instance_selection(id),
        );
        let (added_types, deleted_types) = diff_dynamic(
            catalogue::dynamic_resource_types(objects),
            &registered.resource_types,
            TypeId::is_sys_instance,
        );

        // Delete before adding: a dropped selection may free the name a new one takes.
        self.remove_actions(ctx, &deleted_actions).await?;
        self.remove_selections(ctx, &deleted_selections).await?;
        self.remove_types(ctx, &deleted_types).await?;

        if !added_types.is_empty() {
            info!(rid = %ctx.rid, count = added_types.len(), "adding resource types");
            self.client.register_resource_types(ctx, &added_types).await?;
        }
        if !added_selections.is_empty() {
            info!(rid = %ctx.rid, count = added_selections.len(), "adding instance selections");
            self.client
                .register_instance_selections(ctx, &added_selections)
                .await?;
        }
        if !added_actions.is_empty() {
            info!(rid = %ctx.rid, count = added_actions.len(), "adding actions");
            self.client.register_actions(ctx, &added_actions).await?;
        }

        if added_actions.is_empty() && deleted_actions.is_empty() {
            return Ok(());
        }
        let mut existing: HashSet<ActionId> = registered
            .actions
            .iter()
            .filter(|action| !action.id.is_sys_instance())
            .map(|action| action.id.clone())
            .collect();
        existing.extend(generated_action_ids);
        let groups = groups_with_existing_actions(catalogue::action_groups(objects), &existing);
        if !groups.is_empty() {
            self.client.update_action_groups(ctx, &groups).await?;
        }
        Ok(())
    }

    /// Deletes the given entries that the authority holds, then regroups the
    /// remaining actions.
    pub async fn delete_cmdb_resource(
        &self,
        ctx: &RequestContext,
        param: &DeleteCmdbResourceParam,
        objects: &[ModelObject],
    ) -> Result<()> {
        let registered = self.system_info(ctx, &SYNC_FIELDS).await?;

        let actions = registered_ids(&param.action_ids, &registered.actions);
        let selections = registered_ids(
            &param.instance_selection_ids,
            &registered.instance_selections,
        );
        let types = registered_ids(&param.type_ids, &registered.resource_types);

        self.remove_actions(ctx, &actions).await?;
        self.remove_selections(ctx, &selections).await?;
        self.remove_types(ctx, &types).await?;

        if actions.is_empty() {
            return Ok(());
        }
        let deleted: HashSet<&ActionId> = actions.iter().collect();
        let existing: HashSet<ActionId> = registered
            .actions
            .iter()
            .map(|action| action.id.clone())
            .filter(|id| !deleted.contains(id))
            .collect();
        let groups = groups_with_existing_actions(catalogue::action_groups(objects), &existing);
        if !groups.is_empty() {
            self.client.update_action_groups(ctx, &groups).await?;
        }
        Ok(())
    }
}
