//! Resource set for one site

use crate::{CoreError, Result};
use drsite_api::{Resource, ResourceDescriptor, ResourceKind, Site};
use std::collections::BTreeMap;
use tracing::debug;

/// All resources of one site, keyed by (kind, name).
///
/// A (kind, name) pair appears at most once. Iteration order is by kind,
/// then name, so documents built from a set are stable across runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceSet {
    site: Site,
    resources: BTreeMap<(ResourceKind, String), Resource>,
}

impl ResourceSet {
    pub fn new(site: Site) -> Self {
        Self {
            site,
            resources: BTreeMap::new(),
        }
    }

    /// Build a set from resources, failing on the first duplicate
    pub fn from_resources<I>(site: Site, resources: I) -> Result<Self>
    where
        I: IntoIterator<Item = Resource>,
    {
        let mut set = Self::new(site);
        set.extend(resources)?;
        Ok(set)
    }

    pub fn site(&self) -> Site {
        self.site
    }

    /// Add a resource; a second resource with the same kind and name is rejected
    pub fn insert(&mut self, resource: Resource) -> Result<()> {
        let key = (resource.kind(), resource.name().to_string());
        if self.resources.contains_key(&key) {
            return Err(CoreError::DuplicateResource {
                kind: key.0,
                name: key.1,
            });
        }
        debug!("Added {} {} to {} set", key.0, key.1, self.site);
        self.resources.insert(key, resource);
        Ok(())
    }

    pub fn extend<I>(&mut self, resources: I) -> Result<()>
    where
        I: IntoIterator<Item = Resource>,
    {
        for resource in resources {
            self.insert(resource)?;
        }
        Ok(())
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&Resource> {
        self.resources.get(&(kind, name.to_string()))
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Resources of one kind, ordered by name
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(move |((k, _), _)| *k == kind)
            .map(|(_, resource)| resource)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Number of resources per kind; kinds with none are listed with 0
    pub fn count_by_kind(&self) -> BTreeMap<ResourceKind, usize> {
        let mut counts: BTreeMap<ResourceKind, usize> =
            ResourceKind::ALL.iter().map(|kind| (*kind, 0)).collect();
        for (kind, _) in self.resources.keys() {
            *counts.entry(*kind).or_default() += 1;
        }
        counts
    }

    /// Resources tagged with this set's site
    pub fn descriptors(&self) -> Vec<ResourceDescriptor> {
        self.iter()
            .map(|resource| ResourceDescriptor::new(self.site, resource.clone()))
            .collect()
    }
}

impl IntoIterator for ResourceSet {
    type Item = Resource;
    type IntoIter = std::collections::btree_map::IntoValues<(ResourceKind, String), Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drsite_api::resources::{FirewallRule, Network};

    fn network(name: &str) -> Resource {
        Resource::from(Network {
            name: name.to_string(),
            ..Default::default()
        })
    }

    fn rule(name: &str) -> Resource {
        Resource::from(FirewallRule {
            name: name.to_string(),
            network: "rai-vpc".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut set = ResourceSet::new(Site::Primary);
        set.insert(network("rai-vpc")).unwrap();
        let err = set.insert(network("rai-vpc")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DuplicateResource { kind: ResourceKind::Network, .. }
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_same_name_different_kind() {
        let set =
            ResourceSet::from_resources(Site::Primary, vec![network("rai"), rule("rai")]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(ResourceKind::Network, "rai"));
        assert!(set.contains(ResourceKind::FirewallRule, "rai"));
        assert!(!set.contains(ResourceKind::Subnetwork, "rai"));
    }

    #[test]
    fn test_of_kind_ordered_by_name() {
        let set = ResourceSet::from_resources(
            Site::Primary,
            vec![rule("b-rule"), network("rai-vpc"), rule("a-rule")],
        )
        .unwrap();
        let names: Vec<&str> = set
            .of_kind(ResourceKind::FirewallRule)
            .map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["a-rule", "b-rule"]);
    }

    #[test]
    fn test_count_by_kind_lists_every_kind() {
        let set = ResourceSet::from_resources(Site::Dr, vec![rule("a"), rule("b")]).unwrap();
        let counts = set.count_by_kind();
        assert_eq!(counts.len(), ResourceKind::ALL.len());
        assert_eq!(counts[&ResourceKind::FirewallRule], 2);
        assert_eq!(counts[&ResourceKind::Network], 0);
    }

    #[test]
    fn test_descriptors_carry_site() {
        let set = ResourceSet::from_resources(Site::Dr, vec![network("rai-vpc-dr")]).unwrap();
        let descriptors = set.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].site, Site::Dr);
        assert_eq!(descriptors[0].name(), "rai-vpc-dr");
    }
}
