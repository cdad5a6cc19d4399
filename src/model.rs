use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ViewKind {
    Subscriptions,
    ResourceGroups,
    Resources,
}

impl ViewKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Subscriptions => "Subscriptions",
            Self::ResourceGroups => "Resource Groups",
            Self::Resources => "Resources",
        }
    }
}

/// Category filter over a resource group's resources.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceTab {
    Clusters,
    Compute,
    Network,
    Storage,
    Web,
    All,
}

impl ResourceTab {
    pub const ALL: [Self; 6] = [
        Self::Clusters,
        Self::Compute,
        Self::Network,
        Self::Storage,
        Self::Web,
        Self::All,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Clusters => "Clusters",
            Self::Compute => "Compute",
            Self::Network => "Network",
            Self::Storage => "Storage",
            Self::Web => "Web",
            Self::All => "All",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|tab| *tab == self)
            .unwrap_or(Self::ALL.len() - 1)
    }

    /// Steps circularly through [`ResourceTab::ALL`].
    pub fn offset(self, delta: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let next = (self.index() as isize + delta).rem_euclid(len) as usize;
        Self::ALL[next]
    }

    pub fn next(self) -> Self {
        self.offset(1)
    }

    pub fn prev(self) -> Self {
        self.offset(-1)
    }

    /// Digit shortcut: 1-based position for the specific tabs, `0` (or the
    /// last position) for All.
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Self::All),
            n if (n as usize) <= Self::ALL.len() => Some(Self::ALL[n as usize - 1]),
            _ => None,
        }
    }

    pub fn shortcut(self) -> u8 {
        match self {
            Self::All => 0,
            other => other.index() as u8 + 1,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SubscriptionState {
    Enabled,
    Disabled,
    Other(String),
}

impl SubscriptionState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "enabled" => Self::Enabled,
            "disabled" => Self::Disabled,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Enabled => "Enabled",
            Self::Disabled => "Disabled",
            Self::Other(raw) if raw.is_empty() => "Unknown",
            Self::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Subscription {
    pub id: String,
    pub display_name: String,
    pub state: SubscriptionState,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceGroup {
    pub name: String,
    pub location: String,
    pub subscription_id: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResourceGroupKey {
    pub subscription_id: String,
    pub resource_group: String,
}

impl ResourceGroupKey {
    pub fn new(subscription_id: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Resource {
    pub name: String,
    pub resource_type: String,
    pub group: ResourceGroupKey,
    pub provisioning_state: Option<String>,
}

impl Resource {
    pub fn status(&self) -> &str {
        self.provisioning_state
            .as_deref()
            .filter(|state| !state.trim().is_empty())
            .unwrap_or("Running")
    }
}

/// Everything fetched during this session. Entries are replaced per key on
/// re-fetch and never evicted.
#[derive(Debug, Clone, Default)]
pub struct EntityCache {
    subscriptions: Vec<Subscription>,
    resource_groups: HashMap<String, Vec<ResourceGroup>>,
    resources: HashMap<ResourceGroupKey, Vec<Resource>>,
}

impl EntityCache {
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn resource_groups(&self, subscription_id: &str) -> &[ResourceGroup] {
        self.resource_groups
            .get(subscription_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn resources(&self, key: &ResourceGroupKey) -> &[Resource] {
        self.resources.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_subscriptions(&mut self, subscriptions: Vec<Subscription>) {
        self.subscriptions = subscriptions;
    }

    pub fn set_resource_groups(&mut self, subscription_id: String, groups: Vec<ResourceGroup>) {
        self.resource_groups.insert(subscription_id, groups);
    }

    pub fn set_resources(&mut self, key: ResourceGroupKey, resources: Vec<Resource>) {
        self.resources.insert(key, resources);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EntityCache, Resource, ResourceGroup, ResourceGroupKey, ResourceTab, SubscriptionState,
    };

    #[test]
    fn tab_cycling_wraps_in_both_directions() {
        assert_eq!(ResourceTab::All.next(), ResourceTab::Clusters);
        assert_eq!(ResourceTab::Clusters.prev(), ResourceTab::All);
        for tab in ResourceTab::ALL {
            assert_eq!(tab.next().prev(), tab);
            assert_eq!(tab.prev().next(), tab);
            let mut cycled = tab;
            for _ in 0..ResourceTab::ALL.len() {
                cycled = cycled.next();
            }
            assert_eq!(cycled, tab);
        }
    }

    #[test]
    fn digit_shortcuts_map_to_positions() {
        assert_eq!(ResourceTab::from_digit(1), Some(ResourceTab::Clusters));
        assert_eq!(ResourceTab::from_digit(5), Some(ResourceTab::Web));
        assert_eq!(ResourceTab::from_digit(6), Some(ResourceTab::All));
        assert_eq!(ResourceTab::from_digit(0), Some(ResourceTab::All));
        assert_eq!(ResourceTab::from_digit(7), None);
        for tab in ResourceTab::ALL {
            assert_eq!(ResourceTab::from_digit(tab.shortcut()), Some(tab));
        }
    }

    #[test]
    fn subscription_state_keeps_unknown_labels() {
        assert_eq!(SubscriptionState::parse("Enabled"), SubscriptionState::Enabled);
        assert_eq!(SubscriptionState::parse(" disabled "), SubscriptionState::Disabled);
        assert_eq!(SubscriptionState::parse("PastDue").label(), "PastDue");
        assert_eq!(SubscriptionState::parse("").label(), "Unknown");
    }

    #[test]
    fn cache_overwrites_per_key() {
        let mut cache = EntityCache::default();
        let group = |name: &str| ResourceGroup {
            name: name.to_string(),
            location: "westeurope".to_string(),
            subscription_id: "s1".to_string(),
        };
        cache.set_resource_groups("s1".to_string(), vec![group("a"), group("b")]);
        cache.set_resource_groups("s1".to_string(), vec![group("c")]);
        assert_eq!(cache.resource_groups("s1").len(), 1);
        assert_eq!(cache.resource_groups("s1")[0].name, "c");
        assert!(cache.resource_groups("s2").is_empty());
    }

    #[test]
    fn resources_with_same_group_name_do_not_collide() {
        let mut cache = EntityCache::default();
        let first = ResourceGroupKey::new("s1", "rg");
        let second = ResourceGroupKey::new("s2", "rg");
        cache.set_resources(
            first.clone(),
            vec![Resource {
                name: "vm".to_string(),
                resource_type: "Microsoft.Compute/virtualMachines".to_string(),
                group: first.clone(),
                provisioning_state: None,
            }],
        );
        assert_eq!(cache.resources(&first).len(), 1);
        assert!(cache.resources(&second).is_empty());
        assert_eq!(cache.resources(&first)[0].status(), "Running");
    }
}
