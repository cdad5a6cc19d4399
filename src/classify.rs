//! Buckets provider type strings into [`ResourceTab`]s and matches names
//! against the search query.
//!
//! Provider type strings change casing between API versions
//! (`Microsoft.Compute/virtualMachines` vs `microsoft.compute/VirtualMachines`),
//! so every comparison is made on the lower-cased string.

use crate::model::{Resource, ResourceTab};

/// Substrings that place a lower-cased type string under a specific tab.
/// `All` has no rules; it matches everything.
pub const TAB_RULES: &[(ResourceTab, &[&str])] = &[
    (
        ResourceTab::Clusters,
        &[
            "containerservice/managedclusters",
            "container/containergroups",
            "containerinstance/containergroups",
        ],
    ),
    (
        ResourceTab::Compute,
        &[
            "compute/virtualmachines",
            "compute/vmscalesets",
            "compute/virtualmachinescalesets",
            "compute/disks",
        ],
    ),
    (
        ResourceTab::Network,
        &[
            "network/virtualnetworks",
            "network/networksecuritygroups",
            "network/publicipaddresses",
            "network/loadbalancers",
            "network/applicationgateways",
            "network/networkinterfaces",
        ],
    ),
    (
        ResourceTab::Storage,
        &[
            "storage/storageaccounts",
            "storage/fileservices",
            "storage/blobservices",
        ],
    ),
    (
        ResourceTab::Web,
        &["web/sites", "web/serverfarms", "web/staticsites"],
    ),
];

fn rules_for(tab: ResourceTab) -> &'static [&'static str] {
    TAB_RULES
        .iter()
        .find(|(candidate, _)| *candidate == tab)
        .map(|(_, rules)| *rules)
        .unwrap_or(&[])
}

pub fn matches_tab(resource_type: &str, tab: ResourceTab) -> bool {
    if tab == ResourceTab::All {
        return true;
    }
    let lowered = resource_type.to_ascii_lowercase();
    rules_for(tab).iter().any(|rule| lowered.contains(rule))
}

/// The first specific tab that claims `resource_type`, or `All` when none does.
pub fn classify(resource_type: &str) -> ResourceTab {
    TAB_RULES
        .iter()
        .map(|(tab, _)| *tab)
        .find(|tab| matches_tab(resource_type, *tab))
        .unwrap_or(ResourceTab::All)
}

pub fn matches_search(name: &str, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    name.to_lowercase().contains(&query.to_lowercase())
}

/// `Microsoft.Network/virtualNetworks` -> `VirtualNetworks`.
pub fn format_type(resource_type: &str) -> String {
    let Some((_, last)) = resource_type.rsplit_once('/') else {
        return resource_type.to_string();
    };

    let mut chars = last.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Tab to open a freshly fetched resource group on: the first specific tab in
/// declaration order with at least one member.
pub fn preselect_tab(resources: &[Resource]) -> ResourceTab {
    resources
        .iter()
        .map(|resource| classify(&resource.resource_type))
        .filter(|tab| *tab != ResourceTab::All)
        .min_by_key(|tab| tab.index())
        .unwrap_or(ResourceTab::All)
}

#[cfg(test)]
mod tests {
    use super::{classify, format_type, matches_search, matches_tab, preselect_tab};
    use crate::model::{Resource, ResourceGroupKey, ResourceTab};

    fn resource(name: &str, resource_type: &str) -> Resource {
        Resource {
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            group: ResourceGroupKey::new("s1", "rg"),
            provisioning_state: None,
        }
    }

    #[test]
    fn format_type_uses_last_segment() {
        assert_eq!(
            format_type("Microsoft.ContainerService/managedClusters"),
            "ManagedClusters"
        );
        assert_eq!(
            format_type("Microsoft.Network/virtualNetworks"),
            "VirtualNetworks"
        );
        assert_eq!(format_type("simpleResource"), "simpleResource");
        assert_eq!(format_type(""), "");
        assert_eq!(format_type("Microsoft.Web/"), "");
    }

    #[test]
    fn compute_types_are_not_network() {
        let vm = "Microsoft.Compute/virtualMachines";
        assert!(matches_tab(vm, ResourceTab::Compute));
        assert!(!matches_tab(vm, ResourceTab::Network));
        assert_eq!(classify(vm), ResourceTab::Compute);
        assert_eq!(classify("MICROSOFT.COMPUTE/VIRTUALMACHINES"), ResourceTab::Compute);
    }

    #[test]
    fn every_type_matches_all() {
        for resource_type in [
            "Microsoft.AnyService/anyResource",
            "Microsoft.Storage/storageAccounts",
            "",
        ] {
            assert!(matches_tab(resource_type, ResourceTab::All));
        }
    }

    #[test]
    fn unknown_types_belong_to_no_specific_tab() {
        let unknown = "Microsoft.AnyService/anyResource";
        for tab in ResourceTab::ALL {
            if tab != ResourceTab::All {
                assert!(!matches_tab(unknown, tab), "{} matched", tab.title());
            }
        }
        assert_eq!(classify(unknown), ResourceTab::All);
    }

    #[test]
    fn classify_covers_each_tab() {
        assert_eq!(
            classify("Microsoft.ContainerService/managedClusters"),
            ResourceTab::Clusters
        );
        assert_eq!(
            classify("Microsoft.ContainerInstance/containerGroups"),
            ResourceTab::Clusters
        );
        assert_eq!(
            classify("Microsoft.Network/publicIPAddresses"),
            ResourceTab::Network
        );
        assert_eq!(
            classify("Microsoft.Storage/storageAccounts"),
            ResourceTab::Storage
        );
        assert_eq!(classify("Microsoft.Web/serverFarms"), ResourceTab::Web);
    }

    #[test]
    fn search_is_case_insensitive_containment() {
        let names = ["east-vnet", "westdb"];
        let hits = names
            .iter()
            .filter(|name| matches_search(name, "EAST"))
            .collect::<Vec<_>>();
        assert_eq!(hits, vec![&"east-vnet"]);
        assert_eq!(
            names.iter().filter(|name| matches_search(name, "")).count(),
            2
        );
    }

    #[test]
    fn preselect_picks_first_declared_tab_with_members() {
        let resources = vec![
            resource("site", "Microsoft.Web/sites"),
            resource("disk", "Microsoft.Compute/disks"),
        ];
        assert_eq!(preselect_tab(&resources), ResourceTab::Compute);
        assert_eq!(
            preselect_tab(&[resource("x", "Microsoft.Foo/bars")]),
            ResourceTab::All
        );
        assert_eq!(preselect_tab(&[]), ResourceTab::All);
    }
}
