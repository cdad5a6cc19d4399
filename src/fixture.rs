use crate::fetch::CloudProvider;
use crate::model::{Resource, ResourceGroup, ResourceGroupKey, Subscription, SubscriptionState};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Serves a fixed hierarchy loaded from YAML; used for demos and offline runs.
#[derive(Debug, Clone, Default)]
pub struct FixtureProvider {
    subscriptions: Vec<FixtureSubscription>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct FixtureFile {
    #[serde(default)]
    subscriptions: Vec<FixtureSubscription>,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureSubscription {
    id: String,
    #[serde(default, alias = "display_name")]
    name: String,
    #[serde(default = "default_state")]
    state: String,
    #[serde(default)]
    resource_groups: Vec<FixtureGroup>,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureGroup {
    name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    resources: Vec<FixtureResource>,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureResource {
    name: String,
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    provisioning_state: Option<String>,
}

fn default_state() -> String {
    "Enabled".to_string()
}

impl FixtureProvider {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("failed to parse fixture {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let parsed: FixtureFile = serde_yaml::from_str(raw)?;
        Ok(Self {
            subscriptions: parsed.subscriptions,
        })
    }

    fn subscription(&self, subscription_id: &str) -> Result<&FixtureSubscription> {
        self.subscriptions
            .iter()
            .find(|subscription| subscription.id == subscription_id)
            .ok_or_else(|| anyhow!("subscription {subscription_id} not found"))
    }
}

#[async_trait]
impl CloudProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .iter()
            .map(|subscription| Subscription {
                id: subscription.id.clone(),
                display_name: if subscription.name.is_empty() {
                    subscription.id.clone()
                } else {
                    subscription.name.clone()
                },
                state: SubscriptionState::parse(&subscription.state),
            })
            .collect())
    }

    async fn list_resource_groups(&self, subscription_id: &str) -> Result<Vec<ResourceGroup>> {
        Ok(self
            .subscription(subscription_id)?
            .resource_groups
            .iter()
            .map(|group| ResourceGroup {
                name: group.name.clone(),
                location: group.location.clone(),
                subscription_id: subscription_id.to_string(),
            })
            .collect())
    }

    async fn list_resources(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<Vec<Resource>> {
        let group = self
            .subscription(subscription_id)?
            .resource_groups
            .iter()
            .find(|group| group.name.eq_ignore_ascii_case(resource_group))
            .ok_or_else(|| {
                anyhow!("resource group {resource_group} not found in {subscription_id}")
            })?;
        let key = ResourceGroupKey::new(subscription_id, resource_group);

        Ok(group
            .resources
            .iter()
            .map(|resource| Resource {
                name: resource.name.clone(),
                resource_type: resource.resource_type.clone(),
                group: key.clone(),
                provisioning_state: resource.provisioning_state.clone(),
            })
            .collect())
    }
}
