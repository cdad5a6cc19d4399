use crate::config::AzrConfig;
use crate::fetch::CloudProvider;
use crate::model::{Resource, ResourceGroup, ResourceGroupKey, Subscription, SubscriptionState};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::debug;

/// Lists the hierarchy by shelling out to the Azure CLI. Authentication is
/// whatever `az login` left behind.
#[derive(Debug, Clone)]
pub struct AzCliGateway {
    program: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountJson {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct GroupJson {
    #[serde(default)]
    name: String,
    #[serde(default)]
    location: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceJson {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    resource_type: String,
    #[serde(default)]
    provisioning_state: Option<String>,
    #[serde(default)]
    properties: Option<ResourcePropertiesJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourcePropertiesJson {
    #[serde(default)]
    provisioning_state: Option<String>,
}

impl AzCliGateway {
    pub fn new(config: &AzrConfig) -> Self {
        Self {
            program: config.az_command.clone(),
            extra_args: config.az_args.clone(),
            timeout: config.fetch_timeout(),
        }
    }

    async fn run_json(&self, args: &[&str]) -> Result<String> {
        let rendered = format!("{} {}", self.program, args.join(" "));
        debug!("running {rendered}");

        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(args)
            .args(&self.extra_args)
            .args(["--output", "json"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| anyhow!("{rendered} timed out after {}s", self.timeout.as_secs()))?
            .with_context(|| format!("failed to execute {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("no error output");
            return Err(anyhow!("{detail}"))
                .with_context(|| format!("{rendered} exited with {}", output.status));
        }

        String::from_utf8(output.stdout).with_context(|| format!("{rendered} printed invalid UTF-8"))
    }
}

#[async_trait]
impl CloudProvider for AzCliGateway {
    fn name(&self) -> &str {
        "az cli"
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        let raw = self.run_json(&["account", "list"]).await?;
        parse_subscriptions(&raw)
    }

    async fn list_resource_groups(&self, subscription_id: &str) -> Result<Vec<ResourceGroup>> {
        let raw = self
            .run_json(&["group", "list", "--subscription", subscription_id])
            .await?;
        parse_resource_groups(&raw, subscription_id)
    }

    async fn list_resources(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<Vec<Resource>> {
        let raw = self
            .run_json(&[
                "resource",
                "list",
                "--subscription",
                subscription_id,
                "--resource-group",
                resource_group,
            ])
            .await?;
        parse_resources(&raw, &ResourceGroupKey::new(subscription_id, resource_group))
    }
}

fn parse_subscriptions(raw: &str) -> Result<Vec<Subscription>> {
    let accounts: Vec<AccountJson> =
        serde_json::from_str(raw).context("failed to parse az account list output")?;
    Ok(accounts
        .into_iter()
        .map(|account| Subscription {
            display_name: if account.name.trim().is_empty() {
                account.id.clone()
            } else {
                account.name
            },
            id: account.id,
            state: SubscriptionState::parse(&account.state),
        })
        .collect())
}

fn parse_resource_groups(raw: &str, subscription_id: &str) -> Result<Vec<ResourceGroup>> {
    let groups: Vec<GroupJson> =
        serde_json::from_str(raw).context("failed to parse az group list output")?;
    Ok(groups
        .into_iter()
        .map(|group| ResourceGroup {
            name: group.name,
            location: group.location,
            subscription_id: subscription_id.to_string(),
        })
        .collect())
}

fn parse_resources(raw: &str, key: &ResourceGroupKey) -> Result<Vec<Resource>> {
    let resources: Vec<ResourceJson> =
        serde_json::from_str(raw).context("failed to parse az resource list output")?;
    Ok(resources
        .into_iter()
        .map(|resource| Resource {
            name: resource.name,
            resource_type: resource.resource_type,
            group: key.clone(),
            provisioning_state: resource
                .provisioning_state
                .or_else(|| resource.properties.and_then(|props| props.provisioning_state)),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{AzCliGateway, parse_resource_groups, parse_resources, parse_subscriptions};
    use crate::config::AzrConfig;
    use crate::fetch::CloudProvider;
    use crate::model::{ResourceGroupKey, SubscriptionState};

    #[test]
    fn parses_account_list() {
        let raw = r#"[
            {"id": "0000-1111", "name": "Production", "state": "Enabled", "isDefault": true},
            {"id": "2222-3333", "name": "", "state": "Warned"}
        ]"#;
        let subscriptions = parse_subscriptions(raw).unwrap();
        assert_eq!(subscriptions.len(), 2);
        assert_eq!(subscriptions[0].display_name, "Production");
        assert_eq!(subscriptions[0].state, SubscriptionState::Enabled);
        assert_eq!(subscriptions[1].display_name, "2222-3333");
        assert_eq!(subscriptions[1].state.label(), "Warned");
    }

    #[test]
    fn parses_group_list() {
        let raw = r#"[{"name": "rg-app", "location": "westeurope",
            "properties": {"provisioningState": "Succeeded"}}]"#;
        let groups = parse_resource_groups(raw, "s1").unwrap();
        assert_eq!(groups[0].name, "rg-app");
        assert_eq!(groups[0].location, "westeurope");
        assert_eq!(groups[0].subscription_id, "s1");
    }

    #[test]
    fn parses_resource_list_with_either_state_field() {
        let raw = r#"[
            {"name": "vm1", "type": "Microsoft.Compute/virtualMachines",
             "location": "westeurope", "provisioningState": "Succeeded"},
            {"name": "site", "type": "Microsoft.Web/sites",
             "properties": {"provisioningState": "Updating"}},
            {"name": "bare", "type": "Microsoft.Foo/bars", "location": ""}
        ]"#;
        let key = ResourceGroupKey::new("s1", "rg");
        let resources = parse_resources(raw, &key).unwrap();

        assert_eq!(resources.len(), 3);
        assert_eq!(resources[0].status(), "Succeeded");
        assert_eq!(resources[1].status(), "Updating");
        assert_eq!(resources[2].status(), "Running");
        assert!(resources.iter().all(|resource| resource.group == key));
    }

    #[test]
    fn rejects_non_json_output() {
        assert!(parse_subscriptions("Please run 'az login'").is_err());
    }

    #[tokio::test]
    async fn missing_binary_is_reported_as_error() {
        let config = AzrConfig {
            az_command: "azr-test-no-such-binary".to_string(),
            ..AzrConfig::default()
        };
        let gateway = AzCliGateway::new(&config);
        let error = gateway.list_subscriptions().await.unwrap_err();
        assert!(format!("{error:#}").contains("azr-test-no-such-binary"));
    }
}
