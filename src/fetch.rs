use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Resource, ResourceGroup, ResourceGroupKey, Subscription};

/// Data the state machine asks the provider for.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FetchRequest {
    Subscriptions,
    ResourceGroups { subscription_id: String },
    Resources { key: ResourceGroupKey },
}

impl FetchRequest {
    pub fn resource_groups(subscription_id: impl Into<String>) -> Self {
        Self::ResourceGroups {
            subscription_id: subscription_id.into(),
        }
    }

    pub fn resources(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
    ) -> Self {
        Self::Resources {
            key: ResourceGroupKey::new(subscription_id, resource_group),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Subscriptions => "subscriptions".to_string(),
            Self::ResourceGroups { subscription_id } => {
                format!("resource groups of {subscription_id}")
            }
            Self::Resources { key } => format!("resources of {}", key.resource_group),
        }
    }
}

/// Provider failures collapse into this one kind; the cause chain is kept as text.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{message}")]
pub struct FetchError {
    message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(compact_error(&error))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FetchEvent {
    SubscriptionsFetched(Vec<Subscription>),
    ResourceGroupsFetched {
        subscription_id: String,
        groups: Vec<ResourceGroup>,
    },
    ResourcesFetched {
        key: ResourceGroupKey,
        resources: Vec<Resource>,
    },
    FetchFailed {
        request: FetchRequest,
        error: FetchError,
    },
}

impl FetchEvent {
    /// The request this event answers.
    pub fn request(&self) -> FetchRequest {
        match self {
            Self::SubscriptionsFetched(_) => FetchRequest::Subscriptions,
            Self::ResourceGroupsFetched {
                subscription_id, ..
            } => FetchRequest::resource_groups(subscription_id.clone()),
            Self::ResourcesFetched { key, .. } => FetchRequest::Resources { key: key.clone() },
            Self::FetchFailed { request, .. } => request.clone(),
        }
    }
}

/// Lists the cloud hierarchy. Implementations receive normalized subscription ids.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn list_subscriptions(&self) -> anyhow::Result<Vec<Subscription>>;

    async fn list_resource_groups(
        &self,
        subscription_id: &str,
    ) -> anyhow::Result<Vec<ResourceGroup>>;

    async fn list_resources(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> anyhow::Result<Vec<Resource>>;
}

/// Accepts both bare ids and `/subscriptions/<id>` resource paths.
pub fn normalize_subscription_id(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("/subscriptions/")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

/// Runs one request against the provider. Results are keyed by the ids exactly
/// as requested so they land where the state machine looks them up.
pub async fn execute(provider: &dyn CloudProvider, request: FetchRequest) -> FetchEvent {
    debug!("fetching {} via {}", request.describe(), provider.name());
    let outcome = match &request {
        FetchRequest::Subscriptions => provider
            .list_subscriptions()
            .await
            .map(FetchEvent::SubscriptionsFetched),
        FetchRequest::ResourceGroups { subscription_id } => {
            let normalized = normalize_subscription_id(subscription_id);
            provider
                .list_resource_groups(&normalized)
                .await
                .map(|groups| FetchEvent::ResourceGroupsFetched {
                    subscription_id: subscription_id.clone(),
                    groups: groups
                        .into_iter()
                        .map(|group| ResourceGroup {
                            subscription_id: subscription_id.clone(),
                            ..group
                        })
                        .collect(),
                })
        }
        FetchRequest::Resources { key } => {
            let normalized = normalize_subscription_id(&key.subscription_id);
            provider
                .list_resources(&normalized, &key.resource_group)
                .await
                .map(|resources| FetchEvent::ResourcesFetched {
                    key: key.clone(),
                    resources: resources
                        .into_iter()
                        .map(|resource| Resource {
                            group: key.clone(),
                            ..resource
                        })
                        .collect(),
                })
        }
    };

    outcome.unwrap_or_else(|error| {
        warn!("fetching {} failed: {error:#}", request.describe());
        FetchEvent::FetchFailed {
            request,
            error: FetchError::from(error),
        }
    })
}

pub fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}
