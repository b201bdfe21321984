//! The seam between the waiters and a vendor SDK.
//!
//! Providers implement [`ApiClient`] over their SDK and pass it, together with
//! a [`ClientContext`], into each operation. [`DescribeBinding`] and
//! [`ListBinding`] describe how one API action maps onto a poll or a listing,
//! so a resource declares its actions instead of hand-rolling loops.
//!
//! # Example
//!
//! ```ignore
//! use provider_waiters::client::{ClientContext, DescribeBinding};
//! use provider_waiters::poller::PollSpec;
//!
//! let ctx = ClientContext::new("cn-hangzhou");
//! let vpc = DescribeBinding::new("DescribeVpcs", "VpcId")
//!     .with_object_path("$.Vpcs.Vpc")
//!     .with_id_field("VpcId")
//!     .with_not_found_codes(["InvalidVpcId.NotFound"]);
//!
//! vpc.wait_for(&client, &ctx, "vpc-123", &PollSpec::new(["Available".to_string()]))
//!     .await?;
//! ```

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ApiError, Error, ErrorClassifier};
use crate::filter::ItemFilter;
use crate::pager::{list_all, Page, PageRequest, Pagination};
use crate::path;
use crate::poller::{wait_for_action, Observed, PollResult, PollSpec};
use crate::retry::{retry, RetryPolicy};
use crate::status::Status;

/// Request key for the region.
pub const REGION_PARAM: &str = "RegionId";

/// A vendor SDK able to send one API action.
///
/// Implementations own authentication, signing, and transport. Tests use
/// [`crate::testing::FakeClient`].
#[async_trait::async_trait]
pub trait ApiClient: Send + Sync {
    /// Send `action` with `params` and return the decoded JSON response.
    async fn do_request(&self, action: &str, params: &Map<String, Value>)
        -> Result<Value, ApiError>;
}

/// Per-operation settings passed alongside the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientContext {
    /// Region sent as `RegionId` with every request. Empty means omitted.
    pub region_id: String,
    /// Retry policy for each SDK call.
    pub retry: RetryPolicy,
}

impl ClientContext {
    /// Create a context for `region_id` with the default retry policy.
    pub fn new(region_id: impl Into<String>) -> Self {
        Self {
            region_id: region_id.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, mut params: Map<String, Value>) -> Map<String, Value> {
        if !self.region_id.is_empty() {
            params
                .entry(REGION_PARAM)
                .or_insert_with(|| Value::from(self.region_id.clone()));
        }
        params
    }
}

async fn call<C: ApiClient + ?Sized>(
    client: &C,
    ctx: &ClientContext,
    classifier: &ErrorClassifier,
    id: &str,
    action: &str,
    params: Map<String, Value>,
) -> Result<Value, Error> {
    let params = ctx.request(params);
    let response = retry(&ctx.retry, classifier, action, || {
        client.do_request(action, &params)
    })
    .await;
    debug!(action, id, ?params, ok = response.is_ok(), "api call");
    response.map_err(|err| Error::from_api(classifier, id, action, err))
}

/// How to describe one resource and read its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeBinding {
    /// The describe action, e.g. `DescribeVpcs`.
    pub action: String,
    /// Request key the resource id is sent under.
    pub id_param: String,
    /// Where the object sits in the response. A list resolves to its first
    /// element, and an empty list means the resource is gone.
    pub object_path: String,
    /// Where the status sits in the object.
    pub status_path: String,
    /// When set, the object's value at this path must equal the id.
    pub id_field: Option<String>,
    /// Classifies SDK errors, including the resource's not-found codes.
    pub classifier: ErrorClassifier,
}

impl DescribeBinding {
    /// Describe with `action`, sending the id as `id_param`.
    pub fn new(action: impl Into<String>, id_param: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            id_param: id_param.into(),
            object_path: "$".to_string(),
            status_path: "Status".to_string(),
            id_field: None,
            classifier: ErrorClassifier::new(),
        }
    }

    /// Set where the object sits in the response.
    pub fn with_object_path(mut self, path: impl Into<String>) -> Self {
        self.object_path = path.into();
        self
    }

    /// Set where the status sits in the object.
    pub fn with_status_path(mut self, path: impl Into<String>) -> Self {
        self.status_path = path.into();
        self
    }

    /// Require the object's `field` to equal the requested id.
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    /// Add vendor codes that mean the resource is gone.
    pub fn with_not_found_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classifier = self.classifier.with_not_found_codes(codes);
        self
    }

    /// Fetch the object for `id`.
    pub async fn describe<C: ApiClient + ?Sized>(
        &self,
        client: &C,
        ctx: &ClientContext,
        id: &str,
    ) -> Result<Value, Error> {
        let mut params = Map::new();
        params.insert(self.id_param.clone(), Value::from(id));
        let response = call(client, ctx, &self.classifier, id, &self.action, params).await?;

        let object = match path::get(&response, &self.object_path) {
            None | Some(Value::Null) => {
                return Err(Error::MissingField {
                    id: id.to_string(),
                    path: self.object_path.clone(),
                })
            }
            Some(Value::Array(items)) => match items.first() {
                Some(first) => first.clone(),
                None => return Err(self.not_found(id)),
            },
            Some(object) => object.clone(),
        };

        if let Some(field) = &self.id_field {
            if path::get_string(&object, field).as_deref() != Some(id) {
                return Err(self.not_found(id));
            }
        }
        Ok(object)
    }

    /// Fetch the object for `id` and read its status.
    pub async fn observe<S: Status, C: ApiClient + ?Sized>(
        &self,
        client: &C,
        ctx: &ClientContext,
        id: &str,
    ) -> Result<Observed<Value, S>, Error> {
        let object = self.describe(client, ctx, id).await?;
        let status = path::get_string(&object, &self.status_path).ok_or_else(|| {
            Error::MissingField {
                id: id.to_string(),
                path: self.status_path.clone(),
            }
        })?;
        Ok(Observed::new(object, S::from_wire(&status)))
    }

    /// Poll `id` until `spec` is satisfied.
    pub async fn wait_for<S: Status, C: ApiClient + ?Sized>(
        &self,
        client: &C,
        ctx: &ClientContext,
        id: &str,
        spec: &PollSpec<S>,
    ) -> Result<PollResult<Value, S>, Error> {
        wait_for_action(&self.action, id, spec, || self.observe(client, ctx, id)).await
    }

    fn not_found(&self, id: &str) -> Error {
        Error::NotFound {
            id: id.to_string(),
            code: format!("{}.NotFound", self.action),
        }
    }
}

/// How to page through one list action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBinding {
    /// The list action, e.g. `DescribeVSwitches`.
    pub action: String,
    /// Name used for the listing in error messages.
    pub resource: String,
    /// Where the items sit in the response.
    pub items_path: String,
    /// Where the next token sits in the response.
    pub next_token_path: String,
    /// Classifies SDK errors.
    pub classifier: ErrorClassifier,
}

impl ListBinding {
    /// List with `action`, reading items from `items_path`.
    pub fn new(action: impl Into<String>, items_path: impl Into<String>) -> Self {
        let action = action.into();
        Self {
            resource: action.clone(),
            action,
            items_path: items_path.into(),
            next_token_path: "$.NextToken".to_string(),
            classifier: ErrorClassifier::new(),
        }
    }

    /// Set the name used in error messages.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Set where the next token sits in the response.
    pub fn with_next_token_path(mut self, path: impl Into<String>) -> Self {
        self.next_token_path = path.into();
        self
    }

    /// Fetch the page described by `request`.
    pub async fn fetch_page<C: ApiClient + ?Sized>(
        &self,
        client: &C,
        ctx: &ClientContext,
        request: PageRequest,
    ) -> Result<Page<Value>, Error> {
        let response = call(
            client,
            ctx,
            &self.classifier,
            &self.resource,
            &self.action,
            request.params(),
        )
        .await?;

        let items = match path::get(&response, &self.items_path) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) => Vec::new(),
            _ => {
                return Err(Error::MissingField {
                    id: self.resource.clone(),
                    path: self.items_path.clone(),
                })
            }
        };

        let page = Page::new(items);
        Ok(match path::get_string(&response, &self.next_token_path) {
            Some(token) if !token.is_empty() => page.with_next_token(token),
            _ => page,
        })
    }

    /// Fetch every page and keep the items accepted by `filter`.
    pub async fn list<C: ApiClient + ?Sized>(
        &self,
        client: &C,
        ctx: &ClientContext,
        request: &mut PageRequest,
        filter: &ItemFilter,
    ) -> Result<Vec<Value>, Error> {
        list_all(
            request,
            |req| self.fetch_page(client, ctx, req),
            |item| filter.matches(item),
        )
        .await
    }

    /// Start a listing with `pagination` and fetch every page.
    pub async fn list_with<C: ApiClient + ?Sized>(
        &self,
        client: &C,
        ctx: &ClientContext,
        pagination: Pagination,
        filter: &ItemFilter,
    ) -> Result<Vec<Value>, Error> {
        let mut request = PageRequest::new(pagination);
        self.list(client, ctx, &mut request, filter).await
    }
}
