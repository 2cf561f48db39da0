//! Client for the external online payment processor.

use crate::config::AppConfig;
use crate::errors::ServiceError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Status string reported by the processor for a settled capture.
pub const REMOTE_COMPLETED: &str = "COMPLETED";

/// Lifetime assumed when the token response carries no `expires_in`.
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(300);
/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrderRequest {
    pub reference: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub external_id: String,
    pub approval_url: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCapture {
    pub status: String,
    pub capture_id: Option<String>,
}

impl RemoteCapture {
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case(REMOTE_COMPLETED)
    }
}

/// Remote order lifecycle used by online strategies.
///
/// Implementations map timeouts, connection failures and 5xx responses to
/// `ServiceError::TransportFailure`, and business rejections to
/// `ServiceError::ExternalServiceError`. Neither is retried here.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_remote_order(
        &self,
        request: &RemoteOrderRequest,
    ) -> Result<RemoteOrder, ServiceError>;

    async fn capture_remote_order(&self, external_id: &str) -> Result<RemoteCapture, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct CaptureEntry {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct CapturePayments {
    #[serde(default)]
    captures: Vec<CaptureEntry>,
}

#[derive(Debug, Deserialize)]
struct CaptureUnit {
    #[serde(default)]
    payments: Option<CapturePayments>,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    status: String,
    #[serde(default)]
    purchase_units: Vec<CaptureUnit>,
}

/// HTTP processor speaking the PayPal Orders v2 protocol.
#[derive(Clone)]
pub struct HttpPaymentProcessor {
    client: Client,
    base_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl HttpPaymentProcessor {
    /// Builds a processor with the configured timeout applied to every call.
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::with_timeout(
            &config.payment_processor_base_url,
            config.payment_processor_client_id.clone(),
            config.payment_processor_client_secret.clone(),
            config.payment_processor_timeout(),
        )
    }

    pub fn with_timeout(
        base_url: &str,
        client_id: Option<String>,
        client_secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to build payment client: {}", e))
            })?;
        Ok(Self::with_client(base_url, client_id, client_secret, client))
    }

    /// Build a processor from an existing client.
    pub fn with_client(
        base_url: &str,
        client_id: Option<String>,
        client_secret: Option<String>,
        client: Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns a bearer token, reusing the cached one until shortly before
    /// it expires. `None` when no credentials are configured.
    async fn access_token(&self) -> Result<Option<String>, ServiceError> {
        let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) else {
            return Ok(None);
        };

        if let Some(cached) = self.token.read().await.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(Some(cached.value.clone()));
            }
        }

        let mut slot = self.token.write().await;
        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(Some(cached.value.clone()));
            }
        }

        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(id, Some(secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(transport_error)?;
        let token: TokenResponse = decode(check_status(response).await?).await?;
        let ttl = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        debug!(ttl_secs = ttl.as_secs(), "Fetched processor access token");
        *slot = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + ttl.saturating_sub(TOKEN_REFRESH_MARGIN),
        });
        Ok(Some(token.access_token))
    }

    /// Drops the cached token so the next call fetches a fresh one.
    async fn forget_token(&self) {
        *self.token.write().await = None;
    }

    /// Status check for authorized calls; a 401 invalidates the cached token.
    async fn checked(&self, response: Response) -> Result<Response, ServiceError> {
        if response.status() == StatusCode::UNAUTHORIZED {
            self.forget_token().await;
        }
        check_status(response).await
    }

    fn authorized(&self, builder: reqwest::RequestBuilder, token: Option<String>) -> reqwest::RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn create_remote_order(
        &self,
        request: &RemoteOrderRequest,
    ) -> Result<RemoteOrder, ServiceError> {
        let token = self.access_token().await?;
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.reference.to_string(),
                "amount": {
                    "currency_code": request.currency,
                    "value": format!("{:.2}", request.amount),
                },
            }],
            "application_context": {
                "return_url": request.return_url,
                "cancel_url": request.cancel_url,
            },
        });

        let response = self
            .authorized(
                self.client
                    .post(format!("{}/v2/checkout/orders", self.base_url))
                    .json(&body),
                token,
            )
            .send()
            .await
            .map_err(transport_error)?;
        let order: OrderResponse = decode(self.checked(response).await?).await?;

        let approval_url = order
            .links
            .into_iter()
            .find(|l| l.rel == "approve" || l.rel == "payer-action")
            .map(|l| l.href);

        info!(external_id = %order.id, status = %order.status, "Created remote order");
        Ok(RemoteOrder {
            external_id: order.id,
            approval_url,
            status: order.status,
        })
    }

    #[instrument(skip(self))]
    async fn capture_remote_order(&self, external_id: &str) -> Result<RemoteCapture, ServiceError> {
        let token = self.access_token().await?;
        let response = self
            .authorized(
                self.client
                    .post(format!(
                        "{}/v2/checkout/orders/{}/capture",
                        self.base_url, external_id
                    ))
                    .json(&json!({})),
                token,
            )
            .send()
            .await
            .map_err(transport_error)?;
        let capture: CaptureResponse = decode(self.checked(response).await?).await?;

        let capture_id = capture
            .purchase_units
            .into_iter()
            .filter_map(|unit| unit.payments)
            .flat_map(|payments| payments.captures)
            .map(|c| c.id)
            .next();

        info!(status = %capture.status, "Captured remote order");
        Ok(RemoteCapture {
            status: capture.status,
            capture_id,
        })
    }
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    error!("Payment processor transport failure: {}", err);
    if err.is_timeout() {
        ServiceError::TransportFailure(format!("processor timed out: {}", err))
    } else {
        ServiceError::TransportFailure(err.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        error!(%status, "Payment processor unavailable");
        Err(ServiceError::TransportFailure(format!(
            "processor returned {}",
            status
        )))
    } else {
        Err(ServiceError::ExternalServiceError(format!(
            "processor rejected request with {}: {}",
            status, body
        )))
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    response.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            ServiceError::TransportFailure(format!("processor timed out: {}", e))
        } else {
            ServiceError::ExternalServiceError(format!("unexpected processor response: {}", e))
        }
    })
}
