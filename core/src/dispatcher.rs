//! Cache-or-network call dispatch.
//!
//! # Design
//! `Dispatcher` ties the pure `ApiClient` to its collaborators: a `Transport`
//! for the round-trip, a `ResponseCache`, and an `ActivityIndicator`. All
//! collaborators sit behind `Arc<dyn _>` so a dispatcher is cheap to clone
//! into background tasks.
//!
//! Every call produces exactly one `CallOutcome`, and the activity hook is
//! reset on every path that produces it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::activity::{ActivityIndicator, NoopIndicator};
use crate::cache::{CacheKey, CachedResponse, MemoryCache, ResponseCache};
use crate::call::Call;
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::{TransportError, TransportErrorKind};
use crate::outcome::CallOutcome;
use crate::transport::{ReqwestTransport, Transport};

#[derive(Clone)]
pub struct Dispatcher {
    client: ApiClient,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
    indicator: Arc<dyn ActivityIndicator>,
}

impl Dispatcher {
    /// Dispatcher with the reqwest transport, a default `MemoryCache` and no
    /// activity hook.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        Ok(Self::builder(config)
            .transport(ReqwestTransport::new()?)
            .build())
    }

    pub fn builder(config: ClientConfig) -> DispatcherBuilder {
        DispatcherBuilder {
            config,
            transport: None,
            cache: None,
            indicator: None,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Run `call` to completion in the current task.
    ///
    /// The indicator is reset even if the call panics or its future is
    /// dropped before completing.
    pub async fn call(&self, call: Call) -> CallOutcome {
        self.indicator.set_active(true);
        let _active = ActiveGuard(self.indicator.as_ref());
        self.execute(call).await
    }

    /// Run `call` on a background task. The handle resolves to the outcome.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, call: Call) -> CallHandle {
        let dispatcher = self.clone();
        CallHandle {
            inner: tokio::spawn(async move { dispatcher.call(call).await }),
        }
    }

    /// Run `call` on a background task and hand the outcome to `callback`
    /// once. The callback runs on the runtime's worker; hosts with a UI
    /// thread forward from there.
    pub fn spawn_with_callback<F>(&self, call: Call, callback: F)
    where
        F: FnOnce(CallOutcome) + Send + 'static,
    {
        let handle = self.spawn(call);
        tokio::spawn(async move { callback(handle.await) });
    }

    async fn execute(&self, call: Call) -> CallOutcome {
        let request = match self.client.build_request(&call) {
            Ok(request) => request,
            Err(err) => {
                warn!(endpoint = %call.endpoint, error = %err, "could not build request");
                return CallOutcome::failed(err);
            }
        };
        let key = CacheKey::from_request(&request);

        if call.cache_enabled {
            if let Some(cached) = self.cache.lookup(&key) {
                debug!(url = %key.url(), "serving from cache");
                return self.client.parse_cached(cached);
            }
        }

        debug!(method = %request.method, url = %request.url, "sending request");
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(url = %key.url(), error = %err, "request failed");
                return CallOutcome::failed(err.into());
            }
        };

        if response.is_success() || self.client.config().store_error_responses {
            self.cache.store(key, CachedResponse::from(&response));
        }
        self.client.parse_response(response)
    }
}

/// Turns the activity indicator off when dropped.
struct ActiveGuard<'a>(&'a dyn ActivityIndicator);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.set_active(false);
    }
}

pub struct DispatcherBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    cache: Option<Arc<dyn ResponseCache>>,
    indicator: Option<Arc<dyn ActivityIndicator>>,
}

impl DispatcherBuilder {
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn indicator(mut self, indicator: Arc<dyn ActivityIndicator>) -> Self {
        self.indicator = Some(indicator);
        self
    }

    /// Missing collaborators default to `ReqwestTransport::default()`, a
    /// fresh `MemoryCache` and `NoopIndicator`.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            client: ApiClient::new(self.config),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(ReqwestTransport::default())),
            cache: self.cache.unwrap_or_else(|| Arc::new(MemoryCache::new())),
            indicator: self.indicator.unwrap_or_else(|| Arc::new(NoopIndicator)),
        }
    }
}

/// Handle to a call running on a background task.
pub struct CallHandle {
    inner: JoinHandle<CallOutcome>,
}

impl Future for CallHandle {
    type Output = CallOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx).map(|joined| {
            joined.unwrap_or_else(|e| {
                CallOutcome::failed(
                    TransportError::new(
                        TransportErrorKind::Other,
                        format!("call task failed: {e}"),
                    )
                    .into(),
                )
            })
        })
    }
}
