//! Remote-invocation boundary.
//!
//! A caller in another context builds a [`Call`], the owning context routes
//! it through a [`ServiceBroker`] to the named [`Service`], and the outcome
//! travels back as a [`Reply`]. Both envelopes are plain serde types, so
//! any transport that moves JSON can carry them.
//!
//! The typed clients ([`HistoryClient`], [`SettingsClient`]) build calls
//! and decode replies, one method per declared service method.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, ServiceError};
use crate::history::{Clock, HistoryStore, Stats, SystemClock};
use crate::settings::{Settings, SettingsStore};

pub const HISTORY_SERVICE: &str = "HistoryService";
pub const SETTINGS_SERVICE: &str = "SettingsService";

/// Request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub service: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Call {
    pub fn new(service: &str, method: &str, args: Vec<Value>) -> Self {
        Self {
            service: service.to_string(),
            method: method.to_string(),
            args,
        }
    }
}

/// Response envelope: `{"result": ...}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reply {
    Result(Value),
    Error(String),
}

impl Reply {
    pub fn into_result(self) -> Result<Value> {
        match self {
            Reply::Result(value) => Ok(value),
            Reply::Error(message) => Err(ServiceError::Remote(message).into()),
        }
    }
}

/// A named handler reachable through the broker.
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run `method` with positional `args`.
    ///
    /// # Errors
    /// `UnknownMethod` if `method` is not declared, `InvalidArguments` if
    /// the arguments do not decode, otherwise whatever the method fails
    /// with.
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value>;
}

/// Routes calls to registered services by name.
#[derive(Default)]
pub struct ServiceBroker {
    services: HashMap<&'static str, Arc<dyn Service>>,
}

impl ServiceBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under its name, replacing any previous holder.
    pub fn register(&mut self, service: Arc<dyn Service>) {
        debug!(service = service.name(), "service registered");
        self.services.insert(service.name(), service);
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Service>> {
        self.services.remove(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub async fn invoke(&self, call: Call) -> Result<Value> {
        let service = self
            .services
            .get(call.service.as_str())
            .ok_or_else(|| ServiceError::UnknownService(call.service.clone()))?;
        service.invoke(&call.method, call.args).await
    }

    /// Like [`ServiceBroker::invoke`], with the error flattened into the
    /// reply for transport.
    pub async fn handle(&self, call: Call) -> Reply {
        let service = call.service.clone();
        let method = call.method.clone();
        match self.invoke(call).await {
            Ok(value) => Reply::Result(value),
            Err(e) => {
                warn!(%service, %method, error = %e, "service call failed");
                Reply::Error(e.to_string())
            }
        }
    }
}

fn arg<T: DeserializeOwned>(method: &str, args: &[Value], index: usize) -> Result<T> {
    let value = args.get(index).ok_or_else(|| ServiceError::InvalidArguments {
        method: method.to_string(),
        message: format!("missing argument {index}"),
    })?;
    decode(method, value.clone())
}

fn optional_arg<T: DeserializeOwned>(method: &str, args: &[Value], index: usize) -> Result<Option<T>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decode(method, value.clone()).map(Some),
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        ServiceError::InvalidArguments {
            method: method.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn unknown_method(service: &str, method: &str) -> ServiceError {
    ServiceError::UnknownMethod {
        service: service.to_string(),
        method: method.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryMethod {
    AddPomodoro,
    Merge,
    GetStats,
    GetAll,
    GetCsv,
    ClearHistory,
    CountToday,
}

impl HistoryMethod {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "addPomodoro" => Self::AddPomodoro,
            "merge" => Self::Merge,
            "getStats" => Self::GetStats,
            "getAll" => Self::GetAll,
            "getCSV" => Self::GetCsv,
            "clearHistory" => Self::ClearHistory,
            "countToday" => Self::CountToday,
            _ => return None,
        })
    }
}

/// Exposes a [`HistoryStore`] to remote callers.
pub struct HistoryService<C: Clock = SystemClock> {
    store: Arc<HistoryStore<C>>,
}

impl<C: Clock> HistoryService<C> {
    pub fn new(store: Arc<HistoryStore<C>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<C: Clock + 'static> Service for HistoryService<C> {
    fn name(&self) -> &'static str {
        HISTORY_SERVICE
    }

    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let parsed =
            HistoryMethod::parse(method).ok_or_else(|| unknown_method(HISTORY_SERVICE, method))?;

        match parsed {
            HistoryMethod::AddPomodoro => {
                let duration: i64 = arg(method, &args, 0)?;
                let when: Option<DateTime<FixedOffset>> = optional_arg(method, &args, 1)?;
                let count = self.store.add_pomodoro(duration, when).await?;
                Ok(Value::from(count))
            }
            HistoryMethod::Merge => {
                let payload: Value = arg(method, &args, 0)?;
                Ok(Value::from(self.store.merge(&payload).await?))
            }
            HistoryMethod::GetStats => {
                let since: DateTime<Utc> = arg(method, &args, 0)?;
                Ok(serde_json::to_value(self.store.stats(since).await?)?)
            }
            HistoryMethod::GetAll => self.store.all().await,
            HistoryMethod::GetCsv => Ok(Value::String(self.store.to_csv().await?)),
            HistoryMethod::ClearHistory => {
                self.store.clear().await?;
                Ok(Value::Null)
            }
            HistoryMethod::CountToday => Ok(Value::from(self.store.count_today(None).await?)),
        }
    }
}

/// Exposes a [`SettingsStore`] to remote callers.
pub struct SettingsService {
    store: Arc<SettingsStore>,
}

impl SettingsService {
    pub fn new(store: Arc<SettingsStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Service for SettingsService {
    fn name(&self) -> &'static str {
        SETTINGS_SERVICE
    }

    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        match method {
            "getSettings" => Ok(serde_json::to_value(self.store.get().await?)?),
            "setSettings" => {
                let settings: Settings = arg(method, &args, 0)?;
                self.store.set(&settings).await?;
                Ok(Value::Null)
            }
            _ => Err(unknown_method(SETTINGS_SERVICE, method).into()),
        }
    }
}

async fn call<T: DeserializeOwned>(
    broker: &ServiceBroker,
    service: &str,
    method: &str,
    args: Vec<Value>,
) -> Result<T> {
    let value = broker
        .handle(Call::new(service, method, args))
        .await
        .into_result()?;
    Ok(serde_json::from_value(value)?)
}

/// Typed stub for [`HistoryService`].
#[derive(Clone)]
pub struct HistoryClient {
    broker: Arc<ServiceBroker>,
}

impl HistoryClient {
    pub fn new(broker: Arc<ServiceBroker>) -> Self {
        Self { broker }
    }

    pub async fn add_pomodoro(
        &self,
        duration: i64,
        when: Option<DateTime<FixedOffset>>,
    ) -> Result<usize> {
        let args = vec![Value::from(duration), serde_json::to_value(when)?];
        call(&self.broker, HISTORY_SERVICE, "addPomodoro", args).await
    }

    pub async fn merge(&self, payload: &Value) -> Result<usize> {
        call(&self.broker, HISTORY_SERVICE, "merge", vec![payload.clone()]).await
    }

    pub async fn get_stats(&self, since: DateTime<Utc>) -> Result<Stats> {
        let args = vec![serde_json::to_value(since)?];
        call(&self.broker, HISTORY_SERVICE, "getStats", args).await
    }

    pub async fn get_all(&self) -> Result<Value> {
        call(&self.broker, HISTORY_SERVICE, "getAll", vec![]).await
    }

    pub async fn get_csv(&self) -> Result<String> {
        call(&self.broker, HISTORY_SERVICE, "getCSV", vec![]).await
    }

    pub async fn clear_history(&self) -> Result<()> {
        call(&self.broker, HISTORY_SERVICE, "clearHistory", vec![]).await
    }

    pub async fn count_today(&self) -> Result<usize> {
        call(&self.broker, HISTORY_SERVICE, "countToday", vec![]).await
    }
}

/// Typed stub for [`SettingsService`].
#[derive(Clone)]
pub struct SettingsClient {
    broker: Arc<ServiceBroker>,
}

impl SettingsClient {
    pub fn new(broker: Arc<ServiceBroker>) -> Self {
        Self { broker }
    }

    pub async fn get_settings(&self) -> Result<Settings> {
        call(&self.broker, SETTINGS_SERVICE, "getSettings", vec![]).await
    }

    pub async fn set_settings(&self, settings: &Settings) -> Result<()> {
        let args = vec![serde_json::to_value(settings)?];
        call(&self.broker, SETTINGS_SERVICE, "setSettings", args).await
    }
}
