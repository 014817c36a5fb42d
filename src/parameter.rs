//! Parameter and Quantity: typed control and read endpoints.
//!
//! A [`Parameter`] is a named, kind-checked control endpoint. Its hardware
//! write is a callable bound after construction, so the same parameter type
//! works for every transport:
//!
//! ```rust,ignore
//! let bias = Arc::new(Parameter::new("bias").with_unit("V").with_kind(ValueKind::Float));
//! bias.assign_method(move |v| {
//!     let dac = dac.clone();
//!     Box::pin(async move { dac.write_volts(v.as_f64().unwrap_or(0.0)).await })
//! })?;
//! bias.set(0.25)?;
//! bias.push().await?;
//! ```
//!
//! A [`Quantity`] is the read-side counterpart: a bound read callable,
//! optional settling delays on both sides of the read, and a last-value slot
//! where `None` is the missing-value sentinel. A failing read records the
//! sentinel and continues; one bad sample must not abort a sweep.
//!
//! Both types are interior-mutable and intended to be handled as
//! `Arc<Parameter>` / `Arc<Quantity>`, shared between the sweep driver, the
//! user's measurement code, and instrument callbacks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{SweepError, SweepResult};
use crate::value::{Value, ValueKind};

/// Hardware write callable bound to a physical parameter.
pub type WriteFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Hardware read callable bound to a quantity.
pub type ReadFn = Arc<dyn Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Hook invoked around a parameter push.
pub type PushHook = Arc<dyn Fn() + Send + Sync>;

/// How a parameter reaches (or does not reach) hardware.
#[derive(Clone)]
pub enum Drive {
    /// Hardware-backed; the write callable is bound after construction.
    Physical(Option<WriteFn>),
    /// Sweep and axis bookkeeping only; a push never touches hardware.
    Abstract,
}

/// A named, kind-checked control endpoint.
pub struct Parameter {
    name: String,
    unit: Option<String>,
    kind: ValueKind,
    value: RwLock<Option<Value>>,
    drive: RwLock<Drive>,
    pre_push_hooks: RwLock<Vec<PushHook>>,
    post_push_hooks: RwLock<Vec<PushHook>>,
}

impl Parameter {
    /// Create a physical parameter with no bound method and kind `Any`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            kind: ValueKind::Any,
            value: RwLock::new(None),
            drive: RwLock::new(Drive::Physical(None)),
            pre_push_hooks: RwLock::new(Vec::new()),
            post_push_hooks: RwLock::new(Vec::new()),
        }
    }

    /// Create an abstract parameter: it drives sweep and axis bookkeeping
    /// but never performs a hardware write.
    pub fn new_abstract(name: impl Into<String>) -> Self {
        let mut p = Self::new(name);
        p.drive = RwLock::new(Drive::Abstract);
        p
    }

    /// Set the physical unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Declare the value kind; assignments are coerced against it.
    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical unit label, if declared.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Declared value kind.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Whether this parameter is abstract (bookkeeping only).
    pub fn is_abstract(&self) -> bool {
        matches!(*self.drive.read(), Drive::Abstract)
    }

    /// Current value, if one has been assigned.
    pub fn value(&self) -> Option<Value> {
        self.value.read().clone()
    }

    /// Assign a value, coercing it to the declared kind.
    pub fn set(&self, value: impl Into<Value>) -> SweepResult<()> {
        let coerced = value.into().coerce(self.kind, &self.name)?;
        *self.value.write() = Some(coerced);
        Ok(())
    }

    /// Bind the hardware write callable.
    ///
    /// Fails on an abstract parameter: there is nothing to write to.
    pub fn assign_method(
        &self,
        writer: impl Fn(Value) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    ) -> SweepResult<()> {
        let mut drive = self.drive.write();
        match &*drive {
            Drive::Abstract => Err(SweepError::Configuration(format!(
                "parameter '{}' is abstract and cannot bind a write method",
                self.name
            ))),
            Drive::Physical(_) => {
                debug!(parameter = %self.name, "binding write method");
                *drive = Drive::Physical(Some(Arc::new(writer)));
                Ok(())
            }
        }
    }

    /// Register a hook to run immediately before each hardware push.
    pub fn add_pre_push_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.pre_push_hooks.write().push(Arc::new(hook));
    }

    /// Register a hook to run immediately after each hardware push.
    pub fn add_post_push_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.post_push_hooks.write().push(Arc::new(hook));
    }

    /// Push the current value to hardware.
    ///
    /// Abstract parameters return immediately without running hooks. A
    /// physical parameter runs its pre-push hooks in registration order,
    /// invokes the bound write with the current value, then runs the
    /// post-push hooks in order.
    pub async fn push(&self) -> SweepResult<()> {
        let writer = match &*self.drive.read() {
            Drive::Abstract => return Ok(()),
            Drive::Physical(None) => {
                return Err(SweepError::NotConfigured {
                    name: self.name.clone(),
                    role: "write",
                })
            }
            Drive::Physical(Some(w)) => w.clone(),
        };
        let value = self.value.read().clone().ok_or_else(|| {
            SweepError::Configuration(format!(
                "parameter '{}' pushed before any value was assigned",
                self.name
            ))
        })?;

        let pre_hooks = self.pre_push_hooks.read().clone();
        for hook in pre_hooks {
            hook();
        }
        debug!(parameter = %self.name, value = %value, "pushing value");
        writer(value).await.map_err(|e| SweepError::Push {
            parameter: self.name.clone(),
            source: e,
        })?;
        let post_hooks = self.post_push_hooks.read().clone();
        for hook in post_hooks {
            hook();
        }
        Ok(())
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("kind", &self.kind)
            .field("value", &*self.value.read())
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

/// A named read endpoint for a physical quantity.
pub struct Quantity {
    name: String,
    unit: Option<String>,
    method: RwLock<Option<ReadFn>>,
    value: RwLock<Option<Value>>,
    delay_before: Duration,
    delay_after: Duration,
}

impl Quantity {
    /// Create a quantity with no bound read method and no delays.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            method: RwLock::new(None),
            value: RwLock::new(None),
            delay_before: Duration::ZERO,
            delay_after: Duration::ZERO,
        }
    }

    /// Set the physical unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Settling delay observed before each read.
    pub fn with_delay_before(mut self, delay: Duration) -> Self {
        self.delay_before = delay;
        self
    }

    /// Settling delay observed after each read, even a failed one.
    pub fn with_delay_after(mut self, delay: Duration) -> Self {
        self.delay_after = delay;
        self
    }

    /// Quantity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical unit label, if declared.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Last measured value; `None` is the missing-value sentinel.
    pub fn value(&self) -> Option<Value> {
        self.value.read().clone()
    }

    /// Bind the hardware read callable.
    pub fn assign_method(
        &self,
        reader: impl Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync + 'static,
    ) {
        debug!(quantity = %self.name, "binding read method");
        *self.method.write() = Some(Arc::new(reader));
    }

    /// Perform one measurement cycle.
    ///
    /// Sleeps the pre-delay, invokes the bound read, and stores the result.
    /// A failing read is absorbed: the value becomes the missing-value
    /// sentinel, a warning is logged, and the sweep continues. The
    /// post-delay is observed regardless of the outcome.
    pub async fn measure(&self) -> SweepResult<()> {
        let reader = self
            .method
            .read()
            .clone()
            .ok_or_else(|| SweepError::NotConfigured {
                name: self.name.clone(),
                role: "read",
            })?;

        tokio::time::sleep(self.delay_before).await;
        match reader().await {
            Ok(v) => {
                debug!(quantity = %self.name, value = %v, "measured");
                *self.value.write() = Some(v);
            }
            Err(e) => {
                warn!(quantity = %self.name, error = %e, "unable to measure; recording missing value");
                *self.value.write() = None;
            }
        }
        tokio::time::sleep(self.delay_after).await;
        Ok(())
    }
}

impl std::fmt::Debug for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quantity")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("value", &*self.value.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_push_unbound_fails() {
        let p = Parameter::new("bias");
        p.set(1.0).unwrap();
        let err = p.push().await.unwrap_err();
        assert!(matches!(err, SweepError::NotConfigured { role: "write", .. }));
    }

    #[tokio::test]
    async fn test_abstract_push_is_noop() {
        let p = Parameter::new_abstract("index");
        p.set(3).unwrap();
        p.push().await.unwrap();
    }

    #[test]
    fn test_abstract_rejects_method() {
        let p = Parameter::new_abstract("index");
        let err = p
            .assign_method(|_| Box::pin(async { Ok(()) }))
            .unwrap_err();
        assert!(err.to_string().contains("abstract"));
    }

    #[test]
    fn test_typed_set_coerces_and_rejects() {
        let p = Parameter::new("points").with_kind(ValueKind::Int);
        p.set(2.9).unwrap();
        assert_eq!(p.value(), Some(Value::Int(2)));
        assert!(p.set(true).is_err());
    }

    #[tokio::test]
    async fn test_push_runs_hooks_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let p = Parameter::new("shutter");
        for tag in ["pre1", "pre2"] {
            let log = log.clone();
            p.add_pre_push_hook(move || log.lock().unwrap().push(tag));
        }
        {
            let log = log.clone();
            p.add_post_push_hook(move || log.lock().unwrap().push("post"));
        }
        {
            let log = log.clone();
            p.assign_method(move |_| {
                let log = log.clone();
                Box::pin(async move {
                    log.lock().unwrap().push("write");
                    Ok(())
                })
            })
            .unwrap();
        }
        p.set(1.0).unwrap();
        p.push().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["pre1", "pre2", "write", "post"]);
    }

    #[tokio::test]
    async fn test_push_writes_current_value() {
        let written = Arc::new(AtomicU64::new(0));
        let p = Parameter::new("exposure");
        let w = written.clone();
        p.assign_method(move |v| {
            let w = w.clone();
            Box::pin(async move {
                w.store(v.as_f64().unwrap_or(0.0) as u64, Ordering::SeqCst);
                Ok(())
            })
        })
        .unwrap();
        p.set(250.0).unwrap();
        p.push().await.unwrap();
        assert_eq!(written.load(Ordering::SeqCst), 250);
    }

    #[tokio::test]
    async fn test_measure_unbound_fails() {
        let q = Quantity::new("temperature");
        assert!(matches!(
            q.measure().await.unwrap_err(),
            SweepError::NotConfigured { role: "read", .. }
        ));
    }

    #[tokio::test]
    async fn test_measure_failure_records_sentinel() {
        let q = Quantity::new("temperature").with_unit("K");
        let calls = Arc::new(AtomicU64::new(0));
        let c = calls.clone();
        q.assign_method(move || {
            let c = c.clone();
            Box::pin(async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(Value::Float(4.2))
                } else {
                    Err(anyhow::anyhow!("sensor open circuit"))
                }
            })
        });
        q.measure().await.unwrap();
        assert_eq!(q.value(), Some(Value::Float(4.2)));
        q.measure().await.unwrap();
        assert_eq!(q.value(), None);
    }

    #[tokio::test]
    async fn test_measure_observes_delays_even_on_failure() {
        let q = Quantity::new("pressure")
            .with_delay_before(Duration::from_millis(10))
            .with_delay_after(Duration::from_millis(20));
        q.assign_method(|| Box::pin(async { Err(anyhow::anyhow!("gauge offline")) }));
        let start = std::time::Instant::now();
        q.measure().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(q.value(), None);
    }
}
