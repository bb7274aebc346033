//! Audit logger implementation.
//!
//! [`AuditLogger`] is the dispatch point application code emits audit events
//! to. It is an explicit value, cloned (cheaply) into every component that
//! needs it, usually behind the [`AuditSink`] trait. Dispatch is inline: each
//! registered handler runs in registration order on the emitting task, and
//! `emit` returns only after all of them have finished.

use async_trait::async_trait;
use cairn_core::RequestContext;
use std::sync::{Arc, RwLock};

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::handler::AuditHandler;

/// Something audit events can be emitted to.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Emit one event under the caller's request context.
    async fn emit(&self, ctx: &RequestContext, event: AuditEvent) -> Result<(), AuditError>;
}

/// The audit logger: an ordered list of handlers.
#[derive(Clone)]
pub struct AuditLogger {
    name: Arc<str>,
    handlers: Arc<RwLock<Vec<Arc<dyn AuditHandler>>>>,
}

impl AuditLogger {
    /// Create a logger without handlers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a handler. Handlers stay attached for the logger's lifetime.
    pub fn register(&self, handler: Arc<dyn AuditHandler>) -> Result<(), AuditError> {
        let mut handlers = self.handlers.write().map_err(|e| {
            AuditError::InitializationFailed(format!("failed to acquire handler lock: {}", e))
        })?;

        tracing::debug!(logger = %self.name, handler = handler.name(), "Audit handler registered");
        handlers.push(handler);
        Ok(())
    }

    /// Attach a handler unless one with the same name is already attached.
    ///
    /// The check and the insert happen under one write lock.
    pub fn register_unique(&self, handler: Arc<dyn AuditHandler>) -> Result<(), AuditError> {
        let mut handlers = self.handlers.write().map_err(|e| {
            AuditError::InitializationFailed(format!("failed to acquire handler lock: {}", e))
        })?;

        if handlers.iter().any(|h| h.name() == handler.name()) {
            return Err(AuditError::InitializationFailed(format!(
                "handler '{}' already attached to logger '{}'",
                handler.name(),
                self.name
            )));
        }

        tracing::debug!(logger = %self.name, handler = handler.name(), "Audit handler registered");
        handlers.push(handler);
        Ok(())
    }

    /// Whether a handler with `name` is attached.
    pub fn has_handler(&self, name: &str) -> bool {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers.iter().any(|h| h.name() == name)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn snapshot(&self) -> Result<Vec<Arc<dyn AuditHandler>>, AuditError> {
        self.handlers
            .read()
            .map(|handlers| handlers.clone())
            .map_err(|e| AuditError::Internal(anyhow::anyhow!("handler lock poisoned: {}", e)))
    }

    /// Dispatch an event to every handler, in order.
    ///
    /// The first handler error stops dispatch and is returned to the caller.
    pub async fn log(&self, ctx: &RequestContext, event: AuditEvent) -> Result<(), AuditError> {
        tracing::debug!(
            logger = %self.name,
            event_type = %event.message,
            user = ctx.current_user().map(|u| u.id.as_str()).unwrap_or("-"),
            ip = ctx.remote_address().unwrap_or("-"),
            "Audit event"
        );

        for handler in self.snapshot()? {
            handler.handle(ctx, &event).await?;
        }
        Ok(())
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new("audit")
    }
}

#[async_trait]
impl AuditSink for AuditLogger {
    async fn emit(&self, ctx: &RequestContext, event: AuditEvent) -> Result<(), AuditError> {
        self.log(ctx, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the order handlers ran in.
    struct Tracer {
        name: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl AuditHandler for Tracer {
        async fn handle(&self, _ctx: &RequestContext, event: &AuditEvent) -> Result<(), AuditError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event.message));
            if self.fail {
                Err(AuditError::Persistence("disk full".to_string()))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn tracer(name: &'static str, calls: &Arc<Mutex<Vec<String>>>, fail: bool) -> Arc<Tracer> {
        Arc::new(Tracer {
            name,
            calls: calls.clone(),
            fail,
        })
    }

    #[tokio::test]
    async fn test_no_handlers_is_ok() {
        let logger = AuditLogger::default();
        assert_eq!(logger.name(), "audit");
        logger
            .log(&RequestContext::background(), AuditEvent::new("noop"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let logger = AuditLogger::new("audit");
        logger.register(tracer("first", &calls, false)).unwrap();
        logger.register(tracer("second", &calls, false)).unwrap();

        assert_eq!(logger.handler_count(), 2);
        assert!(logger.has_handler("second"));
        assert!(!logger.has_handler("third"));

        let ctx = RequestContext::background();
        logger.log(&ctx, AuditEvent::new("a")).await.unwrap();
        logger.emit(&ctx, AuditEvent::new("b")).await.unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["first:a", "second:a", "first:b", "second:b"]
        );
    }

    #[tokio::test]
    async fn test_handler_error_stops_dispatch() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let logger = AuditLogger::new("audit");
        logger.register(tracer("failing", &calls, true)).unwrap();
        logger.register(tracer("after", &calls, false)).unwrap();

        let err = logger
            .log(&RequestContext::background(), AuditEvent::new("a"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::Persistence(_)));
        assert_eq!(*calls.lock().unwrap(), vec!["failing:a"]);
    }

    #[test]
    fn test_register_unique_rejects_duplicate_name() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let logger = AuditLogger::new("audit");
        logger.register_unique(tracer("capture", &calls, false)).unwrap();

        let err = logger
            .register_unique(tracer("capture", &calls, false))
            .unwrap_err();
        assert!(matches!(err, AuditError::InitializationFailed(_)));
        assert_eq!(logger.handler_count(), 1);
    }

    #[test]
    fn test_lookups_survive_poisoned_lock() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let logger = AuditLogger::new("audit");
        logger.register(tracer("capture", &calls, false)).unwrap();

        let handlers = logger.handlers.clone();
        let _ = std::thread::spawn(move || {
            let _guard = handlers.write().unwrap();
            panic!("poison the handler lock");
        })
        .join();

        assert!(logger.handlers.is_poisoned());
        assert!(logger.has_handler("capture"));
        assert_eq!(logger.handler_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_handlers() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let logger = AuditLogger::new("audit");
        let sink: Arc<dyn AuditSink> = Arc::new(logger.clone());

        logger.register(tracer("late", &calls, false)).unwrap();
        sink.emit(&RequestContext::background(), AuditEvent::new("x"))
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["late:x"]);
    }
}
