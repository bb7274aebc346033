//! `cairn emit` command implementation.

use anyhow::{Context, Result};
use cairn_audit::{AuditEvent, AuditSink};
use cairn_core::{CairnConfig, Identity, RequestContext};

/// Arguments of `cairn emit`.
#[derive(Debug, Clone, Default)]
pub struct EmitArgs {
    pub event_type: String,
    pub details: Option<String>,
    pub user: Option<String>,
    pub ip: Option<String>,
}

/// Request context described by the command-line flags.
pub fn build_context(args: &EmitArgs) -> RequestContext {
    RequestContext {
        user: args.user.as_deref().map(Identity::new),
        remote_addr: args.ip.clone(),
    }
}

/// Event described by the command-line flags.
pub fn build_event(args: &EmitArgs) -> Result<AuditEvent> {
    let mut event = AuditEvent::new(args.event_type.clone());
    if let Some(raw) = &args.details {
        let details: serde_json::Value =
            serde_json::from_str(raw).context("--details is not valid JSON")?;
        event = event.with_details(details);
    }
    Ok(event)
}

pub async fn run(config: &CairnConfig, args: EmitArgs) -> Result<()> {
    let logger = cairn_audit::init(&config.audit).context("failed to activate audit capture")?;

    let ctx = build_context(&args);
    let event = build_event(&args)?;

    logger
        .emit(&ctx, event)
        .await
        .with_context(|| format!("audit event '{}' was not recorded", args.event_type))?;

    tracing::info!(
        logger = logger.name(),
        event_type = %args.event_type,
        "Audit event emitted"
    );
    Ok(())
}
