//! `cairn check-config` command implementation.

use anyhow::{Context, Result};
use cairn_audit::{AUDIT_LOG_COLLECTION, AuditRecordStore};
use cairn_core::CairnConfig;

pub fn run(config: &CairnConfig) -> Result<()> {
    config.validate()?;

    let audit = &config.audit;
    if audit.enabled {
        let store = AuditRecordStore::from_config(audit).context("failed to open audit store")?;
        println!(
            "collection: {} (backend: {})",
            AUDIT_LOG_COLLECTION,
            store.storage().name()
        );
    } else {
        println!("audit capture: disabled");
    }

    println!("logger: {}", audit.logger_name);
    println!("failure mode: {}", audit.failure_mode);
    match audit.write_timeout_ms {
        Some(ms) => println!("write timeout: {}ms", ms),
        None => println!("write timeout: none"),
    }
    println!(
        "validation: {}",
        if audit.validation.is_permissive() {
            "permissive"
        } else {
            "strict"
        }
    );

    Ok(())
}
