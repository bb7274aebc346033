//! End-to-end capture tests: events emitted through the logger land in the
//! store with the expected identity, origin and payload.

use async_trait::async_trait;
use cairn_audit::{
    AuditError, AuditEvent, AuditLogger, AuditRecord, AuditRecordStore, AuditSink, AuditStorage,
    EventTypeAllowlist, FileStorage, MemoryStorage, PersistedRecord, activate,
};
use cairn_core::{AuditConfig, FailureMode, Identity, RequestContext};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Storage whose writes always fail.
struct BrokenStorage;

#[async_trait]
impl AuditStorage for BrokenStorage {
    async fn store(&self, _record: AuditRecord) -> Result<PersistedRecord, AuditError> {
        Err(AuditError::Persistence("connection reset".to_string()))
    }

    async fn get(&self, _id: Uuid) -> Result<Option<PersistedRecord>, AuditError> {
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

fn setup(config: &AuditConfig) -> (AuditLogger, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let logger = AuditLogger::new(config.logger_name.clone());
    activate(&logger, AuditRecordStore::new(storage.clone()), config).unwrap();
    (logger, storage)
}

/// A component that only knows the sink interface.
struct DownloadService {
    audit: Arc<dyn AuditSink>,
}

impl DownloadService {
    async fn download(&self, ctx: &RequestContext, file_id: u64) -> Result<&'static str, AuditError> {
        self.audit
            .emit(
                ctx,
                AuditEvent::new("file.download").with_details(json!({"fileId": file_id})),
            )
            .await?;
        Ok("contents")
    }
}

#[tokio::test]
async fn anonymous_download_is_recorded() {
    let (logger, storage) = setup(&AuditConfig::default());

    logger
        .emit(
            &RequestContext::anonymous("10.0.0.1"),
            AuditEvent::new("file.download").with_details(json!({"fileId": 1})),
        )
        .await
        .unwrap();

    let records = storage.records();
    assert_eq!(records.len(), 1);

    let value = serde_json::to_value(&records[0].record).unwrap();
    assert_eq!(
        value,
        json!({"type": "file.download", "details": {"fileId": 1}, "ip": "10.0.0.1", "userId": null})
    );
}

#[tokio::test]
async fn authenticated_user_is_recorded() {
    let (logger, storage) = setup(&AuditConfig::default());
    let ctx = RequestContext::anonymous("192.168.0.7")
        .with_user(Identity::new("5f1c0e").with_login("alice"));

    logger.emit(&ctx, AuditEvent::new("user.login")).await.unwrap();

    let records = storage.records();
    let record = &records[0].record;
    assert_eq!(record.user_id.as_deref(), Some("5f1c0e"));
    assert_eq!(record.ip.as_deref(), Some("192.168.0.7"));
    assert_eq!(record.details, None);
}

#[tokio::test]
async fn background_event_has_null_context() {
    let (logger, storage) = setup(&AuditConfig::default());

    logger
        .emit(&RequestContext::background(), AuditEvent::new("job.cleanup"))
        .await
        .unwrap();

    let value = serde_json::to_value(&storage.records()[0].record).unwrap();
    assert!(value["ip"].is_null());
    assert!(value["userId"].is_null());
    assert!(value["details"].is_null());
}

#[tokio::test]
async fn details_round_trip_verbatim() {
    let (logger, storage) = setup(&AuditConfig::default());
    let details = json!({
        "fileId": 42,
        "names": ["a.txt", "b.txt"],
        "nested": {"flag": true, "ratio": 0.5, "none": null},
    });
    let ctx = RequestContext::background();

    logger
        .emit(&ctx, AuditEvent::new("bulk.download").with_details(details.clone()))
        .await
        .unwrap();
    logger
        .emit(&ctx, AuditEvent::new("empty.details").with_details(json!({})))
        .await
        .unwrap();

    let records = storage.records();
    assert_eq!(records[0].record.details, Some(details));
    assert_eq!(records[1].record.details, Some(json!({})));
}

#[tokio::test]
async fn one_record_per_event_in_emission_order() {
    let (logger, storage) = setup(&AuditConfig::default());
    let ctx = RequestContext::anonymous("10.0.0.2");

    for i in 0..5 {
        logger
            .emit(&ctx, AuditEvent::new(format!("step.{i}")))
            .await
            .unwrap();
        assert_eq!(storage.len(), i + 1);
    }

    let records = storage.records();
    let types: Vec<&str> = records.iter().map(|r| r.record_type()).collect();
    assert_eq!(types, ["step.0", "step.1", "step.2", "step.3", "step.4"]);
    assert!(records.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert!(records.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_each_keep_their_order() {
    let (logger, storage) = setup(&AuditConfig::default());

    let mut tasks = Vec::new();
    for client in 0..8 {
        let logger = logger.clone();
        tasks.push(tokio::spawn(async move {
            let ctx = RequestContext::anonymous(format!("10.0.1.{client}"));
            for step in 0..10 {
                logger
                    .emit(&ctx, AuditEvent::new("api.call").with_details(json!({"step": step})))
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let records = storage.records();
    assert_eq!(records.len(), 80);

    for client in 0..8 {
        let ip = format!("10.0.1.{client}");
        let steps: Vec<i64> = records
            .iter()
            .filter(|r| r.record.ip.as_deref() == Some(ip.as_str()))
            .map(|r| r.record.details.as_ref().unwrap()["step"].as_i64().unwrap())
            .collect();
        assert_eq!(steps, (0..10).collect::<Vec<i64>>());
    }
}

#[tokio::test]
async fn persistence_failure_reaches_the_caller() {
    let logger = AuditLogger::default();
    activate(
        &logger,
        AuditRecordStore::new(Arc::new(BrokenStorage)),
        &AuditConfig::default(),
    )
    .unwrap();

    let service = DownloadService {
        audit: Arc::new(logger),
    };
    let err = service
        .download(&RequestContext::anonymous("10.0.0.1"), 1)
        .await
        .unwrap_err();

    match err {
        AuditError::Persistence(msg) => assert_eq!(msg, "connection reset"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn fail_open_lets_the_caller_proceed() {
    let config = AuditConfig {
        failure_mode: FailureMode::FailOpen,
        ..Default::default()
    };
    let logger = AuditLogger::default();
    activate(&logger, AuditRecordStore::new(Arc::new(BrokenStorage)), &config).unwrap();

    let service = DownloadService {
        audit: Arc::new(logger),
    };
    let body = service
        .download(&RequestContext::anonymous("10.0.0.1"), 1)
        .await
        .unwrap();
    assert_eq!(body, "contents");
}

#[tokio::test]
async fn rejected_record_is_not_persisted() {
    let storage = Arc::new(MemoryStorage::new());
    let store = AuditRecordStore::new(storage.clone())
        .with_validator(Arc::new(EventTypeAllowlist::new(["user.login"])));
    let logger = AuditLogger::default();
    activate(&logger, store, &AuditConfig::default()).unwrap();

    let err = logger
        .emit(&RequestContext::background(), AuditEvent::new("file.download"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::Validation(ref e) if e.field == "type"));
    assert!(storage.is_empty());
}

#[tokio::test]
async fn file_backed_records_are_retrievable_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit_log_record.jsonl");

    {
        let logger = AuditLogger::default();
        let store = AuditRecordStore::new(Arc::new(FileStorage::open(&path).unwrap()));
        activate(&logger, store, &AuditConfig::default()).unwrap();
        logger
            .emit(
                &RequestContext::anonymous("10.0.0.1").with_user(Identity::new("u-1")),
                AuditEvent::new("file.download").with_details(json!({"fileId": 1})),
            )
            .await
            .unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let persisted: PersistedRecord = serde_json::from_str(content.lines().next().unwrap()).unwrap();

    let store = AuditRecordStore::new(Arc::new(FileStorage::open(&path).unwrap()));
    let found = store.get(persisted.id).await.unwrap().unwrap();
    assert_eq!(found.record.user_id.as_deref(), Some("u-1"));
    assert_eq!(found.record.details, Some(json!({"fileId": 1})));
}
