//! End-to-end workflow tests against an in-process stub service
//!
//! Drives the real multipart HTTP transport, session cache and report flow.

mod helpers;

use checkmed_common::config::PacingPolicy;
use checkmed_verify::models::GeoPoint;
use checkmed_verify::services::{
    CaptureManager, CaptureStep, FixedLocation, NoLocation, RegistrationRequest, SessionCache,
};
use checkmed_verify::{Error, ImageBlob, ImageRole, ProductType, Workflow, WorkflowPhase};
use helpers::{jpeg_bytes, png_bytes, StubService};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn jpeg() -> ImageBlob {
    ImageBlob::new(jpeg_bytes(), "image/jpeg").with_file_name("box.jpg")
}

fn png() -> ImageBlob {
    ImageBlob::new(png_bytes(), "image/png").with_file_name("blister.png")
}

/// Workflow in `Capturing` with a complete Paracetamol tablet session
fn capture_paracetamol(workflow: &mut Workflow) {
    workflow.begin_scan().unwrap();
    workflow.acknowledge_instructions().unwrap();
    assert_eq!(
        workflow.start_capture("Paracetamol", ProductType::Tablet).unwrap(),
        CaptureStep::AwaitingPackage
    );
    assert_eq!(
        workflow.capture_image(ImageRole::Package, jpeg()).unwrap(),
        CaptureStep::AwaitingRegistrationCode
    );
    assert_eq!(
        workflow.set_registration_code("A7-1234").unwrap(),
        CaptureStep::AwaitingBlisterPack
    );
    assert_eq!(
        workflow.capture_image(ImageRole::BlisterPack, png()).unwrap(),
        CaptureStep::Ready
    );
    assert!(workflow.capture().unwrap().is_ready());
}

#[tokio::test]
async fn test_tablet_rejected_with_code_mismatch() {
    let stub = StubService::start().await;
    stub.reply(
        "verify",
        400,
        r#"{"status":"REJECTED","reason":"nafdac mismatch","expectedCode":"A7-1234","providedCode":"A7-1235"}"#,
    );
    let dir = TempDir::new().unwrap();
    let settings = stub.settings(dir.path(), PacingPolicy::immediate());
    let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();

    capture_paracetamol(&mut workflow);
    let verdict = workflow.verify().await.unwrap();

    assert!(!verdict.is_authentic());
    assert!(verdict.is_failed());
    assert_eq!(
        verdict.detail_text(),
        "REJECTED: nafdac mismatch\nExpected: A7-1234\nProvided: A7-1235"
    );
    assert_eq!(workflow.phase(), WorkflowPhase::Result);

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.endpoint, "verify");
    assert_eq!(
        request.field_names(),
        vec!["drug_name", "drug_type", "nafdac_number", "box_image", "blister_pack_image"]
    );
    assert_eq!(request.field("drug_name").unwrap().text(), "Paracetamol");
    assert_eq!(request.field("drug_type").unwrap().text(), "tablet");
    assert_eq!(request.field("nafdac_number").unwrap().text(), "A7-1234");

    let box_image = request.field("box_image").unwrap();
    assert_eq!(box_image.data, jpeg_bytes());
    assert_eq!(box_image.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(box_image.file_name.as_deref(), Some("box.jpg"));
    let blister = request.field("blister_pack_image").unwrap();
    assert_eq!(blister.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_syrup_authentic() {
    let stub = StubService::start().await;
    stub.reply("verify", 200, r#""Product verified""#);
    let dir = TempDir::new().unwrap();
    let settings = stub.settings(dir.path(), PacingPolicy::immediate());
    let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();

    workflow.begin_scan().unwrap();
    workflow.acknowledge_instructions().unwrap();
    workflow.start_capture("Cough Syrup", ProductType::Syrup).unwrap();
    workflow.set_registration_code(" 04-5678 ").unwrap();
    assert_eq!(
        workflow.capture_image(ImageRole::Package, jpeg()).unwrap(),
        CaptureStep::Ready
    );

    let verdict = workflow.verify().await.unwrap();
    assert!(verdict.is_authentic());
    assert!(verdict.registration_verified());
    assert_eq!(verdict.match_score(), 100);
    assert_eq!(verdict.detail_text(), "Product verified");

    let request = &stub.requests()[0];
    assert_eq!(request.field_names(), vec!["drug_name", "nafdac_number", "box_image"]);
    assert_eq!(request.field("nafdac_number").unwrap().text(), "04-5678");
}

#[tokio::test]
async fn test_validation_errors_become_detail_text() {
    let stub = StubService::start().await;
    stub.reply(
        "verify",
        422,
        r#"{"detail":[{"loc":["body","nafdac_number"],"msg":"field required"},{"loc":["body","box_image"],"msg":"invalid image"}]}"#,
    );
    let dir = TempDir::new().unwrap();
    let settings = stub.settings(dir.path(), PacingPolicy::immediate());
    let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();

    capture_paracetamol(&mut workflow);
    let verdict = workflow.verify().await.unwrap();
    assert_eq!(
        verdict.detail_text(),
        "nafdac_number: field required, box_image: invalid image"
    );
}

#[tokio::test]
async fn test_server_error_without_body() {
    let stub = StubService::start().await;
    stub.reply("verify", 503, "");
    let dir = TempDir::new().unwrap();
    let settings = stub.settings(dir.path(), PacingPolicy::immediate());
    let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();

    capture_paracetamol(&mut workflow);
    let verdict = workflow.verify().await.unwrap();
    assert!(verdict.is_failed());
    assert_eq!(verdict.detail_text(), "Request failed with status code 503");
}

#[tokio::test]
async fn test_unreachable_service_still_caches_session() {
    let dir = TempDir::new().unwrap();
    let stub = StubService::start().await;
    let mut settings = stub.settings(dir.path(), PacingPolicy::immediate());
    settings.service_url = "http://127.0.0.1:9/api".to_string();
    let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();

    capture_paracetamol(&mut workflow);
    let verdict = workflow.verify().await.unwrap();
    assert!(verdict.is_failed());
    assert!(!verdict.detail_text().is_empty());

    let cached = SessionCache::from_settings(&settings).load().unwrap().unwrap();
    assert_eq!(cached.session.product_name, "Paracetamol");
    assert_eq!(cached.session.registration_code(), "A7-1234");
    assert_eq!(cached.last_detail.as_deref(), Some(verdict.detail_text()));
}

#[tokio::test]
async fn test_pacing_floors_hold_verdict_back() {
    let stub = StubService::start().await;
    let dir = TempDir::new().unwrap();
    let settings = stub.settings(dir.path(), PacingPolicy::default());

    let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();
    capture_paracetamol(&mut workflow);
    let started = Instant::now();
    assert!(workflow.verify().await.unwrap().is_authentic());
    let success_elapsed = started.elapsed();
    assert!(success_elapsed >= Duration::from_millis(2000));
    assert!(success_elapsed < Duration::from_millis(3000));

    stub.reply("verify", 400, r#"{"detail":"Unknown product"}"#);
    workflow.start_new().unwrap();
    capture_paracetamol(&mut workflow);
    let started = Instant::now();
    assert!(workflow.verify().await.unwrap().is_failed());
    assert!(started.elapsed() >= Duration::from_millis(3000));
}

#[tokio::test]
async fn test_report_after_restart_then_cache_cleared() {
    let stub = StubService::start().await;
    stub.reply("verify", 400, r#"{"detail":"Unknown product"}"#);
    stub.reply("report", 201, r#"{"message":"Report received"}"#);
    let dir = TempDir::new().unwrap();
    let settings = stub.settings(dir.path(), PacingPolicy::immediate());

    {
        let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();
        capture_paracetamol(&mut workflow);
        workflow.verify().await.unwrap();
    }

    // Fresh workflow: the report comes from the cache only
    let point = GeoPoint::new(6.5244, 3.3792).unwrap();
    let mut workflow = Workflow::from_settings(&settings, Arc::new(FixedLocation(point))).unwrap();
    let record = workflow.prepare_report(None).await.unwrap();
    assert_eq!(record.reason, "Unknown product");
    assert_eq!(record.location, Some(point));

    let receipt = workflow.submit_report(&record).await.unwrap();
    assert_eq!(receipt.message, "Report received");
    assert_eq!(workflow.phase(), WorkflowPhase::Home);

    let report = stub
        .requests()
        .into_iter()
        .find(|r| r.endpoint == "report")
        .unwrap();
    assert_eq!(
        report.field_names(),
        vec!["drug_name", "nafdac_number", "reason", "location", "box_image", "blister_pack_image"]
    );
    assert_eq!(report.field("reason").unwrap().text(), "Unknown product");
    assert_eq!(report.field("location").unwrap().text(), "6.524400, 3.379200");
    assert_eq!(report.field("box_image").unwrap().data, jpeg_bytes());

    assert!(SessionCache::from_settings(&settings).load().unwrap().is_none());
    assert!(matches!(
        workflow.prepare_report(None).await,
        Err(Error::NoCachedSession)
    ));
}

#[tokio::test]
async fn test_rejected_report_leaves_cache_intact() {
    let stub = StubService::start().await;
    stub.reply("report", 500, "");
    let dir = TempDir::new().unwrap();
    let settings = stub.settings(dir.path(), PacingPolicy::immediate());
    let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();

    capture_paracetamol(&mut workflow);
    workflow.verify().await.unwrap();
    let cache = SessionCache::from_settings(&settings);
    let before = std::fs::read(cache.path()).unwrap();

    let record = workflow
        .prepare_report(Some("Seal was broken".to_string()))
        .await
        .unwrap();
    assert_eq!(record.location_field(), "not available");
    match workflow.submit_report(&record).await {
        Err(Error::Rejected { detail }) => {
            assert_eq!(detail, "Request failed with status code 500")
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(std::fs::read(cache.path()).unwrap(), before);
    assert_eq!(workflow.phase(), WorkflowPhase::Reporting);

    stub.reply("report", 200, "\"ok\"");
    workflow.submit_report(&record).await.unwrap();
    assert!(!cache.path().exists());
}

#[tokio::test]
async fn test_register_product() {
    let stub = StubService::start().await;
    stub.reply("register-drug", 201, r#"{"message":"Drug registered successfully"}"#);
    let dir = TempDir::new().unwrap();
    let settings = stub.settings(dir.path(), PacingPolicy::immediate());

    let mut capture = CaptureManager::new("Cough Syrup", ProductType::Syrup);
    capture.capture_image(ImageRole::Package, jpeg()).unwrap();
    capture.set_registration_code("04-5678");

    let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();
    workflow.open_registration().unwrap();
    let message = workflow
        .register(
            capture.session(),
            RegistrationRequest {
                manufacturer: "Emzor Pharmaceuticals".to_string(),
                barcode: Some("6151100000123".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(message, "Drug registered successfully");

    let request = &stub.requests()[0];
    assert_eq!(request.endpoint, "register-drug");
    assert_eq!(
        request.field_names(),
        vec!["drug_name", "drug_type", "nafdac_number", "manufacturer", "box_image", "barcode"]
    );
    assert_eq!(request.field("drug_type").unwrap().text(), "syrup");
    assert_eq!(
        request.field("manufacturer").unwrap().text(),
        "Emzor Pharmaceuticals"
    );
}

#[tokio::test]
async fn test_non_image_capture_never_reaches_service() {
    let stub = StubService::start().await;
    let dir = TempDir::new().unwrap();
    let settings = stub.settings(dir.path(), PacingPolicy::immediate());
    let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();

    workflow.begin_scan().unwrap();
    workflow.acknowledge_instructions().unwrap();
    workflow.start_capture("Paracetamol", ProductType::Tablet).unwrap();

    let text_file = dir.path().join("notes.txt");
    std::fs::write(&text_file, b"not an image").unwrap();
    let blob = ImageBlob::from_path(&text_file).unwrap();
    assert!(matches!(
        workflow.capture_image(ImageRole::Package, blob),
        Err(Error::InvalidImageKind { .. })
    ));
    assert!(matches!(
        workflow.verify().await,
        Err(Error::IncompleteSession { .. })
    ));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn test_loosely_typed_image_reaches_service_normalized() {
    let stub = StubService::start().await;
    let dir = TempDir::new().unwrap();
    let settings = stub.settings(dir.path(), PacingPolicy::immediate());
    let mut workflow = Workflow::from_settings(&settings, Arc::new(NoLocation)).unwrap();

    workflow.begin_scan().unwrap();
    workflow.acknowledge_instructions().unwrap();
    workflow.start_capture("Cough Syrup", ProductType::Syrup).unwrap();
    workflow
        .capture_image(ImageRole::Package, ImageBlob::new(png_bytes(), " IMAGE/PNG"))
        .unwrap();
    workflow.set_registration_code("04-5678").unwrap();

    let verdict = workflow.verify().await.unwrap();
    assert!(verdict.is_authentic());

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].field("box_image").unwrap().content_type.as_deref(),
        Some("image/png")
    );
}
