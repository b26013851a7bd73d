//! Report generation integration tests.
//!
//! Run with: `cargo test -p api --test generate_report_test`

mod common;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestResponse;
use common::{
    bearer, png_fixture, test_server, test_server_with_decoder, valid_token, CountingDecoder,
    MAX_IMAGES, MAX_IMAGE_BYTES, MAX_PAYLOAD_BYTES,
};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;

const ONE_SERVICE: &str =
    r#"[{"id": "1", "name": "Groundworks", "startDate": "2024-01-01", "endDate": "2024-01-02"}]"#;

/// A complete, valid form with every field set.
fn report_form(services: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("clientName", "Acme Developments")
        .add_text("projectName", "Riverside Tower")
        .add_text("location", "12 Quay Street, Leeds")
        .add_text("startDate", "2024-01-01")
        .add_text("endDate", "2024-01-31")
        .add_text("description", "Foundations poured.\nSteel frame to level 3.")
        .add_text("observations", "Two days lost to high winds.")
        .add_text("services", services)
}

fn png_part(name: &str) -> Part {
    Part::bytes(png_fixture(40, 30, [200, 120, 40]))
        .file_name(name)
        .mime_type("image/png")
}

async fn submit(form: MultipartForm) -> TestResponse {
    test_server()
        .post("/api/admin/generate-report")
        .add_header("Authorization", bearer(&valid_token()))
        .multipart(form)
        .await
}

fn error_of(response: &TestResponse) -> Value {
    let body: Value = response.json();
    body["error"].clone()
}

//=========================================================================================
// Success
//=========================================================================================

#[tokio::test]
async fn test_one_service_without_images_returns_a_pdf() {
    let response = submit(report_form(ONE_SERVICE)).await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "application/pdf");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"Riverside_Tower_2024-01-01_2024-01-31.pdf\""
    );
    assert_eq!(response.header("cache-control"), "no-store");
    assert!(response.as_bytes().starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_images_and_generation_date_are_accepted() {
    let form = report_form(ONE_SERVICE)
        .add_text("generatedOn", "2024-02-01T09:30:00Z")
        .add_part("images", png_part("north-elevation.png"))
        .add_part("images[]", png_part("slab.png"));

    let response = submit(form).await;

    assert_eq!(response.status_code(), 200);
    assert!(response.as_bytes().starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_empty_services_list_still_renders() {
    let response = submit(report_form("[]")).await;

    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_unknown_fields_are_ignored_and_last_duplicate_wins() {
    let form = report_form(ONE_SERVICE)
        .add_text("weather", "sunny")
        .add_text("projectName", "Harbour Walk");

    let response = submit(form).await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"Harbour_Walk_2024-01-01_2024-01-31.pdf\""
    );
}

//=========================================================================================
// Decode Failures
//=========================================================================================

#[tokio::test]
async fn test_missing_services_is_malformed() {
    let form = MultipartForm::new()
        .add_text("clientName", "Acme Developments")
        .add_text("projectName", "Riverside Tower")
        .add_text("location", "Leeds")
        .add_text("startDate", "2024-01-01")
        .add_text("endDate", "2024-01-31")
        .add_text("description", "Foundations poured.")
        .add_text("observations", "None.");

    let response = submit(form).await;

    assert_eq!(response.status_code(), 400);
    let error = error_of(&response);
    assert_eq!(error["code"], "MALFORMED_REQUEST");
    assert_eq!(error["field"], "services");
}

#[tokio::test]
async fn test_invalid_services_json_is_malformed() {
    for services in ["[{\"id\": 1,", r#"{"id": "1"}"#, r#"[{"id": "1", "name": "Roofing"}]"#] {
        let response = submit(report_form(services)).await;

        assert_eq!(response.status_code(), 400, "services: {services}");
        assert_eq!(error_of(&response)["field"], "services");
    }
}

#[tokio::test]
async fn test_disallowed_mime_type_is_rejected() {
    let form = report_form(ONE_SERVICE).add_part(
        "images",
        Part::bytes(b"BM fake bitmap".to_vec())
            .file_name("plan.bmp")
            .mime_type("image/bmp"),
    );

    let response = submit(form).await;

    assert_eq!(response.status_code(), 400);
    let error = error_of(&response);
    assert_eq!(error["code"], "INVALID_ATTACHMENT");
    assert_eq!(error["file"], "plan.bmp");
}

#[tokio::test]
async fn test_oversize_image_is_rejected() {
    let form = report_form(ONE_SERVICE).add_part(
        "images",
        Part::bytes(vec![0u8; MAX_IMAGE_BYTES + 1])
            .file_name("huge.png")
            .mime_type("image/png"),
    );

    let response = submit(form).await;

    assert_eq!(response.status_code(), 400);
    let error = error_of(&response);
    assert_eq!(error["code"], "INVALID_ATTACHMENT");
    assert_eq!(error["file"], "huge.png");
}

#[tokio::test]
async fn test_bad_attachment_after_a_valid_photo_rejects_the_whole_form() {
    let oversize = report_form(ONE_SERVICE)
        .add_part("images", png_part("ok.png"))
        .add_part(
            "images",
            Part::bytes(vec![0u8; MAX_IMAGE_BYTES + 1])
                .file_name("huge.png")
                .mime_type("image/png"),
        );
    let wrong_type = report_form(ONE_SERVICE)
        .add_part("images", png_part("ok.png"))
        .add_part(
            "images",
            Part::bytes(b"%PDF-1.4".to_vec())
                .file_name("drawing.pdf")
                .mime_type("application/pdf"),
        );

    for (form, culprit) in [(oversize, "huge.png"), (wrong_type, "drawing.pdf")] {
        let decoder = Arc::new(CountingDecoder::default());
        let response = test_server_with_decoder(decoder.clone())
            .post("/api/admin/generate-report")
            .add_header("Authorization", bearer(&valid_token()))
            .multipart(form)
            .await;

        assert_eq!(response.status_code(), 400);
        assert_ne!(response.header("content-type"), "application/pdf");
        let error = error_of(&response);
        assert_eq!(error["code"], "INVALID_ATTACHMENT");
        assert_eq!(error["file"], culprit);
        assert_eq!(decoder.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_total_payload_over_the_limit_returns_413() {
    let form = report_form(ONE_SERVICE).add_text("notes", "x".repeat(MAX_PAYLOAD_BYTES));

    let response = submit(form).await;

    assert_eq!(response.status_code(), 413);
    assert_eq!(error_of(&response)["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_too_many_images_are_rejected() {
    let mut form = report_form(ONE_SERVICE);
    for index in 0..=MAX_IMAGES {
        form = form.add_part("images", png_part(&format!("photo-{index}.png")));
    }

    let response = submit(form).await;

    assert_eq!(response.status_code(), 400);
    let error = error_of(&response);
    assert_eq!(error["code"], "INVALID_ATTACHMENT");
    assert_eq!(error["file"], format!("photo-{MAX_IMAGES}.png"));
}

//=========================================================================================
// Validation and Image Failures
//=========================================================================================

#[tokio::test]
async fn test_inverted_report_range_returns_422_naming_date_range() {
    let inverted_service =
        r#"[{"id": "1", "name": "Groundworks", "startDate": "2024-01-09", "endDate": "2024-01-02"}]"#;
    let form = report_form(inverted_service)
        .add_text("startDate", "2024-02-01")
        .add_text("endDate", "2024-01-01");

    let response = submit(form).await;

    assert_eq!(response.status_code(), 422);
    let error = error_of(&response);
    assert_eq!(error["code"], "VALIDATION_ERROR");
    assert_eq!(error["stage"], "validate");
    assert_eq!(error["field"], "dateRange");
}

#[tokio::test]
async fn test_service_errors_name_the_entry() {
    let cases = [
        (
            r#"[{"id": "1", "name": "Piling", "startDate": "2024-01-05", "endDate": "2024-01-04"}]"#,
            "services[0].dateRange",
        ),
        (
            r#"[{"id": "1", "name": "Piling", "startDate": "2024-01-01", "endDate": "2024-01-04"},
                {"id": "1", "name": "Drainage", "startDate": "2024-01-02", "endDate": "2024-01-03"}]"#,
            "services[1].id",
        ),
        (
            r#"[{"id": "1", "name": "  ", "startDate": "2024-01-01", "endDate": "2024-01-04"}]"#,
            "services[0].name",
        ),
    ];

    for (services, field) in cases {
        let response = submit(report_form(services)).await;

        assert_eq!(response.status_code(), 422, "expected failure on {field}");
        assert_eq!(error_of(&response)["field"], field);
    }
}

#[tokio::test]
async fn test_blank_client_name_is_a_validation_error() {
    let response = submit(report_form(ONE_SERVICE).add_text("clientName", "   ")).await;

    assert_eq!(response.status_code(), 422);
    assert_eq!(error_of(&response)["field"], "clientName");
}

#[tokio::test]
async fn test_unreadable_image_returns_422() {
    let form = report_form(ONE_SERVICE)
        .add_part("images", png_part("good.png"))
        .add_part(
            "images",
            Part::bytes(b"\x89PNG truncated".to_vec())
                .file_name("broken.png")
                .mime_type("image/png"),
        );

    let response = submit(form).await;

    assert_eq!(response.status_code(), 422);
    let error = error_of(&response);
    assert_eq!(error["code"], "UNREADABLE_IMAGE");
    assert_eq!(error["file"], "broken.png");
    assert!(!response.as_bytes().starts_with(b"%PDF"));
}
