//! HTTP routes.
//!
//! JSON endpoints live under `/api/`; report downloads under `/download/`.
//! When a static directory is configured it is served for every other path.

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the full router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let static_dir = ctx.config.static_dir.clone();

    let api = Router::new()
        .route("/predict", post(endpoints::predict::predict))
        .route("/status", get(endpoints::status::status))
        .route("/reports", get(endpoints::reports::list))
        .route("/reports/:filename", axum::routing::delete(endpoints::reports::delete))
        .route("/patients", get(endpoints::patients::list))
        .route(
            "/patients/:filename",
            get(endpoints::patients::get).delete(endpoints::patients::delete),
        )
        .route("/history", get(endpoints::history::recent));

    let mut router = Router::new()
        .nest("/api", api)
        .route("/download/:filename", get(endpoints::reports::download))
        .with_state(ctx);

    if let Some(dir) = static_dir {
        tracing::info!(dir = %dir.display(), "Serving dashboard");
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router.layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::api::types::fixtures::{default_context, test_context};
    use crate::pipeline::classifier::adapter::fixtures::bundled_adapter;
    use crate::pipeline::classifier::ClassifierAdapter;
    use crate::pipeline::reasoning::mock::MockLlmClient;
    use crate::pipeline::reasoning::ReasoningClient;

    const SCENARIO_A: &str = r#"{"age": 65, "gender": "male", "temperature": 39.5,
        "heartRate": 115, "systolicBP": 85, "diastolicBP": 50, "respiratoryRate": 28,
        "oxygenSaturation": 88, "painScore": 8, "fever": true,
        "shortness_of_breath": true, "confusion": true,
        "medical_history": ["type 2 diabetes"], "allergies": ["penicillin"]}"#;

    const SCENARIO_B: &str = r#"{"age": 30, "gender": "female", "temperature": 37.0,
        "heartRate": 70, "systolicBP": 120, "diastolicBP": 80, "respiratoryRate": 16,
        "oxygenSaturation": 99, "painScore": 2}"#;

    fn request(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<&str>) -> Response {
        app.clone().oneshot(request(method, uri, body)).await.unwrap()
    }

    #[tokio::test]
    async fn status_reports_loaded_model() {
        let (ctx, _tmp) = default_context();
        let app = api_router(ctx);

        let response = call(&app, "GET", "/api/status", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["status"], "online");
        assert_eq!(json["ml_loaded"], true);
        assert_eq!(json["gemini_available"], false);
        assert_eq!(json["reasoning_backend"], "none");
        assert_eq!(json["reports_count"], 0);
    }

    #[tokio::test]
    async fn predict_critical_patient_end_to_end() {
        let (ctx, _tmp) = default_context();
        let app = api_router(ctx);

        let response = call(&app, "POST", "/api/predict", Some(SCENARIO_A)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["primary_diagnosis"], "Sepsis");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["urgency"], "emergency");
        assert_eq!(json["source"], "ML Model");
        assert_eq!(json["pdf_generated"], true);
        assert!(json["severity_score"].as_f64().unwrap() >= 8.0);
        assert!(json["patient_id"].as_str().unwrap().starts_with("patient_"));
        assert_eq!(json["report"]["diagnosis_summary"]["primary_diagnosis"], "Sepsis");
        assert!(json["treatment_plan"]["diagnostic_tests"]
            .as_str()
            .unwrap()
            .contains("Central Venous Pressure Monitoring"));
        assert!(json["ml_validation"].is_null());

        let pdf_url = json["pdf_report_url"].as_str().unwrap().to_string();
        let download = call(&app, "GET", &pdf_url, None).await;
        assert_eq!(download.status(), StatusCode::OK);
        assert_eq!(download.headers()["content-type"], "application/pdf");
        let bytes = download.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"%PDF"));

        let reports = json_of(call(&app, "GET", "/api/reports", None).await).await;
        assert_eq!(reports["count"], 1);
        assert_eq!(reports["reports"][0]["download_url"], pdf_url.as_str());

        let patients = json_of(call(&app, "GET", "/api/patients", None).await).await;
        assert_eq!(patients["count"], 1);
        assert_eq!(patients["patients"][0]["diagnosis"], "Sepsis");

        let history = json_of(call(&app, "GET", "/api/history", None).await).await;
        assert_eq!(history["count"], 1);
        assert_eq!(history["entries"][0]["verdict"]["severity"], "critical");
    }

    #[tokio::test]
    async fn predict_healthy_patient_is_routine() {
        let (ctx, _tmp) = default_context();
        let app = api_router(ctx);

        let json = json_of(call(&app, "POST", "/api/predict", Some(SCENARIO_B)).await).await;
        assert_eq!(json["severity"], "mild");
        assert_eq!(json["urgency"], "routine");
    }

    #[tokio::test]
    async fn predict_with_reasoning_records_provenance() {
        let review = r#"{"diagnosis": "Sepsis", "severity": "critical", "urgency": "emergency",
            "clinical_reasoning": "Septic shock with hypoxia.",
            "ml_validation": "Correct", "certainty": 0.9,
            "treatment_plan": {
                "immediate_interventions": "IV fluids, broad-spectrum antibiotics"
            }}"#;
        let client = ReasoningClient::new(
            Arc::new(MockLlmClient::new(review)),
            "mock-model",
            Duration::from_secs(5),
        );
        let (ctx, _tmp) = test_context(bundled_adapter(), Some(client));
        let app = api_router(ctx);

        let json = json_of(call(&app, "POST", "/api/predict", Some(SCENARIO_A)).await).await;
        assert_eq!(json["source"], "ML Model + Reasoning Service");
        assert_eq!(json["reasoning"], "Septic shock with hypoxia.");
        assert_eq!(
            json["treatment_plan"]["immediate_interventions"],
            "IV fluids, broad-spectrum antibiotics"
        );
        assert_eq!(json["ml_validation"], "Correct");
        assert_eq!(json["report"]["diagnosis_summary"]["certainty"], 0.9);
        assert!(json["report"]["risk_analysis"]["model_agreement"]
            .as_str()
            .unwrap()
            .contains("as Correct (certainty 90%)"));

        let status = json_of(call(&app, "GET", "/api/status", None).await).await;
        assert_eq!(status["gemini_available"], true);
        assert_eq!(status["reasoning_model"], "mock-model");
    }

    #[tokio::test]
    async fn predict_rejects_invalid_payload() {
        let (ctx, _tmp) = default_context();
        let app = api_router(ctx);

        let body = r#"{"age": 200, "heartRate": 75, "shoeSize": 42}"#;
        let response = call(&app, "POST", "/api/predict", Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_of(response).await;
        assert_eq!(json["status"], "validation_error");
        assert_eq!(json["errors"][0], "Unknown field: shoeSize");

        let response = call(&app, "POST", "/api/predict", Some(r#"{"age": 200}"#)).await;
        let json = json_of(response).await;
        assert_eq!(json["errors"][0], "Age must be between 0 years and 120 years");
    }

    #[tokio::test]
    async fn predict_rejects_missing_vitals_without_storing() {
        let (ctx, _tmp) = default_context();
        let reports = ctx.reports.clone();
        let patients = ctx.patients.clone();
        let app = api_router(ctx);

        let response = call(&app, "POST", "/api/predict", Some(r#"{"age": 70}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_of(response).await;
        assert_eq!(json["status"], "validation_error");
        assert_eq!(json["errors"].as_array().unwrap().len(), 7);
        assert_eq!(json["errors"][5], "Oxygen saturation is required");

        assert_eq!(reports.count(), 0);
        assert_eq!(patients.count(), 0);
        let history = json_of(call(&app, "GET", "/api/history", None).await).await;
        assert_eq!(history["count"], 0);
    }

    #[tokio::test]
    async fn predict_without_model_is_503() {
        let (ctx, _tmp) = test_context(ClassifierAdapter::unavailable("no artifact"), None);
        let app = api_router(ctx);

        let response = call(&app, "POST", "/api/predict", Some(SCENARIO_B)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = json_of(response).await;
        assert_eq!(json["error"]["code"], "SERVICE_UNAVAILABLE");

        let status = json_of(call(&app, "GET", "/api/status", None).await).await;
        assert_eq!(status["ml_loaded"], false);
    }

    #[tokio::test]
    async fn retention_caps_stored_files() {
        let (ctx, _tmp) = default_context();
        let reports = ctx.reports.clone();
        let patients = ctx.patients.clone();
        let app = api_router(ctx);

        for _ in 0..5 {
            let response = call(&app, "POST", "/api/predict", Some(SCENARIO_B)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(reports.count(), 3);
        assert_eq!(patients.count(), 3);
    }

    #[tokio::test]
    async fn file_routes_validate_names() {
        let (ctx, _tmp) = default_context();
        let app = api_router(ctx);

        let bad = call(&app, "DELETE", "/api/reports/evil.pdf", None).await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = call(&app, "DELETE", "/api/reports/report_20260314092653.pdf", None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let bad = call(&app, "GET", "/download/patient_20260314092653.json", None).await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = call(&app, "GET", "/api/patients/patient_20260314092653.json", None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patient_file_roundtrip_and_delete() {
        let (ctx, _tmp) = default_context();
        let app = api_router(ctx);

        let json = json_of(call(&app, "POST", "/api/predict", Some(SCENARIO_A)).await).await;
        let patient_id = json["patient_id"].as_str().unwrap().to_string();
        let uri = format!("/api/patients/{patient_id}.json");

        let stored = json_of(call(&app, "GET", &uri, None).await).await;
        assert_eq!(stored["patient_id"], patient_id.as_str());
        assert_eq!(stored["patient_data"]["allergies"][0], "penicillin");
        assert_eq!(stored["diagnosis"]["primary_diagnosis"], "Sepsis");
        assert!(stored["diagnosis"]["report_file"].is_string());

        let deleted = call(&app, "DELETE", &uri, None).await;
        assert_eq!(deleted.status(), StatusCode::OK);
        assert_eq!(json_of(deleted).await["status"], "success");
        assert_eq!(call(&app, "GET", &uri, None).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serves_static_dashboard() {
        let (mut ctx, tmp) = default_context();
        let site = tmp.path().join("site");
        std::fs::create_dir_all(&site).unwrap();
        std::fs::write(site.join("index.html"), "<h1>MediPatient</h1>").unwrap();
        let mut config = (*ctx.config).clone();
        config.static_dir = Some(site);
        ctx.config = Arc::new(config);
        let app = api_router(ctx);

        let response = call(&app, "GET", "/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"<h1>MediPatient</h1>");
    }
}
