//! Contact-form relay.
//!
//! POST /api/send-email accepts a service inquiry, validates the
//! required fields, renders the inquiry email, and forwards it to the
//! Resend API. The gateway consumes only Resend's HTTP contract; mail
//! delivery itself is the provider's problem.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::gateway::AppState;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Inbound service inquiry.
///
/// Every field is optional at the deserialization layer so that a
/// missing field produces a 400 with a field list rather than a bare
/// deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InquiryForm {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_suburb: Option<String>,
    #[serde(default)]
    pub appliance_type: Option<String>,
    #[serde(default)]
    pub preferred_date: Option<String>,
    #[serde(default)]
    pub issue_description: Option<String>,
}

/// Names of required fields that are absent or blank.
pub fn missing_fields(form: &InquiryForm) -> Vec<&'static str> {
    let required: [(&'static str, &Option<String>); 5] = [
        ("customer_name", &form.customer_name),
        ("customer_phone", &form.customer_phone),
        ("customer_suburb", &form.customer_suburb),
        ("appliance_type", &form.appliance_type),
        ("issue_description", &form.issue_description),
    ];

    required
        .into_iter()
        .filter(|(_, value)| value.as_deref().map(str::trim).unwrap_or_default().is_empty())
        .map(|(name, _)| name)
        .collect()
}

/// POST /api/send-email
pub async fn send_email(State(app): State<AppState>, Json(form): Json<InquiryForm>) -> Response {
    let missing = missing_fields(&form);
    if !missing.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing required fields", "fields": missing })),
        )
            .into_response();
    }

    let api_key = match app.config.require_resend_api_key() {
        Ok(key) => key,
        Err(e) => {
            tracing::error!(error = %e, "relay not configured");
            return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "Email relay not configured" })))
                .into_response();
        }
    };

    let appliance = form.appliance_type.as_deref().unwrap_or_default();
    let suburb = form.customer_suburb.as_deref().unwrap_or_default();
    let payload = json!({
        "from": app.config.inquiry_from,
        "to": [app.config.inquiry_to],
        "subject": format!("New Service Inquiry - {appliance} in {suburb}"),
        "html": render_inquiry_email(&form),
    });

    let result = app
        .http
        .post(RESEND_ENDPOINT)
        .bearer_auth(api_key)
        .json(&payload)
        .send()
        .await;

    match result {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!(appliance, suburb, "inquiry email forwarded");
            (StatusCode::OK, Json(json!({ "success": true, "message": "Email sent successfully" }))).into_response()
        }
        Ok(resp) => {
            tracing::error!(status = resp.status().as_u16(), "mail provider rejected inquiry");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": "Failed to send email" }))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "mail provider unreachable");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": "Failed to send email" }))).into_response()
        }
    }
}

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK", "timestamp": chrono::Utc::now().to_rfc3339() }))
}

/// Render the inquiry notification email.
fn render_inquiry_email(form: &InquiryForm) -> String {
    let field = |value: &Option<String>, fallback: &str| -> String {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => escape_html(v),
            _ => fallback.to_string(),
        }
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .header {{ background: #1e3566; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; }}
        .field {{ margin-bottom: 15px; }}
        .label {{ font-weight: bold; color: #1e3566; }}
        .description {{ background: #f8fafc; border-left: 4px solid #84cc16; padding: 15px; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>New Service Inquiry</h1>
        <p>The Stove Specialist - Appliance Repair Sydney</p>
    </div>
    <div class="content">
        <h2>Customer Details</h2>
        <div class="field"><span class="label">Name:</span> {name}</div>
        <div class="field"><span class="label">Phone:</span> {phone}</div>
        <div class="field"><span class="label">Email:</span> {email}</div>
        <div class="field"><span class="label">Suburb:</span> {suburb}</div>
        <h2>Service Request</h2>
        <div class="field"><span class="label">Appliance:</span> {appliance}</div>
        <div class="field"><span class="label">Preferred Date:</span> {date}</div>
        <div class="field"><span class="label">Issue Description:</span>
            <div class="description">{issue}</div>
        </div>
        <div class="field"><span class="label">Inquiry Date:</span> {received}</div>
    </div>
</body>
</html>
"#,
        name = field(&form.customer_name, ""),
        phone = field(&form.customer_phone, ""),
        email = field(&form.customer_email, "Not provided"),
        suburb = field(&form.customer_suburb, ""),
        appliance = field(&form.appliance_type, ""),
        date = field(&form.preferred_date, "As soon as possible"),
        issue = field(&form.issue_description, ""),
        received = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    )
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use url::Url;

    use hearth_client::{CacheManager, FetchClient, FetchConfig};
    use hearth_core::{AppConfig, CacheDb};

    fn full_form() -> InquiryForm {
        InquiryForm {
            customer_name: Some("Alex Smith".into()),
            customer_phone: Some("02 9365 2508".into()),
            customer_email: Some("alex@example.com".into()),
            customer_suburb: Some("Bondi".into()),
            appliance_type: Some("Oven".into()),
            preferred_date: Some("2026-09-02".into()),
            issue_description: Some("Door won't close".into()),
        }
    }

    async fn state() -> AppState {
        let config = AppConfig::default();
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(FetchClient::new(FetchConfig::default()).unwrap());
        let manager = CacheManager::from_config(db, fetcher, &config);
        AppState {
            manager,
            origin: Url::parse(&config.origin).unwrap(),
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    #[test]
    fn test_missing_fields_complete_form() {
        assert!(missing_fields(&full_form()).is_empty());
    }

    #[test]
    fn test_missing_fields_reports_each_required_field() {
        let form = InquiryForm::default();
        let missing = missing_fields(&form);
        assert_eq!(
            missing,
            vec!["customer_name", "customer_phone", "customer_suburb", "appliance_type", "issue_description"]
        );
    }

    #[test]
    fn test_missing_fields_blank_counts_as_missing() {
        let form = InquiryForm { customer_phone: Some("   ".into()), ..full_form() };
        assert_eq!(missing_fields(&form), vec!["customer_phone"]);
    }

    #[test]
    fn test_missing_fields_optional_fields_not_required() {
        let form = InquiryForm { customer_email: None, preferred_date: None, ..full_form() };
        assert!(missing_fields(&form).is_empty());
    }

    #[test]
    fn test_render_inquiry_email_contains_details() {
        let html = render_inquiry_email(&full_form());
        assert!(html.contains("Alex Smith"));
        assert!(html.contains("Bondi"));
        assert!(html.contains("Door won&#39;t close"));
    }

    #[test]
    fn test_render_inquiry_email_defaults() {
        let form = InquiryForm { customer_email: None, preferred_date: None, ..full_form() };
        let html = render_inquiry_email(&form);
        assert!(html.contains("Not provided"));
        assert!(html.contains("As soon as possible"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
    }

    #[tokio::test]
    async fn test_send_email_missing_fields_is_400() {
        let app = state().await;
        let form = InquiryForm { customer_name: None, ..full_form() };

        let response = send_email(State(app), Json(form)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_email_without_api_key_is_503() {
        let app = state().await;

        let response = send_email(State(app), Json(full_form())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_shape() {
        let Json(body) = health().await;
        assert_eq!(body.get("status").and_then(|v| v.as_str()), Some("OK"));
        assert!(body.get("timestamp").is_some());
    }
}
