//! Carrier webhooks: form-encoded requests in, TwiML out.
//!
//! SMS reports are ingested synchronously and answered with a status
//! message. Voice calls are answered with a greeting and a recording
//! prompt; the carrier later posts the transcription, which is ingested on
//! the voice channel.

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use talon_core::{Channel, IntakeReport};
use talon_storage::{Incident, Urgency};

use super::json_error;
use super::state::AppState;

const VOICE_GREETING: &str =
    "This is TALON emergency response. Please state your emergency after the beep. We are listening.";

const EMPTY_SMS_REPLY: &str =
    "We could not read your message. Please describe the emergency and where you are.";

/// Longest voice recording the carrier should capture, in seconds.
const MAX_RECORDING_SECS: u32 = 60;

#[derive(Debug, Deserialize)]
pub(crate) struct SmsForm {
    #[serde(rename = "Body")]
    body: String,
    #[serde(rename = "From")]
    from: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VoiceForm {
    #[serde(rename = "From")]
    from: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordingForm {
    #[serde(rename = "RecordingUrl")]
    recording_url: String,
    #[serde(rename = "From")]
    from: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptionForm {
    #[serde(rename = "TranscriptionText")]
    transcription_text: String,
    #[serde(rename = "From")]
    from: String,
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Wrap verbs in a TwiML document.
fn twiml(verbs: &str) -> Response {
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>{}</Response>",
        verbs
    );
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        document,
    )
        .into_response()
}

fn message(text: &str) -> Response {
    twiml(&format!("<Message>{}</Message>", escape_xml(text)))
}

/// Id prefix read back to callers.
fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}

/// Reply text for a freshly created incident.
fn sms_reply(incident: &Incident) -> String {
    match incident.urgency {
        Urgency::Critical => format!(
            "EMERGENCY ALERT RECEIVED. Dispatching units immediately. ID: {}",
            short_id(&incident.id)
        ),
        Urgency::Urgent => format!(
            "Help is on the way. Severity: High. ID: {}",
            short_id(&incident.id)
        ),
        Urgency::Routine => format!(
            "Incident recorded. Advice: {}",
            incident
                .reasoning
                .first()
                .map(String::as_str)
                .unwrap_or("Monitor condition")
        ),
    }
}

/// POST /webhooks/sms
pub(crate) async fn handle_sms(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SmsForm>,
) -> Response {
    debug!(from = %form.from, "sms received");
    if form.body.trim().is_empty() {
        return message(EMPTY_SMS_REPLY);
    }

    match state
        .pipeline
        .ingest(IntakeReport::new(Channel::Sms, form.body))
        .await
    {
        Ok(incident) => message(&sms_reply(&incident)),
        Err(e) => {
            error!(error = %e, "sms intake failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response()
        }
    }
}

/// POST /webhooks/voice
pub(crate) async fn handle_voice(Form(form): Form<VoiceForm>) -> Response {
    debug!(from = %form.from, "call received");
    twiml(&format!(
        "<Say>{}</Say><Record action=\"/webhooks/process_recording\" maxLength=\"{}\" playBeep=\"true\" transcribe=\"true\" transcribeCallback=\"/webhooks/transcription\"/>",
        escape_xml(VOICE_GREETING),
        MAX_RECORDING_SECS
    ))
}

/// POST /webhooks/process_recording
///
/// The transcription arrives separately, so this only acknowledges.
pub(crate) async fn handle_recording(Form(form): Form<RecordingForm>) -> impl IntoResponse {
    info!(recording_url = %form.recording_url, "recording finished");
    debug!(from = %form.from, "recording caller");
    Json(serde_json::json!({ "status": "recording_received" }))
}

/// POST /webhooks/transcription
pub(crate) async fn handle_transcription(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TranscriptionForm>,
) -> Response {
    debug!(from = %form.from, "transcription received");
    if form.transcription_text.trim().is_empty() {
        warn!("empty transcription");
        return Json(serde_json::json!({ "status": "empty_transcription" })).into_response();
    }

    match state
        .pipeline
        .ingest(IntakeReport::new(Channel::Voice, form.transcription_text))
        .await
    {
        Ok(incident) => {
            info!(incident_id = %incident.id, "incident created from transcription");
            Json(serde_json::json!({ "status": "transcription_processed" })).into_response()
        }
        Err(e) => {
            error!(error = %e, "transcription intake failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use tower::ServiceExt;

    use crate::serve::build_router;
    use crate::settings::Settings;
    use talon_storage::IncidentRepository;

    async fn post_form(app: &Router, uri: &str, form: &str) -> (StatusCode, String, String) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn xml_is_escaped() {
        assert_eq!(escape_xml("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn short_id_is_first_uuid_group() {
        assert_eq!(short_id("3f2a9c1e-0000-4000-8000-000000000000"), "3f2a9c1e");
        assert_eq!(short_id("plain"), "plain");
    }

    #[tokio::test]
    async fn critical_sms_gets_emergency_reply() {
        let pipeline = Settings::default().build_pipeline().unwrap();
        let app = build_router(pipeline.clone());

        let (status, content_type, body) = post_form(
            &app,
            "/webhooks/sms",
            "Body=chest+pain%2C+can%27t+breathe&From=%2B15550100",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/xml");

        let incidents = pipeline.service().repository().all().await.unwrap();
        assert_eq!(incidents.len(), 1);
        let expected = format!(
            "<Message>EMERGENCY ALERT RECEIVED. Dispatching units immediately. ID: {}</Message>",
            short_id(&incidents[0].id)
        );
        assert!(body.contains(&expected), "{}", body);
    }

    #[tokio::test]
    async fn routine_sms_gets_advice() {
        let app = build_router(Settings::default().build_pipeline().unwrap());
        let (_, _, body) =
            post_form(&app, "/webhooks/sms", "Body=mild+headache&From=%2B15550100").await;
        assert!(body.contains(
            "<Message>Incident recorded. Advice: No high-risk symptoms detected; monitor condition</Message>"
        ));
    }

    #[tokio::test]
    async fn blank_sms_asks_for_details() {
        let pipeline = Settings::default().build_pipeline().unwrap();
        let app = build_router(pipeline.clone());
        let (status, _, body) = post_form(&app, "/webhooks/sms", "Body=+++&From=%2B15550100").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Please describe the emergency"));
        assert!(pipeline.service().repository().is_empty().await);
    }

    #[tokio::test]
    async fn voice_prompts_for_recording() {
        let app = build_router(Settings::default().build_pipeline().unwrap());
        let (status, content_type, body) =
            post_form(&app, "/webhooks/voice", "From=%2B15550100").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/xml");
        assert!(body.contains("<Say>This is TALON emergency response."));
        assert!(body.contains("maxLength=\"60\""));
        assert!(body.contains("transcribeCallback=\"/webhooks/transcription\""));
        assert!(body.contains("action=\"/webhooks/process_recording\""));
    }

    #[tokio::test]
    async fn recording_is_acknowledged() {
        let app = build_router(Settings::default().build_pipeline().unwrap());
        let (status, _, body) = post_form(
            &app,
            "/webhooks/process_recording",
            "RecordingUrl=https%3A%2F%2Fexample.test%2Frec.wav&From=%2B15550100",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("recording_received"));
    }

    #[tokio::test]
    async fn transcription_creates_incident() {
        let pipeline = Settings::default().build_pipeline().unwrap();
        let app = build_router(pipeline.clone());

        let (status, _, body) = post_form(
            &app,
            "/webhooks/transcription",
            "TranscriptionText=my+wife+is+having+a+seizure&From=%2B15550100",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("transcription_processed"));

        let incidents = pipeline.service().repository().all().await.unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].urgency, Urgency::Critical);
        assert_eq!(incidents[0].input_text, "my wife is having a seizure");
    }

    #[tokio::test]
    async fn empty_transcription_creates_nothing() {
        let pipeline = Settings::default().build_pipeline().unwrap();
        let app = build_router(pipeline.clone());
        let (status, _, body) = post_form(
            &app,
            "/webhooks/transcription",
            "TranscriptionText=&From=%2B15550100",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("empty_transcription"));
        assert!(pipeline.service().repository().is_empty().await);
    }
}
