use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN};
use axum::http::{HeaderValue, Method, StatusCode};
use axum_test::TestServer;
use chrono::NaiveDate;
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::{DynamicImage, ImageFormat};
use photo_mentor::api::{create_halted_router, create_router};
use photo_mentor::challenge::challenge_for;
use photo_mentor::clock::FixedClock;
use photo_mentor::config::Config;
use photo_mentor::gemini::{AiError, GenerateRequest, VisionModel, DEFAULT_MODEL};
use photo_mentor::mentor::Mentor;
use photo_mentor::models::*;
use tempfile::TempDir;

/// Scripted stand-in for the Gemini API that records what it was asked.
struct FakeModel {
    models: Option<Vec<String>>,
    reply: Mutex<Result<String, String>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeModel {
    fn new(models: Option<Vec<&str>>) -> Self {
        Self {
            models: models.map(|m| m.into_iter().map(str::to_string).collect()),
            reply: Mutex::new(Ok("# 🎨 Artistic Vision: Quiet Light".to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn reply_with(&self, reply: Result<&str, &str>) {
        *self.reply.lock().unwrap() = reply.map(str::to_string).map_err(str::to_string);
    }

    fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionModel for FakeModel {
    async fn list_models(&self) -> Result<Vec<String>, AiError> {
        self.models.clone().ok_or(AiError::Api {
            code: 503,
            message: "listing unavailable".to_string(),
        })
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply
            .lock()
            .unwrap()
            .clone()
            .map_err(|message| AiError::Api { code: 500, message })
    }
}

struct Harness {
    server: TestServer,
    model: Arc<FakeModel>,
    today: NaiveDate,
    _dir: TempDir,
}

fn setup_with(models: Option<Vec<&str>>) -> Harness {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let model = Arc::new(FakeModel::new(models));

    let mentor = Mentor::new(&Config::for_data_dir(dir.path()), model.clone())
        .with_clock(FixedClock::on(today));
    let server = TestServer::new(create_router(mentor)).expect("Failed to create test server");

    Harness {
        server,
        model,
        today,
        _dir: dir,
    }
}

fn setup() -> Harness {
    setup_with(Some(vec!["models/gemini-1.5-flash", "models/gemini-1.5-pro"]))
}

fn plain_jpeg() -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::new_rgb8(8, 8)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .unwrap();
    bytes
}

/// A JPEG whose APP1 segment carries the given EXIF fields.
fn jpeg_with_exif(fields: &[Field]) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let jpeg = plain_jpeg();
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn canon_fields() -> Vec<Field> {
    vec![
        Field {
            tag: Tag::Model,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![b"Canon EOS R5".to_vec()]),
        },
        Field {
            tag: Tag::FNumber,
            ifd_num: In::PRIMARY,
            value: Value::Rational(vec![Rational { num: 4, denom: 1 }]),
        },
        Field {
            tag: Tag::PhotographicSensitivity,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![400]),
        },
    ]
}

async fn upload_jpeg(server: &TestServer, bytes: Vec<u8>) -> PhotoView {
    let response = server
        .post("/api/v1/photo")
        .content_type("image/jpeg")
        .bytes(Bytes::from(bytes))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<PhotoView>()
}

async fn dashboard(server: &TestServer) -> DashboardView {
    server.get("/api/v1/dashboard").await.json::<DashboardView>()
}

mod page {
    use super::*;

    #[tokio::test]
    async fn serves_dashboard_html() {
        let h = setup();
        let response = h.server.get("/").await;
        response.assert_status_ok();
        assert!(response.text().contains("My Photography Journey"));
    }

    #[tokio::test]
    async fn renders_replies_as_escaped_markdown() {
        let h = setup();
        let page = h.server.get("/").await.text();

        assert!(page.contains("function renderMarkdown"));
        assert!(page.contains("escapeHtml(src)"));
        assert!(page.contains("$('result').innerHTML = renderMarkdown("));
        assert!(page.contains("$('journal').innerHTML = renderMarkdown("));
        assert!(!page.contains("innerHTML = view."));
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let h = setup();
        let response = h.server.get("/api/v1/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["status"], "ok");
    }

    #[tokio::test]
    async fn other_origins_get_no_cors_grant() {
        let h = setup();
        let origin = HeaderValue::from_static("https://elsewhere.example");

        let response = h
            .server
            .get("/api/v1/journal")
            .add_header(ORIGIN, origin.clone())
            .await;
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        let preflight = h
            .server
            .method(Method::OPTIONS, "/api/v1/review")
            .add_header(ORIGIN, origin)
            .add_header(
                ACCESS_CONTROL_REQUEST_METHOD,
                HeaderValue::from_static("POST"),
            )
            .await;
        assert!(preflight.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn missing_api_key_halts_every_route() {
        let server = TestServer::new(create_halted_router("API key missing. Set GOOGLE_API_KEY and restart."))
            .expect("Failed to create test server");

        for path in ["/", "/api/v1/dashboard", "/api/v1/photo"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
            assert!(response.text().contains("API key missing"));
        }
    }
}

mod dashboard_view {
    use super::*;

    #[tokio::test]
    async fn starts_idle_with_todays_challenge() {
        let h = setup();
        let view = dashboard(&h.server).await;

        assert_eq!(view.state, SessionState::Idle);
        assert!(view.photo.is_none());
        assert!(view.journal.is_none());
        assert_eq!(view.challenge, challenge_for(h.today));
        assert!(view.challenge_label.contains(&view.challenge.title));
        assert_eq!(view.button_label, ReviewMode::Mentor.button_label());
        assert_eq!(view.calendar.days.len(), 7);
        assert_eq!(view.calendar.days[6].date, h.today);
        assert_eq!(view.calendar.total, 0);
    }

    #[tokio::test]
    async fn challenge_is_stable_within_a_day() {
        let h = setup();
        let first = h.server.get("/api/v1/challenge").await.json::<Challenge>();
        let second = h.server.get("/api/v1/challenge").await.json::<Challenge>();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn lists_models_from_the_api() {
        let h = setup();
        let models = h.server.get("/api/v1/models").await.json::<Vec<String>>();
        assert_eq!(models, vec!["models/gemini-1.5-flash", "models/gemini-1.5-pro"]);
    }

    #[tokio::test]
    async fn falls_back_to_default_model_when_listing_fails() {
        let h = setup_with(None);
        let models = h.server.get("/api/v1/models").await.json::<Vec<String>>();
        assert_eq!(models, vec![DEFAULT_MODEL]);
    }
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn shows_extracted_metadata() {
        let h = setup();
        let photo = upload_jpeg(&h.server, jpeg_with_exif(&canon_fields())).await;

        assert_eq!(photo.exif, "present");
        assert_eq!(photo.device, "Canon EOS R5");
        assert_eq!(photo.caption, "Captured with Canon EOS R5");
        assert!(photo.panel.contains(&"Aperture: f/4.0".to_string()));
        assert!(photo.panel.contains(&"ISO: 400".to_string()));
        assert_eq!(photo.metadata.get(ISO), Some(&MetaValue::Integer(400)));

        assert_eq!(dashboard(&h.server).await.state, SessionState::ImageLoaded);
    }

    #[tokio::test]
    async fn photo_without_exif_shows_notice() {
        let h = setup();
        let photo = upload_jpeg(&h.server, plain_jpeg()).await;

        assert!(photo.metadata.is_empty());
        assert_eq!(photo.panel, vec![NO_METADATA_NOTICE]);
        assert_eq!(photo.width, Some(8));
    }

    #[tokio::test]
    async fn detects_format_without_content_type() {
        let h = setup();
        let response = h
            .server
            .post("/api/v1/photo")
            .bytes(Bytes::from(plain_jpeg()))
            .await;
        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json::<PhotoView>().mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn rejects_unsupported_type() {
        let h = setup();
        let response = h
            .server
            .post("/api/v1/photo")
            .content_type("image/gif")
            .bytes(Bytes::from_static(b"GIF89a"))
            .await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(dashboard(&h.server).await.state, SessionState::Idle);
    }

    #[tokio::test]
    async fn corrupt_image_keeps_session_idle() {
        let h = setup();
        let response = h
            .server
            .post("/api/v1/photo")
            .content_type("image/jpeg")
            .bytes(Bytes::from_static(b"\xFF\xD8\xFFnot really a jpeg"))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("Could not decode JPEG"));
        assert_eq!(dashboard(&h.server).await.state, SessionState::Idle);
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let h = setup();
        upload_jpeg(&h.server, plain_jpeg()).await;

        h.server
            .delete("/api/v1/photo")
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let view = dashboard(&h.server).await;
        assert_eq!(view.state, SessionState::Idle);
        assert!(view.photo.is_none());
    }
}

mod mode {
    use super::*;

    #[tokio::test]
    async fn requires_a_photo() {
        let h = setup();
        h.server
            .put("/api/v1/mode")
            .json(&ModeInput { challenge: true })
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn toggling_changes_button_label() {
        let h = setup();
        upload_jpeg(&h.server, plain_jpeg()).await;

        let view = h
            .server
            .put("/api/v1/mode")
            .json(&ModeInput { challenge: true })
            .await
            .json::<ModeView>();
        assert_eq!(view.state, SessionState::AwaitingModeChoice);
        assert_eq!(view.button_label, ReviewMode::Judge.button_label());

        let view = h
            .server
            .put("/api/v1/mode")
            .json(&ModeInput { challenge: false })
            .await
            .json::<ModeView>();
        assert_eq!(view.button_label, ReviewMode::Mentor.button_label());
    }
}

mod mentor_review {
    use super::*;

    #[tokio::test]
    async fn requires_a_photo() {
        let h = setup();
        h.server
            .post("/api/v1/review")
            .await
            .assert_status(StatusCode::CONFLICT);
        assert!(h.model.requests().is_empty());
    }

    #[tokio::test]
    async fn sends_device_and_metadata_in_prompt() {
        let h = setup();
        upload_jpeg(&h.server, jpeg_with_exif(&canon_fields())).await;

        let review = h.server.post("/api/v1/review").await.json::<Review>();

        assert_eq!(review.mode, ReviewMode::Mentor);
        assert_eq!(review.text, "# 🎨 Artistic Vision: Quiet Light");
        assert!(!review.accepted);

        let requests = h.model.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.prompt.contains("Canon EOS R5"));
        assert!(request.prompt.contains("ISO: 400"));
        assert!(request.prompt.contains("Aperture: f/4.0"));
        assert!(request.system_instruction.contains("Lightroom Recipe"));
        assert_eq!(request.image.mime_type, "image/jpeg");
        assert_eq!(request.model, "models/gemini-1.5-flash");

        let view = dashboard(&h.server).await;
        assert_eq!(view.state, SessionState::ResultDisplayed);
        assert_eq!(view.result.unwrap().text, review.text);
    }

    #[tokio::test]
    async fn uses_requested_model() {
        let h = setup();
        upload_jpeg(&h.server, plain_jpeg()).await;

        let review = h
            .server
            .post("/api/v1/review")
            .json(&ReviewInput {
                model: Some("models/gemini-1.5-pro".to_string()),
            })
            .await
            .json::<Review>();

        assert_eq!(review.model, "models/gemini-1.5-pro");
        assert_eq!(h.model.requests()[0].model, "models/gemini-1.5-pro");
    }

    #[tokio::test]
    async fn prompt_says_no_metadata_when_absent() {
        let h = setup();
        upload_jpeg(&h.server, plain_jpeg()).await;

        h.server.post("/api/v1/review").await.assert_status_ok();

        let prompt = &h.model.requests()[0].prompt;
        assert!(prompt.contains("No EXIF metadata found."));
        assert!(prompt.contains("your camera"));
        assert!(!prompt.contains("[]"));
    }

    #[tokio::test]
    async fn mentor_acceptance_words_do_not_touch_history() {
        let h = setup();
        h.model.reply_with(Ok("Your framing is ACCEPTED by any standard"));
        upload_jpeg(&h.server, plain_jpeg()).await;

        let review = h.server.post("/api/v1/review").await.json::<Review>();

        assert!(!review.accepted);
        let history = h.server.get("/api/v1/history").await.json::<History>();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn model_failure_is_shown_and_nothing_changes() {
        let h = setup();
        h.model.reply_with(Err("Resource has been exhausted"));
        upload_jpeg(&h.server, plain_jpeg()).await;
        h.server
            .put("/api/v1/mode")
            .json(&ModeInput { challenge: true })
            .await;

        let response = h.server.post("/api/v1/review").await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(response.text().contains("Resource has been exhausted"));

        let view = dashboard(&h.server).await;
        assert_eq!(view.state, SessionState::AwaitingModeChoice);
        assert!(view.error.unwrap().contains("exhausted"));
        assert!(view.result.is_none());
        assert!(view.challenge_mode);
        assert_eq!(view.calendar.total, 0);
    }
}

mod judge_review {
    use super::*;

    #[tokio::test]
    async fn accepted_verdict_records_today() {
        let h = setup();
        h.model.reply_with(Ok("# 🎯 Challenge Verdict: ACCEPTED ✅\n\nGreat lines!"));
        upload_jpeg(&h.server, plain_jpeg()).await;
        h.server
            .put("/api/v1/mode")
            .json(&ModeInput { challenge: true })
            .await
            .assert_status_ok();

        let review = h.server.post("/api/v1/review").await.json::<Review>();

        assert_eq!(review.mode, ReviewMode::Judge);
        assert!(review.accepted);
        assert!(review.celebrate);

        let request = &h.model.requests()[0];
        let challenge = challenge_for(h.today);
        assert!(request.system_instruction.contains("Challenge Verdict"));
        assert!(request.prompt.contains(&challenge.text));

        let history = h.server.get("/api/v1/history").await.json::<History>();
        assert!(history.contains(h.today));

        let calendar = h
            .server
            .get("/api/v1/history/calendar")
            .await
            .json::<Calendar>();
        assert!(calendar.days[6].success);
        assert_eq!(calendar.days[6].label, SUCCESS_MARKER);
        assert_eq!(calendar.total, 1);
    }

    #[tokio::test]
    async fn second_success_same_day_does_not_duplicate() {
        let h = setup();
        h.model.reply_with(Ok("Veredito: aceito"));

        for _ in 0..2 {
            upload_jpeg(&h.server, plain_jpeg()).await;
            h.server
                .put("/api/v1/mode")
                .json(&ModeInput { challenge: true })
                .await;
            let review = h.server.post("/api/v1/review").await.json::<Review>();
            assert!(review.accepted);
        }

        let history = h.server.get("/api/v1/history").await.json::<History>();
        assert_eq!(history.len(), 1);
        assert!(history.contains(h.today));
    }

    #[tokio::test]
    async fn try_again_verdict_records_nothing() {
        let h = setup();
        h.model.reply_with(Ok("# 🎯 Challenge Verdict: TRY AGAIN 🔄"));
        upload_jpeg(&h.server, plain_jpeg()).await;
        h.server
            .put("/api/v1/mode")
            .json(&ModeInput { challenge: true })
            .await;

        let review = h.server.post("/api/v1/review").await.json::<Review>();

        assert!(!review.accepted);
        assert!(!review.celebrate);
        let history = h.server.get("/api/v1/history").await.json::<History>();
        assert!(history.is_empty());
    }
}

mod journal {
    use super::*;

    #[tokio::test]
    async fn returns_not_found_before_first_note() {
        let h = setup();
        h.server
            .get("/api/v1/journal")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejects_empty_note() {
        let h = setup();
        let response = h
            .server
            .post("/api/v1/journal")
            .json(&JournalInput {
                text: String::new(),
            })
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Write something first!");
        h.server
            .get("/api/v1/journal")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn saved_notes_appear_in_journal_and_dashboard() {
        let h = setup();
        h.server
            .post("/api/v1/journal")
            .json(&JournalInput {
                text: "Shadows tell stories.".to_string(),
            })
            .await
            .assert_status(StatusCode::CREATED);

        let response = h.server.get("/api/v1/journal").await;
        response.assert_status_ok();
        assert_eq!(
            response.text(),
            "### 2024-05-01 12:00\nShadows tell stories.\n\n"
        );

        let view = dashboard(&h.server).await;
        assert!(view.journal.unwrap().contains("Shadows tell stories."));
    }
}
