//! Session-level behaviour against a scripted rendering capability.
//!
//! The double never touches the network or paints anything, so these tests
//! run on Tokio's paused clock: the 15 s address deadline and the 200 ms
//! export stagger are checked against virtual time.

use async_trait::async_trait;
use html2img::{
    CaptureConfig, CaptureError, CaptureMode, CaptureRegion, CaptureResult, CaptureSource,
    ConversionSession, DownloadSink, ExportError, OutputFormat, RawInput, RenderError,
    RenderHandle, RenderingCapability, ResultRegistry, SessionObserver, SessionState,
    ViewportSpec, EXPORT_STAGGER,
};
use image::RgbaImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

// ── Test doubles ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
enum Behaviour {
    Succeed,
    CrossOrigin,
    Fail,
    /// Surface is created, rasterisation never finishes.
    Hang,
    /// Loading never finishes.
    HangOnLoad,
}

struct ScriptedRenderer {
    behaviour: Behaviour,
    live: AtomicUsize,
    created: AtomicUsize,
    viewports: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedRenderer {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            live: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            viewports: Mutex::new(Vec::new()),
        })
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderingCapability for ScriptedRenderer {
    async fn render_to_surface(
        &self,
        _source: &CaptureSource,
        viewport: &ViewportSpec,
    ) -> Result<RenderHandle, RenderError> {
        if let Behaviour::HangOnLoad = self.behaviour {
            std::future::pending::<()>().await;
        }
        self.viewports
            .lock()
            .unwrap()
            .push((viewport.width(), viewport.height()));
        self.live.fetch_add(1, Ordering::SeqCst);
        let id = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(RenderHandle::new(id as u64))
    }

    async fn rasterize(
        &self,
        _handle: &RenderHandle,
        region: CaptureRegion,
    ) -> Result<RgbaImage, RenderError> {
        match self.behaviour {
            Behaviour::Succeed => Ok(RgbaImage::from_pixel(
                region.width,
                region.height.unwrap_or(1000),
                image::Rgba([200, 220, 240, 255]),
            )),
            Behaviour::CrossOrigin => Err(RenderError::CrossOriginBlocked {
                origin: "https://example.com".into(),
            }),
            Behaviour::Fail => Err(RenderError::LoadFailed {
                target: "x".into(),
                reason: "connection reset".into(),
            }),
            Behaviour::Hang | Behaviour::HangOnLoad => std::future::pending().await,
        }
    }

    fn release(&self, _handle: RenderHandle) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingObserver {
    transitions: Mutex<Vec<SessionState>>,
    fallbacks: Mutex<Vec<String>>,
    failures: AtomicUsize,
}

impl RecordingObserver {
    fn transitions(&self) -> Vec<SessionState> {
        self.transitions.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_state_change(&self, _from: SessionState, to: SessionState) {
        self.transitions.lock().unwrap().push(to);
    }

    fn on_fallback(&self, source: &str) {
        self.fallbacks.lock().unwrap().push(source.to_string());
    }

    fn on_failure(&self, _error: &CaptureError) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingSink {
    dispatched: Mutex<Vec<(String, Instant)>>,
}

impl DownloadSink for RecordingSink {
    fn dispatch(&self, result: &CaptureResult) -> Result<(), ExportError> {
        self.dispatched
            .lock()
            .unwrap()
            .push((result.source_description.clone(), Instant::now()));
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn session_with(
    behaviour: Behaviour,
) -> (ConversionSession, Arc<ScriptedRenderer>, Arc<RecordingObserver>) {
    let renderer = ScriptedRenderer::new(behaviour);
    let observer = Arc::new(RecordingObserver::default());
    let config = CaptureConfig::builder()
        .observer(observer.clone() as Arc<dyn SessionObserver>)
        .build()
        .unwrap();
    let session = ConversionSession::new(renderer.clone(), config);
    (session, renderer, observer)
}

fn url(s: &str) -> RawInput {
    RawInput::Address(s.to_string())
}

fn markup(s: &str) -> RawInput {
    RawInput::Markup(s.to_string())
}

// ── Direct capture ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn markup_direct_success_on_desktop_png() {
    let (mut session, renderer, observer) = session_with(Behaviour::Succeed);
    let mut registry = ResultRegistry::new();

    session.select_input(markup("<h1>Hello</h1>")).unwrap();
    let id = session.convert(&mut registry).await.unwrap();

    assert_eq!(session.state(), SessionState::Completed);
    let result = registry.get(id).unwrap();
    assert_eq!(result.format, OutputFormat::Png);
    assert_eq!(result.dimensions.width, 1920);
    assert_eq!(result.dimensions.height, 1080);
    assert_eq!(result.mode, CaptureMode::Direct);
    assert!(result.disclosure.is_none());
    assert!(result.preview_data_uri.starts_with("data:image/png;base64,"));
    assert!(result.file_name().starts_with("webpage_"));
    assert!(result.file_name().ends_with(".png"));

    assert_eq!(
        observer.transitions(),
        vec![
            SessionState::Validating,
            SessionState::Acquiring,
            SessionState::Encoding,
            SessionState::Completed,
        ]
    );
    assert_eq!(renderer.created.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn settle_delay_is_waited_before_rasterising() {
    let (mut session, _renderer, _) = session_with(Behaviour::Succeed);
    session.output_mut().set_settle_delay_ms(3000);
    let mut registry = ResultRegistry::new();
    session.select_input(markup("<p>x</p>")).unwrap();

    let start = Instant::now();
    session.convert(&mut registry).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn out_of_range_viewport_is_clamped_before_acquisition() {
    let (mut session, renderer, _) = session_with(Behaviour::Succeed);
    session.viewport_mut().set_width(10);
    session.viewport_mut().set_height(9_000);
    let mut registry = ResultRegistry::new();

    session.select_input(markup("<p>tiny</p>")).unwrap();
    let id = session.convert(&mut registry).await.unwrap();

    assert_eq!(renderer.viewports.lock().unwrap().as_slice(), &[(100, 4000)]);
    let r = registry.get(id).unwrap();
    assert_eq!((r.dimensions.width, r.dimensions.height), (100, 4000));
}

#[tokio::test(start_paused = true)]
async fn jpeg_result_carries_quality_label() {
    let (mut session, _, _) = session_with(Behaviour::Succeed);
    session.output_mut().set_format(OutputFormat::Jpeg);
    session.output_mut().set_quality(55);
    let mut registry = ResultRegistry::new();

    session.select_input(markup("<p>q</p>")).unwrap();
    let id = session.convert(&mut registry).await.unwrap();
    let r = registry.get(id).unwrap();
    assert_eq!(r.quality_label, "55%");
    assert_eq!(&r.bytes[..2], &[0xFF, 0xD8]);
    assert!(r.file_name().ends_with(".jpeg"));
}

// ── Fallback ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn cross_origin_denial_falls_back_silently() {
    let (mut session, renderer, observer) = session_with(Behaviour::CrossOrigin);
    let mut registry = ResultRegistry::new();

    session.select_input(url("https://example.com")).unwrap();
    let id = session.convert(&mut registry).await.unwrap();

    assert_eq!(session.state(), SessionState::Completed);
    assert!(session.last_error().is_none());
    assert_eq!(
        observer.transitions(),
        vec![
            SessionState::Validating,
            SessionState::Acquiring,
            SessionState::FallingBack,
            SessionState::Encoding,
            SessionState::Completed,
        ]
    );
    assert_eq!(
        observer.fallbacks.lock().unwrap().as_slice(),
        &["https://example.com/".to_string()]
    );

    let r = registry.get(id).unwrap();
    assert_eq!(r.source_description, "https://example.com/");
    assert_eq!(r.mode, CaptureMode::Synthesized);
    assert!(r.is_synthesized());
    let disclosure = r.disclosure.as_deref().unwrap();
    assert!(disclosure.contains("1920x1080"));
    assert!(disclosure.contains("PNG"));
    assert!(disclosure.contains("Synthesized preview"));
    assert_eq!(renderer.live(), 0);

    // The address bar carries the normalised address, so its field is not blank.
    let img = image::load_from_memory(&r.bytes).unwrap().to_rgba8();
    let white = image::Rgba([255, 255, 255, 255]);
    let field_has_text = (12..44).any(|y| (46..600).any(|x| *img.get_pixel(x, y) != white));
    assert!(field_has_text);
}

#[tokio::test(start_paused = true)]
async fn fallback_output_is_deterministic() {
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let (mut session, _, _) = session_with(Behaviour::CrossOrigin);
        let mut registry = ResultRegistry::new();
        session.select_input(url("https://example.com")).unwrap();
        let id = session.convert(&mut registry).await.unwrap();
        outputs.push(registry.remove(id).unwrap());
    }
    let (a, b) = (&outputs[0], &outputs[1]);
    assert_eq!(a.dimensions, b.dimensions);
    assert_eq!(a.disclosure, b.disclosure);
    assert_eq!(a.bytes, b.bytes);
}

#[tokio::test(start_paused = true)]
async fn cross_origin_on_markup_is_a_failure() {
    let (mut session, _, _) = session_with(Behaviour::CrossOrigin);
    let mut registry = ResultRegistry::new();
    session.select_input(markup("<p>x</p>")).unwrap();
    let err = session.convert(&mut registry).await.unwrap_err();
    assert!(matches!(err, CaptureError::AcquisitionFailed(_)));
    assert!(registry.is_empty());
}

// ── Timeout ──────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn hanging_address_times_out_and_tears_down() {
    for behaviour in [Behaviour::Hang, Behaviour::HangOnLoad] {
        let (mut session, renderer, observer) = session_with(behaviour);
        let mut registry = ResultRegistry::new();
        session.select_input(url("https://slow.example")).unwrap();

        let start = Instant::now();
        let err = session.convert(&mut registry).await.unwrap_err();

        assert!(
            matches!(err, CaptureError::Timeout { ms: 15_000 }),
            "{behaviour:?}: {err:?}"
        );
        assert!(start.elapsed() >= Duration::from_millis(15_000));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.last_error().is_some());
        assert_eq!(renderer.live(), 0, "{behaviour:?} leaked a surface");
        assert_eq!(observer.failures.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
        assert!(err.user_message().contains("too long"));
    }
}

#[tokio::test(start_paused = true)]
async fn custom_address_timeout_is_honoured() {
    let renderer = ScriptedRenderer::new(Behaviour::Hang);
    let config = CaptureConfig::builder()
        .address_timeout_ms(3_000)
        .build()
        .unwrap();
    let mut session = ConversionSession::new(renderer.clone(), config);
    let mut registry = ResultRegistry::new();
    session.select_input(url("example.com")).unwrap();

    let start = Instant::now();
    let err = session.convert(&mut registry).await.unwrap_err();
    assert!(matches!(err, CaptureError::Timeout { ms: 3_000 }));
    assert!(start.elapsed() < Duration::from_millis(15_000));
}

// ── Invalid input ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn invalid_address_never_leaves_idle() {
    let (mut session, renderer, observer) = session_with(Behaviour::Succeed);

    let err = session.select_input(url("not a url")).unwrap_err();
    assert_eq!(err.code(), "bad-url");
    assert_eq!(session.state(), SessionState::Idle);
    assert!(observer.transitions().is_empty());
    assert_eq!(renderer.created.load(Ordering::SeqCst), 0);
    match session.last_error() {
        Some(e) => assert_eq!(e.user_message(), err.to_string()),
        None => panic!("rejection should be recorded"),
    }
}

#[test]
fn malformed_addresses_are_all_bad_url() {
    let (mut session, _, _) = session_with(Behaviour::Succeed);
    for raw in [
        "",
        "   ",
        "not a url",
        "ftp://example.com/file",
        "file:///etc/hosts",
        "http://",
        "http://exa mple.com",
        "http://[::1",
        "mailto:user@example.com",
        "file:/etc/passwd",
    ] {
        let err = session.select_input(url(raw)).unwrap_err();
        assert_eq!(err.code(), "bad-url", "{raw:?}");
        assert_eq!(session.state(), SessionState::Idle);
    }
}

#[tokio::test(start_paused = true)]
async fn convert_reports_rejected_input_and_can_reset() {
    let (mut session, _, _) = session_with(Behaviour::Succeed);
    let mut registry = ResultRegistry::new();

    session.select_input(markup("   ")).unwrap_err();
    let err = session.convert(&mut registry).await.unwrap_err();
    assert!(matches!(err, CaptureError::InvalidInput(ref e) if e.code() == "empty-html"));
    assert_eq!(session.state(), SessionState::Failed);

    session.reset();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.last_error().is_none());

    session.select_input(markup("<p>fixed</p>")).unwrap();
    session.convert(&mut registry).await.unwrap();
    assert_eq!(registry.len(), 1);
}

// ── Failures and busy ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn capability_failure_is_generic_and_keeps_registry() {
    let (mut ok_session, _, _) = session_with(Behaviour::Succeed);
    let (mut bad_session, renderer, _) = session_with(Behaviour::Fail);
    let mut registry = ResultRegistry::new();

    ok_session.select_input(markup("<p>one</p>")).unwrap();
    let first = ok_session.convert(&mut registry).await.unwrap();

    bad_session.select_input(url("example.com")).unwrap();
    let err = bad_session.convert(&mut registry).await.unwrap_err();
    assert!(matches!(err, CaptureError::AcquisitionFailed(_)));
    assert_eq!(err.user_message(), "Failed to convert to an image. Please try again.");
    assert_eq!(bad_session.state(), SessionState::Failed);
    assert_eq!(renderer.live(), 0);

    assert_eq!(registry.len(), 1);
    assert!(registry.get(first).is_some());
}

#[tokio::test(start_paused = true)]
async fn convert_is_inert_while_an_attempt_is_in_flight() {
    // Markup has no deadline, so a hanging capability keeps the attempt
    // in flight until the caller gives up on it.
    let (mut session, renderer, _) = session_with(Behaviour::Hang);
    let mut registry = ResultRegistry::new();
    session.select_input(markup("<p>stuck</p>")).unwrap();

    let abandoned =
        tokio::time::timeout(Duration::from_secs(60), session.convert(&mut registry)).await;
    assert!(abandoned.is_err());
    assert_eq!(session.state(), SessionState::Acquiring);
    assert_eq!(renderer.live(), 0, "dropping the attempt releases its surface");

    let err = session.convert(&mut registry).await.unwrap_err();
    assert!(matches!(err, CaptureError::Busy));
    assert_eq!(session.state(), SessionState::Acquiring);
    assert_eq!(renderer.created.load(Ordering::SeqCst), 1);

    session.reset();
    assert_eq!(session.state(), SessionState::Idle);
}

// ── Registry export ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn export_all_dispatches_in_order_with_stagger() {
    let (mut session, _, _) = session_with(Behaviour::Succeed);
    let mut registry = ResultRegistry::new();
    for name in ["r1", "r2", "r3"] {
        session
            .select_input(RawInput::File(html2img::MarkupFile::from_bytes(
                name,
                "text/html",
                format!("<p>{name}</p>").into_bytes(),
            )))
            .unwrap();
        session.convert(&mut registry).await.unwrap();
    }

    let sink = RecordingSink::default();
    let start = Instant::now();
    assert_eq!(registry.export_all(&sink).await, 3);

    let dispatched = sink.dispatched.lock().unwrap();
    let order: Vec<&str> = dispatched.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(order, ["r1", "r2", "r3"]);
    for pair in dispatched.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= EXPORT_STAGGER);
    }
    assert!(start.elapsed() >= EXPORT_STAGGER * 2);
}

#[tokio::test(start_paused = true)]
async fn removed_results_are_not_exported() {
    let (mut session, _, _) = session_with(Behaviour::Succeed);
    let mut registry = ResultRegistry::new();
    let mut ids = Vec::new();
    for html in ["<p>a</p>", "<p>b</p>", "<p>c</p>"] {
        session.select_input(markup(html)).unwrap();
        ids.push(session.convert(&mut registry).await.unwrap());
    }
    registry.remove(ids[1]);

    let sink = RecordingSink::default();
    assert_eq!(registry.export_all(&sink).await, 2);

    registry.clear();
    assert_eq!(registry.export_all(&sink).await, 0);
    assert_eq!(sink.dispatched.lock().unwrap().len(), 2);
}
