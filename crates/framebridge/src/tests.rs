//! Unit tests for the bridge pieces, against the simulated page and host.

use std::sync::Arc;
use std::time::Duration;

use frameproto::AppId;
use frameproto::ErrorKind;
use frameproto::LoadingProtocol;
use frameproto::RelayReply;
use frameproto::RuntimeInfo;
use frameproto::Timestamp;
use frameproto::ZomeCallRequest;
use serde_json::Value;
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::bus::InboundMessage;
use crate::bus::MessageBus;
use crate::bus::message_channel;
use crate::config::BridgeConfig;
use crate::config::SourcePolicy;
use crate::error::BridgeError;
use crate::error::SessionError;
use crate::host::GET_LOCALES;
use crate::host::GET_RUNTIME_INFO;
use crate::host::HostError;
use crate::host::HostProcess;
use crate::host::InvokeHost;
use crate::host::SIGN_ZOME_CALL;
use crate::mount::frame_target;
use crate::negotiate::candidates;
use crate::negotiate::negotiate;
use crate::page::FrameId;
use crate::page::HostPage;
use crate::page::LauncherEnv;
use crate::page::Platform;
use crate::probe::ProbeError;
use crate::probe::probe;
use crate::proxy::CallProxy;
use crate::proxy::Clock;
use crate::readiness::wait_for_app_setup;
use crate::router::RouteContext;
use crate::router::Router;
use crate::sim::FnInvoker;
use crate::sim::ScriptedHost;
use crate::sim::SimulatedPage;
use crate::transport::InvokeError;

const PORT: u16 = 8889;
const PROBE_TIMEOUT: Duration = Duration::from_millis(1_000);

fn runtime_info() -> RuntimeInfo {
    RuntimeInfo {
        http_server_port: PORT,
        app_port: 8888,
        admin_port: 8000,
    }
}

fn scripted_host(host: ScriptedHost) -> Arc<dyn HostProcess> {
    Arc::new(InvokeHost::new(Arc::new(host)))
}

fn zome_call() -> ZomeCallRequest {
    serde_json::from_value(json!({
        "provenance": [1, 2, 3],
        "cell_id": [[9, 9], [1, 2, 3]],
        "zome_name": "posts",
        "fn_name": "create_post",
        "payload": { "title": "hello" },
    }))
    .unwrap()
}

/// Asserts `elapsed` is `expected`, give or take the timer's millisecond
/// granularity.
fn assert_elapsed(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(10),
        "elapsed {:?}, expected {:?}",
        elapsed,
        expected
    );
}

struct FixedClock(Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

// --- Message bus ---

#[tokio::test]
async fn test_bus_fans_out_to_every_listener() {
    let bus = Arc::new(MessageBus::new());
    let mut a = bus.listen();
    let mut b = bus.listen();
    assert_ne!(a.id(), b.id());

    let delivered = bus.post(InboundMessage {
        origin: "happ://forum".into(),
        source: None,
        data: json!("hi"),
        ports: Vec::new(),
    });
    assert_eq!(delivered, 2);
    assert_eq!(a.recv().await.unwrap().data, json!("hi"));
    assert_eq!(b.recv().await.unwrap().data, json!("hi"));
}

#[tokio::test]
async fn test_dropped_listener_unregisters() {
    let bus = Arc::new(MessageBus::new());
    let listener = bus.listen();
    assert_eq!(bus.listener_count(), 1);
    drop(listener);
    assert_eq!(bus.listener_count(), 0);
    assert_eq!(
        bus.post(InboundMessage {
            origin: "happ://forum".into(),
            source: None,
            data: Value::Null,
            ports: Vec::new(),
        }),
        0
    );
}

#[tokio::test]
async fn test_reply_port_reaches_only_its_receiver() {
    let (port_a, mut rx_a) = message_channel();
    let (_port_b, mut rx_b) = message_channel();
    assert!(port_a.post(RelayReply::success(json!(1))));
    assert_eq!(rx_a.recv().await, Some(RelayReply::success(json!(1))));
    assert!(rx_b.try_recv().is_none());

    drop(rx_a);
    assert!(!port_a.post(RelayReply::success(json!(2))));
}

// --- Probe ---

#[tokio::test(start_paused = true)]
async fn test_probe_confirms_served_origin() {
    let page = SimulatedPage::new(Platform::Other).serving(LoadingProtocol::Assets);
    let cancel = CancellationToken::new();

    probe(&page, "happ://ping", PROBE_TIMEOUT, &cancel).await.unwrap();

    assert!(page.mounted().is_empty());
    assert_eq!(page.listener_count(), 0);
    let appended = page.appended();
    assert_eq!(appended.len(), 1);
    assert!(appended[0].hidden);
    assert_eq!(appended[0].src, "happ://ping");
}

#[tokio::test(start_paused = true)]
async fn test_probe_times_out_and_cleans_up() {
    let page = SimulatedPage::new(Platform::Other);
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let err = probe(&page, "happ://ping", PROBE_TIMEOUT, &cancel).await.unwrap_err();

    assert_eq!(err, ProbeError::Timeout(PROBE_TIMEOUT));
    assert_elapsed(start.elapsed(), PROBE_TIMEOUT);
    assert!(page.mounted().is_empty());
    assert_eq!(page.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_probe_ignores_messages_from_other_sources() {
    let page = Arc::new(SimulatedPage::new(Platform::Other));
    let cancel = CancellationToken::new();

    let noisy = Arc::clone(&page);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        noisy.post_without_port("http://ping.localhost:8889", None, json!("pong"));
        noisy.post_without_port("happ://ping", Some(FrameId(999)), json!("pong"));
    });

    let err = probe(page.as_ref(), "happ://ping", PROBE_TIMEOUT, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, ProbeError::Timeout(PROBE_TIMEOUT));
}

#[tokio::test(start_paused = true)]
async fn test_late_answer_after_timeout_is_never_delivered() {
    let page = SimulatedPage::new(Platform::Other)
        .serving_after(LoadingProtocol::Assets, Duration::from_millis(1_500));
    let cancel = CancellationToken::new();
    let err = probe(&page, "happ://ping", PROBE_TIMEOUT, &cancel).await.unwrap_err();
    assert_eq!(err, ProbeError::Timeout(PROBE_TIMEOUT));

    let mut watcher = page.messages().listen();
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    let late = tokio::time::timeout(Duration::from_millis(1), watcher.recv()).await;
    assert!(late.is_err(), "removed probe frame still answered");
}

#[tokio::test(start_paused = true)]
async fn test_probe_cancellation() {
    let page = SimulatedPage::new(Platform::Other);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = probe(&page, "happ://ping", PROBE_TIMEOUT, &cancel).await.unwrap_err();
    assert_eq!(err, ProbeError::Cancelled);
    assert!(page.mounted().is_empty());
    assert_eq!(page.listener_count(), 0);
}

// --- Negotiation ---

#[test]
fn test_candidate_order_per_platform() {
    let windows = candidates(Platform::Windows);
    assert_eq!(windows.probed, &[LoadingProtocol::LocalhostSubdomain]);
    assert_eq!(windows.fallback, LoadingProtocol::LocaltestMe);

    let other = candidates(Platform::Other);
    assert_eq!(
        other.probed,
        &[LoadingProtocol::Assets, LoadingProtocol::LocalhostSubdomain]
    );
    assert_eq!(other.fallback, LoadingProtocol::LocaltestMe);
}

#[test]
fn test_platform_from_app_version() {
    assert_eq!(
        Platform::from_app_version("5.0 (Windows NT 10.0; Win64; x64)"),
        Platform::Windows
    );
    assert_eq!(
        Platform::from_app_version("5.0 (X11; Linux x86_64)"),
        Platform::Other
    );
}

#[tokio::test(start_paused = true)]
async fn test_negotiate_prefers_assets_when_it_answers() {
    let page = SimulatedPage::new(Platform::Other)
        .serving(LoadingProtocol::Assets)
        .serving(LoadingProtocol::LocalhostSubdomain);
    let outcome = negotiate(&page, PORT, &BridgeConfig::default(), &CancellationToken::new()).await;

    assert_eq!(outcome.protocol, LoadingProtocol::Assets);
    assert!(outcome.confirmed);
    assert_eq!(page.appended().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_negotiate_falls_through_to_localhost() {
    let page = SimulatedPage::new(Platform::Other).serving(LoadingProtocol::LocalhostSubdomain);
    let start = Instant::now();
    let outcome = negotiate(&page, PORT, &BridgeConfig::default(), &CancellationToken::new()).await;

    assert_eq!(outcome.protocol, LoadingProtocol::LocalhostSubdomain);
    assert!(outcome.confirmed);
    assert_elapsed(start.elapsed(), PROBE_TIMEOUT);
    let srcs: Vec<_> = page.appended().into_iter().map(|f| f.src).collect();
    assert_eq!(srcs, vec!["happ://ping", "http://ping.localhost:8889"]);
}

#[tokio::test(start_paused = true)]
async fn test_negotiate_falls_back_without_probing_localtest() {
    let page = SimulatedPage::new(Platform::Other).serving(LoadingProtocol::LocaltestMe);
    let start = Instant::now();
    let outcome = negotiate(&page, PORT, &BridgeConfig::default(), &CancellationToken::new()).await;

    assert_eq!(outcome.protocol, LoadingProtocol::LocaltestMe);
    assert!(!outcome.confirmed);
    assert_elapsed(start.elapsed(), 2 * PROBE_TIMEOUT);
    assert!(page.appended().iter().all(|f| !f.src.contains("localtest.me")));
    assert!(page.mounted().is_empty());
    assert_eq!(page.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_negotiate_on_windows_skips_assets() {
    let page = SimulatedPage::new(Platform::Windows)
        .serving(LoadingProtocol::Assets)
        .serving(LoadingProtocol::LocalhostSubdomain);
    let outcome = negotiate(&page, PORT, &BridgeConfig::default(), &CancellationToken::new()).await;

    assert_eq!(outcome.protocol, LoadingProtocol::LocalhostSubdomain);
    let srcs: Vec<_> = page.appended().into_iter().map(|f| f.src).collect();
    assert_eq!(srcs, vec!["http://ping.localhost:8889"]);
}

#[tokio::test(start_paused = true)]
async fn test_negotiate_on_windows_falls_back_after_one_probe() {
    let page = SimulatedPage::new(Platform::Windows);
    let start = Instant::now();
    let outcome = negotiate(&page, PORT, &BridgeConfig::default(), &CancellationToken::new()).await;

    assert_eq!(outcome.protocol, LoadingProtocol::LocaltestMe);
    assert_elapsed(start.elapsed(), PROBE_TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn test_negotiate_uses_configured_scheme_and_timeout() {
    let page = SimulatedPage::new(Platform::Other);
    let config = BridgeConfig::default()
        .with_assets_scheme("webapp")
        .with_probe_timeout(Duration::from_millis(250));
    let start = Instant::now();
    negotiate(&page, PORT, &config, &CancellationToken::new()).await;

    assert_elapsed(start.elapsed(), Duration::from_millis(500));
    assert_eq!(page.appended()[0].src, "webapp://ping");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_negotiation_takes_fallback() {
    let page = SimulatedPage::new(Platform::Other);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = negotiate(&page, PORT, &BridgeConfig::default(), &cancel).await;

    assert_eq!(outcome.protocol, LoadingProtocol::LocaltestMe);
    assert!(!outcome.confirmed);
    assert_eq!(page.appended().len(), 1);
}

// --- Mount ---

#[test]
fn test_frame_target_appends_query_verbatim() {
    let app = AppId::from("myApp");
    assert_eq!(
        frame_target(LoadingProtocol::Assets, "happ", &app, PORT, "?foo=bar"),
        "happ://myApp?foo=bar"
    );
    assert_eq!(
        frame_target(LoadingProtocol::LocaltestMe, "happ", &app, PORT, ""),
        "http://myApp.localtest.me:8889"
    );
    assert_eq!(
        frame_target(LoadingProtocol::LocalhostSubdomain, "happ", &app, PORT, "?a=1&b=%20"),
        "http://myApp.localhost:8889?a=1&b=%20"
    );
}

// --- Readiness ---

fn ready_env() -> LauncherEnv {
    LauncherEnv {
        app_interface_port: Some(8888),
        app_interface_token: Some(vec![7, 7]),
        admin_interface_port: Some(8000),
        installed_app_id: Some("forum".into()),
    }
}

#[tokio::test(start_paused = true)]
async fn test_setup_already_done() {
    let page = SimulatedPage::new(Platform::Other);
    page.set_launcher_env(ready_env());
    let start = Instant::now();

    let interface = wait_for_app_setup(
        &page,
        Duration::from_millis(100),
        Duration::from_secs(60),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(interface.port, 8888);
    assert_eq!(interface.token, vec![7, 7]);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_setup_completes_on_next_poll() {
    let page = Arc::new(SimulatedPage::new(Platform::Other));
    let setter = Arc::clone(&page);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        setter.set_launcher_env(ready_env());
    });
    let start = Instant::now();

    wait_for_app_setup(
        page.as_ref(),
        Duration::from_millis(100),
        Duration::from_secs(60),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_elapsed(start.elapsed(), Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn test_setup_needs_both_port_and_token() {
    let page = SimulatedPage::new(Platform::Other);
    page.set_launcher_env(LauncherEnv {
        app_interface_port: Some(8888),
        ..LauncherEnv::default()
    });

    let err = wait_for_app_setup(
        &page,
        Duration::from_millis(100),
        Duration::from_secs(2),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(err, SessionError::SetupTimeout(Duration::from_secs(2)));
}

#[tokio::test(start_paused = true)]
async fn test_setup_times_out_after_sixty_seconds() {
    let page = SimulatedPage::new(Platform::Other);
    let start = Instant::now();

    let err = wait_for_app_setup(
        &page,
        Duration::from_millis(100),
        Duration::from_secs(60),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(err, SessionError::SetupTimeout(Duration::from_secs(60)));
    assert_elapsed(start.elapsed(), Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_setup_rejects_zero_poll_interval() {
    let page = SimulatedPage::new(Platform::Other);
    page.set_launcher_env(ready_env());

    let err = wait_for_app_setup(
        &page,
        Duration::ZERO,
        Duration::from_secs(60),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SessionError::InvalidConfig(_)), "got {:?}", err);
}

#[test]
fn test_launcher_env_wire_names() {
    let env: LauncherEnv = serde_json::from_value(json!({
        "APP_INTERFACE_PORT": 8888,
        "APP_INTERFACE_TOKEN": [1, 2],
        "INSTALLED_APP_ID": "forum",
    }))
    .unwrap();
    assert_eq!(env.app_interface_port, Some(8888));
    assert_eq!(env.installed_app_id.as_deref(), Some("forum"));
    assert_eq!(env.admin_interface_port, None);
    assert!(env.app_interface().is_some());
}

// --- Host process ---

#[tokio::test]
async fn test_invoke_host_command_names_and_args() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let invoker = FnInvoker::new(move |command: &str, args: Value| {
        log.lock().unwrap().push((command.to_string(), args.clone()));
        match command {
            GET_RUNTIME_INFO => Ok(json!({ "http_server_port": 1, "app_port": 2, "admin_port": 3 })),
            GET_LOCALES => Ok(json!(["en"])),
            SIGN_ZOME_CALL => Ok(json!({ "signed": true })),
            other => Err(InvokeError::UnknownCommand(other.into())),
        }
    });
    let host = InvokeHost::new(Arc::new(invoker));

    let info = host.get_runtime_info().await.unwrap();
    assert_eq!(info.app_port, 2);
    assert_eq!(host.get_locales().await.unwrap(), json!(["en"]));

    let proxy = CallProxy::new(Arc::new(host), Duration::from_secs(300));
    let signed = proxy.sign(zome_call()).await.unwrap();
    assert_eq!(signed.into_value(), json!({ "signed": true }));

    let seen = seen.lock().unwrap();
    let commands: Vec<_> = seen.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(commands, vec![GET_RUNTIME_INFO, GET_LOCALES, SIGN_ZOME_CALL]);
    let unsigned = &seen[2].1["zomeCallUnsigned"];
    assert_eq!(unsigned["zome_name"], "posts");
    assert_eq!(unsigned["nonce"].as_array().unwrap().len(), 32);
}

#[tokio::test]
async fn test_runtime_info_with_wrong_shape() {
    let invoker = FnInvoker::new(|_: &str, _: Value| Ok(json!({ "port": 1 })));
    let host = InvokeHost::new(Arc::new(invoker));

    let err = host.get_runtime_info().await.unwrap_err();
    assert!(matches!(err, HostError::UnexpectedResponse { .. }), "got {:?}", err);
}

// --- Call proxy ---

#[test]
fn test_envelope_expiry_is_now_plus_lifetime() {
    let now = Timestamp(1_700_000_000_000_000);
    let proxy = CallProxy::new(scripted_host(ScriptedHost::new(runtime_info())), Duration::from_secs(300))
        .with_clock(Arc::new(FixedClock(now)));

    let unsigned = proxy.envelope(zome_call()).unwrap();
    assert_eq!(unsigned.expires_at, Timestamp(now.0 + 300_000_000));
    assert_eq!(unsigned.zome_name, "posts");
    assert_eq!(unsigned.fn_name, "create_post");
    assert!(!unsigned.payload.is_empty());
}

#[test]
fn test_each_envelope_gets_a_fresh_nonce() {
    let proxy = CallProxy::new(scripted_host(ScriptedHost::new(runtime_info())), Duration::from_secs(300));
    let a = proxy.envelope(zome_call()).unwrap();
    let b = proxy.envelope(zome_call()).unwrap();
    assert_ne!(a.nonce, b.nonce);
    assert_eq!(a.payload, b.payload);
}

#[tokio::test]
async fn test_concurrent_signatures_use_distinct_nonces() {
    let scripted = ScriptedHost::new(runtime_info()).with_sign_latency(Duration::from_millis(50));
    let proxy = CallProxy::new(scripted_host(scripted.clone()), Duration::from_secs(300));

    let (a, b) = tokio::join!(proxy.sign(zome_call()), proxy.sign(zome_call()));
    a.unwrap();
    b.unwrap();

    let signed = scripted.signed();
    assert_eq!(signed.len(), 2);
    assert_ne!(signed[0].nonce, signed[1].nonce);
}

#[tokio::test]
async fn test_signing_failure_is_not_retried() {
    let scripted = ScriptedHost::new(runtime_info()).rejecting_signatures("agent locked");
    let proxy = CallProxy::new(scripted_host(scripted.clone()), Duration::from_secs(300));

    let err = proxy.sign(zome_call()).await.unwrap_err();
    assert!(matches!(err, BridgeError::SigningFailure(_)), "got {:?}", err);
    assert_eq!(err.kind(), ErrorKind::SigningFailure);
    assert_eq!(scripted.signed().len(), 1);
}

#[test]
fn test_encode_failure_is_internal() {
    let err = BridgeError::Encode("map key must be a string".into());
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(
        serde_json::to_value(err.to_reply()).unwrap()["kind"],
        "internal"
    );
    assert_eq!(
        BridgeError::Payload(frameproto::Error::Payload("x".into())).kind(),
        ErrorKind::Payload
    );
}

// --- Router ---

const APP_FRAME: FrameId = FrameId(7);

fn router(policy: SourcePolicy, host: ScriptedHost) -> Router {
    let host = scripted_host(host);
    Router::new(RouteContext {
        app_id: AppId::from("forum"),
        protocol: LoadingProtocol::Assets,
        runtime_info: runtime_info(),
        frame: APP_FRAME,
        policy,
        host: Arc::clone(&host),
        proxy: CallProxy::new(host, Duration::from_secs(300)),
    })
}

fn message(origin: &str, source: Option<FrameId>, data: Value) -> InboundMessage {
    InboundMessage {
        origin: origin.into(),
        source,
        data,
        ports: Vec::new(),
    }
}

#[tokio::test]
async fn test_route_app_runtime_info() {
    let router = router(SourcePolicy::MountedFrame, ScriptedHost::new(runtime_info()));
    let reply = router
        .route(&message("happ://forum", Some(APP_FRAME), json!({ "type": "get-app-runtime-info" })))
        .await;

    assert_eq!(
        reply,
        RelayReply::success(json!({
            "appId": "forum",
            "runtimeInfo": { "http_server_port": 8889, "app_port": 8888, "admin_port": 8000 },
        }))
    );
}

#[tokio::test]
async fn test_route_locales_passthrough() {
    let locales = json!({ "locale": "de-CH" });
    let router = router(
        SourcePolicy::MountedFrame,
        ScriptedHost::new(runtime_info()).with_locales(locales.clone()),
    );
    let reply = router
        .route(&message("happ://forum", Some(APP_FRAME), json!({ "type": "get-locales" })))
        .await;
    assert_eq!(reply, RelayReply::success(locales));
}

#[tokio::test]
async fn test_route_rejects_foreign_frame() {
    let router = router(SourcePolicy::MountedFrame, ScriptedHost::new(runtime_info()));
    let reply = router
        .route(&message("happ://forum", Some(FrameId(8)), json!({ "type": "get-locales" })))
        .await;
    assert!(matches!(reply, RelayReply::Error { kind: ErrorKind::UntrustedSource, .. }));
}

#[tokio::test]
async fn test_route_rejects_other_app_origin() {
    let router = router(SourcePolicy::MountedFrame, ScriptedHost::new(runtime_info()));
    let reply = router
        .route(&message("happ://wiki", Some(APP_FRAME), json!({ "type": "get-app-runtime-info" })))
        .await;
    assert!(matches!(reply, RelayReply::Error { kind: ErrorKind::UntrustedSource, .. }));
}

#[tokio::test]
async fn test_route_rejects_malformed_origin() {
    let router = router(SourcePolicy::OriginOnly, ScriptedHost::new(runtime_info()));
    let reply = router
        .route(&message("null", None, json!({ "type": "get-app-runtime-info" })))
        .await;
    assert!(matches!(reply, RelayReply::Error { kind: ErrorKind::UntrustedSource, .. }));
}

#[tokio::test]
async fn test_origin_only_policy_trusts_parsed_app_id() {
    let router = router(SourcePolicy::OriginOnly, ScriptedHost::new(runtime_info()));
    let reply = router
        .route(&message("happ://wiki/index.html", None, json!({ "type": "get-app-runtime-info" })))
        .await;
    let result = reply.into_result().unwrap();
    assert_eq!(result["appId"], "wiki");
}

#[tokio::test]
async fn test_route_bad_request() {
    let router = router(SourcePolicy::MountedFrame, ScriptedHost::new(runtime_info()));
    for data in [json!({ "type": "launch-missiles" }), json!("pong"), json!({ "type": "sign-zome-call" })] {
        let reply = router.route(&message("happ://forum", Some(APP_FRAME), data)).await;
        assert!(
            matches!(reply, RelayReply::Error { kind: ErrorKind::BadRequest, .. }),
            "got {:?}",
            reply
        );
    }
}

#[tokio::test]
async fn test_route_sign_zome_call() {
    let scripted = ScriptedHost::new(runtime_info());
    let router = router(SourcePolicy::MountedFrame, scripted.clone());
    let request = json!({ "type": "sign-zome-call", "zomeCall": serde_json::to_value(zome_call()).unwrap() });

    let result = router
        .route(&message("happ://forum", Some(APP_FRAME), request))
        .await
        .into_result()
        .unwrap();

    assert_eq!(result["zome_call"]["fn_name"], "create_post");
    assert_eq!(result["signature"].as_array().unwrap().len(), 64);
    assert_eq!(scripted.signed().len(), 1);
}

#[tokio::test]
async fn test_route_signing_failure() {
    let router = router(
        SourcePolicy::MountedFrame,
        ScriptedHost::new(runtime_info()).rejecting_signatures("no agent"),
    );
    let request = json!({ "type": "sign-zome-call", "zomeCall": serde_json::to_value(zome_call()).unwrap() });
    let reply = router.route(&message("happ://forum", Some(APP_FRAME), request)).await;

    match reply {
        RelayReply::Error { kind, message } => {
            assert_eq!(kind, ErrorKind::SigningFailure);
            assert!(message.contains("no agent"), "message: {}", message);
        }
        other => panic!("Expected error reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_spawned_router_replies_on_port_and_drops_portless() {
    let bus = Arc::new(MessageBus::new());
    let cancel = CancellationToken::new();
    let handle = router(SourcePolicy::MountedFrame, ScriptedHost::new(runtime_info()))
        .spawn(bus.listen(), cancel.clone());

    bus.post(message("happ://forum", Some(APP_FRAME), json!({ "type": "get-locales" })));

    let (port, mut rx) = message_channel();
    let mut with_port = message("happ://forum", Some(APP_FRAME), json!({ "type": "get-locales" }));
    with_port.ports.push(port);
    bus.post(with_port);

    let reply = rx.recv().await.unwrap();
    assert!(reply.is_success());

    cancel.cancel();
    handle.await.unwrap();
    assert_eq!(bus.listener_count(), 0);
}

// --- Config ---

#[test]
fn test_empty_config_is_default() {
    let config = BridgeConfig::from_json("{}").unwrap();
    assert_eq!(config, BridgeConfig::default());
    assert_eq!(config.probe_timeout(), Duration::from_millis(1_000));
    assert_eq!(config.setup_timeout(), Duration::from_secs(60));
    assert_eq!(config.nonce_lifetime(), Duration::from_secs(300));
    assert_eq!(config.source_policy, SourcePolicy::MountedFrame);
}

#[test]
fn test_config_overrides() {
    let config = BridgeConfig::from_json(
        r#"{ "probe_timeout_ms": 250, "assets_scheme": "webapp", "source_policy": "origin-only" }"#,
    )
    .unwrap();
    assert_eq!(config.probe_timeout(), Duration::from_millis(250));
    assert_eq!(config.assets_scheme, "webapp");
    assert_eq!(config.source_policy, SourcePolicy::OriginOnly);
    assert!(config.wait_for_setup);
}

#[test]
fn test_config_validation() {
    assert!(BridgeConfig::from_json(r#"{ "probe_timeout_ms": 0 }"#).is_err());
    assert!(BridgeConfig::from_json(r#"{ "assets_scheme": "9p" }"#).is_err());
    assert!(BridgeConfig::from_json(r#"{ "assets_scheme": "" }"#).is_err());
    assert!(BridgeConfig::from_json(r#"{ "setup_timeout_ms": 10 }"#).is_err());
    assert!(BridgeConfig::from_json(r#"{ "source_policy": "anything" }"#).is_err());
}

#[test]
fn test_config_setters_saturate() {
    let config = BridgeConfig::default()
        .with_setup_timeout(Duration::MAX)
        .with_nonce_lifetime(Duration::MAX)
        .with_probe_timeout(Duration::from_millis(1_500));
    assert_eq!(config.setup_timeout_ms, u64::MAX);
    assert_eq!(config.nonce_lifetime_ms, u64::MAX);
    assert_eq!(config.probe_timeout_ms, 1_500);
}
