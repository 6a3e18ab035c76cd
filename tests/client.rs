// tests/client.rs

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing_subscriber::EnvFilter;

use fingerprint_rpc::protocol::{AcquisitionParams, DeviceParams, Method, NotificationKind};
use fingerprint_rpc::{
    // ---
    create_memory_channel,
    default_device_uid,
    ClientConfig,
    ConnectionState,
    DeviceModality,
    DeviceTechnology,
    DeviceUidType,
    Error,
    Event,
    EventHandler,
    EventKind,
    FingerprintClient,
    MemoryService,
    QualityCode,
    SampleFormat,
};

const WAIT: Duration = Duration::from_millis(500);

fn init_logging() {
    // ---
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn within<F: Future>(fut: F) -> F::Output {
    timeout(WAIT, fut).await.expect("timed out")
}

async fn setup(config: ClientConfig) -> (FingerprintClient, MemoryService) {
    // ---
    init_logging();
    let (channel, service) = create_memory_channel(&config);
    let client = FingerprintClient::with_channel(channel, config)
        .await
        .expect("client creation failed");
    (client, service)
}

/// Connected client whose service end answers every connect at once.
async fn setup_connected() -> (FingerprintClient, MemoryService) {
    // ---
    let (client, service) = setup(ClientConfig::default()).await;
    service.set_auto_accept(true);
    (client, service)
}

/// Handler that forwards each event it sees, tagged, into a channel.
fn forward(tx: &mpsc::UnboundedSender<(String, Event)>, tag: &str) -> EventHandler {
    // ---
    let tx = tx.clone();
    let tag = tag.to_string();
    EventHandler::new(move |event| {
        let _ = tx.send((tag.clone(), event.clone()));
    })
}

#[tokio::test]
async fn queued_calls_are_sent_in_invocation_order() {
    // ---
    // Arrange
    // ---
    let (client, mut service) = setup(ClientConfig::default()).await;

    // ---
    // Act
    // ---
    let stop = tokio::spawn(client.stop_acquisition(Some("reader-2")));
    let enumerate = tokio::spawn(client.enumerate_devices());
    let start = tokio::spawn(client.start_acquisition(SampleFormat::PngImage, None));
    let info = tokio::spawn(client.get_device_info("reader-1"));

    // ---
    // Assert
    // ---
    assert_eq!(service.connect_attempts(), 1);
    assert_eq!(client.connection_state(), ConnectionState::Connecting);
    assert_eq!(client.pending_requests(), 4);
    assert!(service.try_next_frame().is_none());

    service.accept().await.expect("accept failed");

    let mut sent = Vec::new();
    for _ in 0..4 {
        let command = within(service.next_command())
            .await
            .expect("client end closed")
            .expect("frame did not decode");
        sent.push(command);
    }

    let methods: Vec<Method> = sent.iter().map(|c| c.method).collect();
    assert_eq!(
        methods,
        vec![
            Method::StopAcquisition,
            Method::EnumerateDevices,
            Method::StartAcquisition,
            Method::GetDeviceInfo,
        ]
    );
    assert_eq!(client.connection_state(), ConnectionState::Connected);

    let stop_params: DeviceParams = sent[0].parameters().unwrap().unwrap();
    assert_eq!(stop_params.device_id, "reader-2");
    assert!(sent[1].parameters.is_none());
    let start_params: AcquisitionParams = sent[2].parameters().unwrap().unwrap();
    assert_eq!(start_params.device_id, default_device_uid());
    assert_eq!(start_params.sample_type, SampleFormat::PngImage);
    let info_params: DeviceParams = sent[3].parameters().unwrap().unwrap();
    assert_eq!(info_params.device_id, "reader-1");

    // Nothing is answered; failing the channel settles everything.
    service.fail().await.expect("fail failed");
    for result in [within(stop).await.unwrap(), within(start).await.unwrap()] {
        assert!(matches!(result, Err(Error::CommunicationFailure)));
    }
    assert!(within(enumerate).await.unwrap().is_err());
    assert!(within(info).await.unwrap().is_err());
}

#[tokio::test]
async fn enumerate_devices_resolves_device_ids() {
    // ---
    let (client, mut service) = setup_connected().await;

    let call = tokio::spawn(client.enumerate_devices());
    let command = within(service.next_command()).await.unwrap().unwrap();
    assert_eq!(command.method, Method::EnumerateDevices);

    service
        .respond(
            Method::EnumerateDevices,
            0,
            Some(r#"{"DeviceCount":2,"DeviceIDs":"[\"A\",\"B\"]"}"#),
        )
        .await
        .unwrap();

    let devices = within(call).await.unwrap().expect("enumerate failed");
    assert_eq!(devices, vec!["A", "B"]);
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn get_device_info_resolves_description() {
    // ---
    let (client, mut service) = setup_connected().await;

    let call = tokio::spawn(client.get_device_info("A"));
    within(service.next_frame()).await.unwrap();

    service
        .respond(
            Method::GetDeviceInfo,
            0,
            Some(r#"{"DeviceID":"A","eUidType":0,"eDeviceModality":2,"eDeviceTech":1}"#),
        )
        .await
        .unwrap();

    let info = within(call).await.unwrap().expect("get_device_info failed");
    assert_eq!(info.id, "A");
    assert_eq!(info.uid_type, DeviceUidType::Persistent);
    assert_eq!(info.modality, DeviceModality::Area);
    assert_eq!(info.technology, DeviceTechnology::Optical);
}

#[tokio::test]
async fn failure_result_rejects_with_method_and_hex_code() {
    // ---
    let (client, mut service) = setup_connected().await;

    let call = tokio::spawn(client.stop_acquisition(None));
    within(service.next_frame()).await.unwrap();

    service
        .respond(Method::StopAcquisition, -2147467259, None)
        .await
        .unwrap();

    let err = within(call).await.unwrap().expect_err("call should fail");
    assert_eq!(err.to_string(), "StopAcquisition: 80004005");
}

#[tokio::test]
async fn result_code_boundaries() {
    // ---
    let (client, mut service) = setup_connected().await;

    let highest_success = tokio::spawn(client.start_acquisition(SampleFormat::Raw, None));
    within(service.next_frame()).await.unwrap();
    service
        .respond(Method::StartAcquisition, 0x7FFF_FFFF, None)
        .await
        .unwrap();
    assert!(within(highest_success).await.unwrap().is_ok());

    let lowest_failure = tokio::spawn(client.start_acquisition(SampleFormat::Raw, None));
    within(service.next_frame()).await.unwrap();
    service
        .respond(Method::StartAcquisition, 0x8000_0000, None)
        .await
        .unwrap();

    let err = within(lowest_failure)
        .await
        .unwrap()
        .expect_err("call should fail");
    assert_eq!(err.to_string(), "StartAcquisition: 80000000");
}

#[tokio::test]
async fn unsigned_failure_result_is_rejected() {
    // ---
    let (client, mut service) = setup_connected().await;

    let call = tokio::spawn(client.start_acquisition(SampleFormat::Raw, None));
    within(service.next_frame()).await.unwrap();

    service
        .respond(Method::StartAcquisition, 0x8000_4005, None)
        .await
        .unwrap();

    let err = within(call).await.unwrap().expect_err("call should fail");
    assert_eq!(err.to_string(), "StartAcquisition: 80004005");
}

#[tokio::test]
async fn responses_settle_same_method_calls_in_order() {
    // ---
    let (client, mut service) = setup_connected().await;

    let first = tokio::spawn(client.start_acquisition(SampleFormat::Raw, Some("A")));
    let other = tokio::spawn(client.stop_acquisition(Some("B")));
    let second = tokio::spawn(client.start_acquisition(SampleFormat::Raw, Some("C")));
    for _ in 0..3 {
        within(service.next_frame()).await.unwrap();
    }

    service
        .respond(Method::StartAcquisition, 0, None)
        .await
        .unwrap();
    service
        .respond(Method::StartAcquisition, -1, None)
        .await
        .unwrap();

    assert!(within(first).await.unwrap().is_ok());
    assert!(matches!(
        within(second).await.unwrap(),
        Err(Error::MethodFailed {
            method: Method::StartAcquisition,
            code: 0xffff_ffff,
        })
    ));
    assert!(!other.is_finished());
    assert_eq!(client.pending_requests(), 1);
}

#[tokio::test]
async fn response_before_send_is_dropped() {
    // ---
    let (client, mut service) = setup(ClientConfig::default()).await;

    let call = tokio::spawn(client.enumerate_devices());

    // Not sent yet, so this must not settle the call.
    service
        .respond(Method::EnumerateDevices, 0, Some(r#"{"DeviceCount":0,"DeviceIDs":"[]"}"#))
        .await
        .unwrap();
    service.accept().await.unwrap();
    within(service.next_frame()).await.unwrap();
    assert_eq!(client.pending_requests(), 1);

    service
        .respond(
            Method::EnumerateDevices,
            0,
            Some(r#"{"DeviceCount":1,"DeviceIDs":"[\"late\"]"}"#),
        )
        .await
        .unwrap();

    assert_eq!(within(call).await.unwrap().unwrap(), vec!["late"]);
}

#[tokio::test]
async fn connection_failure_rejects_all_and_emits_once() {
    // ---
    // Arrange
    // ---
    let (client, service) = setup(ClientConfig::default()).await;

    let failures = Arc::new(AtomicUsize::new(0));
    let counter = failures.clone();
    client.on(
        EventKind::CommunicationFailed,
        EventHandler::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let enumerate = tokio::spawn(client.enumerate_devices());
    let start = tokio::spawn(client.start_acquisition(SampleFormat::Raw, None));

    // ---
    // Act
    // ---
    service.fail().await.unwrap();

    // ---
    // Assert
    // ---
    let err = within(enumerate).await.unwrap().expect_err("should fail");
    assert_eq!(err.to_string(), "Communication failure.");
    assert!(matches!(
        within(start).await.unwrap(),
        Err(Error::CommunicationFailure)
    ));

    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(client.pending_requests(), 0);
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn new_call_after_failure_reconnects() {
    // ---
    let (client, mut service) = setup(ClientConfig::default()).await;

    let doomed = tokio::spawn(client.stop_acquisition(None));
    service.fail().await.unwrap();
    assert!(within(doomed).await.unwrap().is_err());

    let retry = tokio::spawn(client.stop_acquisition(None));
    assert_eq!(service.connect_attempts(), 2);

    service.accept().await.unwrap();
    within(service.next_frame()).await.unwrap();
    service
        .respond(Method::StopAcquisition, 0, None)
        .await
        .unwrap();

    assert!(within(retry).await.unwrap().is_ok());
}

#[tokio::test]
async fn send_failure_counts_as_communication_failure() {
    // ---
    let (client, service) = setup_connected().await;

    let failures = Arc::new(AtomicUsize::new(0));
    let counter = failures.clone();
    client.on(
        EventKind::CommunicationFailed,
        EventHandler::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    // Service end gone: the channel connects but cannot deliver frames.
    drop(service);

    let err = within(client.enumerate_devices())
        .await
        .expect_err("call should fail");
    assert!(matches!(err, Error::CommunicationFailure));
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn notification_reaches_primary_then_subscribers() {
    // ---
    let (client, service) = setup(ClientConfig::default()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    client
        .on(EventKind::DeviceConnected, forward(&tx, "first"))
        .on(EventKind::DeviceConnected, forward(&tx, "second"));
    client.set_handler(EventKind::DeviceConnected, Some(forward(&tx, "primary")));

    service
        .notify(NotificationKind::Connected, "X", None)
        .await
        .unwrap();

    let expected = Event::DeviceConnected {
        device_uid: "X".into(),
    };
    for tag in ["primary", "first", "second"] {
        let (seen, event) = within(rx.recv()).await.unwrap();
        assert_eq!(seen, tag);
        assert_eq!(event, expected);
    }
}

#[tokio::test]
async fn off_kind_keeps_primary_handler() {
    // ---
    let (client, service) = setup(ClientConfig::default()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    client.set_handler(EventKind::SamplesAcquired, Some(forward(&tx, "primary")));
    client
        .on(EventKind::SamplesAcquired, forward(&tx, "extra"))
        .on(EventKind::DeviceDisconnected, forward(&tx, "other"));

    client.off(Some(EventKind::SamplesAcquired), None);

    service
        .notify(
            NotificationKind::Completed,
            "X",
            Some(r#"{"SampleFormat":5,"Samples":"[\"iVBOR\"]"}"#),
        )
        .await
        .unwrap();
    service
        .notify(NotificationKind::Disconnected, "X", None)
        .await
        .unwrap();

    let (tag, event) = within(rx.recv()).await.unwrap();
    assert_eq!(tag, "primary");
    assert_eq!(event.sample_list().unwrap(), vec!["iVBOR"]);
    assert!(matches!(
        event,
        Event::SamplesAcquired {
            sample_format: SampleFormat::PngImage,
            ..
        }
    ));

    let (tag, event) = within(rx.recv()).await.unwrap();
    assert_eq!(tag, "other");
    assert_eq!(event.kind(), EventKind::DeviceDisconnected);
}

#[tokio::test]
async fn each_notification_kind_maps_to_its_event() {
    // ---
    let (client, service) = setup(ClientConfig::default()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    for kind in EventKind::ALL {
        client.on(kind, forward(&tx, kind.name()));
    }

    service
        .notify(NotificationKind::Quality, "X", Some(r#"{"Quality":1}"#))
        .await
        .unwrap();
    service
        .notify(NotificationKind::Error, "X", Some(r#"{"uError":5}"#))
        .await
        .unwrap();
    service.notify(NotificationKind::Started, "X", None).await.unwrap();
    service.notify(NotificationKind::Stopped, "X", None).await.unwrap();

    let (_, quality) = within(rx.recv()).await.unwrap();
    assert_eq!(
        quality,
        Event::QualityReported {
            device_uid: "X".into(),
            quality: QualityCode::NoImage,
        }
    );
    let (_, error) = within(rx.recv()).await.unwrap();
    assert_eq!(
        error,
        Event::ErrorOccurred {
            device_uid: "X".into(),
            error: 5,
        }
    );
    let (tag, _) = within(rx.recv()).await.unwrap();
    assert_eq!(tag, "AcquisitionStarted");
    let (tag, _) = within(rx.recv()).await.unwrap();
    assert_eq!(tag, "AcquisitionStopped");
}

#[tokio::test]
async fn unlisted_payload_codes_still_reach_handlers() {
    // ---
    let (client, service) = setup(ClientConfig::default()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    client
        .on(EventKind::SamplesAcquired, forward(&tx, "samples"))
        .on(EventKind::QualityReported, forward(&tx, "quality"));

    service
        .notify(
            NotificationKind::Completed,
            "X",
            Some(r#"{"SampleFormat":4,"Samples":"[\"AAA\"]"}"#),
        )
        .await
        .unwrap();
    service
        .notify(NotificationKind::Quality, "X", Some(r#"{"Quality":25}"#))
        .await
        .unwrap();

    let (tag, event) = within(rx.recv()).await.unwrap();
    assert_eq!(tag, "samples");
    assert_eq!(
        event,
        Event::SamplesAcquired {
            device_uid: "X".into(),
            sample_format: SampleFormat::Other(4),
            samples: r#"["AAA"]"#.into(),
        }
    );

    let (tag, event) = within(rx.recv()).await.unwrap();
    assert_eq!(tag, "quality");
    assert_eq!(
        event,
        Event::QualityReported {
            device_uid: "X".into(),
            quality: QualityCode::Other(25),
        }
    );
}

#[tokio::test]
async fn get_device_info_keeps_unlisted_codes() {
    // ---
    let (client, mut service) = setup_connected().await;

    let call = tokio::spawn(client.get_device_info("A"));
    within(service.next_frame()).await.unwrap();
    service
        .respond(
            Method::GetDeviceInfo,
            0,
            Some(r#"{"DeviceID":"A","eUidType":1,"eDeviceModality":6,"eDeviceTech":9}"#),
        )
        .await
        .unwrap();

    let info = within(call).await.unwrap().expect("get_device_info failed");
    assert_eq!(info.uid_type, DeviceUidType::Volatile);
    assert_eq!(info.modality, DeviceModality::Other(6));
    assert_eq!(info.technology, DeviceTechnology::Other(9));
}

#[tokio::test]
async fn bad_frames_do_not_stop_the_client() {
    // ---
    let (client, mut service) = setup_connected().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on(EventKind::DeviceConnected, forward(&tx, "seen"));

    service.push_frame("!!! not base64 !!!").await.unwrap();
    // Completed without its payload.
    service
        .notify(NotificationKind::Completed, "X", None)
        .await
        .unwrap();
    // Unknown event and method codes.
    service.push_frame(unknown_notification_frame()).await.unwrap();
    service.push_frame(unknown_response_frame()).await.unwrap();

    service
        .notify(NotificationKind::Connected, "Y", None)
        .await
        .unwrap();
    let (_, event) = within(rx.recv()).await.unwrap();
    assert_eq!(event.device_uid(), Some("Y"));

    let call = tokio::spawn(client.stop_acquisition(None));
    within(service.next_frame()).await.unwrap();
    service
        .respond(Method::StopAcquisition, 0, None)
        .await
        .unwrap();
    assert!(within(call).await.unwrap().is_ok());
}

#[tokio::test]
async fn panicking_handler_does_not_block_others() {
    // ---
    let (client, service) = setup(ClientConfig::default()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    client.set_handler(
        EventKind::AcquisitionStarted,
        Some(EventHandler::new(|_| panic!("primary handler failed"))),
    );
    client
        .on(
            EventKind::AcquisitionStarted,
            EventHandler::new(|_| panic!("subscriber failed")),
        )
        .on(EventKind::AcquisitionStarted, forward(&tx, "survivor"));

    service.notify(NotificationKind::Started, "X", None).await.unwrap();
    service.notify(NotificationKind::Started, "Y", None).await.unwrap();

    let (tag, event) = within(rx.recv()).await.unwrap();
    assert_eq!(tag, "survivor");
    assert_eq!(event.device_uid(), Some("X"));
    let (_, event) = within(rx.recv()).await.unwrap();
    assert_eq!(event.device_uid(), Some("Y"));
}

#[tokio::test]
async fn handler_may_call_back_into_client() {
    // ---
    let (client, service) = setup(ClientConfig::default()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let hits = Arc::new(Mutex::new(0));
    let hits_in_handler = hits.clone();
    let reentrant = client.clone();
    let once = EventHandler::new(move |_| {
        *hits_in_handler.lock().unwrap() += 1;
        reentrant.off(Some(EventKind::DeviceDisconnected), None);
    });
    client
        .on(EventKind::DeviceDisconnected, once)
        .on(EventKind::AcquisitionStopped, forward(&tx, "marker"));

    service
        .notify(NotificationKind::Disconnected, "X", None)
        .await
        .unwrap();
    service
        .notify(NotificationKind::Disconnected, "X", None)
        .await
        .unwrap();
    service.notify(NotificationKind::Stopped, "X", None).await.unwrap();

    within(rx.recv()).await.unwrap();
    assert_eq!(*hits.lock().unwrap(), 1);
}

#[tokio::test]
async fn request_timeout_removes_pending_entry() {
    // ---
    let config = ClientConfig::new().with_request_timeout(Duration::from_millis(50));
    let (client, mut service) = setup(config).await;
    service.set_auto_accept(true);

    let call = client.enumerate_devices();
    within(service.next_frame()).await.unwrap();
    assert_eq!(client.pending_requests(), 1);

    let err = within(call).await.expect_err("call should time out");
    assert!(matches!(err, Error::Timeout));
    assert_eq!(client.pending_requests(), 0);

    // A late answer finds nothing to settle.
    service
        .respond(Method::EnumerateDevices, 0, Some(r#"{"DeviceCount":0,"DeviceIDs":"[]"}"#))
        .await
        .unwrap();
}

#[tokio::test]
async fn late_answer_to_timed_out_call_is_not_reused() {
    // ---
    // Arrange
    // ---
    let config = ClientConfig::new().with_request_timeout(Duration::from_millis(100));
    let (client, mut service) = setup(config).await;
    service.set_auto_accept(true);

    let first = client.enumerate_devices();
    within(service.next_frame()).await.unwrap();
    assert!(matches!(within(first).await, Err(Error::Timeout)));

    let second = tokio::spawn(client.enumerate_devices());
    within(service.next_frame()).await.unwrap();

    // ---
    // Act
    // ---
    service
        .respond(
            Method::EnumerateDevices,
            0,
            Some(r#"{"DeviceCount":1,"DeviceIDs":"[\"stale\"]"}"#),
        )
        .await
        .unwrap();
    service
        .respond(
            Method::EnumerateDevices,
            0,
            Some(r#"{"DeviceCount":1,"DeviceIDs":"[\"fresh\"]"}"#),
        )
        .await
        .unwrap();

    // ---
    // Assert
    // ---
    assert_eq!(within(second).await.unwrap().unwrap(), vec!["fresh"]);
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn close_rejects_pending_calls() {
    // ---
    let (client, _service) = setup(ClientConfig::default()).await;

    let call = tokio::spawn(client.get_device_info("A"));
    client.close().await.expect("close failed");

    assert!(matches!(
        within(call).await.unwrap(),
        Err(Error::CommunicationFailure)
    ));
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
}

fn unknown_notification_frame() -> String {
    // ---
    use fingerprint_rpc::protocol::{Envelope, Notification};

    let notification = Notification {
        event: 99,
        device: "X".into(),
        data: None,
    };
    Envelope::notification(&notification)
        .unwrap()
        .encode()
        .unwrap()
}

fn unknown_response_frame() -> String {
    // ---
    use fingerprint_rpc::protocol::{Envelope, Response};

    let response = Response {
        method: 42,
        result: 0,
        data: None,
    };
    Envelope::response(&response).unwrap().encode().unwrap()
}
