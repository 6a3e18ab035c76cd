//! Fingerprint capture example using the in-memory channel.
//!
//! Runs the client against a simulated reader service in the same process:
//! enumerate readers, describe the first one, capture a sample, stop.
//!
//! Run with: RUST_LOG=debug cargo run --example capture_memory

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::panic_in_result_fn
)]

use std::time::Duration;

use fingerprint_rpc::protocol::{AcquisitionParams, DeviceParams, Method, NotificationKind};
use fingerprint_rpc::{
    create_memory_channel, ClientConfig, Event, EventHandler, EventKind, FingerprintClient,
    MemoryService, Result, SampleFormat,
};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt as tracing_format, EnvFilter};

const READER: &str = "{7A2B7A4E-8F3C-4D2A-9B1E-5C6D7E8F9A0B}";

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_format()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_line_number(true)
        .init();

    let config = ClientConfig::default().with_request_timeout(Duration::from_secs(5));
    let (channel, service) = create_memory_channel(&config);
    service.set_auto_accept(true);

    // Spawn the simulated service so the main task can act as the client
    let _service = tokio::spawn(simulate_reader(service));

    let client = FingerprintClient::with_channel(channel, config).await?;

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    client.set_handler(
        EventKind::SamplesAcquired,
        Some(EventHandler::new(move |event| {
            let samples = event.sample_list().unwrap_or_default();
            println!("captured {} sample(s) on {:?}", samples.len(), event.device_uid());
            let _ = done_tx.send(());
        })),
    );
    client
        .on(
            EventKind::QualityReported,
            EventHandler::new(|event| {
                if let Event::QualityReported { quality, .. } = event {
                    println!("quality: {quality:?}");
                }
            }),
        )
        .on(
            EventKind::CommunicationFailed,
            EventHandler::new(|_| eprintln!("lost the reader service")),
        );

    let readers = client.enumerate_devices().await?;
    println!("readers: {readers:?}");

    let reader = readers.first().map(String::as_str);
    if let Some(id) = reader {
        let info = client.get_device_info(id).await?;
        println!("{id}: {:?} / {:?}", info.modality, info.technology);
    }

    client.start_acquisition(SampleFormat::PngImage, reader).await?;
    let _ = done_rx.recv().await;
    client.stop_acquisition(reader).await?;

    client.close().await?;
    Ok(())
}

/// Answer every command the way a single-reader service would.
async fn simulate_reader(mut service: MemoryService) -> Result<()> {
    // ---
    while let Some(command) = service.next_command().await {
        let command = command?;

        match command.method {
            Method::EnumerateDevices => {
                let data = format!(r#"{{"DeviceCount":1,"DeviceIDs":"[\"{READER}\"]"}}"#);
                service
                    .respond(Method::EnumerateDevices, 0, Some(&data))
                    .await?;
            }
            Method::GetDeviceInfo => {
                let params: DeviceParams = command.parameters()?.expect("device params");
                let data = format!(
                    r#"{{"DeviceID":"{}","eUidType":0,"eDeviceModality":2,"eDeviceTech":1}}"#,
                    params.device_id
                );
                service.respond(Method::GetDeviceInfo, 0, Some(&data)).await?;
            }
            Method::StartAcquisition => {
                let params: AcquisitionParams = command.parameters()?.expect("acquisition params");
                let device = params.device_id.as_str();

                service.respond(Method::StartAcquisition, 0, None).await?;
                service.notify(NotificationKind::Started, device, None).await?;
                service
                    .notify(NotificationKind::Quality, device, Some(r#"{"Quality":0}"#))
                    .await?;

                let completed = format!(
                    r#"{{"SampleFormat":{},"Samples":"[\"iVBORw0KGgo\"]"}}"#,
                    params.sample_type.code()
                );
                service
                    .notify(NotificationKind::Completed, device, Some(&completed))
                    .await?;
            }
            Method::StopAcquisition => {
                let params: DeviceParams = command.parameters()?.expect("device params");
                service.respond(Method::StopAcquisition, 0, None).await?;
                service
                    .notify(NotificationKind::Stopped, &params.device_id, None)
                    .await?;
            }
        }
    }

    Ok(())
}
