//! Tests for the crate-level convenience functions.

use ultramat_rs::protocol::serial_mock::MockSerialPort;
use ultramat_rs::{
    decode, disconnect, recv_frame, DeviceVariant, FrameBuilder, StreamTransport, Transport,
};

#[tokio::test]
async fn test_recv_frame_and_decode() {
    let variant = DeviceVariant::Ultramat16S;
    let frame = FrameBuilder::new(variant.layout())
        .mode(1, 1)
        .voltage(1, 25200)
        .current(1, 4000)
        .build();
    let port = MockSerialPort::new();
    port.queue_rx_data(&frame);
    let mut transport = StreamTransport::new(port);

    let received = recv_frame(&mut transport, variant).await.unwrap();
    assert_eq!(received.len(), 70);
    let points = decode(variant.layout(), 1, received.as_bytes());
    assert_eq!(points.values[3], 100800);

    disconnect(&mut transport).await.unwrap();
    assert!(!transport.is_connected());
    assert!(recv_frame(&mut transport, variant).await.is_err());
}

#[test]
fn test_variant_display_names() {
    let names: Vec<String> = DeviceVariant::ALL.iter().map(|v| v.to_string()).collect();
    assert_eq!(names.len(), 10);
    assert!(names.contains(&"Ultra Quick 70".to_string()));
    for name in &names {
        assert_eq!(&name.parse::<DeviceVariant>().unwrap().to_string(), name);
    }
}
