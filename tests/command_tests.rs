//! Tests for the configuration command set against a mock charger.

use ultramat_rs::protocol::command::{encode_words, ConfigBlock, NAME_LEN};
use ultramat_rs::protocol::frame::build_frame;
use ultramat_rs::protocol::serial_mock::{MockSerialPort, Response};
use ultramat_rs::{read_user_name, ConfigClient, StreamTransport, UltramatError, RESET, RESET_CONFIG};

fn client() -> (MockSerialPort, ConfigClient<StreamTransport<MockSerialPort>>) {
    let port = MockSerialPort::new();
    let client = ConfigClient::new(StreamTransport::new(port.clone()));
    (port, client)
}

#[test]
fn test_read_commands_for_every_block() {
    for (n, block) in ConfigBlock::ALL.iter().enumerate() {
        let command = block.read_command(0);
        assert_eq!(command.len(), 10);
        assert_eq!(command[1], b'8');
        assert_eq!(command[2], b'0' + n as u8);
        assert_eq!(&command[3..5], b"00");
    }
    assert_eq!(ConfigBlock::MemorySetup.read_command(0x27), build_frame(b"8127"));
}

#[tokio::test]
async fn test_config_session_brackets() {
    let (port, mut client) = client();
    client.begin_config().await.unwrap();
    client.end_config().await.unwrap();

    let mut expected = RESET_CONFIG.to_vec();
    expected.extend_from_slice(&RESET);
    assert_eq!(port.get_tx_data(), expected);
}

#[tokio::test]
async fn test_read_user_name() {
    let (port, mut client) = client();
    port.queue_response(Response::Answer(b"Graupner Tester ".to_vec()));

    assert_eq!(client.read_user_name().await.unwrap(), "Graupner Tester");
    assert_eq!(port.get_tx_data(), build_frame(b"8802"));
}

#[tokio::test]
async fn test_read_memory_setup_words() {
    let (port, mut client) = client();
    let words: Vec<u16> = (0..28).map(|n| n * 0x0101).collect();
    port.queue_response(Response::Answer(encode_words(&words)));

    let setup = client.read_memory_setup(5).await.unwrap();
    assert_eq!(setup.words, words);
    assert_eq!(setup.raw.len(), 28 * 4);
    assert_eq!(port.get_tx_data(), build_frame(b"8105"));
}

#[tokio::test]
async fn test_channel_setup_sizes() {
    let (port, mut client) = client();
    port.queue_response(Response::Answer(encode_words(&[1, 2, 3, 4])));
    let setup = client.read_channel_setup(2).await.unwrap();
    assert_eq!(setup.words, vec![1, 2, 3, 4]);

    assert!(matches!(
        client.read_channel_setup(3).await,
        Err(UltramatError::Config(_))
    ));
}

#[tokio::test]
async fn test_rejected_answer_is_requested_again() {
    let (port, mut client) = client();
    let mut bad = build_frame(b"LiPo 4S 5000    ");
    bad[3] = b'X';
    bad.push(0x06);
    port.queue_response(Response::Raw(bad));
    port.queue_response(Response::Answer(b"LiPo 4S 5000    ".to_vec()));

    assert_eq!(client.read_memory_name(1).await.unwrap(), "LiPo 4S 5000");
    assert_eq!(client.transfer_errors(), 1);

    let command = build_frame(b"8001");
    assert_eq!(port.get_tx_data(), [command.clone(), command].concat());
}

#[tokio::test]
async fn test_write_memory_name() {
    let (port, mut client) = client();
    port.queue_response(Response::Ack);
    client.write_memory_name(12, "NiMH 7").await.unwrap();

    let tx = port.get_tx_data();
    assert_eq!(&tx[1..5], b"000C");
    assert_eq!(&tx[5..5 + NAME_LEN], b"NiMH 7          ");
}

#[tokio::test]
async fn test_nak_rejects_write() {
    let (port, mut client) = client();
    port.queue_response(Response::Nak);
    assert!(matches!(
        client.write_user_name("Bench").await,
        Err(UltramatError::ConfigWriteRejected(_))
    ));
}

#[tokio::test]
async fn test_invalid_names_and_memories() {
    let (port, mut client) = client();
    assert!(client.write_user_name("a name that is far too long").await.is_err());
    assert!(client.write_user_name("Grüße").await.is_err());
    assert!(client.read_memory_name(0).await.is_err());
    assert!(client.read_memory_setup(41).await.is_err());
    assert!(port.get_tx_data().is_empty());
}

#[tokio::test]
async fn test_read_user_name_helper() {
    let port = MockSerialPort::new();
    port.queue_response(Response::Answer(b"Workshop\0\0\0\0\0\0\0\0".to_vec()));

    let name = read_user_name(StreamTransport::new(port.clone())).await.unwrap();
    assert_eq!(name, "Workshop");

    let tx = port.get_tx_data();
    assert!(tx.starts_with(&RESET_CONFIG));
    assert!(tx.ends_with(&RESET));
}
