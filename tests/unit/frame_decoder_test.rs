//! Tests for receiver frame decoding.

use super::receiver_mock::MockTrackerFrame;
use slimebridge::receiver::frame::{battery_pct_from_code, decode_frame, FrameKind, MIN_FRAME_LEN};
use slimebridge::receiver::SensorReading;

#[test]
fn test_decode_reference_frame() {
    let frame = [
        0x00, 0xFF, 0x7F, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    match decode_frame(&frame) {
        Some(SensorReading::Orientation { tracker_id, data }) => {
            assert_eq!(tracker_id, 0);
            assert!((data.quaternion[0] - 0.99997).abs() < 0.00001);
            assert_eq!(data.quaternion[1], 0.0);
            assert_eq!(data.quaternion[2], 0.0);
            assert_eq!(data.quaternion[3], 0.0);
            assert_eq!(data.accel_z, 0.0);
            assert_eq!(data.battery_pct, 0);
        }
        other => panic!("Unexpected decode result: {:?}", other),
    }
}

#[test]
fn test_too_short_frame() {
    assert!(decode_frame(&[0u8; 8]).is_none());
    assert!(decode_frame(&[0u8; MIN_FRAME_LEN - 1]).is_none());
    assert!(decode_frame(&[0u8; MIN_FRAME_LEN]).is_some());
}

#[test]
fn test_header_round_trip() {
    for header in 0u8..=0xBF {
        let mut frame = [0u8; 12];
        frame[0] = header;

        let reading = decode_frame(&frame).unwrap();
        assert_eq!(reading.header_byte(), header);
        assert_eq!(reading.tracker_id(), header & 0x3F);
    }
}

#[test]
fn test_reserved_kind_rejected() {
    for header in 0xC0u8..=0xFF {
        let mut frame = [0u8; 12];
        frame[0] = header;
        assert!(decode_frame(&frame).is_none());
    }
}

#[test]
fn test_kind_selectors() {
    let mock = MockTrackerFrame {
        tracker_id: 17,
        ..Default::default()
    };

    assert_eq!(
        decode_frame(&mock.orientation()).unwrap().kind(),
        FrameKind::Orientation
    );
    assert_eq!(
        decode_frame(&mock.device_info()),
        Some(SensorReading::DeviceInfo { tracker_id: 17 })
    );
    assert_eq!(
        decode_frame(&mock.status()),
        Some(SensorReading::Status { tracker_id: 17 })
    );
}

#[test]
fn test_quaternion_extremes() {
    let mock = MockTrackerFrame {
        tracker_id: 63,
        quaternion: [i16::MIN, i16::MAX, -16384, 16384],
        ..Default::default()
    };

    let Some(SensorReading::Orientation { tracker_id, data }) = decode_frame(&mock.orientation())
    else {
        panic!("Expected orientation reading");
    };

    assert_eq!(tracker_id, 63);
    assert_eq!(data.quaternion[0], -1.0);
    assert_eq!(data.quaternion[1], 32767.0 / 32768.0);
    assert_eq!(data.quaternion[2], -0.5);
    assert_eq!(data.quaternion[3], 0.5);
    assert!(data.quaternion.iter().all(|q| (-1.0..1.0).contains(q)));
}

#[test]
fn test_accel_and_battery_fields() {
    let mock = MockTrackerFrame {
        accel_mg: -981,
        battery_code: 9,
        ..Default::default()
    };

    let Some(SensorReading::Orientation { data, .. }) = decode_frame(&mock.orientation()) else {
        panic!("Expected orientation reading");
    };

    assert!((data.accel_z + 0.981).abs() < 1e-6);
    assert_eq!(data.battery_pct, 60);
}

#[test]
fn test_battery_scaling_monotonic() {
    let levels: Vec<u8> = (0..=15).map(battery_pct_from_code).collect();

    assert_eq!(levels[0], 0);
    assert_eq!(levels[15], 100);
    assert!(levels.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_trailing_byte_not_validated() {
    let mut frame = MockTrackerFrame::default().orientation();
    frame[11] = 0xA5;
    assert!(decode_frame(&frame).is_some());
}
