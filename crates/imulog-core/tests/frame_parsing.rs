use chrono::Utc;
use imulog_core::frame::{Channel, FrameError, FrameParser, CHANNEL_COUNT};

#[test]
fn test_valid_lines_keep_field_order() {
    let lines = [
        ("0,0,0,0,0,0,0", [0.0; CHANNEL_COUNT]),
        (
            "-1.5,2.25,9.81,-0.125,3,4e1,36.6",
            [-1.5, 2.25, 9.81, -0.125, 3.0, 40.0, 36.6],
        ),
        (
            "  10.0,20.0,30.0,40.0,50.0,60.0,70.0\r\n",
            [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0],
        ),
    ];

    for (line, expected) in lines {
        let sample = FrameParser::parse(line.as_bytes()).expect(line);
        assert_eq!(sample.values, expected, "line {line:?}");
        for channel in Channel::ALL {
            assert_eq!(sample.get(channel), expected[channel.index()]);
        }
    }
}

#[test]
fn test_every_wrong_field_count_is_rejected() {
    for count in (0..=12).filter(|&c| c != CHANNEL_COUNT) {
        let line = vec!["1.0"; count].join(",");
        let err = FrameParser::parse(line.as_bytes()).unwrap_err();
        assert!(err.is_malformed(), "{count} fields should be malformed");
    }
}

#[test]
fn test_every_empty_position_is_rejected() {
    for index in 0..CHANNEL_COUNT {
        let mut fields = vec!["1"; CHANNEL_COUNT];
        fields[index] = " ";
        let line = fields.join(",");
        assert_eq!(
            FrameParser::parse(line.as_bytes()),
            Err(FrameError::EmptyField { index })
        );
    }
}

#[test]
fn test_every_non_numeric_position_is_rejected() {
    for index in 0..CHANNEL_COUNT {
        let mut fields = vec!["1"; CHANNEL_COUNT];
        fields[index] = "1.2.3";
        let line = fields.join(",");
        assert!(matches!(
            FrameParser::parse(line.as_bytes()),
            Err(FrameError::NonNumeric { index: i, .. }) if i == index
        ));
    }
}

#[test]
fn test_decode_error_is_distinct_from_malformed() {
    let err = FrameParser::parse(&[0xC3, 0x28, b',', b'1']).unwrap_err();
    assert!(err.is_decode());
    assert!(!err.is_malformed());
}

#[test]
fn test_timestamp_taken_at_parse() {
    let before = Utc::now();
    let sample = FrameParser::parse(b"1,2,3,4,5,6,7").unwrap();
    let after = Utc::now();
    assert!(sample.captured_at >= before && sample.captured_at <= after);
}
