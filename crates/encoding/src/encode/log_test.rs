//! Tests for LogEntry / LogData encoding

use crate::encode::{encode_log_data_into, encode_log_entry_into, LogEntryParams};
use crate::reader::{read_log_data, FlatTable};
use crate::{LogEventType, LogLevel};

#[test]
fn log_entry_vtable_layout() {
    let params = LogEntryParams {
        level: LogLevel::Error,
        timestamp: 99,
        ..Default::default()
    };

    let mut buf = Vec::new();
    encode_log_entry_into(&mut buf, &params);

    assert_eq!(u16::from_le_bytes([buf[4], buf[5]]), 18); // vtable size
    assert_eq!(u16::from_le_bytes([buf[6], buf[7]]), 32); // inline table size
    assert_eq!(u16::from_le_bytes([buf[8], buf[9]]), 28); // event_type slot
    assert_eq!(u16::from_le_bytes([buf[10], buf[11]]), 0); // session_id absent
    assert_eq!(u16::from_le_bytes([buf[12], buf[13]]), 29); // level slot
    assert_eq!(u16::from_le_bytes([buf[14], buf[15]]), 20); // timestamp slot
}

#[test]
fn log_entry_roundtrip_all_fields() {
    let session_id = [0x5A; 16];
    let payload = br#"{"message":"DB down","retries":3}"#;
    let params = LogEntryParams {
        event_type: LogEventType::Log,
        session_id: Some(&session_id),
        level: LogLevel::Error,
        timestamp: 1_706_000_123_456,
        source: Some("web-01.prod"),
        service: Some("api"),
        payload,
    };

    let mut buf = Vec::new();
    encode_log_entry_into(&mut buf, &params);

    let table = FlatTable::parse_root(&buf).expect("parse encoded log entry");
    assert_eq!(table.read_u8(0, 0), LogEventType::Log.as_u8());
    assert_eq!(
        table.read_fixed_bytes::<16>(1, "session_id").unwrap(),
        Some(&session_id)
    );
    assert_eq!(table.read_u8(2, 0), LogLevel::Error.as_u8());
    assert_eq!(table.read_u64(3, 0), 1_706_000_123_456);
    assert_eq!(table.read_string(4).unwrap(), Some("web-01.prod"));
    assert_eq!(table.read_string(5).unwrap(), Some("api"));
    assert_eq!(table.read_bytes(6).unwrap(), Some(payload.as_slice()));
}

#[test]
fn log_data_roundtrip_preserves_order_and_levels() {
    let session_id = [0x11; 16];
    let levels = [
        LogLevel::Emergency,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Trace,
    ];

    let params: Vec<LogEntryParams<'_>> = levels
        .iter()
        .map(|&level| LogEntryParams {
            level,
            timestamp: 1,
            session_id: Some(&session_id),
            service: Some("app"),
            payload: br#"{"message":"m"}"#,
            ..Default::default()
        })
        .collect();

    let mut buf = Vec::new();
    encode_log_data_into(&mut buf, &params);

    let logs = read_log_data(&buf).expect("parse LogData");
    assert_eq!(logs.len(), 4);
    for (log, &level) in logs.iter().zip(levels.iter()) {
        assert_eq!(log.level, level);
        assert_eq!(log.service, Some("app"));
        assert_eq!(log.session_id, Some(&session_id));
    }
}

#[test]
fn every_severity_survives_the_wire() {
    for raw in 0u8..=8 {
        let level = LogLevel::from_u8(raw);
        let params = LogEntryParams {
            level,
            timestamp: 1,
            ..Default::default()
        };

        let mut buf = Vec::new();
        encode_log_data_into(&mut buf, &[params]);

        let logs = read_log_data(&buf).unwrap();
        assert_eq!(logs[0].level.as_u8(), raw);
    }
}

#[test]
fn absent_optionals_read_back_as_none() {
    let params = LogEntryParams {
        level: LogLevel::Info,
        timestamp: 3,
        ..Default::default()
    };

    let mut buf = Vec::new();
    encode_log_data_into(&mut buf, &[params]);

    let logs = read_log_data(&buf).unwrap();
    assert_eq!(logs[0].session_id, None);
    assert_eq!(logs[0].source, None);
    assert_eq!(logs[0].service, None);
    assert_eq!(logs[0].payload, b"");
}
