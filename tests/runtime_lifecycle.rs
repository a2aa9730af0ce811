use rfvault::store::runtime;
use rfvault::{ByteOrder, ElementKind, Error, SessionConfig, WriteSession};
use tempfile::tempdir;

// Single test so nothing races the process-wide runtime flag.
#[test]
fn sessions_require_an_initialized_runtime() {
    let dir = tempdir().expect("tempdir");
    let config = SessionConfig {
        directory: dir.path().join("ch0"),
        byte_order: ByteOrder::Little,
        kind: ElementKind::SignedInt,
        byte_width: 2,
        subdir_cadence_secs: 1,
        file_cadence_millis: 1000,
        start_global_index: 0,
        sample_rate_numerator: 1000,
        sample_rate_denominator: 1,
        uuid: "123e4567-e89b-12d3-a456-426614174000".to_string(),
        compression_level: 0,
        checksum: false,
        is_complex: false,
        num_subchannels: 1,
        is_continuous: true,
        marching_periods: false,
    };

    assert!(!runtime::is_initialized());
    let err = WriteSession::create(config.clone()).expect_err("no runtime");
    assert!(matches!(err, Error::Configuration(_)));

    runtime::init();
    let mut session = WriteSession::create(config.clone()).expect("session");
    session.write_continuous(&[0u8; 2], 0).expect("write");
    session.close().expect("close");

    runtime::shutdown();
    let err = WriteSession::create(config).expect_err("runtime down");
    assert!(matches!(err, Error::Configuration(_)));
}
