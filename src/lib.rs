//! Cadence-partitioned RF sample archive writer.
//!
//! Streams of fixed-rate, multi-subchannel (optionally complex) samples are
//! persisted into a directory/file hierarchy laid out by two independent
//! time cadences: a coarse subdirectory period in seconds and a fine file
//! period in milliseconds. Sample indexes convert to calendar time through
//! exact rational arithmetic, so placement never drifts no matter how long
//! a capture runs.
//!
//! # Example
//!
//! ```no_run
//! use rfvault::{store, ByteOrder, ElementKind, SessionConfig, WriteSession};
//!
//! store::runtime::init();
//! # let samples = vec![0u8; 4000];
//! let mut session = WriteSession::create(SessionConfig {
//!     directory: "./ch0".into(),
//!     byte_order: ByteOrder::Little,
//!     kind: ElementKind::SignedInt,
//!     byte_width: 2,
//!     subdir_cadence_secs: 3600,
//!     file_cadence_millis: 1000,
//!     start_global_index: 0,
//!     sample_rate_numerator: 1_000_000,
//!     sample_rate_denominator: 1,
//!     uuid: "123e4567-e89b-12d3-a456-426614174000".into(),
//!     compression_level: 0,
//!     checksum: true,
//!     is_complex: true,
//!     num_subchannels: 1,
//!     is_continuous: true,
//!     marching_periods: false,
//! })?;
//! session.write_continuous(&samples, 0)?;
//! session.close()?;
//! store::runtime::shutdown();
//! # Ok::<(), rfvault::Error>(())
//! ```

pub mod cadence;
pub mod clock;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod session;
pub mod store;

pub use cadence::{CadencePlan, FileSlot, SampleSpan};
pub use clock::{calendar_to_index, index_to_calendar, sample_index_to_calendar, CalendarTime, SampleRate};
pub use dtype::{ByteOrder, ElementKind, SampleType};
pub use error::{Error, Result};
pub use layout::ChannelLayout;
pub use session::{ChannelProperties, SessionConfig, WriteSession};
pub use store::{FileStore, PersistRequest, SampleStore, StoreConfig};
