//! Channel write sessions.
//!
//! A [`WriteSession`] is the exclusively-owned handle bound to one channel:
//! configuration fixed at creation, a write-progress cursor, and the
//! identities of the last directory/file touched. Placement logic lives
//! here; byte persistence goes through the [`SampleStore`] boundary.
//!
//! Two write paths are offered:
//! - **continuous**: a dense vector starting at a given global index, split
//!   across file boundaries as needed;
//! - **block**: parallel global-index / block-offset arrays describing
//!   contiguous runs separated by declared gaps, each run persisted exactly
//!   like a continuous write.
//!
//! Writes for one channel must arrive in increasing global-index order; the
//! cursor only ever advances past file segments the backend has made
//! durable.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::cadence::CadencePlan;
use crate::clock::SampleRate;
use crate::dtype::{self, ByteOrder, ElementKind, SampleType};
use crate::error::{Error, Result};
use crate::layout::ChannelLayout;
use crate::store::{FileStore, PersistRequest, SampleStore, StoreConfig};

/// Channel properties format version.
const PROPERTIES_VERSION: u32 = 1;

/// Full session configuration. Every field is required; nothing can change
/// after the session is created.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Root path for this channel's output.
    pub directory: PathBuf,
    pub byte_order: ByteOrder,
    pub kind: ElementKind,
    pub byte_width: usize,
    /// Seconds of data per subdirectory.
    pub subdir_cadence_secs: u64,
    /// Milliseconds of data per file. Must evenly partition the
    /// subdirectory cadence.
    pub file_cadence_millis: u64,
    /// Global sample index of the session's time base.
    pub start_global_index: u64,
    pub sample_rate_numerator: u64,
    pub sample_rate_denominator: u64,
    /// Provenance identifier stamped into every file header.
    pub uuid: String,
    /// Deflate level 0-9; 0 stores raw bytes.
    pub compression_level: u32,
    pub checksum: bool,
    /// Samples are I/Q pairs.
    pub is_complex: bool,
    /// Parallel streams per sample; at least 1.
    pub num_subchannels: usize,
    /// Caller promises gap-free continuous writes; enables the continuity
    /// check on the continuous path.
    pub is_continuous: bool,
    /// Emit a progress log line per completed file segment.
    pub marching_periods: bool,
}

/// Per-channel metadata sidecar, written once at session creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelProperties {
    pub format_version: u32,
    pub uuid: String,
    pub sample_type: String,
    pub element_byte_width: usize,
    pub subdir_cadence_secs: u64,
    pub file_cadence_millis: u64,
    pub start_global_index: u64,
    pub sample_rate_numerator: u64,
    pub sample_rate_denominator: u64,
    pub is_complex: bool,
    pub num_subchannels: usize,
    pub compression_level: u32,
    pub checksum: bool,
}

/// Long-lived write handle for one channel.
#[derive(Debug)]
pub struct WriteSession<S: SampleStore = FileStore> {
    config: SessionConfig,
    sample_type: SampleType,
    bytes_per_sample: usize,
    plan: CadencePlan,
    layout: ChannelLayout,
    store: S,
    closed: bool,
    next_expected_index: u64,
    last_file_written: Option<PathBuf>,
    last_dir_written: Option<PathBuf>,
    last_write_epoch_secs: u64,
}

impl WriteSession<FileStore> {
    /// Create a session persisting through the built-in [`FileStore`].
    ///
    /// # Errors
    ///
    /// - `Error::UnsupportedType` for an unrecognized dtype triple.
    /// - `Error::Configuration` for bad cadence or shape parameters, or if
    ///   the storage runtime is not initialized.
    /// - `Error::Io` if the channel root cannot be created.
    pub fn create(config: SessionConfig) -> Result<Self> {
        let sample_type = dtype::resolve(config.byte_order, config.kind, config.byte_width)?;
        let store = FileStore::new(StoreConfig {
            dtype_code: sample_type.code(),
            uuid: config.uuid.clone(),
            compression_level: config.compression_level,
            checksum: config.checksum,
            is_complex: config.is_complex,
        })?;
        Self::create_with_store(config, store)
    }
}

impl<S: SampleStore> WriteSession<S> {
    /// Create a session persisting through a caller-supplied backend.
    pub fn create_with_store(config: SessionConfig, store: S) -> Result<Self> {
        let sample_type = dtype::resolve(config.byte_order, config.kind, config.byte_width)?;
        if config.num_subchannels == 0 {
            return Err(Error::Configuration("subchannel count must be at least 1"));
        }
        if config.compression_level > 9 {
            return Err(Error::Configuration("compression level outside 0..=9"));
        }
        let rate = SampleRate::new(config.sample_rate_numerator, config.sample_rate_denominator)?;
        let plan = CadencePlan::new(config.subdir_cadence_secs, config.file_cadence_millis, rate)?;

        let layout = ChannelLayout::new(&config.directory);
        std::fs::create_dir_all(layout.root())?;
        write_properties_if_missing(&layout.properties_path(), &config, sample_type)?;

        let scalars_per_sample = config.num_subchannels * if config.is_complex { 2 } else { 1 };
        let next_expected_index = config.start_global_index;
        Ok(Self {
            bytes_per_sample: sample_type.byte_width() * scalars_per_sample,
            sample_type,
            plan,
            layout,
            store,
            closed: false,
            next_expected_index,
            last_file_written: None,
            last_dir_written: None,
            last_write_epoch_secs: 0,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    /// Bytes per sample: element width times subchannels, doubled for
    /// complex data.
    pub fn bytes_per_sample(&self) -> usize {
        self.bytes_per_sample
    }

    /// Smallest global index not yet written.
    pub fn next_expected_index(&self) -> u64 {
        self.next_expected_index
    }

    /// Full path of the most recent durably persisted file, if any.
    pub fn last_file_written(&self) -> Option<&Path> {
        self.last_file_written.as_deref()
    }

    /// Full path of the most recent directory written into, if any.
    pub fn last_dir_written(&self) -> Option<&Path> {
        self.last_dir_written.as_deref()
    }

    /// Wall-clock epoch seconds of the most recent successful write; 0 if
    /// nothing has been written.
    pub fn last_write_timestamp(&self) -> u64 {
        self.last_write_epoch_secs
    }

    /// Append a dense vector of samples starting at `start_index`.
    ///
    /// The vector is split at every file-cadence boundary; each fitting
    /// sub-vector is handed to the backend in order. On failure the cursor
    /// stops at the end of the last segment the backend persisted.
    ///
    /// # Errors
    ///
    /// - `Error::ClosedSession` after close.
    /// - `Error::VectorShape` if the byte length is not a whole number of
    ///   samples.
    /// - `Error::Continuity` when the continuity hint is set and
    ///   `start_index` is not the expected next index; the cursor is left
    ///   untouched and the caller may re-issue via the block path.
    /// - `Error::Ordering` if the write starts before the end of prior
    ///   writes.
    /// - `Error::Io` on backend failure.
    pub fn write_continuous(&mut self, data: &[u8], start_index: u64) -> Result<()> {
        self.ensure_open()?;
        let samples = self.vector_samples(data)?;
        if self.config.is_continuous && start_index != self.next_expected_index {
            return Err(Error::Continuity {
                expected: self.next_expected_index,
                got: start_index,
            });
        }
        if start_index < self.next_expected_index {
            return Err(Error::Ordering("write starts before the end of prior writes"));
        }
        if samples == 0 {
            return Ok(());
        }
        self.persist_run(data, start_index)
    }

    /// Append samples described by parallel global-index / block-offset
    /// arrays.
    ///
    /// Entry `i` declares that the sample at vector offset
    /// `block_offsets[i]` has global index `global_indexes[i]`; the run
    /// extends to the next offset (or the end of the vector) and is
    /// persisted exactly like a continuous write. Nothing is written in
    /// the gaps between runs.
    ///
    /// # Errors
    ///
    /// - `Error::ShapeMismatch` if the arrays differ in length.
    /// - `Error::Ordering` if either array is not strictly increasing, if
    ///   runs overlap in the global index space, or if the first run
    ///   starts before the end of prior writes.
    /// - `Error::Bounds` if an offset points past the end of the vector.
    /// - `Error::ClosedSession`, `Error::VectorShape`, `Error::Io` as on
    ///   the continuous path.
    pub fn write_block(
        &mut self,
        data: &[u8],
        global_indexes: &[u64],
        block_offsets: &[u64],
    ) -> Result<()> {
        self.ensure_open()?;
        let samples = self.vector_samples(data)?;
        if global_indexes.len() != block_offsets.len() {
            return Err(Error::ShapeMismatch {
                index_len: global_indexes.len(),
                offset_len: block_offsets.len(),
            });
        }
        if global_indexes.is_empty() {
            return Ok(());
        }
        for pair in global_indexes.windows(2) {
            if pair[1] <= pair[0] {
                return Err(Error::Ordering("global index array not strictly increasing"));
            }
        }
        for pair in block_offsets.windows(2) {
            if pair[1] <= pair[0] {
                return Err(Error::Ordering("block offset array not strictly increasing"));
            }
        }
        for &offset in block_offsets {
            if offset >= samples {
                return Err(Error::Bounds {
                    offset,
                    data_len: samples,
                });
            }
        }
        // each run must fit in the gap before the next one
        for i in 0..global_indexes.len() - 1 {
            let run = block_offsets[i + 1] - block_offsets[i];
            if global_indexes[i + 1] - global_indexes[i] < run {
                return Err(Error::Ordering("runs overlap in the global index space"));
            }
        }
        if global_indexes[0] < self.next_expected_index {
            return Err(Error::Ordering("write starts before the end of prior writes"));
        }

        for i in 0..global_indexes.len() {
            let start_offset = block_offsets[i] as usize;
            let end_offset = if i + 1 < block_offsets.len() {
                block_offsets[i + 1] as usize
            } else {
                samples as usize
            };
            let bytes = &data[start_offset * self.bytes_per_sample..end_offset * self.bytes_per_sample];
            self.persist_run(bytes, global_indexes[i])?;
        }
        Ok(())
    }

    /// Flush and release all backend resources. Idempotent; any write
    /// after the first close fails with `Error::ClosedSession`.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.store.close()?;
        self.closed = true;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::ClosedSession);
        }
        Ok(())
    }

    fn vector_samples(&self, data: &[u8]) -> Result<u64> {
        if data.len() % self.bytes_per_sample != 0 {
            return Err(Error::VectorShape {
                bytes: data.len(),
                bytes_per_sample: self.bytes_per_sample,
            });
        }
        Ok((data.len() / self.bytes_per_sample) as u64)
    }

    /// Persist one contiguous run, splitting at file boundaries. The
    /// cursor and last-written bookkeeping advance after each segment the
    /// backend reports durable.
    fn persist_run(&mut self, data: &[u8], start_index: u64) -> Result<()> {
        let total = (data.len() / self.bytes_per_sample) as u64;
        let end_index = start_index
            .checked_add(total)
            .ok_or(Error::ClockRange("sample index overflows u64"))?;
        let mut index = start_index;
        let mut offset = 0usize;
        while index < end_index {
            let slot = self.plan.slot_for(index)?;
            let span = self.plan.file_span(index)?;
            let take = (end_index - index).min(span.end - index);
            let dir = self.layout.subdir_path(slot.dir_epoch_secs)?;
            let file = self.layout.file_path(slot.dir_epoch_secs, slot.file_epoch_millis)?;
            let bytes = take as usize * self.bytes_per_sample;
            self.store.persist(&PersistRequest {
                dir: &dir,
                file: &file,
                start_index: index,
                sample_count: take,
                payload: &data[offset..offset + bytes],
            })?;
            debug!(
                "persisted {} samples at index {} into {}",
                take,
                index,
                file.display()
            );

            index += take;
            offset += bytes;
            self.next_expected_index = index;
            self.last_dir_written = Some(dir);
            self.last_file_written = Some(file);
            self.last_write_epoch_secs = wallclock_secs();
            if self.config.marching_periods && index == span.end {
                info!(
                    "{}: file segment complete through sample {}",
                    self.layout.root().display(),
                    index
                );
            }
        }
        Ok(())
    }
}

fn write_properties_if_missing(
    path: &Path,
    config: &SessionConfig,
    sample_type: SampleType,
) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let properties = ChannelProperties {
        format_version: PROPERTIES_VERSION,
        uuid: config.uuid.clone(),
        sample_type: sample_type.name().to_string(),
        element_byte_width: sample_type.byte_width(),
        subdir_cadence_secs: config.subdir_cadence_secs,
        file_cadence_millis: config.file_cadence_millis,
        start_global_index: config.start_global_index,
        sample_rate_numerator: config.sample_rate_numerator,
        sample_rate_denominator: config.sample_rate_denominator,
        is_complex: config.is_complex,
        num_subchannels: config.num_subchannels,
        compression_level: config.compression_level,
        checksum: config.checksum,
    };
    let json = serde_json::to_string_pretty(&properties)
        .map_err(|err| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))?;
    std::fs::write(path, json)?;
    Ok(())
}

fn wallclock_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Backend that records every persist call without touching disk.
    struct RecordingStore {
        calls: Vec<(PathBuf, u64, u64)>,
        fail_after: Option<usize>,
        closed: bool,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                fail_after: None,
                closed: false,
            }
        }
    }

    impl SampleStore for RecordingStore {
        fn persist(&mut self, request: &PersistRequest<'_>) -> std::io::Result<()> {
            if let Some(limit) = self.fail_after {
                if self.calls.len() >= limit {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "injected backend failure",
                    ));
                }
            }
            self.calls.push((
                request.file.to_path_buf(),
                request.start_index,
                request.sample_count,
            ));
            Ok(())
        }

        fn close(&mut self) -> std::io::Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn config(root: &Path) -> SessionConfig {
        SessionConfig {
            directory: root.to_path_buf(),
            byte_order: ByteOrder::Little,
            kind: ElementKind::SignedInt,
            byte_width: 2,
            subdir_cadence_secs: 3600,
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
        }
    }

    fn session(root: &Path) -> WriteSession<RecordingStore> {
        WriteSession::create_with_store(config(root), RecordingStore::new()).unwrap()
    }

    #[test]
    fn rejects_bad_configuration() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("ch");

        let mut bad = config(&root);
        bad.num_subchannels = 0;
        assert!(matches!(
            WriteSession::create_with_store(bad, RecordingStore::new()),
            Err(Error::Configuration(_))
        ));

        let mut bad = config(&root);
        bad.sample_rate_denominator = 0;
        assert!(matches!(
            WriteSession::create_with_store(bad, RecordingStore::new()),
            Err(Error::Configuration(_))
        ));

        let mut bad = config(&root);
        bad.file_cadence_millis = 7;
        assert!(matches!(
            WriteSession::create_with_store(bad, RecordingStore::new()),
            Err(Error::Configuration(_))
        ));

        let mut bad = config(&root);
        bad.compression_level = 10;
        assert!(matches!(
            WriteSession::create_with_store(bad, RecordingStore::new()),
            Err(Error::Configuration(_))
        ));

        let mut bad = config(&root);
        bad.byte_width = 3;
        assert!(matches!(
            WriteSession::create_with_store(bad, RecordingStore::new()),
            Err(Error::UnsupportedType { .. })
        ));
    }

    #[test]
    fn continuity_violation_leaves_cursor_unchanged() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir.path().join("ch"));
        let data = vec![0u8; 100 * 2];
        session.write_continuous(&data, 0).unwrap();
        assert_eq!(session.next_expected_index(), 100);

        let err = session.write_continuous(&data, 150).unwrap_err();
        assert!(matches!(err, Error::Continuity { expected: 100, got: 150 }));
        assert_eq!(session.next_expected_index(), 100);
    }

    #[test]
    fn consecutive_writes_advance_cursor() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir.path().join("ch"));
        session.write_continuous(&vec![0u8; 300 * 2], 0).unwrap();
        session.write_continuous(&vec![0u8; 250 * 2], 300).unwrap();
        assert_eq!(session.next_expected_index(), 550);
    }

    #[test]
    fn ragged_vector_is_rejected() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir.path().join("ch"));
        let err = session.write_continuous(&[0u8; 3], 0).unwrap_err();
        assert!(matches!(err, Error::VectorShape { .. }));
    }

    #[test]
    fn closed_session_rejects_writes() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir.path().join("ch"));
        session.close().unwrap();
        session.close().unwrap(); // idempotent
        let err = session.write_continuous(&[0u8; 2], 0).unwrap_err();
        assert!(matches!(err, Error::ClosedSession));
        let err = session.write_block(&[0u8; 2], &[0], &[0]).unwrap_err();
        assert!(matches!(err, Error::ClosedSession));
    }

    #[test]
    fn backend_failure_keeps_cursor_at_last_durable_segment() {
        let dir = tempdir().unwrap();
        let mut store = RecordingStore::new();
        store.fail_after = Some(1);
        let mut session =
            WriteSession::create_with_store(config(&dir.path().join("ch")), store).unwrap();

        // 2500 samples at 1 kHz spans three 1000 ms files; the second
        // segment fails
        let err = session.write_continuous(&vec![0u8; 2500 * 2], 0).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(session.next_expected_index(), 1000);
        assert!(session
            .last_file_written()
            .unwrap()
            .to_string_lossy()
            .contains("rf@0.000"));
    }

    #[test]
    fn block_write_validation() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir.path().join("ch"));
        let data = vec![0u8; 10 * 2];

        let err = session.write_block(&data, &[0, 20], &[0]).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                index_len: 2,
                offset_len: 1
            }
        ));

        let err = session.write_block(&data, &[20, 10], &[0, 5]).unwrap_err();
        assert!(matches!(err, Error::Ordering(_)));

        let err = session.write_block(&data, &[0, 20], &[0, 10]).unwrap_err();
        assert!(matches!(err, Error::Bounds { offset: 10, .. }));

        // run of 6 samples into a gap of 5
        let err = session.write_block(&data, &[0, 5], &[0, 6]).unwrap_err();
        assert!(matches!(err, Error::Ordering(_)));

        // nothing above mutated the cursor
        assert_eq!(session.next_expected_index(), 0);
    }

    #[test]
    fn block_write_skips_gaps() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir.path().join("ch"));
        // two runs: 5 samples at 0, 5 samples at 100
        let data = vec![0u8; 10 * 2];
        session.write_block(&data, &[0, 100], &[0, 5]).unwrap();
        assert_eq!(session.next_expected_index(), 105);
        let calls = &session.store.calls;
        assert_eq!(calls.len(), 2);
        assert_eq!((calls[0].1, calls[0].2), (0, 5));
        assert_eq!((calls[1].1, calls[1].2), (100, 5));
    }

    #[test]
    fn properties_sidecar_written_once() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("ch");
        let session = session(&root);
        let path = root.join("drf_properties.json");
        let json = std::fs::read_to_string(&path).unwrap();
        let props: ChannelProperties = serde_json::from_str(&json).unwrap();
        assert_eq!(props.sample_type, "i16le");
        assert_eq!(props.sample_rate_numerator, 1000);
        drop(session);

        // a second session over the same channel keeps the original sidecar
        let _again = WriteSession::create_with_store(config(&root), RecordingStore::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), json);
    }
}
