//! Storage backend boundary.
//!
//! Byte-level persistence is an external concern; the write engine only
//! needs [`SampleStore`]: hand a finished byte range to a file, scoped to
//! one file segment per call. [`FileStore`] is the built-in backend, a
//! framed append-only container with optional crc32 checksums and deflate
//! compression. The [`runtime`] module replaces the hidden process-wide
//! initialization of the original container library with an explicit,
//! atomically guarded init/shutdown pair.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// Container magic ('RFV0').
pub const STORE_MAGIC: u32 = 0x52465630;

/// Container format version.
pub const STORE_VERSION: u32 = 1;

/// Size of the per-file header.
pub const FILE_HEADER_SIZE: usize = 64;

/// Size of the per-record header.
pub const RECORD_HEADER_SIZE: usize = 32;

/// File flag: records carry crc32 checksums.
pub const FILE_FLAG_CHECKSUM: u8 = 1;

/// File flag: samples are complex (I/Q interleaved).
pub const FILE_FLAG_COMPLEX: u8 = 2;

/// Record flag: payload is deflate-compressed.
pub const RECORD_FLAG_DEFLATE: u8 = 1;

/// Explicit process-scoped storage runtime lifecycle.
///
/// [`init`](runtime::init) must run once before any store is created and
/// [`shutdown`](runtime::shutdown) once after all sessions are closed.
/// Both are idempotent; creating a store while the runtime is down is a
/// configuration error.
pub mod runtime {
    use std::sync::atomic::{AtomicBool, Ordering};

    static INITIALIZED: AtomicBool = AtomicBool::new(false);

    /// Bring the storage runtime up. Safe to call more than once.
    pub fn init() {
        INITIALIZED.store(true, Ordering::Release);
    }

    /// Tear the storage runtime down. Callers must have closed all
    /// sessions first.
    pub fn shutdown() {
        INITIALIZED.store(false, Ordering::Release);
    }

    pub fn is_initialized() -> bool {
        INITIALIZED.load(Ordering::Acquire)
    }
}

/// One finished byte range, bound for one file segment.
#[derive(Debug)]
pub struct PersistRequest<'a> {
    /// Directory bucket holding the file; created if absent.
    pub dir: &'a Path,
    /// Full path of the target file; created if absent.
    pub file: &'a Path,
    /// Global index of the first sample in `payload`.
    pub start_index: u64,
    /// Number of samples in `payload`.
    pub sample_count: u64,
    /// Raw sample bytes, subchannel- and I/Q-interleaved.
    pub payload: &'a [u8],
}

/// The boundary the write engine persists through.
///
/// A call must not return until its effect (or failure) is durable; file
/// and directory handles are scoped to the call and released on every exit
/// path.
pub trait SampleStore {
    fn persist(&mut self, request: &PersistRequest<'_>) -> io::Result<()>;

    /// Flush and release everything held by the backend.
    fn close(&mut self) -> io::Result<()>;
}

/// Immutable configuration a [`FileStore`] stamps into file headers.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub dtype_code: u8,
    pub uuid: String,
    pub compression_level: u32,
    pub checksum: bool,
    pub is_complex: bool,
}

/// Built-in framed-container backend.
///
/// Every file opens with a 64-byte header (magic, version, dtype code,
/// flags, compression level, provenance UUID); each persist call appends a
/// 32-byte record header plus the (possibly deflated) payload and syncs
/// before returning.
#[derive(Debug)]
pub struct FileStore {
    config: StoreConfig,
}

impl FileStore {
    /// # Errors
    ///
    /// - `Error::Configuration` if the storage runtime is not initialized.
    pub fn new(config: StoreConfig) -> Result<Self> {
        if !runtime::is_initialized() {
            return Err(Error::Configuration("storage runtime not initialized"));
        }
        Ok(Self { config })
    }

    fn file_header(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        buf[0..4].copy_from_slice(&STORE_MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&STORE_VERSION.to_le_bytes());
        buf[8] = self.config.dtype_code;
        let mut flags = 0u8;
        if self.config.checksum {
            flags |= FILE_FLAG_CHECKSUM;
        }
        if self.config.is_complex {
            flags |= FILE_FLAG_COMPLEX;
        }
        buf[9] = flags;
        buf[10] = self.config.compression_level as u8;
        let uuid = self.config.uuid.as_bytes();
        let len = uuid.len().min(36);
        buf[11] = len as u8;
        buf[12..12 + len].copy_from_slice(&uuid[..len]);
        buf
    }
}

impl SampleStore for FileStore {
    fn persist(&mut self, request: &PersistRequest<'_>) -> io::Result<()> {
        std::fs::create_dir_all(request.dir)?;

        let is_new = !request.file.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(request.file)?;
        if is_new {
            file.write_all(&self.file_header())?;
        }

        let mut record_flags = 0u8;
        let stored;
        let payload: &[u8] = if self.config.compression_level > 0 {
            let mut encoder = DeflateEncoder::new(
                Vec::with_capacity(request.payload.len() / 2),
                Compression::new(self.config.compression_level),
            );
            encoder.write_all(request.payload)?;
            stored = encoder.finish()?;
            record_flags |= RECORD_FLAG_DEFLATE;
            &stored
        } else {
            request.payload
        };

        let checksum = if self.config.checksum {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(request.payload);
            hasher.finalize()
        } else {
            0
        };

        let mut header = [0u8; RECORD_HEADER_SIZE];
        header[0..8].copy_from_slice(&request.start_index.to_le_bytes());
        header[8..16].copy_from_slice(&request.sample_count.to_le_bytes());
        header[16..20].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        header[20..24].copy_from_slice(&(request.payload.len() as u32).to_le_bytes());
        header[24..28].copy_from_slice(&checksum.to_le_bytes());
        header[28] = record_flags;

        file.write_all(&header)?;
        file.write_all(payload)?;
        file.sync_all()?;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        // handles are scoped to persist calls; nothing is held here
        Ok(())
    }
}
