//! ARGB frames exchanged through a file under `/dev/shm`.
//!
//! The region is a 24-byte header followed by `width * height * 4` pixel bytes.
//! The header carries a sequence counter that is odd while a frame is being
//! written, so readers poll it and retry torn copies instead of waiting on a
//! process-shared lock. This layout only interoperates with [`SharedFrameWriter`];
//! producers that guard the region with their own OS mutex and condition
//! variable are not readable here.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    sync::atomic::{fence, AtomicU64, Ordering},
    thread::{self, sleep},
    time::Duration,
};

use anyhow::{bail, Context, Ok};
use memmap2::{Mmap, MmapMut, MmapOptions};

const SHM_DIR: &str = "/dev/shm";

// [0..8] sequence, odd while a frame is being written
// [8..16] sample timestamp, microseconds since epoch
// [16..20] width, [20..24] height
pub const HEADER_SIZE: usize = 24;
const BYTES_PER_PIXEL: usize = 4;

const POLL_INTERVAL: Duration = Duration::from_millis(1);
const MAX_READ_ATTEMPTS: usize = 100;

/// One ARGB frame copied out of the shared region.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp_micros: i64,
}

pub fn shm_path(name: &str) -> PathBuf {
    Path::new(SHM_DIR).join(name.trim_start_matches('/'))
}

fn payload_size(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

fn sequence_of(region: &[u8]) -> &AtomicU64 {
    // page aligned mapping, header starts at offset 0
    unsafe { &*(region.as_ptr() as *const AtomicU64) }
}

fn read_u32(region: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&region[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn read_i64(region: &[u8], offset: usize) -> i64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&region[offset..offset + 8]);
    i64::from_le_bytes(bytes)
}

/// Consumer side of a shared frame region. Never writes to the region.
pub struct SharedFrame {
    mmap: Mmap,
    path: PathBuf,
    width: u32,
    height: u32,
    last_sequence: u64,
}

impl SharedFrame {
    pub fn attach(name: &str, width: u32, height: u32) -> anyhow::Result<Self> {
        Self::attach_path(shm_path(name), width, height)
    }

    pub fn attach_path(path: impl AsRef<Path>, width: u32, height: u32) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .with_context(|| format!("Failed to open shared memory area {}", path.display()))?;
        let expected = HEADER_SIZE + payload_size(width, height);
        let size = file.metadata()?.len() as usize;
        if size < expected {
            bail!("Shared memory area {} has {size} bytes, {width}x{height} frames need {expected}", path.display());
        }

        let mmap = unsafe { MmapOptions::new().len(expected).map(&file)? };
        let (region_width, region_height) = (read_u32(&mmap, 16), read_u32(&mmap, 20));
        if (region_width, region_height) != (0, 0) && (region_width, region_height) != (width, height) {
            bail!("Shared memory area holds {region_width}x{region_height} frames, not {width}x{height}");
        }

        Ok(Self { mmap, path, width, height, last_sequence: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.mmap.len()
    }

    fn sequence(&self) -> u64 {
        sequence_of(&self.mmap).load(Ordering::Acquire)
    }

    /// Blocks until the producer finished a frame we have not read yet.
    /// Returns false without a frame once `keep_running` says to stop.
    pub fn wait(&self, keep_running: impl Fn() -> bool) -> bool {
        loop {
            let sequence = self.sequence();
            if sequence % 2 == 0 && sequence != self.last_sequence {
                return true;
            }
            if !keep_running() {
                return false;
            }
            sleep(POLL_INTERVAL);
        }
    }

    /// Copies the current frame out. Retries while the producer is writing
    /// or when a write overlapped the copy.
    pub fn read_frame(&mut self) -> anyhow::Result<Frame> {
        for _ in 0..MAX_READ_ATTEMPTS {
            let before = self.sequence();
            if before % 2 == 1 {
                thread::yield_now();
                continue;
            }

            let data = self.mmap[HEADER_SIZE..].to_vec();
            let timestamp_micros = read_i64(&self.mmap, 8);
            fence(Ordering::Acquire);

            if self.sequence() == before {
                self.last_sequence = before;
                return Ok(Frame { data, width: self.width, height: self.height, timestamp_micros });
            }
            log::debug!("Frame changed while copying, retrying");
        }

        bail!("Could not copy a consistent frame from {}", self.path.display())
    }
}

/// Producer side: creates the region and publishes frames into it.
pub struct SharedFrameWriter {
    mmap: MmapMut,
    _file: File,
    width: u32,
    height: u32,
}

impl SharedFrameWriter {
    pub fn create(name: &str, width: u32, height: u32) -> anyhow::Result<Self> {
        Self::create_path(shm_path(name), width, height)
    }

    pub fn create_path(path: impl AsRef<Path>, width: u32, height: u32) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let size = HEADER_SIZE + payload_size(width, height);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Failed to create shared memory area {}", path.display()))?;
        file.set_len(size as u64)?;

        let mut mmap = unsafe { MmapOptions::new().len(size).map_mut(&file)? };
        mmap[16..20].copy_from_slice(&width.to_le_bytes());
        mmap[20..24].copy_from_slice(&height.to_le_bytes());

        Ok(Self { mmap, _file: file, width, height })
    }

    pub fn publish(&mut self, data: &[u8], timestamp_micros: i64) -> anyhow::Result<()> {
        let expected = payload_size(self.width, self.height);
        if data.len() != expected {
            bail!("Frame has {} bytes, region expects {expected}", data.len());
        }

        let sequence = sequence_of(&self.mmap).load(Ordering::Relaxed);
        sequence_of(&self.mmap).store(sequence + 1, Ordering::Release);
        fence(Ordering::Release);

        self.mmap[8..16].copy_from_slice(&timestamp_micros.to_le_bytes());
        self.mmap[HEADER_SIZE..].copy_from_slice(data);

        sequence_of(&self.mmap).store(sequence + 2, Ordering::Release);

        Ok(())
    }
}
