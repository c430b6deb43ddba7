use std::fmt::Debug;
use std::sync::Arc;

use crate::encoding::Sink;
use crate::error::AllocError;

/// Where encoders get their memory from.
///
/// The same allocator is handed, unchanged, to every encoder built for a
/// column. Failing to allocate is reported to the caller, nothing retries.
pub trait BufferAllocator: Debug + Send + Sync {
    fn allocate(&self, capacity: usize) -> Result<Vec<u8>, AllocError>;

    /// Hand a buffer back once an encoder no longer needs it.
    fn release(&self, _buffer: Vec<u8>) {}
}

/// Allocates from the global heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, capacity: usize) -> Result<Vec<u8>, AllocError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| AllocError::new(capacity))?;
        Ok(buf)
    }
}

pub(crate) const MIN_SLAB_SIZE: usize = 64;

/// The initial slab size which reaches `target_capacity` after roughly
/// `target_num_slabs` doublings.
pub(crate) fn initial_slab_size(target_capacity: usize, target_num_slabs: u32) -> usize {
    MIN_SLAB_SIZE.max(target_capacity >> target_num_slabs)
}

/// A growable output buffer made of slabs.
///
/// Slabs are never copied when the buffer grows: a full slab is kept and a new
/// one is allocated. Slab sizes double from `initial_slab_size` until they reach
/// a fifth of `max_capacity_hint`.
#[derive(Debug)]
pub struct SlabBuffer {
    allocator: Arc<dyn BufferAllocator>,
    initial_slab_size: usize,
    max_capacity_hint: usize,
    slabs: Vec<Vec<u8>>,
    current: Vec<u8>,
    bytes_used: usize,
    bytes_allocated: usize,
}

impl SlabBuffer {
    pub fn new(
        initial_slab_size: usize,
        max_capacity_hint: usize,
        allocator: Arc<dyn BufferAllocator>,
    ) -> Self {
        SlabBuffer {
            allocator,
            initial_slab_size: initial_slab_size.max(1),
            max_capacity_hint,
            slabs: Vec::new(),
            current: Vec::new(),
            bytes_used: 0,
            bytes_allocated: 0,
        }
    }

    /// Write all of `bytes`, or none of them if a slab cannot be allocated.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), AllocError> {
        let start = self.bytes_used;
        let result = self.write_slabs(bytes);
        if result.is_err() {
            self.truncate(start);
        }
        result
    }

    fn write_slabs(&mut self, mut bytes: &[u8]) -> Result<(), AllocError> {
        while !bytes.is_empty() {
            let free = self.current.capacity() - self.current.len();
            if free == 0 {
                self.add_slab(bytes.len())?;
                continue;
            }
            let n = free.min(bytes.len());
            self.current.extend_from_slice(&bytes[..n]);
            self.bytes_used += n;
            bytes = &bytes[n..];
        }
        Ok(())
    }

    fn add_slab(&mut self, min_size: usize) -> Result<(), AllocError> {
        let next = if self.bytes_used == 0 {
            self.initial_slab_size
        } else if self.bytes_used > self.max_capacity_hint / 5 {
            (self.max_capacity_hint / 5).max(1)
        } else {
            self.bytes_used
        };
        let next = next.max(min_size.min(self.max_capacity_hint.max(1)));
        let slab = self.allocator.allocate(next)?;
        self.bytes_allocated += slab.capacity();
        let full = std::mem::replace(&mut self.current, slab);
        if !full.is_empty() {
            self.slabs.push(full);
        }
        Ok(())
    }

    /// Drop every byte written after the first `len`, handing emptied slabs
    /// back to the allocator.
    pub(crate) fn truncate(&mut self, len: usize) {
        while self.bytes_used > len {
            let excess = self.bytes_used - len;
            if excess <= self.current.len() {
                let keep = self.current.len() - excess;
                self.current.truncate(keep);
                self.bytes_used = len;
                break;
            }
            self.bytes_used -= self.current.len();
            let Some(previous) = self.slabs.pop() else {
                self.current.clear();
                break;
            };
            let emptied = std::mem::replace(&mut self.current, previous);
            self.bytes_allocated -= emptied.capacity();
            self.allocator.release(emptied);
        }
    }

    /// The number of bytes written
    pub fn len(&self) -> usize {
        self.bytes_used
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_used == 0
    }

    /// The number of bytes obtained from the allocator
    pub fn allocated_size(&self) -> usize {
        self.bytes_allocated
    }

    /// Append the contents of this buffer to `out`
    pub(crate) fn copy_to<S: Sink>(&self, out: &mut S) -> Result<(), AllocError> {
        for slab in &self.slabs {
            out.append(slab)?;
        }
        out.append(&self.current)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, AllocError> {
        let mut out = self.allocator.allocate(self.bytes_used)?;
        self.copy_to(&mut out)?;
        Ok(out)
    }

    /// Drop all the slabs and start again.
    ///
    /// The next first slab is sized from how much this buffer held so that a
    /// column with consistently large pages does not start from tiny slabs.
    pub fn reset(&mut self) {
        self.initial_slab_size = self.initial_slab_size.max(self.bytes_used / 7);
        for slab in self.slabs.drain(..) {
            self.allocator.release(slab);
        }
        let current = std::mem::take(&mut self.current);
        if current.capacity() > 0 {
            self.allocator.release(current);
        }
        self.bytes_used = 0;
        self.bytes_allocated = 0;
    }
}

impl Sink for SlabBuffer {
    fn append(&mut self, bytes: &[u8]) -> Result<(), AllocError> {
        self.write(bytes)
    }
}
