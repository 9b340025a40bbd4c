//! Circular Byte Store Implementation

use crate::error::StoreError;
use tracing::{debug, info};

/// Default backlog capacity (1024 bytes = 128 two-channel samples)
pub const DEFAULT_CAPACITY: usize = 1024;

const F32_SIZE: usize = std::mem::size_of::<f32>();

/// Fixed-capacity circular byte store.
///
/// Single writer, single reader: the owner moves it into the task that
/// produces and drains the backlog. Writes that do not fit are rejected
/// instead of overwriting unread bytes.
#[derive(Debug)]
pub struct RingStore {
    /// Backing storage, `None` once destroyed
    storage: Option<Box<[u8]>>,
    /// Capacity in bytes
    capacity: usize,
    /// Write cursor
    head: usize,
    /// Read cursor
    tail: usize,
    /// Bytes currently held; disambiguates full from empty when `head == tail`
    len: usize,
    /// Total bytes accepted since the last init (for statistics)
    total_written: usize,
}

impl RingStore {
    /// Allocate a store holding up to `capacity` bytes
    pub fn new(capacity: usize) -> Result<Self, StoreError> {
        let storage = allocate(capacity)?;
        info!("Backlog store initialized with {} bytes", capacity);
        Ok(Self {
            storage: Some(storage),
            capacity,
            head: 0,
            tail: 0,
            len: 0,
            total_written: 0,
        })
    }

    /// Re-allocate storage after `destroy()`, or reset to a new capacity.
    /// Any held bytes are discarded.
    pub fn init(&mut self, capacity: usize) -> Result<(), StoreError> {
        *self = Self::new(capacity)?;
        Ok(())
    }

    /// Append `data`, failing with `InvalidSize` if it exceeds the free space.
    /// Cursors are left untouched on failure.
    pub fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
        let capacity = self.capacity;
        let free = capacity - self.len;
        let head = self.head;
        let storage = self.storage.as_deref_mut().ok_or(StoreError::Destroyed)?;

        let size = data.len();
        if size > free {
            debug!("Rejected write of {} bytes, {} bytes free", size, free);
            return Err(StoreError::InvalidSize {
                requested: size,
                free,
            });
        }

        let to_end = capacity - head;
        if to_end >= size {
            storage[head..head + size].copy_from_slice(data);
        } else {
            // Wraps: fill to the end of the array, then continue from index 0
            storage[head..].copy_from_slice(&data[..to_end]);
            storage[..size - to_end].copy_from_slice(&data[to_end..]);
        }

        self.head = (head + size) % capacity;
        self.len += size;
        self.total_written += size;
        Ok(())
    }

    /// Remove exactly `out.len()` bytes into `out`.
    /// Fails with `NoData` (cursors untouched) if fewer bytes are held.
    pub fn read_into(&mut self, out: &mut [u8]) -> Result<(), StoreError> {
        let capacity = self.capacity;
        let available = self.len;
        let tail = self.tail;
        let storage = self.storage.as_deref().ok_or(StoreError::Destroyed)?;

        let size = out.len();
        if size > available {
            return Err(StoreError::NoData {
                requested: size,
                available,
            });
        }

        let to_end = capacity - tail;
        if to_end >= size {
            out.copy_from_slice(&storage[tail..tail + size]);
        } else {
            out[..to_end].copy_from_slice(&storage[tail..]);
            out[to_end..].copy_from_slice(&storage[..size - to_end]);
        }

        self.tail = (tail + size) % capacity;
        self.len -= size;
        Ok(())
    }

    /// Remove `size` bytes and return them as an owned buffer
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>, StoreError> {
        if self.storage.is_none() {
            return Err(StoreError::Destroyed);
        }
        if size > self.len {
            return Err(StoreError::NoData {
                requested: size,
                available: self.len,
            });
        }
        let mut out = vec![0u8; size];
        self.read_into(&mut out)?;
        Ok(out)
    }

    /// Remove one little-endian `f32`.
    ///
    /// Returns `0.0` when fewer than four bytes are held; callers must treat
    /// that value as "nothing left", not as a reading.
    pub fn read_f32(&mut self) -> Result<f32, StoreError> {
        let mut raw = [0u8; F32_SIZE];
        match self.read_into(&mut raw) {
            Ok(()) => Ok(f32::from_le_bytes(raw)),
            Err(StoreError::NoData { .. }) => Ok(0.0),
            Err(e) => Err(e),
        }
    }

    /// Bytes currently held (0 once destroyed)
    pub fn available(&self) -> usize {
        self.len
    }

    /// Bytes that can still be written
    pub fn free(&self) -> usize {
        self.capacity - self.len
    }

    /// Check if the store holds no data
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the store cannot accept another byte
    pub fn is_full(&self) -> bool {
        self.storage.is_some() && self.len == self.capacity
    }

    /// Get the capacity in bytes (0 once destroyed)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.len as f64 / self.capacity as f64
    }

    /// Total bytes accepted since the last init
    pub fn total_written(&self) -> usize {
        self.total_written
    }

    /// Whether backing storage is currently allocated
    pub fn is_initialized(&self) -> bool {
        self.storage.is_some()
    }

    /// Drop all held bytes, keeping the storage
    pub fn clear(&mut self) {
        self.tail = self.head;
        self.len = 0;
    }

    /// Release the backing storage and reset cursors.
    /// Later reads and writes fail with `Destroyed` until `init()`.
    pub fn destroy(&mut self) {
        if self.storage.take().is_some() {
            info!("Backlog store destroyed ({} bytes discarded)", self.len);
        }
        self.capacity = 0;
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

fn allocate(capacity: usize) -> Result<Box<[u8]>, StoreError> {
    if capacity == 0 {
        return Err(StoreError::InvalidSize {
            requested: 0,
            free: 0,
        });
    }
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(capacity)
        .map_err(|_| StoreError::OutOfMemory { capacity })?;
    storage.resize(capacity, 0u8);
    Ok(storage.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read() {
        let mut store = RingStore::new(16).unwrap();

        store.write(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(store.available(), 5);

        let bytes = store.read(3).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(store.available(), 2);
        assert_eq!(store.free(), 14);
    }

    #[test]
    fn test_wraparound_half_quarter_half() {
        let capacity = 64;
        let mut store = RingStore::new(capacity).unwrap();

        let first: Vec<u8> = (0..32).collect();
        store.write(&first).unwrap();
        assert_eq!(store.read(16).unwrap(), first[..16].to_vec());

        let second: Vec<u8> = (100..132).collect();
        store.write(&second).unwrap();
        assert_eq!(store.available(), 3 * capacity / 4);

        // Contents come back in order across the wrap boundary
        let rest = store.read(48).unwrap();
        assert_eq!(&rest[..16], &first[16..]);
        assert_eq!(&rest[16..], &second[..]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_larger_than_free_space_rejected() {
        let mut store = RingStore::new(8).unwrap();
        store.write(&[0; 6]).unwrap();

        let err = store.write(&[0; 3]).unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidSize {
                requested: 3,
                free: 2
            }
        );
        assert_eq!(store.available(), 6);
        assert_eq!(store.total_written(), 6);
    }

    #[test]
    fn test_full_store_reports_capacity() {
        let mut store = RingStore::new(8).unwrap();
        store.write(&[7; 8]).unwrap();

        assert!(store.is_full());
        assert_eq!(store.available(), 8);
        assert!(store.write(&[1]).is_err());
        assert_eq!(store.read(8).unwrap(), vec![7; 8]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_read_more_than_available_rejected() {
        let mut store = RingStore::new(8).unwrap();
        store.write(&[9, 8]).unwrap();

        assert_eq!(
            store.read(3),
            Err(StoreError::NoData {
                requested: 3,
                available: 2
            })
        );
        assert_eq!(store.read(2).unwrap(), vec![9, 8]);
    }

    #[test]
    fn test_read_f32_sentinel() {
        let mut store = RingStore::new(16).unwrap();
        store.write(&21.5f32.to_le_bytes()).unwrap();
        store.write(&[1, 2]).unwrap();

        assert_eq!(store.read_f32().unwrap(), 21.5);
        // Two stray bytes are not a whole value
        assert_eq!(store.read_f32().unwrap(), 0.0);
        assert_eq!(store.available(), 2);
    }

    #[test]
    fn test_destroy_fails_loudly() {
        let mut store = RingStore::new(8).unwrap();
        store.write(&[1, 2, 3]).unwrap();
        store.destroy();

        assert!(!store.is_initialized());
        assert_eq!(store.available(), 0);
        assert_eq!(store.write(&[1]), Err(StoreError::Destroyed));
        assert_eq!(store.read(1), Err(StoreError::Destroyed));
        assert_eq!(store.read_f32(), Err(StoreError::Destroyed));

        store.init(4).unwrap();
        store.write(&[1, 2, 3, 4]).unwrap();
        assert_eq!(store.capacity(), 4);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            RingStore::new(0),
            Err(StoreError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_fill_ratio() {
        let mut store = RingStore::new(100).unwrap();
        assert_eq!(store.fill_ratio(), 0.0);

        store.write(&[0; 50]).unwrap();
        assert!((store.fill_ratio() - 0.5).abs() < 0.01);

        store.clear();
        assert!(store.is_empty());
    }
}
