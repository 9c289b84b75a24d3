use crate::errors::{Result, SupplyError};

/// Append-only byte store shared between the background fetcher and the
/// pulling decoder.
///
/// Bytes are only ever added at the end, so any offset below
/// [`written`](Self::written) refers to the same byte forever. The
/// buffer itself carries no synchronization; the supply layer keeps its
/// only instance behind the stream lock.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    bytes: Vec<u8>,
}

impl GrowableBuffer {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Pre-sizes the backing storage, e.g. from a `Content-Length`
    /// header. A hint only, the buffer still grows past it.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Amount of bytes appended so far.
    pub fn written(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Appends a chunk at the end, advancing the written length by its
    /// size.
    pub fn append(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Copies out the bytes in `[from, from + len)` without consuming
    /// them. The range must lie inside the written part of the buffer.
    pub fn read(&self, from: usize, len: usize) -> Result<Vec<u8>> {
        let end = match from.checked_add(len) {
            Some(end) if end <= self.bytes.len() => end,
            _ => {
                return Err(SupplyError::OutOfRange {
                    from,
                    len,
                    written: self.bytes.len(),
                })
            }
        };

        Ok(self.bytes[from..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_advances_written_length() {
        let mut buffer = GrowableBuffer::new();
        assert!(buffer.is_empty());

        buffer.append(&[1, 2, 3]);
        assert_eq!(buffer.written(), 3);

        buffer.append(&[4, 5]);
        assert_eq!(buffer.written(), 5);
    }

    #[test]
    fn read_copies_without_consuming() {
        let mut buffer = GrowableBuffer::new();
        buffer.append(b"progressive");

        let first = buffer
            .read(0, 4)
            .expect("range is inside the written part");
        assert_eq!(first, b"prog");

        let again = buffer
            .read(0, 4)
            .expect("reading must not consume anything");
        assert_eq!(again, b"prog");
        assert_eq!(buffer.written(), 11);
    }

    #[test]
    fn written_bytes_never_change_value() {
        let mut buffer = GrowableBuffer::new();
        buffer.append(&[10, 20, 30]);
        let before = buffer
            .read(0, 3)
            .expect("range is inside the written part");

        buffer.append(&[40, 50]);
        let after = buffer
            .read(0, 3)
            .expect("old offsets stay valid after appends");

        assert_eq!(before, after);
    }

    #[test]
    fn read_past_end_is_rejected() {
        let mut buffer = GrowableBuffer::new();
        buffer.append(&[0; 8]);

        assert!(buffer.read(0, 8).is_ok());
        assert!(matches!(
            buffer.read(4, 8),
            Err(SupplyError::OutOfRange {
                from: 4,
                len: 8,
                written: 8
            })
        ));
        assert!(buffer.read(usize::MAX, 1).is_err());
    }

    #[test]
    fn empty_range_is_fine_anywhere_inside() {
        let mut buffer = GrowableBuffer::new();
        buffer.append(&[7; 4]);

        assert_eq!(buffer.read(4, 0).expect("empty tail range"), vec![]);
        assert!(buffer.read(5, 0).is_err());
    }

    #[test]
    fn with_capacity_starts_empty() {
        let buffer = GrowableBuffer::with_capacity(64 * 1024);
        assert_eq!(buffer.written(), 0);
        assert!(buffer.is_empty());
    }
}
