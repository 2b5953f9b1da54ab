//! Growable byte buffer with the chunk format's integer and string encodings.
//!
//! Two write styles exist for every primitive:
//!
//! - appending writes (`write_*`) go to the current position and advance it,
//!   returning the writer for chaining;
//! - positioned writes (`write_*_at`) go to an explicit offset and return the
//!   offset just past the written bytes. They never move the position
//!   backwards but do extend it when the write lands beyond it. The chunk
//!   assembler uses them to patch header slots once the sizes are known.
//!
//! Integers written through the non-raw methods use the variable-length
//! ("compressed") encoding: 7 data bits per byte, least significant group
//! first, the high bit flagging a continuation. Eight such groups cover 56
//! bits; a ninth byte, when needed, carries the top 8 bits verbatim, so no
//! 64-bit value takes more than 9 bytes. Raw writes are big-endian.

/// Continuation bit of a compressed integer byte.
const EXT_BIT: u8 = 0x80;

/// Number of 7-bit groups before the final full byte.
const MAX_GROUPS: usize = 8;

/// Longest possible encoding of a compressed 64-bit integer.
pub const MAX_COMPRESSED_LEN: usize = 9;

/// Compact string tag for a null string.
pub const STRING_NULL: u8 = 0;
/// Compact string tag for the empty string.
pub const STRING_EMPTY: u8 = 1;
/// Compact string tag for a reference into the string constant pool.
pub const STRING_CONSTANT_POOL: u8 = 2;
/// Compact string tag for inline UTF-8 bytes.
pub const STRING_UTF8: u8 = 3;

const DEFAULT_CAPACITY: usize = 4096;

/// Number of bytes [`ByteWriter::write_long`] emits for `value`.
pub fn compressed_len(value: i64) -> usize {
    let mut bits = value as u64;
    for len in 1..=MAX_GROUPS {
        if bits & !0x7f == 0 {
            return len;
        }
        bits >>= 7;
    }
    MAX_COMPRESSED_LEN
}

/// Total size of a record of `payload_len` bytes preceded by its own
/// compressed size, where the size counts the prefix too.
///
/// The prefix width depends on the value it encodes, so the total is found
/// by iterating until adding the prefix no longer changes it.
pub fn self_sized_len(payload_len: usize) -> usize {
    let mut total = payload_len;
    loop {
        let next = payload_len + compressed_len(total as i64);
        if next == total {
            return total;
        }
        total = next;
    }
}

/// Auto-growing byte buffer.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    position: usize,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ByteWriter {
    /// Create a writer with the given initial capacity (at least one byte).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            position: 0,
        }
    }

    /// Current append position, which is also the number of valid bytes.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes currently reserved for the buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Length of the written data plus the compressed prefix needed to
    /// encode that length in front of it.
    pub fn self_sized_len(&self) -> usize {
        self_sized_len(self.position)
    }

    /// The written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.position]
    }

    /// Consume the writer, keeping only the written bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.position);
        self.buf
    }

    /// Discard all data and rewind to offset 0.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    fn ensure_capacity(&mut self, end: usize) {
        if end <= self.buf.len() {
            return;
        }
        let mut capacity = self.buf.len();
        while capacity < end {
            capacity *= 2;
        }
        self.buf.resize(capacity, 0);
    }

    fn put_at(&mut self, offset: usize, bytes: &[u8]) -> usize {
        let end = offset + bytes.len();
        self.ensure_capacity(end);
        self.buf[offset..end].copy_from_slice(bytes);
        if end > self.position {
            self.position = end;
        }
        end
    }

    fn put(&mut self, bytes: &[u8]) -> &mut Self {
        let offset = self.position;
        self.put_at(offset, bytes);
        self
    }

    fn put_compressed_at(&mut self, offset: usize, value: i64) -> usize {
        let mut encoded = [0u8; MAX_COMPRESSED_LEN];
        let len = encode_compressed(value, &mut encoded);
        self.put_at(offset, &encoded[..len])
    }

    // Single bytes and byte arrays

    pub fn write_byte(&mut self, value: u8) -> &mut Self {
        self.put(&[value])
    }

    pub fn write_byte_at(&mut self, offset: usize, value: u8) -> usize {
        self.put_at(offset, &[value])
    }

    pub fn write_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.put(value)
    }

    pub fn write_bytes_at(&mut self, offset: usize, value: &[u8]) -> usize {
        self.put_at(offset, value)
    }

    pub fn write_boolean(&mut self, value: bool) -> &mut Self {
        self.write_byte(u8::from(value))
    }

    pub fn write_boolean_at(&mut self, offset: usize, value: bool) -> usize {
        self.write_byte_at(offset, u8::from(value))
    }

    // Compressed integers. Narrow types are zero-extended before encoding.

    pub fn write_char(&mut self, value: char) -> &mut Self {
        self.write_long(i64::from(u32::from(value)))
    }

    pub fn write_char_at(&mut self, offset: usize, value: char) -> usize {
        self.write_long_at(offset, i64::from(u32::from(value)))
    }

    pub fn write_short(&mut self, value: i16) -> &mut Self {
        self.write_long(i64::from(value as u16))
    }

    pub fn write_short_at(&mut self, offset: usize, value: i16) -> usize {
        self.write_long_at(offset, i64::from(value as u16))
    }

    pub fn write_int(&mut self, value: i32) -> &mut Self {
        self.write_long(i64::from(value as u32))
    }

    pub fn write_int_at(&mut self, offset: usize, value: i32) -> usize {
        self.write_long_at(offset, i64::from(value as u32))
    }

    pub fn write_long(&mut self, value: i64) -> &mut Self {
        let offset = self.position;
        self.put_compressed_at(offset, value);
        self
    }

    pub fn write_long_at(&mut self, offset: usize, value: i64) -> usize {
        self.put_compressed_at(offset, value)
    }

    /// Write a length or count. Lengths beyond `i64::MAX` cannot occur for
    /// in-memory buffers.
    pub fn write_len(&mut self, value: usize) -> &mut Self {
        self.write_long(value as i64)
    }

    // Fixed-width big-endian values

    pub fn write_short_raw(&mut self, value: i16) -> &mut Self {
        self.put(&value.to_be_bytes())
    }

    pub fn write_short_raw_at(&mut self, offset: usize, value: i16) -> usize {
        self.put_at(offset, &value.to_be_bytes())
    }

    pub fn write_int_raw(&mut self, value: i32) -> &mut Self {
        self.put(&value.to_be_bytes())
    }

    pub fn write_int_raw_at(&mut self, offset: usize, value: i32) -> usize {
        self.put_at(offset, &value.to_be_bytes())
    }

    pub fn write_long_raw(&mut self, value: i64) -> &mut Self {
        self.put(&value.to_be_bytes())
    }

    pub fn write_long_raw_at(&mut self, offset: usize, value: i64) -> usize {
        self.put_at(offset, &value.to_be_bytes())
    }

    pub fn write_float(&mut self, value: f32) -> &mut Self {
        self.put(&value.to_bits().to_be_bytes())
    }

    pub fn write_float_at(&mut self, offset: usize, value: f32) -> usize {
        self.put_at(offset, &value.to_bits().to_be_bytes())
    }

    pub fn write_double(&mut self, value: f64) -> &mut Self {
        self.put(&value.to_bits().to_be_bytes())
    }

    pub fn write_double_at(&mut self, offset: usize, value: f64) -> usize {
        self.put_at(offset, &value.to_bits().to_be_bytes())
    }

    // Strings

    /// UTF-8 bytes preceded by their compressed byte count.
    pub fn write_utf(&mut self, value: &str) -> &mut Self {
        self.write_len(value.len()).write_bytes(value.as_bytes())
    }

    pub fn write_utf_at(&mut self, offset: usize, value: &str) -> usize {
        let offset = self.write_long_at(offset, value.len() as i64);
        self.write_bytes_at(offset, value.as_bytes())
    }

    /// Tagged string: [`STRING_NULL`], [`STRING_EMPTY`] or [`STRING_UTF8`]
    /// followed by [`ByteWriter::write_utf`].
    pub fn write_compact_utf(&mut self, value: Option<&str>) -> &mut Self {
        match value {
            None => self.write_byte(STRING_NULL),
            Some("") => self.write_byte(STRING_EMPTY),
            Some(text) => self.write_byte(STRING_UTF8).write_utf(text),
        }
    }

    pub fn write_compact_utf_at(&mut self, offset: usize, value: Option<&str>) -> usize {
        match value {
            None => self.write_byte_at(offset, STRING_NULL),
            Some("") => self.write_byte_at(offset, STRING_EMPTY),
            Some(text) => {
                let offset = self.write_byte_at(offset, STRING_UTF8);
                self.write_utf_at(offset, text)
            }
        }
    }

    /// Tagged reference to entry `index` of the string constant pool.
    pub fn write_string_ref(&mut self, index: i64) -> &mut Self {
        self.write_byte(STRING_CONSTANT_POOL).write_long(index)
    }
}

fn encode_compressed(value: i64, out: &mut [u8; MAX_COMPRESSED_LEN]) -> usize {
    let mut bits = value as u64;
    for (i, slot) in out.iter_mut().take(MAX_GROUPS).enumerate() {
        if bits & !0x7f == 0 {
            *slot = bits as u8;
            return i + 1;
        }
        *slot = (bits as u8 & 0x7f) | EXT_BIT;
        bits >>= 7;
    }
    out[MAX_GROUPS] = bits as u8;
    MAX_COMPRESSED_LEN
}
