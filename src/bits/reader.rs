use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::error::{Error, Result};

use super::Code;

/// A source of bytes a [`BitReader`] can buffer from: either an in-memory
/// buffer or a file. Implementors only need sequential reads plus
/// byte-granularity seeking; the reader itself handles sub-byte framing.
pub trait ByteSource {
    /// Reads the next byte, or `None` at end of stream.
    fn read_byte(&mut self) -> std::io::Result<Option<u8>>;
    /// Repositions the source so the next [`read_byte`](Self::read_byte)
    /// returns the byte at `byte_index`.
    fn seek_to_byte(&mut self, byte_index: u64) -> std::io::Result<()>;
}

/// An in-memory byte source. Cheap to clone: the underlying bytes are
/// shared via [`Arc`], so cloning a reader over this source only clones a
/// cursor.
#[derive(Debug, Clone)]
pub struct MemoryByteSource {
    data: Arc<[u8]>,
    pos: usize,
}

impl MemoryByteSource {
    pub fn new(data: Arc<[u8]>) -> Self {
        Self { data, pos: 0 }
    }
}

impl ByteSource for MemoryByteSource {
    #[inline]
    fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        if self.pos < self.data.len() {
            let b = self.data[self.pos];
            self.pos += 1;
            Ok(Some(b))
        } else {
            Ok(None)
        }
    }

    #[inline]
    fn seek_to_byte(&mut self, byte_index: u64) -> std::io::Result<()> {
        self.pos = byte_index as usize;
        Ok(())
    }
}

/// A file-backed byte source, for the `Offline` load mode where the
/// compressed bytes are not materialized in memory.
///
/// Remembers its path so it can be cloned (each clone reopens the file
/// and gets its own independent cursor), matching the in-memory source's
/// "clone is a cheap cursor copy" contract closely enough for the one
/// place it matters: satisfying `ByteSource + Clone` for the lazy
/// iterator layer, which in `Offline` mode only ever resolves references
/// through the sequential window, never by actually re-reading the file
/// through a clone.
#[derive(Debug)]
pub struct FileByteSource {
    path: std::path::PathBuf,
    reader: BufReader<File>,
}

impl FileByteSource {
    pub fn new(file: File) -> Self {
        Self {
            path: std::path::PathBuf::new(),
            reader: BufReader::new(file),
        }
    }

    pub fn open(path: impl Into<std::path::PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            reader: BufReader::new(file),
        })
    }
}

impl Clone for FileByteSource {
    fn clone(&self) -> Self {
        FileByteSource::open(&self.path)
            .expect("FileByteSource::clone: failed to reopen backing file")
    }
}

impl ByteSource for FileByteSource {
    #[inline]
    fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.reader.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    #[inline]
    fn seek_to_byte(&mut self, byte_index: u64) -> std::io::Result<()> {
        self.reader.seek(SeekFrom::Start(byte_index))?;
        Ok(())
    }
}

/// A buffered, big-endian (MSB-first) bit reader over a [`ByteSource`].
///
/// Bits are kept in a 64-bit fill register, always left-aligned: the
/// next bit to be read is the top bit of `buffer`, and bits beyond
/// `valid_bits` are always zero. Refilling always tops the register back
/// up to a full byte window rather than one bit at a time.
#[derive(Clone)]
pub struct BitReader<S: ByteSource> {
    backend: S,
    buffer: u64,
    valid_bits: u8,
    /// Current absolute bit position in the stream (updated by reads and
    /// by `set_position`).
    bit_pos: u64,
    /// Monotonic count of bits consumed by read operations over the
    /// lifetime of this reader; unaffected by `set_position` itself.
    bits_read: u64,
    /// When set, reads past the end of the byte source yield zero bits
    /// forever instead of failing with `Eof`.
    overflow: bool,
}

impl<S: ByteSource> BitReader<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            buffer: 0,
            valid_bits: 0,
            bit_pos: 0,
            bits_read: 0,
            overflow: false,
        }
    }

    /// Enables (or disables) the overflow-tolerant EOF behavior used for
    /// speculative outdegree scans: once the byte source is exhausted,
    /// further reads see implicit zero bytes instead of failing.
    pub fn set_overflow(&mut self, overflow: bool) {
        self.overflow = overflow;
    }

    #[inline]
    fn refill(&mut self) -> Result<()> {
        while self.valid_bits <= 56 {
            match self.backend.read_byte()? {
                Some(byte) => {
                    self.buffer |= (byte as u64) << (56 - self.valid_bits);
                    self.valid_bits += 8;
                }
                None => {
                    if self.overflow {
                        self.valid_bits += 8;
                    } else {
                        return Err(Error::Eof);
                    }
                }
            }
        }
        Ok(())
    }

    /// Total bit position in the stream.
    #[inline]
    pub fn position(&self) -> u64 {
        self.bit_pos
    }

    /// Cumulative number of bits consumed by read operations since this
    /// reader was created. Not reset by `set_position`.
    #[inline]
    pub fn read_bits_count(&self) -> u64 {
        self.bits_read
    }

    /// Repositions the reader at an arbitrary bit offset, discarding the
    /// fill register.
    pub fn set_position(&mut self, bit_offset: u64) -> Result<()> {
        let byte_index = bit_offset / 8;
        let bit_in_byte = (bit_offset % 8) as u8;
        self.backend.seek_to_byte(byte_index)?;
        self.buffer = 0;
        self.valid_bits = 0;
        self.bit_pos = bit_offset;
        if bit_in_byte != 0 {
            self.refill()?;
            self.buffer <<= bit_in_byte;
            self.valid_bits -= bit_in_byte;
        }
        Ok(())
    }

    #[inline]
    fn consume(&mut self, n: u8) {
        if n == 64 {
            self.buffer = 0;
        } else {
            self.buffer <<= n;
        }
        self.valid_bits -= n;
        self.bit_pos += n as u64;
        self.bits_read += n as u64;
    }

    /// Reads a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<u32> {
        Ok(self.read_bits(1)? as u32)
    }

    /// Reads `n` bits (`n` in `[0, 32]`) and returns them as the low bits
    /// of the result, MSB first.
    pub fn read_bits(&mut self, n: u8) -> Result<u64> {
        debug_assert!(n <= 64);
        if n == 0 {
            return Ok(0);
        }
        if n > self.valid_bits {
            self.refill()?;
            if n > self.valid_bits {
                return Err(Error::Eof);
            }
        }
        let result = self.buffer >> (64 - n);
        self.consume(n);
        Ok(result)
    }

    /// Reads a unary code: the number of zero bits before the terminating one bit.
    pub fn read_unary(&mut self) -> Result<u64> {
        let mut result: u64 = 0;
        loop {
            if self.valid_bits == 0 {
                self.refill()?;
            }
            let zeros = (self.buffer.leading_zeros() as u8).min(self.valid_bits);
            if zeros < self.valid_bits {
                result += zeros as u64;
                self.consume(zeros + 1);
                return Ok(result);
            }
            result += self.valid_bits as u64;
            self.consume(self.valid_bits);
            self.refill()?;
        }
    }

    /// Reads an Elias γ code: `m = read_unary()`, then the low `m` bits,
    /// returning `bits + (1 << m) - 1`.
    pub fn read_gamma(&mut self) -> Result<u64> {
        let len = self.read_unary()?;
        if len >= 64 {
            return Err(Error::corrupt("gamma", "unary length too large"));
        }
        let bits = self.read_bits(len as u8)?;
        Ok(bits + (1u64 << len) - 1)
    }

    /// Reads an Elias δ code: `m = read_gamma()`, then the low `m` bits.
    pub fn read_delta(&mut self) -> Result<u64> {
        let len = self.read_gamma()?;
        if len >= 64 {
            return Err(Error::corrupt("delta", "gamma length too large"));
        }
        let bits = self.read_bits(len as u8)?;
        Ok(bits + (1u64 << len) - 1)
    }

    /// Reads an Elias ζ_k code.
    ///
    /// This is the minimal-binary decode of `x+1` restricted to the bucket
    /// `[2^(hk), 2^(hk+k))`: read the `hk+k-1`-bit low field; if it falls
    /// in the bucket's lower half the value is `2^(hk) + low`, otherwise
    /// one more bit is read and the full `hk+k`-bit value is `(low << 1) | bit`.
    pub fn read_zeta(&mut self, k: u32) -> Result<u64> {
        debug_assert!(k >= 1);
        let h = self.read_unary()?;
        let base = h * k as u64;
        if base + k as u64 - 1 >= 64 {
            return Err(Error::corrupt("zeta", "unary length too large"));
        }
        let low = self.read_bits((base + k as u64 - 1) as u8)?;
        let threshold = 1u64 << base;
        let value_plus_one = if low < threshold {
            threshold + low
        } else {
            let extra_bit = self.read_bits(1)?;
            (low << 1) | extra_bit
        };
        Ok(value_plus_one - 1)
    }

    /// Reads a variable-length nibble code: 4-bit blocks of
    /// `continuation-bit | 3 data bits`, continuation 0 except on the
    /// last block.
    pub fn read_nibble(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        loop {
            let block = self.read_bits(4)?;
            let cont = block >> 3;
            let data = block & 0b111;
            value = (value << 3) | data;
            if cont == 1 {
                break;
            }
        }
        // x = 0 is the special case of a single block with value 0,
        // continuation 1, which the loop above already decodes as 0.
        Ok(value)
    }

    /// Reads whichever code `code` names.
    pub fn read_code(&mut self, code: Code) -> Result<u64> {
        match code {
            Code::Unary => self.read_unary(),
            Code::Gamma => self.read_gamma(),
            Code::Delta => self.read_delta(),
            Code::Zeta { k } => self.read_zeta(k),
            Code::Nibble => self.read_nibble(),
        }
    }

    /// Advances past `bits` bits, returning the number actually skipped
    /// (less than `bits` only if the stream ends first and overflow mode
    /// is off, in which case an error is returned instead).
    pub fn skip(&mut self, bits: u64) -> Result<u64> {
        let mut remaining = bits;
        while remaining > 0 {
            let chunk = remaining.min(32) as u8;
            self.read_bits(chunk)?;
            remaining -= chunk as u64;
        }
        Ok(bits)
    }
}
