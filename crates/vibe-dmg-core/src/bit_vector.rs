use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

const CHUNK_BITS: usize = u32::BITS as usize;
const BYTES_PER_CHUNK: usize = CHUNK_BITS / 8;

/// Immutable bit string whose length is a positive multiple of 32.
///
/// Bit 0 is the least significant bit of the first chunk. Scanline planes use
/// bit `x` for pixel column `x`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitVector {
    chunks: Vec<u32>,
}

#[derive(Clone, Copy)]
enum Extension {
    Zero,
    Wrap,
}

fn check_size(size: usize) {
    assert!(
        size > 0 && size % CHUNK_BITS == 0,
        "bit vector size must be a positive multiple of 32, got {size}"
    );
}

impl BitVector {
    /// All-zero vector of `size` bits.
    pub fn new(size: usize) -> Self {
        Self::filled(size, false)
    }

    pub fn filled(size: usize, value: bool) -> Self {
        check_size(size);
        let fill = if value { u32::MAX } else { 0 };
        Self {
            chunks: vec![fill; size / CHUNK_BITS],
        }
    }

    pub fn size(&self) -> usize {
        self.chunks.len() * CHUNK_BITS
    }

    pub fn test_bit(&self, index: usize) -> bool {
        assert!(index < self.size(), "bit {index} out of range");
        self.chunks[index / CHUNK_BITS] & (1 << (index % CHUNK_BITS)) != 0
    }

    /// `size` bits starting at `start`; bits outside the vector read as 0.
    pub fn extract_zero_extended(&self, start: i32, size: usize) -> Self {
        check_size(size);
        self.extract(start, size, Extension::Zero)
    }

    /// `size` bits starting at `start`, treating the vector as a ring.
    pub fn extract_wrapped(&self, start: i32, size: usize) -> Self {
        check_size(size);
        self.extract(start, size, Extension::Wrap)
    }

    /// Moves bits towards higher indices for positive `distance`.
    pub fn shift(&self, distance: i32) -> Self {
        if distance == 0 {
            return self.clone();
        }
        // Anything past the size shifts every bit out
        let size = i32::try_from(self.size()).unwrap_or(i32::MAX);
        self.extract_zero_extended(-distance.clamp(-size, size), self.size())
    }

    fn chunk(&self, extension: Extension, index: i32) -> u32 {
        let len = self.chunks.len() as i32;
        match extension {
            Extension::Zero if (0..len).contains(&index) => self.chunks[index as usize],
            Extension::Zero => 0,
            Extension::Wrap => self.chunks[index.rem_euclid(len) as usize],
        }
    }

    fn extract(&self, start: i32, size: usize, extension: Extension) -> Self {
        let chunk_offset = start.div_euclid(CHUNK_BITS as i32);
        let bit_offset = start.rem_euclid(CHUNK_BITS as i32) as u32;
        let chunks = (0..(size / CHUNK_BITS) as i32)
            .map(|i| {
                let low = self.chunk(extension, chunk_offset + i);
                if bit_offset == 0 {
                    low
                } else {
                    let high = self.chunk(extension, chunk_offset + i + 1);
                    (high << (CHUNK_BITS as u32 - bit_offset)) | (low >> bit_offset)
                }
            })
            .collect();
        Self { chunks }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(u32, u32) -> u32) -> Self {
        assert_eq!(self.size(), other.size(), "bit vector sizes differ");
        Self {
            chunks: self
                .chunks
                .iter()
                .zip(&other.chunks)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }
}

impl Not for &BitVector {
    type Output = BitVector;

    fn not(self) -> BitVector {
        BitVector {
            chunks: self.chunks.iter().map(|c| !c).collect(),
        }
    }
}

impl BitAnd for &BitVector {
    type Output = BitVector;

    fn bitand(self, rhs: Self) -> BitVector {
        self.zip_with(rhs, |a, b| a & b)
    }
}

impl BitOr for &BitVector {
    type Output = BitVector;

    fn bitor(self, rhs: Self) -> BitVector {
        self.zip_with(rhs, |a, b| a | b)
    }
}

impl fmt::Display for BitVector {
    /// Most significant bit first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.chunks.iter().rev() {
            write!(f, "{chunk:032b}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector({self})")
    }
}

/// Byte-wise builder. Byte `i` covers bits `8*i .. 8*i + 8`.
pub struct BitVectorBuilder {
    chunks: Vec<u32>,
}

impl BitVectorBuilder {
    pub fn new(size: usize) -> Self {
        check_size(size);
        Self {
            chunks: vec![0; size / CHUNK_BITS],
        }
    }

    pub fn set_byte(&mut self, index: usize, value: u8) -> &mut Self {
        assert!(
            index < self.chunks.len() * BYTES_PER_CHUNK,
            "byte {index} out of range"
        );
        let shift = (index % BYTES_PER_CHUNK) * 8;
        let chunk = &mut self.chunks[index / BYTES_PER_CHUNK];
        *chunk = (*chunk & !(0xFF << shift)) | (u32::from(value) << shift);
        self
    }

    pub fn build(self) -> BitVector {
        BitVector {
            chunks: self.chunks,
        }
    }
}
