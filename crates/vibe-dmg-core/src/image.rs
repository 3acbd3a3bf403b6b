use crate::bit_vector::{BitVector, BitVectorBuilder};

/// Palette that leaves every color index in place.
const IDENTITY_PALETTE: u8 = 0b11_10_01_00;

/// One scanline as three bit planes: color msb, color lsb and opacity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageLine {
    msb: BitVector,
    lsb: BitVector,
    opacity: BitVector,
}

impl ImageLine {
    pub fn new(msb: BitVector, lsb: BitVector, opacity: BitVector) -> Self {
        assert!(
            msb.size() == lsb.size() && lsb.size() == opacity.size(),
            "image line planes differ in width"
        );
        Self { msb, lsb, opacity }
    }

    /// Fully transparent line of color 0.
    pub fn empty(width: usize) -> Self {
        let zero = BitVector::new(width);
        Self::new(zero.clone(), zero.clone(), zero)
    }

    pub fn size(&self) -> usize {
        self.msb.size()
    }

    pub fn msb(&self) -> &BitVector {
        &self.msb
    }

    pub fn lsb(&self) -> &BitVector {
        &self.lsb
    }

    pub fn opacity(&self) -> &BitVector {
        &self.opacity
    }

    pub fn shift(&self, distance: i32) -> Self {
        Self {
            msb: self.msb.shift(distance),
            lsb: self.lsb.shift(distance),
            opacity: self.opacity.shift(distance),
        }
    }

    pub fn extract_wrapped(&self, start: i32, size: usize) -> Self {
        Self {
            msb: self.msb.extract_wrapped(start, size),
            lsb: self.lsb.extract_wrapped(start, size),
            opacity: self.opacity.extract_wrapped(start, size),
        }
    }

    /// Remap color indices through a DMG palette byte (2 bits per index).
    /// Opacity is left untouched.
    pub fn map_colors(&self, palette: u8) -> Self {
        if palette == IDENTITY_PALETTE {
            return self.clone();
        }

        let msb_inv = !&self.msb;
        let lsb_inv = !&self.lsb;
        let mut msb = BitVector::new(self.size());
        let mut lsb = BitVector::new(self.size());

        for color in 0..4 {
            let target = (palette >> (2 * color)) & 0b11;
            if target == 0 {
                continue;
            }
            let m = if color & 0b10 != 0 { &self.msb } else { &msb_inv };
            let l = if color & 0b01 != 0 { &self.lsb } else { &lsb_inv };
            let pixels = m & l;
            if target & 0b01 != 0 {
                lsb = &lsb | &pixels;
            }
            if target & 0b10 != 0 {
                msb = &msb | &pixels;
            }
        }

        Self {
            msb,
            lsb,
            opacity: self.opacity.clone(),
        }
    }

    /// Layer `above` on top of `self` wherever `above` is opaque.
    pub fn below(&self, above: &Self) -> Self {
        self.below_with(above, &above.opacity)
    }

    /// Layer `above` on top of `self` wherever `mask` is set.
    pub fn below_with(&self, above: &Self, mask: &BitVector) -> Self {
        assert_eq!(self.size(), above.size(), "image line widths differ");
        let keep = !mask;
        let pick = |under: &BitVector, over: &BitVector| &(under & &keep) | &(over & mask);
        Self {
            msb: pick(&self.msb, &above.msb),
            lsb: pick(&self.lsb, &above.lsb),
            opacity: &self.opacity | mask,
        }
    }

    /// Pixels below `first_bit` come from `self`, the rest from `other`.
    pub fn join(&self, other: &Self, first_bit: usize) -> Self {
        assert_eq!(self.size(), other.size(), "image line widths differ");
        assert!(first_bit <= self.size(), "join point {first_bit} out of range");

        let other_mask = BitVector::filled(self.size(), true).shift(first_bit as i32);
        let self_mask = !&other_mask;
        let pick = |mine: &BitVector, theirs: &BitVector| {
            &(mine & &self_mask) | &(theirs & &other_mask)
        };
        Self {
            msb: pick(&self.msb, &other.msb),
            lsb: pick(&self.lsb, &other.lsb),
            opacity: pick(&self.opacity, &other.opacity),
        }
    }
}

/// Assembles a line from tile bytes; opacity is derived from the colors.
pub struct ImageLineBuilder {
    msb: BitVectorBuilder,
    lsb: BitVectorBuilder,
}

impl ImageLineBuilder {
    pub fn new(width: usize) -> Self {
        Self {
            msb: BitVectorBuilder::new(width),
            lsb: BitVectorBuilder::new(width),
        }
    }

    pub fn set_bytes(&mut self, index: usize, msb: u8, lsb: u8) -> &mut Self {
        self.msb.set_byte(index, msb);
        self.lsb.set_byte(index, lsb);
        self
    }

    pub fn build(self) -> ImageLine {
        let msb = self.msb.build();
        let lsb = self.lsb.build();
        let opacity = &msb | &lsb;
        ImageLine::new(msb, lsb, opacity)
    }
}

/// A completed frame of 2-bit color indices.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Image {
    width: usize,
    height: usize,
    lines: Vec<ImageLine>,
}

impl Image {
    pub fn new(width: usize, height: usize, lines: Vec<ImageLine>) -> Self {
        assert!(width > 0 && height > 0, "image must not be empty");
        assert_eq!(lines.len(), height, "line count does not match height");
        assert!(
            lines.iter().all(|l| l.size() == width),
            "line width does not match image width"
        );
        Self {
            width,
            height,
            lines,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Color index (0..=3) of pixel `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of range");
        let line = &self.lines[y];
        (u8::from(line.msb.test_bit(x)) << 1) | u8::from(line.lsb.test_bit(x))
    }
}

pub struct ImageBuilder {
    width: usize,
    lines: Vec<ImageLine>,
}

impl ImageBuilder {
    /// Starts with every line empty.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "image must not be empty");
        Self {
            width,
            lines: vec![ImageLine::empty(width); height],
        }
    }

    pub fn set_line(&mut self, y: usize, line: ImageLine) -> &mut Self {
        assert!(y < self.lines.len(), "line {y} out of range");
        assert_eq!(line.size(), self.width, "line width does not match image width");
        self.lines[y] = line;
        self
    }

    pub fn build(&self) -> Image {
        Image::new(self.width, self.lines.len(), self.lines.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(msb: u8, lsb: u8) -> ImageLine {
        let mut b = ImageLineBuilder::new(32);
        b.set_bytes(0, msb, lsb);
        b.build()
    }

    fn colors(l: &ImageLine) -> Vec<u8> {
        (0..8)
            .map(|x| (u8::from(l.msb().test_bit(x)) << 1) | u8::from(l.lsb().test_bit(x)))
            .collect()
    }

    #[test]
    fn builder_opacity_is_nonzero_color() {
        let l = line(0b1100, 0b1010);
        assert_eq!(colors(&l), [0, 1, 2, 3, 0, 0, 0, 0]);
        assert!(!l.opacity().test_bit(0));
        assert!(l.opacity().test_bit(1));
        assert!(l.opacity().test_bit(3));
    }

    #[test]
    fn map_colors_applies_palette() {
        let l = line(0b1100, 0b1010);
        // 0 -> 3, 1 -> 2, 2 -> 1, 3 -> 0
        let mapped = l.map_colors(0b00_01_10_11);
        assert_eq!(colors(&mapped), [3, 2, 1, 0, 3, 3, 3, 3]);
        assert_eq!(mapped.opacity(), l.opacity());
        assert_eq!(l.map_colors(IDENTITY_PALETTE), l);
    }

    #[test]
    fn below_respects_opacity() {
        let bg = line(0xFF, 0x00);
        let fg = line(0x00, 0x0F);
        let out = bg.below(&fg);
        assert_eq!(colors(&out), [1, 1, 1, 1, 2, 2, 2, 2]);
        assert!(out.opacity().test_bit(7));
    }

    #[test]
    fn join_switches_source_at_boundary() {
        let a = line(0xFF, 0xFF);
        let b = line(0x00, 0x00);
        let j = a.join(&b, 3);
        assert_eq!(colors(&j), [3, 3, 3, 0, 0, 0, 0, 0]);
        assert!(!j.opacity().test_bit(5));
    }

    #[test]
    fn image_reads_pixels() {
        let mut b = ImageBuilder::new(32, 2);
        b.set_line(1, line(0b10, 0b11));
        let img = b.build();
        assert_eq!(img.get(0, 1), 1);
        assert_eq!(img.get(1, 1), 3);
        assert_eq!(img.get(1, 0), 0);
    }
}
