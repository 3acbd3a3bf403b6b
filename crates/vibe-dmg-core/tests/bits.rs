use vibe_dmg_core::bit_vector::{BitVector, BitVectorBuilder};

fn vector(bytes: &[(usize, u8)], size: usize) -> BitVector {
    let mut b = BitVectorBuilder::new(size);
    for &(i, v) in bytes {
        b.set_byte(i, v);
    }
    b.build()
}

#[test]
fn shifting_back_restores_interior_bits() {
    // Nothing within 24 bits of either edge, so no shift below drops a bit
    let v = vector(&[(3, 0xA5), (4, 0x3C), (8, 0x81), (12, 0xFF)], 128);
    for d in -24..=24 {
        assert_eq!(v.shift(d).shift(-d), v, "shift by {d}");
    }
}

#[test]
fn shifting_drops_bits_past_the_edge() {
    let v = vector(&[(0, 0x01), (7, 0x80)], 64);
    assert!(!v.shift(1).test_bit(0));
    assert!(v.shift(1).test_bit(1));
    assert!(!v.shift(1).test_bit(63));
    assert_eq!(v.shift(64), BitVector::new(64));
    assert_eq!(v.shift(-64), BitVector::new(64));
}

#[test]
fn shifting_by_extreme_distances_clears_everything() {
    let v = vector(&[(0, 0xFF), (7, 0xFF)], 64);
    assert_eq!(v.shift(i32::MIN), BitVector::new(64));
    assert_eq!(v.shift(i32::MAX), BitVector::new(64));
    assert_eq!(v.shift(-1000), BitVector::new(64));
}

#[test]
fn wrapped_extraction_is_periodic() {
    let v = vector(&[(0, 0x12), (2, 0xF0), (5, 0x0F), (7, 0x99)], 64);
    assert_eq!(v.extract_wrapped(0, 64), v);
    for start in -70..70 {
        assert_eq!(
            v.extract_wrapped(start, 64),
            v.extract_wrapped(start + 64, 64),
            "start {start}"
        );
        let out = v.extract_wrapped(start, 32);
        for i in 0..32 {
            let src = (start + i as i32).rem_euclid(64) as usize;
            assert_eq!(out.test_bit(i), v.test_bit(src));
        }
    }
}

#[test]
fn zero_extension_outside_the_vector() {
    let v = BitVector::filled(32, true);
    let out = v.extract_zero_extended(-16, 64);
    for i in 0..64 {
        assert_eq!(out.test_bit(i), (16..48).contains(&i), "bit {i}");
    }
}

#[test]
fn logic_operators() {
    let a = vector(&[(0, 0b1100)], 32);
    let b = vector(&[(0, 0b1010)], 32);
    assert_eq!(&a & &b, vector(&[(0, 0b1000)], 32));
    assert_eq!(&a | &b, vector(&[(0, 0b1110)], 32));
    assert_eq!(!&BitVector::new(32), BitVector::filled(32, true));
}

#[test]
fn displays_most_significant_bit_first() {
    let v = vector(&[(0, 0x01), (3, 0x80)], 32);
    let text = v.to_string();
    assert_eq!(text.len(), 32);
    assert!(text.starts_with('1'));
    assert!(text.ends_with('1'));
    assert_eq!(text.matches('1').count(), 2);
}
