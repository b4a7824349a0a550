use bitstep::{
    bit_reader::BitReader,
    builder::SpecBuilder,
    errors::{DecodeError, ReadError},
    spec::Spec,
    step::Guard,
};
use proptest::prelude::*;

/// Reference MSB-first extraction, one bit at a time.
fn bits_at(data: &[u8], bit_pos: usize, n: usize) -> u64 {
    (bit_pos..bit_pos + n).fold(0u64, |acc, pos| {
        (acc << 1) | ((data[pos / 8] >> (7 - pos % 8)) & 1) as u64
    })
}

proptest! {
    #[test]
    fn read_many_bits_matches_reference(
        data in prop::collection::vec(any::<u8>(), 8),
        skip in 0usize..8,
        n in 0usize..=48,
    ) {
        let mut reader = BitReader::new(&data);
        reader.read_few_bits(skip.min(6)).unwrap();
        reader.read_few_bits(skip - skip.min(6)).unwrap();

        prop_assert_eq!(reader.read_many_bits(n).unwrap(), bits_at(&data, skip, n));
        prop_assert_eq!(reader.byte_index(), (skip + n) / 8);
        prop_assert_eq!(reader.bit_index() as usize, (skip + n) % 8);
    }

    #[test]
    fn completing_the_byte_reproduces_it(
        data in prop::collection::vec(any::<u8>(), 7),
        n in 1usize..=48,
    ) {
        let pad = (8 - n % 8) % 8;

        let mut reader = BitReader::new(&data);
        let head = reader.read_many_bits(n).unwrap();
        let tail = reader.read_bits(pad).unwrap() as u64;

        prop_assert_eq!(reader.bit_index(), 0);

        let bytes = (n + pad) / 8;
        let expected = data[..bytes].iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
        prop_assert_eq!((head << pad) | tail, expected);
    }

    #[test]
    fn read_byte_from_boundary_stays_aligned(data in prop::collection::vec(any::<u8>(), 1..16)) {
        let mut reader = BitReader::new(&data);
        for &byte in &data {
            prop_assert_eq!(reader.read_byte().unwrap(), byte);
            prop_assert_eq!(reader.bit_index(), 0);
        }
        prop_assert!(reader.is_exhausted());
    }

    #[test]
    fn read_byte_always_realigns(
        data in prop::collection::vec(any::<u8>(), 3),
        skip in 0usize..=6,
    ) {
        let mut reader = BitReader::new(&data);
        reader.read_few_bits(skip).unwrap();

        prop_assert_eq!(reader.read_byte().unwrap() as u64, bits_at(&data, skip, 8));
        prop_assert_eq!(reader.bit_index(), 0);
        prop_assert_eq!(reader.byte_index(), if skip == 0 { 1 } else { 2 });
    }

    #[test]
    fn finish_byte_is_idempotent(
        data in prop::collection::vec(any::<u8>(), 2..8),
        n in 0usize..=6,
    ) {
        let mut once = BitReader::new(&data);
        once.read_few_bits(n).unwrap();
        once.finish_byte().unwrap();

        let mut twice = BitReader::new(&data);
        twice.read_few_bits(n).unwrap();
        twice.finish_byte().unwrap();
        twice.finish_byte().unwrap();

        prop_assert_eq!(once.byte_index(), twice.byte_index());
        prop_assert_eq!(once.bit_index(), twice.bit_index());
        prop_assert_eq!(once.byte_index(), if n == 0 { 0 } else { 1 });
    }

    #[test]
    fn next_byte_match_only_moves_on_match(
        data in prop::collection::vec(any::<u8>(), 1..8),
        expected in any::<u8>(),
    ) {
        let mut reader = BitReader::new(&data);
        let matched = reader.is_next_byte_match(expected).unwrap();

        prop_assert_eq!(matched, data[0] == expected);
        prop_assert_eq!(reader.byte_index(), if matched { 1 } else { 0 });
        prop_assert_eq!(reader.bit_index(), 0);
    }

    #[test]
    fn exhaustion_is_permanent(
        data in prop::collection::vec(any::<u8>(), 0..4),
        extra in 1usize..8,
    ) {
        let mut reader = BitReader::new(&data);
        let first = reader.read_bits((data.len() * 8 + extra).min(24));

        if data.len() * 8 + extra <= 24 {
            prop_assert!(first.is_err());
        }
        prop_assert!(reader.read_bit().is_err());
        prop_assert!(reader.read_bit().is_err());
        prop_assert!(!reader.is_next_byte_match(0).unwrap());
    }
}

#[test]
fn guarded_field_is_absent_not_null() {
    let spec = Spec::define(|b| {
        b.field_if("skipped", Guard::reader(|_| Ok(false)), |r, _| Ok(r.read_byte()?))
            .field("kept", |r, _| Ok(r.read_byte()?));
    });

    let tree = spec.decode(&[5]).unwrap();
    assert!(tree.get("skipped").is_none());
    assert_eq!(tree.len(), 1);
}

#[test]
fn third_step_never_runs_after_stop() {
    let spec = Spec::define(|b| {
        b.field("first", |r, _| Ok(r.read_byte()?))
            .should_continue(|_, _| Ok(false))
            .special(|_, tree| {
                tree.put("side_effect", true);
                Ok(())
            });
    });

    let tree = spec.decode(&[1, 2]).unwrap();
    assert!(!tree.contains_key("side_effect"));
}

#[test]
fn copies_do_not_leak_into_each_other() {
    let mut base = SpecBuilder::new();
    base.field("a", |r, _| Ok(r.read_bit()?));

    let mut variant = base.copy();
    variant.field("b", |r, _| Ok(r.read_bit()?));
    base.field("c", |r, _| Ok(r.read_bit()?));

    let base_tree = base.build().decode(&[0]).unwrap();
    let variant_tree = variant.build().decode(&[0]).unwrap();
    assert_eq!(base_tree.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    assert_eq!(variant_tree.keys().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[test]
fn running_off_the_end_fails_the_decode() {
    let spec = Spec::define(|b| {
        b.field("wide", |r, _| Ok(r.read_bits(24)?));
    });

    assert_eq!(
        spec.decode(&[1, 2]),
        Err(DecodeError::Read(ReadError::Exhausted))
    );
    assert!(matches!(
        spec.decode_at(&[1, 2, 3], 1),
        Err(DecodeError::Read(ReadError::Exhausted))
    ));
}

#[test]
fn mid_byte_overrun_is_out_of_bounds() {
    let spec = Spec::define(|b| {
        b.field("nibble", |r, _| Ok(r.read_few_bits(4)?))
            .field("byte", |r, _| Ok(r.read_byte()?));
    });

    assert!(matches!(
        spec.decode(&[0xFF]),
        Err(DecodeError::Read(ReadError::OutOfBounds { .. }))
    ));
}

#[test]
fn length_prefix_larger_than_buffer_fails_cleanly() {
    let spec = Spec::define(|b| {
        b.field("len", |r, _| Ok(r.read_many_bits(48)?))
            .field("payload", |r, tree| {
                let len = tree.get("len").and_then(|v| v.as_u64()).unwrap_or(0);
                Ok(r.read_bytes(len as usize)?)
            });
    });

    assert_eq!(
        spec.decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 1, 2]),
        Err(DecodeError::Read(ReadError::OutOfBounds {
            byte_index: 6,
            requested: 0xFFFF_FFFF_FFFF,
            available: 2,
        }))
    );
}

#[test]
fn discarding_past_the_end_fails_cleanly() {
    let spec = Spec::define(|b| {
        b.discard_bytes(|_, _| Ok(usize::MAX));
    });

    assert!(matches!(
        spec.decode(&[1, 2]),
        Err(DecodeError::Read(ReadError::OutOfBounds { available: 2, .. }))
    ));
}
