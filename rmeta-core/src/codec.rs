//! The optimistic binary codec: record encoding with bitmap-skipped default
//! members, class-header chains for schema evolution, and polymorphic
//! pointer dispatch, built on top of [`crate::varint`] and [`crate::float8`]
//! for the primitive wire forms.
//!
//! Encoding never fails: every quantity it needs (presence bits, lengths,
//! byte views) is derived from an already-valid value, so the only way
//! [`write_binary`] can return an error is if the caller's sink itself
//! fails. Decoding is the fallible half — the wire has no in-band recovery,
//! matching the "optimistic" contract in the crate's design notes.

use std::io::{Read, Write};

use crate::descriptor::{Category, Descriptor, ScalarKind};
use crate::error::{Error, Result};
use crate::float8;
use crate::member::{
    all_members, bitmap_width_bits, current_headers, ClassHeader, ClassHeaderList, FlatMember,
};
use crate::reader::BinaryReader;
use crate::registry::{lookup_by_hash, Reflected};
use crate::typed_ref::{TypedRef, TypedRefMut};
use crate::varint;
use crate::writer::BinaryWriter;

/// Serializes `value` into `sink` using the optimistic binary format.
///
/// Internally this buffers the whole encoding in memory (the bitmap
/// forward-seek trick needs a seekable backing store) and flushes it to the
/// caller's sink in a single write, exactly as described for non-seekable
/// sinks in the crate's design notes.
pub fn write_binary<T: Reflected>(sink: &mut impl Write, value: &T) -> Result<()> {
    let mut writer = BinaryWriter::new();
    encode_value(&mut writer, TypedRef::new(value));
    sink.write_all(writer.as_slice())?;
    Ok(())
}

/// Deserializes a `T` previously written by [`write_binary`].
///
/// `source` is read to exhaustion up front; the optimistic codec has no
/// framing of its own, so a top-level call always consumes one whole value
/// from the start of the stream.
pub fn read_binary<T: Reflected + Default>(source: &mut impl Read) -> Result<T> {
    let mut buf = Vec::new();
    source.read_to_end(&mut buf)?;
    let mut reader = BinaryReader::new(&buf);
    let mut value = T::default();
    decode_value(&mut reader, TypedRefMut::new(&mut value))?;
    Ok(value)
}

fn encode_value(w: &mut BinaryWriter, r: TypedRef<'_>) {
    match r.category() {
        Category::Scalar(kind) => encode_scalar(w, *kind, r.bytes()),
        Category::String(ops) => {
            let view = (ops.get_view)(r.bytes());
            varint::write_u32(w, view.len() as u32);
            w.write(view);
        }
        Category::Enum(ops) => varint::write_i32(w, (ops.to_int)(r.bytes())),
        Category::DynSeq(ops) => {
            varint::write_u32(w, (ops.len)(r.bytes()) as u32);
            for elem in (ops.iter)(r.bytes()) {
                encode_value(w, elem);
            }
        }
        Category::FixSeq(ops) => {
            for elem in (ops.iter)(r.bytes()) {
                encode_value(w, elem);
            }
        }
        Category::Set(ops) => {
            varint::write_u32(w, (ops.len)(r.bytes()) as u32);
            for elem in (ops.iter)(r.bytes()) {
                encode_value(w, elem);
            }
        }
        Category::Map(ops) => {
            varint::write_u32(w, (ops.len)(r.bytes()) as u32);
            for (key, value) in (ops.iter)(r.bytes()) {
                encode_value(w, key);
                encode_value(w, value);
            }
        }
        Category::Record(_) => encode_record(w, r),
        Category::OwningPtrRecord(ops) => match (ops.as_pointer)(r.bytes()) {
            None => write_hash(w, 0),
            Some(target) => encode_record(w, target),
        },
        Category::TypeErased(ops) => match (ops.target)(r.bytes()) {
            None => write_hash(w, 0),
            Some(target) => encode_record(w, target),
        },
    }
}

/// Writes a record's `[header list][presence bitmap][present bodies]`.
///
/// The header list is just `current_headers(descriptor)` flattened onto the
/// wire — the same depth-first traversal the reader reconstructs in
/// [`read_header_entry`], so there is no separate "write the header tree"
/// logic to keep in sync.
fn encode_record(w: &mut BinaryWriter, r: TypedRef<'_>) {
    let descriptor = r.descriptor();
    let headers = current_headers(descriptor);
    for header in &headers.0 {
        write_hash(w, header.name_hash);
        w.write_u8(header.version as u8);
    }
    let flat = all_members(descriptor, &headers);
    encode_record_body(w, r, flat);
}

/// Writes a class-header/dispatch name hash as a raw 4-byte little-endian
/// value, not a varint — dispatch keys are fixed-width in the original
/// protocol (`metafast.hpp`'s `pointer_to_base_specialization`,
/// `optimistic_binary.cpp`'s `simple_to_binary`), unlike scalar data, which
/// is varint-compressed.
fn write_hash(w: &mut BinaryWriter, hash: u32) {
    w.write(&hash.to_le_bytes());
}

/// Reads a raw 4-byte little-endian name hash; see [`write_hash`].
fn read_hash(reader: &mut BinaryReader, context: &'static str) -> Result<u32> {
    Ok(u32::from_le_bytes(reader.read_array::<4>(context)?))
}

fn encode_record_body(w: &mut BinaryWriter, r: TypedRef<'_>, flat: &'static [FlatMember]) {
    let width_bits = bitmap_width_bits(flat.len());
    let width_bytes = (width_bits / 8) as usize;
    let mark = w.reserve(width_bytes);

    let mut bitmap: u64 = 0;
    for (i, flat_member) in flat.iter().enumerate() {
        let member = flat_member.member;
        let member_descriptor = (member.descriptor)();
        let sub = &r.bytes()[flat_member.offset..flat_member.offset + member_descriptor.size];

        let present = match member.condition {
            Some(predicate) => predicate(r.bytes()),
            None if cfg!(feature = "skip-default-members") => !(member.is_default)(sub),
            None => true,
        };
        if !present {
            continue;
        }
        bitmap |= 1u64 << i;
        // SAFETY: `sub` is exactly `flat_member.offset..+size` within the
        // record `r` was constructed from, which invariant 5 guarantees is a
        // valid sub-slice for `member_descriptor`'s type.
        let member_ref = unsafe { TypedRef::from_raw(member_descriptor, sub) };
        encode_value(w, member_ref);
    }

    let bitmap_bytes = bitmap.to_le_bytes();
    w.patch(mark, &bitmap_bytes[..width_bytes]);
}

fn decode_value(reader: &mut BinaryReader, mut target: TypedRefMut<'_>) -> Result<()> {
    let descriptor = target.descriptor();
    match &descriptor.category {
        Category::Scalar(kind) => decode_scalar(reader, *kind, target.bytes_mut())?,
        Category::String(ops) => {
            let len = varint::read_u32(reader)? as usize;
            let bytes = reader.read_exact(len, "string body")?;
            (ops.set_from_view)(target.bytes_mut(), bytes);
        }
        Category::Enum(ops) => {
            let value = varint::read_i32(reader)?;
            (ops.from_int)(target.bytes_mut(), value);
        }
        Category::DynSeq(ops) => {
            let count = varint::read_u32(reader)? as usize;
            for _ in 0..count {
                let mut failure = None;
                (ops.push_default)(target.bytes_mut(), &mut |slot| {
                    if let Err(err) = decode_value(reader, slot) {
                        failure = Some(err);
                    }
                });
                if let Some(err) = failure {
                    return Err(err);
                }
            }
        }
        Category::FixSeq(ops) => {
            for slot in (ops.iter_mut)(target.bytes_mut()) {
                decode_value(reader, slot)?;
            }
        }
        Category::Set(ops) => {
            let count = varint::read_u32(reader)? as usize;
            for _ in 0..count {
                let mut failure = None;
                (ops.insert_default)(target.bytes_mut(), &mut |slot| {
                    if let Err(err) = decode_value(reader, slot) {
                        failure = Some(err);
                    }
                });
                if let Some(err) = failure {
                    return Err(err);
                }
            }
        }
        Category::Map(ops) => {
            let count = varint::read_u32(reader)? as usize;
            for _ in 0..count {
                let mut failure = None;
                (ops.insert_default)(
                    target.bytes_mut(),
                    &mut |slot| {
                        if let Err(err) = decode_value(reader, slot) {
                            failure = Some(err);
                        }
                    },
                    &mut |slot| {
                        if let Err(err) = decode_value(reader, slot) {
                            failure = Some(err);
                        }
                    },
                );
                if let Some(err) = failure {
                    return Err(err);
                }
            }
        }
        Category::Record(_) => {
            let headers = read_header_list(reader)?;
            decode_record_body(reader, &mut target, descriptor, &headers)?;
        }
        Category::OwningPtrRecord(ops) => {
            let hash = read_hash(reader, "owning pointer dispatch hash")?;
            if hash == 0 {
                (ops.clear)(target.bytes_mut());
            } else {
                let mut entries = Vec::new();
                read_header_entry(reader, hash, &mut entries)?;
                let headers = ClassHeaderList(entries);
                let dynamic = lookup_by_hash(hash).expect("validated by read_header_entry");
                let mut member_target = (ops.assign_new)(target.bytes_mut(), dynamic);
                decode_record_body(reader, &mut member_target, dynamic, &headers)?;
            }
        }
        Category::TypeErased(ops) => {
            let hash = read_hash(reader, "type-erased dispatch hash")?;
            if hash == 0 {
                (ops.clear)(target.bytes_mut());
            } else {
                let mut entries = Vec::new();
                read_header_entry(reader, hash, &mut entries)?;
                let headers = ClassHeaderList(entries);
                let dynamic = lookup_by_hash(hash).expect("validated by read_header_entry");
                let mut member_target = (ops.assign_new)(target.bytes_mut(), dynamic);
                decode_record_body(reader, &mut member_target, dynamic, &headers)?;
            }
        }
    }
    Ok(())
}

/// Reads a record's full `ClassHeaderList` starting from a fresh name hash
/// on the wire (used for embedded, non-polymorphic record fields, where the
/// hash is expected but not yet known to be valid).
fn read_header_list(reader: &mut BinaryReader) -> Result<ClassHeaderList> {
    let hash = read_hash(reader, "record header hash")?;
    let mut entries = Vec::new();
    read_header_entry(reader, hash, &mut entries)?;
    Ok(ClassHeaderList(entries))
}

/// Reads one `(name, version)` header whose hash has already been taken off
/// the wire, then recurses depth-first into its direct bases — reading each
/// base's own hash in turn — mirroring [`crate::member::current_headers`]'s
/// write-side traversal exactly.
fn read_header_entry(reader: &mut BinaryReader, hash: u32, out: &mut Vec<ClassHeader>) -> Result<()> {
    let descriptor = lookup_by_hash(hash).ok_or(Error::UnknownRecord { hash })?;
    let ops = descriptor
        .as_record()
        .ok_or(Error::UnknownRecord { hash })?;
    let version = reader.read_i8("class header version")?;
    if version > ops.current_version {
        return Err(Error::FutureVersion {
            name: ops.name,
            written: version,
            current: ops.current_version,
        });
    }
    out.push(ClassHeader {
        name_hash: hash,
        version,
    });
    let info = (ops.info)(version);
    for base in &info.bases {
        let base_hash = read_hash(reader, "base header hash")?;
        read_header_entry(reader, base_hash, out)?;
    }
    Ok(())
}

fn decode_record_body(
    reader: &mut BinaryReader,
    target: &mut TypedRefMut<'_>,
    descriptor: &'static Descriptor,
    headers: &ClassHeaderList,
) -> Result<()> {
    let flat = all_members(descriptor, headers);
    let width_bits = bitmap_width_bits(flat.len());
    let bitmap = read_bitmap(reader, width_bits)?;

    for (i, flat_member) in flat.iter().enumerate() {
        let member = flat_member.member;
        let present_bit = (bitmap >> i) & 1 == 1;

        let present = match member.condition {
            Some(predicate) => {
                let holds = predicate(target.bytes());
                if holds != present_bit {
                    return Err(Error::PredicateDisagreement {
                        record: descriptor.type_name,
                        member: member.name,
                    });
                }
                holds
            }
            None => present_bit,
        };
        if !present {
            continue;
        }

        let member_descriptor = (member.descriptor)();
        let start = flat_member.offset;
        let end = start + member_descriptor.size;
        let sub = &mut target.bytes_mut()[start..end];
        // SAFETY: see `encode_record_body`; the same offset arithmetic
        // produced a valid member sub-slice on the write side.
        let member_ref = unsafe { TypedRefMut::from_raw(member_descriptor, sub) };
        decode_value(reader, member_ref)?;
    }
    Ok(())
}

fn read_bitmap(reader: &mut BinaryReader, width_bits: u32) -> Result<u64> {
    Ok(match width_bits {
        8 => reader.read_u8("member bitmap")? as u64,
        16 => u16::from_le_bytes(reader.read_array::<2>("member bitmap")?) as u64,
        32 => u32::from_le_bytes(reader.read_array::<4>("member bitmap")?) as u64,
        _ => u64::from_le_bytes(reader.read_array::<8>("member bitmap")?),
    })
}

fn encode_scalar(w: &mut BinaryWriter, kind: ScalarKind, bytes: &[u8]) {
    match kind {
        ScalarKind::Bool => w.write_u8(read_native::<bool>(bytes) as u8),
        ScalarKind::I8 => w.write_u8(read_native::<i8>(bytes) as u8),
        ScalarKind::U8 => w.write_u8(read_native::<u8>(bytes)),
        ScalarKind::I16 => w.write(&read_native::<i16>(bytes).to_le_bytes()),
        ScalarKind::U16 => w.write(&read_native::<u16>(bytes).to_le_bytes()),
        ScalarKind::F64 => w.write(&read_native::<f64>(bytes).to_le_bytes()),
        ScalarKind::Char => w.write(&(read_native::<char>(bytes) as u32).to_le_bytes()),
        ScalarKind::I32 => varint::write_i32(w, read_native::<i32>(bytes)),
        ScalarKind::U32 => varint::write_u32(w, read_native::<u32>(bytes)),
        ScalarKind::I64 => varint::write_i64(w, read_native::<i64>(bytes)),
        ScalarKind::U64 => varint::write_u64(w, read_native::<u64>(bytes)),
        ScalarKind::F32 => float8::write_f32(w, read_native::<f32>(bytes)),
    }
}

fn decode_scalar(reader: &mut BinaryReader, kind: ScalarKind, bytes: &mut [u8]) -> Result<()> {
    match kind {
        ScalarKind::Bool => write_native(bytes, reader.read_u8("bool")? != 0),
        ScalarKind::I8 => write_native(bytes, reader.read_i8("i8")?),
        ScalarKind::U8 => write_native(bytes, reader.read_u8("u8")?),
        ScalarKind::I16 => write_native(bytes, i16::from_le_bytes(reader.read_array::<2>("i16")?)),
        ScalarKind::U16 => write_native(bytes, u16::from_le_bytes(reader.read_array::<2>("u16")?)),
        ScalarKind::F64 => write_native(bytes, f64::from_le_bytes(reader.read_array::<8>("f64")?)),
        ScalarKind::Char => {
            let code = u32::from_le_bytes(reader.read_array::<4>("char")?);
            write_native(bytes, char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
        ScalarKind::I32 => write_native(bytes, varint::read_i32(reader)?),
        ScalarKind::U32 => write_native(bytes, varint::read_u32(reader)?),
        ScalarKind::I64 => write_native(bytes, varint::read_i64(reader)?),
        ScalarKind::U64 => write_native(bytes, varint::read_u64(reader)?),
        ScalarKind::F32 => write_native(bytes, float8::read_f32(reader)?),
    }
    Ok(())
}

fn read_native<T: Copy>(bytes: &[u8]) -> T {
    debug_assert_eq!(bytes.len(), std::mem::size_of::<T>());
    // SAFETY: caller-supplied `bytes` is exactly `size_of::<T>()` long and
    // holds a valid `T` (it came from a `TypedRef` of the matching scalar
    // kind).
    unsafe { *bytes.as_ptr().cast::<T>() }
}

fn write_native<T>(bytes: &mut [u8], value: T) {
    debug_assert_eq!(bytes.len(), std::mem::size_of::<T>());
    // SAFETY: same contract as `read_native`, mirrored for writes.
    unsafe { *bytes.as_mut_ptr().cast::<T>() = value };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reflect;

    #[test]
    fn s3_dyn_seq_of_i32_matches_spec_bytes() {
        let v: Vec<i32> = vec![1, 2, 3];
        let mut buf = Vec::new();
        write_binary(&mut buf, &v).unwrap();
        assert_eq!(buf, vec![0x03, 0x01, 0x02, 0x03]);

        let back: Vec<i32> = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn scalar_round_trip_through_write_read_binary() {
        let mut buf = Vec::new();
        write_binary(&mut buf, &55555i32).unwrap();
        assert_eq!(buf.len(), 3);
        let back: i32 = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, 55555);
    }

    #[test]
    fn string_round_trips() {
        let s = String::from("hello, rmeta");
        let mut buf = Vec::new();
        write_binary(&mut buf, &s).unwrap();
        let back: String = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn map_round_trips() {
        use std::collections::BTreeMap;
        let mut m: BTreeMap<i32, bool> = BTreeMap::new();
        m.insert(1, true);
        m.insert(2, false);
        let mut buf = Vec::new();
        write_binary(&mut buf, &m).unwrap();
        let back: BTreeMap<i32, bool> = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn truncated_input_is_reported() {
        let mut reader = BinaryReader::new(&[0x03, 0x01]);
        let mut v: Vec<i32> = Vec::new();
        let err = decode_value(&mut reader, TypedRefMut::new(&mut v));
        assert!(err.is_err());
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Reflect)]
    #[reflect(crate_path = crate)]
    struct Small {
        a: i32,
        b: f32,
        c: bool,
    }

    #[test]
    fn s2_all_defaults_skip_to_an_empty_bitmap() {
        let v = Small::default();
        let mut buf = Vec::new();
        write_binary(&mut buf, &v).unwrap();
        assert_eq!(buf, vec![0x00]);

        let back: Small = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn s2_one_non_default_member_sets_its_bit_and_is_the_only_body() {
        let v = Small {
            a: 6,
            ..Small::default()
        };
        let mut buf = Vec::new();
        write_binary(&mut buf, &v).unwrap();
        assert_eq!(buf, vec![0x01, 0x06]);

        let back: Small = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, v);
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Reflect)]
    #[reflect(crate_path = crate)]
    struct Wide64 {
        f0: i32, f1: i32, f2: i32, f3: i32, f4: i32, f5: i32, f6: i32, f7: i32,
        f8: i32, f9: i32, f10: i32, f11: i32, f12: i32, f13: i32, f14: i32, f15: i32,
        f16: i32, f17: i32, f18: i32, f19: i32, f20: i32, f21: i32, f22: i32, f23: i32,
        f24: i32, f25: i32, f26: i32, f27: i32, f28: i32, f29: i32, f30: i32, f31: i32,
        f32: i32, f33: i32, f34: i32, f35: i32, f36: i32, f37: i32, f38: i32, f39: i32,
        f40: i32, f41: i32, f42: i32, f43: i32, f44: i32, f45: i32, f46: i32, f47: i32,
        f48: i32, f49: i32, f50: i32, f51: i32, f52: i32, f53: i32, f54: i32, f55: i32,
        f56: i32, f57: i32, f58: i32, f59: i32, f60: i32, f61: i32, f62: i32, f63: i32,
    }

    #[test]
    fn s5_sixty_four_members_use_an_eight_byte_bitmap() {
        let mut v = Wide64::default();
        v.f31 = 5;
        v.f63 = 9;
        let mut buf = Vec::new();
        write_binary(&mut buf, &v).unwrap();

        // Bit 31 and bit 63 set, the rest clear: byte 3 and byte 7 carry the
        // high bit of their respective 32-bit half.
        assert_eq!(
            buf,
            vec![0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x80, 0x05, 0x09]
        );

        let back: Wide64 = read_binary(&mut &buf[..]).unwrap();
        assert_eq!(back, v);
    }
}
