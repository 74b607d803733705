//! Record (named struct) support.
//!
//! The first instance of a record type in a stream emits a class
//! declaration assigning a class index; every instance, including the
//! first, then emits `o<classindex>{<fields>}` with field values in
//! declared order. `#[derive(Encode, Decode)]` wires generated field lists
//! and field closures to the helpers here; manual [`crate::Encode`]
//! implementations for record-shaped types can do the same.

use std::any::TypeId;

use crate::encoder::ClassKey;
use crate::tags::*;
use crate::{CodecError, Decoder, Encoder, RefKey, Result};

/// Reference-aware entry point: emits `r<index>;` when this exact value was
/// already written, otherwise a full record emission.
pub fn encode_record<T: 'static>(
    enc: &mut Encoder,
    value: &T,
    name: &str,
    fields: &[&str],
    write_fields: impl FnOnce(&mut Encoder) -> Result<()>,
) -> Result<()> {
    if enc.write_reference(RefKey::of_ref(value))? {
        return Ok(());
    }
    write_record(enc, value, name, fields, write_fields)
}

/// Unconditional record emission: class declaration on first sight (its
/// field-name strings consume reference slots), then the instance, whose
/// own slot is claimed before any field value is written.
pub fn write_record<T: 'static>(
    enc: &mut Encoder,
    value: &T,
    name: &str,
    fields: &[&str],
    write_fields: impl FnOnce(&mut Encoder) -> Result<()>,
) -> Result<()> {
    let index = enc.declare_class(ClassKey::Type(TypeId::of::<T>()), name, fields)?;
    enc.set_reference(RefKey::of_ref(value));
    enc.write_object_head(index)?;
    write_fields(enc)?;
    enc.write_foot()
}

/// Decodes a record instance, consuming any class declarations that precede
/// it. The declared schema must match the destination's field list exactly,
/// names and order both.
pub fn decode_record<T>(
    dec: &mut Decoder,
    tag: u8,
    name: &str,
    fields: &[&str],
    read_fields: impl FnOnce(&mut Decoder) -> Result<T>,
) -> Result<T> {
    let mut tag = tag;
    while tag == TAG_CLASS {
        dec.read_class()?;
        tag = dec.read_tag()?;
    }
    match tag {
        TAG_OBJECT => {
            let index = dec.read_len_until(TAG_OPENBRACE)?;
            let schema = dec.class_schema(index)?;
            if schema.fields.len() != fields.len() {
                return Err(CodecError::ClassMismatch {
                    class: schema.name.clone(),
                    detail: format!(
                        "stream declares {} fields, {} has {}",
                        schema.fields.len(),
                        name,
                        fields.len()
                    ),
                });
            }
            for (declared, expected) in schema.fields.iter().zip(fields) {
                if declared.as_ref() != *expected {
                    return Err(CodecError::ClassMismatch {
                        class: schema.name.clone(),
                        detail: format!(
                            "stream field {:?} does not match {}::{}",
                            declared, name, expected
                        ),
                    });
                }
            }
            dec.reserve_reference();
            let value = read_fields(dec)?;
            dec.expect_tag(TAG_CLOSEBRACE)?;
            Ok(value)
        }
        TAG_REF => Err(CodecError::Format(
            "back-references to typed records are only supported through Value".to_string(),
        )),
        tag => Err(CodecError::TagMismatch {
            tag,
            expected: "record",
        }),
    }
}
