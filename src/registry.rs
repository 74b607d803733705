//! Process-wide codec registry for runtime-type dispatch.
//!
//! The typed [`Encode`]/[`Decode`] traits cover every statically known
//! destination; the registry serves `&dyn Any` values and callers that only
//! learn the destination type at runtime. It is read-mostly: built-ins are
//! inserted on first access, user types during application startup, and the
//! hot path only takes the read lock.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::value::Value;
use crate::{CodecError, Decode, Decoder, Encode, Encoder, Result};

struct Codec {
    name: &'static str,
    encode: fn(&mut Encoder, &dyn Any) -> Result<()>,
    decode: fn(&mut Decoder) -> Result<Box<dyn Any>>,
}

fn entry<T: Encode + Decode + Any>() -> Codec {
    Codec {
        name: std::any::type_name::<T>(),
        encode: |enc, any| match any.downcast_ref::<T>() {
            Some(value) => value.encode(enc),
            None => Err(CodecError::Unregistered(
                std::any::type_name::<T>().to_string(),
            )),
        },
        decode: |dec| Ok(Box::new(T::decode(dec)?) as Box<dyn Any>),
    }
}

fn registry() -> &'static RwLock<HashMap<TypeId, Codec>> {
    static REGISTRY: OnceLock<RwLock<HashMap<TypeId, Codec>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        fn insert<T: Encode + Decode + Any>(map: &mut HashMap<TypeId, Codec>) {
            map.insert(TypeId::of::<T>(), entry::<T>());
        }
        insert::<bool>(&mut map);
        insert::<i8>(&mut map);
        insert::<i16>(&mut map);
        insert::<i32>(&mut map);
        insert::<i64>(&mut map);
        insert::<isize>(&mut map);
        insert::<u8>(&mut map);
        insert::<u16>(&mut map);
        insert::<u32>(&mut map);
        insert::<u64>(&mut map);
        insert::<usize>(&mut map);
        insert::<f32>(&mut map);
        insert::<f64>(&mut map);
        insert::<char>(&mut map);
        insert::<String>(&mut map);
        insert::<Vec<u8>>(&mut map);
        insert::<bytes::Bytes>(&mut map);
        insert::<Value>(&mut map);
        insert::<Vec<Value>>(&mut map);
        #[cfg(feature = "bignum")]
        {
            insert::<num_bigint::BigInt>(&mut map);
            insert::<bigdecimal::BigDecimal>(&mut map);
            insert::<num_rational::BigRational>(&mut map);
        }
        #[cfg(feature = "complex")]
        {
            insert::<num_complex::Complex<f32>>(&mut map);
            insert::<num_complex::Complex<f64>>(&mut map);
        }
        #[cfg(feature = "uuid")]
        insert::<uuid::Uuid>(&mut map);
        RwLock::new(map)
    })
}

/// Registers a codec for `T`, replacing any previous registration.
///
/// Registration is meant for an application's initialization window; the
/// serialization hot path only reads.
pub fn register<T: Encode + Decode + Any>() {
    registry()
        .write()
        .expect("codec registry poisoned")
        .insert(TypeId::of::<T>(), entry::<T>());
}

/// Removes the codec for `T`, if any.
pub fn unregister<T: Any>() {
    registry()
        .write()
        .expect("codec registry poisoned")
        .remove(&TypeId::of::<T>());
}

pub(crate) fn encode_any(enc: &mut Encoder, value: &dyn Any) -> Result<()> {
    let guard = registry().read().expect("codec registry poisoned");
    match guard.get(&value.type_id()) {
        Some(codec) => (codec.encode)(enc, value),
        None => Err(CodecError::Unregistered(format!("{:?}", value.type_id()))),
    }
}

/// Decodes by destination type id; unregistered destinations fall back to
/// structural decoding into a [`Value`].
pub(crate) fn decode_any(dec: &mut Decoder, ty: TypeId) -> Result<Box<dyn Any>> {
    let decode = {
        let guard = registry().read().expect("codec registry poisoned");
        guard.get(&ty).map(|codec| codec.decode)
    };
    match decode {
        Some(decode) => decode(dec),
        None => Ok(Box::new(Value::decode(dec)?) as Box<dyn Any>),
    }
}

/// The registered name for a type id, for diagnostics.
pub fn registered_name(ty: TypeId) -> Option<&'static str> {
    registry()
        .read()
        .expect("codec registry poisoned")
        .get(&ty)
        .map(|codec| codec.name)
}
