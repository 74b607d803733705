//! Write-side machinery: the [`Encoder`], its reference and class tables, and
//! the wire primitives everything else is built from.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};

use crate::tags::*;
use crate::{CodecError, Encode, Result};

const DIGITS: &[u8; 10] = b"0123456789";
const DIGIT2: &str = concat!(
    "0001020304050607080910111213141516171819",
    "2021222324252627282930313233343536373839",
    "4041424344454647484950515253545556575859",
    "6061626364656667686970717273747576777879",
    "8081828384858687888990919293949596979899",
);
const DIGIT3: &str = concat!(
    "000001002003004005006007008009010011012013014015016017018019",
    "020021022023024025026027028029030031032033034035036037038039",
    "040041042043044045046047048049050051052053054055056057058059",
    "060061062063064065066067068069070071072073074075076077078079",
    "080081082083084085086087088089090091092093094095096097098099",
    "100101102103104105106107108109110111112113114115116117118119",
    "120121122123124125126127128129130131132133134135136137138139",
    "140141142143144145146147148149150151152153154155156157158159",
    "160161162163164165166167168169170171172173174175176177178179",
    "180181182183184185186187188189190191192193194195196197198199",
    "200201202203204205206207208209210211212213214215216217218219",
    "220221222223224225226227228229230231232233234235236237238239",
    "240241242243244245246247248249250251252253254255256257258259",
    "260261262263264265266267268269270271272273274275276277278279",
    "280281282283284285286287288289290291292293294295296297298299",
    "300301302303304305306307308309310311312313314315316317318319",
    "320321322323324325326327328329330331332333334335336337338339",
    "340341342343344345346347348349350351352353354355356357358359",
    "360361362363364365366367368369370371372373374375376377378379",
    "380381382383384385386387388389390391392393394395396397398399",
    "400401402403404405406407408409410411412413414415416417418419",
    "420421422423424425426427428429430431432433434435436437438439",
    "440441442443444445446447448449450451452453454455456457458459",
    "460461462463464465466467468469470471472473474475476477478479",
    "480481482483484485486487488489490491492493494495496497498499",
    "500501502503504505506507508509510511512513514515516517518519",
    "520521522523524525526527528529530531532533534535536537538539",
    "540541542543544545546547548549550551552553554555556557558559",
    "560561562563564565566567568569570571572573574575576577578579",
    "580581582583584585586587588589590591592593594595596597598599",
    "600601602603604605606607608609610611612613614615616617618619",
    "620621622623624625626627628629630631632633634635636637638639",
    "640641642643644645646647648649650651652653654655656657658659",
    "660661662663664665666667668669670671672673674675676677678679",
    "680681682683684685686687688689690691692693694695696697698699",
    "700701702703704705706707708709710711712713714715716717718719",
    "720721722723724725726727728729730731732733734735736737738739",
    "740741742743744745746747748749750751752753754755756757758759",
    "760761762763764765766767768769770771772773774775776777778779",
    "780781782783784785786787788789790791792793794795796797798799",
    "800801802803804805806807808809810811812813814815816817818819",
    "820821822823824825826827828829830831832833834835836837838839",
    "840841842843844845846847848849850851852853854855856857858859",
    "860861862863864865866867868869870871872873874875876877878879",
    "880881882883884885886887888889890891892893894895896897898899",
    "900901902903904905906907908909910911912913914915916917918919",
    "920921922923924925926927928929930931932933934935936937938939",
    "940941942943944945946947948949950951952953954955956957958959",
    "960961962963964965966967968969970971972973974975976977978979",
    "980981982983984985986987988989990991992993994995996997998999",
);

// -i64::MIN overflows, so the text form is precomputed.
const MIN_I64: &[u8] = b"-9223372036854775808";

/// Converts `i` to ASCII decimal, draining from the tail of `buf` in 3-digit
/// and 2-digit table chunks. Returns the offset of the first digit. Writes
/// nothing for 0; callers handle single digits before reaching here.
fn to_decimal(mut i: u64, buf: &mut [u8; 20]) -> usize {
    let mut off = buf.len();
    while i >= 100 {
        let q = i / 1000;
        let p = ((i - q * 1000) * 3) as usize;
        i = q;
        off -= 3;
        buf[off..off + 3].copy_from_slice(&DIGIT3.as_bytes()[p..p + 3]);
    }
    if i >= 10 {
        let q = i / 100;
        let p = ((i - q * 100) * 2) as usize;
        i = q;
        off -= 2;
        buf[off..off + 2].copy_from_slice(&DIGIT2.as_bytes()[p..p + 2]);
    }
    if i > 0 {
        off -= 1;
        buf[off] = DIGITS[i as usize];
    }
    off
}

/// Length of `bytes` in UTF-16 code units, or `None` if `bytes` is not
/// well-formed UTF-8.
///
/// 1-, 2- and 3-byte sequences contribute one unit; 4-byte sequences
/// contribute two (a surrogate pair).
pub fn utf16_len(bytes: &[u8]) -> Option<usize> {
    let mut n = bytes.len();
    let mut cont = 0u32;
    for &b in bytes {
        if cont == 0 {
            if b & 0xe0 == 0xc0 {
                cont = 1;
                n -= 1;
            } else if b & 0xf0 == 0xe0 {
                cont = 2;
                n -= 2;
            } else if b & 0xf8 == 0xf0 {
                cont = 3;
                n -= 2;
            } else if b & 0x80 == 0x80 {
                return None;
            }
        } else {
            if b & 0xc0 != 0x80 {
                return None;
            }
            cont -= 1;
        }
    }
    if cont != 0 {
        return None;
    }
    Some(n)
}

/// Identity key for write-side reference de-duplication.
///
/// The key is the address of the value's backing storage plus its `TypeId`,
/// so two types sharing an address (a struct and a struct nested at offset 0)
/// never alias. Identity is only meaningful while the keyed value is alive:
/// when several top-level values are encoded into one stream, the caller must
/// keep earlier values alive until [`Encoder::finish`] or an address could be
/// reused by an unrelated value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RefKey {
    addr: usize,
    ty: TypeId,
}

impl RefKey {
    /// Keys a string by its character data.
    pub fn of_str(s: &str) -> Self {
        RefKey {
            addr: s.as_ptr() as usize,
            ty: TypeId::of::<str>(),
        }
    }

    /// Keys a slice by its element storage. Not meaningful for empty slices,
    /// whose data pointer is a shared dangling address; callers burn a counter
    /// slot for those instead.
    pub fn of_slice<T: 'static>(s: &[T]) -> Self {
        RefKey {
            addr: s.as_ptr() as usize,
            ty: TypeId::of::<[T]>(),
        }
    }

    /// Keys a value by its own address.
    pub fn of_ref<T: ?Sized + 'static>(v: &T) -> Self {
        RefKey {
            addr: v as *const T as *const () as usize,
            ty: TypeId::of::<T>(),
        }
    }
}

/// Write-side class table key: derive-produced records key by type, dynamic
/// [`crate::Value`] objects key by class name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) enum ClassKey {
    Type(TypeId),
    Name(String),
}

/// Serializes value graphs into an owned [`BytesMut`] sink.
///
/// An `Encoder` owns its reference table and class table; both live until
/// [`Encoder::reset`] or [`Encoder::finish`]. A single instance must not be
/// shared across concurrent tasks.
pub struct Encoder {
    buf: BytesMut,
    simple: bool,
    refs: HashMap<RefKey, usize>,
    ref_count: usize,
    classes: HashMap<ClassKey, usize>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Creates an encoder with reference tracking enabled.
    pub fn new() -> Self {
        Self::with_buffer(BytesMut::new())
    }

    /// Creates an encoder that never emits back-references; every composite
    /// is written in full. Output is decodable by a simple-mode decoder.
    pub fn simple() -> Self {
        let mut enc = Self::new();
        enc.simple = true;
        enc
    }

    /// Creates an encoder writing into an existing buffer.
    pub fn with_buffer(buf: BytesMut) -> Self {
        Encoder {
            buf,
            simple: false,
            refs: HashMap::new(),
            ref_count: 0,
            classes: HashMap::new(),
        }
    }

    /// True if this encoder was created with [`Encoder::simple`].
    pub fn is_simple(&self) -> bool {
        self.simple
    }

    /// Encodes one value, emitting back-references for composites already
    /// written to this stream.
    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.encode(self)
    }

    /// The bytes written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Takes the encoded bytes and clears all tables for a fresh stream.
    pub fn finish(&mut self) -> Bytes {
        let buf = std::mem::take(&mut self.buf);
        self.clear_tables();
        buf.freeze()
    }

    /// Discards buffered output and clears the reference and class tables.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.clear_tables();
    }

    fn clear_tables(&mut self) {
        self.refs.clear();
        self.ref_count = 0;
        self.classes.clear();
    }

    // --- reference table ---

    /// If `key` was already registered, emits `r<index>;` and returns `true`;
    /// otherwise returns `false` and the caller proceeds to write the value.
    pub fn write_reference(&mut self, key: RefKey) -> Result<bool> {
        if self.simple {
            return Ok(false);
        }
        if let Some(&index) = self.refs.get(&key) {
            self.buf.put_u8(TAG_REF);
            self.write_u64_raw(index as u64);
            self.buf.put_u8(TAG_SEMICOLON);
            return Ok(true);
        }
        Ok(false)
    }

    /// Assigns the next reference index to `key`. Must be called before any
    /// child value is written, so indices match emission order.
    pub fn set_reference(&mut self, key: RefKey) {
        if self.simple {
            return;
        }
        self.refs.insert(key, self.ref_count);
        self.ref_count += 1;
    }

    /// Burns `n` reference indices for value-like emissions that consume a
    /// slot without a stable address (big rationals, complex pairs, error
    /// messages, class field names). Such slots can never be back-referenced.
    pub fn add_reference_count(&mut self, n: usize) {
        if !self.simple {
            self.ref_count += n;
        }
    }

    // --- wire primitives ---

    pub(crate) fn put_u8(&mut self, b: u8) {
        self.buf.put_u8(b);
    }

    pub(crate) fn put_slice(&mut self, s: &[u8]) {
        self.buf.put_slice(s);
    }

    /// ASCII decimal with no tag framing; used for lengths, counts and
    /// indices.
    pub(crate) fn write_u64_raw(&mut self, i: u64) {
        if i <= 9 {
            self.buf.put_u8(DIGITS[i as usize]);
            return;
        }
        let mut buf = [0u8; 20];
        let off = to_decimal(i, &mut buf);
        self.buf.put_slice(&buf[off..]);
    }

    pub(crate) fn write_i64_raw(&mut self, i: i64) {
        if i >= 0 {
            return self.write_u64_raw(i as u64);
        }
        if i == i64::MIN {
            self.buf.put_slice(MIN_I64);
            return;
        }
        let mut buf = [0u8; 20];
        let off = to_decimal((-i) as u64, &mut buf) - 1;
        buf[off] = b'-';
        self.buf.put_slice(&buf[off..]);
    }

    /// Writes an integer known to fit the 32-bit range: a bare digit for
    /// 0..=9, otherwise `i<decimal>;`.
    pub fn write_i32(&mut self, i: i32) -> Result<()> {
        if (0..=9).contains(&i) {
            self.buf.put_u8(DIGITS[i as usize]);
            return Ok(());
        }
        self.buf.put_u8(TAG_INTEGER);
        self.write_i64_raw(i as i64);
        self.buf.put_u8(TAG_SEMICOLON);
        Ok(())
    }

    /// Writes a signed integer, choosing `i` or `l` by the runtime value.
    pub fn write_i64(&mut self, i: i64) -> Result<()> {
        if (0..=9).contains(&i) {
            self.buf.put_u8(DIGITS[i as usize]);
            return Ok(());
        }
        let tag = if i < i32::MIN as i64 || i > i32::MAX as i64 {
            TAG_LONG
        } else {
            TAG_INTEGER
        };
        self.buf.put_u8(tag);
        self.write_i64_raw(i);
        self.buf.put_u8(TAG_SEMICOLON);
        Ok(())
    }

    /// Writes an unsigned integer, choosing `i` or `l` by the runtime value.
    pub fn write_u64(&mut self, i: u64) -> Result<()> {
        if i <= 9 {
            self.buf.put_u8(DIGITS[i as usize]);
            return Ok(());
        }
        let tag = if i > i32::MAX as u64 {
            TAG_LONG
        } else {
            TAG_INTEGER
        };
        self.buf.put_u8(tag);
        self.write_u64_raw(i);
        self.buf.put_u8(TAG_SEMICOLON);
        Ok(())
    }

    pub fn write_bool(&mut self, b: bool) -> Result<()> {
        self.buf.put_u8(if b { TAG_TRUE } else { TAG_FALSE });
        Ok(())
    }

    pub fn write_null(&mut self) -> Result<()> {
        self.buf.put_u8(TAG_NULL);
        Ok(())
    }

    fn write_float_text(&mut self, finite: std::fmt::Arguments<'_>) -> Result<()> {
        self.buf.put_u8(TAG_DOUBLE);
        let mut text = String::new();
        // Display for floats is the shortest string that round-trips.
        let _ = text.write_fmt(finite);
        self.buf.put_slice(text.as_bytes());
        self.buf.put_u8(TAG_SEMICOLON);
        Ok(())
    }

    pub fn write_f64(&mut self, f: f64) -> Result<()> {
        if f.is_nan() {
            self.buf.put_u8(TAG_NAN);
            return Ok(());
        }
        if f.is_infinite() {
            self.buf.put_u8(TAG_INFINITY);
            self.buf
                .put_u8(if f.is_sign_positive() { TAG_POS } else { TAG_NEG });
            return Ok(());
        }
        self.write_float_text(format_args!("{}", f))
    }

    pub fn write_f32(&mut self, f: f32) -> Result<()> {
        if f.is_nan() {
            self.buf.put_u8(TAG_NAN);
            return Ok(());
        }
        if f.is_infinite() {
            self.buf.put_u8(TAG_INFINITY);
            self.buf
                .put_u8(if f.is_sign_positive() { TAG_POS } else { TAG_NEG });
            return Ok(());
        }
        self.write_float_text(format_args!("{}", f))
    }

    pub(crate) fn write_empty(&mut self) -> Result<()> {
        self.buf.put_u8(TAG_EMPTY);
        Ok(())
    }

    /// One UTF-16 code unit of string as `u<utf8>`, no framing.
    pub(crate) fn write_utf8_char(&mut self, s: &str) -> Result<()> {
        self.buf.put_u8(TAG_UTF8_CHAR);
        self.buf.put_slice(s.as_bytes());
        Ok(())
    }

    /// `s<utf16len>"<utf8>"` with the length omitted when 0. Reference
    /// bookkeeping is the caller's job.
    pub(crate) fn write_str_raw(&mut self, s: &str, units: usize) -> Result<()> {
        self.buf.put_u8(TAG_STRING);
        self.write_binary(s.as_bytes(), units)
    }

    /// `b<count>"<octets>"` with the count omitted when 0. Reference
    /// bookkeeping is the caller's job.
    pub(crate) fn write_bytes_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.put_u8(TAG_BYTES);
        self.write_binary(bytes, bytes.len())
    }

    fn write_binary(&mut self, bytes: &[u8], length: usize) -> Result<()> {
        if length > 0 {
            self.write_u64_raw(length as u64);
        }
        self.buf.put_u8(TAG_QUOTE);
        self.buf.put_slice(bytes);
        self.buf.put_u8(TAG_QUOTE);
        Ok(())
    }

    /// The full string ladder: `e` for empty, `u` for a single code unit,
    /// otherwise a referenceable `s` emission keyed on the character data.
    /// Ill-formed input (unreachable from `&str`, kept total) downgrades to a
    /// `bytes` emission.
    pub fn encode_str(&mut self, s: &str) -> Result<()> {
        match utf16_len(s.as_bytes()) {
            Some(0) => self.write_empty(),
            Some(1) => self.write_utf8_char(s),
            Some(units) => {
                let key = RefKey::of_str(s);
                if self.write_reference(key)? {
                    return Ok(());
                }
                self.set_reference(key);
                self.write_str_raw(s, units)
            }
            None => self.encode_bytes_keyed(None, s.as_bytes()),
        }
    }

    /// A `bytes` emission: keyed when the storage has a stable address,
    /// otherwise consuming a counter slot.
    pub fn encode_bytes_keyed(&mut self, key: Option<RefKey>, bytes: &[u8]) -> Result<()> {
        match key {
            Some(key) => {
                if self.write_reference(key)? {
                    return Ok(());
                }
                self.set_reference(key);
            }
            None => self.add_reference_count(1),
        }
        self.write_bytes_raw(bytes)
    }

    /// `<tag><count>{` with the count omitted when 0.
    pub fn write_head(&mut self, tag: u8, n: usize) -> Result<()> {
        self.buf.put_u8(tag);
        if n > 0 {
            self.write_u64_raw(n as u64);
        }
        self.buf.put_u8(TAG_OPENBRACE);
        Ok(())
    }

    /// `o<classindex>{`.
    pub fn write_object_head(&mut self, class_index: usize) -> Result<()> {
        self.buf.put_u8(TAG_OBJECT);
        self.write_u64_raw(class_index as u64);
        self.buf.put_u8(TAG_OPENBRACE);
        Ok(())
    }

    pub fn write_foot(&mut self) -> Result<()> {
        self.buf.put_u8(TAG_CLOSEBRACE);
        Ok(())
    }

    /// Declares a class once per stream and returns its index.
    ///
    /// The declaration is `c<namelen>"<name>"<fieldcount>{<fieldnames>}`;
    /// every field name is an `s`-framed string consuming one reference slot,
    /// so the declaring object's own slot comes after them.
    pub(crate) fn declare_class(
        &mut self,
        key: ClassKey,
        name: &str,
        fields: &[&str],
    ) -> Result<usize> {
        if let Some(&index) = self.classes.get(&key) {
            return Ok(index);
        }
        let units = utf16_len(name.as_bytes())
            .ok_or_else(|| CodecError::Format(format!("class name {:?} is not valid UTF-8", name)))?;
        self.buf.put_u8(TAG_CLASS);
        self.write_binary(name.as_bytes(), units)?;
        if !fields.is_empty() {
            self.write_u64_raw(fields.len() as u64);
        }
        self.buf.put_u8(TAG_OPENBRACE);
        for field in fields {
            let units = utf16_len(field.as_bytes()).ok_or_else(|| {
                CodecError::Format(format!("field name {:?} is not valid UTF-8", field))
            })?;
            self.add_reference_count(1);
            self.write_str_raw(field, units)?;
        }
        self.buf.put_u8(TAG_CLOSEBRACE);
        let index = self.classes.len();
        self.classes.insert(key, index);
        Ok(index)
    }

    /// Encodes a value through the process-wide registry by its runtime type.
    pub fn encode_any(&mut self, value: &dyn std::any::Any) -> Result<()> {
        crate::registry::encode_any(self, value)
    }
}
