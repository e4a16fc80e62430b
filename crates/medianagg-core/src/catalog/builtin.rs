use crate::{
    catalog::{
        ArithFn, CompareFn, OpId, OpSlot, Operator, RecvFn, SendFn, TypeId, TypeLayout, TypeOps,
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    types::{Decimal, Float64},
    value::{Value, ValueTag, canonical_cmp},
};

///
/// BuiltinType
///
/// Capability table for one builtin `Value` variant.
///
/// Blob, Bool and Text are ordered but carry no averaging operators.
/// Int and Uint average with truncating division; Float64 and Decimal
/// average exactly.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BuiltinType {
    tag: ValueTag,
}

impl BuiltinType {
    pub const ALL: [Self; 7] = [
        Self::new(ValueTag::Blob),
        Self::new(ValueTag::Bool),
        Self::new(ValueTag::Decimal),
        Self::new(ValueTag::Float64),
        Self::new(ValueTag::Int),
        Self::new(ValueTag::Text),
        Self::new(ValueTag::Uint),
    ];

    #[must_use]
    pub const fn new(tag: ValueTag) -> Self {
        Self { tag }
    }

    #[must_use]
    pub const fn tag(self) -> ValueTag {
        self.tag
    }

    const fn op(self, slot: OpSlot) -> OpId {
        OpId::builtin(TypeId::for_tag(self.tag), slot)
    }
}

impl TypeOps for BuiltinType {
    fn type_id(&self) -> TypeId {
        TypeId::for_tag(self.tag)
    }

    fn name(&self) -> &'static str {
        self.tag.label()
    }

    fn layout(&self) -> TypeLayout {
        match self.tag {
            ValueTag::Bool => TypeLayout::fixed(1, true),
            ValueTag::Float64 | ValueTag::Int | ValueTag::Uint => TypeLayout::fixed(8, true),
            ValueTag::Decimal => TypeLayout::fixed(16, false),
            ValueTag::Blob | ValueTag::Text => TypeLayout::variable(),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        value.tag() == self.tag
    }

    fn compare(&self) -> Option<Operator<CompareFn>> {
        Some(Operator::new(self.op(OpSlot::Compare), canonical_cmp))
    }

    fn send(&self) -> Operator<SendFn> {
        let func: SendFn = match self.tag {
            ValueTag::Blob => send_blob,
            ValueTag::Bool => send_bool,
            ValueTag::Decimal => send_decimal,
            ValueTag::Float64 => send_float64,
            ValueTag::Int => send_int,
            ValueTag::Text => send_text,
            ValueTag::Uint => send_uint,
        };

        Operator::new(self.op(OpSlot::Send), func)
    }

    fn recv(&self) -> Operator<RecvFn> {
        let func: RecvFn = match self.tag {
            ValueTag::Blob => recv_blob,
            ValueTag::Bool => recv_bool,
            ValueTag::Decimal => recv_decimal,
            ValueTag::Float64 => recv_float64,
            ValueTag::Int => recv_int,
            ValueTag::Text => recv_text,
            ValueTag::Uint => recv_uint,
        };

        Operator::new(self.op(OpSlot::Recv), func)
    }

    fn plus(&self) -> Option<Operator<ArithFn>> {
        let func: ArithFn = match self.tag {
            ValueTag::Decimal => plus_decimal,
            ValueTag::Float64 => plus_float64,
            ValueTag::Int => plus_int,
            ValueTag::Uint => plus_uint,
            ValueTag::Blob | ValueTag::Bool | ValueTag::Text => return None,
        };

        Some(Operator::new(self.op(OpSlot::Plus), func))
    }

    fn divide(&self) -> Option<Operator<ArithFn>> {
        let func: ArithFn = match self.tag {
            ValueTag::Decimal => divide_decimal,
            ValueTag::Float64 => divide_float64,
            ValueTag::Int => divide_int,
            ValueTag::Uint => divide_uint,
            ValueTag::Blob | ValueTag::Bool | ValueTag::Text => return None,
        };

        Some(Operator::new(self.op(OpSlot::Divide), func))
    }

    #[allow(clippy::cast_precision_loss)]
    fn literal(&self, n: i64) -> Option<Value> {
        match self.tag {
            ValueTag::Decimal => Some(Value::Decimal(Decimal::from(n))),
            ValueTag::Float64 => Value::float64(n as f64),
            ValueTag::Int => Some(Value::Int(n)),
            ValueTag::Uint => u64::try_from(n).ok().map(Value::Uint),
            ValueTag::Blob | ValueTag::Bool | ValueTag::Text => None,
        }
    }
}

///
/// ERRORS
///

fn type_mismatch(expected: &'static str, found: &Value) -> InternalError {
    InternalError::protocol_misuse(
        ErrorOrigin::Catalog,
        format!("{expected} operator applied to {} value", found.label()),
    )
}

fn malformed(type_name: &'static str, detail: impl std::fmt::Display) -> InternalError {
    InternalError::codec_corruption(format!("malformed {type_name} payload: {detail}"))
}

fn out_of_range(type_name: &'static str, op: &'static str) -> InternalError {
    InternalError::new(
        ErrorClass::Arithmetic,
        ErrorOrigin::Finalize,
        format!("{type_name} out of range in {op}"),
    )
}

fn fixed_bytes<const N: usize>(
    type_name: &'static str,
    bytes: &[u8],
) -> Result<[u8; N], InternalError> {
    bytes
        .try_into()
        .map_err(|_| malformed(type_name, format!("expected {N} bytes, found {}", bytes.len())))
}

///
/// SEND
///

fn send_blob(value: &Value, out: &mut Vec<u8>) -> Result<(), InternalError> {
    let Value::Blob(bytes) = value else {
        return Err(type_mismatch("Blob", value));
    };
    out.extend_from_slice(bytes);

    Ok(())
}

fn send_bool(value: &Value, out: &mut Vec<u8>) -> Result<(), InternalError> {
    let Value::Bool(v) = value else {
        return Err(type_mismatch("Bool", value));
    };
    out.push(u8::from(*v));

    Ok(())
}

fn send_decimal(value: &Value, out: &mut Vec<u8>) -> Result<(), InternalError> {
    let Value::Decimal(v) = value else {
        return Err(type_mismatch("Decimal", value));
    };
    out.extend_from_slice(&v.serialize());

    Ok(())
}

fn send_float64(value: &Value, out: &mut Vec<u8>) -> Result<(), InternalError> {
    let Value::Float64(v) = value else {
        return Err(type_mismatch("Float64", value));
    };
    out.extend_from_slice(&v.to_be_bytes());

    Ok(())
}

fn send_int(value: &Value, out: &mut Vec<u8>) -> Result<(), InternalError> {
    let Value::Int(v) = value else {
        return Err(type_mismatch("Int", value));
    };
    out.extend_from_slice(&v.to_be_bytes());

    Ok(())
}

fn send_text(value: &Value, out: &mut Vec<u8>) -> Result<(), InternalError> {
    let Value::Text(v) = value else {
        return Err(type_mismatch("Text", value));
    };
    out.extend_from_slice(v.as_bytes());

    Ok(())
}

fn send_uint(value: &Value, out: &mut Vec<u8>) -> Result<(), InternalError> {
    let Value::Uint(v) = value else {
        return Err(type_mismatch("Uint", value));
    };
    out.extend_from_slice(&v.to_be_bytes());

    Ok(())
}

///
/// RECV
///

fn recv_blob(bytes: &[u8]) -> Result<Value, InternalError> {
    Ok(Value::Blob(bytes.to_vec()))
}

fn recv_bool(bytes: &[u8]) -> Result<Value, InternalError> {
    match fixed_bytes::<1>("Bool", bytes)? {
        [0] => Ok(Value::Bool(false)),
        [1] => Ok(Value::Bool(true)),
        [other] => Err(malformed("Bool", format!("invalid byte {other:#04x}"))),
    }
}

// Flags word is little-endian: bytes 0-1 unused, byte 2 scale, byte 3 sign bit.
const DECIMAL_MAX_SCALE: u8 = 28;
const DECIMAL_SIGN_BIT: u8 = 0x80;

fn recv_decimal(bytes: &[u8]) -> Result<Value, InternalError> {
    let buf = fixed_bytes::<16>("Decimal", bytes)?;
    let [unused_lo, unused_hi, scale, sign, ..] = buf;

    if unused_lo != 0 || unused_hi != 0 || sign & !DECIMAL_SIGN_BIT != 0 {
        return Err(malformed("Decimal", "unused flag bits set"));
    }
    if scale > DECIMAL_MAX_SCALE {
        return Err(malformed(
            "Decimal",
            format!("scale {scale} exceeds {DECIMAL_MAX_SCALE}"),
        ));
    }

    Ok(Value::Decimal(Decimal::deserialize(buf)))
}

fn recv_float64(bytes: &[u8]) -> Result<Value, InternalError> {
    Float64::try_from_bytes(bytes)
        .map(Value::Float64)
        .map_err(|err| malformed("Float64", err))
}

fn recv_int(bytes: &[u8]) -> Result<Value, InternalError> {
    let buf = fixed_bytes::<8>("Int", bytes)?;

    Ok(Value::Int(i64::from_be_bytes(buf)))
}

fn recv_text(bytes: &[u8]) -> Result<Value, InternalError> {
    String::from_utf8(bytes.to_vec())
        .map(Value::Text)
        .map_err(|err| malformed("Text", err))
}

fn recv_uint(bytes: &[u8]) -> Result<Value, InternalError> {
    let buf = fixed_bytes::<8>("Uint", bytes)?;

    Ok(Value::Uint(u64::from_be_bytes(buf)))
}

///
/// ARITHMETIC
///

fn plus_decimal(left: &Value, right: &Value) -> Result<Value, InternalError> {
    let (Value::Decimal(a), Value::Decimal(b)) = (left, right) else {
        return Err(type_mismatch("Decimal", left));
    };

    a.checked_add(*b)
        .map(Value::Decimal)
        .ok_or_else(|| out_of_range("Decimal", "addition"))
}

fn divide_decimal(left: &Value, right: &Value) -> Result<Value, InternalError> {
    let (Value::Decimal(a), Value::Decimal(b)) = (left, right) else {
        return Err(type_mismatch("Decimal", left));
    };

    a.checked_div(*b)
        .map(Value::Decimal)
        .ok_or_else(|| out_of_range("Decimal", "division"))
}

fn plus_float64(left: &Value, right: &Value) -> Result<Value, InternalError> {
    let (Value::Float64(a), Value::Float64(b)) = (left, right) else {
        return Err(type_mismatch("Float64", left));
    };

    a.checked_add(*b)
        .map(Value::Float64)
        .ok_or_else(|| out_of_range("Float64", "addition"))
}

fn divide_float64(left: &Value, right: &Value) -> Result<Value, InternalError> {
    let (Value::Float64(a), Value::Float64(b)) = (left, right) else {
        return Err(type_mismatch("Float64", left));
    };

    a.checked_div(*b)
        .map(Value::Float64)
        .ok_or_else(|| out_of_range("Float64", "division"))
}

fn plus_int(left: &Value, right: &Value) -> Result<Value, InternalError> {
    let (Value::Int(a), Value::Int(b)) = (left, right) else {
        return Err(type_mismatch("Int", left));
    };

    a.checked_add(*b)
        .map(Value::Int)
        .ok_or_else(|| out_of_range("Int", "addition"))
}

fn divide_int(left: &Value, right: &Value) -> Result<Value, InternalError> {
    let (Value::Int(a), Value::Int(b)) = (left, right) else {
        return Err(type_mismatch("Int", left));
    };

    a.checked_div(*b)
        .map(Value::Int)
        .ok_or_else(|| out_of_range("Int", "division"))
}

fn plus_uint(left: &Value, right: &Value) -> Result<Value, InternalError> {
    let (Value::Uint(a), Value::Uint(b)) = (left, right) else {
        return Err(type_mismatch("Uint", left));
    };

    a.checked_add(*b)
        .map(Value::Uint)
        .ok_or_else(|| out_of_range("Uint", "addition"))
}

fn divide_uint(left: &Value, right: &Value) -> Result<Value, InternalError> {
    let (Value::Uint(a), Value::Uint(b)) = (left, right) else {
        return Err(type_mismatch("Uint", left));
    };

    a.checked_div(*b)
        .map(Value::Uint)
        .ok_or_else(|| out_of_range("Uint", "division"))
}
