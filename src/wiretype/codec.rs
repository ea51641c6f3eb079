//! Byte codec for type descriptors

use crate::error::{Result, ScribeError};

use super::desc::TypeDesc;
use super::{MAX_DESC_DEPTH, TAG_ARR, TAG_FIXED_ARR, TAG_NAT, TAG_PRIM, TAG_TUPLE, TAG_VAR};

/// Append the encoded form of `desc` to `out`
pub fn encode(desc: &TypeDesc, out: &mut Vec<u8>) {
    match desc {
        TypeDesc::Nat(x) => {
            out.extend_from_slice(&TAG_NAT.to_le_bytes());
            out.extend_from_slice(&x.to_le_bytes());
        }
        TypeDesc::Prim { name, rep } => {
            out.extend_from_slice(&TAG_PRIM.to_le_bytes());
            put_str(name, out);
            match rep {
                Some(rep) => {
                    out.push(1);
                    encode(rep, out);
                }
                None => out.push(0),
            }
        }
        TypeDesc::Var(name) => {
            out.extend_from_slice(&TAG_VAR.to_le_bytes());
            put_str(name, out);
        }
        TypeDesc::Arr(elem) => {
            out.extend_from_slice(&TAG_ARR.to_le_bytes());
            encode(elem, out);
        }
        TypeDesc::FixedArr(elem, len) => {
            out.extend_from_slice(&TAG_FIXED_ARR.to_le_bytes());
            encode(elem, out);
            encode(&TypeDesc::Nat(*len), out);
        }
        TypeDesc::Tuple(fields) => {
            out.extend_from_slice(&TAG_TUPLE.to_le_bytes());
            out.extend_from_slice(&(fields.len() as u64).to_le_bytes());
            for field in fields {
                encode(field, out);
            }
        }
    }
}

/// Decode a descriptor occupying the entire buffer
pub fn decode(buf: &[u8]) -> Result<TypeDesc> {
    let (desc, consumed) = decode_prefix(buf)?;
    if consumed != buf.len() {
        return Err(ScribeError::malformed_descriptor(
            consumed,
            format!("{} trailing bytes after descriptor", buf.len() - consumed),
        ));
    }
    Ok(desc)
}

/// Decode a descriptor from the front of the buffer, returning it together
/// with the number of bytes consumed
pub fn decode_prefix(buf: &[u8]) -> Result<(TypeDesc, usize)> {
    let mut cursor = Cursor { buf, pos: 0 };
    let desc = cursor.read_desc(0)?;
    Ok((desc, cursor.pos))
}

fn put_str(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&(s.len() as u64).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn read_desc(&mut self, depth: usize) -> Result<TypeDesc> {
        if depth > MAX_DESC_DEPTH {
            return Err(ScribeError::malformed_descriptor(
                self.pos,
                "descriptor nesting too deep",
            ));
        }

        let tag = self.read_u32()?;
        match tag {
            TAG_NAT => Ok(TypeDesc::Nat(self.read_u64()?)),
            TAG_PRIM => {
                let name = self.read_str()?;
                let rep = match self.read_u8()? {
                    0 => None,
                    1 => Some(Box::new(self.read_desc(depth + 1)?)),
                    flag => {
                        return Err(ScribeError::malformed_descriptor(
                            self.pos - 1,
                            format!("invalid representative flag {}", flag),
                        ))
                    }
                };
                Ok(TypeDesc::Prim { name, rep })
            }
            TAG_VAR => Ok(TypeDesc::Var(self.read_str()?)),
            TAG_ARR => Ok(TypeDesc::Arr(Box::new(self.read_desc(depth + 1)?))),
            TAG_FIXED_ARR => {
                let elem = self.read_desc(depth + 1)?;
                match self.read_desc(depth + 1)? {
                    TypeDesc::Nat(len) => Ok(TypeDesc::FixedArr(Box::new(elem), len)),
                    other => Err(ScribeError::malformed_descriptor(
                        self.pos,
                        format!("fixed-array length must be a nat, got {:?}", other),
                    )),
                }
            }
            TAG_TUPLE => {
                let count = self.read_u64()? as usize;
                // Each field needs at least a tag; reject counts the buffer
                // cannot possibly hold before allocating.
                if count > (self.buf.len() - self.pos) / 4 + 1 {
                    return Err(ScribeError::malformed_descriptor(
                        self.pos,
                        format!("tuple field count {} exceeds buffer", count),
                    ));
                }
                let mut fields = Vec::with_capacity(count);
                for _ in 0..count {
                    fields.push(self.read_desc(depth + 1)?);
                }
                Ok(TypeDesc::Tuple(fields))
            }
            tag => Err(ScribeError::malformed_descriptor(
                self.pos - 4,
                format!("unknown type tag {}", tag),
            )),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return Err(ScribeError::malformed_descriptor(
                self.pos,
                format!(
                    "descriptor truncated: need {} bytes, {} remain",
                    n,
                    self.buf.len() - self.pos
                ),
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_str(&mut self) -> Result<String> {
        let len = self.read_u64()? as usize;
        let start = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ScribeError::malformed_descriptor(start, "string is not valid UTF-8"))
    }
}
