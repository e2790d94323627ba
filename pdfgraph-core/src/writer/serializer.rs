//! Byte representation of objects (ISO 32000-1 Section 7.3)

use crate::objects::{Dictionary, Object, PdfString};
use std::io::{self, Write};

/// Serialize `object` as it appears inside an `obj ... endobj` record.
pub fn serialize(object: &Object) -> Vec<u8> {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_object(&mut buf, object);
    buf
}

pub(crate) fn write_object<W: Write>(w: &mut W, object: &Object) -> io::Result<()> {
    match object {
        Object::Null => w.write_all(b"null"),
        Object::Boolean(b) => w.write_all(if *b { &b"true"[..] } else { &b"false"[..] }),
        Object::Integer(i) => write!(w, "{i}"),
        Object::Real(r) => write_real(w, *r),
        Object::String(s) => write_string(w, s),
        Object::Name(n) => write_name(w, n),
        Object::Array(items) => {
            w.write_all(b"[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    w.write_all(b" ")?;
                }
                write_object(w, item)?;
            }
            w.write_all(b"]")
        }
        Object::Dictionary(dict) => write_dictionary(w, dict),
        Object::Stream(stream) => {
            let mut dict = stream.dictionary().clone();
            dict.set("Length", stream.data().len() as i64);
            write_dictionary(w, &dict)?;
            w.write_all(b"\nstream\n")?;
            w.write_all(stream.data())?;
            w.write_all(b"\nendstream")
        }
        Object::Reference(id) => write!(w, "{} {} R", id.number(), id.generation()),
    }
}

fn write_dictionary<W: Write>(w: &mut W, dict: &Dictionary) -> io::Result<()> {
    w.write_all(b"<<")?;
    for (key, value) in dict.iter() {
        w.write_all(b"\n")?;
        write_name(w, key)?;
        w.write_all(b" ")?;
        write_object(w, value)?;
    }
    w.write_all(b"\n>>")
}

fn write_real<W: Write>(w: &mut W, value: f64) -> io::Result<()> {
    if !value.is_finite() {
        return w.write_all(b"0");
    }
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return write!(w, "{}", value as i64);
    }
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => w.write_all(b"0"),
        other => w.write_all(other.as_bytes()),
    }
}

/// Literal syntax for printable text, hex syntax for anything binary.
fn write_string<W: Write>(w: &mut W, s: &PdfString) -> io::Result<()> {
    let data = s.as_bytes();
    let printable = data
        .iter()
        .all(|&b| matches!(b, b'\n' | b'\r' | b'\t') || (0x20..=0x7E).contains(&b));

    if printable {
        w.write_all(b"(")?;
        for &byte in data {
            match byte {
                b'(' => w.write_all(b"\\(")?,
                b')' => w.write_all(b"\\)")?,
                b'\\' => w.write_all(b"\\\\")?,
                b'\n' => w.write_all(b"\\n")?,
                b'\r' => w.write_all(b"\\r")?,
                b'\t' => w.write_all(b"\\t")?,
                _ => w.write_all(&[byte])?,
            }
        }
        w.write_all(b")")
    } else {
        w.write_all(b"<")?;
        for byte in data {
            write!(w, "{byte:02X}")?;
        }
        w.write_all(b">")
    }
}

/// `/Name`, with delimiters, `#` and non-regular bytes written as `#xx`.
fn write_name<W: Write>(w: &mut W, name: &str) -> io::Result<()> {
    w.write_all(b"/")?;
    for byte in name.bytes() {
        match byte {
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#' => {
                write!(w, "#{byte:02X}")?
            }
            0x21..=0x7E => w.write_all(&[byte])?,
            _ => write!(w, "#{byte:02X}")?,
        }
    }
    Ok(())
}
