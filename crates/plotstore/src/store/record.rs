//! Graphical-object records and their binary encoding
//!
//! Every payload starts with a fixed header, followed by the variant fields
//! and, for labelled variants, a trailing label:
//!
//! ```text
//! properties u16 | x1 f64 | x2 f64 | y1 f64 | y2 f64 | row i32 | variant fields | label
//! ```
//!
//! The low bits of `properties` carry the record kind, bits 10..13 the arrow
//! ends. A label is either an `i32` index into the sub-plot label table or a
//! `u8` length followed by that many UTF-8 bytes. All values little-endian.

use std::fmt;
use std::io::Cursor;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::core::{ArrowFlags, Result, Rgb, StoreError};

pub const KIND_LINE: u16 = 0x0001;
pub const KIND_LINE_EX_LABEL_STR: u16 = 0x0002;
pub const KIND_LINE_EX_LABEL_INDEX: u16 = 0x0004;
pub const KIND_BOX: u16 = 0x0008;
pub const KIND_BOX_EX_LABEL_STR: u16 = 0x0010;
pub const KIND_BOX_EX_LABEL_INDEX: u16 = 0x0020;
pub const KIND_DECORATOR_LIFELINE: u16 = 0x0040;
pub const KIND_MASK: u16 = 0x007f;

/// Bytes of the common header
pub const HEADER_LEN: usize = 2 + 4 * 8 + 4;
/// Longest text label in bytes
pub const MAX_LABEL_LEN: usize = u8::MAX as usize;

const X1_AT: usize = 2;
const X2_AT: usize = 10;

/// Cut `text` to at most [`MAX_LABEL_LEN`] bytes on a char boundary
pub fn truncate_label(text: &str) -> &str {
    if text.len() <= MAX_LABEL_LEN {
        return text;
    }
    let mut end = MAX_LABEL_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Record label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// Index into the owning sub-plot's label table
    Index(i32),
    Text(String),
}

impl Label {
    /// Text label, truncated to [`MAX_LABEL_LEN`] bytes
    pub fn text(text: impl AsRef<str>) -> Self {
        Label::Text(truncate_label(text.as_ref()).to_string())
    }

    fn encoded_len(&self) -> usize {
        match self {
            Label::Index(_) => 4,
            Label::Text(t) => 1 + truncate_label(t).len(),
        }
    }

    fn is_index(&self) -> bool {
        matches!(self, Label::Index(_))
    }
}

impl From<&str> for Label {
    fn from(text: &str) -> Self {
        Label::text(text)
    }
}

impl From<String> for Label {
    fn from(text: String) -> Self {
        Label::text(text)
    }
}

impl From<i32> for Label {
    fn from(index: i32) -> Self {
        Label::Index(index)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Index(i) => write!(f, "#{}", i),
            Label::Text(t) => write!(f, "{}", t),
        }
    }
}

/// Corner coordinates shared by every record
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub row: i32,
}

impl Geometry {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, row: i32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            row,
        }
    }
}

/// Record discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Line,
    LineEx,
    Box,
    BoxEx,
    LifeLineBox,
    LifeLineLine,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Line => write!(f, "line"),
            ObjectKind::LineEx => write!(f, "line-ex"),
            ObjectKind::Box => write!(f, "box"),
            ObjectKind::BoxEx => write!(f, "box-ex"),
            ObjectKind::LifeLineBox => write!(f, "lifeline-box"),
            ObjectKind::LifeLineLine => write!(f, "lifeline-line"),
        }
    }
}

/// One stored graphical object
#[derive(Debug, Clone, PartialEq)]
pub enum GraphicalObject {
    Line {
        geometry: Geometry,
    },
    LineEx {
        geometry: Geometry,
        color: Rgb,
        /// Label position along the line, 0.0..=1.0
        relative_x: f64,
        arrows: ArrowFlags,
        label: Label,
    },
    Box {
        geometry: Geometry,
        row2: i32,
    },
    BoxEx {
        geometry: Geometry,
        row2: i32,
        fill: Rgb,
        label: Label,
    },
    LifeLineBox {
        geometry: Geometry,
        y_center: f64,
        y_exec_top: f64,
        y_exec_bottom: f64,
        fill: Rgb,
        relative_x: f64,
        label: Label,
    },
    LifeLineLine {
        geometry: Geometry,
        color: Rgb,
        relative_x: f64,
        label: Label,
    },
}

impl GraphicalObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            GraphicalObject::Line { .. } => ObjectKind::Line,
            GraphicalObject::LineEx { .. } => ObjectKind::LineEx,
            GraphicalObject::Box { .. } => ObjectKind::Box,
            GraphicalObject::BoxEx { .. } => ObjectKind::BoxEx,
            GraphicalObject::LifeLineBox { .. } => ObjectKind::LifeLineBox,
            GraphicalObject::LifeLineLine { .. } => ObjectKind::LifeLineLine,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        match self {
            GraphicalObject::Line { geometry }
            | GraphicalObject::LineEx { geometry, .. }
            | GraphicalObject::Box { geometry, .. }
            | GraphicalObject::BoxEx { geometry, .. }
            | GraphicalObject::LifeLineBox { geometry, .. }
            | GraphicalObject::LifeLineLine { geometry, .. } => geometry,
        }
    }

    pub fn label(&self) -> Option<&Label> {
        match self {
            GraphicalObject::Line { .. } | GraphicalObject::Box { .. } => None,
            GraphicalObject::LineEx { label, .. }
            | GraphicalObject::BoxEx { label, .. }
            | GraphicalObject::LifeLineBox { label, .. }
            | GraphicalObject::LifeLineLine { label, .. } => Some(label),
        }
    }

    /// Color carried by the record, if any
    pub fn color(&self) -> Option<Rgb> {
        match self {
            GraphicalObject::LineEx { color, .. } | GraphicalObject::LifeLineLine { color, .. } => {
                Some(*color)
            }
            GraphicalObject::BoxEx { fill, .. } | GraphicalObject::LifeLineBox { fill, .. } => {
                Some(*fill)
            }
            _ => None,
        }
    }

    pub fn arrows(&self) -> ArrowFlags {
        match self {
            GraphicalObject::LineEx { arrows, .. } => *arrows,
            _ => ArrowFlags::NONE,
        }
    }

    /// True for records drawn by a sub-plot decorator
    pub fn is_decorator(&self) -> bool {
        matches!(
            self,
            GraphicalObject::LifeLineBox { .. } | GraphicalObject::LifeLineLine { .. }
        )
    }

    /// Kind and arrow bits as stored in the header
    pub fn properties(&self) -> u16 {
        let label_kind = |label: &Label, index: u16, text: u16| {
            if label.is_index() {
                index
            } else {
                text
            }
        };
        match self {
            GraphicalObject::Line { .. } => KIND_LINE,
            GraphicalObject::LineEx { label, arrows, .. } => {
                label_kind(label, KIND_LINE_EX_LABEL_INDEX, KIND_LINE_EX_LABEL_STR)
                    | (arrows.bits() & ArrowFlags::MASK)
            }
            GraphicalObject::Box { .. } => KIND_BOX,
            GraphicalObject::BoxEx { label, .. } => {
                label_kind(label, KIND_BOX_EX_LABEL_INDEX, KIND_BOX_EX_LABEL_STR)
            }
            GraphicalObject::LifeLineBox { label, .. } => {
                KIND_DECORATOR_LIFELINE
                    | label_kind(label, KIND_BOX_EX_LABEL_INDEX, KIND_BOX_EX_LABEL_STR)
            }
            GraphicalObject::LifeLineLine { label, .. } => {
                KIND_DECORATOR_LIFELINE
                    | label_kind(label, KIND_LINE_EX_LABEL_INDEX, KIND_LINE_EX_LABEL_STR)
            }
        }
    }

    /// Exact payload size of this record
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + match self {
                GraphicalObject::Line { .. } => 0,
                GraphicalObject::LineEx { label, .. } => 4 + 8 + label.encoded_len(),
                GraphicalObject::Box { .. } => 4,
                GraphicalObject::BoxEx { label, .. } => 4 + 4 + label.encoded_len(),
                GraphicalObject::LifeLineBox { label, .. } => 3 * 8 + 4 + 8 + label.encoded_len(),
                GraphicalObject::LifeLineLine { label, .. } => 4 + 8 + label.encoded_len(),
            }
    }

    /// Serialize into a slot of exactly [`Self::encoded_len`] bytes
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<()> {
        let expected = self.encoded_len();
        if buf.len() != expected {
            return Err(StoreError::decode(
                0,
                format!("slot of {} bytes for a {} byte record", buf.len(), expected),
            ));
        }

        let mut w = FieldWriter { buf, pos: 0 };
        let g = self.geometry();
        w.u16(self.properties());
        w.f64(g.x1);
        w.f64(g.x2);
        w.f64(g.y1);
        w.f64(g.y2);
        w.i32(g.row);

        match self {
            GraphicalObject::Line { .. } => {}
            GraphicalObject::LineEx {
                color,
                relative_x,
                label,
                ..
            }
            | GraphicalObject::LifeLineLine {
                color,
                relative_x,
                label,
                ..
            } => {
                w.u32(color.0);
                w.f64(*relative_x);
                w.label(label);
            }
            GraphicalObject::Box { row2, .. } => w.i32(*row2),
            GraphicalObject::BoxEx {
                row2, fill, label, ..
            } => {
                w.i32(*row2);
                w.u32(fill.0);
                w.label(label);
            }
            GraphicalObject::LifeLineBox {
                y_center,
                y_exec_top,
                y_exec_bottom,
                fill,
                relative_x,
                label,
                ..
            } => {
                w.f64(*y_center);
                w.f64(*y_exec_top);
                w.f64(*y_exec_bottom);
                w.u32(fill.0);
                w.f64(*relative_x);
                w.label(label);
            }
        }
        Ok(())
    }

    /// Encode into a fresh buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0; self.encoded_len()];
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Decode a payload; `offset` is only used in error messages
    pub fn decode(payload: &[u8], offset: usize) -> Result<Self> {
        let mut r = FieldReader {
            cursor: Cursor::new(payload),
            base: offset,
        };

        let properties = r.u16()?;
        let x1 = r.f64()?;
        let x2 = r.f64()?;
        let y1 = r.f64()?;
        let y2 = r.f64()?;
        let row = r.i32()?;
        let geometry = Geometry::new(x1, y1, x2, y2, row);

        let kind = properties & KIND_MASK;
        let lifeline = kind & KIND_DECORATOR_LIFELINE != 0;
        let object = match kind & !KIND_DECORATOR_LIFELINE {
            KIND_LINE if !lifeline => GraphicalObject::Line { geometry },
            KIND_LINE_EX_LABEL_STR | KIND_LINE_EX_LABEL_INDEX => {
                let color = Rgb(r.u32()?);
                let relative_x = r.f64()?;
                let label = r.label(kind & KIND_LINE_EX_LABEL_INDEX != 0)?;
                if lifeline {
                    GraphicalObject::LifeLineLine {
                        geometry,
                        color,
                        relative_x,
                        label,
                    }
                } else {
                    GraphicalObject::LineEx {
                        geometry,
                        color,
                        relative_x,
                        arrows: ArrowFlags::from_bits_truncate(properties),
                        label,
                    }
                }
            }
            KIND_BOX if !lifeline => GraphicalObject::Box {
                geometry,
                row2: r.i32()?,
            },
            KIND_BOX_EX_LABEL_STR | KIND_BOX_EX_LABEL_INDEX if lifeline => {
                GraphicalObject::LifeLineBox {
                    geometry,
                    y_center: r.f64()?,
                    y_exec_top: r.f64()?,
                    y_exec_bottom: r.f64()?,
                    fill: Rgb(r.u32()?),
                    relative_x: r.f64()?,
                    label: r.label(kind & KIND_BOX_EX_LABEL_INDEX != 0)?,
                }
            }
            KIND_BOX_EX_LABEL_STR | KIND_BOX_EX_LABEL_INDEX => GraphicalObject::BoxEx {
                geometry,
                row2: r.i32()?,
                fill: Rgb(r.u32()?),
                label: r.label(kind & KIND_BOX_EX_LABEL_INDEX != 0)?,
            },
            _ => {
                return Err(StoreError::decode(
                    offset,
                    format!("unknown record kind 0x{:04x}", properties),
                ))
            }
        };

        let consumed = r.cursor.position() as usize;
        if consumed != payload.len() {
            return Err(StoreError::decode(
                offset + consumed,
                format!("{} trailing bytes after {}", payload.len() - consumed, object.kind()),
            ));
        }
        Ok(object)
    }
}

/// Overwrite the X span of an encoded record in place
pub fn write_x_span(payload: &mut [u8], x1: f64, x2: f64) -> Result<()> {
    if payload.len() < HEADER_LEN {
        return Err(StoreError::decode(0, "payload shorter than record header"));
    }
    LittleEndian::write_f64(&mut payload[X1_AT..X1_AT + 8], x1);
    LittleEndian::write_f64(&mut payload[X2_AT..X2_AT + 8], x2);
    Ok(())
}

/// Sequential writer over a slot sized by `encoded_len`
struct FieldWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl FieldWriter<'_> {
    fn u16(&mut self, v: u16) {
        LittleEndian::write_u16(&mut self.buf[self.pos..self.pos + 2], v);
        self.pos += 2;
    }

    fn i32(&mut self, v: i32) {
        LittleEndian::write_i32(&mut self.buf[self.pos..self.pos + 4], v);
        self.pos += 4;
    }

    fn u32(&mut self, v: u32) {
        LittleEndian::write_u32(&mut self.buf[self.pos..self.pos + 4], v);
        self.pos += 4;
    }

    fn f64(&mut self, v: f64) {
        LittleEndian::write_f64(&mut self.buf[self.pos..self.pos + 8], v);
        self.pos += 8;
    }

    fn label(&mut self, label: &Label) {
        match label {
            Label::Index(i) => self.i32(*i),
            Label::Text(text) => {
                let bytes = truncate_label(text).as_bytes();
                self.buf[self.pos] = bytes.len() as u8;
                self.pos += 1;
                self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
                self.pos += bytes.len();
            }
        }
    }
}

struct FieldReader<'a> {
    cursor: Cursor<&'a [u8]>,
    base: usize,
}

impl FieldReader<'_> {
    fn truncated(&self) -> StoreError {
        StoreError::decode(
            self.base + self.cursor.position() as usize,
            "payload truncated",
        )
    }

    fn u16(&mut self) -> Result<u16> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    fn i32(&mut self) -> Result<i32> {
        self.cursor
            .read_i32::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    fn u32(&mut self) -> Result<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    fn f64(&mut self) -> Result<f64> {
        self.cursor
            .read_f64::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    fn label(&mut self, is_index: bool) -> Result<Label> {
        if is_index {
            return Ok(Label::Index(self.i32()?));
        }
        let len = self.cursor.read_u8().map_err(|_| self.truncated())? as usize;
        let start = self.cursor.position() as usize;
        let bytes = self
            .cursor
            .get_ref()
            .get(start..start + len)
            .ok_or_else(|| self.truncated())?;
        let text = std::str::from_utf8(bytes)
            .map_err(|e| StoreError::decode(self.base + start, e.to_string()))?
            .to_string();
        self.cursor.set_position((start + len) as u64);
        Ok(Label::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> Geometry {
        Geometry::new(1.5, -2.0, 3.25, 4.0, 17)
    }

    fn round_trip(object: &GraphicalObject) -> GraphicalObject {
        let bytes = object.to_bytes().unwrap();
        assert_eq!(bytes.len(), object.encoded_len());
        GraphicalObject::decode(&bytes, 0).unwrap()
    }

    #[test]
    fn test_line_header_layout() {
        let line = GraphicalObject::Line {
            geometry: geometry(),
        };
        let bytes = line.to_bytes().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(LittleEndian::read_u16(&bytes[0..2]), KIND_LINE);
        assert_eq!(LittleEndian::read_f64(&bytes[2..10]), 1.5);
        assert_eq!(LittleEndian::read_f64(&bytes[10..18]), 3.25);
        assert_eq!(LittleEndian::read_i32(&bytes[34..38]), 17);
    }

    #[test]
    fn test_labelled_variants_decode() {
        let objects = vec![
            GraphicalObject::LineEx {
                geometry: geometry(),
                color: Rgb::new(1, 2, 3),
                relative_x: 0.5,
                arrows: ArrowFlags::SOLID_END,
                label: Label::text("msg"),
            },
            GraphicalObject::BoxEx {
                geometry: geometry(),
                row2: 20,
                fill: Rgb(0x00ff00),
                label: Label::Index(3),
            },
            GraphicalObject::LifeLineBox {
                geometry: geometry(),
                y_center: 1.0,
                y_exec_top: 1.1,
                y_exec_bottom: 0.9,
                fill: Rgb(7),
                relative_x: 0.0,
                label: Label::text("LifeLine:1"),
            },
            GraphicalObject::LifeLineLine {
                geometry: geometry(),
                color: Rgb(9),
                relative_x: 0.2,
                label: Label::Index(0),
            },
        ];
        for object in &objects {
            assert_eq!(&round_trip(object), object);
        }
    }

    #[test]
    fn test_properties_bits() {
        let lifeline = GraphicalObject::LifeLineBox {
            geometry: geometry(),
            y_center: 0.0,
            y_exec_top: 0.0,
            y_exec_bottom: 0.0,
            fill: Rgb(0),
            relative_x: 0.0,
            label: Label::text("a"),
        };
        assert_eq!(
            lifeline.properties(),
            KIND_DECORATOR_LIFELINE | KIND_BOX_EX_LABEL_STR
        );
        assert!(lifeline.is_decorator());

        let line = GraphicalObject::LineEx {
            geometry: geometry(),
            color: Rgb(0),
            relative_x: 0.5,
            arrows: ArrowFlags::OPEN_END,
            label: Label::Index(2),
        };
        assert_eq!(line.properties(), KIND_LINE_EX_LABEL_INDEX | 0x1000);
    }

    #[test]
    fn test_long_label_truncated_on_char_boundary() {
        let text = "é".repeat(200);
        let label = Label::text(&text);
        match &label {
            Label::Text(t) => {
                assert_eq!(t.len(), 254);
                assert!(t.chars().all(|c| c == 'é'));
            }
            Label::Index(_) => panic!("expected text label"),
        }
        assert_eq!(truncate_label(&"a".repeat(300)).len(), MAX_LABEL_LEN);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut bytes = GraphicalObject::Line {
            geometry: geometry(),
        }
        .to_bytes()
        .unwrap();
        LittleEndian::write_u16(&mut bytes[0..2], KIND_LINE | KIND_DECORATOR_LIFELINE);
        assert!(matches!(
            GraphicalObject::decode(&bytes, 40),
            Err(StoreError::Decode { offset: 40, .. })
        ));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let bytes = GraphicalObject::Box {
            geometry: geometry(),
            row2: 1,
        }
        .to_bytes()
        .unwrap();
        assert!(GraphicalObject::decode(&bytes[..bytes.len() - 1], 0).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = GraphicalObject::Line {
            geometry: geometry(),
        }
        .to_bytes()
        .unwrap();
        bytes.push(0);
        assert!(GraphicalObject::decode(&bytes, 0).is_err());
    }

    #[test]
    fn test_wrong_slot_size_rejected() {
        let line = GraphicalObject::Line {
            geometry: geometry(),
        };
        let mut buf = vec![0; HEADER_LEN + 1];
        assert!(line.encode_into(&mut buf).is_err());
    }

    #[test]
    fn test_write_x_span() {
        let mut bytes = GraphicalObject::Line {
            geometry: geometry(),
        }
        .to_bytes()
        .unwrap();
        write_x_span(&mut bytes, -1.0, 0.5).unwrap();
        let decoded = GraphicalObject::decode(&bytes, 0).unwrap();
        assert_eq!(decoded.geometry().x1, -1.0);
        assert_eq!(decoded.geometry().x2, 0.5);
        assert!(write_x_span(&mut [0u8; 4], 0.0, 0.0).is_err());
    }
}
