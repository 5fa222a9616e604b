//! Core type definitions shared by the store and the plot layer
//!
//! Colors, bounding boxes, arrow-end flags, line patterns and sub-plot
//! property bits.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Packed `0xRRGGBB` color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn r(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(&self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0x00ff_ffff)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Extent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Extent {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Box seeded from one record's corners
    ///
    /// X keeps the record's own ordering (x1 is the start time); Y is sorted.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x_min: x1.min(x2),
            x_max: x1.max(x2),
            y_min: y1.min(y2),
            y_max: y1.max(y2),
        }
    }

    /// Grow to cover `other`; never shrinks
    pub fn include(&mut self, other: &Extent) {
        self.x_min = self.x_min.min(other.x_min);
        self.x_max = self.x_max.max(other.x_max);
        self.y_min = self.y_min.min(other.y_min);
        self.y_max = self.y_max.max(other.y_max);
    }

    pub fn union(mut self, other: &Extent) -> Extent {
        self.include(other);
        self
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x_min:{} x_max:{} y_min:{} y_max:{}",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}

/// Arrow-end decoration bits stored in a line record's properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ArrowFlags(pub u16);

impl ArrowFlags {
    pub const NONE: ArrowFlags = ArrowFlags(0);
    pub const OPEN_START: ArrowFlags = ArrowFlags(0x0400);
    pub const SOLID_START: ArrowFlags = ArrowFlags(0x0800);
    pub const OPEN_END: ArrowFlags = ArrowFlags(0x1000);
    pub const SOLID_END: ArrowFlags = ArrowFlags(0x2000);
    pub const MASK: u16 = 0x3c00;

    pub fn bits(&self) -> u16 {
        self.0
    }

    /// Keep only valid arrow bits
    pub fn from_bits_truncate(bits: u16) -> Self {
        Self(bits & Self::MASK)
    }

    pub fn contains(&self, other: ArrowFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ArrowFlags {
    type Output = ArrowFlags;

    fn bitor(self, rhs: ArrowFlags) -> ArrowFlags {
        ArrowFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for ArrowFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = if self.contains(ArrowFlags::SOLID_START) {
            "<|"
        } else if self.contains(ArrowFlags::OPEN_START) {
            "<"
        } else {
            ""
        };
        let end = if self.contains(ArrowFlags::SOLID_END) {
            "|>"
        } else if self.contains(ArrowFlags::OPEN_END) {
            ">"
        } else {
            ""
        };
        write!(f, "{}--{}", start, end)
    }
}

/// Line pattern override for a whole graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum LinePattern {
    /// Renderer picks the pattern
    #[default]
    None,
    Solid,
    Dash,
    Dot,
    DashDot,
    DashDotDot,
}

impl fmt::Display for LinePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinePattern::None => write!(f, "none"),
            LinePattern::Solid => write!(f, "solid"),
            LinePattern::Dash => write!(f, "dash"),
            LinePattern::Dot => write!(f, "dot"),
            LinePattern::DashDot => write!(f, "dash-dot"),
            LinePattern::DashDotDot => write!(f, "dash-dot-dot"),
        }
    }
}

/// Sub-plot property bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SubPlotProperties(pub u32);

impl SubPlotProperties {
    pub const NONE: SubPlotProperties = SubPlotProperties(0);
    /// Rows are schedule slots rather than values
    pub const SCHEDULE: SubPlotProperties = SubPlotProperties(0x01);
    /// Sub-plot holds a sequence diagram with life-lines
    pub const SEQUENCE: SubPlotProperties = SubPlotProperties(0x02);
    pub const NO_LEGEND_COLOR: SubPlotProperties = SubPlotProperties(0x08);
    /// Free drawing: X is neither time-ordered nor non-negative
    pub const PAINTING: SubPlotProperties = SubPlotProperties(0x10);

    pub fn contains(&self, other: SubPlotProperties) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl BitOr for SubPlotProperties {
    type Output = SubPlotProperties;

    fn bitor(self, rhs: SubPlotProperties) -> SubPlotProperties {
        SubPlotProperties(self.0 | rhs.0)
    }
}

impl BitOrAssign for SubPlotProperties {
    fn bitor_assign(&mut self, rhs: SubPlotProperties) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for SubPlotProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (SubPlotProperties::SCHEDULE, "schedule"),
            (SubPlotProperties::SEQUENCE, "sequence"),
            (SubPlotProperties::NO_LEGEND_COLOR, "no-legend-color"),
            (SubPlotProperties::PAINTING, "painting"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| *name)
        .collect();

        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}
