//! Small code sets stored in header slots.

use std::fmt;

/// Acquisition mode of an axis, as stored in `NDQUADFLAG` / `FDQUADFLAG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum QuadFlag {
    Complex = 0,
    Real = 1,
    /// Read and written as real.
    PseudoQuad = 2,
    StatesEcho = 3,
    /// Echo / anti-echo gradient selection.
    Gradient = 4,
}

impl QuadFlag {
    /// Decode a header value; anything but an exact code is rejected.
    pub fn from_header(value: f32) -> Option<Self> {
        if value.fract() != 0.0 {
            return None;
        }
        [
            Self::Complex,
            Self::Real,
            Self::PseudoQuad,
            Self::StatesEcho,
            Self::Gradient,
        ]
        .into_iter()
        .find(|flag| flag.as_f32() == value)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, Self::Complex)
    }

    /// Header slot value for this flag.
    pub fn as_f32(self) -> f32 {
        self as i32 as f32
    }
}

/// Window function recorded in `NDAPODCODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ApodCode {
    None = 0,
    SineBell = 1,
    Exponential = 2,
    Gaussian = 3,
}

impl ApodCode {
    pub fn as_f32(self) -> f32 {
        self as i32 as f32
    }
}

/// Logical axis in the current transposition state: X is the direct
/// (trailing) axis, then Y, Z and A outward. `FDDIMORDER` maps each to a
/// physical dimension code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X = 1,
    Y = 2,
    Z = 3,
    A = 4,
}

impl Axis {
    /// Axis for a 1-based logical index.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            1 => Some(Self::X),
            2 => Some(Self::Y),
            3 => Some(Self::Z),
            4 => Some(Self::A),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
            Self::A => "A",
        };
        f.write_str(letter)
    }
}

/// Byte order of a header block relative to this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdrStatus {
    Ok,
    Swapped,
    /// The byte-order constant matched in neither order.
    Bad,
}
