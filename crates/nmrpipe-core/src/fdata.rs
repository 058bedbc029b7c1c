//! NMRPipe FDATA layout: 512 four-byte slots, a static table of the named
//! fields stored in them, and name lookup.
//!
//! Every declared field is either a float occupying one slot or a
//! null-padded text field spanning `ceil(bytes / 4)` consecutive slots.
//! Per-axis fields are named `FDF<code><suffix>` with the physical axis code
//! 1..4; the two historical exceptions are the axis sizes of F2 and F1,
//! which live in `FDSIZE` and `FDSPECNUM`.

use std::collections::HashMap;
use std::sync::OnceLock;

// ─── Constants ──────────────────────────────────────────────────────────────

/// Number of 4-byte slots in the header.
pub const FDATA_SIZE: usize = 512;
/// Header size in bytes.
pub const FDATA_BYTES: usize = FDATA_SIZE * 4;
/// IEEE floating-point format constant.
pub const FD_IEEE_CONS: u32 = 0xEEEEEEEE;
/// Byte-order test constant.
pub const FD_ORDER_CONS: f32 = 2.345;
/// Default physical code for each logical axis of an untransposed dataset.
pub const DEFAULT_DIMORDER: [usize; 4] = [2, 1, 3, 4];

// Slots touched directly by the codec.
pub const FDFLTFORMAT: usize = 1;
pub const FDFLTORDER: usize = 2;
pub const FDDIMORDER1: usize = 24;

// ─── Field table ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Float,
    /// Null-padded text of the given width in bytes.
    Text(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub slot: usize,
    pub kind: FieldKind,
}

impl Field {
    /// Number of slots spanned by this field.
    pub fn width(&self) -> usize {
        match self.kind {
            FieldKind::Float => 1,
            FieldKind::Text(bytes) => bytes.div_ceil(4),
        }
    }
}

const fn f(name: &'static str, slot: usize) -> Field {
    Field {
        name,
        slot,
        kind: FieldKind::Float,
    }
}

const fn t(name: &'static str, slot: usize, bytes: usize) -> Field {
    Field {
        name,
        slot,
        kind: FieldKind::Text(bytes),
    }
}

/// Every field the format declares.
pub static FIELDS: &[Field] = &[
    // General
    f("FDMAGIC", 0),
    f("FDFLTFORMAT", 1),
    f("FDFLTORDER", 2),
    f("FDID", 3),
    f("FDDIMCOUNT", 9),
    f("FDDIMORDER1", 24),
    f("FDDIMORDER2", 25),
    f("FDDIMORDER3", 26),
    f("FDDIMORDER4", 27),
    f("FDSIZE", 99),
    f("FDREALSIZE", 97),
    f("FDSPECNUM", 219),
    f("FDQUADFLAG", 106),
    f("FD2DPHASE", 256),
    f("FDTRANSPOSED", 221),
    f("FDNUSDIM", 45),
    // Pipeline / stream
    f("FDPIPEFLAG", 57),
    f("FDPIPECOUNT", 75),
    f("FDCUBEFLAG", 447),
    f("FDSLICECOUNT", 443),
    f("FDSLICECOUNT1", 446),
    f("FDFILECOUNT", 442),
    f("FDTHREADCOUNT", 444),
    f("FDTHREADID", 445),
    f("FDFIRSTPLANE", 77),
    f("FDLASTPLANE", 78),
    f("FDPARTITION", 65),
    f("FDPLANELOC", 14),
    // Min / max
    f("FDMAX", 247),
    f("FDMIN", 248),
    f("FDSCALEFLAG", 250),
    f("FDDISPMAX", 251),
    f("FDDISPMIN", 252),
    f("FDPTHRESH", 253),
    f("FDNTHRESH", 254),
    // User
    f("FDUSER1", 70),
    f("FDUSER2", 71),
    f("FDUSER3", 72),
    f("FDUSER4", 73),
    f("FDUSER5", 74),
    f("FDUSER6", 76),
    // Block locations
    f("FDLASTBLOCK", 359),
    f("FDCONTBLOCK", 360),
    f("FDBASEBLOCK", 361),
    f("FDPEAKBLOCK", 362),
    f("FDBMAPBLOCK", 363),
    f("FDHISTBLOCK", 364),
    f("FD1DBLOCK", 365),
    // Date / time
    f("FDMONTH", 294),
    f("FDDAY", 295),
    f("FDYEAR", 296),
    f("FDHOURS", 283),
    f("FDMINS", 284),
    f("FDSECS", 285),
    // Miscellaneous
    f("FDMCFLAG", 135),
    f("FDNOISE", 153),
    f("FDRANK", 180),
    f("FDTEMPERATURE", 157),
    f("FDPRESSURE", 158),
    f("FD2DVIRGIN", 399),
    f("FDTAU", 199),
    f("FDDOMINFO", 266),
    f("FDMETHINFO", 267),
    f("FDSCALE", 478),
    f("FDSCORE", 370),
    f("FDSCANS", 371),
    f("FDDMXVAL", 40),
    f("FDDMXFLAG", 41),
    f("FDDELTATR", 42),
    // Text
    t("FDSRCNAME", 286, 16),
    t("FDUSERNAME", 290, 16),
    t("FDTITLE", 297, 60),
    t("FDCOMMENT", 312, 160),
    t("FDOPERNAME", 464, 32),
    // F2
    t("FDF2LABEL", 16, 8),
    f("FDF2APOD", 95),
    f("FDF2SW", 100),
    f("FDF2OBS", 119),
    f("FDF2OBSMID", 378),
    f("FDF2ORIG", 101),
    f("FDF2UNITS", 152),
    f("FDF2QUADFLAG", 56),
    f("FDF2FTFLAG", 220),
    f("FDF2AQSIGN", 64),
    f("FDF2CAR", 66),
    f("FDF2CENTER", 79),
    f("FDF2OFFPPM", 480),
    f("FDF2P0", 109),
    f("FDF2P1", 110),
    f("FDF2APODCODE", 413),
    f("FDF2APODQ1", 415),
    f("FDF2APODQ2", 416),
    f("FDF2APODQ3", 417),
    f("FDF2LB", 111),
    f("FDF2GB", 374),
    f("FDF2GOFF", 382),
    f("FDF2C1", 418),
    f("FDF2APODDF", 419),
    f("FDF2ZF", 108),
    f("FDF2X1", 257),
    f("FDF2XN", 258),
    f("FDF2FTSIZE", 96),
    f("FDF2TDSIZE", 386),
    // F1
    t("FDF1LABEL", 18, 8),
    f("FDF1APOD", 428),
    f("FDF1SW", 229),
    f("FDF1OBS", 218),
    f("FDF1OBSMID", 379),
    f("FDF1ORIG", 249),
    f("FDF1UNITS", 234),
    f("FDF1QUADFLAG", 55),
    f("FDF1FTFLAG", 222),
    f("FDF1AQSIGN", 475),
    f("FDF1CAR", 67),
    f("FDF1CENTER", 80),
    f("FDF1OFFPPM", 481),
    f("FDF1P0", 245),
    f("FDF1P1", 246),
    f("FDF1APODCODE", 414),
    f("FDF1APODQ1", 420),
    f("FDF1APODQ2", 421),
    f("FDF1APODQ3", 422),
    f("FDF1LB", 243),
    f("FDF1GB", 375),
    f("FDF1GOFF", 383),
    f("FDF1C1", 423),
    f("FDF1ZF", 437),
    f("FDF1X1", 259),
    f("FDF1XN", 260),
    f("FDF1FTSIZE", 98),
    f("FDF1TDSIZE", 387),
    // F3
    t("FDF3LABEL", 20, 8),
    f("FDF3SIZE", 15),
    f("FDF3APOD", 50),
    f("FDF3SW", 11),
    f("FDF3OBS", 10),
    f("FDF3OBSMID", 380),
    f("FDF3ORIG", 12),
    f("FDF3UNITS", 58),
    f("FDF3QUADFLAG", 51),
    f("FDF3FTFLAG", 13),
    f("FDF3AQSIGN", 476),
    f("FDF3CAR", 68),
    f("FDF3CENTER", 81),
    f("FDF3OFFPPM", 482),
    f("FDF3P0", 60),
    f("FDF3P1", 61),
    f("FDF3APODCODE", 400),
    f("FDF3APODQ1", 401),
    f("FDF3APODQ2", 402),
    f("FDF3APODQ3", 403),
    f("FDF3LB", 372),
    f("FDF3GB", 376),
    f("FDF3GOFF", 384),
    f("FDF3C1", 404),
    f("FDF3ZF", 438),
    f("FDF3X1", 261),
    f("FDF3XN", 262),
    f("FDF3FTSIZE", 200),
    f("FDF3TDSIZE", 388),
    // F4
    t("FDF4LABEL", 22, 8),
    f("FDF4SIZE", 32),
    f("FDF4APOD", 53),
    f("FDF4SW", 29),
    f("FDF4OBS", 28),
    f("FDF4OBSMID", 381),
    f("FDF4ORIG", 30),
    f("FDF4UNITS", 59),
    f("FDF4QUADFLAG", 54),
    f("FDF4FTFLAG", 31),
    f("FDF4AQSIGN", 477),
    f("FDF4CAR", 69),
    f("FDF4CENTER", 82),
    f("FDF4OFFPPM", 483),
    f("FDF4P0", 62),
    f("FDF4P1", 63),
    f("FDF4APODCODE", 405),
    f("FDF4APODQ1", 406),
    f("FDF4APODQ2", 407),
    f("FDF4APODQ3", 408),
    f("FDF4LB", 373),
    f("FDF4GB", 377),
    f("FDF4GOFF", 385),
    f("FDF4C1", 409),
    f("FDF4ZF", 439),
    f("FDF4X1", 263),
    f("FDF4XN", 264),
    f("FDF4FTSIZE", 201),
    f("FDF4TDSIZE", 389),
];

fn index() -> &'static HashMap<&'static str, usize> {
    static INDEX: OnceLock<HashMap<&'static str, usize>> = OnceLock::new();
    INDEX.get_or_init(|| {
        FIELDS
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name, i))
            .collect()
    })
}

/// Position of a declared field in [`FIELDS`].
pub fn field_index(name: &str) -> Option<usize> {
    index().get(name).copied()
}

/// Look up a declared field by its physical name.
pub fn lookup_field(name: &str) -> Option<&'static Field> {
    field_index(name).map(|i| &FIELDS[i])
}

/// Compute the next power of 2 >= n.
pub fn next_power2(n: usize) -> usize {
    n.max(1).next_power_of_two()
}
