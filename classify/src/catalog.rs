//! Static table of the 38 folded TIMIT phoneme classes.
//!
//! Ids run from 1 to 38 and are grouped contiguously: stops, affricates,
//! fricatives, nasals, semivowels, vowels, then silence. Each class also
//! belongs to one voice bucket.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a phoneme class, `1..=38`.
pub type ClassId = usize;

/// The silence class, returned when a coarse stage decides "other".
pub const SILENCE: ClassId = 38;

/// Manner-of-articulation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Stop,
    Affricate,
    Fricative,
    Nasal,
    Semivowel,
    Vowel,
    Other,
}

impl Group {
    pub const ALL: [Group; 7] = [
        Group::Stop,
        Group::Affricate,
        Group::Fricative,
        Group::Nasal,
        Group::Semivowel,
        Group::Vowel,
        Group::Other,
    ];

    /// Short label used in reports.
    pub fn code(self) -> &'static str {
        match self {
            Group::Stop => "STOP",
            Group::Affricate => "AFRI",
            Group::Fricative => "FRIC",
            Group::Nasal => "NASL",
            Group::Semivowel => "SEMV",
            Group::Vowel => "VOWL",
            Group::Other => "OTHR",
        }
    }

    /// Ids of the classes in this group, ascending.
    pub fn classes(self) -> Vec<ClassId> {
        CATALOG.iter().filter(|c| c.group == self).map(|c| c.id).collect()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Coarse voicing bucket: obstruents (voiceless-leaning), sonorants
/// (voiced), and silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    Obstruent,
    Sonorant,
    Other,
}

impl Voice {
    pub const ALL: [Voice; 3] = [Voice::Obstruent, Voice::Sonorant, Voice::Other];

    /// Ids of the classes in this bucket, ascending.
    pub fn classes(self) -> Vec<ClassId> {
        CATALOG.iter().filter(|c| c.voice == self).map(|c| c.id).collect()
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Voice::Obstruent => "vl",
            Voice::Sonorant => "vd",
            Voice::Other => "nv",
        })
    }
}

/// One row of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhonemeClass {
    pub id: ClassId,
    pub name: &'static str,
    pub group: Group,
    pub voice: Voice,
}

const fn class(id: ClassId, name: &'static str, group: Group, voice: Voice) -> PhonemeClass {
    PhonemeClass {
        id,
        name,
        group,
        voice,
    }
}

use Group::*;
use Voice::{Obstruent as Obs, Sonorant as Son};

/// Every class, indexed by `id - 1`.
pub static CATALOG: [PhonemeClass; 38] = [
    class(1, "b", Stop, Obs),
    class(2, "d", Stop, Obs),
    class(3, "k", Stop, Obs),
    class(4, "p", Stop, Obs),
    class(5, "t", Stop, Obs),
    class(6, "g", Stop, Obs),
    class(7, "jh", Affricate, Obs),
    class(8, "ch", Affricate, Obs),
    class(9, "s", Fricative, Obs),
    class(10, "sh", Fricative, Obs),
    class(11, "th", Fricative, Obs),
    class(12, "v", Fricative, Obs),
    class(13, "f", Fricative, Obs),
    class(14, "dh", Fricative, Obs),
    class(15, "z", Fricative, Obs),
    class(16, "m", Nasal, Son),
    class(17, "n", Nasal, Son),
    class(18, "ng", Nasal, Son),
    class(19, "l", Semivowel, Son),
    class(20, "r", Semivowel, Son),
    class(21, "hh", Semivowel, Son),
    class(22, "w", Semivowel, Son),
    class(23, "y", Semivowel, Son),
    class(24, "aa", Vowel, Son),
    class(25, "ae", Vowel, Son),
    class(26, "ah", Vowel, Son),
    class(27, "aw", Vowel, Son),
    class(28, "er", Vowel, Son),
    class(29, "ay", Vowel, Son),
    class(30, "eh", Vowel, Son),
    class(31, "ey", Vowel, Son),
    class(32, "ih", Vowel, Son),
    class(33, "iy", Vowel, Son),
    class(34, "ow", Vowel, Son),
    class(35, "oy", Vowel, Son),
    class(36, "uh", Vowel, Son),
    class(37, "uw", Vowel, Son),
    class(38, "sil", Other, Voice::Other),
];

pub fn by_id(id: ClassId) -> Option<&'static PhonemeClass> {
    id.checked_sub(1).and_then(|i| CATALOG.get(i))
}

pub fn by_name(name: &str) -> Option<&'static PhonemeClass> {
    CATALOG.iter().find(|c| c.name == name)
}

/// All class ids, ascending.
pub fn all() -> Vec<ClassId> {
    CATALOG.iter().map(|c| c.id).collect()
}
