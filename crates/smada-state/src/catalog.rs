//! Reward and violation types a teacher can apply from the panel.

use serde::Serialize;

use crate::schema::PointKind;

/// A predefined ledger action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionType {
    pub code: &'static str,
    pub label: &'static str,
    pub points: i64,
}

impl ActionType {
    pub fn kind(&self) -> PointKind {
        if self.points < 0 {
            PointKind::Violation
        } else {
            PointKind::Reward
        }
    }
}

pub static REWARD_TYPES: [ActionType; 4] = [
    ActionType {
        code: "R1",
        label: "Juara Kelas",
        points: 50,
    },
    ActionType {
        code: "R2",
        label: "Lomba Nasional",
        points: 100,
    },
    ActionType {
        code: "R3",
        label: "Aktif Organisasi",
        points: 20,
    },
    ActionType {
        code: "R4",
        label: "Membantu Guru",
        points: 10,
    },
];

pub static VIOLATION_TYPES: [ActionType; 4] = [
    ActionType {
        code: "V1",
        label: "Terlambat",
        points: -5,
    },
    ActionType {
        code: "V2",
        label: "Atribut Tidak Lengkap",
        points: -10,
    },
    ActionType {
        code: "V3",
        label: "Bolos Pelajaran",
        points: -25,
    },
    ActionType {
        code: "V4",
        label: "Merusak Fasilitas",
        points: -50,
    },
];

/// Look up an action by code, case-insensitively.
pub fn find_action(code: &str) -> Option<&'static ActionType> {
    REWARD_TYPES
        .iter()
        .chain(VIOLATION_TYPES.iter())
        .find(|action| action.code.eq_ignore_ascii_case(code.trim()))
}
