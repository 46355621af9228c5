//! CRUD-direction bit-set.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Directions in which a field takes part in mapping.
///
/// A field without a `Crud` annotation takes part in every direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Crud(u8);

impl Crud {
    pub const NONE: Crud = Crud(0);
    pub const CREATE: Crud = Crud(1);
    pub const READ: Crud = Crud(1 << 1);
    pub const UPDATE: Crud = Crud(1 << 2);
    pub const DELETE: Crud = Crud(1 << 3);
    pub const DONT_USE: Crud = Crud(1 << 4);
    pub const ALL: Crud = Crud(0b1111);

    const NAMES: [(Crud, &'static str); 5] = [
        (Crud::CREATE, "create"),
        (Crud::READ, "read"),
        (Crud::UPDATE, "update"),
        (Crud::DELETE, "delete"),
        (Crud::DONT_USE, "dont_use"),
    ];

    pub const fn from_bits(bits: u8) -> Crud {
        Crud(bits & 0b1_1111)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn intersects(self, other: Crud) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn contains(self, other: Crud) -> bool {
        self.0 & other.0 == other.0
    }

    /// Parse a `|`- or `,`-separated list such as `"create|read"`.
    pub fn parse(s: &str) -> Option<Crud> {
        let mut out = Crud::NONE;
        for part in s.split(['|', ',']).map(str::trim).filter(|p| !p.is_empty()) {
            let part = part.to_ascii_lowercase();
            if part == "all" {
                out |= Crud::ALL;
                continue;
            }
            let (flag, _) = Crud::NAMES.iter().find(|(_, name)| *name == part)?;
            out |= *flag;
        }
        Some(out)
    }

    /// Whether a field annotated with `self` takes part in `direction`.
    pub(crate) fn admits(self, direction: Crud) -> bool {
        self == Crud::ALL || self.intersects(direction)
    }
}

impl BitOr for Crud {
    type Output = Crud;

    fn bitor(self, rhs: Crud) -> Crud {
        Crud(self.0 | rhs.0)
    }
}

impl BitOrAssign for Crud {
    fn bitor_assign(&mut self, rhs: Crud) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Crud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Crud::ALL {
            return f.write_str("Crud(all)");
        }
        let names: Vec<&str> = Crud::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Crud({})", names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_both_separators() {
        assert_eq!(Crud::parse("create|read"), Some(Crud::CREATE | Crud::READ));
        assert_eq!(Crud::parse("update, delete"), Some(Crud::UPDATE | Crud::DELETE));
        assert_eq!(Crud::parse("All"), Some(Crud::ALL));
        assert_eq!(Crud::parse("dont_use"), Some(Crud::DONT_USE));
        assert_eq!(Crud::parse("upsert"), None);
    }

    #[test]
    fn dont_use_is_outside_all() {
        assert!(!Crud::ALL.intersects(Crud::DONT_USE));
        assert!(!Crud::DONT_USE.admits(Crud::ALL));
        assert!(Crud::CREATE.admits(Crud::ALL));
    }

    #[test]
    fn debug_lists_flags() {
        assert_eq!(format!("{:?}", Crud::CREATE | Crud::UPDATE), "Crud(create|update)");
        assert_eq!(format!("{:?}", Crud::ALL), "Crud(all)");
    }
}
