//! Stitching child entities onto their parents.
//!
//! The child type declares a foreign-key field naming the parent field it must
//! equal; the parent type exposes a child slot (`Vec<C>` or `Option<C>`).
//! Correlation is a plain nested scan over the two lists: eager-loaded child
//! sets are page-sized.

use crate::entity::{Cardinality, ChildSlot, Entity, ForeignKey, Getter};
use crate::error::{ConfigError, OrmResult};
use crate::meta::{EntityMeta, FieldMeta, metadata};
use crate::value::ValueKind;

/// Resolved parent/child link between `P` and `C`.
pub struct Relation<P: 'static, C: 'static> {
    slot: &'static ChildSlot<P>,
    parent_key: Getter<P>,
    child_key: Getter<C>,
    foreign_key: &'static str,
}

impl<P: Entity, C: Entity> Relation<P, C> {
    /// Resolve the slot on `P` and the foreign key on `C`.
    pub fn resolve() -> OrmResult<Self> {
        let parent = metadata::<P>();
        let child = metadata::<C>();

        let slot = parent
            .child_slot_for::<C>()
            .ok_or(ConfigError::NoChildSlot {
                parent: parent.type_name(),
                child: child.type_name(),
            })?;

        let (fk, key) = foreign_key_towards(parent, child)?;
        if fk.kind() != ValueKind::Int {
            return Err(ConfigError::ForeignKeyNotInteger {
                child: child.type_name(),
                field: fk.name(),
            }
            .into());
        }
        let child_key = child
            .getter(fk.name())
            .ok_or(ConfigError::ForeignKeyUnreadable {
                child: child.type_name(),
                field: fk.name(),
            })?;

        let unknown_target = ConfigError::UnknownParentField {
            parent: parent.type_name(),
            field: key.target,
        };
        let target = parent.field(key.target).ok_or(unknown_target.clone())?;
        if target.kind() != ValueKind::Int {
            return Err(ConfigError::ParentKeyNotInteger {
                parent: parent.type_name(),
                field: key.target,
            }
            .into());
        }
        let parent_key = parent.getter(key.target).ok_or(unknown_target)?;

        Ok(Self {
            slot,
            parent_key,
            child_key,
            foreign_key: fk.name(),
        })
    }

    /// Name of the child slot on `P`.
    pub fn slot_name(&self) -> &'static str {
        self.slot.name()
    }

    /// Name of the foreign-key field on `C`.
    pub fn foreign_key(&self) -> &'static str {
        self.foreign_key
    }

    /// Assign to every parent the children whose key equals the parent's.
    ///
    /// Children keep their relative order. A collection slot always receives a
    /// list (possibly empty); a single slot receives the first match or `None`.
    pub fn apply(&self, parents: &mut [P], children: &[C]) {
        for parent in parents.iter_mut() {
            let Some(key) = (self.parent_key)(parent).as_i64() else {
                self.assign(parent, Vec::new());
                continue;
            };
            let matched: Vec<C> = children
                .iter()
                .filter(|child| (self.child_key)(*child).as_i64() == Some(key))
                .cloned()
                .collect();
            self.assign(parent, matched);
        }
    }

    fn assign(&self, parent: &mut P, matched: Vec<C>) {
        match self.slot.cardinality() {
            Cardinality::Many => self.slot.assign_many(parent, matched),
            Cardinality::One => self.slot.assign_one(parent, matched.into_iter().next()),
        }
    }
}

/// Correlate `children` into `parents` through `C`'s declared foreign key.
pub fn correlate<P: Entity, C: Entity>(parents: &mut [P], children: &[C]) -> OrmResult<()> {
    let relation = Relation::<P, C>::resolve()?;
    relation.apply(parents, children);
    tracing::trace!(
        target: "procmap.command",
        parent = metadata::<P>().type_name(),
        child = metadata::<C>().type_name(),
        slot = relation.slot_name(),
        parents = parents.len(),
        children = children.len(),
        "correlated children"
    );
    Ok(())
}

/// The single foreign key on `C` that points at `P`.
///
/// Keys qualified with another parent type are ignored. When several candidates
/// remain, only those whose target is a field of `P` count.
fn foreign_key_towards<P, C>(
    parent: &'static EntityMeta<P>,
    child: &'static EntityMeta<C>,
) -> OrmResult<(&'static FieldMeta<C>, ForeignKey)> {
    let mut candidates: Vec<(&'static FieldMeta<C>, ForeignKey)> = child
        .fields()
        .iter()
        .filter_map(|f| f.foreign_key().map(|k| (f, k)))
        .filter(|(_, k)| k.parent.is_none_or(|p| p == parent.type_name()))
        .collect();

    if candidates.len() > 1 {
        candidates.retain(|(_, k)| parent.field(k.target).is_some());
    }

    match candidates.as_slice() {
        [found] => Ok(*found),
        [] => Err(ConfigError::MissingForeignKey {
            parent: parent.type_name(),
            child: child.type_name(),
        }
        .into()),
        _ => Err(ConfigError::AmbiguousForeignKey {
            parent: parent.type_name(),
            child: child.type_name(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityDescriptor, FieldDef};
    use crate::error::OrmError;
    use crate::value::FieldValue;

    #[derive(Debug, Default, Clone)]
    struct Dept {
        id: i64,
        staff: Vec<Emp>,
    }

    impl Entity for Dept {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::new("Dept")
                .field(
                    FieldDef::<Dept>::of::<i64>("id")
                        .identity()
                        .getter(|d| d.id.to_value()),
                )
                .child(ChildSlot::<Dept>::many::<Emp>("staff", |d| &mut d.staff))
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Emp {
        id: i64,
        dept_id: Option<i64>,
    }

    impl Entity for Emp {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::new("Emp")
                .field(FieldDef::<Emp>::of::<i64>("id").getter(|e| e.id.to_value()))
                .field(
                    FieldDef::<Emp>::of::<Option<i64>>("dept_id")
                        .foreign_key("id")
                        .getter(|e| e.dept_id.to_value()),
                )
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Manager {
        id: i64,
        dept: Option<Dept>,
    }

    impl Entity for Manager {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::new("Manager")
                .field(FieldDef::<Manager>::of::<i64>("id").getter(|m| m.id.to_value()))
                .child(ChildSlot::<Manager>::one::<Dept>("dept", |m| &mut m.dept))
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Badge {
        code: String,
    }

    impl Entity for Badge {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::new("Badge").field(
                FieldDef::<Badge>::of::<String>("code")
                    .foreign_key("id")
                    .getter(|b| b.code.to_value()),
            )
        }
    }

    fn emp(id: i64, dept: Option<i64>) -> Emp {
        Emp { id, dept_id: dept }
    }

    #[test]
    fn partitions_children_in_order() {
        let mut depts = vec![
            Dept { id: 1, ..Default::default() },
            Dept { id: 2, ..Default::default() },
            Dept { id: 3, ..Default::default() },
        ];
        let staff = vec![emp(10, Some(1)), emp(11, Some(2)), emp(12, Some(1)), emp(13, None)];
        correlate(&mut depts, &staff).unwrap();

        assert_eq!(depts[0].staff, vec![emp(10, Some(1)), emp(12, Some(1))]);
        assert_eq!(depts[1].staff, vec![emp(11, Some(2))]);
        assert!(depts[2].staff.is_empty());
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Profile {
        manager_id: i64,
        bio: String,
    }

    impl Entity for Profile {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::new("Profile")
                .field(
                    FieldDef::<Profile>::of::<i64>("manager_id")
                        .foreign_key("Manager.id")
                        .getter(|p| p.manager_id.to_value()),
                )
                .field(FieldDef::<Profile>::of::<String>("bio").getter(|p| p.bio.to_value()))
        }
    }

    #[test]
    fn single_slot_takes_first_match() {
        #[derive(Debug, Default, Clone)]
        struct Boss {
            id: i64,
            profile: Option<Profile>,
        }
        impl Entity for Boss {
            fn describe() -> EntityDescriptor<Self> {
                EntityDescriptor::new("Manager")
                    .field(FieldDef::<Boss>::of::<i64>("id").getter(|b| b.id.to_value()))
                    .child(ChildSlot::<Boss>::one::<Profile>("profile", |b| &mut b.profile))
            }
        }

        let profile = |manager_id, bio: &str| Profile {
            manager_id,
            bio: bio.to_string(),
        };
        let mut bosses = vec![
            Boss { id: 1, profile: None },
            Boss { id: 2, profile: Some(profile(0, "stale")) },
        ];
        correlate(&mut bosses, &[profile(1, "first"), profile(1, "second")]).unwrap();

        assert_eq!(bosses[0].profile, Some(profile(1, "first")));
        assert_eq!(bosses[1].profile, None);
    }

    #[test]
    fn key_qualified_for_another_parent_is_ignored() {
        let mut managers = vec![Manager { id: 1, dept: None }];
        let err = correlate(&mut managers, &[Dept::default()]).unwrap_err();
        assert!(matches!(
            err,
            OrmError::Config(ConfigError::MissingForeignKey { parent: "Manager", child: "Dept" })
        ));
        assert!(Relation::<Manager, Profile>::resolve().is_err());
    }

    #[test]
    fn missing_slot_is_a_configuration_error() {
        let mut emps = vec![emp(1, None)];
        let err = correlate(&mut emps, &[Dept::default()]).unwrap_err();
        assert!(matches!(
            err,
            OrmError::Config(ConfigError::NoChildSlot { parent: "Emp", child: "Dept" })
        ));
    }

    #[test]
    fn non_integer_key_is_rejected() {
        #[derive(Debug, Default, Clone)]
        struct Holder {
            id: i64,
            badges: Vec<Badge>,
        }
        impl Entity for Holder {
            fn describe() -> EntityDescriptor<Self> {
                EntityDescriptor::new("Holder")
                    .field(FieldDef::<Holder>::of::<i64>("id").getter(|h| h.id.to_value()))
                    .child(ChildSlot::<Holder>::many::<Badge>("badges", |h| &mut h.badges))
            }
        }

        let mut holders = vec![Holder::default()];
        let err = correlate(&mut holders, &[Badge { code: "x".into() }]).unwrap_err();
        assert!(matches!(
            err,
            OrmError::Config(ConfigError::ForeignKeyNotInteger { field: "code", .. })
        ));
        assert!(holders[0].badges.is_empty());
    }

    #[derive(Debug, Default, Clone)]
    struct Team {
        code: String,
        members: Vec<Member>,
    }

    impl Entity for Team {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::new("Team")
                .field(
                    FieldDef::<Team>::of::<String>("code")
                        .identity()
                        .getter(|t| t.code.to_value()),
                )
                .child(ChildSlot::<Team>::many::<Member>("members", |t| &mut t.members))
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Member {
        team_code: i64,
    }

    impl Entity for Member {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::new("Member").field(
                FieldDef::<Member>::of::<i64>("team_code")
                    .foreign_key("code")
                    .getter(|m| m.team_code.to_value()),
            )
        }
    }

    #[test]
    fn text_parent_key_is_rejected_instead_of_matching_nothing() {
        let mut teams = vec![Team {
            code: "1".into(),
            ..Default::default()
        }];
        let err = correlate(&mut teams, &[Member { team_code: 1 }]).unwrap_err();
        assert!(matches!(
            err,
            OrmError::Config(ConfigError::ParentKeyNotInteger { parent: "Team", field: "code" })
        ));
        assert!(teams[0].members.is_empty());
    }

    #[test]
    fn foreign_key_without_getter_is_unreadable() {
        #[derive(Debug, Default, Clone)]
        struct Seat {
            dept_id: i64,
        }
        impl Entity for Seat {
            fn describe() -> EntityDescriptor<Self> {
                EntityDescriptor::new("Seat").field(
                    FieldDef::<Seat>::of::<i64>("dept_id")
                        .foreign_key("id")
                        .setter(|s, v| {
                            s.dept_id = FieldValue::from_value(v)?;
                            Ok(())
                        }),
                )
            }
        }
        #[derive(Debug, Default, Clone)]
        struct Room {
            id: i64,
            seats: Vec<Seat>,
        }
        impl Entity for Room {
            fn describe() -> EntityDescriptor<Self> {
                EntityDescriptor::new("Room")
                    .field(FieldDef::<Room>::of::<i64>("id").getter(|r| r.id.to_value()))
                    .child(ChildSlot::<Room>::many::<Seat>("seats", |r| &mut r.seats))
            }
        }

        let err = Relation::<Room, Seat>::resolve().err().unwrap();
        assert!(matches!(
            err,
            OrmError::Config(ConfigError::ForeignKeyUnreadable { child: "Seat", field: "dept_id" })
        ));
        assert!(err.to_string().contains("no getter"));
    }
}
