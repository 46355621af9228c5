//! Parameter synthesis from entity fields.

use crate::command::Param;
use crate::crud::Crud;
use crate::entity::Entity;
use crate::meta::metadata;

/// Named input parameters for every field of `source` taking part in `direction`.
///
/// Fields without a CRUD annotation always take part. Order follows field
/// declaration order; callers relying on positional binding depend on it. Absent
/// optional values become `Value::Null`. A field without a setter is still
/// emitted: only the CRUD annotation gates parameters.
pub fn to_parameters<T: Entity>(source: &T, direction: Crud) -> Vec<Param> {
    metadata::<T>()
        .fields()
        .iter()
        .filter(|field| field.admits(direction))
        .filter_map(|field| {
            let value = field.get(source)?;
            Some(Param::input(field.column(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityDescriptor, FieldDef};
    use crate::value::{FieldValue, Value};

    #[derive(Debug, Default, Clone)]
    struct Account {
        id: i64,
        email: Option<String>,
        password: String,
        created_by: String,
        internal: i32,
    }

    impl Entity for Account {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::new("Account")
                .field(FieldDef::<Account>::of::<i64>("id").getter(|a| a.id.to_value()))
                .field(
                    FieldDef::<Account>::of::<Option<String>>("email")
                        .column("email_address")
                        .getter(|a| a.email.to_value()),
                )
                .field(
                    FieldDef::<Account>::of::<String>("password")
                        .crud(Crud::CREATE | Crud::UPDATE)
                        .getter(|a| a.password.to_value()),
                )
                .field(
                    FieldDef::<Account>::of::<String>("created_by")
                        .crud(Crud::CREATE)
                        .getter(|a| a.created_by.to_value()),
                )
                .field(
                    FieldDef::<Account>::of::<i32>("internal")
                        .crud(Crud::DONT_USE)
                        .getter(|a| a.internal.to_value()),
                )
        }
    }

    fn sample() -> Account {
        Account {
            id: 7,
            email: None,
            password: "secret".into(),
            created_by: "admin".into(),
            internal: 1,
        }
    }

    fn names(params: &[Param]) -> Vec<&str> {
        params.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn create_only_field_is_filtered_by_direction() {
        let account = sample();
        assert_eq!(
            names(&to_parameters(&account, Crud::UPDATE)),
            ["id", "email_address", "password"]
        );
        assert_eq!(
            names(&to_parameters(&account, Crud::CREATE)),
            ["id", "email_address", "password", "created_by"]
        );
    }

    #[test]
    fn all_direction_skips_dont_use() {
        let params = to_parameters(&sample(), Crud::ALL);
        assert_eq!(
            names(&params),
            ["id", "email_address", "password", "created_by"]
        );
    }

    #[test]
    fn none_becomes_null_sentinel() {
        let params = to_parameters(&sample(), Crud::READ);
        assert_eq!(params[1].value, Value::Null);
        assert_eq!(params[0].value, Value::Int(7));
        assert!(params.iter().all(Param::is_input));
    }
}
