//! Attribute schemas of the Equinix resource types

use std::sync::LazyLock;

use fabric_core::resource::Value;
use fabric_core::schema::{
    AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types, validate_length,
    validate_range,
};
use regex::Regex;

use crate::l2_connection::RESOURCE_TYPE as CONNECTION_TYPE;
use crate::l2_connection_accepter::RESOURCE_TYPE as ACCEPTER_TYPE;
use crate::mapper::{AccepterField, Field};

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$";
const METRO_CODE_PATTERN: &str = r"^[A-Z]{2}$";

// A pattern that fails to compile rejects every value
static EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(EMAIL_PATTERN).ok());
static METRO_CODE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(METRO_CODE_PATTERN).ok());

fn matches(re: &LazyLock<Option<Regex>>, s: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(s))
}

fn connection_name() -> AttributeType {
    types::string("ConnectionName", |v| match v {
        Value::String(s) => validate_length(s, 1, 24),
        _ => Ok(()),
    })
}

fn speed_unit() -> AttributeType {
    types::one_of(&["MB", "GB"])
}

fn vlan_tag() -> AttributeType {
    types::int("VlanTag", |v| match v {
        Value::Int(n) => validate_range(*n, 2, 4092),
        _ => Ok(()),
    })
}

fn email() -> AttributeType {
    types::string("EmailAddress", |v| match v {
        Value::String(s) if matches(&EMAIL, s) => Ok(()),
        Value::String(s) => Err(format!("'{}' is not a valid e-mail address", s)),
        _ => Ok(()),
    })
}

fn notifications() -> AttributeType {
    AttributeType::Custom {
        name: "Notifications".to_string(),
        base: Box::new(AttributeType::List(Box::new(email()))),
        validate: |v| match v {
            Value::List(items) if items.is_empty() => {
                Err("at least one e-mail address is required".to_string())
            }
            _ => Ok(()),
        },
    }
}

fn metro_code() -> AttributeType {
    types::string("MetroCode", |v| match v {
        Value::String(s) if matches(&METRO_CODE, s) => Ok(()),
        Value::String(s) => Err(format!(
            "'{}' is not a valid metro code (two upper-case letters)",
            s
        )),
        _ => Ok(()),
    })
}

fn purchase_order_number() -> AttributeType {
    types::string("PurchaseOrderNumber", |v| match v {
        Value::String(s) => validate_length(s, 1, 30),
        _ => Ok(()),
    })
}

fn attr(field: Field, attr_type: AttributeType) -> AttributeSchema {
    AttributeSchema::new(field.name(), attr_type).with_description(field.description())
}

fn computed_string(field: Field) -> AttributeSchema {
    attr(field, AttributeType::String).computed()
}

fn additional_info_block() -> BlockSchema {
    BlockSchema::new()
        .min_items(1)
        .attribute(
            AttributeSchema::new("name", types::non_empty_string())
                .required()
                .with_description("Additional information key"),
        )
        .attribute(
            AttributeSchema::new("value", types::non_empty_string())
                .required()
                .with_description("Additional information value"),
        )
}

fn secondary_block() -> BlockSchema {
    BlockSchema::new()
        .max_items(1)
        .attribute(computed_string(Field::Uuid))
        .attribute(attr(Field::Name, connection_name()).required())
        .attribute(
            attr(Field::ProfileUuid, types::non_empty_string())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            attr(Field::Speed, types::positive_int())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            attr(Field::SpeedUnit, speed_unit())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(computed_string(Field::Status))
        .attribute(computed_string(Field::ProviderStatus))
        .attribute(
            attr(Field::PortUuid, types::non_empty_string())
                .optional()
                .force_new(),
        )
        .attribute(
            attr(Field::DeviceUuid, types::non_empty_string())
                .optional()
                .force_new(),
        )
        .attribute(
            attr(Field::DeviceInterfaceId, AttributeType::Int)
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            attr(Field::VlanSTag, vlan_tag())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(attr(Field::VlanCTag, vlan_tag()).optional().force_new())
        .attribute(attr(Field::ZSidePortUuid, AttributeType::String).computed())
        .attribute(attr(Field::ZSideVlanSTag, AttributeType::Int).computed())
        .attribute(attr(Field::ZSideVlanCTag, AttributeType::Int).computed())
        .attribute(
            attr(Field::SellerRegion, types::non_empty_string())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            attr(Field::SellerMetroCode, metro_code())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            attr(Field::AuthorizationKey, types::non_empty_string())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(computed_string(Field::RedundantUuid))
        .attribute(computed_string(Field::RedundancyType))
}

/// Schema of `ecx_l2_connection`
pub fn connection_schema() -> ResourceSchema {
    ResourceSchema::new(CONNECTION_TYPE)
        .with_description("Equinix Fabric layer 2 connection")
        .attribute(computed_string(Field::Uuid))
        .attribute(attr(Field::Name, connection_name()).required())
        .attribute(
            attr(Field::ProfileUuid, types::non_empty_string())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(attr(Field::Speed, types::positive_int()).required())
        .attribute(attr(Field::SpeedUnit, speed_unit()).required())
        .attribute(computed_string(Field::Status))
        .attribute(computed_string(Field::ProviderStatus))
        .attribute(
            attr(Field::Notifications, notifications())
                .required()
                .force_new(),
        )
        .attribute(
            attr(Field::PurchaseOrderNumber, purchase_order_number())
                .optional()
                .force_new(),
        )
        .attribute(
            attr(Field::PortUuid, types::non_empty_string())
                .optional()
                .force_new(),
        )
        .attribute(
            attr(Field::DeviceUuid, types::non_empty_string())
                .optional()
                .force_new(),
        )
        .attribute(
            attr(Field::DeviceInterfaceId, AttributeType::Int)
                .optional()
                .force_new(),
        )
        .attribute(
            attr(Field::VlanSTag, vlan_tag())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(attr(Field::VlanCTag, vlan_tag()).optional().force_new())
        .attribute(
            attr(
                Field::NamedTag,
                types::one_of(&["Private", "Public", "Microsoft", "Manual"]),
            )
            .optional()
            .force_new(),
        )
        .attribute(
            attr(
                Field::AdditionalInfo,
                AttributeType::Block(Box::new(additional_info_block())),
            )
            .optional()
            .force_new(),
        )
        .attribute(
            attr(Field::ZSidePortUuid, types::non_empty_string())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            attr(Field::ZSideVlanSTag, vlan_tag())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            attr(Field::ZSideVlanCTag, vlan_tag())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            attr(Field::SellerRegion, types::non_empty_string())
                .optional()
                .force_new(),
        )
        .attribute(
            attr(Field::SellerMetroCode, metro_code())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(
            attr(Field::AuthorizationKey, types::non_empty_string())
                .optional()
                .computed()
                .force_new(),
        )
        .attribute(computed_string(Field::RedundantUuid))
        .attribute(computed_string(Field::RedundancyType))
        .attribute(
            attr(
                Field::SecondaryConnection,
                AttributeType::Block(Box::new(secondary_block())),
            )
            .optional()
            .force_new(),
        )
}

fn accepter_attr(field: AccepterField, attr_type: AttributeType) -> AttributeSchema {
    AttributeSchema::new(field.name(), attr_type)
        .with_description(field.description())
        .force_new()
}

/// Schema of `ecx_l2_connection_accepter`
///
/// Every settable attribute forces replacement.
pub fn accepter_schema() -> ResourceSchema {
    ResourceSchema::new(ACCEPTER_TYPE)
        .with_description("Accepts an Equinix Fabric layer 2 connection on the provider side")
        .attribute(accepter_attr(AccepterField::ConnectionId, types::non_empty_string()).required())
        .attribute(
            accepter_attr(AccepterField::AccessKey, types::non_empty_string())
                .optional()
                .computed()
                .sensitive(),
        )
        .attribute(
            accepter_attr(AccepterField::SecretKey, types::non_empty_string())
                .optional()
                .computed()
                .sensitive(),
        )
        .attribute(accepter_attr(AccepterField::Profile, types::non_empty_string()).optional())
        .attribute(
            AttributeSchema::new(AccepterField::AwsConnectionId.name(), AttributeType::String)
                .with_description(AccepterField::AwsConnectionId.description())
                .computed(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_core::schema::TypeError;
    use std::collections::HashMap;

    #[test]
    fn validation_patterns_compile() {
        for pattern in [EMAIL_PATTERN, METRO_CODE_PATTERN] {
            if let Err(e) = Regex::new(pattern) {
                panic!("pattern {pattern:?} does not compile: {e}");
            }
        }
        assert!(EMAIL.is_some());
        assert!(METRO_CODE.is_some());
    }

    fn valid_connection() -> HashMap<String, Value> {
        HashMap::from([
            ("name".to_string(), Value::from("tf-conn")),
            ("profile_uuid".to_string(), Value::from("profile-1")),
            ("speed".to_string(), Value::Int(50)),
            ("speed_unit".to_string(), Value::from("MB")),
            (
                "notifications".to_string(),
                Value::List(vec![Value::from("ops@example.com")]),
            ),
            ("port_uuid".to_string(), Value::from("port-1")),
            ("vlan_stag".to_string(), Value::Int(100)),
        ])
    }

    #[test]
    fn accepts_valid_connection() {
        assert!(connection_schema().validate(&valid_connection()).is_ok());
    }

    #[test]
    fn schema_covers_every_field() {
        let schema = connection_schema();
        for field in Field::ALL {
            assert!(
                schema.attributes.contains_key(field.name()),
                "missing {field}"
            );
        }
        let accepter = accepter_schema();
        for field in AccepterField::ALL {
            assert!(accepter.attributes.contains_key(field.name()));
        }
    }

    #[test]
    fn rejects_out_of_range_vlan() {
        let mut config = valid_connection();
        config.insert("vlan_stag".to_string(), Value::Int(4093));
        let errors = connection_schema().validate(&config).unwrap_err();
        assert!(matches!(
            &errors[0],
            TypeError::AttributeError { name, .. } if name == "vlan_stag"
        ));
    }

    #[test]
    fn rejects_long_name_and_bad_email() {
        let mut config = valid_connection();
        config.insert(
            "name".to_string(),
            Value::from("a-name-that-is-far-too-long"),
        );
        config.insert(
            "notifications".to_string(),
            Value::List(vec![Value::from("not-an-email")]),
        );
        let errors = connection_schema().validate(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn rejects_empty_notifications() {
        let mut config = valid_connection();
        config.insert("notifications".to_string(), Value::List(vec![]));
        assert!(connection_schema().validate(&config).is_err());
    }

    #[test]
    fn rejects_lowercase_metro_code() {
        let mut config = valid_connection();
        config.insert("seller_metro_code".to_string(), Value::from("sv"));
        assert!(connection_schema().validate(&config).is_err());
        config.insert("seller_metro_code".to_string(), Value::from("SV"));
        assert!(connection_schema().validate(&config).is_ok());
    }

    #[test]
    fn rejects_computed_attributes_in_config() {
        let mut config = valid_connection();
        config.insert("status".to_string(), Value::from("PROVISIONED"));
        let errors = connection_schema().validate(&config).unwrap_err();
        assert!(matches!(&errors[0], TypeError::ComputedOnly { name } if name == "status"));
    }

    #[test]
    fn secondary_block_allows_one_element() {
        let secondary = Value::Map(HashMap::from([
            ("name".to_string(), Value::from("tf-sec")),
            ("port_uuid".to_string(), Value::from("port-2")),
        ]));
        let mut config = valid_connection();
        config.insert(
            "secondary_connection".to_string(),
            Value::List(vec![secondary.clone()]),
        );
        assert!(connection_schema().validate(&config).is_ok());

        config.insert(
            "secondary_connection".to_string(),
            Value::List(vec![secondary.clone(), secondary]),
        );
        assert!(connection_schema().validate(&config).is_err());
    }

    #[test]
    fn accepter_attributes_force_replacement() {
        assert_eq!(
            accepter_schema().force_new_attributes(),
            vec!["access_key", "aws_profile", "connection_id", "secret_key"]
        );
    }
}
