//! Resource type definitions of the Equinix provider

use fabric_core::provider::ResourceType;
use fabric_core::schema::ResourceSchema;

use crate::schemas::{accepter_schema, connection_schema};
use crate::{l2_connection, l2_connection_accepter};

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
}

define_resource_type!(
    L2ConnectionType,
    l2_connection::RESOURCE_TYPE,
    connection_schema
);
define_resource_type!(
    L2ConnectionAccepterType,
    l2_connection_accepter::RESOURCE_TYPE,
    accepter_schema
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![Box::new(L2ConnectionType), Box::new(L2ConnectionAccepterType)]
}
