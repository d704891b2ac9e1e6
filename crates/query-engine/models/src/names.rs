use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

macro_rules! name_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
        )]
        #[serde(transparent)]
        pub struct $name(SmolStr);

        impl $name {
            pub fn new(value: SmolStr) -> Self {
                $name(value)
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            pub fn into_inner(self) -> SmolStr {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.into())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value.into())
            }
        }

        impl From<SmolStr> for $name {
            fn from(value: SmolStr) -> Self {
                $name(value)
            }
        }

        impl From<$name> for SmolStr {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

name_newtype!(
    /// The name of an entity, interface or union.
    TypeName
);

name_newtype!(
    /// The name of a field: an attribute, a relationship, or a synthetic field
    /// such as `likesConnection`.
    FieldName
);
