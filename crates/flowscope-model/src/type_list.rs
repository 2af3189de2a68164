//! Serde helper for the one-or-many `type` field on a step.
//!
//! Accepts `"llm"` or `["validate", "llm"]`; declared order is preserved
//! because the first tag is the step's primary type. Serialization emits the
//! bare string form when only one tag is present.

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserializer, Serialize, Serializer};
use std::fmt;

use crate::step::StepType;

pub fn serialize<S>(types: &[StepType], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if types.len() == 1 {
        types[0].serialize(serializer)
    } else {
        types.serialize(serializer)
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<StepType>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TypeListVisitor;

    impl<'de> Visitor<'de> for TypeListVisitor {
        type Value = Vec<StepType>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a type tag or a non-empty list of type tags")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let tag: StepType =
                serde_json::from_value(serde_json::Value::String(value.to_owned()))
                    .map_err(de::Error::custom)?;
            Ok(vec![tag])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut tags = Vec::new();
            while let Some(tag) = seq.next_element::<StepType>()? {
                tags.push(tag);
            }
            if tags.is_empty() {
                return Err(de::Error::custom("step type list must not be empty"));
            }
            Ok(tags)
        }
    }

    deserializer.deserialize_any(TypeListVisitor)
}
