//! Decoding urlencoded form payloads into typed structs
//!
//! Decoding drives serde over the raw key/value pairs with weak string
//! coercion (numbers, bools, repeated keys as sequences). Failures come back
//! as a [`DecodeReport`] whose entries are tagged by kind; keys the target
//! struct does not declare are tagged [`EntryKind::UnknownField`] so callers
//! can drop exactly those and keep genuine binding errors. Forms routinely
//! carry extra fields (CSRF tokens, submit-button names) that must not be
//! treated as errors.

use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};

/// What went wrong with one form field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// The payload carried a key the target struct does not declare
    UnknownField,
    /// A declared field without a default was absent from the payload
    Missing,
    /// The value could not be bound to the field's type
    Invalid,
}

/// One entry in a decode report
#[derive(Debug, Clone)]
pub struct DecodeEntry {
    /// Field the entry concerns, when attributable
    pub field: Option<String>,
    pub kind: EntryKind,
    pub message: String,
}

/// Multi-entry decode failure
#[derive(Debug, Default)]
pub struct DecodeReport {
    pub entries: Vec<DecodeEntry>,
}

impl DecodeReport {
    /// Drop the unknown-field entries and nothing else
    ///
    /// Genuine binding errors always survive filtering, even when mixed with
    /// unknown-field noise in the same report.
    #[must_use]
    pub fn without_unknown(mut self) -> Self {
        self.entries.retain(|entry| entry.kind != EntryKind::UnknownField);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for DecodeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for entry in &self.entries {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            match entry.field {
                Some(ref field) => write!(f, "{field}: {}", entry.message)?,
                None => write!(f, "{}", entry.message)?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for DecodeReport {}

/// Decode an urlencoded payload into `T`
///
/// # Errors
///
/// Returns a [`DecodeReport`] when a declared field is missing or a value
/// cannot be bound; unknown keys alone never fail the decode.
pub fn from_str<T: de::DeserializeOwned>(input: &str) -> Result<T, DecodeReport> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(input.as_bytes())
        .into_owned()
        .collect();
    decode(&pairs)
}

/// Decode already-parsed key/value pairs into `T`
///
/// # Errors
///
/// Same contract as [`from_str`]
pub fn decode<T: de::DeserializeOwned>(pairs: &[(String, String)]) -> Result<T, DecodeReport> {
    let mut unknown = Vec::new();
    let outcome = T::deserialize(FormDeserializer {
        pairs,
        unknown: &mut unknown,
    });

    match outcome {
        Ok(value) => {
            if !unknown.is_empty() {
                tracing::debug!(count = unknown.len(), "ignoring unknown form fields");
            }
            Ok(value)
        }
        Err(failure) => {
            let mut entries = unknown;
            entries.push(failure.entry);
            Err(DecodeReport { entries })
        }
    }
}

/// Internal serde error carrying a single report entry
#[derive(Debug)]
struct DecodeFailure {
    entry: DecodeEntry,
}

impl DecodeFailure {
    fn invalid(message: String) -> Self {
        Self {
            entry: DecodeEntry {
                field: None,
                kind: EntryKind::Invalid,
                message,
            },
        }
    }
}

impl std::fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.entry.message)
    }
}

impl std::error::Error for DecodeFailure {}

impl de::Error for DecodeFailure {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::invalid(msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        Self {
            entry: DecodeEntry {
                field: Some(field.to_owned()),
                kind: EntryKind::Missing,
                message: format!("missing field `{field}`"),
            },
        }
    }
}

struct FormDeserializer<'de, 'a> {
    pairs: &'de [(String, String)],
    unknown: &'a mut Vec<DecodeEntry>,
}

impl<'de> FormDeserializer<'de, '_> {
    fn values_of(&self, field: &str) -> Vec<&'de str> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == field)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

impl<'de> de::Deserializer<'de> for FormDeserializer<'de, '_> {
    type Error = DecodeFailure;

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        for (key, _) in self.pairs {
            let is_unknown = !fields.contains(&key.as_str());
            let already_seen = self.unknown.iter().any(|e| e.field.as_deref() == Some(key));
            if is_unknown && !already_seen {
                self.unknown.push(DecodeEntry {
                    field: Some(key.clone()),
                    kind: EntryKind::UnknownField,
                    message: format!("unknown field `{key}`"),
                });
            }
        }

        let mut groups: Vec<(&'de str, Vec<&'de str>)> = Vec::new();
        for &field in fields {
            let values = self.values_of(field);
            if !values.is_empty() {
                groups.push((field, values));
            }
        }

        visitor.visit_map(FormMap {
            groups: groups.into_iter(),
            current: None,
        })
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let mut groups: Vec<(&'de str, Vec<&'de str>)> = Vec::new();
        for (key, value) in self.pairs {
            match groups.iter_mut().find(|(seen, _)| *seen == key.as_str()) {
                Some((_, values)) => values.push(value.as_str()),
                None => groups.push((key.as_str(), vec![value.as_str()])),
            }
        }

        visitor.visit_map(FormMap {
            groups: groups.into_iter(),
            current: None,
        })
    }

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct enum identifier ignored_any
    }
}

struct FormMap<'de> {
    groups: std::vec::IntoIter<(&'de str, Vec<&'de str>)>,
    current: Option<(&'de str, Vec<&'de str>)>,
}

impl<'de> de::MapAccess<'de> for FormMap<'de> {
    type Error = DecodeFailure;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        match self.groups.next() {
            Some((key, values)) => {
                self.current = Some((key, values));
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let (key, values) = self
            .current
            .take()
            .ok_or_else(|| DecodeFailure::invalid("value requested before key".to_owned()))?;

        seed.deserialize(ValuesDeserializer { values }).map_err(|mut failure| {
            // Attribute the failure to the field being bound
            if failure.entry.field.is_none() {
                failure.entry.field = Some(key.to_owned());
            }
            failure
        })
    }
}

/// Deserializer for one field's raw values
///
/// Scalars use the last value (last write wins for duplicates); sequences
/// consume every value.
struct ValuesDeserializer<'de> {
    values: Vec<&'de str>,
}

impl<'de> ValuesDeserializer<'de> {
    fn single(&self) -> &'de str {
        self.values.last().copied().unwrap_or("")
    }
}

macro_rules! deserialize_parsed {
    ($method:ident, $visit:ident, $ty:ty, $desc:literal) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: Visitor<'de>,
        {
            let raw = self.single();
            let parsed: $ty = raw
                .trim()
                .parse()
                .map_err(|_| DecodeFailure::invalid(format!("invalid {} `{raw}`", $desc)))?;
            visitor.$visit(parsed)
        }
    };
}

impl<'de> de::Deserializer<'de> for ValuesDeserializer<'de> {
    type Error = DecodeFailure;

    deserialize_parsed!(deserialize_i8, visit_i8, i8, "integer");
    deserialize_parsed!(deserialize_i16, visit_i16, i16, "integer");
    deserialize_parsed!(deserialize_i32, visit_i32, i32, "integer");
    deserialize_parsed!(deserialize_i64, visit_i64, i64, "integer");
    deserialize_parsed!(deserialize_i128, visit_i128, i128, "integer");
    deserialize_parsed!(deserialize_u8, visit_u8, u8, "integer");
    deserialize_parsed!(deserialize_u16, visit_u16, u16, "integer");
    deserialize_parsed!(deserialize_u32, visit_u32, u32, "integer");
    deserialize_parsed!(deserialize_u64, visit_u64, u64, "integer");
    deserialize_parsed!(deserialize_u128, visit_u128, u128, "integer");
    deserialize_parsed!(deserialize_f32, visit_f32, f32, "number");
    deserialize_parsed!(deserialize_f64, visit_f64, f64, "number");

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.single().trim() {
            "true" | "on" | "1" => visitor.visit_bool(true),
            "false" | "off" | "0" | "" => visitor.visit_bool(false),
            other => Err(DecodeFailure::invalid(format!("invalid boolean `{other}`"))),
        }
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let raw = self.single();
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(DecodeFailure::invalid(format!("invalid character `{raw}`"))),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_borrowed_str(self.single())
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        // The field is present in the payload, so it is always Some; absent
        // fields never reach a value deserializer
        visitor.visit_some(self)
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_seq(ValuesSeq {
            iter: self.values.into_iter(),
        })
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_enum(self.single().into_deserializer())
    }

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    serde::forward_to_deserialize_any! {
        bytes byte_buf unit_struct tuple tuple_struct map struct identifier
        ignored_any
    }
}

struct ValuesSeq<'de> {
    iter: std::vec::IntoIter<&'de str>,
}

impl<'de> de::SeqAccess<'de> for ValuesSeq<'de> {
    type Error = DecodeFailure;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        self.iter
            .next()
            .map(|value| seed.deserialize(ValuesDeserializer { values: vec![value] }))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Signup {
        username: String,
        age: u32,
        #[serde(default)]
        newsletter: bool,
        #[serde(default)]
        nickname: Option<String>,
    }

    #[test]
    fn decodes_typical_form() {
        let form: Signup = from_str("username=carlos&age=30&newsletter=on").unwrap();
        assert_eq!(form.username, "carlos");
        assert_eq!(form.age, 30);
        assert!(form.newsletter);
        assert_eq!(form.nickname, None);
    }

    #[test]
    fn extra_unknown_fields_are_not_an_error() {
        // CSRF tokens and submit-button names routinely ride along
        let form: Signup = from_str("username=carlos&age=30&csrf_token=abc&submit=Save").unwrap();
        assert_eq!(form.username, "carlos");
    }

    #[test]
    fn missing_required_field_is_reported() {
        let report = from_str::<Signup>("username=carlos").unwrap_err();
        let entry = report
            .entries
            .iter()
            .find(|e| e.kind == EntryKind::Missing)
            .unwrap();
        assert_eq!(entry.field.as_deref(), Some("age"));
    }

    #[test]
    fn type_mismatch_names_the_field() {
        let report = from_str::<Signup>("username=carlos&age=abc").unwrap_err();
        let entry = report
            .entries
            .iter()
            .find(|e| e.kind == EntryKind::Invalid)
            .unwrap();
        assert_eq!(entry.field.as_deref(), Some("age"));
        assert!(entry.message.contains("abc"));
    }

    #[test]
    fn mixed_report_filtering_keeps_genuine_errors() {
        // Unknown-field noise must never mask a real binding error
        let report = from_str::<Signup>("username=carlos&age=abc&csrf_token=x").unwrap_err();
        assert!(report.entries.iter().any(|e| e.kind == EntryKind::UnknownField));
        assert!(report.entries.iter().any(|e| e.kind == EntryKind::Invalid));

        let filtered = report.without_unknown();
        assert!(!filtered.is_empty());
        assert!(filtered.entries.iter().all(|e| e.kind == EntryKind::Invalid));
    }

    #[test]
    fn duplicate_scalar_keys_use_the_last_value() {
        let form: Signup = from_str("username=first&username=second&age=1").unwrap();
        assert_eq!(form.username, "second");
    }

    #[derive(Debug, Deserialize)]
    struct TagForm {
        #[serde(default)]
        tags: Vec<String>,
    }

    #[test]
    fn repeated_keys_decode_as_a_sequence() {
        let form: TagForm = from_str("tags=a&tags=b&tags=c").unwrap();
        assert_eq!(form.tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn urlencoded_values_are_decoded() {
        let form: Signup = from_str("username=two%20words&age=5").unwrap();
        assert_eq!(form.username, "two words");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Plan {
        Free,
        Pro,
    }

    #[derive(Debug, Deserialize)]
    struct PlanForm {
        plan: Plan,
    }

    #[test]
    fn unit_enum_variants_decode_from_strings() {
        let form: PlanForm = from_str("plan=pro").unwrap();
        assert_eq!(form.plan, Plan::Pro);
    }

    #[test]
    fn optional_field_present() {
        let form: Signup = from_str("username=x&age=1&nickname=ca").unwrap();
        assert_eq!(form.nickname.as_deref(), Some("ca"));
    }
}
