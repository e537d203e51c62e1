//! Copy-on-write view over an Activity Streams JSON object.

use std::borrow::Cow;

use serde_json::{Map, Value};

/// A JSON object received from a remote server.
///
/// Borrowing is the default: wrapping a caller's `Value` costs nothing, and
/// only the operations that change a property produce an owned copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Object<'a>(Cow<'a, Value>);

impl Object<'_> {
    pub(crate) fn id(&self) -> Option<&str> {
        self.get_str("id").or_else(|| self.get_str("@id"))
    }
    pub(crate) fn type_is(&self, ty: &str) -> bool {
        for prop in ["type", "@type"] {
            if let Some(Value::String(object_type)) = self.0.get(prop) {
                return object_type == ty;
            }
            if let Some(Value::Array(type_array)) = self.0.get(prop) {
                return type_array.iter().any(|v| v.as_str() == Some(ty));
            }
        }
        false
    }
    /// True when `prop` is present and not `null`.
    pub(crate) fn has_value(&self, prop: &str) -> bool {
        self.0.get(prop).is_some_and(|v| !v.is_null())
    }
    pub(crate) fn get_str(&self, prop: &str) -> Option<&str> {
        self.0.get(prop).and_then(Value::as_str)
    }
    pub(crate) fn get_array(&self, prop: &str) -> Option<&Vec<Value>> {
        self.0.get(prop).and_then(Value::as_array)
    }
    pub(crate) fn get_node_object(&self, prop: &str) -> Option<Object<'_>> {
        match self.0.get(prop) {
            Some(v) if v.is_object() => Some(v.into()),
            _ => None,
        }
    }
    pub(crate) fn get_node_iri(&self, prop: &str) -> Option<&str> {
        match self.0.get(prop)? {
            Value::String(iri) => Some(iri),
            Value::Object(map) => map
                .get("id")
                .or_else(|| map.get("href"))
                .and_then(Value::as_str),
            // As shown in
            // https://www.w3.org/TR/activitystreams-vocabulary/#properties, a
            // node reference might be an array. We just use the first IRI.
            Value::Array(array) => array.iter().find_map(Value::as_str),
            _ => None,
        }
    }
    /// Reborrow without copying, whatever the current ownership is.
    pub(crate) fn borrowed(&self) -> Object<'_> {
        Object(Cow::Borrowed(&*self.0))
    }
    pub(crate) fn into_owned(self) -> Object<'static> {
        Object(Cow::Owned(self.0.into_owned()))
    }
    pub(crate) fn to_value(&self) -> Value {
        self.0.clone().into_owned()
    }
    pub(crate) fn replace(self, property: &str, value: Value) -> Object<'static> {
        let mut obj = self.0.into_owned();
        if let Some(obj_map) = obj.as_object_mut() {
            obj_map.insert(property.to_string(), value);
        }
        Object(Cow::Owned(obj))
    }
}

impl From<Value> for Object<'static> {
    fn from(value: Value) -> Self {
        if !value.is_object() {
            // XXX: it is an error to create an Object from anything but a JSON
            // object. It should be validated by upper layers. In case some slip
            // through, we will just replace them with an empty object.
            Object(Cow::Owned(Value::Object(Map::new())))
        } else {
            Object(Cow::Owned(value))
        }
    }
}

impl<'a> From<&'a Value> for Object<'a> {
    fn from(value: &'a Value) -> Self {
        if !value.is_object() {
            Object(Cow::Owned(Value::Object(Map::new())))
        } else {
            Object(Cow::Borrowed(value))
        }
    }
}

impl From<Object<'_>> for Value {
    fn from(value: Object) -> Self {
        value.0.into_owned()
    }
}

impl AsRef<Value> for Object<'_> {
    fn as_ref(&self) -> &Value {
        &self.0
    }
}
