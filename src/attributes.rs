use std::borrow::Cow;
use std::fmt;
use std::ops::Index;

use unicase::UniCase;


/// A single attribute value, as the raw bytes the directory returned.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Value(Vec<u8>);
impl Value {
    pub fn new(bytes: Vec<u8>) -> Self { Self(bytes) }

    pub fn as_bytes(&self) -> &[u8] { &self.0 }

    pub fn into_bytes(self) -> Vec<u8> { self.0 }

    /// The value as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}
impl AsRef<[u8]> for Value {
    fn as_ref(&self) -> &[u8] { &self.0 }
}
impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self { Self(value) }
}
impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self { Self(value.to_vec()) }
}
impl From<String> for Value {
    fn from(value: String) -> Self { Self(value.into_bytes()) }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self { Self(value.as_bytes().to_vec()) }
}
impl From<&String> for Value {
    fn from(value: &String) -> Self { Self(value.as_bytes().to_vec()) }
}
impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool { self.0 == other.as_bytes() }
}
impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool { self.0 == other.as_bytes() }
}
impl PartialEq<[u8]> for Value {
    fn eq(&self, other: &[u8]) -> bool { self.0 == other }
}


/// Attribute names mapped to their ordered values.
///
/// Lookups ignore case. Names keep the casing they were first stored with, and
/// iteration follows insertion order. Looking up an attribute that is not
/// present yields an empty slice.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AttributeMap {
    attributes: Vec<(UniCase<String>, Vec<Value>)>,
}
impl AttributeMap {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.attributes.len() }

    pub fn is_empty(&self) -> bool { self.attributes.is_empty() }

    fn position(&self, name: &str) -> Option<usize> {
        let wanted = UniCase::new(name);
        self.attributes
            .iter()
            .position(|(key, _)| UniCase::new(key.as_str()) == wanted)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// All values of the attribute; empty if it is not set.
    pub fn get(&self, name: &str) -> &[Value] {
        match self.position(name) {
            Some(i) => &self.attributes[i].1,
            None => &[],
        }
    }

    pub fn first(&self, name: &str) -> Option<&Value> {
        self.get(name).first()
    }

    /// The name as stored in this map, e.g. `givenName` for `GIVENNAME`.
    pub fn stored_name(&self, name: &str) -> Option<&str> {
        self.position(name)
            .map(|i| self.attributes[i].0.as_str())
    }

    /// Replaces all values of the attribute, keeping the stored casing of its name.
    pub fn insert<N: Into<String>>(&mut self, name: N, values: Vec<Value>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.attributes[i].1 = values,
            None => self.attributes.push((UniCase::new(name), values)),
        }
    }

    /// Appends a value, creating the attribute if needed.
    pub fn push<N: Into<String>>(&mut self, name: N, value: Value) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.attributes[i].1.push(value),
            None => self.attributes.push((UniCase::new(name), vec![value])),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<Value>> {
        self.position(name)
            .map(|i| self.attributes.remove(i).1)
    }

    /// Removes the first occurrence of `value`; drops the attribute once it has no values left.
    ///
    /// Returns whether a value was removed.
    pub fn remove_value(&mut self, name: &str, value: &Value) -> bool {
        let Some(i) = self.position(name) else { return false };
        let values = &mut self.attributes[i].1;
        let Some(value_index) = values.iter().position(|v| v == value) else { return false };
        values.remove(value_index);
        if values.is_empty() {
            self.attributes.remove(i);
        }
        true
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.attributes
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}
impl Index<&str> for AttributeMap {
    type Output = [Value];

    fn index(&self, name: &str) -> &[Value] { self.get(name) }
}
impl<N, I, V> FromIterator<(N, I)> for AttributeMap
    where
        N: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, values) in iter {
            let name = name.into();
            for value in values {
                map.push(name.clone(), value.into());
            }
        }
        map
    }
}
