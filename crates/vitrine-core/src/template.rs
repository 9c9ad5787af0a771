//! `{$key}` template bindings
//!
//! A bind string such as `"{$g1_temp} / {$g1_weight}"` is parsed once into a
//! [`Template`] holding its ordered key list. Each time a data [`Snapshot`]
//! arrives the template is resolved against it: every `{$key}` whose key is in
//! the snapshot is replaced globally, and if any placeholder is left over the
//! binding is not applied this round.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::record::BindProperty;

const OPEN: &str = "{$";

/// A parsed bind string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Keys in first-seen order, duplicates kept
    key_list: Vec<String>,
    value: String,
}

impl Template {
    /// Scan `raw` for `{$key}` placeholders.
    ///
    /// A `{$` (re)starts a key span and the next `}` closes it. A `}` with no
    /// open span is ignored, and an unterminated span yields no key.
    pub fn parse(raw: &str) -> Self {
        let bytes = raw.as_bytes();
        let mut key_list = Vec::new();
        let mut start: Option<usize> = None;

        for p in 0..bytes.len() {
            if bytes[p..].starts_with(OPEN.as_bytes()) {
                start = Some(p);
                continue;
            }
            if bytes[p] == b'}' {
                if let Some(s) = start {
                    key_list.push(raw[s + OPEN.len()..p].to_string());
                }
                start = None;
            }
        }

        Self {
            key_list,
            value: raw.to_string(),
        }
    }

    pub fn key_list(&self) -> &[String] {
        &self.key_list
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Substitute snapshot values into the template.
    ///
    /// Returns `None` while any `{$` marker remains, meaning the snapshot does
    /// not (yet) cover this binding.
    pub fn resolve(&self, snapshot: &Snapshot) -> Option<String> {
        if !self.value.contains(OPEN) {
            return Some(self.value.clone());
        }

        let mut value = self.value.clone();
        for key in &self.key_list {
            if let Some(v) = snapshot.get(key) {
                value = value.replace(&format!("{{${}}}", key), v);
            }
        }

        if value.contains(OPEN) {
            None
        } else {
            Some(value)
        }
    }
}

/// The compiled bindings of one object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingSet {
    templates: BTreeMap<BindProperty, Template>,
    /// Every key referenced by any binding, in property order
    all_keys: Vec<String>,
}

impl BindingSet {
    pub fn compile(bind: &BTreeMap<BindProperty, String>) -> Self {
        let mut templates = BTreeMap::new();
        let mut all_keys = Vec::new();

        for (prop, raw) in bind {
            let template = Template::parse(raw);
            all_keys.extend(template.key_list().iter().cloned());
            templates.insert(*prop, template);
        }

        Self {
            templates,
            all_keys,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn contains(&self, prop: BindProperty) -> bool {
        self.templates.contains_key(&prop)
    }

    pub fn get(&self, prop: BindProperty) -> Option<&Template> {
        self.templates.get(&prop)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindProperty, &Template)> {
        self.templates.iter().map(|(p, t)| (*p, t))
    }

    pub fn all_keys(&self) -> &[String] {
        &self.all_keys
    }
}

/// One delivery of live data, key to display string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(HashMap<String, String>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a snapshot from a JSON object. Non-string values are turned into
    /// the text a browser would substitute for them.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let map = object
            .iter()
            .map(|(k, v)| (k.clone(), json_to_text(v)))
            .collect();
        Some(Self(map))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn json_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            // 2.0 renders as "2"
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
