//! Applying live data snapshots to bound object properties
//!
//! Every object's compiled bindings are resolved against the snapshot; a
//! binding that does not resolve, or resolves to the empty string, is skipped
//! for this round. Numbers are read the lenient way the data sources write
//! them: the longest numeric prefix counts, so `"21.5°C"` reads as `21.5`.
//!
//! A Marker whose `value` changes is rebuilt as a new object and the old one
//! removed after the pass. A Text whose `value` changes keeps its identity and
//! only rebuilds its geometry with the base font.

use tracing::debug;
use vitrine_core::{deg_to_rad, BindProperty, ObjectKind, Snapshot, Transform};

use crate::collab::Asset;
use crate::materialize::serialize;
use crate::object::{Geometry, ObjectId, SceneObject};
use crate::scene::Scene;

/// What a snapshot changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingReport {
    /// Property assignments that changed a value
    pub changed: usize,
    /// Text objects whose geometry was rebuilt
    pub regenerated: Vec<ObjectId>,
    /// Markers rebuilt with a new label, as (old, new)
    pub replaced: Vec<(ObjectId, ObjectId)>,
}

impl BindingReport {
    pub fn is_noop(&self) -> bool {
        self.changed == 0 && self.regenerated.is_empty() && self.replaced.is_empty()
    }
}

enum Effect {
    Unchanged,
    Changed,
    Regenerated,
    SwapMarker(String),
}

/// Push one snapshot through every binding in the scene.
///
/// Does nothing until the scene has finished loading. Applying the same
/// snapshot twice changes nothing the second time.
pub fn apply_snapshot(scene: &mut Scene, snapshot: &Snapshot) -> BindingReport {
    let mut report = BindingReport::default();
    if !scene.is_ready() {
        debug!(keys = snapshot.len(), "Scene not ready, snapshot ignored");
        return report;
    }

    let base_font = scene.base_font().cloned();
    let mut swaps = Vec::new();

    for id in scene.ids() {
        let Some(object) = scene.get_mut(id) else {
            continue;
        };
        let resolved: Vec<(BindProperty, String)> = object
            .bindings
            .iter()
            .filter_map(|(prop, template)| {
                template
                    .resolve(snapshot)
                    .filter(|v| !v.is_empty())
                    .map(|v| (prop, v))
            })
            .collect();

        for (prop, value) in resolved {
            match apply_property(object, prop, &value, base_font.as_ref()) {
                Effect::Unchanged => {}
                Effect::Changed => report.changed += 1,
                Effect::Regenerated => {
                    report.changed += 1;
                    report.regenerated.push(id);
                }
                Effect::SwapMarker(text) => swaps.push((id, text)),
            }
        }
    }

    for (old, text) in swaps {
        if let Some(new) = swap_marker(scene, old, text) {
            report.changed += 1;
            report.replaced.push((old, new));
        }
    }

    if !report.is_noop() {
        debug!(
            changed = report.changed,
            regenerated = report.regenerated.len(),
            replaced = report.replaced.len(),
            "Applied snapshot"
        );
    }
    report
}

fn assign<T: PartialEq>(slot: &mut T, value: T) -> Effect {
    if *slot == value {
        Effect::Unchanged
    } else {
        *slot = value;
        Effect::Changed
    }
}

/// The transform component a property drives, and whether it is an angle
fn transform_component(transform: &mut Transform, prop: BindProperty) -> Option<(&mut f64, bool)> {
    let slot = match prop {
        BindProperty::PositionX => (&mut transform.position.x, false),
        BindProperty::PositionY => (&mut transform.position.y, false),
        BindProperty::PositionZ => (&mut transform.position.z, false),
        BindProperty::RotationX => (&mut transform.rotation.x, true),
        BindProperty::RotationY => (&mut transform.rotation.y, true),
        BindProperty::RotationZ => (&mut transform.rotation.z, true),
        BindProperty::ScaleX => (&mut transform.scale.x, false),
        BindProperty::ScaleY => (&mut transform.scale.y, false),
        BindProperty::ScaleZ => (&mut transform.scale.z, false),
        _ => return None,
    };
    Some(slot)
}

fn apply_property(
    object: &mut SceneObject,
    prop: BindProperty,
    value: &str,
    base_font: Option<&Asset>,
) -> Effect {
    if let Some((slot, degrees)) = transform_component(&mut object.transform, prop) {
        let Some(number) = parse_float(value) else {
            return Effect::Unchanged;
        };
        let number = if degrees { deg_to_rad(number) } else { number };
        return assign(slot, number);
    }

    match prop {
        BindProperty::Name => assign(&mut object.name, value.to_string()),
        BindProperty::Visible => assign(&mut object.visible, parse_int(value) == Some(1)),
        BindProperty::CanSelect => assign(&mut object.can_select, parse_int(value) == Some(1)),
        BindProperty::Color => match object.kind.material_mut() {
            Some(material) => assign(&mut material.color, value.to_string()),
            None => Effect::Unchanged,
        },
        BindProperty::Opacity => {
            let (Some(opacity), Some(current)) = (parse_float(value), object.kind.opacity()) else {
                return Effect::Unchanged;
            };
            if current == opacity {
                return Effect::Unchanged;
            }
            object.set_opacity(opacity);
            Effect::Changed
        }
        BindProperty::Value => apply_value(object, value, base_font),
        _ => Effect::Unchanged,
    }
}

fn apply_value(object: &mut SceneObject, value: &str, base_font: Option<&Asset>) -> Effect {
    match &mut object.kind {
        ObjectKind::Marker(spec) => {
            let label = format!(" {} ", value.trim());
            if spec.marker_params.text == label {
                Effect::Unchanged
            } else {
                Effect::SwapMarker(label)
            }
        }
        ObjectKind::Text(spec) => {
            if spec.text == value {
                return Effect::Unchanged;
            }
            let Some(font) = base_font else {
                debug!(id = %object.id, "No base font yet, text update deferred");
                return Effect::Unchanged;
            };
            spec.text = value.to_string();
            object.geometry = Geometry::Text { font: font.clone() };
            object.revision += 1;
            Effect::Regenerated
        }
        _ => Effect::Unchanged,
    }
}

/// Rebuild a marker with a new label, appended to the scene, and drop the
/// old one
fn swap_marker(scene: &mut Scene, old: ObjectId, label: String) -> Option<ObjectId> {
    let previous = scene.get(old)?;
    let mut record = serialize(previous);
    if let ObjectKind::Marker(spec) = &mut record.kind {
        spec.marker_params.text = label;
    }
    let (name, visible, can_select) = (
        previous.name.clone(),
        previous.visible,
        previous.can_select,
    );

    let new = match scene.add_record(record, None) {
        Ok(id) => id,
        Err(e) => {
            debug!(id = %old, error = %e, "Marker rebuild failed");
            return None;
        }
    };
    if let Some(marker) = scene.get_mut(new) {
        marker.name = name;
        marker.visible = visible;
        marker.can_select = can_select;
    }
    scene.remove(old);
    Some(new)
}

/// Leading integer of `s`, if it starts with one
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits {
        return None;
    }
    s[..end].parse().ok()
}

/// Longest decimal number at the start of `s`
fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let digits_in = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut i = 0;
    let mut negative = false;
    if let Some(sign @ (b'+' | b'-')) = bytes.first() {
        negative = *sign == b'-';
        i = 1;
    }
    if s[i..].starts_with("Infinity") {
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let whole = digits_in(i);
    i += whole;
    let mut fraction = 0;
    if bytes.get(i) == Some(&b'.') {
        fraction = digits_in(i + 1);
        if whole > 0 || fraction > 0 {
            i += 1 + fraction;
        }
    }
    if whole == 0 && fraction == 0 {
        return None;
    }

    let mut end = i;
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exponent = digits_in(j);
        if exponent > 0 {
            end = j + exponent;
        }
    }
    s[..end].parse().ok()
}
