//! Differ - Compare prior state with desired configuration
//!
//! Lifecycle updates only act on the attributes that actually changed, and
//! only on the subset of attributes the remote API can modify in place.

use std::collections::HashMap;

use crate::resource::Value;

/// Find attributes in `keys` whose desired value differs from the current one.
///
/// An attribute absent on one side and present on the other counts as
/// changed. Returns the changed keys paired with their desired value
/// (`None` when the attribute was removed), in `keys` order.
pub fn changed_attributes<'a>(
    keys: &[&'a str],
    current: &HashMap<String, Value>,
    desired: &HashMap<String, Value>,
) -> Vec<(&'a str, Option<Value>)> {
    keys.iter()
        .filter_map(|key| {
            let before = current.get(*key);
            let after = desired.get(*key);
            if before == after {
                None
            } else {
                Some((*key, after.cloned()))
            }
        })
        .collect()
}

/// Get the attribute map of element `index` of a nested block attribute
pub fn block_element<'a>(
    attributes: &'a HashMap<String, Value>,
    block: &str,
    index: usize,
) -> Option<&'a HashMap<String, Value>> {
    attributes
        .get(block)
        .and_then(Value::as_list)
        .and_then(|items| items.get(index))
        .and_then(Value::as_map)
}

/// Like [`changed_attributes`], but compares element `index` of a nested block.
pub fn changed_block_attributes<'a>(
    keys: &[&'a str],
    block: &str,
    index: usize,
    current: &HashMap<String, Value>,
    desired: &HashMap<String, Value>,
) -> Vec<(&'a str, Option<Value>)> {
    let empty = HashMap::new();
    let before = block_element(current, block, index).unwrap_or(&empty);
    let after = block_element(desired, block, index).unwrap_or(&empty);
    changed_attributes(keys, before, after)
}
