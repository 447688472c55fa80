use std::collections::BTreeMap;
use std::sync::Arc;

use crate::plugin_system::extension::LoadedExtension;

/// Current feature flag values
pub type FeatureFlags = BTreeMap<String, bool>;

/// Decide whether an extension is in use under the given flags.
///
/// Every `required` flag must be set to `true`; a required flag that is not
/// set at all does not count as satisfied. Every `disallowed` flag must be
/// `false` or unset.
pub fn is_extension_in_use(extension: &LoadedExtension, flags: &FeatureFlags) -> bool {
    let Some(conditions) = &extension.flags else {
        return true;
    };

    conditions
        .required
        .iter()
        .all(|name| flags.get(name) == Some(&true))
        && conditions
            .disallowed
            .iter()
            .all(|name| flags.get(name) != Some(&true))
}

/// Concatenate, in plugin order, the in-use extensions of every enabled plugin.
///
/// `plugins` yields `(enabled, extensions)` per plugin.
pub fn active_extensions<'p, I>(plugins: I, flags: &FeatureFlags) -> Vec<Arc<LoadedExtension>>
where
    I: IntoIterator<Item = (bool, &'p [Arc<LoadedExtension>])>,
{
    plugins
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .flat_map(|(_, extensions)| extensions.iter())
        .filter(|extension| is_extension_in_use(extension, flags))
        .cloned()
        .collect()
}

/// Keep only the boolean entries of a JSON object; anything else yields no flags.
pub fn flags_from_json(value: &serde_json::Value) -> FeatureFlags {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(name, value)| value.as_bool().map(|b| (name.clone(), b)))
                .collect()
        })
        .unwrap_or_default()
}

/// Merge `patch` into `current`, returning whether any value changed.
pub fn merge_flags(current: &mut FeatureFlags, patch: FeatureFlags) -> bool {
    let mut changed = false;
    for (name, value) in patch {
        if current.insert(name, value) != Some(value) {
            changed = true;
        }
    }
    changed
}
