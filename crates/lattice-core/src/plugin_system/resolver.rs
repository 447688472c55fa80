//! Code reference resolution.
//!
//! Resolution never mutates the extension it is given: properties are cloned,
//! every [`CodeRef`](crate::plugin_system::coderef::CodeRef) leaf in the clone
//! is invoked concurrently, and the outcome is decided only after all of them
//! have settled.
use std::sync::Arc;

use futures::future::join_all;

use crate::plugin_system::error::CodeRefError;
use crate::plugin_system::extension::LoadedExtension;
use crate::plugin_system::properties::{PropertyValue, visit_map};

/// Resolve every code reference of `extension`.
///
/// On success returns a new extension whose code reference leaves hold the
/// exported values. If any reference fails, returns
/// [`CodeRefError::Resolution`] with every individual cause; successfully
/// resolved values are discarded.
pub async fn resolve_code_ref_values(extension: &LoadedExtension) -> Result<LoadedExtension, CodeRefError> {
    let mut properties = extension.properties.clone();

    let mut slots: Vec<&mut PropertyValue> = Vec::new();
    visit_map(&mut properties, &PropertyValue::is_code_ref, &mut |leaf| slots.push(leaf));

    let pending: Vec<_> = slots
        .iter()
        .filter_map(|slot| slot.as_code_ref().cloned())
        .collect();

    log::debug!(
        "Resolving {} code reference(s) in extension {}",
        pending.len(),
        extension.uid
    );

    let outcomes = join_all(pending.iter().map(|code_ref| code_ref.load())).await;

    let mut causes = Vec::new();
    for (slot, outcome) in slots.into_iter().zip(outcomes) {
        match outcome {
            Ok(value) => *slot = PropertyValue::Resolved(value),
            Err(cause) => {
                *slot = PropertyValue::Null;
                causes.push(cause);
            }
        }
    }

    if !causes.is_empty() {
        return Err(CodeRefError::Resolution {
            extension: Box::new(extension.clone()),
            causes,
        });
    }

    Ok(extension.with_properties(properties))
}

/// Resolve a batch of extensions concurrently, one outcome per extension in input order.
pub async fn resolve_extensions(
    extensions: &[Arc<LoadedExtension>],
) -> Vec<Result<LoadedExtension, CodeRefError>> {
    join_all(extensions.iter().map(|e| resolve_code_ref_values(e))).await
}
