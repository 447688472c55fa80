//! Code reference codec.
//!
//! Manifests point at plugin code with `{"$codeRef": "module.export"}`. When a
//! plugin is registered, [`decode_code_refs`] swaps each of those leaves for a
//! [`CodeRef`] thunk. Nothing is fetched at that point; a malformed reference
//! only fails once the thunk is invoked.
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::kernel::constants::DEFAULT_EXPORT_NAME;
use crate::plugin_system::entry_module::{ExportValue, PluginEntryModule, PluginModule};
use crate::plugin_system::error::CodeRefError;
use crate::plugin_system::extension::LoadedExtension;
use crate::plugin_system::properties::{PropertyValue, visit_map};

/// Turns a bare error message into one naming the surrounding context
pub type ErrorFormatter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// `module(.export)?`; neither part may be empty or contain whitespace or a dot
static CODE_REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^.\s]+)(?:\.([^.\s]+))?$").expect("code reference pattern is a valid regex")
});

/// Split `module(.export)?` into its parts; `None` when the reference is malformed.
pub fn parse_code_ref(reference: &str) -> Option<(&str, &str)> {
    let captures = CODE_REF_PATTERN.captures(reference)?;
    let module_name = captures.get(1)?.as_str();
    let export_name = captures.get(2).map_or(DEFAULT_EXPORT_NAME, |m| m.as_str());
    Some((module_name, export_name))
}

/// Fetch `module_name` through `entry_module` and instantiate its exports.
pub async fn get_plugin_module(
    module_name: &str,
    entry_module: &dyn PluginEntryModule,
    format_error: &(dyn Fn(&str) -> String + Send + Sync),
) -> Result<PluginModule, CodeRefError> {
    match entry_module.get(module_name).await {
        Ok(factory) => Ok(factory()),
        Err(source) => Err(CodeRefError::ModuleLoad {
            module_name: module_name.to_string(),
            message: format_error(&format!("Failed to load module '{module_name}'")),
            source,
        }),
    }
}

struct CodeRefInner {
    reference: String,
    name: String,
    entry_module: Arc<dyn PluginEntryModule>,
    format_error: ErrorFormatter,
}

/// Lazily loadable pointer to an export of a plugin module.
///
/// Cloning is cheap; all clones share the same entry module handle.
#[derive(Clone)]
pub struct CodeRef {
    inner: Arc<CodeRefInner>,
}

impl CodeRef {
    pub fn new(
        reference: impl Into<String>,
        name: impl Into<String>,
        entry_module: Arc<dyn PluginEntryModule>,
        format_error: ErrorFormatter,
    ) -> Self {
        Self {
            inner: Arc::new(CodeRefInner {
                reference: reference.into(),
                name: name.into(),
                entry_module,
                format_error,
            }),
        }
    }

    /// The raw `$codeRef` string
    pub fn reference(&self) -> &str {
        &self.inner.reference
    }

    /// Diagnostic name, `$codeRef_{plugin}[{reference}]`
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Load the referenced module and return the requested export.
    pub async fn load(&self) -> Result<ExportValue, CodeRefError> {
        let inner = &self.inner;
        let format_error = inner.format_error.as_ref();

        let (module_name, export_name) =
            parse_code_ref(&inner.reference).ok_or_else(|| CodeRefError::Malformed {
                reference: inner.reference.clone(),
                message: format_error(&format!("Malformed code reference '{}'", inner.reference)),
            })?;

        let module = get_plugin_module(module_name, inner.entry_module.as_ref(), format_error).await?;

        module
            .export(export_name)
            .ok_or_else(|| CodeRefError::MissingExport {
                module_name: module_name.to_string(),
                export_name: export_name.to_string(),
                message: format_error(&format!("Missing module export '{module_name}.{export_name}'")),
            })
    }
}

impl fmt::Debug for CodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeRef({})", self.inner.name)
    }
}

/// Replace every encoded code reference in the extension's properties with a
/// [`CodeRef`] bound to `entry_module`.
///
/// Returns the extension that was passed in.
pub fn decode_code_refs<'e>(
    extension: &'e mut LoadedExtension,
    entry_module: &Arc<dyn PluginEntryModule>,
) -> &'e mut LoadedExtension {
    let uid = extension.uid.clone();
    let plugin_name = extension.plugin_name.clone();
    let format_error: ErrorFormatter = Arc::new(move |message: &str| format!("{message} in extension {uid}"));

    visit_map(
        &mut extension.properties,
        &PropertyValue::is_encoded_code_ref,
        &mut |leaf: &mut PropertyValue| {
            if let PropertyValue::Encoded(encoded) = &mut *leaf {
                let reference = std::mem::take(&mut encoded.code_ref);
                let name = format!("$codeRef_{plugin_name}[{reference}]");
                *leaf = PropertyValue::CodeRef(CodeRef::new(
                    reference,
                    name,
                    Arc::clone(entry_module),
                    Arc::clone(&format_error),
                ));
            }
        },
    );

    extension
}
