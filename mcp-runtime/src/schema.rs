//! JSON schema derivation for generated tool envelopes.

use mcp_types::ToolInputSchema;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;

/// Derive a tool's `inputSchema` from its parameter envelope.
///
/// Subschemas are inlined and `Option` fields do not pick up a `null` type
/// variant, which keeps the published schema compact; required entries are
/// exactly the envelope's non-`Option` fields.
pub fn tool_input_schema<T>() -> ToolInputSchema
where
    T: JsonSchema,
{
    let schema = SchemaSettings::draft2019_09()
        .with(|settings| {
            settings.inline_subschemas = true;
            settings.option_add_null_type = false;
        })
        .into_generator()
        .into_root_schema_for::<T>();

    let converted = serde_json::to_value(&schema).and_then(serde_json::from_value::<ToolInputSchema>);
    match converted {
        Ok(schema) => schema,
        Err(err) => {
            // A schema that fails to convert still leaves the tool callable;
            // clients just see an unconstrained object.
            tracing::error!("failed to convert generated schema: {err}");
            ToolInputSchema {
                r#type: "object".to_string(),
                properties: None,
                required: None,
            }
        }
    }
}
