use halyard_core::ResourceSchema;
use serde_json::Value as Json;

use crate::diff::{FieldDiff, ResultingOperation};
use crate::error::ReconcileError;

/// One API call the actuator will make.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOperation {
    /// POST the full desired body. `response` is filled in by the actuator.
    Create { response: Option<Json> },
    /// PATCH the fields owned by `name`.
    Update {
        name: &'static str,
        diffs: Vec<FieldDiff>,
    },
}

impl ApiOperation {
    pub fn name(&self) -> &'static str {
        match self {
            ApiOperation::Create { .. } => "create",
            ApiOperation::Update { name, .. } => name,
        }
    }
}

/// Turn diffs into an ordered list of API calls.
///
/// A resource that does not exist yet is always a single create. Otherwise
/// diffs are grouped per update operation, in the schema's declared order;
/// a diff naming several operations lands in each of their groups.
pub fn plan(
    schema: &ResourceSchema,
    diffs: &[FieldDiff],
    exists: bool,
) -> Result<Vec<ApiOperation>, ReconcileError> {
    if !exists {
        return Ok(vec![ApiOperation::Create { response: None }]);
    }

    if let Some(d) = diffs.iter().find(|d| d.requires_recreate()) {
        return Err(ReconcileError::ApplyInfeasible(format!(
            "{} cannot be updated in place, recreate required: {d}",
            schema.kind
        )));
    }

    for d in diffs {
        for op in &d.operations {
            if let ResultingOperation::Update(name) = op {
                if !schema.update_operations.contains(name) {
                    return Err(ReconcileError::InvalidArgument(format!(
                        "{} has no update operation {name}",
                        schema.kind
                    )));
                }
            }
        }
    }

    let ops = schema
        .update_operations
        .iter()
        .filter_map(|&name| {
            let owned: Vec<FieldDiff> = diffs.iter().filter(|d| d.triggers(name)).cloned().collect();
            (!owned.is_empty()).then_some(ApiOperation::Update { name, diffs: owned })
        })
        .collect();
    Ok(ops)
}

/// `updateMask` value for a set of diffs: top-level field paths, cut at the
/// first collection index, deduplicated in first-seen order.
pub fn update_mask(diffs: &[FieldDiff]) -> String {
    let mut paths: Vec<&str> = Vec::new();
    for d in diffs {
        let path = d.field.split('[').next().unwrap_or(&d.field);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths.join(",")
}
