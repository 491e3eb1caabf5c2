//! Descriptor string codec.
//!
//! The raw string is split on the separator into at most six pieces: five
//! pieces is the legacy layout, six the current one, where the last piece
//! (params) keeps any further separators verbatim.
use crate::{
    domain::TASK_FORMAT_SEPARATOR,
    error::{ModelError, ModelResult},
    task::{Layout, Task, TaskKind},
};

/// Admission predicate: `true` if `raw` decodes and the task may be queued.
///
/// Never panics and never errors; decode failures simply yield `false`.
///
/// # Examples
/// ```
/// use dcomp_model::validate;
///
/// assert!(validate("shell:5:8:2:echo hi"));
/// assert!(validate("shell:5:8:2:300:echo hi"));
/// assert!(!validate("shell:-1:8:2:echo hi"));
/// assert!(!validate("shell:5:8:2:"));
/// assert!(!validate("shell:5:8:2:-5:echo hi"));
/// ```
pub fn validate(raw: &str) -> bool {
    decode(raw.to_string()).is_ok_and(|t| t.is_admissible())
}

pub(crate) fn decode(raw: String) -> ModelResult<Task> {
    let parts: Vec<&str> = raw
        .splitn(Layout::Current.field_count(), TASK_FORMAT_SEPARATOR)
        .collect();

    let (layout, timeout, params) = match parts.as_slice() {
        [_, _, _, _, params] => (Layout::Legacy, None, *params),
        [_, _, _, _, timeout, params] => (Layout::Current, Some(*timeout), *params),
        _ => {
            return Err(ModelError::format(
                &raw,
                format!("expected 5 or 6 fields, got {}", parts.len()),
            ));
        }
    };

    let task_type = parts[0];
    if task_type.is_empty() {
        return Err(ModelError::format(&raw, "empty task type"));
    }
    if params.is_empty() {
        return Err(ModelError::format(&raw, "empty task params"));
    }

    let priority = parse_uint(&raw, "priority", parts[1])?;
    let min_dram_gb = parse_uint(&raw, "min_dram_gb", parts[2])?;
    let require_cpu_core = parse_uint(&raw, "require_cpu_core", parts[3])?;
    let timeout_seconds = timeout
        .map(|t| parse_uint(&raw, "timeout_seconds", t))
        .transpose()?;

    let kind = TaskKind::of(&raw, task_type);
    let task_type = task_type.to_string();
    let params = params.to_string();

    Ok(Task {
        raw,
        kind,
        layout,
        task_type,
        priority,
        min_dram_gb,
        require_cpu_core,
        timeout_seconds,
        params,
    })
}

pub(crate) fn encode(
    task_type: &str,
    priority: u64,
    min_dram_gb: u64,
    require_cpu_core: u64,
    timeout_seconds: Option<u64>,
    params: &str,
) -> ModelResult<String> {
    if task_type.is_empty() || task_type.contains(TASK_FORMAT_SEPARATOR) {
        return Err(ModelError::InvalidField {
            field: "task_type",
            reason: format!("must be non-empty and free of '{TASK_FORMAT_SEPARATOR}'"),
        });
    }
    if params.is_empty() {
        return Err(ModelError::InvalidField {
            field: "task_params",
            reason: "must be non-empty".to_string(),
        });
    }

    let sep = TASK_FORMAT_SEPARATOR;
    match timeout_seconds {
        Some(timeout) => Ok(format!(
            "{task_type}{sep}{priority}{sep}{min_dram_gb}{sep}{require_cpu_core}{sep}{timeout}{sep}{params}"
        )),
        None if params.contains(sep) => Err(ModelError::InvalidField {
            field: "task_params",
            reason: format!("legacy layout cannot carry '{sep}' in params; set a timeout"),
        }),
        None => Ok(format!(
            "{task_type}{sep}{priority}{sep}{min_dram_gb}{sep}{require_cpu_core}{sep}{params}"
        )),
    }
}

/// Strict non-negative integer: ASCII digits only, no sign, no blanks.
fn parse_uint(raw: &str, field: &'static str, s: &str) -> ModelResult<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ModelError::format(
            raw,
            format!("{field} must be a non-negative integer, got {s:?}"),
        ));
    }
    s.parse::<u64>()
        .map_err(|e| ModelError::format(raw, format!("{field} out of range: {e}")))
}
