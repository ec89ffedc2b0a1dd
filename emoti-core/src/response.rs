//! Wire shape of a compilation, as served to the playground.

use serde::{Deserialize, Serialize};

use crate::compiler::CompileResult;
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompileResponse {
    /// Failure that happened before the compiler ran, so there is no trace.
    pub fn rejected(error: impl Into<String>) -> Self {
        CompileResponse {
            success: false,
            debug_output: None,
            js_code: None,
            error: Some(error.into()),
        }
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&CompileResult> for CompileResponse {
    fn from(result: &CompileResult) -> Self {
        CompileResponse {
            success: result.success,
            debug_output: Some(result.debug_trace.clone()),
            js_code: result.success.then(|| result.generated_code.clone()),
            error: (!result.success).then(|| result.error_summary.clone()),
        }
    }
}
