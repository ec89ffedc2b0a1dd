//! Browser entry points for the EmotiLang playground.
//!
//! The page posts `{"code": "..."}` and renders whatever JSON comes back;
//! the field names match what the hosted compile service returns.

use emoti_core::{CompileResponse, compile};
use serde::Deserialize;
use thiserror::Error;
use wasm_bindgen::prelude::*;

#[derive(Debug, Deserialize)]
struct CompileRequest {
    code: Option<String>,
}

/// Problems with the request itself, reported before compiling anything.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("No code provided")]
    MissingCode,
    #[error("Empty code provided")]
    EmptyCode,
    #[error("Server error: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Compile `source` and return the JSON compile response.
#[wasm_bindgen]
pub fn compile_emoti(source: &str) -> String {
    encode(&CompileResponse::from(&compile(source)))
}

/// Handle a raw request body the way the compile endpoint does.
#[wasm_bindgen]
pub fn handle_compile_request(body: &str) -> String {
    encode(&respond(body))
}

/// Request validation and compilation, without the JSON encoding step.
pub fn respond(body: &str) -> CompileResponse {
    match extract_code(body) {
        Ok(code) => CompileResponse::from(&compile(&code)),
        Err(err) => CompileResponse::rejected(err.to_string()),
    }
}

fn extract_code(body: &str) -> Result<String, RequestError> {
    let request: CompileRequest = serde_json::from_str(body)?;
    let code = request.code.ok_or(RequestError::MissingCode)?;
    // Blank-only sources are rejected, but positions must match what the user typed.
    if code.trim().is_empty() {
        return Err(RequestError::EmptyCode);
    }
    Ok(code)
}

fn encode(response: &CompileResponse) -> String {
    response.to_json().unwrap_or_else(|err| server_error(&err))
}

fn server_error(err: &dyn std::fmt::Display) -> String {
    serde_json::json!({
        "success": false,
        "error": format!("Server error: {err}"),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_code_field() {
        assert_eq!(
            handle_compile_request("{}"),
            r#"{"success":false,"error":"No code provided"}"#
        );
    }

    #[test]
    fn blank_code() {
        let response = respond(r#"{"code": "  \n\t "}"#);
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Empty code provided"));
        assert!(response.debug_output.is_none());
    }

    #[test]
    fn malformed_body() {
        let response = respond("not json");
        assert!(!response.success);
        assert!(response.error.expect("error").starts_with("Server error:"));
    }

    #[test]
    fn compiles_valid_code() {
        let response = respond(r#"{"code": ":P :0 42 ;)"}"#);
        assert!(response.success);
        assert!(response.js_code.expect("code").contains("console.log(42);"));
        assert!(response.debug_output.is_some());
        assert!(response.error.is_none());
    }

    #[test]
    fn reports_compile_errors_with_trace() {
        let response = respond(r#"{"code": ":P missing ;)"}"#);
        assert!(!response.success);
        assert!(response.js_code.is_none());
        assert!(response.error.expect("error").contains("NameError"));
        assert!(response.debug_output.expect("trace").contains("=== DIAGNOSTICS ==="));
    }

    #[test]
    fn positions_count_leading_blank_lines() {
        let response = respond(r#"{"code": "\n\n:P ghost ;)"}"#);
        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("resolver: NameError at line 3, column 4: undeclared identifier `ghost`\n")
        );
    }

    #[test]
    fn surrounding_whitespace_is_compiled_as_written() {
        let response = respond(r#"{"code": "  :P :0 1 ;)\n"}"#);
        assert!(response.success);
        assert!(response.js_code.expect("code").contains("console.log(1);"));
    }

    #[test]
    fn server_error_fallback_is_valid_json() {
        let body = server_error(&r#"key "code" at line 1 \ column 2"#);
        let json: serde_json::Value = serde_json::from_str(&body).expect("valid json");
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            r#"Server error: key "code" at line 1 \ column 2"#
        );
    }

    #[test]
    fn compile_emoti_returns_json() {
        let json: serde_json::Value =
            serde_json::from_str(&compile_emoti(":P :D ;)")).expect("json");
        assert_eq!(json["success"], true);
        assert_eq!(
            json["js_code"],
            "// Transpiled from EmotiLang\n\nconsole.log(true);\n"
        );
    }
}
