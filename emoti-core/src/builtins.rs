//! Host bindings and reserved names of the JavaScript target.
//!
//! EmotiLang has no library of its own; its two I/O forms lower to host
//! calls described here. The name lists are consulted by the code
//! generator so that user identifiers never collide with JavaScript
//! keywords or with the host functions the generated code relies on.

/// Kind of host binding, used by the backend to decide how to lower a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    /// Writes one value to the console (`:P`).
    Print,
    /// Reads one line of user input as a string (`O_O`).
    Input,
}

/// Metadata about a single host binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDescriptor {
    /// Global object the binding lives on in the host, if any.
    pub object: Option<&'static str>,

    /// Member (or global function) name.
    pub name: &'static str,

    /// Literal arguments passed before any user argument.
    pub fixed_args: &'static [&'static str],

    pub kind: BuiltinKind,
}

impl BuiltinDescriptor {
    /// Expression used to reach the binding, e.g. `console.log`.
    pub fn path(&self) -> String {
        match self.object {
            Some(object) => format!("{object}.{}", self.name),
            None => self.name.to_string(),
        }
    }

    /// Global identifier the binding depends on; user names must avoid it.
    pub fn root(&self) -> &'static str {
        self.object.unwrap_or(self.name)
    }
}

pub const BUILTINS: &[BuiltinDescriptor] = &[
    BuiltinDescriptor {
        object: Some("console"),
        name: "log",
        fixed_args: &[],
        kind: BuiltinKind::Print,
    },
    BuiltinDescriptor {
        object: None,
        name: "prompt",
        fixed_args: &["\"Enter input:\""],
        kind: BuiltinKind::Input,
    },
];

pub fn builtin(kind: BuiltinKind) -> &'static BuiltinDescriptor {
    match kind {
        BuiltinKind::Print => &BUILTINS[0],
        BuiltinKind::Input => &BUILTINS[1],
    }
}

/// JavaScript reserved words, including strict-mode and contextual ones
/// that cannot name a `let` binding or function.
pub const JS_RESERVED: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while",
    "with", "yield", "Infinity", "NaN",
];

/// Whether `name` would clash with the target language if emitted verbatim.
pub fn is_reserved(name: &str) -> bool {
    JS_RESERVED.contains(&name) || BUILTINS.iter().any(|b| b.root() == name)
}
