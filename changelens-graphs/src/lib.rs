pub mod docblock;
pub mod languages;
pub mod names;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use languages::{LanguageRegistry, LanguageSupport};
pub use names::AliasTable;

/// Error type for the declaration engine.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;

// ── Span type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl TextRange {
    /// 1-based first line of the span.
    pub fn start_line(&self) -> usize {
        self.start_row + 1
    }

    /// 1-based last line of the span.
    pub fn end_line(&self) -> usize {
        self.end_row + 1
    }
}

impl From<tree_sitter::Range> for TextRange {
    fn from(r: tree_sitter::Range) -> Self {
        Self {
            start_byte: r.start_byte,
            end_byte: r.end_byte,
            start_row: r.start_point.row,
            start_col: r.start_point.column,
            end_row: r.end_point.row,
            end_col: r.end_point.column,
        }
    }
}

// ── Declaration kinds ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Self::Public),
            "protected" => Some(Self::Protected),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Doc comment data ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocCommentData {
    /// The doc comment text, stripped of `/** */` and leading `*` markers.
    pub text: String,
    /// Hash of the doc comment for change detection.
    pub content_hash: u64,
}

// ── Per-file extraction output ─────────────────────────────────────

/// Everything the indexer needs from one source file.
#[derive(Debug, Clone)]
pub struct FileDeclarations {
    pub file_path: PathBuf,
    pub types: Vec<TypeDecl>,
    /// Declarations whose name node was missing.
    pub unnamed: Vec<UnnamedDecl>,
    /// Tree-sitter produced ERROR or MISSING nodes somewhere in the file.
    pub has_syntax_errors: bool,
}

/// A class or interface declaration with the name-resolution context it was
/// declared in. Names are left unresolved; the indexer resolves them through
/// `aliases`.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    /// Enclosing namespace without leading separator (`Pyz\Zed\Foo`), empty for global.
    pub namespace: String,
    pub aliases: AliasTable,
    /// `implements` names for classes, `extends` names for interfaces, as written.
    pub interfaces: Vec<String>,
    pub doc: Option<DocCommentData>,
    pub methods: Vec<MethodDecl>,
    pub constants: Vec<ConstDecl>,
    /// Properties with a known class type, names unresolved.
    pub properties: Vec<PropertyDecl>,
    pub span: TextRange,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<ParamDecl>,
    /// Native return type declaration (`: ?FooTransfer`).
    pub return_type: Option<String>,
    pub doc: Option<DocCommentData>,
    /// Whitespace-insensitive hash of the body, `None` for bodiless methods.
    pub body_hash: Option<u64>,
    /// Method calls in the body whose receiver can be typed statically.
    pub calls: Vec<CallSite>,
    pub span: TextRange,
}

/// A class constant (`protected const LIMIT = 10;`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstDecl {
    pub name: String,
    pub visibility: Visibility,
    /// Initializer expression with whitespace runs collapsed.
    pub value: String,
    pub span: TextRange,
}

/// A property whose class type is known from its declaration, a `@var` tag,
/// constructor promotion, or a constructor assignment from a typed parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDecl {
    /// Name without the `$`.
    pub name: String,
    /// Class name as written.
    pub type_name: String,
}

/// One `receiver->method()` or `Scope::method()` call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub receiver: CallReceiver,
    pub method: String,
}

/// How the receiver of a call was written. Names are unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallReceiver {
    /// `$this->method()`
    This,
    /// `$this->property->method()`
    Property(String),
    /// `$param->method()` on a parameter with a class type hint.
    Typed(String),
    /// `Name::method()`, including `self`, `static` and `parent`.
    Scoped(String),
    /// `$this->accessor()->method()`
    Accessor(String),
    /// `$this->accessor()->factoryMethod()->method()`
    FactoryProduct {
        accessor: String,
        factory_method: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub type_hint: Option<String>,
    pub default: Option<String>,
    pub variadic: bool,
    pub by_ref: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnnamedDecl {
    /// Tree-sitter node kind of the declaration.
    pub node_kind: String,
    pub span: TextRange,
}

/// Parse `source` with the language registered for `path` and extract its declarations.
pub fn extract_file(
    registry: &LanguageRegistry,
    path: &Path,
    source: &str,
) -> Result<FileDeclarations> {
    let lang = registry
        .for_file(path)
        .ok_or_else(|| GraphError::UnsupportedLanguage(path.display().to_string()))?;

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&lang.tree_sitter_language())
        .map_err(|e| GraphError::TreeSitter(format!("Failed to set language: {e}")))?;

    let tree = parser.parse(source, None).ok_or_else(|| GraphError::Parse {
        path: path.display().to_string(),
        message: "tree-sitter parse returned None".to_string(),
    })?;

    lang.extract_declarations(&tree, source, path)
}
