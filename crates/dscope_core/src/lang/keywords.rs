//! Define the reserved keyword vocabulary for the D language.
//!
//! This module is the single source of truth for reserved words: a stable identifier ([`KeywordId`]) plus a const
//! metadata table ([`KEYWORDS`]) that records canonical spellings and categories.
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive**.
//! - [`KEYWORDS`] is ordered exactly like [`KeywordId`]; [`info_for`] indexes by discriminant.
//! - Special tokens such as `__FILE__` and `__LINE__` are keywords in D and live here as
//!   [`KeywordCategory::Literal`].
//!
//! ## Examples
//! ```rust
//! use dscope_core::lang::keywords::{self, KeywordId};
//!
//! assert_eq!(keywords::from_str("if"), Some(KeywordId::If));
//! assert!(keywords::is_basic_type(KeywordId::Dchar));
//! assert!(keywords::is_storage_class(KeywordId::Const));
//! ```

/// Stable identifier for every reserved keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeywordId {
    // Basic types
    Bool,
    Byte,
    Ubyte,
    Short,
    Ushort,
    Int,
    Uint,
    Long,
    Ulong,
    Cent,
    Ucent,
    Char,
    Wchar,
    Dchar,
    Float,
    Double,
    Real,
    Ifloat,
    Idouble,
    Ireal,
    Cfloat,
    Cdouble,
    Creal,
    Void,

    // Type constructors
    Const,
    Immutable,
    Shared,
    Inout,

    // Storage classes / attributes
    Abstract,
    Auto,
    Deprecated,
    Extern,
    Final,
    Gshared,
    Lazy,
    Nothrow,
    Out,
    Override,
    Pure,
    Ref,
    Scope,
    Static,
    Synchronized,

    // Protection
    Private,
    Package,
    Protected,
    Public,
    Export,

    // Declarations
    Alias,
    Align,
    Asm,
    Class,
    Debug,
    Delegate,
    Enum,
    Function,
    Import,
    Interface,
    Invariant,
    Mixin,
    Module,
    Pragma,
    Struct,
    Template,
    This,
    Typedef,
    Union,
    Unittest,
    Version,

    // Statements
    If,
    Else,
    While,
    Do,
    For,
    Foreach,
    ForeachReverse,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,
    With,
    Try,
    Catch,
    Finally,
    Throw,
    Body,

    // Expression keywords
    Assert,
    Cast,
    Delete,
    In,
    Is,
    New,
    Super,
    Typeid,
    Typeof,
    Traits,
    Vector,

    // Literal-like keywords
    Null,
    True,
    False,
    File,
    Line,
    ModuleName,
    FunctionName,
    PrettyFunction,
}

/// High-level grouping used by the parser and by highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    /// Built-in scalar types (`int`, `dchar`, `void`, ...).
    BasicType,
    /// Qualifiers usable both as storage classes and as `const(T)` style type constructors.
    TypeConstructor,
    /// Storage classes and function attributes.
    StorageClass,
    /// Visibility attributes.
    Protection,
    /// Words that introduce a declaration.
    Declaration,
    /// Words that introduce a statement.
    Statement,
    /// Words that only occur inside expressions.
    Expression,
    /// Literal-like keywords and special tokens.
    Literal,
}

/// Metadata for a keyword.
#[derive(Debug, Clone, Copy)]
pub struct KeywordInfo {
    pub id: KeywordId,
    pub canonical: &'static str,
    pub category: KeywordCategory,
}

/// Registry of all keywords, in [`KeywordId`] order.
pub const KEYWORDS: &[KeywordInfo] = &[
    info(KeywordId::Bool, "bool", KeywordCategory::BasicType),
    info(KeywordId::Byte, "byte", KeywordCategory::BasicType),
    info(KeywordId::Ubyte, "ubyte", KeywordCategory::BasicType),
    info(KeywordId::Short, "short", KeywordCategory::BasicType),
    info(KeywordId::Ushort, "ushort", KeywordCategory::BasicType),
    info(KeywordId::Int, "int", KeywordCategory::BasicType),
    info(KeywordId::Uint, "uint", KeywordCategory::BasicType),
    info(KeywordId::Long, "long", KeywordCategory::BasicType),
    info(KeywordId::Ulong, "ulong", KeywordCategory::BasicType),
    info(KeywordId::Cent, "cent", KeywordCategory::BasicType),
    info(KeywordId::Ucent, "ucent", KeywordCategory::BasicType),
    info(KeywordId::Char, "char", KeywordCategory::BasicType),
    info(KeywordId::Wchar, "wchar", KeywordCategory::BasicType),
    info(KeywordId::Dchar, "dchar", KeywordCategory::BasicType),
    info(KeywordId::Float, "float", KeywordCategory::BasicType),
    info(KeywordId::Double, "double", KeywordCategory::BasicType),
    info(KeywordId::Real, "real", KeywordCategory::BasicType),
    info(KeywordId::Ifloat, "ifloat", KeywordCategory::BasicType),
    info(KeywordId::Idouble, "idouble", KeywordCategory::BasicType),
    info(KeywordId::Ireal, "ireal", KeywordCategory::BasicType),
    info(KeywordId::Cfloat, "cfloat", KeywordCategory::BasicType),
    info(KeywordId::Cdouble, "cdouble", KeywordCategory::BasicType),
    info(KeywordId::Creal, "creal", KeywordCategory::BasicType),
    info(KeywordId::Void, "void", KeywordCategory::BasicType),
    info(KeywordId::Const, "const", KeywordCategory::TypeConstructor),
    info(KeywordId::Immutable, "immutable", KeywordCategory::TypeConstructor),
    info(KeywordId::Shared, "shared", KeywordCategory::TypeConstructor),
    info(KeywordId::Inout, "inout", KeywordCategory::TypeConstructor),
    info(KeywordId::Abstract, "abstract", KeywordCategory::StorageClass),
    info(KeywordId::Auto, "auto", KeywordCategory::StorageClass),
    info(KeywordId::Deprecated, "deprecated", KeywordCategory::StorageClass),
    info(KeywordId::Extern, "extern", KeywordCategory::StorageClass),
    info(KeywordId::Final, "final", KeywordCategory::StorageClass),
    info(KeywordId::Gshared, "__gshared", KeywordCategory::StorageClass),
    info(KeywordId::Lazy, "lazy", KeywordCategory::StorageClass),
    info(KeywordId::Nothrow, "nothrow", KeywordCategory::StorageClass),
    info(KeywordId::Out, "out", KeywordCategory::StorageClass),
    info(KeywordId::Override, "override", KeywordCategory::StorageClass),
    info(KeywordId::Pure, "pure", KeywordCategory::StorageClass),
    info(KeywordId::Ref, "ref", KeywordCategory::StorageClass),
    info(KeywordId::Scope, "scope", KeywordCategory::StorageClass),
    info(KeywordId::Static, "static", KeywordCategory::StorageClass),
    info(KeywordId::Synchronized, "synchronized", KeywordCategory::StorageClass),
    info(KeywordId::Private, "private", KeywordCategory::Protection),
    info(KeywordId::Package, "package", KeywordCategory::Protection),
    info(KeywordId::Protected, "protected", KeywordCategory::Protection),
    info(KeywordId::Public, "public", KeywordCategory::Protection),
    info(KeywordId::Export, "export", KeywordCategory::Protection),
    info(KeywordId::Alias, "alias", KeywordCategory::Declaration),
    info(KeywordId::Align, "align", KeywordCategory::Declaration),
    info(KeywordId::Asm, "asm", KeywordCategory::Declaration),
    info(KeywordId::Class, "class", KeywordCategory::Declaration),
    info(KeywordId::Debug, "debug", KeywordCategory::Declaration),
    info(KeywordId::Delegate, "delegate", KeywordCategory::Declaration),
    info(KeywordId::Enum, "enum", KeywordCategory::Declaration),
    info(KeywordId::Function, "function", KeywordCategory::Declaration),
    info(KeywordId::Import, "import", KeywordCategory::Declaration),
    info(KeywordId::Interface, "interface", KeywordCategory::Declaration),
    info(KeywordId::Invariant, "invariant", KeywordCategory::Declaration),
    info(KeywordId::Mixin, "mixin", KeywordCategory::Declaration),
    info(KeywordId::Module, "module", KeywordCategory::Declaration),
    info(KeywordId::Pragma, "pragma", KeywordCategory::Declaration),
    info(KeywordId::Struct, "struct", KeywordCategory::Declaration),
    info(KeywordId::Template, "template", KeywordCategory::Declaration),
    info(KeywordId::This, "this", KeywordCategory::Declaration),
    info(KeywordId::Typedef, "typedef", KeywordCategory::Declaration),
    info(KeywordId::Union, "union", KeywordCategory::Declaration),
    info(KeywordId::Unittest, "unittest", KeywordCategory::Declaration),
    info(KeywordId::Version, "version", KeywordCategory::Declaration),
    info(KeywordId::If, "if", KeywordCategory::Statement),
    info(KeywordId::Else, "else", KeywordCategory::Statement),
    info(KeywordId::While, "while", KeywordCategory::Statement),
    info(KeywordId::Do, "do", KeywordCategory::Statement),
    info(KeywordId::For, "for", KeywordCategory::Statement),
    info(KeywordId::Foreach, "foreach", KeywordCategory::Statement),
    info(KeywordId::ForeachReverse, "foreach_reverse", KeywordCategory::Statement),
    info(KeywordId::Switch, "switch", KeywordCategory::Statement),
    info(KeywordId::Case, "case", KeywordCategory::Statement),
    info(KeywordId::Default, "default", KeywordCategory::Statement),
    info(KeywordId::Break, "break", KeywordCategory::Statement),
    info(KeywordId::Continue, "continue", KeywordCategory::Statement),
    info(KeywordId::Return, "return", KeywordCategory::Statement),
    info(KeywordId::Goto, "goto", KeywordCategory::Statement),
    info(KeywordId::With, "with", KeywordCategory::Statement),
    info(KeywordId::Try, "try", KeywordCategory::Statement),
    info(KeywordId::Catch, "catch", KeywordCategory::Statement),
    info(KeywordId::Finally, "finally", KeywordCategory::Statement),
    info(KeywordId::Throw, "throw", KeywordCategory::Statement),
    info(KeywordId::Body, "body", KeywordCategory::Statement),
    info(KeywordId::Assert, "assert", KeywordCategory::Expression),
    info(KeywordId::Cast, "cast", KeywordCategory::Expression),
    info(KeywordId::Delete, "delete", KeywordCategory::Expression),
    info(KeywordId::In, "in", KeywordCategory::Expression),
    info(KeywordId::Is, "is", KeywordCategory::Expression),
    info(KeywordId::New, "new", KeywordCategory::Expression),
    info(KeywordId::Super, "super", KeywordCategory::Expression),
    info(KeywordId::Typeid, "typeid", KeywordCategory::Expression),
    info(KeywordId::Typeof, "typeof", KeywordCategory::Expression),
    info(KeywordId::Traits, "__traits", KeywordCategory::Expression),
    info(KeywordId::Vector, "__vector", KeywordCategory::Expression),
    info(KeywordId::Null, "null", KeywordCategory::Literal),
    info(KeywordId::True, "true", KeywordCategory::Literal),
    info(KeywordId::False, "false", KeywordCategory::Literal),
    info(KeywordId::File, "__FILE__", KeywordCategory::Literal),
    info(KeywordId::Line, "__LINE__", KeywordCategory::Literal),
    info(KeywordId::ModuleName, "__MODULE__", KeywordCategory::Literal),
    info(KeywordId::FunctionName, "__FUNCTION__", KeywordCategory::Literal),
    info(KeywordId::PrettyFunction, "__PRETTY_FUNCTION__", KeywordCategory::Literal),
];

/// Canonical spelling.
///
/// ## Parameters
/// - `id`: Keyword identifier.
///
/// ## Returns
/// - The canonical spelling for `id`.
pub fn as_str(id: KeywordId) -> &'static str {
    info_for(id).canonical
}

/// Category.
pub fn category(id: KeywordId) -> KeywordCategory {
    info_for(id).category
}

/// Full metadata.
///
/// ## Returns
/// - The associated [`KeywordInfo`] from [`KEYWORDS`].
pub fn info_for(id: KeywordId) -> &'static KeywordInfo {
    &KEYWORDS[id as usize]
}

/// Lookup by spelling.
///
/// ## Returns
/// - `Some(KeywordId)` if the spelling is a reserved word.
/// - `None` otherwise (the word lexes as an identifier).
pub fn from_str(s: &str) -> Option<KeywordId> {
    KEYWORDS.iter().find(|k| k.canonical == s).map(|k| k.id)
}

/// Check whether a keyword names a built-in scalar type.
pub fn is_basic_type(id: KeywordId) -> bool {
    category(id) == KeywordCategory::BasicType
}

/// Check whether a keyword is a `const(T)` style type constructor.
pub fn is_type_constructor(id: KeywordId) -> bool {
    category(id) == KeywordCategory::TypeConstructor
}

/// Check whether a keyword can prefix a declaration as a storage class or attribute.
///
/// ## Notes
/// - Type constructors count as storage classes when they are not followed by `(`; the parser decides.
pub fn is_storage_class(id: KeywordId) -> bool {
    matches!(
        category(id),
        KeywordCategory::StorageClass | KeywordCategory::TypeConstructor
    )
}

/// Check whether a keyword is a protection attribute.
pub fn is_protection(id: KeywordId) -> bool {
    category(id) == KeywordCategory::Protection
}

/// Check whether a keyword is a parameter storage class (`in`, `out`, `ref`, `lazy`, `scope`, type constructors).
pub fn is_parameter_storage_class(id: KeywordId) -> bool {
    matches!(
        id,
        KeywordId::In
            | KeywordId::Out
            | KeywordId::Ref
            | KeywordId::Lazy
            | KeywordId::Scope
            | KeywordId::Final
            | KeywordId::Auto
    ) || is_type_constructor(id)
}

// --- helpers -----------------------------------------------------------------

const fn info(id: KeywordId, canonical: &'static str, category: KeywordCategory) -> KeywordInfo {
    KeywordInfo { id, canonical, category }
}
