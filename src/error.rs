//! # 统一错误处理模块
//!
//! 定义 Qdiffract 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分类
//! - 配置错误：CIF 缺少必要关键字、无法确定对称性、缺少晶胞参数
//! - 几何域错误：退化晶胞（判别式为负、角度为 0° 或 180°）
//! - 不可达衍射（λ/2d > 1）不是错误，由 `diffraction::hkl` 以跳过信号处理
//! - 容差边界上的等价性歧义只作为提示（见 `symmetry::ToleranceAdvisory`）
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// Qdiffract 统一错误类型
#[derive(Error, Debug)]
pub enum QdiffractError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Invalid symmetry operation '{operation}': {reason}")]
    InvalidOperation { operation: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 配置错误
    // ─────────────────────────────────────────────────────────────
    #[error("Missing required CIF keyword: {keyword}")]
    MissingKeyword { keyword: String },

    #[error("Cannot determine symmetry: no explicit operations and no space-group number")]
    NoSymmetry,

    #[error("Space group {number} is not available in the built-in database")]
    UnsupportedSpaceGroup { number: u32 },

    #[error("No scattering factor data for element '{element}'")]
    UnknownElement { element: String },

    // ─────────────────────────────────────────────────────────────
    // 几何域错误
    // ─────────────────────────────────────────────────────────────
    #[error("Degenerate cell geometry: {reason}")]
    DegenerateCell { reason: String },

    #[error("sin(θ)/λ must be positive for electron scattering, got {stl}")]
    ZeroScatteringVector { stl: f64 },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range format: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QdiffractError>;
