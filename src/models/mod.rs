//! # 数据模型模块
//!
//! 定义晶相结构与精修参数注册表。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`symmetry/`、`diffraction/` 和 `commands/` 使用
//! - 子模块: structure, parameters

pub mod parameters;
pub mod structure;

pub use parameters::{
    Attribute, CellAxis, Entity, GlobalAttribute, Parameter, ParameterKey, ParameterRegistry,
};
pub use structure::{AtomSite, CellParameters, Crystal};
