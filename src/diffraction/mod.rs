//! # 衍射计算模块
//!
//! 从晶胞与对称操作出发，生成衍射组、结构因子与 Bragg 位置。
//!
//! ## 子模块
//! - `lattice`: d 间距、晶胞体积、2θ
//! - `adp`: 原子位移参数（Biso、B 张量、非谐项）
//! - `structure_factor`: 结构因子 F(hkl)
//! - `hkl`: hkl 星、按 d 分组、规范标签、候选生成
//! - `bragg`: Bragg 位置表的组装与读写
//! - `profiles`: 峰形函数与展宽图谱
//! - `export`: CSV / XY 导出
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `symmetry/`、`scattering/` 和 `models/`

pub mod adp;
pub mod bragg;
pub mod export;
pub mod hkl;
pub mod lattice;
pub mod profiles;
pub mod structure_factor;

pub use bragg::{build_bragg_positions, load_bragg_positions, save_bragg_positions, BraggCell, BraggRow};
pub use hkl::{generate_hkl_array, GroupingEngine, ReflectionGroup};
pub use profiles::{broadened_pattern, PatternGrid, Profile, ProfileKind};
pub use structure_factor::StructureModel;
