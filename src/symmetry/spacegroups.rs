//! # 内置空间群数据库
//!
//! 按国际表编号保存常用空间群的生成元与心化平移，查询时通过复合闭包生成
//! 完整操作集（晶格平移取模）。
//!
//! 设置约定：单斜 b 轴唯一（晶胞选择 1），三方 R 心采用六方轴，
//! Fd-3m 采用原点选择 1。
//!
//! ## 依赖关系
//! - 被 `symmetry/store.rs` 调用
//! - 使用 `symmetry/operation.rs`

use crate::error::{QdiffractError, Result};
use crate::symmetry::operation::SymmetryOperation;

/// 闭包生成时允许的最大操作数（F 心立方为 192）
const MAX_GROUP_ORDER: usize = 192;

/// 数据库条目
#[derive(Debug, Clone, Copy)]
pub struct SpaceGroupEntry {
    pub number: u32,
    pub symbol: &'static str,
    pub generators: &'static [&'static str],
    pub centering: &'static [&'static str],
}

const C_CENTERING: &[&str] = &["x+1/2,y+1/2,z"];
const I_CENTERING: &[&str] = &["x+1/2,y+1/2,z+1/2"];
const F_CENTERING: &[&str] = &["x,y+1/2,z+1/2", "x+1/2,y,z+1/2", "x+1/2,y+1/2,z"];
const R_CENTERING: &[&str] = &["x+2/3,y+1/3,z+1/3", "x+1/3,y+2/3,z+2/3"];

const CUBIC_M3M: &[&str] = &["-x,-y,z", "-x,y,-z", "z,x,y", "y,x,-z", "-x,-y,-z"];

static SPACE_GROUPS: &[SpaceGroupEntry] = &[
    SpaceGroupEntry {
        number: 1,
        symbol: "P1",
        generators: &[],
        centering: &[],
    },
    SpaceGroupEntry {
        number: 2,
        symbol: "P-1",
        generators: &["-x,-y,-z"],
        centering: &[],
    },
    SpaceGroupEntry {
        number: 4,
        symbol: "P2_1",
        generators: &["-x,y+1/2,-z"],
        centering: &[],
    },
    SpaceGroupEntry {
        number: 14,
        symbol: "P2_1/c",
        generators: &["-x,y+1/2,-z+1/2", "-x,-y,-z"],
        centering: &[],
    },
    SpaceGroupEntry {
        number: 15,
        symbol: "C2/c",
        generators: &["-x,y,-z+1/2", "-x,-y,-z"],
        centering: C_CENTERING,
    },
    SpaceGroupEntry {
        number: 19,
        symbol: "P2_12_12_1",
        generators: &["-x+1/2,-y,z+1/2", "-x,y+1/2,-z+1/2"],
        centering: &[],
    },
    SpaceGroupEntry {
        number: 62,
        symbol: "Pnma",
        generators: &["-x+1/2,-y,z+1/2", "-x,y+1/2,-z", "-x,-y,-z"],
        centering: &[],
    },
    SpaceGroupEntry {
        number: 139,
        symbol: "I4/mmm",
        generators: &["-x,-y,z", "-y,x,z", "-x,y,-z", "-x,-y,-z"],
        centering: I_CENTERING,
    },
    SpaceGroupEntry {
        number: 166,
        symbol: "R-3m",
        generators: &["-y,x-y,z", "y,x,-z", "-x,-y,-z"],
        centering: R_CENTERING,
    },
    SpaceGroupEntry {
        number: 191,
        symbol: "P6/mmm",
        generators: &["x-y,x,z", "y,x,-z", "-x,-y,-z"],
        centering: &[],
    },
    SpaceGroupEntry {
        number: 194,
        symbol: "P6_3/mmc",
        generators: &["x-y,x,z+1/2", "y,x,-z", "-x,-y,-z"],
        centering: &[],
    },
    SpaceGroupEntry {
        number: 216,
        symbol: "F-43m",
        generators: &["-x,-y,z", "-x,y,-z", "z,x,y", "y,x,z"],
        centering: F_CENTERING,
    },
    SpaceGroupEntry {
        number: 221,
        symbol: "Pm-3m",
        generators: CUBIC_M3M,
        centering: &[],
    },
    SpaceGroupEntry {
        number: 225,
        symbol: "Fm-3m",
        generators: CUBIC_M3M,
        centering: F_CENTERING,
    },
    SpaceGroupEntry {
        number: 227,
        symbol: "Fd-3m",
        generators: &[
            "-x,-y+1/2,z+1/2",
            "-x+1/2,y+1/2,-z",
            "z,x,y",
            "y+3/4,x+1/4,-z+3/4",
            "-x+1/4,-y+1/4,-z+1/4",
        ],
        centering: F_CENTERING,
    },
    SpaceGroupEntry {
        number: 229,
        symbol: "Im-3m",
        generators: CUBIC_M3M,
        centering: I_CENTERING,
    },
];

/// 查询数据库条目
pub fn lookup(number: u32) -> Option<&'static SpaceGroupEntry> {
    SPACE_GROUPS.iter().find(|entry| entry.number == number)
}

/// 数据库中可用的空间群编号
pub fn available_numbers() -> Vec<u32> {
    SPACE_GROUPS.iter().map(|entry| entry.number).collect()
}

/// 生成空间群的完整操作集（恒等操作在首位）
pub fn operations_for(number: u32, tol: f64) -> Result<Vec<SymmetryOperation>> {
    let entry = lookup(number).ok_or(QdiffractError::UnsupportedSpaceGroup { number })?;

    let mut seeds = Vec::with_capacity(entry.generators.len() + entry.centering.len());
    for op in entry.generators.iter().chain(entry.centering.iter()) {
        seeds.push(SymmetryOperation::parse(op)?.normalized());
    }

    close_under_composition(&seeds, tol)
}

/// 对生成元求复合闭包，平移取模 1
pub fn close_under_composition(
    generators: &[SymmetryOperation],
    tol: f64,
) -> Result<Vec<SymmetryOperation>> {
    let mut group = vec![SymmetryOperation::identity()];
    for g in generators {
        push_unique(&mut group, g.normalized(), tol);
    }

    let mut frontier = 0;
    while frontier < group.len() {
        let current = group[frontier];
        for g in generators {
            let product = g.compose(&current);
            push_unique(&mut group, product, tol);
            if group.len() > MAX_GROUP_ORDER {
                return Err(QdiffractError::Other(format!(
                    "symmetry generators do not close within {} operations",
                    MAX_GROUP_ORDER
                )));
            }
        }
        frontier += 1;
    }

    Ok(group)
}

fn push_unique(group: &mut Vec<SymmetryOperation>, op: SymmetryOperation, tol: f64) {
    if !group.iter().any(|existing| existing.approx_eq(&op, tol)) {
        group.push(op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-8;

    #[test]
    fn test_group_orders() {
        let expected = [
            (1, 1),
            (2, 2),
            (4, 2),
            (14, 4),
            (15, 8),
            (19, 4),
            (62, 8),
            (139, 32),
            (166, 36),
            (191, 24),
            (194, 24),
            (216, 96),
            (221, 48),
            (225, 192),
            (227, 192),
            (229, 96),
        ];
        for (number, order) in expected {
            let ops = operations_for(number, TOL).unwrap();
            assert_eq!(ops.len(), order, "space group {}", number);
        }
    }

    #[test]
    fn test_identity_first() {
        let ops = operations_for(62, TOL).unwrap();
        assert!(ops[0].approx_eq(&SymmetryOperation::identity(), TOL));
    }

    #[test]
    fn test_unknown_space_group() {
        assert!(matches!(
            operations_for(230, TOL),
            Err(QdiffractError::UnsupportedSpaceGroup { number: 230 })
        ));
    }

    #[test]
    fn test_closure_is_closed() {
        let ops = operations_for(194, TOL).unwrap();
        for a in &ops {
            for b in &ops {
                let ab = a.compose(b);
                assert!(ops.iter().any(|op| op.approx_eq(&ab, 1e-8)));
            }
        }
    }

    #[test]
    fn test_available_numbers() {
        let numbers = available_numbers();
        assert!(numbers.contains(&225));
        assert!(!numbers.contains(&230));
    }
}
