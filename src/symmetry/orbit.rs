//! # 原子轨道展开
//!
//! 用全部空间群操作展开一个分数坐标位置，取模到 [0,1)³，并按最小像欧氏距离去重。
//!
//! ## 规则
//! - 输入位置本身排在首位，其后依次为 `R·r + t`
//! - 逐个接受：与已接受位置的最小像距离均 ≥ tol 时接受（先到先得）
//! - 距离落在 `tol·(1 ± band)` 内记录 `AmbiguousEquivalence` 提示
//!
//! ## 依赖关系
//! - 被 `diffraction/structure_factor.rs` 和 `commands/inspect.rs` 使用
//! - 使用 `symmetry/operation.rs`

use crate::config::Tolerances;
use crate::models::AtomSite;
use crate::symmetry::operation::{wrap_unit, SymmetryOperation};
use crate::symmetry::ToleranceAdvisory;

/// 最小像欧氏距离（分数坐标）
pub fn pbc_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let mut sum = 0.0;
    for i in 0..3 {
        let d = a[i] - b[i];
        let d = d - d.round();
        sum += d * d;
    }
    sum.sqrt()
}

/// 位置取模到 [0,1)³
pub fn wrap_position(r: &[f64; 3]) -> [f64; 3] {
    [wrap_unit(r[0]), wrap_unit(r[1]), wrap_unit(r[2])]
}

/// 展开位置并去重，返回轨道（首个元素为输入位置本身，已取模）
pub fn expand_position(position: [f64; 3], ops: &[SymmetryOperation], tol: f64) -> Vec<[f64; 3]> {
    let tolerances = Tolerances {
        position: tol,
        boundary_band: 0.0,
        ..Tolerances::default()
    };
    expand_with_advisories(position, ops, &tolerances, "").0
}

/// 展开位置并收集容差边界提示
pub fn expand_with_advisories(
    position: [f64; 3],
    ops: &[SymmetryOperation],
    tolerances: &Tolerances,
    context: &str,
) -> (Vec<[f64; 3]>, Vec<ToleranceAdvisory>) {
    let tol = tolerances.position;
    let lower = tol * (1.0 - tolerances.boundary_band);
    let upper = tol * (1.0 + tolerances.boundary_band);

    let candidates = std::iter::once(position).chain(ops.iter().map(|op| op.apply(&position)));

    let mut accepted: Vec<[f64; 3]> = Vec::with_capacity(ops.len() + 1);
    let mut advisories = Vec::new();

    for candidate in candidates {
        let candidate = wrap_position(&candidate);
        let mut duplicate = false;
        for existing in &accepted {
            let distance = pbc_distance(&candidate, existing);
            if tolerances.boundary_band > 0.0 && distance >= lower && distance <= upper {
                advisories.push(ToleranceAdvisory::AmbiguousEquivalence {
                    context: context.to_string(),
                    distance,
                    tolerance: tol,
                });
            }
            if distance < tol {
                duplicate = true;
                break;
            }
        }
        if !duplicate {
            accepted.push(candidate);
        }
    }

    (accepted, advisories)
}

/// 一个非对称单元位点展开后的轨道
#[derive(Debug, Clone)]
pub struct Orbit {
    /// 位点标签
    pub label: String,
    /// 元素符号
    pub element: String,
    /// 轨道位置（首个为代表位置）
    pub positions: Vec<[f64; 3]>,
}

impl Orbit {
    /// 展开一个原子位点，并检查轨道大小是否整除群阶
    pub fn from_site(
        site: &AtomSite,
        ops: &[SymmetryOperation],
        group_order: usize,
        tolerances: &Tolerances,
    ) -> (Self, Vec<ToleranceAdvisory>) {
        let (positions, mut advisories) =
            expand_with_advisories(site.position, ops, tolerances, &site.label);

        if group_order > 0 && group_order % positions.len() != 0 {
            advisories.push(ToleranceAdvisory::OrbitSizeMismatch {
                context: site.label.clone(),
                orbit_size: positions.len(),
                group_order,
            });
        }

        (
            Orbit {
                label: site.label.clone(),
                element: site.element.clone(),
                positions,
            },
            advisories,
        )
    }

    /// 位点多重度（轨道大小）
    pub fn multiplicity(&self) -> usize {
        self.positions.len()
    }

    /// 代表位置
    pub fn representative(&self) -> [f64; 3] {
        self.positions[0]
    }

    /// 各位置到代表位置的最小像距离
    pub fn distances_to_representative(&self) -> Vec<f64> {
        let rep = self.representative();
        self.positions.iter().map(|p| pbc_distance(p, &rep)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::spacegroups::operations_for;

    const TOL: f64 = 0.005;

    #[test]
    fn test_pbc_distance_wraps() {
        let d = pbc_distance(&[0.99, 0.0, 0.0], &[0.01, 0.0, 0.0]);
        assert!((d - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_identity_orbit_single() {
        let ops = vec![SymmetryOperation::identity()];
        let orbit = expand_position([0.5, 0.5, 0.5], &ops, TOL);
        assert_eq!(orbit.len(), 1);
        assert_eq!(orbit[0], [0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_input_position_first() {
        let ops = operations_for(221, 1e-8).unwrap();
        let orbit = expand_position([0.1, 0.2, 0.3], &ops, TOL);
        assert_eq!(orbit[0], [0.1, 0.2, 0.3]);
        assert_eq!(orbit.len(), 48);
    }

    #[test]
    fn test_special_positions_collapse() {
        let ops = operations_for(225, 1e-8).unwrap();
        assert_eq!(expand_position([0.0, 0.0, 0.0], &ops, TOL).len(), 4);
        assert_eq!(expand_position([0.25, 0.25, 0.25], &ops, TOL).len(), 8);
        assert_eq!(expand_position([0.5, 0.5, 0.5], &ops, TOL).len(), 4);
    }

    #[test]
    fn test_diamond_8a() {
        let ops = operations_for(227, 1e-8).unwrap();
        let orbit = expand_position([0.0, 0.0, 0.0], &ops, TOL);
        assert_eq!(orbit.len(), 8);
        assert!(orbit
            .iter()
            .any(|p| pbc_distance(p, &[0.25, 0.25, 0.25]) < 1e-9));
    }

    #[test]
    fn test_reexpansion_reproduces_orbit() {
        let ops = operations_for(194, 1e-8).unwrap();
        let orbit = expand_position([1.0 / 3.0, 2.0 / 3.0, 0.25], &ops, TOL);
        assert_eq!(orbit.len(), 2);
        for member in &orbit {
            let again = expand_position(*member, &ops, TOL);
            assert_eq!(again.len(), orbit.len());
            for p in &again {
                assert!(orbit.iter().any(|q| pbc_distance(p, q) < TOL));
            }
        }
    }

    #[test]
    fn test_orbit_size_divides_group_order() {
        for number in [2, 14, 62, 139, 166, 191, 216, 229] {
            let ops = operations_for(number, 1e-8).unwrap();
            for pos in [[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.13, 0.27, 0.41]] {
                let orbit = expand_position(pos, &ops, TOL);
                assert_eq!(ops.len() % orbit.len(), 0, "group {} pos {:?}", number, pos);
            }
        }
    }

    #[test]
    fn test_boundary_advisory() {
        let ops = vec![SymmetryOperation::translation([0.005, 0.0, 0.0])];
        let tol = Tolerances::default();
        let (orbit, advisories) = expand_with_advisories([0.0, 0.0, 0.0], &ops, &tol, "X1");
        assert_eq!(orbit.len(), 2);
        assert_eq!(advisories.len(), 1);
        assert!(matches!(
            advisories[0],
            ToleranceAdvisory::AmbiguousEquivalence { .. }
        ));
    }

    #[test]
    fn test_orbit_from_site() {
        let ops = operations_for(225, 1e-8).unwrap();
        let site = AtomSite::new("Na1", "Na+", [0.0, 0.0, 0.0]);
        let (orbit, advisories) = Orbit::from_site(&site, &ops, ops.len(), &Tolerances::default());
        assert_eq!(orbit.multiplicity(), 4);
        assert_eq!(orbit.element, "Na");
        assert!(advisories.is_empty());
        let distances = orbit.distances_to_representative();
        assert_eq!(distances[0], 0.0);
        assert!(distances[1..].iter().all(|d| *d > 0.5));
    }

    #[test]
    fn test_orbit_size_mismatch_advisory() {
        // 未闭合的操作集：轨道大小 3 不整除声明的群阶 2
        let ops = vec![
            SymmetryOperation::identity(),
            SymmetryOperation::translation([1.0 / 3.0, 0.0, 0.0]),
            SymmetryOperation::translation([2.0 / 3.0, 0.0, 0.0]),
        ];
        let site = AtomSite::new("X1", "Si", [0.1, 0.2, 0.3]);
        let (orbit, advisories) = Orbit::from_site(&site, &ops, 2, &Tolerances::default());
        assert_eq!(orbit.multiplicity(), 3);
        assert_eq!(advisories.len(), 1);
        match &advisories[0] {
            ToleranceAdvisory::OrbitSizeMismatch {
                context,
                orbit_size,
                group_order,
            } => {
                assert_eq!(context, "X1");
                assert_eq!(*orbit_size, 3);
                assert_eq!(*group_order, 2);
            }
            other => panic!("unexpected advisory {:?}", other),
        }
    }
}
