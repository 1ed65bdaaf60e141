//! # hkl 星与衍射分组
//!
//! ## 算法概述
//! 1. 在 `[−hkl_max, hkl_max]³` 内生成候选 hkl（按模式筛选消光，跳过不可达衍射）
//! 2. 对每个候选求 hkl 星：`h' = round(Rᵀh)`，相位 `exp(2πi h·t)` 使用原始 h
//! 3. 星内按 d 分组（量化键 `round(d/tol)`），每组取规范标签与多重度
//! 4. 按规范标签合并候选，先出现者保留
//! 5. 对保留的组计算每个成员的 |F|²
//!
//! 步骤 2、3、5 对各 hkl 独立，用 rayon 并行，结果按候选顺序收集。
//!
//! ## 已知限制
//! d 量化分组在桶边界两侧会把几乎相等的 d 分开，保持现状。
//!
//! ## 依赖关系
//! - 被 `diffraction/bragg.rs` 和 `commands/` 使用
//! - 使用 `symmetry/` 的操作与消光规则
//! - 使用 `diffraction/structure_factor.rs` 计算 |F|²

use crate::config::{GenerationConfig, HklMode, Radiation};
use crate::diffraction::lattice::{sin_theta_over_lambda, two_theta};
use crate::diffraction::structure_factor::StructureModel;
use crate::error::Result;
use crate::models::CellParameters;
use crate::scattering::ScatteringModel;
use crate::symmetry::{ExtinctionRule, SymmetryOperation};

use num_complex::Complex64;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::f64::consts::PI;

/// hkl 星中的一项
#[derive(Debug, Clone, PartialEq)]
pub struct StarEntry {
    pub hkl: [i32; 3],
    /// exp(2πi h·t)，h 为原始指数
    pub phase: Complex64,
    /// 生成该项的操作序号
    pub op_index: usize,
}

/// 带几何量的一条衍射
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionRow {
    pub hkl: [i32; 3],
    pub d: f64,
    pub two_theta: f64,
    pub stl: f64,
    pub phase: Complex64,
    pub op_index: usize,
    /// |F|²，分组后填入
    pub f2: f64,
}

/// 对称等价（同 d）衍射组
#[derive(Debug, Clone)]
pub struct ReflectionGroup {
    /// 规范标签
    pub label: [i32; 3],
    /// 多重度（不同 hkl 的个数）
    pub multiplicity: usize,
    pub members: Vec<ReflectionRow>,
}

impl ReflectionGroup {
    pub fn mean_two_theta(&self) -> f64 {
        mean(self.members.iter().map(|m| m.two_theta))
    }

    pub fn mean_f2(&self) -> f64 {
        mean(self.members.iter().map(|m| m.f2))
    }

    /// 强度 = 平均 |F|² × 多重度
    pub fn intensity(&self) -> f64 {
        self.mean_f2() * self.multiplicity as f64
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// 候选 hkl 及其几何量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HklCandidate {
    pub hkl: [i32; 3],
    /// (0,0,0) 为无穷大
    pub d: f64,
    pub two_theta: f64,
    pub stl: f64,
}

/// 求 hkl 星
///
/// `add_inversion` 为真且操作中不含严格等于 −I 的旋转时，追加每个操作的 `R·(−I)`。
/// 被 `rule` 判为消光的项被丢弃；重复项保留。
pub fn star(
    hkl: [i32; 3],
    ops: &[SymmetryOperation],
    rule: Option<&ExtinctionRule>,
    add_inversion: bool,
) -> Vec<StarEntry> {
    let mut all: Vec<SymmetryOperation> = ops.to_vec();
    if add_inversion && !ops.iter().any(SymmetryOperation::is_inversion) {
        all.extend(ops.iter().map(SymmetryOperation::times_inversion));
    }

    let h = [hkl[0] as f64, hkl[1] as f64, hkl[2] as f64];
    all.iter()
        .enumerate()
        .filter_map(|(op_index, op)| {
            let image = op.apply_hkl(hkl);
            if let Some(rule) = rule {
                if !rule.allows(image) {
                    return None;
                }
            }
            let t = &op.translation;
            let phase = Complex64::from_polar(1.0, 2.0 * PI * (h[0] * t[0] + h[1] * t[1] + h[2] * t[2]));
            Some(StarEntry {
                hkl: image,
                phase,
                op_index,
            })
        })
        .collect()
}

/// 按 d 分组：键为 `round(d/tol)`，组按键升序
pub fn group_by_d(rows: Vec<ReflectionRow>, tol: f64) -> Vec<Vec<ReflectionRow>> {
    let mut grouped: BTreeMap<i64, Vec<ReflectionRow>> = BTreeMap::new();
    for row in rows {
        let key = (row.d / tol).round() as i64;
        grouped.entry(key).or_default().push(row);
    }
    grouped.into_values().collect()
}

/// 规范标签：先使第一个非零指数为正，再取字典序最小
pub fn canonical_hkl<I>(hkls: I) -> Option<[i32; 3]>
where
    I: IntoIterator<Item = [i32; 3]>,
{
    hkls.into_iter()
        .map(|[h, k, l]| {
            if h < 0 || (h == 0 && k < 0) || (h == 0 && k == 0 && l < 0) {
                [-h, -k, -l]
            } else {
                [h, k, l]
            }
        })
        .min()
}

/// 去除重复 hkl（保留首次出现）
pub fn unique_rows(rows: Vec<ReflectionRow>) -> Vec<ReflectionRow> {
    let mut seen = HashSet::new();
    rows.into_iter().filter(|r| seen.insert(r.hkl)).collect()
}

/// 在 `[−hkl_max, hkl_max]³` 内生成候选 hkl
///
/// `λ/(2d) > 1` 的衍射不可达，直接跳过；`include_origin` 时 (0,0,0) 排在首位。
pub fn generate_hkl_array(
    hkl_max: i32,
    cell: &CellParameters,
    wavelength: f64,
    two_theta_max: Option<f64>,
    rule: &ExtinctionRule,
    mode: HklMode,
    include_origin: bool,
) -> Result<Vec<HklCandidate>> {
    let mut candidates = Vec::new();
    if include_origin {
        candidates.push(HklCandidate {
            hkl: [0, 0, 0],
            d: f64::INFINITY,
            two_theta: 0.0,
            stl: 0.0,
        });
    }

    for h in -hkl_max..=hkl_max {
        for k in -hkl_max..=hkl_max {
            for l in -hkl_max..=hkl_max {
                if h == 0 && k == 0 && l == 0 {
                    continue;
                }
                let hkl = [h, k, l];
                let selected = match mode {
                    HklMode::Allowed => rule.allows(hkl),
                    HklMode::Forbidden => !rule.allows(hkl),
                    HklMode::All => true,
                };
                if !selected {
                    continue;
                }

                let d = cell.d_spacing(hkl)?;
                let Some(tt) = two_theta(d, wavelength) else {
                    continue;
                };
                if two_theta_max.is_some_and(|max| tt > max) {
                    continue;
                }
                candidates.push(HklCandidate {
                    hkl,
                    d,
                    two_theta: tt,
                    stl: sin_theta_over_lambda(d),
                });
            }
        }
    }

    Ok(candidates)
}

/// 分组引擎：一次构建，按候选并行生成衍射组
pub struct GroupingEngine<'a> {
    pub cell: CellParameters,
    pub operations: &'a [SymmetryOperation],
    pub rule: &'a ExtinctionRule,
    pub structure: &'a StructureModel,
    pub scattering: &'a ScatteringModel,
    pub config: &'a GenerationConfig,
}

impl<'a> GroupingEngine<'a> {
    /// 星上的消光筛选：allowed 模式用规则，forbidden/all 不筛选
    fn star_rule(&self) -> Option<&ExtinctionRule> {
        match self.config.mode {
            HklMode::Allowed => Some(self.rule),
            HklMode::Forbidden | HklMode::All => None,
        }
    }

    /// 星 → 带几何量的行 → 去重 → 按 2θ 排序 → 按 d 分组
    fn groups_for(&self, hkl: [i32; 3]) -> Result<Vec<ReflectionGroup>> {
        let identity = [SymmetryOperation::identity()];
        let entries = if self.config.individual {
            star(hkl, &identity, None, false)
        } else {
            star(hkl, self.operations, self.star_rule(), true)
        };

        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            let row = if entry.hkl == [0, 0, 0] {
                ReflectionRow {
                    hkl: entry.hkl,
                    d: f64::INFINITY,
                    two_theta: 0.0,
                    stl: 0.0,
                    phase: entry.phase,
                    op_index: entry.op_index,
                    f2: 0.0,
                }
            } else {
                let d = self.cell.d_spacing(entry.hkl)?;
                let Some(tt) = two_theta(d, self.config.wavelength) else {
                    continue;
                };
                ReflectionRow {
                    hkl: entry.hkl,
                    d,
                    two_theta: tt,
                    stl: sin_theta_over_lambda(d),
                    phase: entry.phase,
                    op_index: entry.op_index,
                    f2: 0.0,
                }
            };
            rows.push(row);
        }

        let mut rows = unique_rows(rows);
        rows.sort_by(|a, b| a.two_theta.total_cmp(&b.two_theta));

        let groups = if rows.first().is_some_and(|r| r.d.is_infinite()) {
            vec![rows]
        } else {
            group_by_d(rows, self.config.tolerances.d_spacing)
        };

        Ok(groups
            .into_iter()
            .filter_map(|members| {
                let label = canonical_hkl(members.iter().map(|m| m.hkl))?;
                Some(ReflectionGroup {
                    label,
                    multiplicity: members.len(),
                    members,
                })
            })
            .collect())
    }

    /// 计算各成员的 |F|²
    ///
    /// 电子散射在 (0,0,0) 处无定义，该行保留且 |F|² 记为 0。
    fn fill_intensities(&self, mut group: ReflectionGroup) -> Result<ReflectionGroup> {
        for member in &mut group.members {
            if member.hkl == [0, 0, 0] && self.scattering.radiation() == Radiation::Electron {
                member.f2 = 0.0;
                continue;
            }
            member.f2 = self
                .structure
                .structure_factor_at(member.hkl, member.stl, self.scattering)?
                .norm_sqr();
        }
        Ok(group)
    }

    /// 由候选生成全部衍射组
    ///
    /// 合并模式下按规范标签去重（先出现者保留）；individual 模式下每个 hkl 单独成组。
    pub fn build_groups(&self, candidates: &[HklCandidate]) -> Result<Vec<ReflectionGroup>> {
        let per_candidate: Vec<Vec<ReflectionGroup>> = candidates
            .par_iter()
            .map(|c| self.groups_for(c.hkl))
            .collect::<Result<_>>()?;

        let mut kept = Vec::new();
        if self.config.individual {
            for group in per_candidate.into_iter().flatten() {
                for member in group.members {
                    kept.push(ReflectionGroup {
                        label: member.hkl,
                        multiplicity: 1,
                        members: vec![member],
                    });
                }
            }
        } else {
            let mut seen = HashSet::new();
            for group in per_candidate.into_iter().flatten() {
                if seen.insert(group.label) {
                    kept.push(group);
                }
            }
        }

        kept.into_par_iter()
            .map(|g| self.fill_intensities(g))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Radiation, Tolerances};
    use crate::models::{AtomSite, Crystal};
    use crate::symmetry::SymmetryStore;

    fn row(hkl: [i32; 3], d: f64) -> ReflectionRow {
        ReflectionRow {
            hkl,
            d,
            two_theta: 0.0,
            stl: 0.0,
            phase: Complex64::new(1.0, 0.0),
            op_index: 0,
            f2: 0.0,
        }
    }

    #[test]
    fn test_star_identity_and_inversion() {
        let ops = vec![SymmetryOperation::identity(), SymmetryOperation::inversion()];
        let entries = star([1, 0, 0], &ops, None, true);
        let hkls: Vec<[i32; 3]> = entries.iter().map(|e| e.hkl).collect();
        assert_eq!(hkls, vec![[1, 0, 0], [-1, 0, 0]]);
        assert_eq!(canonical_hkl(hkls), Some([1, 0, 0]));
    }

    #[test]
    fn test_star_adds_inversion_when_missing() {
        let ops = vec![SymmetryOperation::identity()];
        assert_eq!(star([1, 2, 3], &ops, None, true).len(), 2);
        assert_eq!(star([1, 2, 3], &ops, None, false).len(), 1);
    }

    #[test]
    fn test_star_phase_uses_original_hkl() {
        let op = SymmetryOperation::parse("-x,y+1/2,-z").unwrap();
        let entries = star([1, 1, 0], &[op], None, false);
        assert_eq!(entries[0].hkl, [-1, 1, 0]);
        // exp(2πi·(1·0 + 1·1/2)) = −1
        assert!((entries[0].phase.re + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_star_drops_extinct() {
        let store = SymmetryStore::from_space_group(225, 1e-8).unwrap();
        let rule = store.extinction_rule();
        let entries = star([1, 0, 0], store.reciprocal_operations(), Some(&rule), true);
        assert!(entries.is_empty());
        let entries = star([2, 0, 0], store.reciprocal_operations(), Some(&rule), true);
        let unique: HashSet<[i32; 3]> = entries.iter().map(|e| e.hkl).collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_hexagonal_star_preserves_d() {
        let store = SymmetryStore::from_space_group(191, 1e-8).unwrap();
        let cell = CellParameters::hexagonal(3.0, 5.0);
        let d0 = cell.d_spacing([1, 2, 1]).unwrap();
        for entry in star([1, 2, 1], store.operations(), None, true) {
            let d = cell.d_spacing(entry.hkl).unwrap();
            assert!((d - d0).abs() < 1e-10, "{:?}", entry.hkl);
        }
    }

    #[test]
    fn test_group_by_d_buckets() {
        let groups = group_by_d(vec![row([1, 0, 0], 2.0), row([0, 1, 0], 2.0000049)], 1e-5);
        assert_eq!(groups.len(), 1);
        let groups = group_by_d(vec![row([1, 0, 0], 2.0), row([0, 1, 0], 2.00011)], 1e-5);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0][0].hkl, [1, 0, 0]);
    }

    #[test]
    fn test_canonical_idempotent() {
        let group = vec![[0, -1, 2], [0, 1, -2], [-2, 1, 0], [1, -2, 0]];
        let label = canonical_hkl(group.clone()).unwrap();
        assert_eq!(label, [0, 1, -2]);
        assert_eq!(canonical_hkl(vec![label]), Some(label));
        assert_eq!(canonical_hkl(Vec::new()), None);
    }

    #[test]
    fn test_generate_modes() {
        let store = SymmetryStore::from_space_group(229, 1e-8).unwrap();
        let rule = store.extinction_rule();
        let cell = CellParameters::cubic(3.0);

        let allowed = generate_hkl_array(2, &cell, 1.5418, None, &rule, HklMode::Allowed, false).unwrap();
        let forbidden = generate_hkl_array(2, &cell, 1.5418, None, &rule, HklMode::Forbidden, false).unwrap();
        let all = generate_hkl_array(2, &cell, 1.5418, None, &rule, HklMode::All, false).unwrap();

        assert_eq!(allowed.len() + forbidden.len(), all.len());
        assert!(allowed.iter().all(|c| (c.hkl[0] + c.hkl[1] + c.hkl[2]) % 2 == 0));
        assert!(forbidden.iter().all(|c| (c.hkl[0] + c.hkl[1] + c.hkl[2]).rem_euclid(2) == 1));
        assert!(all.iter().all(|c| c.hkl != [0, 0, 0]));
    }

    #[test]
    fn test_generate_skips_unreachable() {
        let cell = CellParameters::cubic(3.0);
        let rule = ExtinctionRule::none();
        // λ/(2d) > 1 的衍射全部跳过
        let candidates = generate_hkl_array(10, &cell, 1.5418, None, &rule, HklMode::All, true).unwrap();
        assert_eq!(candidates[0].hkl, [0, 0, 0]);
        assert!(candidates[1..].iter().all(|c| c.two_theta <= 180.0 && c.d >= 1.5418 / 2.0));

        let limited = generate_hkl_array(10, &cell, 1.5418, Some(60.0), &rule, HklMode::All, false).unwrap();
        assert!(limited.iter().all(|c| c.two_theta <= 60.0));
        assert!(limited.len() < candidates.len());
    }

    fn engine_fixture(config: &GenerationConfig) -> (Crystal, SymmetryStore, StructureModel) {
        let crystal = Crystal::new(
            "NaCl",
            CellParameters::cubic(5.64),
            vec![
                AtomSite::new("Na1", "Na", [0.0, 0.0, 0.0]),
                AtomSite::new("Cl1", "Cl", [0.5, 0.5, 0.5]),
            ],
        )
        .with_space_group(225);
        let store = SymmetryStore::from_crystal(&crystal, config.tolerances.matrix).unwrap();
        let (structure, _) = StructureModel::build(&crystal, &store, &Tolerances::default());
        (crystal, store, structure)
    }

    #[test]
    fn test_build_groups_nacl() {
        let config = GenerationConfig {
            hkl_max: 3,
            two_theta_max: Some(60.0),
            ..GenerationConfig::default()
        };
        let (crystal, store, structure) = engine_fixture(&config);
        let rule = store.extinction_rule();
        let scattering = ScatteringModel::new(Radiation::XRay);
        let engine = GroupingEngine {
            cell: crystal.cell,
            operations: store.reciprocal_operations(),
            rule: &rule,
            structure: &structure,
            scattering: &scattering,
            config: &config,
        };

        let candidates = generate_hkl_array(
            config.hkl_max,
            &crystal.cell,
            config.wavelength,
            config.two_theta_max,
            &rule,
            config.mode,
            false,
        )
        .unwrap();
        let groups = engine.build_groups(&candidates).unwrap();

        let labels: Vec<[i32; 3]> = groups.iter().map(|g| g.label).collect();
        // 规范标签：首个非零指数为正后的字典序最小者
        assert!(labels.contains(&[1, -1, -1]));
        assert!(labels.contains(&[0, 0, 2]));
        assert!(labels.contains(&[0, 2, -2]));
        assert!(!labels.contains(&[0, 0, 1]));
        let unique: HashSet<[i32; 3]> = labels.iter().copied().collect();
        assert_eq!(unique.len(), labels.len());

        let g111 = groups.iter().find(|g| g.label == [1, -1, -1]).unwrap();
        assert_eq!(g111.multiplicity, 8);
        let g002 = groups.iter().find(|g| g.label == [0, 0, 2]).unwrap();
        assert_eq!(g002.multiplicity, 6);
        assert!(g002.mean_f2() > g111.mean_f2());
        assert!((g002.intensity() - 6.0 * g002.mean_f2()).abs() < 1e-9);
    }

    #[test]
    fn test_build_groups_individual() {
        let config = GenerationConfig {
            hkl_max: 2,
            two_theta_max: Some(40.0),
            individual: true,
            ..GenerationConfig::default()
        };
        let (crystal, store, structure) = engine_fixture(&config);
        let rule = store.extinction_rule();
        let scattering = ScatteringModel::new(Radiation::XRay);
        let engine = GroupingEngine {
            cell: crystal.cell,
            operations: store.reciprocal_operations(),
            rule: &rule,
            structure: &structure,
            scattering: &scattering,
            config: &config,
        };
        let candidates = generate_hkl_array(2, &crystal.cell, config.wavelength, config.two_theta_max, &rule, config.mode, false).unwrap();
        let groups = engine.build_groups(&candidates).unwrap();
        assert_eq!(groups.len(), candidates.len());
        assert!(groups.iter().all(|g| g.multiplicity == 1));
    }
}
