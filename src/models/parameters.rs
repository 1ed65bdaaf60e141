//! # 精修参数注册表
//!
//! 以 `(相号, 实体, 属性)` 为键保存所有可精修参数，每个参数带取值、边界与是否精修标志。
//!
//! ## 参数族
//! - 晶胞：a, b, c, α, β, γ（下限 0）
//! - 原子：x, y, z 与占有率（0..1）
//! - ADP：Biso（默认 0.01）与 B/C/D/E/F 张量分量（默认 0）
//! - κ 模型：每个价层的布居数 P（上限 s 2 / p 6 / d 10 / f 14）与 κ（默认 1）
//! - 相全局量：scale 1、Biso_overall 0.1、shift 0、phvol（第 1 相为 1，其余 0.5）
//! - 每个衍射：强度 I（取自 Bragg 行第 9 列，下限 0）与峰位修正 δ
//! - 峰形参数与背景 Legendre 系数
//!
//! ## 依赖关系
//! - 被 `commands/params.rs` 使用
//! - 被 `diffraction/structure_factor.rs` 读取原子参数
//! - 使用 `models/structure.rs`、`diffraction/adp.rs`、`diffraction/bragg.rs`、`diffraction/profiles.rs`

use crate::diffraction::adp::AdpFamily;
use crate::diffraction::bragg::BraggRow;
use crate::diffraction::profiles::{Profile, ProfileKind};
use crate::error::{QdiffractError, Result};
use crate::models::structure::{AtomSite, CellParameters, Crystal};
use crate::scattering::electron::KappaAtom;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 晶胞参数分量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CellAxis {
    A,
    B,
    C,
    Alpha,
    Beta,
    Gamma,
}

impl CellAxis {
    pub const ALL: [CellAxis; 6] = [
        CellAxis::A,
        CellAxis::B,
        CellAxis::C,
        CellAxis::Alpha,
        CellAxis::Beta,
        CellAxis::Gamma,
    ];

    fn name(&self) -> &'static str {
        match self {
            CellAxis::A => "a",
            CellAxis::B => "b",
            CellAxis::C => "c",
            CellAxis::Alpha => "alpha",
            CellAxis::Beta => "beta",
            CellAxis::Gamma => "gamma",
        }
    }
}

/// 相全局参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GlobalAttribute {
    Scale,
    BisoOverall,
    Shift,
    PhaseVolume,
}

impl GlobalAttribute {
    fn name(&self) -> &'static str {
        match self {
            GlobalAttribute::Scale => "scale",
            GlobalAttribute::BisoOverall => "Biso_overall",
            GlobalAttribute::Shift => "shift",
            GlobalAttribute::PhaseVolume => "phvol",
        }
    }
}

/// 参数所属实体
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Entity {
    /// 整个晶相
    Phase,
    /// 原子位点（按标签）
    Atom(String),
    /// 单个衍射（规范 hkl）
    Reflection([i32; 3]),
    /// 背景（与相无关）
    Background,
}

/// 参数属性
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Attribute {
    Cell(CellAxis),
    /// 分数坐标分量 0..3
    Position(usize),
    Occupancy,
    /// ADP 族及分量序号（Biso 为 0）
    Adp(AdpFamily, usize),
    KappaPopulation(String),
    Kappa(String),
    Global(GlobalAttribute),
    Intensity,
    Delta,
    Shape(ProfileKind, &'static str),
    /// Legendre 系数阶数
    Legendre(usize),
}

/// 参数键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParameterKey {
    pub phase: u32,
    pub entity: Entity,
    pub attribute: Attribute,
}

impl ParameterKey {
    pub fn new(phase: u32, entity: Entity, attribute: Attribute) -> Self {
        Self {
            phase,
            entity,
            attribute,
        }
    }

    pub fn cell(phase: u32, axis: CellAxis) -> Self {
        Self::new(phase, Entity::Phase, Attribute::Cell(axis))
    }

    pub fn atom(phase: u32, label: &str, attribute: Attribute) -> Self {
        Self::new(phase, Entity::Atom(label.to_string()), attribute)
    }

    pub fn global(phase: u32, attribute: GlobalAttribute) -> Self {
        Self::new(phase, Entity::Phase, Attribute::Global(attribute))
    }

    pub fn reflection(phase: u32, hkl: [i32; 3], attribute: Attribute) -> Self {
        Self::new(phase, Entity::Reflection(hkl), attribute)
    }
}

fn hkl_name(hkl: &[i32; 3]) -> String {
    hkl.iter()
        .map(|i| if *i < 0 { format!("m{}", -i) } else { i.to_string() })
        .collect::<Vec<_>>()
        .join("_")
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entity == Entity::Background {
            if let Attribute::Legendre(n) = self.attribute {
                return write!(f, "bckg{}", n);
            }
        }

        write!(f, "Phase{}_", self.phase)?;
        match &self.entity {
            Entity::Atom(label) => write!(f, "{}_", label)?,
            Entity::Reflection(hkl) => {
                let tag = if self.attribute == Attribute::Delta { "delta" } else { "I" };
                return write!(f, "{}_{}", tag, hkl_name(hkl));
            }
            Entity::Phase | Entity::Background => {}
        }

        match &self.attribute {
            Attribute::Cell(axis) => write!(f, "{}", axis.name()),
            Attribute::Position(i) => write!(f, "{}", ["x", "y", "z"].get(*i).unwrap_or(&"?")),
            Attribute::Occupancy => write!(f, "occ"),
            Attribute::Adp(family, i) => write!(f, "{}{}", family.name(), family.indices().get(*i).unwrap_or(&"")),
            Attribute::KappaPopulation(shell) => write!(f, "{}_P", shell),
            Attribute::Kappa(shell) => write!(f, "{}_kappa", shell),
            Attribute::Global(g) => write!(f, "{}", g.name()),
            Attribute::Intensity => write!(f, "I"),
            Attribute::Delta => write!(f, "delta"),
            Attribute::Shape(kind, name) => write!(f, "{}_{}", kind, name),
            Attribute::Legendre(n) => write!(f, "bckg{}", n),
        }
    }
}

/// 单个参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Parameter {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    /// 是否参与精修
    pub vary: bool,
}

impl Parameter {
    /// 无边界、固定的参数
    pub fn fixed(value: f64) -> Self {
        Self {
            value,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            vary: false,
        }
    }

    pub fn bounded(value: f64, min: f64, max: f64) -> Self {
        Self {
            value,
            min,
            max,
            vary: false,
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// 价层名对应的布居数上限
/// κ 的下限；κ 必须为正
const KAPPA_MIN: f64 = 0.01;

fn population_limit(shell: &str) -> f64 {
    let letters: String = shell.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    match letters.as_str() {
        "s" => 2.0,
        "p" => 6.0,
        "d" => 10.0,
        "f" => 14.0,
        _ => f64::INFINITY,
    }
}

/// 参数注册表
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    params: BTreeMap<ParameterKey, Parameter>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ParameterKey, parameter: Parameter) {
        self.params.insert(key, parameter);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, key: &ParameterKey) -> Option<&Parameter> {
        self.params.get(key)
    }

    pub fn value(&self, key: &ParameterKey) -> Option<f64> {
        self.params.get(key).map(|p| p.value)
    }

    /// 设置取值（截断到边界内），返回实际写入的值
    pub fn set_value(&mut self, key: &ParameterKey, value: f64) -> Result<f64> {
        let param = self
            .params
            .get_mut(key)
            .ok_or_else(|| QdiffractError::InvalidArgument(format!("unknown parameter {}", key)))?;
        param.value = param.clamp(value);
        Ok(param.value)
    }

    pub fn set_vary(&mut self, key: &ParameterKey, vary: bool) -> Result<()> {
        let param = self
            .params
            .get_mut(key)
            .ok_or_else(|| QdiffractError::InvalidArgument(format!("unknown parameter {}", key)))?;
        param.vary = vary;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterKey, &Parameter)> {
        self.params.iter()
    }

    /// 参与精修的参数
    pub fn free_parameters(&self) -> Vec<(&ParameterKey, &Parameter)> {
        self.params.iter().filter(|(_, p)| p.vary).collect()
    }

    // ─────────────────────────────────────────────────────────────
    // 参数族构建
    // ─────────────────────────────────────────────────────────────

    pub fn add_cell(&mut self, phase: u32, cell: &CellParameters) {
        for (axis, value) in CellAxis::ALL.iter().zip(cell.as_array()) {
            self.insert(
                ParameterKey::cell(phase, *axis),
                Parameter::bounded(value, 0.0, f64::INFINITY),
            );
        }
    }

    /// 位置 x, y, z 与占有率
    pub fn add_atom(&mut self, phase: u32, site: &AtomSite) {
        for (i, value) in site.position.iter().enumerate() {
            self.insert(
                ParameterKey::atom(phase, &site.label, Attribute::Position(i)),
                Parameter::fixed(*value),
            );
        }
        self.insert(
            ParameterKey::atom(phase, &site.label, Attribute::Occupancy),
            Parameter::bounded(site.occupancy, 0.0, 1.0),
        );
    }

    /// ADP 族；初值取位点已有的值，Biso 为 0 时取 0.01
    pub fn add_adp(&mut self, phase: u32, site: &AtomSite, family: AdpFamily) {
        let values = site.adp.coefficients(family);
        for (i, value) in values.iter().enumerate() {
            let value = if family == AdpFamily::Biso && *value == 0.0 {
                0.01
            } else {
                *value
            };
            self.insert(
                ParameterKey::atom(phase, &site.label, Attribute::Adp(family, i)),
                Parameter::fixed(value),
            );
        }
    }

    /// κ 模型：每个价层的 P 与 κ
    pub fn add_kappa(&mut self, phase: u32, label: &str, atom: &KappaAtom) {
        for shell in &atom.shells {
            self.insert(
                ParameterKey::atom(phase, label, Attribute::KappaPopulation(shell.name.clone())),
                Parameter::bounded(shell.population, 0.0, population_limit(&shell.name)),
            );
            self.insert(
                ParameterKey::atom(phase, label, Attribute::Kappa(shell.name.clone())),
                Parameter::bounded(shell.kappa, KAPPA_MIN, f64::INFINITY),
            );
        }
    }

    pub fn add_globals(&mut self, phase: u32) {
        let phvol = if phase == 1 { 1.0 } else { 0.5 };
        let unbounded_above = f64::INFINITY;
        self.insert(
            ParameterKey::global(phase, GlobalAttribute::Scale),
            Parameter::bounded(1.0, 0.0, unbounded_above),
        );
        self.insert(
            ParameterKey::global(phase, GlobalAttribute::BisoOverall),
            Parameter::bounded(0.1, 0.0, unbounded_above),
        );
        self.insert(
            ParameterKey::global(phase, GlobalAttribute::Shift),
            Parameter::fixed(0.0),
        );
        self.insert(
            ParameterKey::global(phase, GlobalAttribute::PhaseVolume),
            Parameter::bounded(phvol, 0.0, unbounded_above),
        );
    }

    /// 每个衍射的强度，初值取 Bragg 行的强度列
    pub fn add_intensities(&mut self, phase: u32, rows: &[BraggRow]) {
        for row in rows {
            self.insert(
                ParameterKey::reflection(phase, row.hkl, Attribute::Intensity),
                Parameter::bounded(row.intensity, 0.0, f64::INFINITY),
            );
        }
    }

    /// 每个衍射的峰位修正 δ
    pub fn add_deltas(&mut self, phase: u32, rows: &[BraggRow]) {
        for row in rows {
            self.insert(
                ParameterKey::reflection(phase, row.hkl, Attribute::Delta),
                Parameter::fixed(0.0),
            );
        }
    }

    pub fn add_profile(&mut self, phase: u32, kind: ProfileKind) {
        for meta in kind.shape_parameters() {
            self.insert(
                ParameterKey::new(phase, Entity::Phase, Attribute::Shape(kind, meta.name)),
                Parameter::bounded(meta.value, meta.min, meta.max),
            );
        }
    }

    /// 背景 Legendre 系数 bckg0..bckg(n−1)
    pub fn add_background(&mut self, terms: usize) {
        for n in 0..terms {
            self.insert(
                ParameterKey::new(0, Entity::Background, Attribute::Legendre(n)),
                Parameter::fixed(0.0),
            );
        }
    }

    // ─────────────────────────────────────────────────────────────
    // 读取
    // ─────────────────────────────────────────────────────────────

    pub fn global_value(&self, phase: u32, attribute: GlobalAttribute) -> Option<f64> {
        self.value(&ParameterKey::global(phase, attribute))
    }

    /// 以注册表中的值覆盖晶相的晶胞、位置、占有率与 ADP
    pub fn apply_to_crystal(&self, crystal: &Crystal, phase: u32) -> Crystal {
        let mut updated = crystal.clone();

        for (axis, slot) in CellAxis::ALL.iter().zip([
            &mut updated.cell.a,
            &mut updated.cell.b,
            &mut updated.cell.c,
            &mut updated.cell.alpha,
            &mut updated.cell.beta,
            &mut updated.cell.gamma,
        ]) {
            if let Some(v) = self.value(&ParameterKey::cell(phase, *axis)) {
                *slot = v;
            }
        }

        for site in &mut updated.atoms {
            self.apply_to_site(site, phase);
        }

        updated
    }

    fn apply_to_site(&self, site: &mut AtomSite, phase: u32) {
        let label = site.label.clone();
        for i in 0..3 {
            if let Some(v) = self.value(&ParameterKey::atom(phase, &label, Attribute::Position(i))) {
                site.position[i] = v;
            }
        }
        if let Some(v) = self.value(&ParameterKey::atom(phase, &label, Attribute::Occupancy)) {
            site.occupancy = v;
        }

        let families = [
            (AdpFamily::Biso, 0u8),
            (AdpFamily::B, 0),
            (AdpFamily::C, 3),
            (AdpFamily::D, 4),
            (AdpFamily::E, 5),
            (AdpFamily::F, 6),
        ];
        for (family, order) in families {
            let mut present = false;
            for (i, slot) in site.adp.coefficients_mut(family).iter_mut().enumerate() {
                if let Some(v) = self.value(&ParameterKey::atom(phase, &label, Attribute::Adp(family, i))) {
                    *slot = v;
                    present = true;
                }
            }
            if present && order > site.adp.anharmonic_order {
                site.adp.anharmonic_order = order;
            }
        }
    }

    /// 以注册表中的 P 与 κ 更新 κ 模型原子
    pub fn apply_kappa(&self, phase: u32, label: &str, atom: &mut KappaAtom) -> Result<()> {
        let names: Vec<String> = atom.shells.iter().map(|s| s.name.clone()).collect();
        for name in names {
            let population_key = ParameterKey::atom(phase, label, Attribute::KappaPopulation(name.clone()));
            if let Some(p) = self.value(&population_key) {
                atom.set_population(&name, p)?;
            }
            if let Some(k) = self.value(&ParameterKey::atom(phase, label, Attribute::Kappa(name.clone()))) {
                atom.set_kappa(&name, k)?;
            }
        }
        Ok(())
    }

    /// 由注册表中的峰形参数构建峰形；缺失的参数取默认值
    pub fn profile(&self, phase: u32, kind: ProfileKind) -> Result<Profile> {
        let params: Vec<f64> = kind
            .shape_parameters()
            .iter()
            .map(|meta| {
                self.value(&ParameterKey::new(phase, Entity::Phase, Attribute::Shape(kind, meta.name)))
                    .unwrap_or(meta.value)
            })
            .collect();
        Profile::with_params(kind, &params)
    }
}
