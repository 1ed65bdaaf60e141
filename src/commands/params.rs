//! # params 子命令实现
//!
//! 为一个晶相构建精修参数表：晶胞、相全局参数、原子位置与占有率、ADP，
//! 可选 κ 模型、逐衍射强度与 δ、峰形参数和背景系数。
//! 支持按名称设值（夹到边界内）和标记自由参数，最后以表格列出。
//!
//! ## 依赖关系
//! - 使用 `cli/params.rs` 定义的 ParamsArgs
//! - 使用 `models/parameters.rs`

use super::{format_hkl, load_kappa_atoms, load_phase};
use crate::cli::common::parse_hkl;
use crate::cli::params::ParamsArgs;
use crate::config::Tolerances;
use crate::diffraction::adp::AdpFamily;
use crate::diffraction::{load_bragg_positions, StructureModel};
use crate::error::{QdiffractError, Result};
use crate::models::structure::clean_element_symbol;
use crate::models::{Crystal, Parameter, ParameterKey, ParameterRegistry};
use crate::scattering::electron::KappaAtom;
use crate::scattering::ScatteringModel;
use crate::symmetry::SymmetryStore;
use crate::utils::output;

use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Vary")]
    vary: String,
}

impl ParameterRow {
    fn new(key: &ParameterKey, parameter: &Parameter) -> Self {
        Self {
            name: key.to_string(),
            value: format!("{:.6}", parameter.value),
            min: format_bound(parameter.min),
            max: format_bound(parameter.max),
            vary: if parameter.vary { "yes" } else { "" }.to_string(),
        }
    }
}

fn format_bound(value: f64) -> String {
    if value.is_infinite() {
        let text = if value > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else {
        format!("{}", value)
    }
}

/// 按显示名称查找参数键
fn find_key(registry: &ParameterRegistry, name: &str) -> Result<ParameterKey> {
    registry
        .iter()
        .find(|(key, _)| key.to_string() == name)
        .map(|(key, _)| key.clone())
        .ok_or_else(|| QdiffractError::InvalidArgument(format!("Unknown parameter '{}'", name)))
}

/// 解析 `NAME=VALUE`
fn parse_assignment(input: &str) -> Result<(&str, f64)> {
    let invalid = || {
        QdiffractError::InvalidArgument(format!(
            "Invalid assignment '{}'. Expected NAME=VALUE",
            input
        ))
    };
    let (name, value) = input.split_once('=').ok_or_else(invalid)?;
    let value: f64 = value.trim().parse().map_err(|_| invalid())?;
    Ok((name.trim(), value))
}

/// 由命令参数构建的参数表及其来源
struct RegistrySetup {
    registry: ParameterRegistry,
    crystal: Crystal,
    store: SymmetryStore,
    tolerances: Tolerances,
    kappa_atoms: Vec<KappaAtom>,
}

/// 由命令参数构建参数表
fn build_registry(args: &ParamsArgs) -> Result<RegistrySetup> {
    let phase = args.phase_id;
    let tolerances = args.tolerance.to_tolerances()?;
    let (crystal, store) = load_phase(&args.input, tolerances.matrix)?;
    output::print_success(&format!(
        "Loaded phase: {} ({} sites)",
        crystal.name,
        crystal.atoms.len()
    ));

    let mut registry = ParameterRegistry::new();
    registry.add_cell(phase, &crystal.cell);
    registry.add_globals(phase);

    let kappa_atoms = load_kappa_atoms(&args.coppens)?;
    let anharmonic = AdpFamily::anharmonic_families(args.anharmonic);

    for site in &crystal.atoms {
        registry.add_atom(phase, site);
        registry.add_adp(phase, site, AdpFamily::Biso);
        if args.anisotropic || site.adp.is_anisotropic() {
            registry.add_adp(phase, site, AdpFamily::B);
        }
        for family in anharmonic {
            registry.add_adp(phase, site, *family);
        }

        let element = clean_element_symbol(&site.element);
        for atom in kappa_atoms
            .iter()
            .filter(|a| clean_element_symbol(&a.element) == element)
        {
            registry.add_kappa(phase, &site.label, atom);
        }
    }

    if let Some(path) = &args.bragg {
        let rows: Vec<_> = load_bragg_positions(path)?
            .into_iter()
            .filter(|r| r.phase_id == phase)
            .collect();
        output::print_info(&format!(
            "{} reflections of phase {} from '{}'",
            rows.len(),
            phase,
            path.display()
        ));
        registry.add_intensities(phase, &rows);
        registry.add_deltas(phase, &rows);
    }

    if let Some(kind) = args.profile {
        registry.add_profile(phase, kind);
    }
    registry.add_background(args.background);

    for assignment in &args.assignments {
        let (name, value) = parse_assignment(assignment)?;
        let key = find_key(&registry, name)?;
        let stored = registry.set_value(&key, value)?;
        if stored != value {
            output::print_warning(&format!("{} clamped to {}", name, stored));
        }
    }

    for name in &args.vary {
        let key = find_key(&registry, name.trim())?;
        registry.set_vary(&key, true)?;
    }

    Ok(RegistrySetup {
        registry,
        crystal,
        store,
        tolerances,
        kappa_atoms,
    })
}

/// 用参数表中的值计算 |F(hkl)|²
///
/// 每个位点各自持有一份 κ 模型原子，P 与 κ 取该位点的参数值。
fn registry_intensity(setup: &RegistrySetup, args: &ParamsArgs, hkl: [i32; 3]) -> Result<f64> {
    let phase = args.phase_id;
    let (model, advisories) = StructureModel::from_registry(
        &setup.crystal,
        &setup.store,
        &setup.registry,
        phase,
        &setup.tolerances,
    );
    output::print_advisories(&advisories);

    let mut scattering = setup
        .kappa_atoms
        .iter()
        .cloned()
        .fold(ScatteringModel::new(args.radiation), ScatteringModel::with_kappa_atom);
    for site in &setup.crystal.atoms {
        let Some(mut atom) = scattering.kappa_atom(&site.element).cloned() else {
            continue;
        };
        setup.registry.apply_kappa(phase, &site.label, &mut atom)?;
        scattering = scattering.with_site_atom(&site.label, atom);
    }

    model.intensity(hkl, &scattering)
}

/// 执行 params 命令
pub fn execute(args: ParamsArgs) -> Result<()> {
    output::print_header("Refinement Parameters");

    let setup = build_registry(&args)?;
    let registry = &setup.registry;

    let rows: Vec<ParameterRow> = if args.free {
        registry
            .free_parameters()
            .into_iter()
            .map(|(k, p)| ParameterRow::new(k, p))
            .collect()
    } else {
        registry.iter().map(|(k, p)| ParameterRow::new(k, p)).collect()
    };

    if rows.is_empty() {
        output::print_warning("No parameters to list");
    } else {
        println!("{}", Table::new(rows));
    }

    if let Some(kind) = args.profile {
        let profile = registry.profile(args.phase_id, kind)?;
        output::print_info(&format!("Profile {}: {:?}", kind, profile.params));
    }

    if let Some(hkl) = &args.hkl {
        let hkl = parse_hkl(hkl)?;
        let f2 = registry_intensity(&setup, &args, hkl)?;
        output::print_success(&format!("|F{}|² = {:.4} ({:?})", format_hkl(hkl), f2, args.radiation));
    }

    output::print_done(&format!(
        "{} parameters, {} free",
        registry.len(),
        registry.free_parameters().len()
    ));
    Ok(())
}
