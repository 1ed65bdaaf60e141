//! # 结构检查子命令实现
//!
//! - `symmetry`: 操作来源、群阶、是否中心对称、消光条件数，以及操作表
//! - `atoms`: 每个位点的轨道（多重度、位置、到代表位置的距离）
//! - `star`: 单个 hkl 的等价星（d、2θ、相位因子）
//!
//! ## 依赖关系
//! - 使用 `cli/inspect.rs` 定义的参数
//! - 使用 `symmetry/` 和 `diffraction/hkl.rs`

use super::{format_hkl, load_phase};
use crate::cli::common::{parse_hkl, parse_wavelength};
use crate::cli::inspect::{AtomsArgs, StarArgs, SymmetryArgs};
use crate::config::HklMode;
use crate::diffraction::hkl::{canonical_hkl, star};
use crate::diffraction::lattice::two_theta;
use crate::error::{QdiffractError, Result};
use crate::models::Crystal;
use crate::symmetry::spacegroups;
use crate::symmetry::store::OperationSource;
use crate::symmetry::{Orbit, SymmetryOperation, SymmetryStore};
use crate::utils::output;

use std::collections::HashSet;
use std::path::Path;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "det")]
    determinant: String,
}

fn operation_table(ops: &[SymmetryOperation]) -> Table {
    let rows: Vec<OperationRow> = ops
        .iter()
        .enumerate()
        .map(|(i, op)| OperationRow {
            index: i + 1,
            operation: op.to_string(),
            determinant: format!("{:+.0}", op.determinant()),
        })
        .collect();
    Table::new(rows)
}

/// 构建操作集合；内置数据库中没有该空间群时列出可用编号
fn load_with_hint(input: &Path, matrix_tol: f64) -> Result<(Crystal, SymmetryStore)> {
    load_phase(input, matrix_tol).inspect_err(|e| {
        if matches!(e, QdiffractError::UnsupportedSpaceGroup { .. }) {
            let numbers: Vec<String> = spacegroups::available_numbers()
                .iter()
                .map(u32::to_string)
                .collect();
            output::print_info(&format!("Built-in space groups: {}", numbers.join(", ")));
        }
    })
}

// ─────────────────────────────────────────────────────────────
// symmetry
// ─────────────────────────────────────────────────────────────

pub fn execute_symmetry(args: SymmetryArgs) -> Result<()> {
    output::print_header("Space-Group Operations");

    let tolerances = args.tolerance.to_tolerances()?;
    let (crystal, store) = load_with_hint(&args.input, tolerances.matrix)?;
    output::print_success(&format!("Loaded phase: {}", crystal.name));

    match store.source() {
        OperationSource::Explicit => {
            output::print_info("Operations: explicit list from CIF");
        }
        OperationSource::Database(number) => {
            let symbol = spacegroups::lookup(number).map(|e| e.symbol).unwrap_or("?");
            output::print_info(&format!("Operations: built-in table for No. {} ({})", number, symbol));
        }
    }
    if let Some(symbol) = &crystal.space_group_symbol {
        output::print_info(&format!("CIF symbol: {}", symbol));
    }

    output::print_info(&format!(
        "Group order: {} (point group order {})",
        store.group_order(),
        store.point_group_order()
    ));
    output::print_info(&format!(
        "Centrosymmetric: {}",
        if store.is_centrosymmetric() { "yes" } else { "no" }
    ));

    let rule = store.extinction_rule();
    if rule.is_trivial() {
        output::print_info("Reflection conditions: none");
    } else {
        output::print_info(&format!("Reflection conditions: {} from translated operations", rule.len()));
    }

    println!("{}", operation_table(store.operations()));

    if args.reciprocal {
        output::print_header("Reciprocal-Space Operations");
        println!("{}", operation_table(store.reciprocal_operations()));
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────
// atoms
// ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Element")]
    element: String,
    #[tabled(rename = "Mult")]
    multiplicity: usize,
    #[tabled(rename = "Occ")]
    occupancy: String,
    #[tabled(rename = "Representative")]
    representative: String,
}

#[derive(Tabled)]
struct PositionRow {
    #[tabled(rename = "#")]
    index: usize,
    x: String,
    y: String,
    z: String,
    #[tabled(rename = "dist")]
    distance: String,
}

fn format_position(p: &[f64; 3]) -> String {
    format!("{:.5} {:.5} {:.5}", p[0], p[1], p[2])
}

pub fn execute_atoms(args: AtomsArgs) -> Result<()> {
    output::print_header("Atom Orbits");

    let tolerances = args.tolerance.to_tolerances()?;
    let (crystal, store) = load_with_hint(&args.input, tolerances.matrix)?;
    output::print_success(&format!(
        "Loaded phase: {} ({} sites, group order {})",
        crystal.name,
        crystal.atoms.len(),
        store.group_order()
    ));
    let cell = &crystal.cell;
    output::print_info(&format!(
        "Cell: a={:.4} b={:.4} c={:.4} α={:.2} β={:.2} γ={:.2}, V = {:.3} Å³",
        cell.a,
        cell.b,
        cell.c,
        cell.alpha,
        cell.beta,
        cell.gamma,
        cell.volume()?
    ));

    let mut orbits = Vec::with_capacity(crystal.atoms.len());
    let mut advisories = Vec::new();
    for site in &crystal.atoms {
        let (orbit, notes) = Orbit::from_site(site, store.operations(), store.group_order(), &tolerances);
        advisories.extend(notes);
        orbits.push((site, orbit));
    }

    let summary: Vec<SiteRow> = orbits
        .iter()
        .map(|(site, orbit)| SiteRow {
            label: orbit.label.clone(),
            element: orbit.element.clone(),
            multiplicity: orbit.multiplicity(),
            occupancy: format!("{:.3}", site.occupancy),
            representative: format_position(&orbit.representative()),
        })
        .collect();
    println!("{}", Table::new(summary));

    let total: usize = orbits.iter().map(|(_, o)| o.multiplicity()).sum();
    output::print_info(&format!("Atoms in cell: {}", total));

    if !args.summary {
        for (_, orbit) in &orbits {
            output::print_header(&format!("{} ({})", orbit.label, orbit.element));
            let rows: Vec<PositionRow> = orbit
                .positions
                .iter()
                .zip(orbit.distances_to_representative())
                .enumerate()
                .map(|(i, (p, d))| PositionRow {
                    index: i + 1,
                    x: format!("{:.5}", p[0]),
                    y: format!("{:.5}", p[1]),
                    z: format!("{:.5}", p[2]),
                    distance: format!("{:.5}", d),
                })
                .collect();
            println!("{}", Table::new(rows));
        }
    }

    output::print_advisories(&advisories);
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// star
// ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct StarRow {
    #[tabled(rename = "Op")]
    op_index: usize,
    #[tabled(rename = "(hkl)")]
    hkl: String,
    #[tabled(rename = "d (Å)")]
    d: String,
    #[tabled(rename = "2θ (°)")]
    two_theta: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Allowed")]
    allowed: String,
}

pub fn execute_star(args: StarArgs) -> Result<()> {
    output::print_header("Reflection Star");

    let hkl = parse_hkl(&args.hkl)?;
    let wavelength = parse_wavelength(&args.wavelength)?;
    let tolerances = args.tolerance.to_tolerances()?;
    let (crystal, store) = load_with_hint(&args.input, tolerances.matrix)?;
    let rule = store.extinction_rule();

    output::print_info(&format!(
        "{} {} at λ = {:.4} Å ({} reciprocal operations)",
        crystal.name,
        format_hkl(hkl),
        wavelength,
        store.reciprocal_operations().len()
    ));

    if !rule.allows(hkl) {
        output::print_warning(&format!("{} is systematically absent", format_hkl(hkl)));
    }

    let filter = (args.mode == HklMode::Allowed).then_some(&rule);
    let entries = star(hkl, store.reciprocal_operations(), filter, true);
    if entries.is_empty() {
        output::print_warning("Star is empty after extinction filtering");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(entries.len());
    for entry in &entries {
        let (d, tt) = if entry.hkl == [0, 0, 0] {
            ("inf".to_string(), "0.000".to_string())
        } else {
            let d = crystal.cell.d_spacing(entry.hkl)?;
            let tt = two_theta(d, wavelength)
                .map(|t| format!("{:.3}", t))
                .unwrap_or_else(|| "-".to_string());
            (format!("{:.5}", d), tt)
        };
        rows.push(StarRow {
            op_index: entry.op_index,
            hkl: format_hkl(entry.hkl),
            d,
            two_theta: tt,
            phase: format!("{:+.3}{:+.3}i", entry.phase.re, entry.phase.im),
            allowed: if rule.allows(entry.hkl) { "yes" } else { "no" }.to_string(),
        });
    }
    println!("{}", Table::new(rows));

    let unique: HashSet<[i32; 3]> = entries.iter().map(|e| e.hkl).collect();
    if let Some(label) = canonical_hkl(unique.iter().copied()) {
        output::print_success(&format!(
            "Canonical label {}, {} distinct members",
            format_hkl(label),
            unique.len()
        ));
    }
    Ok(())
}
